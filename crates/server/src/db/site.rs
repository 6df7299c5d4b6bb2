//! Site document repository.
//!
//! The whole site lives in one JSON document. Reads never fail for lack of a
//! stored document: missing sections come from the configured defaults.
//! Writes merge top-level sections in the database itself, so two admin saves
//! touching different sections cannot clobber each other.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gfx_studio_core::{PartialSiteData, Review, SiteData};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::RepositoryError;

/// Logical id of the site document.
pub const MAIN_DOCUMENT_ID: &str = "main";

/// Storage for the site content document.
#[async_trait]
pub trait SiteRepository: Send + Sync {
    /// The current document, with defaults filling any missing section.
    async fn read(&self) -> Result<SiteData, RepositoryError>;

    /// Replace each section present in `partial`, leaving the rest untouched,
    /// and stamp `updatedAt`.
    async fn write(
        &self,
        partial: PartialSiteData,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Append a review to the end of the review list.
    async fn append_review(&self, review: &Review) -> Result<(), RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// Site document stored as a JSONB row in `site_document`.
#[derive(Clone)]
pub struct PgSiteRepository {
    pool: PgPool,
    defaults: Arc<SiteData>,
}

impl PgSiteRepository {
    /// Create a repository that overlays stored data onto `defaults`.
    #[must_use]
    pub fn new(pool: PgPool, defaults: SiteData) -> Self {
        Self {
            pool,
            defaults: Arc::new(defaults),
        }
    }
}

#[async_trait]
impl SiteRepository for PgSiteRepository {
    async fn read(&self) -> Result<SiteData, RepositoryError> {
        let body: Option<Json<JsonValue>> =
            sqlx::query_scalar("SELECT body FROM site_document WHERE id = $1")
                .bind(MAIN_DOCUMENT_ID)
                .fetch_optional(&self.pool)
                .await?;

        match body {
            Some(Json(stored)) => SiteData::from_stored(&self.defaults, stored).map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid site document: {e}"))
            }),
            None => Ok(self.defaults.as_ref().clone()),
        }
    }

    async fn write(
        &self,
        partial: PartialSiteData,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let patch = partial.to_patch(now)?;

        sqlx::query(
            r"
            INSERT INTO site_document (id, body, updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET body = site_document.body || EXCLUDED.body,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(MAIN_DOCUMENT_ID)
        .bind(Json(patch))
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_review(&self, review: &Review) -> Result<(), RepositoryError> {
        let review_json = serde_json::to_value(review)?;
        let stamp = serde_json::to_value(review.date)?;

        sqlx::query(
            r"
            INSERT INTO site_document (id, body, updated_at)
            VALUES (
                $1,
                jsonb_build_object('reviews', jsonb_build_array($2::jsonb), 'updatedAt', $3::jsonb),
                $4
            )
            ON CONFLICT (id) DO UPDATE
            SET body = jsonb_set(
                    site_document.body,
                    '{reviews}',
                    CASE
                        WHEN jsonb_typeof(site_document.body -> 'reviews') = 'array'
                            THEN site_document.body -> 'reviews'
                        ELSE '[]'::jsonb
                    END || jsonb_build_array($2::jsonb),
                    true
                ) || jsonb_build_object('updatedAt', $3::jsonb),
                updated_at = $4
            ",
        )
        .bind(MAIN_DOCUMENT_ID)
        .bind(Json(review_json))
        .bind(Json(stamp))
        .bind(review.date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Site document held in process memory.
#[derive(Debug, Default)]
pub struct InMemorySiteRepository {
    document: RwLock<SiteData>,
}

impl InMemorySiteRepository {
    /// Start from `initial` as if it had been stored.
    #[must_use]
    pub fn new(initial: SiteData) -> Self {
        Self {
            document: RwLock::new(initial),
        }
    }
}

#[async_trait]
impl SiteRepository for InMemorySiteRepository {
    async fn read(&self) -> Result<SiteData, RepositoryError> {
        Ok(self.document.read().await.clone())
    }

    async fn write(
        &self,
        partial: PartialSiteData,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.document.write().await.apply(partial, now);
        Ok(())
    }

    async fn append_review(&self, review: &Review) -> Result<(), RepositoryError> {
        let mut document = self.document.write().await;
        document.reviews.push(review.clone());
        document.updated_at = Some(review.date);
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use gfx_studio_core::{Denylist, Order, PortfolioItem, Price, Rating, VisitorIdentity};

    use super::*;

    fn review(id: &str, text: &str) -> Review {
        Review::submit(
            id.to_string(),
            &VisitorIdentity {
                id: "42".to_string(),
                username: "visitor".to_string(),
                avatar: None,
            },
            Rating::try_from(5).unwrap(),
            text,
            &Denylist::default(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_read_returns_defaults_when_empty() {
        let repo = InMemorySiteRepository::new(SiteData::default());
        let data = repo.read().await.unwrap();
        assert_eq!(data.service_prices.get("logo"), Some(&Price::whole(20)));
    }

    #[tokio::test]
    async fn test_write_prices_keeps_orders_portfolio_reviews() {
        let repo = InMemorySiteRepository::new(SiteData::default());
        repo.write(
            PartialSiteData {
                orders: Some(vec![Order::default()]),
                portfolio: Some(vec![PortfolioItem::default()]),
                ..PartialSiteData::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();
        repo.append_review(&review("r1", "great")).await.unwrap();

        repo.write(
            PartialSiteData {
                service_prices: Some(BTreeMap::from([("logo".to_string(), Price::whole(50))])),
                ..PartialSiteData::default()
            },
            Utc::now(),
        )
        .await
        .unwrap();

        let data = repo.read().await.unwrap();
        assert_eq!(data.service_prices.get("logo"), Some(&Price::whole(50)));
        assert_eq!(data.orders.len(), 1);
        assert_eq!(data.portfolio.len(), 1);
        assert_eq!(data.reviews.len(), 1);
        assert!(data.updated_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_disjoint_writes_both_survive() {
        let repo = Arc::new(InMemorySiteRepository::new(SiteData::default()));

        let prices = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                repo.write(
                    PartialSiteData {
                        service_prices: Some(BTreeMap::new()),
                        ..PartialSiteData::default()
                    },
                    Utc::now(),
                )
                .await
            })
        };
        let orders = {
            let repo = Arc::clone(&repo);
            tokio::spawn(async move {
                repo.write(
                    PartialSiteData {
                        orders: Some(vec![Order::default(), Order::default()]),
                        ..PartialSiteData::default()
                    },
                    Utc::now(),
                )
                .await
            })
        };

        prices.await.unwrap().unwrap();
        orders.await.unwrap().unwrap();

        let data = repo.read().await.unwrap();
        assert!(data.service_prices.is_empty());
        assert_eq!(data.orders.len(), 2);
    }

    #[tokio::test]
    async fn test_append_review_preserves_order() {
        let repo = InMemorySiteRepository::new(SiteData::default());
        repo.append_review(&review("first", "one")).await.unwrap();
        repo.append_review(&review("second", "two")).await.unwrap();

        let ids: Vec<_> = repo
            .read()
            .await
            .unwrap()
            .reviews
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }
}
