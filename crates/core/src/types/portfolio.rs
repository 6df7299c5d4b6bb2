//! Portfolio gallery entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sanitize::escape_html;

/// An image shown in the portfolio gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    /// Stable identifier. Left empty by the admin panel for new items and
    /// filled in by [`PortfolioItem::sanitized`].
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
}

impl PortfolioItem {
    /// Return a copy with free text escaped and a missing id assigned.
    ///
    /// New ids are the Unix millisecond timestamp plus `index`, so several new
    /// items saved in one request still get distinct ids.
    #[must_use]
    pub fn sanitized(self, now: DateTime<Utc>, index: usize) -> Self {
        let id = if self.id.trim().is_empty() {
            let offset = i64::try_from(index).unwrap_or(i64::MAX);
            now.timestamp_millis().saturating_add(offset).to_string()
        } else {
            escape_html(&self.id)
        };

        Self {
            id,
            url: escape_html(&self.url),
            category: escape_html(&self.category),
            title: escape_html(&self.title),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).single().unwrap_or_default()
    }

    #[test]
    fn test_missing_id_is_timestamp() {
        let item = PortfolioItem {
            title: "Logo".to_string(),
            ..PortfolioItem::default()
        }
        .sanitized(fixed_now(), 0);
        assert_eq!(item.id, "1700000000000");
    }

    #[test]
    fn test_ids_distinct_within_batch() {
        let a = PortfolioItem::default().sanitized(fixed_now(), 0);
        let b = PortfolioItem::default().sanitized(fixed_now(), 1);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_existing_id_kept() {
        let item = PortfolioItem {
            id: "abc".to_string(),
            ..PortfolioItem::default()
        }
        .sanitized(fixed_now(), 3);
        assert_eq!(item.id, "abc");
    }

    #[test]
    fn test_text_escaped() {
        let item = PortfolioItem {
            id: "1".to_string(),
            url: "https://cdn.test/a.png?x=1&y=2".to_string(),
            category: "<i>banners</i>".to_string(),
            title: "\"Neon\"".to_string(),
        }
        .sanitized(fixed_now(), 0);
        assert_eq!(item.url, "https://cdn.test/a.png?x=1&amp;y=2");
        assert_eq!(item.category, "&lt;i&gt;banners&lt;/i&gt;");
        assert_eq!(item.title, "&quot;Neon&quot;");
    }
}
