//! The site content document and partial updates to it.
//!
//! The whole public site is driven by one document: service prices, the asset
//! pack promotion, commission orders, the portfolio gallery, and reviews.
//! Admin saves are *partial*: only the sections present in the request are
//! replaced, everything else is left untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::{AssetPack, Order, PortfolioItem, Price, Review};

/// Wire name of the `updatedAt` field, shared with store implementations.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// The complete site content document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteData {
    #[serde(default)]
    pub service_prices: BTreeMap<String, Price>,
    #[serde(default)]
    pub asset_pack_data: AssetPack,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default)]
    pub portfolio: Vec<PortfolioItem>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SiteData {
    /// Placeholder content served before anything has been saved.
    fn default() -> Self {
        let service_prices = [
            ("logo", 20),
            ("pfp", 15),
            ("banner", 30),
            ("banner_pfp", 40),
            ("poster", 30),
            ("thumbnails", 20),
            ("bundle", 45),
        ]
        .into_iter()
        .map(|(key, amount)| (key.to_string(), Price::whole(amount)))
        .collect();

        Self {
            service_prices,
            asset_pack_data: AssetPack::default(),
            orders: Vec::new(),
            portfolio: Vec::new(),
            reviews: Vec::new(),
            updated_at: None,
        }
    }
}

impl SiteData {
    /// Build the effective document from what is stored, filling any section
    /// the stored document lacks from `defaults`.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored section does not match its schema.
    pub fn from_stored(defaults: &Self, stored: JsonValue) -> Result<Self, serde_json::Error> {
        let mut merged = match serde_json::to_value(defaults)? {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };

        if let JsonValue::Object(stored) = stored {
            for (key, value) in stored {
                if !value.is_null() {
                    merged.insert(key, value);
                }
            }
        }

        serde_json::from_value(JsonValue::Object(merged))
    }

    /// Apply a partial update in place and stamp `updated_at`.
    pub fn apply(&mut self, partial: PartialSiteData, now: DateTime<Utc>) {
        if let Some(prices) = partial.service_prices {
            self.service_prices = prices;
        }
        if let Some(asset_pack) = partial.asset_pack_data {
            self.asset_pack_data = asset_pack;
        }
        if let Some(orders) = partial.orders {
            self.orders = orders;
        }
        if let Some(portfolio) = partial.portfolio {
            self.portfolio = portfolio;
        }
        self.updated_at = Some(now);
    }

    /// Reviews that may be shown publicly.
    pub fn public_reviews(&self) -> impl Iterator<Item = &Review> {
        self.reviews.iter().filter(|r| r.is_public())
    }

    /// Reviews hidden by the moderation filter.
    pub fn flagged_reviews(&self) -> impl Iterator<Item = &Review> {
        self.reviews.iter().filter(|r| !r.is_public())
    }
}

/// An admin save request: each present section replaces the stored one.
///
/// Reviews are deliberately absent: they are append-only and can never be
/// overwritten from the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialSiteData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_prices: Option<BTreeMap<String, Price>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_pack_data: Option<AssetPack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orders: Option<Vec<Order>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<Vec<PortfolioItem>>,
}

impl PartialSiteData {
    /// Whether the update would change nothing but the timestamp.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.service_prices.is_none()
            && self.asset_pack_data.is_none()
            && self.orders.is_none()
            && self.portfolio.is_none()
    }

    /// Escape free text in orders and portfolio items and assign missing
    /// portfolio ids.
    #[must_use]
    pub fn sanitized(self, now: DateTime<Utc>) -> Self {
        Self {
            service_prices: self.service_prices,
            asset_pack_data: self.asset_pack_data,
            orders: self
                .orders
                .map(|orders| orders.into_iter().map(Order::sanitized).collect()),
            portfolio: self.portfolio.map(|items| {
                items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| item.sanitized(now, index))
                    .collect()
            }),
        }
    }

    /// Render the update as a JSON object holding only the present sections
    /// plus `updatedAt`, suitable for a top-level document merge.
    ///
    /// # Errors
    ///
    /// Returns an error if a section fails to serialize.
    pub fn to_patch(&self, now: DateTime<Utc>) -> Result<JsonValue, serde_json::Error> {
        let mut patch = match serde_json::to_value(self)? {
            JsonValue::Object(map) => map,
            _ => Map::new(),
        };
        patch.insert(UPDATED_AT_FIELD.to_string(), serde_json::to_value(now)?);
        Ok(JsonValue::Object(patch))
    }
}
