//! Commission orders managed from the admin panel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Price, status::OrderStatus};
use crate::sanitize::{escape_html, escape_optional};

/// A commission order.
///
/// All text fields are entered by hand in the admin panel and rendered back
/// into it, so they are HTML-escaped before persistence via [`Order::sanitized`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Customer's Discord handle.
    #[serde(default)]
    pub discord: String,
    #[serde(default)]
    pub email: String,
    /// Which service was ordered (a key of `servicePrices`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Reference links or notes supplied by the customer.
    #[serde(default)]
    pub references: String,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Return a copy with every free-text field HTML-escaped.
    #[must_use]
    pub fn sanitized(self) -> Self {
        Self {
            id: escape_optional(self.id.as_deref()),
            discord: escape_html(&self.discord),
            email: escape_html(&self.email),
            service: escape_optional(self.service.as_deref()),
            description: escape_html(&self.description),
            references: escape_html(&self.references),
            status: self.status,
            price: self.price,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_escapes_free_text() {
        let order = Order {
            discord: "<b>user</b>".to_string(),
            email: "a@b.c".to_string(),
            description: "<script>alert(1)</script>".to_string(),
            references: "https://x.test/?a=1&b=2".to_string(),
            service: Some("logo\"".to_string()),
            ..Order::default()
        }
        .sanitized();

        assert_eq!(order.discord, "&lt;b&gt;user&lt;/b&gt;");
        assert_eq!(order.email, "a@b.c");
        assert_eq!(order.description, "&lt;script&gt;alert(1)&lt;/script&gt;");
        assert_eq!(order.references, "https://x.test/?a=1&amp;b=2");
        assert_eq!(order.service.as_deref(), Some("logo&quot;"));
    }

    #[test]
    fn test_deserialize_minimal_order() {
        let order: Order =
            serde_json::from_str(r#"{"discord":"kit#1","description":"banner"}"#).unwrap();
        assert_eq!(order.discord, "kit#1");
        assert_eq!(order.email, "");
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.price.is_none());
    }

    #[test]
    fn test_optional_fields_not_serialized() {
        let json = serde_json::to_value(Order::default()).unwrap();
        assert!(json.get("id").is_none());
        assert!(json.get("price").is_none());
        assert_eq!(json["status"], "pending");
    }
}
