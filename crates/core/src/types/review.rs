//! Visitor reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Rating, VisitorIdentity};
use crate::moderation::Denylist;
use crate::sanitize::{escape_html, escape_optional};

/// A review left by a logged-in visitor.
///
/// Reviews are immutable once created. `flagged` is decided once, at
/// submission, and flagged reviews are only ever shown to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub rating: Rating,
    pub text: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub flagged: bool,
}

impl Review {
    /// Create a review from a visitor submission.
    ///
    /// Moderation runs on the raw text; the stored text and author fields are
    /// HTML-escaped.
    #[must_use]
    pub fn submit(
        id: String,
        author: &VisitorIdentity,
        rating: Rating,
        text: &str,
        denylist: &Denylist,
        now: DateTime<Utc>,
    ) -> Self {
        let flagged = denylist.classify(text);
        Self {
            id,
            user_id: author.id.clone(),
            username: escape_html(&author.username),
            avatar: escape_optional(author.avatar.as_deref()),
            rating,
            text: escape_html(text),
            date: now,
            flagged,
        }
    }

    /// Whether the review may appear in the public listing.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        !self.flagged
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn author() -> VisitorIdentity {
        VisitorIdentity {
            id: "80351110224678912".to_string(),
            username: "nelly".to_string(),
            avatar: Some("8342729096ea3675442027381ff50dfe".to_string()),
        }
    }

    #[test]
    fn test_submit_clean_review() {
        let review = Review::submit(
            "r1".to_string(),
            &author(),
            Rating::try_from(5).unwrap(),
            "amazing work, 10/10",
            &Denylist::default(),
            Utc::now(),
        );
        assert!(!review.flagged);
        assert!(review.is_public());
        assert_eq!(review.user_id, "80351110224678912");
    }

    #[test]
    fn test_submit_flagged_review() {
        let review = Review::submit(
            "r2".to_string(),
            &author(),
            Rating::try_from(1).unwrap(),
            "this was a scam",
            &Denylist::default(),
            Utc::now(),
        );
        assert!(review.flagged);
        assert!(!review.is_public());
    }

    #[test]
    fn test_text_escaped_after_classification() {
        let review = Review::submit(
            "r3".to_string(),
            &author(),
            Rating::try_from(4).unwrap(),
            "<img src=x onerror=alert(1)> awful",
            &Denylist::default(),
            Utc::now(),
        );
        assert!(review.flagged);
        assert!(review.text.starts_with("&lt;img"));
    }

    #[test]
    fn test_camel_case_wire_format() {
        let review = Review::submit(
            "r4".to_string(),
            &author(),
            Rating::try_from(3).unwrap(),
            "ok",
            &Denylist::default(),
            Utc::now(),
        );
        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["userId"], "80351110224678912");
        assert_eq!(json["rating"], 3);
        assert_eq!(json["flagged"], false);
    }
}
