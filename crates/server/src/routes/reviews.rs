//! Visitor review route handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chrono::Utc;
use gfx_studio_core::{Rating, RatingError, Review};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::middleware::RequireVisitor;
use crate::services::notify::Notification;
use crate::state::AppState;

/// Longest accepted review, in characters, after trimming.
pub const MAX_REVIEW_CHARS: usize = 2000;

const MISSING_FIELDS: &str = "Missing rating or text";

/// Review form submission.
///
/// `rating` stays loosely typed; the form posts either a number or a string.
#[derive(Debug, Default, Deserialize)]
pub struct ReviewSubmission {
    #[serde(default)]
    pub rating: Option<JsonValue>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Response to a successful submission.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub review: Review,
    pub flagged: bool,
}

/// List public reviews, oldest first.
///
/// # Route
///
/// `GET /reviews`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Review>>> {
    let data = state.site().read().await?;
    Ok(Json(data.public_reviews().cloned().collect()))
}

/// Submit a review as the logged-in visitor.
///
/// # Route
///
/// `POST /reviews`
pub async fn submit(
    State(state): State<AppState>,
    RequireVisitor(visitor): RequireVisitor,
    payload: std::result::Result<Json<ReviewSubmission>, JsonRejection>,
) -> Result<Json<SubmitResponse>> {
    let Json(submission) = payload.map_err(|_| AppError::Validation(MISSING_FIELDS.to_string()))?;
    let (rating, text) = validate(&submission)?;

    let review = Review::submit(
        Uuid::new_v4().to_string(),
        &visitor,
        rating,
        text,
        state.denylist(),
        Utc::now(),
    );
    state.site().append_review(&review).await?;

    tracing::info!(
        review_id = %review.id,
        user_id = %review.user_id,
        rating = %rating,
        flagged = review.flagged,
        "review submitted"
    );

    state.notifier().notify(Notification::ReviewSubmitted {
        username: visitor.username,
        rating,
        text: text.to_string(),
        flagged: review.flagged,
    });

    let flagged = review.flagged;
    Ok(Json(SubmitResponse {
        success: true,
        review,
        flagged,
    }))
}

fn validate(submission: &ReviewSubmission) -> Result<(Rating, &str)> {
    let text = submission.text.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::Validation(MISSING_FIELDS.to_string()));
    }
    if text.chars().count() > MAX_REVIEW_CHARS {
        return Err(AppError::Validation(format!(
            "Review must be at most {MAX_REVIEW_CHARS} characters"
        )));
    }

    let rating = Rating::from_json(submission.rating.as_ref()).map_err(|e| match e {
        RatingError::Missing => AppError::Validation(MISSING_FIELDS.to_string()),
        other => AppError::Validation(other.to_string()),
    })?;

    Ok((rating, text))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn submission(rating: JsonValue, text: &str) -> ReviewSubmission {
        ReviewSubmission {
            rating: Some(rating),
            text: Some(text.to_string()),
        }
    }

    #[test]
    fn test_validate_trims_text() {
        let s = submission(json!("4"), "  lovely banner  ");
        let (rating, text) = validate(&s).unwrap();
        assert_eq!(rating.stars(), 4);
        assert_eq!(text, "lovely banner");
    }

    #[test]
    fn test_validate_missing_fields() {
        for s in [
            ReviewSubmission::default(),
            submission(json!(5), "   "),
            ReviewSubmission {
                rating: None,
                text: Some("nice".to_string()),
            },
        ] {
            let err = validate(&s).unwrap_err();
            assert!(matches!(err, AppError::Validation(ref m) if m == MISSING_FIELDS));
        }
    }

    #[test]
    fn test_validate_rejects_bad_rating() {
        assert!(validate(&submission(json!(6), "ok")).is_err());
        assert!(validate(&submission(json!(2.5), "ok")).is_err());
    }

    #[test]
    fn test_validate_length_limit() {
        let long = "a".repeat(MAX_REVIEW_CHARS + 1);
        assert!(validate(&submission(json!(5), &long)).is_err());
        let exact = "é".repeat(MAX_REVIEW_CHARS);
        assert!(validate(&submission(json!(5), &exact)).is_ok());
    }
}
