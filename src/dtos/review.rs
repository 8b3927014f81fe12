use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::services::review::ReviewWithAuthor;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub listing_id: Uuid,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[serde(default)]
    #[validate(length(max = 2000, message = "Comment is too long"))]
    pub comment: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    #[validate(length(max = 2000, message = "Comment is too long"))]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewerResponse {
    pub id: Uuid,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub user: ReviewerResponse,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewWithAuthor> for ReviewResponse {
    fn from(ReviewWithAuthor { review, username }: ReviewWithAuthor) -> Self {
        Self {
            id: review.id,
            listing_id: review.listing_id,
            rating: review.rating,
            comment: review.comment,
            user: ReviewerResponse { id: review.user_id, username },
            created_at: review.created_at,
        }
    }
}
