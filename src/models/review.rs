use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Mean rating rounded to one decimal, with the review count.
pub fn aggregate(ratings: &[i32]) -> (f64, i32) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let total: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = total as f64 / ratings.len() as f64;
    ((mean * 10.0).round() / 10.0, ratings.len() as i32)
}
