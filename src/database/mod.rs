//! Persistence ports and the adapters behind them.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::models::listing::{ApprovalRecord, ApprovalStatus, Listing, ListingFilter};
use crate::models::review::Review;
use crate::models::user::User;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with `DuplicateEmail` if the email is taken.
    async fn insert(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    /// `email` must already be normalized.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>>;
    /// Newest first.
    async fn list(&self, limit: Option<i64>) -> Result<Vec<User>>;
    /// Persist profile fields. Returns `false` if the user no longer exists.
    async fn update_profile(&self, user: &User) -> Result<bool>;
    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>>;
    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()>;
    async fn count(&self) -> Result<i64>;
}

#[async_trait]
pub trait ListingRepository: Send + Sync {
    async fn insert(&self, listing: &Listing) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>>;
    /// Newest first.
    async fn list(&self, filter: &ListingFilter) -> Result<Vec<Listing>>;
    /// Replace owner-editable fields and images. Returns `false` if the listing is gone.
    async fn update(&self, listing: &Listing) -> Result<bool>;
    /// Apply an approval decision only while the listing is still pending.
    async fn record_review(&self, id: Uuid, record: &ApprovalRecord) -> Result<Option<Listing>>;
    async fn set_rating(&self, id: Uuid, rating: f64, review_count: i32) -> Result<()>;
    /// Remove a listing, returning the removed record.
    async fn delete(&self, id: Uuid) -> Result<Option<Listing>>;
    async fn count(&self, status: Option<ApprovalStatus>) -> Result<i64>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review. A second review by the same user on a listing is a validation error.
    async fn insert(&self, review: &Review) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>>;
    /// Newest first.
    async fn find_by_listing(&self, listing_id: Uuid) -> Result<Vec<Review>>;
    async fn update(&self, review: &Review) -> Result<bool>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
    async fn delete_by_listing(&self, listing_id: Uuid) -> Result<u64>;
}

/// Every store the service needs, behind their ports.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub listings: Arc<dyn ListingRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUsers::default()),
            listings: Arc::new(memory::MemoryListings::default()),
            reviews: Arc::new(memory::MemoryReviews::default()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserRepository::new(pool.clone())),
            listings: Arc::new(postgres::PgListingRepository::new(pool.clone())),
            reviews: Arc::new(postgres::PgReviewRepository::new(pool)),
        }
    }

    /// Open the store named by `DATABASE_URL`, running migrations for PostgreSQL.
    pub async fn connect(config: &Config) -> Result<Self> {
        if config.uses_memory_store() {
            tracing::warn!("using in-memory store; data is lost on shutdown");
            return Ok(Self::in_memory());
        }

        let pool = postgres::create_pool(&config.database_url, config.database_pool_size).await?;
        Ok(Self::postgres(pool))
    }
}
