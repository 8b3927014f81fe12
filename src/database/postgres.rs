//! PostgreSQL adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Error as SqlxError, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{ListingRepository, ReviewRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::listing::{ApprovalRecord, ApprovalStatus, Listing, ListingFilter};
use crate::models::review::Review;
use crate::models::user::User;

const UNIQUE_VIOLATION: &str = "23505";

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, phone, \
     role, active, profile, created_at, last_login";

const LISTING_COLUMNS: &str = "id, owner_id, title, description, price, location, category, \
     rent_type, bedrooms, bathrooms, area, furnished, image, additional_images, amenities, \
     features, nearby_places, available, rating, review_count, status, rejection_reason, \
     reviewed_by, reviewed_at, created_at, updated_at";

const REVIEW_COLUMNS: &str = "id, listing_id, user_id, rating, comment, created_at";

/// Connect to PostgreSQL and apply pending migrations.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(|e| AppError::internal(format!("Migration failed: {e}")))?;

    tracing::info!(max_connections, "postgres connected");
    Ok(pool)
}

fn is_unique_violation(err: &SqlxError) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, first_name, last_name, phone, \
             role, active, profile, created_at, last_login)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role)
        .bind(user.active)
        .bind(&user.profile)
        .bind(user.created_at)
        .bind(user.last_login)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateEmail
            } else {
                AppError::Persistence(e)
            }
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn update_profile(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET first_name = $1, last_name = $2, phone = $3, profile = $4 WHERE id = $5",
        )
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.profile)
        .bind(user.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET active = $1 WHERE id = $2 RETURNING {USER_COLUMNS}"
        ))
        .bind(active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[derive(Clone)]
pub struct PgListingRepository {
    pool: PgPool,
}

impl PgListingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingRepository for PgListingRepository {
    async fn insert(&self, listing: &Listing) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO listings ({LISTING_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
             $18, $19, $20, $21, $22, $23, $24, $25, $26)"
        ))
        .bind(listing.id)
        .bind(listing.owner_id)
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&listing.location)
        .bind(listing.category)
        .bind(listing.rent_type)
        .bind(listing.bedrooms)
        .bind(listing.bathrooms)
        .bind(listing.area)
        .bind(listing.furnished)
        .bind(&listing.image)
        .bind(&listing.additional_images)
        .bind(&listing.amenities)
        .bind(&listing.features)
        .bind(&listing.nearby_places)
        .bind(listing.available)
        .bind(listing.rating)
        .bind(listing.review_count)
        .bind(listing.status)
        .bind(&listing.rejection_reason)
        .bind(listing.reviewed_by)
        .bind(listing.reviewed_at)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(listing)
    }

    async fn list(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {LISTING_COLUMNS} FROM listings WHERE TRUE"));

        if let Some(category) = filter.category {
            query.push(" AND category = ").push_bind(category);
        }
        if let Some(rent_type) = filter.rent_type {
            query.push(" AND rent_type = ").push_bind(rent_type);
        }
        if let Some(furnished) = filter.furnished {
            query.push(" AND furnished = ").push_bind(furnished);
        }
        if let Some(min_price) = filter.min_price {
            query.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            query.push(" AND price <= ").push_bind(max_price);
        }
        if let Some(owner_id) = filter.owner_id {
            query.push(" AND owner_id = ").push_bind(owner_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status);
        }
        query.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }

        let listings = query.build_query_as::<Listing>().fetch_all(&self.pool).await?;
        Ok(listings)
    }

    async fn update(&self, listing: &Listing) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE listings SET
                title = $1, description = $2, price = $3, location = $4, category = $5,
                rent_type = $6, bedrooms = $7, bathrooms = $8, area = $9, furnished = $10,
                image = $11, additional_images = $12, amenities = $13, features = $14,
                nearby_places = $15, available = $16, updated_at = $17
             WHERE id = $18",
        )
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(listing.price)
        .bind(&listing.location)
        .bind(listing.category)
        .bind(listing.rent_type)
        .bind(listing.bedrooms)
        .bind(listing.bathrooms)
        .bind(listing.area)
        .bind(listing.furnished)
        .bind(&listing.image)
        .bind(&listing.additional_images)
        .bind(&listing.amenities)
        .bind(&listing.features)
        .bind(&listing.nearby_places)
        .bind(listing.available)
        .bind(listing.updated_at)
        .bind(listing.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_review(&self, id: Uuid, record: &ApprovalRecord) -> Result<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            "UPDATE listings
             SET status = $1, rejection_reason = $2, reviewed_by = $3, reviewed_at = $4, updated_at = $4
             WHERE id = $5 AND status = 'pending'
             RETURNING {LISTING_COLUMNS}"
        ))
        .bind(record.status)
        .bind(&record.rejection_reason)
        .bind(record.reviewed_by)
        .bind(record.reviewed_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(listing)
    }

    async fn set_rating(&self, id: Uuid, rating: f64, review_count: i32) -> Result<()> {
        sqlx::query("UPDATE listings SET rating = $1, review_count = $2 WHERE id = $3")
            .bind(rating)
            .bind(review_count)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Listing>> {
        let listing = sqlx::query_as::<_, Listing>(&format!(
            "DELETE FROM listings WHERE id = $1 RETURNING {LISTING_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(listing)
    }

    async fn count(&self, status: Option<ApprovalStatus>) -> Result<i64> {
        let count = match status {
            Some(status) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM listings WHERE status = $1")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM listings")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }
}

#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn insert(&self, review: &Review) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6)"
        ))
        .bind(review.id)
        .bind(review.listing_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::validation("You have already reviewed this listing")
            } else {
                AppError::Persistence(e)
            }
        })?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn find_by_listing(&self, listing_id: Uuid) -> Result<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE listing_id = $1 ORDER BY created_at DESC"
        ))
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    async fn update(&self, review: &Review) -> Result<bool> {
        let result = sqlx::query("UPDATE reviews SET rating = $1, comment = $2 WHERE id = $3")
            .bind(review.rating)
            .bind(&review.comment)
            .bind(review.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_listing(&self, listing_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM reviews WHERE listing_id = $1")
            .bind(listing_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
