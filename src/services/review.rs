use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::policy;
use crate::database::{ListingRepository, ReviewRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthContext;
use crate::models::review::{aggregate, Review};

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewWithAuthor {
    pub review: Review,
    pub username: Option<String>,
}

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    listings: Arc<dyn ListingRepository>,
    users: Arc<dyn UserRepository>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository>,
        listings: Arc<dyn ListingRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { reviews, listings, users }
    }

    pub async fn for_listing(&self, listing_id: Uuid) -> Result<Vec<ReviewWithAuthor>> {
        self.ensure_listing(listing_id).await?;
        let reviews = self.reviews.find_by_listing(listing_id).await?;
        self.with_authors(reviews).await
    }

    #[instrument(skip(self, auth, comment), fields(user = %auth.user_id))]
    pub async fn create(
        &self,
        auth: &AuthContext,
        listing_id: Uuid,
        rating: i32,
        comment: String,
    ) -> Result<ReviewWithAuthor> {
        self.ensure_listing(listing_id).await?;

        let review = Review {
            id: Uuid::new_v4(),
            listing_id,
            user_id: auth.user_id,
            rating,
            comment: comment.trim().to_string(),
            created_at: Utc::now(),
        };
        self.reviews.insert(&review).await?;
        self.refresh_rating(listing_id).await?;

        info!(review_id = %review.id, %listing_id, "review created");
        Ok(ReviewWithAuthor {
            review,
            username: Some(auth.username.clone()),
        })
    }

    #[instrument(skip(self, auth, comment), fields(user = %auth.user_id))]
    pub async fn update(
        &self,
        auth: &AuthContext,
        id: Uuid,
        rating: Option<i32>,
        comment: Option<String>,
    ) -> Result<ReviewWithAuthor> {
        let mut review = self.editable(auth, id).await?;
        if let Some(rating) = rating {
            review.rating = rating;
        }
        if let Some(comment) = comment {
            review.comment = comment.trim().to_string();
        }

        if !self.reviews.update(&review).await? {
            return Err(AppError::not_found("Review not found"));
        }
        self.refresh_rating(review.listing_id).await?;

        let mut hydrated = self.with_authors(vec![review]).await?;
        hydrated
            .pop()
            .ok_or_else(|| AppError::internal("hydration dropped a review"))
    }

    #[instrument(skip(self, auth), fields(user = %auth.user_id))]
    pub async fn delete(&self, auth: &AuthContext, id: Uuid) -> Result<()> {
        let review = self.editable(auth, id).await?;
        if !self.reviews.delete(id).await? {
            return Err(AppError::not_found("Review not found"));
        }
        self.refresh_rating(review.listing_id).await
    }

    async fn editable(&self, auth: &AuthContext, id: Uuid) -> Result<Review> {
        let review = self
            .reviews
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Review not found"))?;
        policy::require_owner_or_admin(auth, review.user_id, "modify this review")?;
        Ok(review)
    }

    async fn ensure_listing(&self, listing_id: Uuid) -> Result<()> {
        match self.listings.find_by_id(listing_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("Listing not found")),
        }
    }

    /// Recompute the cached rating and count on the listing.
    async fn refresh_rating(&self, listing_id: Uuid) -> Result<()> {
        let ratings: Vec<i32> = self
            .reviews
            .find_by_listing(listing_id)
            .await?
            .iter()
            .map(|r| r.rating)
            .collect();
        let (rating, count) = aggregate(&ratings);
        self.listings.set_rating(listing_id, rating, count).await
    }

    async fn with_authors(&self, reviews: Vec<Review>) -> Result<Vec<ReviewWithAuthor>> {
        let mut ids: Vec<Uuid> = reviews.iter().map(|r| r.user_id).collect();
        ids.sort();
        ids.dedup();
        let names: HashMap<Uuid, String> = self
            .users
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        Ok(reviews
            .into_iter()
            .map(|review| {
                let username = names.get(&review.user_id).cloned();
                ReviewWithAuthor { review, username }
            })
            .collect())
    }
}
