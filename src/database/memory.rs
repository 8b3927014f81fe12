//! In-process adapters. Rows are kept in insertion order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ListingRepository, ReviewRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::listing::{ApprovalRecord, ApprovalStatus, Listing, ListingFilter};
use crate::models::review::Review;
use crate::models::user::User;

/// Newest first; ties keep the later insertion first.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    out
}

fn take(limit: Option<i64>) -> usize {
    limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0))
}

#[derive(Default)]
pub struct MemoryUsers {
    rows: RwLock<Vec<User>>,
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn insert(&self, user: &User) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::DuplicateEmail);
        }
        rows.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.rows.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<User>> {
        let rows = self.rows.read().await;
        Ok(newest_first(&rows, |u| u.created_at)
            .into_iter()
            .take(take(limit))
            .collect())
    }

    async fn update_profile(&self, user: &User) -> Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|u| u.id == user.id) {
            Some(row) => {
                row.first_name = user.first_name.clone();
                row.last_name = user.last_name.clone();
                row.phone = user.phone.clone();
                row.profile = user.profile.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<Option<User>> {
        let mut rows = self.rows.write().await;
        Ok(rows.iter_mut().find(|u| u.id == id).map(|row| {
            row.active = active;
            row.clone()
        }))
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(row) = self.rows.write().await.iter_mut().find(|u| u.id == id) {
            row.last_login = Some(at);
        }
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.rows.read().await.len() as i64)
    }
}

#[derive(Default)]
pub struct MemoryListings {
    rows: RwLock<Vec<Listing>>,
}

#[async_trait]
impl ListingRepository for MemoryListings {
    async fn insert(&self, listing: &Listing) -> Result<()> {
        self.rows.write().await.push(listing.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Listing>> {
        Ok(self.rows.read().await.iter().find(|l| l.id == id).cloned())
    }

    async fn list(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let rows = self.rows.read().await;
        Ok(newest_first(&rows, |l| l.created_at)
            .into_iter()
            .filter(|l| filter.matches(l))
            .take(take(filter.limit))
            .collect())
    }

    async fn update(&self, listing: &Listing) -> Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|l| l.id == listing.id) {
            Some(row) => {
                // Approval and rating fields are owned by other writers.
                let kept = row.clone();
                *row = Listing {
                    owner_id: kept.owner_id,
                    rating: kept.rating,
                    review_count: kept.review_count,
                    status: kept.status,
                    rejection_reason: kept.rejection_reason,
                    reviewed_by: kept.reviewed_by,
                    reviewed_at: kept.reviewed_at,
                    created_at: kept.created_at,
                    ..listing.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_review(&self, id: Uuid, record: &ApprovalRecord) -> Result<Option<Listing>> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .iter_mut()
            .find(|l| l.id == id && l.status == ApprovalStatus::Pending)
            .map(|row| {
                row.status = record.status;
                row.rejection_reason = record.rejection_reason.clone();
                row.reviewed_by = Some(record.reviewed_by);
                row.reviewed_at = Some(record.reviewed_at);
                row.updated_at = record.reviewed_at;
                row.clone()
            }))
    }

    async fn set_rating(&self, id: Uuid, rating: f64, review_count: i32) -> Result<()> {
        if let Some(row) = self.rows.write().await.iter_mut().find(|l| l.id == id) {
            row.rating = rating;
            row.review_count = review_count;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Listing>> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .iter()
            .position(|l| l.id == id)
            .map(|index| rows.remove(index)))
    }

    async fn count(&self, status: Option<ApprovalStatus>) -> Result<i64> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .count() as i64)
    }
}

#[derive(Default)]
pub struct MemoryReviews {
    rows: RwLock<Vec<Review>>,
}

#[async_trait]
impl ReviewRepository for MemoryReviews {
    async fn insert(&self, review: &Review) -> Result<()> {
        let mut rows = self.rows.write().await;
        if rows
            .iter()
            .any(|r| r.listing_id == review.listing_id && r.user_id == review.user_id)
        {
            return Err(AppError::validation("You have already reviewed this listing"));
        }
        rows.push(review.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>> {
        Ok(self.rows.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_listing(&self, listing_id: Uuid) -> Result<Vec<Review>> {
        let rows = self.rows.read().await;
        Ok(newest_first(&rows, |r| r.created_at)
            .into_iter()
            .filter(|r| r.listing_id == listing_id)
            .collect())
    }

    async fn update(&self, review: &Review) -> Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id == review.id) {
            Some(row) => {
                row.rating = review.rating;
                row.comment = review.comment.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        Ok(rows.len() != before)
    }

    async fn delete_by_listing(&self, listing_id: Uuid) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.listing_id != listing_id);
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::listing::tests::sample_draft;
    use crate::models::listing::Category;

    fn listing(category: Category, price: f64) -> Listing {
        let mut draft = sample_draft();
        draft.category = category;
        draft.price = price;
        Listing::new(Uuid::new_v4(), draft, &["/uploads/x.jpg".to_string()]).unwrap()
    }

    #[tokio::test]
    async fn review_applies_only_while_pending() {
        let store = MemoryListings::default();
        let item = listing(Category::Villa, 100.0);
        store.insert(&item).await.unwrap();

        let record = ApprovalRecord {
            status: ApprovalStatus::Approved,
            rejection_reason: None,
            reviewed_by: Uuid::new_v4(),
            reviewed_at: Utc::now(),
        };
        let reviewed = store.record_review(item.id, &record).await.unwrap().unwrap();
        assert_eq!(reviewed.status, ApprovalStatus::Approved);
        assert_eq!(reviewed.reviewed_by, Some(record.reviewed_by));

        assert!(store.record_review(item.id, &record).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_preserves_approval_fields() {
        let store = MemoryListings::default();
        let item = listing(Category::Villa, 100.0);
        store.insert(&item).await.unwrap();
        store.set_rating(item.id, 4.5, 2).await.unwrap();

        let mut changed = item.clone();
        changed.title = "Renamed".into();
        changed.status = ApprovalStatus::Approved;
        changed.rating = 0.0;
        assert!(store.update(&changed).await.unwrap());

        let stored = store.find_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert_eq!(stored.status, ApprovalStatus::Pending);
        assert_eq!(stored.rating, 4.5);
    }

    #[tokio::test]
    async fn unfiltered_list_is_union_of_category_lists() {
        let store = MemoryListings::default();
        for (category, price) in [
            (Category::Villa, 100.0),
            (Category::Studio, 50.0),
            (Category::Villa, 300.0),
            (Category::ShopOffice, 75.0),
        ] {
            store.insert(&listing(category, price)).await.unwrap();
        }

        let all = store.list(&ListingFilter::default()).await.unwrap();
        let mut union = Vec::new();
        for category in Category::ALL {
            let filter = ListingFilter { category: Some(category), ..Default::default() };
            union.extend(store.list(&filter).await.unwrap().into_iter().map(|l| l.id));
        }

        let mut all_ids: Vec<Uuid> = all.into_iter().map(|l| l.id).collect();
        all_ids.sort();
        union.sort();
        assert_eq!(all_ids, union);
    }

    #[tokio::test]
    async fn unmatched_filter_yields_empty() {
        let store = MemoryListings::default();
        store.insert(&listing(Category::Villa, 100.0)).await.unwrap();

        let filter = ListingFilter { max_price: Some(10.0), ..Default::default() };
        assert!(store.list(&filter).await.unwrap().is_empty());
    }
}
