//! Listing lifecycle.
//!
//! Files are staged before the record is written. Whenever a step after
//! staging fails, the staged files are discarded before the error propagates,
//! so no listing references a missing file and no staged file outlives a
//! failed request. Files made obsolete by an update or delete are removed only
//! after the record change has been committed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::policy;
use crate::database::{ListingRepository, ReviewRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthContext;
use crate::models::listing::{ApprovalStatus, Listing, ListingFilter};
use crate::uploads::form::{FormFields, ListingForm, ListingInput};
use crate::uploads::UploadStore;

/// The slice of the owner shown alongside a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingWithOwner {
    pub listing: Listing,
    pub owner: Option<OwnerSummary>,
}

#[derive(Clone)]
pub struct ListingService {
    listings: Arc<dyn ListingRepository>,
    users: Arc<dyn UserRepository>,
    reviews: Arc<dyn ReviewRepository>,
    uploads: UploadStore,
}

impl ListingService {
    pub fn new(
        listings: Arc<dyn ListingRepository>,
        users: Arc<dyn UserRepository>,
        reviews: Arc<dyn ReviewRepository>,
        uploads: UploadStore,
    ) -> Self {
        Self { listings, users, reviews, uploads }
    }

    /// Create a pending listing owned by `owner_id` from a submitted form.
    #[instrument(skip(self, form), fields(files = form.files.len()))]
    pub async fn create(&self, owner_id: Uuid, form: ListingForm) -> Result<Listing> {
        if form.files.is_empty() {
            return Err(AppError::validation("Please upload at least one image"));
        }

        let staged = self.uploads.stage(form.files).await?;
        match self.commit_new(owner_id, &form.fields, &staged).await {
            Ok(listing) => {
                info!(listing_id = %listing.id, images = staged.len(), "listing created");
                Ok(listing)
            }
            Err(e) => {
                self.uploads.discard(&staged, "listing create rolled back").await;
                Err(e)
            }
        }
    }

    async fn commit_new(
        &self,
        owner_id: Uuid,
        fields: &FormFields,
        images: &[String],
    ) -> Result<Listing> {
        let draft = ListingInput::from_fields(fields)?.into_draft()?;
        let listing = Listing::new(owner_id, draft, images)
            .ok_or_else(|| AppError::validation("Please upload at least one image"))?;
        self.listings.insert(&listing).await?;
        Ok(listing)
    }

    /// Load a listing the caller may modify.
    pub async fn editable(&self, auth: &AuthContext, id: Uuid) -> Result<Listing> {
        let listing = self.find(id).await?;
        policy::require_owner_or_admin(auth, listing.owner_id, "modify this listing")?;
        Ok(listing)
    }

    /// Apply submitted fields to `existing`. New files, if any, replace all current images.
    #[instrument(skip(self, existing, form), fields(listing_id = %existing.id, files = form.files.len()))]
    pub async fn update(&self, mut existing: Listing, form: ListingForm) -> Result<Listing> {
        let staged = if form.files.is_empty() {
            Vec::new()
        } else {
            self.uploads.stage(form.files).await?
        };

        let outcome: Result<Vec<String>> = async {
            let draft = ListingInput::from_fields(&form.fields)?.merge_into(existing.draft())?;
            existing.apply(draft);
            let replaced = if staged.is_empty() {
                Vec::new()
            } else {
                existing.replace_images(&staged)
            };
            existing.updated_at = Utc::now();

            if !self.listings.update(&existing).await? {
                return Err(AppError::not_found("Listing not found"));
            }
            Ok(replaced)
        }
        .await;

        match outcome {
            Ok(replaced) => {
                if !replaced.is_empty() {
                    self.uploads.discard(&replaced, "listing images replaced").await;
                }
                info!(listing_id = %existing.id, "listing updated");
                Ok(existing)
            }
            Err(e) => {
                if !staged.is_empty() {
                    self.uploads.discard(&staged, "listing update rolled back").await;
                }
                Err(e)
            }
        }
    }

    /// Remove the record, then its reviews and files. Once the record is gone,
    /// cleanup failures are logged and never fail the call.
    #[instrument(skip(self, auth), fields(actor = %auth.user_id))]
    pub async fn delete(&self, auth: &AuthContext, id: Uuid) -> Result<()> {
        self.editable(auth, id).await?;

        let removed = self
            .listings
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("Listing not found"))?;
        let reviews = match self.reviews.delete_by_listing(id).await {
            Ok(n) => n,
            Err(e) => {
                warn!(listing_id = %id, error = %e, "failed to delete reviews of removed listing");
                0
            }
        };
        let report = self.uploads.discard(&removed.image_paths(), "listing deleted").await;

        info!(
            listing_id = %id,
            reviews,
            files_removed = report.removed,
            files_failed = report.failed.len(),
            "listing deleted"
        );
        Ok(())
    }

    pub async fn find(&self, id: Uuid) -> Result<Listing> {
        self.listings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Listing not found"))
    }

    pub async fn get(&self, id: Uuid) -> Result<ListingWithOwner> {
        let listing = self.find(id).await?;
        let mut hydrated = self.with_owners(vec![listing]).await?;
        hydrated
            .pop()
            .ok_or_else(|| AppError::internal("hydration dropped a listing"))
    }

    pub async fn list(&self, filter: &ListingFilter) -> Result<Vec<ListingWithOwner>> {
        let listings = self.listings.list(filter).await?;
        self.with_owners(listings).await
    }

    pub async fn count(&self, status: Option<ApprovalStatus>) -> Result<i64> {
        self.listings.count(status).await
    }

    /// Attach owner summaries with a single user lookup.
    pub async fn with_owners(&self, listings: Vec<Listing>) -> Result<Vec<ListingWithOwner>> {
        let mut ids: Vec<Uuid> = listings.iter().map(|l| l.owner_id).collect();
        ids.sort();
        ids.dedup();

        let owners: HashMap<Uuid, OwnerSummary> = self
            .users
            .find_many(&ids)
            .await?
            .into_iter()
            .map(|u| {
                (
                    u.id,
                    OwnerSummary {
                        id: u.id,
                        username: u.username,
                        email: u.email,
                    },
                )
            })
            .collect();

        Ok(listings
            .into_iter()
            .map(|listing| {
                let owner = owners.get(&listing.owner_id).cloned();
                ListingWithOwner { listing, owner }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Repositories;
    use crate::models::review::Review;
    use crate::models::user::Role;
    use crate::uploads::IncomingFile;
    use axum::body::Bytes;

    struct Fixture {
        service: ListingService,
        dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let repos = Repositories::in_memory();
        let service = ListingService::new(
            repos.listings,
            repos.users,
            repos.reviews,
            UploadStore::new(dir.path(), 1024, 10),
        );
        Fixture { service, dir }
    }

    fn file_count(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    fn ctx(role: Role) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            username: "someone".into(),
            email: "someone@example.com".into(),
        }
    }

    fn images(n: usize) -> Vec<IncomingFile> {
        (0..n)
            .map(|i| IncomingFile {
                file_name: Some(format!("{i}.jpg")),
                content_type: Some("image/jpeg".into()),
                bytes: Bytes::from_static(b"jpeg"),
            })
            .collect()
    }

    fn valid_fields() -> FormFields {
        let mut fields = FormFields::default();
        for (k, v) in [
            ("title", "Loft"),
            ("description", "Bright loft"),
            ("price", "1200"),
            (
                "location",
                r#"{"address":"12 Mill Road","area":"Riverside","city":"Pune","state":"MH","pinCode":"411001"}"#,
            ),
            ("category", "Apartment"),
            ("bedrooms", "1"),
            ("bathrooms", "1"),
            ("area", "650"),
            ("amenities", "wifi"),
        ] {
            fields.push(k, v);
        }
        fields
    }

    fn form(fields: FormFields, files: usize) -> ListingForm {
        ListingForm { fields, files: images(files) }
    }

    #[tokio::test]
    async fn failed_validation_leaves_no_staged_files() {
        let fx = fixture();
        let mut bad = FormFields::default();
        for key in ["title", "description", "location", "category", "bedrooms", "bathrooms", "area"] {
            bad.push(key, valid_fields().get(key).unwrap());
        }
        bad.push("price", "-1");

        let err = fx.service.create(Uuid::new_v4(), form(bad, 3)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(file_count(&fx.dir), 0);
        assert!(fx.service.list(&ListingFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_images_creates_nothing() {
        let fx = fixture();
        let err = fx.service.create(Uuid::new_v4(), form(valid_fields(), 0)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(fx.service.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_without_files_keeps_images() {
        let fx = fixture();
        let owner = ctx(Role::Owner);
        let created = fx.service.create(owner.user_id, form(valid_fields(), 2)).await.unwrap();

        let mut change = FormFields::default();
        change.push("title", "Renamed loft");
        let existing = fx.service.editable(&owner, created.id).await.unwrap();
        let updated = fx.service.update(existing, form(change, 0)).await.unwrap();

        assert_eq!(updated.title, "Renamed loft");
        assert_eq!(updated.image_paths(), created.image_paths());
        assert_eq!(updated.status, ApprovalStatus::Pending);
        assert_eq!(file_count(&fx.dir), 2);
    }

    #[tokio::test]
    async fn update_with_files_replaces_old_ones() {
        let fx = fixture();
        let owner = ctx(Role::Owner);
        let created = fx.service.create(owner.user_id, form(valid_fields(), 2)).await.unwrap();

        let existing = fx.service.editable(&owner, created.id).await.unwrap();
        let updated = fx.service.update(existing, form(FormFields::default(), 1)).await.unwrap();

        assert_eq!(updated.additional_images.0.len(), 0);
        assert_ne!(updated.image, created.image);
        assert_eq!(file_count(&fx.dir), 1);
    }

    #[tokio::test]
    async fn invalid_update_rolls_back_new_files_and_keeps_old() {
        let fx = fixture();
        let owner = ctx(Role::Owner);
        let created = fx.service.create(owner.user_id, form(valid_fields(), 1)).await.unwrap();

        let mut change = FormFields::default();
        change.push("bedrooms", "-3");
        let existing = fx.service.editable(&owner, created.id).await.unwrap();
        assert!(fx.service.update(existing, form(change, 2)).await.is_err());

        assert_eq!(file_count(&fx.dir), 1);
        let stored = fx.service.find(created.id).await.unwrap();
        assert_eq!(stored.image, created.image);
        assert_eq!(stored.bedrooms, 1);
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_modify() {
        let fx = fixture();
        let owner = ctx(Role::Owner);
        let created = fx.service.create(owner.user_id, form(valid_fields(), 1)).await.unwrap();

        for actor in [ctx(Role::Owner), ctx(Role::Tenant)] {
            assert!(matches!(
                fx.service.delete(&actor, created.id).await,
                Err(AppError::Forbidden(_))
            ));
        }
        assert!(fx.service.editable(&ctx(Role::Admin), created.id).await.is_ok());

        fx.service.delete(&owner, created.id).await.unwrap();
        assert_eq!(file_count(&fx.dir), 0);
        assert!(matches!(fx.service.find(created.id).await, Err(AppError::NotFound(_))));
    }

    struct BrokenReviews;

    #[async_trait::async_trait]
    impl ReviewRepository for BrokenReviews {
        async fn insert(&self, _: &Review) -> Result<()> {
            Err(broken())
        }
        async fn find_by_id(&self, _: Uuid) -> Result<Option<Review>> {
            Err(broken())
        }
        async fn find_by_listing(&self, _: Uuid) -> Result<Vec<Review>> {
            Err(broken())
        }
        async fn update(&self, _: &Review) -> Result<bool> {
            Err(broken())
        }
        async fn delete(&self, _: Uuid) -> Result<bool> {
            Err(broken())
        }
        async fn delete_by_listing(&self, _: Uuid) -> Result<u64> {
            Err(broken())
        }
    }

    fn broken() -> AppError {
        AppError::Persistence(sqlx::Error::PoolTimedOut)
    }

    #[tokio::test]
    async fn review_cleanup_failure_still_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let repos = Repositories::in_memory();
        let service = ListingService::new(
            repos.listings,
            repos.users,
            Arc::new(BrokenReviews),
            UploadStore::new(dir.path(), 1024, 10),
        );
        let owner = ctx(Role::Owner);
        let created = service.create(owner.user_id, form(valid_fields(), 2)).await.unwrap();
        assert_eq!(file_count(&dir), 2);

        service.delete(&owner, created.id).await.unwrap();
        assert_eq!(file_count(&dir), 0);
        assert!(matches!(service.find(created.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_succeeds_when_files_are_already_gone() {
        let fx = fixture();
        let owner = ctx(Role::Owner);
        let created = fx.service.create(owner.user_id, form(valid_fields(), 2)).await.unwrap();
        for entry in std::fs::read_dir(fx.dir.path()).unwrap() {
            std::fs::remove_file(entry.unwrap().path()).unwrap();
        }

        fx.service.delete(&owner, created.id).await.unwrap();
        assert_eq!(fx.service.count(None).await.unwrap(), 0);
    }
}
