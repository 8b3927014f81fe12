use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::policy;
use crate::database::ListingRepository;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthContext;
use crate::models::listing::{ApprovalRecord, ApprovalStatus, Listing};

/// An admin's verdict on a pending listing.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Approve,
    Reject { reason: String },
}

impl Decision {
    /// Rejection needs a non-blank reason; `pending` is not a decision.
    pub fn new(status: ApprovalStatus, reason: Option<String>) -> Result<Self> {
        match status {
            ApprovalStatus::Approved => Ok(Decision::Approve),
            ApprovalStatus::Rejected => match reason.map(|r| r.trim().to_string()) {
                Some(reason) if !reason.is_empty() => Ok(Decision::Reject { reason }),
                _ => Err(AppError::validation("A rejection reason is required")),
            },
            ApprovalStatus::Pending => Err(AppError::validation(
                "status must be either approved or rejected",
            )),
        }
    }

    fn into_record(self, reviewer: Uuid) -> ApprovalRecord {
        let (status, rejection_reason) = match self {
            Decision::Approve => (ApprovalStatus::Approved, None),
            Decision::Reject { reason } => (ApprovalStatus::Rejected, Some(reason)),
        };
        ApprovalRecord {
            status,
            rejection_reason,
            reviewed_by: reviewer,
            reviewed_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct ApprovalService {
    listings: Arc<dyn ListingRepository>,
}

impl ApprovalService {
    pub fn new(listings: Arc<dyn ListingRepository>) -> Self {
        Self { listings }
    }

    /// Move a pending listing to approved or rejected.
    #[instrument(skip(self, auth), fields(admin = %auth.user_id))]
    pub async fn review(&self, auth: &AuthContext, id: Uuid, decision: Decision) -> Result<Listing> {
        policy::require_admin(auth)?;

        let current = self
            .listings
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Listing not found"))?;
        if current.status != ApprovalStatus::Pending {
            return Err(already_reviewed());
        }

        // Applies only if still pending, so two admins cannot both win.
        let record = decision.into_record(auth.user_id);
        let listing = self
            .listings
            .record_review(id, &record)
            .await?
            .ok_or_else(already_reviewed)?;

        info!(listing_id = %id, status = ?listing.status, "listing reviewed");
        Ok(listing)
    }
}

fn already_reviewed() -> AppError {
    AppError::validation("Listing has already been reviewed")
}
