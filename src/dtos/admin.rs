use serde::{Deserialize, Serialize};

use crate::dtos::listing::ListingResponse;
use crate::dtos::user::UserResponse;
use crate::error::AppError;
use crate::models::listing::ApprovalStatus;
use crate::services::approval::Decision;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApprovalRequest {
    pub status: String,
    pub rejection_reason: Option<String>,
}

impl ApprovalRequest {
    pub fn into_decision(self) -> Result<Decision, AppError> {
        let status: ApprovalStatus = self
            .status
            .parse()
            .map_err(|_| AppError::validation("status must be either approved or rejected"))?;
        Decision::new(status, self.rejection_reason)
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_listings: i64,
    pub total_users: i64,
    pub pending_listings: i64,
    pub recent_listings: Vec<ListingResponse>,
    pub recent_users: Vec<UserResponse>,
}
