// src/handlers/admin.rs
//
// Every route here sits behind `require_auth` and `require_admin`.
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::dtos::admin::{ApprovalRequest, DashboardResponse, StatusRequest};
use crate::dtos::listing::{ListingResponse, MessageResponse};
use crate::dtos::user::UserResponse;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::listing::{ApprovalStatus, ListingFilter};
use crate::state::AppState;

const RECENT_LIMIT: i64 = 5;

// GET /admin/dashboard - Totals plus the most recent listings and users
#[instrument(skip(state))]
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, AppError> {
    let recent = ListingFilter {
        limit: Some(RECENT_LIMIT),
        ..Default::default()
    };

    let (total_listings, pending_listings, total_users, recent_listings, recent_users) = tokio::try_join!(
        state.listings.count(None),
        state.listings.count(Some(ApprovalStatus::Pending)),
        state.identity.count(),
        state.listings.list(&recent),
        state.identity.list(Some(RECENT_LIMIT)),
    )?;

    Ok(Json(DashboardResponse {
        total_listings,
        total_users,
        pending_listings,
        recent_listings: recent_listings.into_iter().map(ListingResponse::from).collect(),
        recent_users: recent_users.into_iter().map(UserResponse::from).collect(),
    }))
}

// GET /admin/listings - All listings, any status
#[instrument(skip(state))]
pub async fn list_all_listings(
    State(state): State<AppState>,
) -> Result<Json<Vec<ListingResponse>>, AppError> {
    let listings = state.listings.list(&ListingFilter::default()).await?;
    Ok(Json(listings.into_iter().map(ListingResponse::from).collect()))
}

// PATCH /admin/listings/:id/approval - Approve or reject a pending listing
#[instrument(skip(state, auth, payload), fields(id = %id, admin = %auth.user_id))]
pub async fn review_listing(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<ApprovalRequest>,
) -> Result<Json<ListingResponse>, AppError> {
    let listing = state
        .approvals
        .review(&auth, id, payload.into_decision()?)
        .await?;
    let hydrated = state.listings.with_owners(vec![listing]).await?;

    hydrated
        .into_iter()
        .next()
        .map(|l| Json(ListingResponse::from(l)))
        .ok_or_else(|| AppError::internal("reviewed listing vanished"))
}

// DELETE /admin/listings/:id - Remove any listing and its images
#[instrument(skip(state, auth), fields(id = %id, admin = %auth.user_id))]
pub async fn delete_listing(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MessageResponse>, AppError> {
    state.listings.delete(&auth, id).await?;
    Ok(Json(MessageResponse::new("Listing deleted successfully")))
}

// GET /admin/users - All users, newest first
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.identity.list(None).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

// PATCH /admin/users/:id/status - Activate or deactivate an account
#[instrument(skip(state, auth, payload), fields(id = %id, admin = %auth.user_id))]
pub async fn set_user_status(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.identity.set_active(auth.user_id, id, payload.active).await?;
    Ok(Json(user.into()))
}
