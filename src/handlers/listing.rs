// src/handlers/listing.rs
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::policy::{self, LISTING_MANAGERS};
use crate::dtos::listing::{ListingQuery, ListingResponse, MessageResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::listing::{ApprovalStatus, ListingFilter};
use crate::state::AppState;
use crate::uploads::form::read_listing_form;

// GET /listings - Public listing search
#[instrument(skip(state))]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingQuery>,
) -> Result<Json<Vec<ListingResponse>>, AppError> {
    let mut filter = query.into_filter()?;
    if state.config.public_listings_require_approval {
        filter.status = Some(ApprovalStatus::Approved);
    }

    let listings = state.listings.list(&filter).await?;
    Ok(Json(listings.into_iter().map(ListingResponse::from).collect()))
}

// GET /listings/my-listings - Caller's own listings, newest first
#[instrument(skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn my_listings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<ListingResponse>>, AppError> {
    policy::require_role(&auth, LISTING_MANAGERS, "manage listings")?;

    let filter = ListingFilter {
        owner_id: Some(auth.user_id),
        ..Default::default()
    };
    let listings = state.listings.list(&filter).await?;
    Ok(Json(listings.into_iter().map(ListingResponse::from).collect()))
}

// GET /listings/:id - Single listing with owner
#[instrument(skip(state), fields(id = %id))]
pub async fn get_listing(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ListingResponse>, AppError> {
    Ok(Json(state.listings.get(id).await?.into()))
}

// POST /listings - Create listing with images (multipart)
#[instrument(skip(state, auth, multipart), fields(user_id = %auth.user_id))]
pub async fn create_listing(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ListingResponse>), AppError> {
    policy::require_role(&auth, LISTING_MANAGERS, "create listings")?;

    let form = read_listing_form(multipart, state.uploads.max_files(), state.uploads.max_file_size()).await?;
    let listing = state.listings.create(auth.user_id, form).await?;
    let hydrated = state.listings.with_owners(vec![listing]).await?;

    let body = hydrated
        .into_iter()
        .next()
        .map(ListingResponse::from)
        .ok_or_else(|| AppError::internal("created listing vanished"))?;
    Ok((StatusCode::CREATED, Json(body)))
}

// PUT /listings/:id - Update listing; new images replace the old set
#[instrument(skip(state, auth, multipart), fields(id = %id, user_id = %auth.user_id))]
pub async fn update_listing(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    multipart: Multipart,
) -> Result<Json<ListingResponse>, AppError> {
    let existing = state.listings.editable(&auth, id).await?;

    let form = read_listing_form(multipart, state.uploads.max_files(), state.uploads.max_file_size()).await?;
    let listing = state.listings.update(existing, form).await?;
    let hydrated = state.listings.with_owners(vec![listing]).await?;

    hydrated
        .into_iter()
        .next()
        .map(|l| Json(ListingResponse::from(l)))
        .ok_or_else(|| AppError::internal("updated listing vanished"))
}

// DELETE /listings/:id - Delete listing and its images
#[instrument(skip(state, auth), fields(id = %id, user_id = %auth.user_id))]
pub async fn delete_listing(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MessageResponse>, AppError> {
    state.listings.delete(&auth, id).await?;
    Ok(Json(MessageResponse::new("Listing deleted successfully")))
}
