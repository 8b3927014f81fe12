// src/handlers/user.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::policy;
use crate::dtos::user::{AuthResponse, LoginRequest, SignupRequest, UpdateUserRequest, UserResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

// POST /auth/signup - Register and sign in
#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = state.identity.create(payload.into_new_user()?).await?;
    let token = state.tokens.issue(&user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse { token, user: user.into() }),
    ))
}

// POST /auth/login - Exchange credentials for a token
#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state.identity.verify(&payload.email, &payload.password).await?;
    let token = state.tokens.issue(&user)?;

    Ok(Json(AuthResponse { token, user: user.into() }))
}

// GET /auth/me - Current user's profile
#[instrument(skip(state, auth), fields(user_id = %auth.user_id))]
pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.identity.get(auth.user_id).await?;
    Ok(Json(user.into()))
}

// GET /users/:id - Profile of self, or anyone for admins
#[instrument(skip(state, auth), fields(id = %id))]
pub async fn get_user(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    policy::require_owner_or_admin(&auth, id, "view this profile")?;
    let user = state.identity.get(id).await?;
    Ok(Json(user.into()))
}

// PUT /users/:id - Update profile fields
#[instrument(skip(state, auth, payload), fields(id = %id))]
pub async fn update_user(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    policy::require_owner_or_admin(&auth, id, "update this profile")?;
    let current = state.identity.get(id).await?;
    let user = state
        .identity
        .update_profile(id, payload.into_changes(&current.profile))
        .await?;
    Ok(Json(user.into()))
}
