use axum::{middleware, routing::{delete, get, patch}, Router};

use crate::handlers::admin::{
    dashboard, delete_listing, list_all_listings, list_users, review_listing, set_user_status,
};
use crate::middleware::auth::{require_admin, require_auth};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    // Layers run bottom-up: authenticate first, then check the admin role.
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/listings", get(list_all_listings))
        .route("/admin/listings/{id}", delete(delete_listing))
        .route("/admin/listings/{id}/approval", patch(review_listing))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/status", patch(set_user_status))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}
