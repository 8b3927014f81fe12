use axum::{middleware, routing::{get, post, put}, Router};

use crate::handlers::review::{create_review, delete_review, list_for_listing, update_review};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let open = Router::new().route("/reviews/listing/{listing_id}", get(list_for_listing));

    let protected = Router::new()
        .route("/reviews", post(create_review))
        .route("/reviews/{id}", put(update_review).delete(delete_review))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    open.merge(protected)
}
