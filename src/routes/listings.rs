use axum::{extract::DefaultBodyLimit, middleware, routing::{get, post, put}, Router};

use crate::handlers::listing::{
    create_listing, delete_listing, get_listing, list_listings, my_listings, update_listing,
};
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    // Public endpoints: search + get
    let open = Router::new()
        .route("/listings", get(list_listings))
        .route("/listings/{id}", get(get_listing));

    // Protected endpoints; create/update carry multipart image uploads
    let protected = Router::new()
        .route("/listings/my-listings", get(my_listings))
        .route("/listings", post(create_listing))
        .route("/listings/{id}", put(update_listing).delete(delete_listing))
        .layer(DefaultBodyLimit::max(state.config.multipart_body_limit()))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    open.merge(protected)
}
