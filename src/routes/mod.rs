pub mod admin;
pub mod listings;
pub mod reviews;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(users::routes(state))
        .merge(listings::routes(state))
        .merge(reviews::routes(state))
        .merge(admin::routes(state))
}
