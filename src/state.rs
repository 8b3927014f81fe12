use std::sync::Arc;

use crate::auth::jwt::TokenManager;
use crate::config::Config;
use crate::database::Repositories;
use crate::services::approval::ApprovalService;
use crate::services::identity::IdentityService;
use crate::services::listing::ListingService;
use crate::services::review::ReviewService;
use crate::uploads::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenManager,
    pub uploads: UploadStore,
    pub identity: IdentityService,
    pub listings: ListingService,
    pub approvals: ApprovalService,
    pub reviews: ReviewService,
}

impl AppState {
    pub fn new(config: Config, repos: Repositories) -> Self {
        let uploads = UploadStore::from_config(&config);
        Self {
            tokens: TokenManager::new(&config.jwt_secret, config.jwt_expiry_hours),
            identity: IdentityService::new(repos.users.clone(), config.bcrypt_cost),
            listings: ListingService::new(
                repos.listings.clone(),
                repos.users.clone(),
                repos.reviews.clone(),
                uploads.clone(),
            ),
            approvals: ApprovalService::new(repos.listings.clone()),
            reviews: ReviewService::new(repos.reviews, repos.listings, repos.users),
            uploads,
            config: Arc::new(config),
        }
    }
}
