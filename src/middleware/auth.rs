use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum::Extension;
use uuid::Uuid;

use crate::auth::policy;
use crate::error::AppError;
use crate::models::user::{Role, User};
use crate::state::AppState;

/// The verified caller, attached to the request by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Role,
    pub username: String,
    pub email: String,
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Verify the bearer token and reload its user.
///
/// Every failure is reported as the same `Unauthenticated` error.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Expect "Bearer <token>"
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated)?;

    let claims = state.tokens.verify(token)?;
    // The stored role wins over the one in the token.
    let user = state.identity.authenticate(claims.sub).await?;

    req.extensions_mut().insert(AuthContext::from(&user));
    Ok(next.run(req).await)
}

/// Must be layered inside `require_auth`.
pub async fn require_admin(
    Extension(auth): Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    policy::require_admin(&auth)?;
    Ok(next.run(req).await)
}
