use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{Role, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Signs and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl TokenManager {
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::hours(expiry_hours),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp() as usize,
            exp: (now + self.expiry).timestamp() as usize,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Any decoding failure is reported as `Unauthenticated`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AppError::Unauthenticated
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Profile;
    use sqlx::types::Json;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: String::new(),
            first_name: "Alice".into(),
            last_name: "Alice".into(),
            phone: String::new(),
            role,
            active: true,
            profile: Json(Profile::default()),
            created_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let tokens = TokenManager::new("secret", 24);
        let alice = user(Role::Owner);
        let claims = tokens.verify(&tokens.issue(&alice).unwrap()).unwrap();

        assert_eq!(claims.sub, alice.id);
        assert_eq!(claims.role, Role::Owner);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn wrong_secret_is_unauthenticated() {
        let token = TokenManager::new("secret", 24).issue(&user(Role::Tenant)).unwrap();
        let err = TokenManager::new("other", 24).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let token = TokenManager::new("secret", -2).issue(&user(Role::Tenant)).unwrap();
        let err = TokenManager::new("secret", 24).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated));
    }
}
