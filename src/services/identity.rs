use std::sync::Arc;

use chrono::Utc;
use sqlx::types::Json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth::password;
use crate::config::AdminBootstrap;
use crate::database::UserRepository;
use crate::error::{AppError, Result};
use crate::models::user::{normalize_email, Profile, Role, User};

/// A signup request after transport-level validation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub role: Role,
    pub username: Option<String>,
}

/// Profile edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub profile: Option<Profile>,
}

#[derive(Clone)]
pub struct IdentityService {
    users: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl IdentityService {
    pub fn new(users: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self { users, bcrypt_cost }
    }

    #[instrument(skip(self, new_user), fields(email = %new_user.email, role = ?new_user.role))]
    pub async fn create(&self, new_user: NewUser) -> Result<User> {
        let email = normalize_email(&new_user.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let (first_name, last_name) = split_name(&new_user.name);
        let username = new_user
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| local_part(&email).to_string());

        let user = User {
            id: Uuid::new_v4(),
            username,
            password_hash: password::hash(&new_user.password, self.bcrypt_cost).await?,
            email,
            first_name,
            last_name,
            phone: new_user.phone.map(|p| p.trim().to_string()).unwrap_or_default(),
            role: new_user.role,
            active: true,
            profile: Json(Profile::default()),
            created_at: Utc::now(),
            last_login: None,
        };

        // The store enforces uniqueness too, for signups racing past the lookup.
        self.users.insert(&user).await?;
        info!(user_id = %user.id, "user created");
        Ok(user)
    }

    /// Check credentials. Unknown email, wrong password and inactive accounts look the same.
    #[instrument(skip(self, password))]
    pub async fn verify(&self, email: &str, password: &str) -> Result<User> {
        let Some(mut user) = self.users.find_by_email(&normalize_email(email)).await? else {
            return Err(AppError::InvalidCredentials);
        };
        if !password::verify(password, &user.password_hash).await? || !user.active {
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        self.users.record_login(user.id, now).await?;
        user.last_login = Some(now);
        Ok(user)
    }

    /// Resolve a token subject to a live, active user.
    pub async fn authenticate(&self, user_id: Uuid) -> Result<User> {
        match self.users.find_by_id(user_id).await? {
            Some(user) if user.active => Ok(user),
            _ => Err(AppError::Unauthenticated),
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn list(&self, limit: Option<i64>) -> Result<Vec<User>> {
        self.users.list(limit).await
    }

    pub async fn count(&self) -> Result<i64> {
        self.users.count().await
    }

    #[instrument(skip(self, changes))]
    pub async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<User> {
        let mut user = self.get(user_id).await?;

        if let Some(first_name) = changes.first_name.map(|s| s.trim().to_string()) {
            if first_name.is_empty() {
                return Err(AppError::validation("firstName must not be empty"));
            }
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name.map(|s| s.trim().to_string()) {
            if last_name.is_empty() {
                return Err(AppError::validation("lastName must not be empty"));
            }
            user.last_name = last_name;
        }
        if let Some(phone) = changes.phone {
            user.phone = phone.trim().to_string();
        }
        if let Some(profile) = changes.profile {
            user.profile = Json(profile);
        }

        if !self.users.update_profile(&user).await? {
            return Err(AppError::not_found("User not found"));
        }
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, actor_id: Uuid, user_id: Uuid, active: bool) -> Result<User> {
        if actor_id == user_id && !active {
            return Err(AppError::validation("You cannot deactivate your own account"));
        }
        let user = self
            .users
            .set_active(user_id, active)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;
        info!(%user_id, active, "user status changed");
        Ok(user)
    }

    /// Create the configured admin account unless the email is already taken.
    /// Returns whether a user was created.
    pub async fn ensure_admin(&self, admin: &AdminBootstrap) -> Result<bool> {
        if let Some(existing) = self.users.find_by_email(&normalize_email(&admin.email)).await? {
            if !existing.role.is_admin() {
                warn!(email = %existing.email, "bootstrap admin email belongs to a non-admin user");
            }
            return Ok(false);
        }

        self.create(NewUser {
            name: "Admin User".into(),
            email: admin.email.clone(),
            password: admin.password.clone(),
            phone: None,
            role: Role::Admin,
            username: Some("admin".into()),
        })
        .await?;
        info!(email = %admin.email, "bootstrap admin created");
        Ok(true)
    }
}

/// Split on the first space; a single name fills both parts.
fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(' ') {
        Some((first, rest)) if !rest.trim().is_empty() => (first.to_string(), rest.trim().to_string()),
        _ => (name.to_string(), name.to_string()),
    }
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
