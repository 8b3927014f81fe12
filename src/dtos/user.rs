use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::user::{EmergencyContact, PostalAddress, Preferences, Profile, Role, User};
use crate::services::identity::{NewUser, ProfileChanges};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct SignupRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(custom(function = "email_shape"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub role: Option<String>,
}

impl SignupRequest {
    pub fn into_new_user(self) -> Result<NewUser, AppError> {
        self.validate()?;

        let role = match self.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            None => Role::Tenant,
            Some(raw) => raw.parse::<Role>().map_err(AppError::validation)?,
        };
        if role.is_admin() {
            return Err(AppError::forbidden("Admin accounts cannot be created through signup"));
        }

        Ok(NewUser {
            name: self.name.trim().to_string(),
            email: self.email,
            password: self.password,
            phone: self.phone,
            role,
            username: None,
        })
    }
}

/// `local@domain.tld` with no whitespace.
fn email_shape(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message("A valid email is required".into()))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: Role,
    pub is_admin: bool,
    pub active: bool,
    #[serde(flatten)]
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            is_admin: user.is_admin(),
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            active: user.active,
            profile: user.profile.0,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

/// Profile edit. Role, email and password are not accepted here.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub alternative_phone: Option<String>,
    pub address: Option<PostalAddress>,
    pub emergency_contact: Option<EmergencyContact>,
    pub occupation: Option<String>,
    pub company: Option<String>,
    pub preferences: Option<Preferences>,
}

impl UpdateUserRequest {
    pub fn into_changes(self, current: &Profile) -> ProfileChanges {
        let mut profile = current.clone();
        let mut touched = false;

        if let Some(v) = self.alternative_phone {
            profile.alternative_phone = Some(v);
            touched = true;
        }
        if let Some(v) = self.address {
            profile.address = v;
            touched = true;
        }
        if let Some(v) = self.emergency_contact {
            profile.emergency_contact = v;
            touched = true;
        }
        if let Some(v) = self.occupation {
            profile.occupation = Some(v);
            touched = true;
        }
        if let Some(v) = self.company {
            profile.company = Some(v);
            touched = true;
        }
        if let Some(v) = self.preferences {
            profile.preferences = v;
            touched = true;
        }

        ProfileChanges {
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            profile: touched.then_some(profile),
        }
    }
}
