use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// Account role. `Admin` is the only source of administrative rights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    Tenant,
    Owner,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Tenant => "tenant",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tenant" => Ok(Role::Tenant),
            "owner" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub preferred_language: String,
    pub email_updates: bool,
    pub sms_updates: bool,
    pub booking_updates: bool,
    pub property_alerts: bool,
    pub promotional_emails: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            preferred_language: "English".to_string(),
            email_updates: true,
            sms_updates: false,
            booking_updates: true,
            property_alerts: true,
            promotional_emails: false,
        }
    }
}

/// Optional profile details, stored as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub alternative_phone: Option<String>,
    pub address: PostalAddress,
    pub emergency_contact: EmergencyContact,
    pub occupation: Option<String>,
    pub company: Option<String>,
    pub preferences: Preferences,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Always trimmed and lower-cased.
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: Role,
    pub active: bool,
    pub profile: Json<Profile>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Normalize an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_flag_is_derived_from_role() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::Owner.is_admin());
        assert!(!Role::Tenant.is_admin());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Owner".parse::<Role>(), Ok(Role::Owner));
        assert_eq!(" tenant ".parse::<Role>(), Ok(Role::Tenant));
        assert!("landlord".parse::<Role>().is_err());
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }
}
