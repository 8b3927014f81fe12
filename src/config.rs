//! Service configuration read from the process environment.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

pub const MEMORY_DATABASE_URL: &str = "memory://";

const DEFAULT_POOL_SIZE: u32 = 10;
const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024; // 10 MB.
const DEFAULT_MAX_UPLOAD_FILES: usize = 10;
const DEFAULT_BCRYPT_COST: u32 = 10;
const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value `{value}`")]
    Invalid { key: &'static str, value: String },
}

/// Credentials for the admin account created on start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub database_pool_size: u32,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub upload_dir: PathBuf,
    /// Per-file limit in bytes.
    pub max_upload_size: usize,
    pub max_upload_files: usize,
    /// Hide pending and rejected listings from the public listing query.
    pub public_listings_require_approval: bool,
    pub bcrypt_cost: u32,
    pub admin: Option<AdminBootstrap>,
    pub host: IpAddr,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            _ => None,
        };

        Ok(Self {
            database_url,
            database_pool_size: parse_or(get("DATABASE_POOL_SIZE"), "DATABASE_POOL_SIZE", DEFAULT_POOL_SIZE)?,
            jwt_secret,
            jwt_expiry_hours: parse_or(get("JWT_EXPIRY_HOURS"), "JWT_EXPIRY_HOURS", DEFAULT_JWT_EXPIRY_HOURS)?,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_size: parse_or(get("MAX_UPLOAD_SIZE"), "MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE)?,
            max_upload_files: parse_or(get("MAX_UPLOAD_FILES"), "MAX_UPLOAD_FILES", DEFAULT_MAX_UPLOAD_FILES)?,
            public_listings_require_approval: parse_or(
                get("PUBLIC_LISTINGS_REQUIRE_APPROVAL"),
                "PUBLIC_LISTINGS_REQUIRE_APPROVAL",
                false,
            )?,
            bcrypt_cost: parse_or(get("BCRYPT_COST"), "BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
            admin,
            host: parse_or(get("HOST"), "HOST", DEFAULT_HOST)?,
            port: parse_or(get("PORT"), "PORT", DEFAULT_PORT)?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE_URL
    }

    /// Largest request body a multipart listing request may carry.
    pub fn multipart_body_limit(&self) -> usize {
        self.max_upload_size
            .saturating_mul(self.max_upload_files)
            .saturating_add(1024 * 1024)
    }
}

fn parse_or<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}
