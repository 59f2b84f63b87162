use std::net::SocketAddr;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATABASE_URL: &str = "sqlite:checkin.db";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";

/// Backend settings, read from `CHECKIN_*` environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Origin allowed by CORS
    pub allowed_origin: String,
    /// Ministries created at start-up when missing
    pub seed_ministries: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            seed_ministries: Vec::new(),
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = match lookup("CHECKIN_BIND_ADDR") {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("Invalid CHECKIN_BIND_ADDR {:?} ({}); using {}", value, e, DEFAULT_BIND_ADDR);
                defaults.bind_addr
            }),
            None => defaults.bind_addr,
        };

        let seed_ministries = lookup("CHECKIN_SEED_MINISTRIES")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            bind_addr,
            database_url: lookup("CHECKIN_DATABASE_URL").unwrap_or(defaults.database_url),
            allowed_origin: lookup("CHECKIN_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            seed_ministries,
        }
    }
}
