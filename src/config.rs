use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// Absent or empty disables signing; issue/parse then fail with a signing error.
    pub secret: Option<String>,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "accounts".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "accounts-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
        };
        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: env_or("ARGON2_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("ARGON2_ITERATIONS", defaults.iterations),
            parallelism: env_or("ARGON2_PARALLELISM", defaults.parallelism),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            db_timeout_secs: env_or("DB_TIMEOUT_SECS", 5),
            jwt,
            hash,
        })
    }

    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
