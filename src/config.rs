use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};

use crate::auth::{AuthConfig, TokenTransport};
use crate::password::Credentials;

pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub frontend_url: Option<String>,
    pub avatar_dir: PathBuf,
    pub auth: AuthConfig,
    pub credentials: Credentials,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(v) => v.trim().parse().map_err(|e| anyhow!("{name}: {e}")),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let secret = var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.len() < MIN_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_SECRET_LEN} characters long");
        }
        let transport: TokenTransport = parsed("AUTH_TRANSPORT", TokenTransport::Cookie)?;
        let ttl: i64 = parsed("TOKEN_TTL_SECS", AuthConfig::DEFAULT_TTL_SECS)?;
        if !(1..=AuthConfig::MAX_TTL_SECS).contains(&ttl) {
            bail!("TOKEN_TTL_SECS must be between 1 and {}", AuthConfig::MAX_TTL_SECS);
        }
        let cookie_name = var("COOKIE_NAME").unwrap_or_else(|| AuthConfig::DEFAULT_COOKIE_NAME.to_string());
        let cookie_secure: bool = parsed("COOKIE_SECURE", false)?;

        let defaults = Credentials::default();
        let credentials = Credentials {
            memory_kib: parsed("ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            time_cost: parsed("ARGON2_TIME_COST", defaults.time_cost)?,
            parallelism: parsed("ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed("PORT", 4000)?,
            database_url: var("DATABASE_URL"),
            frontend_url: var("FRONTEND_URL"),
            avatar_dir: var("AVATAR_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("public/avatars")),
            auth: AuthConfig::new(secret, transport)
                .with_ttl(ttl)
                .with_cookie(cookie_name, cookie_secure),
            credentials,
        })
    }
}
