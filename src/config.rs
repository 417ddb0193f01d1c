use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => build_database_url(
                &env_or("POSTGRES_USER", "planner"),
                &env_or("POSTGRES_PASSWORD", "planner"),
                &env_or("POSTGRES_HOST", "localhost"),
                env_parse_or("POSTGRES_PORT", 5432u16),
                &env_or("POSTGRES_DB", "goalplanner"),
            ),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: env_or("JWT_ISSUER", "goalplanner"),
            audience: env_or("JWT_AUDIENCE", "goalplanner-users"),
            ttl_minutes: env_parse_or("JWT_TTL_MINUTES", 30),
            refresh_ttl_minutes: env_parse_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 7),
        };
        Ok(Self {
            database_url,
            jwt,
            cors_origins: parse_origins(&std::env::var("CORS_ORIGINS").unwrap_or_default()),
            host: env_or("APP_HOST", "0.0.0.0"),
            port: env_parse_or("APP_PORT", 8080),
        })
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn build_database_url(user: &str, password: &str, host: &str, port: u16, db: &str) -> String {
    format!("postgres://{user}:{password}@{host}:{port}/{db}")
}

pub(crate) fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
