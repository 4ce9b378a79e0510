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
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "recipe-api".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "recipe-api-users".into()),
            ttl_minutes: parse_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parse_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let storage = StorageConfig {
            endpoint: std::env::var("MINIO_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "recipes".into()),
            access_key: std::env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".into()),
            secret_key: std::env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".into()),
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
        };
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("APP_PORT", 8080),
            jwt,
            storage,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
