//! Process configuration.
//!
//! Values are hard-coded defaults that can be overridden through the
//! environment (or a `.env` file in the working directory). The config is
//! built once at startup and never mutated afterwards.

use std::path::PathBuf;

use axum::http::HeaderValue;

use crate::errors::{AppError, AppResult};

const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
const DEFAULT_SERVER_PORT: u16 = 5000;
const DEFAULT_PG_HOST: &str = "localhost";
const DEFAULT_PG_PORT: u16 = 5432;
const DEFAULT_PG_USER: &str = "postgres";
const DEFAULT_PG_PASSWORD: &str = "";
const DEFAULT_PG_DBNAME: &str = "disaster_platform";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Connection parameters for the PostgreSQL server holding `users`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Name reported by the health endpoint and in logs.
    pub service_name: String,
    /// Address the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    pub database: DatabaseConfig,
    /// The single frontend origin allowed to call the API from a browser.
    pub allowed_origin: String,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Loads the configuration for `service` from the process environment.
    pub fn load_with_service(service: &str) -> Self {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// Missing keys take their default. Port values that do not parse as
    /// `u16` also fall back to the default.
    pub fn from_lookup<F>(service: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let port = |key: &str, default: u16| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self {
            service_name: service.to_string(),
            host: string("SERVER_HOST", DEFAULT_SERVER_HOST),
            port: port("SERVER_PORT", DEFAULT_SERVER_PORT),
            database: DatabaseConfig {
                host: string("PG_HOST", DEFAULT_PG_HOST),
                port: port("PG_PORT", DEFAULT_PG_PORT),
                user: string("PG_USER", DEFAULT_PG_USER),
                password: string("PG_PASSWORD", DEFAULT_PG_PASSWORD),
                dbname: string("PG_DBNAME", DEFAULT_PG_DBNAME),
            },
            allowed_origin: string("CORS_ALLOWED_ORIGIN", DEFAULT_ALLOWED_ORIGIN),
            log_format,
        }
    }

    /// `host:port` string for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The allowed origin as a header value for the CORS layer.
    pub fn allowed_origin_header(&self) -> AppResult<HeaderValue> {
        HeaderValue::from_str(self.allowed_origin.trim()).map_err(|e| {
            AppError::Config(format!(
                "invalid CORS_ALLOWED_ORIGIN `{}`: {}",
                self.allowed_origin, e
            ))
        })
    }
}

/// Load `.env` from the working directory or its parents (best-effort).
///
/// Variables already present in the environment are left untouched.
/// Returns the file that was loaded, if any.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}
