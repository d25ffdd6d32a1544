//! Runtime configuration, read once at startup from the environment
//! (a `.env` file in the working directory is loaded first if present).

use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// One year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 365 * 24 * 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Where users and cards are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    /// Directory uploaded images are written to and served from.
    pub upload_dir: PathBuf,
    pub session_ttl_minutes: i64,
    pub max_upload_bytes: usize,
    /// Sets the `Secure` attribute on the session cookie.
    pub cookie_secure: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            storage: StorageConfig::Sqlite("sqlite://database.db".to_string()),
            upload_dir: PathBuf::from("public/uploads"),
            session_ttl_minutes: 24 * 60,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            cookie_secure: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage = match lookup("DATABASE_URL") {
            Some(url) if url.eq_ignore_ascii_case("memory") => StorageConfig::Memory,
            Some(url) => StorageConfig::Sqlite(url),
            None => defaults.storage,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            storage,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            session_ttl_minutes: parse_ranged_var(
                &lookup,
                "SESSION_TTL_MINUTES",
                defaults.session_ttl_minutes,
                1..=MAX_SESSION_TTL_MINUTES,
            )?,
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            cookie_secure: parse_var(&lookup, "COOKIE_SECURE", defaults.cookie_secure)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn parse_ranged_var<F, T>(
    lookup: &F,
    name: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Display,
{
    let value = parse_var(lookup, name, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(
            config.storage,
            StorageConfig::Sqlite("sqlite://database.db".to_string())
        );
        assert_eq!(config.upload_dir, PathBuf::from("public/uploads"));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_memory_storage_and_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "memory"),
            ("PORT", "8081"),
            ("SESSION_TTL_MINUTES", "15"),
            ("COOKIE_SECURE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(config.port, 8081);
        assert_eq!(config.session_ttl_minutes, 15);
        assert!(config.cookie_secure);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_session_ttl_outside_range_is_rejected() {
        for ttl in ["0", "-5", "525601", "1000000000000"] {
            let err = AppConfig::from_lookup(lookup_from(&[("SESSION_TTL_MINUTES", ttl)]))
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: "SESSION_TTL_MINUTES", .. }),
                "ttl {} should be rejected",
                ttl
            );
        }

        let config =
            AppConfig::from_lookup(lookup_from(&[("SESSION_TTL_MINUTES", "525600")])).unwrap();
        assert_eq!(config.session_ttl_minutes, MAX_SESSION_TTL_MINUTES);
    }
}
