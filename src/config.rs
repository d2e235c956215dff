use std::{env, fmt::Display, path::PathBuf, str::FromStr, sync::Arc};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is required")]
    Missing(&'static str),

    #[error("Invalid {key} value: {info}")]
    Invalid { key: &'static str, info: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: Arc<str>,
    pub media_root: PathBuf,
    pub media_url: String,
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {e}");
        }

        Ok(Self {
            port: try_load("FOODGRAM_PORT", "8000")?,
            database_url: require("DATABASE_URL")?,
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            jwt_secret: Arc::from(require("JWT_SECRET")?),
            media_root: try_load("MEDIA_ROOT", "media")?,
            media_url: normalize_media_url(&try_load::<String>("MEDIA_URL", "/media/")?),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    var(key).ok_or(ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            log::info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            info: e.to_string(),
        })
}

/// Media URLs are joined with stored paths, so they always end in `/`.
fn normalize_media_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_owned()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_gets_trailing_slash() {
        assert_eq!(normalize_media_url("/media"), "/media/");
        assert_eq!(normalize_media_url("/media/"), "/media/");
        assert_eq!(
            normalize_media_url("https://cdn.example.com/m"),
            "https://cdn.example.com/m/"
        );
    }

    #[test]
    fn defaults_parse() {
        let port: u16 = try_load("FOODGRAM_TEST_UNSET_PORT", "8000").unwrap();
        assert_eq!(port, 8000);

        let invalid = try_load::<u16>("FOODGRAM_TEST_UNSET_PORT", "eighty");
        assert!(matches!(
            invalid,
            Err(ConfigError::Invalid {
                key: "FOODGRAM_TEST_UNSET_PORT",
                ..
            })
        ));
    }

    #[test]
    fn missing_required_value() {
        assert!(matches!(
            require("FOODGRAM_TEST_UNSET_SECRET"),
            Err(ConfigError::Missing("FOODGRAM_TEST_UNSET_SECRET"))
        ));
    }
}
