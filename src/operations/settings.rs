use std::path::PathBuf;

use thiserror::Error;
use url::Url;

const PREFIX: &str = "PIRRIP_";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("PIRRIP_{0} must be a boolean, got {1:?}")]
    InvalidBool(&'static str, String),
    #[error("PIRRIP_{0} must be a port number, got {1:?}")]
    InvalidPort(&'static str, String),
    #[error("PIRRIP_{0} must be an absolute http(s) url, got {1:?}")]
    InvalidUrl(&'static str, String),
}

/// Where package records are persisted, if anywhere.
#[derive(Clone, Debug, PartialEq)]
pub enum CacheBackend {
    Fauna {
        secret: String,
        endpoint: Url,
        collection: String,
    },
    Disk(PathBuf),
    None,
}

/// Process-wide configuration. Built once at start-up and handed to
/// constructors by reference.
#[derive(Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub upstream_url: Url,
    pub package_dir: PathBuf,
    pub fallback: bool,
    pub fauna_secret: Option<String>,
    pub fauna_endpoint: Url,
    pub fauna_collection: String,
    pub cache_dir: Option<PathBuf>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fauna_secret = self.fauna_secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upstream_url", &self.upstream_url.as_str())
            .field("package_dir", &self.package_dir)
            .field("fallback", &self.fallback)
            .field("fauna_secret", &fauna_secret)
            .field("fauna_endpoint", &self.fauna_endpoint.as_str())
            .field("fauna_collection", &self.fauna_collection)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary variable source. Keys are looked up
    /// with the `PIRRIP_` prefix applied.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(format!("{}{}", PREFIX, name).as_str()).filter(|value| !value.is_empty())
        };

        let port = match var("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| SettingsError::InvalidPort("PORT", port))?,
            None => 8000,
        };

        let fallback = match var("FALLBACK") {
            Some(value) => match parse_bool(value.as_str()) {
                Some(fallback) => fallback,
                None => return Err(SettingsError::InvalidBool("FALLBACK", value)),
            },
            None => true,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            upstream_url: parse_url(
                "UPSTREAM_URL",
                var("UPSTREAM_URL").unwrap_or_else(|| "https://pypi.org".to_string()),
            )?,
            package_dir: var("PACKAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./packages")),
            fallback,
            fauna_secret: var("FAUNA_SECRET"),
            fauna_endpoint: parse_url(
                "FAUNA_ENDPOINT",
                var("FAUNA_ENDPOINT").unwrap_or_else(|| "https://db.fauna.com".to_string()),
            )?,
            fauna_collection: var("FAUNA_COLLECTION").unwrap_or_else(|| "Package".to_string()),
            cache_dir: var("CACHE_DIR").map(PathBuf::from),
        })
    }

    /// A Fauna secret wins over a cache directory; with neither, records are
    /// not persisted at all.
    pub fn cache_backend(&self) -> CacheBackend {
        if let Some(ref secret) = self.fauna_secret {
            CacheBackend::Fauna {
                secret: secret.clone(),
                endpoint: self.fauna_endpoint.clone(),
                collection: self.fauna_collection.clone(),
            }
        } else if let Some(ref dir) = self.cache_dir {
            CacheBackend::Disk(dir.clone())
        } else {
            CacheBackend::None
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_url(name: &'static str, value: String) -> Result<Url, SettingsError> {
    match Url::parse(value.as_str()) {
        Ok(url) if !url.cannot_be_a_base() && matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(SettingsError::InvalidUrl(name, value)),
    }
}
