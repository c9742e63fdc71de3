// src/config.rs

use anyhow::{anyhow, bail, Context, Result};
use std::{path::PathBuf, str::FromStr, time::Duration};
use url::Url;

pub const DEFAULT_ARCHIVE_PATH: &str = "temp/kaggle-download.zip";
pub const DEFAULT_ARCHIVE_ENTRY: &str = "babyNamesUSYOB-full.csv";
pub const DEFAULT_CHUNK_SIZE: usize = 1500;
/// Each row binds two parameters; SQLite caps a statement at 32766.
pub const MAX_CHUNK_SIZE: usize = 16_383;
pub const DEFAULT_DATASET: &str = "thedevastator/us-baby-names-by-year-of-birth";
pub const DEFAULT_KAGGLE_API_BASE: &str = "https://www.kaggle.com/api/v1/";
pub const DEFAULT_CONTACTS_URL: &str = "https://api.hubapi.com/crm/v3/objects/contacts";
pub const DEFAULT_SYNC_CAP: usize = 6;
pub const DEFAULT_SYNC_DELAY_MS: u64 = 200;

/// Login for the dataset portal's download API.
#[derive(Clone)]
pub struct PortalCredentials {
    pub username: String,
    pub key: String,
}

impl std::fmt::Debug for PortalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalCredentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Everything the three jobs read from the process environment.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub archive_path: PathBuf,
    pub archive_entry: String,
    pub chunk_size: usize,
    pub kaggle_username: Option<String>,
    pub kaggle_key: Option<String>,
    pub kaggle_dataset: String,
    pub kaggle_api_base: Url,
    pub hubspot_token: Option<String>,
    pub contacts_url: Url,
    pub sync_cap: usize,
    pub sync_delay: Duration,
    pub require_token: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("archive_path", &self.archive_path)
            .field("archive_entry", &self.archive_entry)
            .field("chunk_size", &self.chunk_size)
            .field("kaggle_dataset", &self.kaggle_dataset)
            .field("contacts_url", &self.contacts_url.as_str())
            .field("sync_cap", &self.sync_cap)
            .field("sync_delay", &self.sync_delay)
            .field("require_token", &self.require_token)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => {
                let password = get("MYSQL_PASSWORD").unwrap_or_default();
                format!("mysql://root:{}@127.0.0.1/robot_db", password)
            }
        };

        let chunk_size: usize = parse_or(&get, "INSERT_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        if chunk_size == 0 {
            bail!("INSERT_CHUNK_SIZE must be at least 1");
        }
        if chunk_size > MAX_CHUNK_SIZE {
            bail!(
                "INSERT_CHUNK_SIZE must be at most {}, got {}",
                MAX_CHUNK_SIZE,
                chunk_size
            );
        }

        let delay_ms: u64 = parse_or(&get, "SYNC_DELAY_MS", DEFAULT_SYNC_DELAY_MS)?;

        Ok(AppConfig {
            database_url,
            archive_path: get("ARCHIVE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARCHIVE_PATH)),
            archive_entry: get("ARCHIVE_ENTRY").unwrap_or_else(|| DEFAULT_ARCHIVE_ENTRY.to_string()),
            chunk_size,
            kaggle_username: get("KAGGLE_USERNAME"),
            kaggle_key: get("KAGGLE_KEY"),
            kaggle_dataset: get("KAGGLE_DATASET").unwrap_or_else(|| DEFAULT_DATASET.to_string()),
            kaggle_api_base: parse_url(&get, "KAGGLE_API_BASE", DEFAULT_KAGGLE_API_BASE)?,
            hubspot_token: get("HUBSPOT_API_TOKEN"),
            contacts_url: parse_url(&get, "HUBSPOT_CONTACTS_URL", DEFAULT_CONTACTS_URL)?,
            sync_cap: parse_or(&get, "SYNC_CAP", DEFAULT_SYNC_CAP)?,
            sync_delay: Duration::from_millis(delay_ms),
            require_token: parse_bool(&get, "SYNC_REQUIRE_TOKEN")?,
        })
    }

    pub fn portal_credentials(&self) -> Result<PortalCredentials> {
        let username = self
            .kaggle_username
            .clone()
            .ok_or_else(|| anyhow!("KAGGLE_USERNAME is not set"))?;
        let key = self
            .kaggle_key
            .clone()
            .ok_or_else(|| anyhow!("KAGGLE_KEY is not set"))?;
        Ok(PortalCredentials { username, key })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {}={:?}", key, raw)),
        None => Ok(default),
    }
}

fn parse_url<G>(get: &G, key: &str, default: &str) -> Result<Url>
where
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key).unwrap_or_else(|| default.to_string());
    Url::parse(raw.trim()).with_context(|| format!("parsing {}={:?}", key, raw))
}

fn parse_bool<G>(get: &G, key: &str) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("{} must be a boolean, got {:?}", key, v),
        },
    }
}
