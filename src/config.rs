use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::errors::StatusError;
use crate::models::CreatorEntry;


pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3030";
pub const DEFAULT_PRIMARY_CREATOR: &str = "moikapy";
pub const DEFAULT_CREATORS_FILE: &str = "data/creators.json";
pub const TWITCH_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const TWITCH_HELIX_URL: &str = "https://api.twitch.tv/helix";
pub const STATUS_CACHE_TTL_SECS: u64 = 60;
pub const ADHOC_MAX_AGE_SECS: u64 = 15; // cache-control hint for ad-hoc lookups
pub const UPSTREAM_TIMEOUT_SECS: u64 = 10;
pub const TOKEN_EXPIRY_BUFFER_SECS: u64 = 60; // refresh this long before Twitch says
pub const HELIX_MAX_LOGINS: usize = 100; // per request
pub const ADHOC_MAX_LOGINS: usize = 100; // per users= lookup
pub const USER_LIST_FILE: &str = "user_added_streamers.json";
pub const APP_DIR_NAME: &str = "live-moikas";

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub bind_addr: SocketAddr,
    pub primary_creator: String,
    pub creators_file: PathBuf,
    pub cache_ttl: Duration,
    pub upstream_timeout: Duration,
    pub token_url: String,
    pub helix_url: String,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, StatusError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StatusError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = get("TWITCH_CLIENT_ID")
            .ok_or_else(|| StatusError::Config("TWITCH_CLIENT_ID is not set".to_string()))?;
        let client_secret = get("TWITCH_CLIENT_SECRET")
            .ok_or_else(|| StatusError::Config("TWITCH_CLIENT_SECRET is not set".to_string()))?;

        let bind_addr_raw = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_raw.parse::<SocketAddr>().map_err(|e| {
            StatusError::Config(format!("BIND_ADDR {:?} is invalid: {}", bind_addr_raw, e))
        })?;

        let data_dir = match get("DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from("data")),
        };

        Ok(Self {
            client_id,
            client_secret,
            bind_addr,
            primary_creator: get("PRIMARY_CREATOR")
                .unwrap_or_else(|| DEFAULT_PRIMARY_CREATOR.to_string()),
            creators_file: PathBuf::from(
                get("CREATORS_FILE").unwrap_or_else(|| DEFAULT_CREATORS_FILE.to_string()),
            ),
            cache_ttl: parse_secs(get("STATUS_CACHE_TTL_SECS"), "STATUS_CACHE_TTL_SECS", STATUS_CACHE_TTL_SECS)?,
            upstream_timeout: parse_secs(get("UPSTREAM_TIMEOUT_SECS"), "UPSTREAM_TIMEOUT_SECS", UPSTREAM_TIMEOUT_SECS)?,
            token_url: get("TWITCH_TOKEN_URL").unwrap_or_else(|| TWITCH_TOKEN_URL.to_string()),
            helix_url: get("TWITCH_HELIX_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| TWITCH_HELIX_URL.to_string()),
            data_dir,
        })
    }

    pub fn user_list_path(&self) -> PathBuf {
        self.data_dir.join(USER_LIST_FILE)
    }
}

fn parse_secs(value: Option<String>, key: &str, default: u64) -> Result<Duration, StatusError> {
    match value {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| StatusError::Config(format!("{} must be a number of seconds, got {:?}", key, raw))),
    }
}

/// Reads the curated creator list. A missing file means no curated creators;
/// a file that exists but does not parse is a configuration error.
pub fn load_creators(path: &Path) -> Result<Vec<CreatorEntry>, StatusError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Creators file {:?} not found, serving the primary creator only", path);
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(StatusError::Config(format!("Failed to read {:?}: {}", path, e)));
        }
    };

    serde_json::from_str(&contents)
        .map_err(|e| StatusError::Config(format!("Failed to parse {:?}: {}", path, e)))
}
