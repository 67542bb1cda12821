use std::sync::Arc;
use std::time::{Duration, SystemTime};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use crate::services::{AggregateCache, TwitchApi};
use crate::services::user_list::UserListStore;

/// Trims and case-folds a login so both upstream result sets key the same way.
pub fn canonical_login(login: &str) -> String {
    login.trim().to_lowercase()
}

/// A live broadcast as returned by the Helix `streams` endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StreamSnapshot {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: String,
    pub title: String,
    pub viewer_count: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub language: String,
    pub thumbnail_url: String,
}

impl StreamSnapshot {
    /// Fills the `{width}`/`{height}` placeholders of the thumbnail template.
    pub fn thumbnail(&self, width: u32, height: u32) -> String {
        self.thumbnail_url
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string())
    }
}

/// A channel profile as returned by the Helix `users` endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub offline_image_url: String,
    #[serde(default)]
    pub broadcaster_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CreatorStatus {
    pub login: String,
    pub live: bool,
    pub stream: Option<StreamSnapshot>,
    pub user: Option<UserProfile>,
    pub affiliate: bool,
    pub affiliate_code: Option<String>,
    pub user_added: bool,
}

impl CreatorStatus {
    pub fn viewer_count(&self) -> u32 {
        self.stream.as_ref().map(|s| s.viewer_count).unwrap_or(0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCreatorEntry {
    Login(String),
    Detailed {
        login: String,
        #[serde(default)]
        affiliate: bool,
        #[serde(default)]
        affiliate_code: Option<String>,
    },
}

/// One configured creator. The creators file accepts either a bare login
/// string or an object carrying the affiliate details.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(from = "RawCreatorEntry")]
pub struct CreatorEntry {
    pub login: String,
    pub affiliate: bool,
    pub affiliate_code: Option<String>,
}

impl CreatorEntry {
    pub fn plain(login: &str) -> Self {
        Self {
            login: canonical_login(login),
            affiliate: false,
            affiliate_code: None,
        }
    }
}

impl From<RawCreatorEntry> for CreatorEntry {
    fn from(raw: RawCreatorEntry) -> Self {
        match raw {
            RawCreatorEntry::Login(login) => CreatorEntry::plain(&login),
            RawCreatorEntry::Detailed { login, affiliate, affiliate_code } => CreatorEntry {
                login: canonical_login(&login),
                affiliate,
                affiliate_code: affiliate_code.filter(|code| !code.trim().is_empty()),
            },
        }
    }
}

/// The canonical creator list: the primary creator first, then the configured
/// creators, with duplicates dropped.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    primary: String,
    entries: Vec<CreatorEntry>,
}

impl Roster {
    pub fn new(primary: &str, creators: Vec<CreatorEntry>) -> Self {
        let primary = canonical_login(primary);
        let mut entries: Vec<CreatorEntry> = Vec::with_capacity(creators.len() + 1);

        if !primary.is_empty() {
            let entry = creators
                .iter()
                .find(|c| c.login == primary)
                .cloned()
                .unwrap_or_else(|| CreatorEntry::plain(&primary));
            entries.push(entry);
        }

        for creator in creators {
            if creator.login.is_empty() || entries.iter().any(|e| e.login == creator.login) {
                continue;
            }
            entries.push(creator);
        }

        Self { primary, entries }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn entries(&self) -> &[CreatorEntry] {
        &self.entries
    }

    pub fn logins(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.login.clone()).collect()
    }
}

pub struct CacheEntry {
    pub statuses: Arc<Vec<CreatorStatus>>,
    pub expires_at: SystemTime,
}

pub struct AppToken {
    pub token: String,
    pub expires_at: SystemTime,
}

pub struct AppState {
    pub api: Arc<dyn TwitchApi>,
    pub roster: Roster,
    pub status_cache: AggregateCache,
    pub user_list: Mutex<UserListStore>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn TwitchApi>,
        roster: Roster,
        cache_ttl: Duration,
        user_list: UserListStore,
    ) -> Self {
        Self {
            api,
            roster,
            status_cache: AggregateCache::new(cache_ttl),
            user_list: Mutex::new(user_list),
        }
    }
}
