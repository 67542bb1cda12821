use crate::config::ADHOC_MAX_LOGINS;
use crate::errors::StatusError;
use crate::models::{
    canonical_login, AppState, CacheEntry, CreatorEntry, CreatorStatus, StreamSnapshot, UserProfile,
};
use crate::services::user_list::validate_login;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;

pub mod featured;
pub mod helix;
pub mod user_list;

#[cfg(test)]
mod tests;

/// The two Helix reads the aggregator needs.
#[async_trait]
pub trait TwitchApi: Send + Sync {
    async fn get_users(&self, logins: &[String]) -> Result<Vec<UserProfile>, StatusError>;
    async fn get_streams(&self, logins: &[String]) -> Result<Vec<StreamSnapshot>, StatusError>;
}

/// Shared aggregate of the roster's status. The lock is held across a refresh
/// so concurrent requests during expiry wait for a single upstream fetch.
pub struct AggregateCache {
    ttl: Duration,
    pub(crate) entry: Mutex<Option<CacheEntry>>,
}

impl AggregateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<Arc<Vec<CreatorStatus>>, StatusError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<CreatorStatus>, StatusError>>,
    {
        let mut entry = self.entry.lock().await;
        if let Some(cached) = entry.as_ref() {
            if SystemTime::now() < cached.expires_at {
                log::debug!("Serving cached status for {} creators", cached.statuses.len());
                return Ok(cached.statuses.clone());
            }
        }

        let statuses = Arc::new(refresh().await?);
        *entry = Some(CacheEntry {
            statuses: statuses.clone(),
            expires_at: SystemTime::now() + self.ttl,
        });
        Ok(statuses)
    }
}

/// Splits a comma-separated `users` parameter. Blank items are dropped; any
/// other item must be a valid login, and at most `ADHOC_MAX_LOGINS` are taken.
pub fn parse_login_list(raw: &str) -> Result<Vec<String>, StatusError> {
    let logins = raw
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(validate_login)
        .collect::<Result<Vec<_>, _>>()?;
    if logins.len() > ADHOC_MAX_LOGINS {
        return Err(StatusError::TooManyLogins(logins.len()));
    }
    Ok(logins)
}

/// Turns ad-hoc logins into roster-less entries: canonical, non-empty, unique.
pub fn adhoc_entries(logins: &[String]) -> Vec<CreatorEntry> {
    let mut entries: Vec<CreatorEntry> = Vec::with_capacity(logins.len());
    for login in logins {
        let entry = CreatorEntry::plain(login);
        if entry.login.is_empty() || entries.iter().any(|e| e.login == entry.login) {
            continue;
        }
        entries.push(entry);
    }
    entries
}

/// Joins the two upstream result sets onto the requested entries. Missing
/// entries mean offline or no profile, never an error.
pub fn merge_statuses(
    entries: &[CreatorEntry],
    users: Vec<UserProfile>,
    streams: Vec<StreamSnapshot>,
    user_added: bool,
) -> Vec<CreatorStatus> {
    let live_map: HashMap<String, StreamSnapshot> = streams
        .into_iter()
        .map(|stream| (canonical_login(&stream.user_login), stream))
        .collect();
    let user_map: HashMap<String, UserProfile> = users
        .into_iter()
        .map(|user| (canonical_login(&user.login), user))
        .collect();

    entries
        .iter()
        .map(|entry| {
            let login = canonical_login(&entry.login);
            let stream = live_map.get(&login).cloned();
            CreatorStatus {
                live: stream.is_some(),
                stream,
                user: user_map.get(&login).cloned(),
                affiliate: entry.affiliate,
                affiliate_code: entry.affiliate_code.clone(),
                user_added,
                login,
            }
        })
        .collect()
}

pub async fn fetch_statuses(
    api: &dyn TwitchApi,
    entries: &[CreatorEntry],
    user_added: bool,
) -> Result<Vec<CreatorStatus>, StatusError> {
    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let logins: Vec<String> = entries.iter().map(|e| e.login.clone()).collect();
    let (users, streams) = futures::try_join!(api.get_users(&logins), api.get_streams(&logins))?;
    Ok(merge_statuses(entries, users, streams, user_added))
}

/// Explicit `logins` bypass the shared cache entirely; otherwise the roster's
/// aggregate is served from cache or refreshed.
pub async fn get_status(
    state: &AppState,
    logins: Option<Vec<String>>,
) -> Result<Arc<Vec<CreatorStatus>>, StatusError> {
    let result = match logins {
        Some(logins) => {
            let entries = adhoc_entries(&logins);
            fetch_statuses(state.api.as_ref(), &entries, true).await.map(Arc::new)
        }
        None => {
            state
                .status_cache
                .get_or_refresh(|| async {
                    let statuses =
                        fetch_statuses(state.api.as_ref(), state.roster.entries(), false).await?;
                    log::info!(
                        "Refreshed status for {} creators ({} live)",
                        statuses.len(),
                        statuses.iter().filter(|s| s.live).count()
                    );
                    Ok::<_, StatusError>(statuses)
                })
                .await
        }
    };

    if let Err(e) = &result {
        log::error!("Failed to fetch Twitch status: {}", e);
    }
    result
}
