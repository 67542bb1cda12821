use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use crate::errors::StatusError;
use crate::models::{canonical_login, AppState, Roster, StreamSnapshot, UserProfile};
use crate::services::user_list::UserListStore;
use crate::services::TwitchApi;

/// In-memory stand-in for Helix that counts calls and answers only for the
/// logins it was asked about.
#[derive(Default)]
pub struct FakeTwitchApi {
    pub users: Vec<UserProfile>,
    pub streams: Vec<StreamSnapshot>,
    pub delay: Option<Duration>,
    pub fail: AtomicBool,
    pub user_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
}

impl FakeTwitchApi {
    pub fn new(users: Vec<UserProfile>, streams: Vec<StreamSnapshot>) -> Self {
        Self {
            users,
            streams,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> (usize, usize) {
        (
            self.user_calls.load(Ordering::SeqCst),
            self.stream_calls.load(Ordering::SeqCst),
        )
    }

    async fn respond(&self) -> Result<(), StatusError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(StatusError::Upstream("503 Service Unavailable".to_string()));
        }
        Ok(())
    }
}

fn requested(logins: &[String], login: &str) -> bool {
    logins.iter().any(|l| canonical_login(l) == canonical_login(login))
}

#[async_trait]
impl TwitchApi for FakeTwitchApi {
    async fn get_users(&self, logins: &[String]) -> Result<Vec<UserProfile>, StatusError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self.users.iter().filter(|u| requested(logins, &u.login)).cloned().collect())
    }

    async fn get_streams(&self, logins: &[String]) -> Result<Vec<StreamSnapshot>, StatusError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.respond().await?;
        Ok(self.streams.iter().filter(|s| requested(logins, &s.user_login)).cloned().collect())
    }
}

pub fn sample_user(login: &str, display_name: &str) -> UserProfile {
    UserProfile {
        id: format!("id-{}", login.to_lowercase()),
        login: login.to_string(),
        display_name: display_name.to_string(),
        description: format!("{} streams here", display_name),
        profile_image_url: format!("https://static-cdn.jtvnw.net/{}-profile.png", login.to_lowercase()),
        offline_image_url: String::new(),
        broadcaster_type: "affiliate".to_string(),
    }
}

pub fn sample_stream(login: &str, viewer_count: u32) -> StreamSnapshot {
    StreamSnapshot {
        id: format!("stream-{}", login.to_lowercase()),
        user_id: format!("id-{}", login.to_lowercase()),
        user_login: login.to_string(),
        user_name: login.to_string(),
        game_id: "509658".to_string(),
        game_name: "Just Chatting".to_string(),
        title: format!("{} is live", login),
        viewer_count,
        started_at: "2024-05-01T18:00:00Z".parse().unwrap(),
        language: "en".to_string(),
        thumbnail_url: format!(
            "https://static-cdn.jtvnw.net/previews-ttv/live_user_{}-{{width}}x{{height}}.jpg",
            login.to_lowercase()
        ),
    }
}

pub fn state_with(api: Arc<FakeTwitchApi>, roster: Roster, ttl: Duration, user_list: UserListStore) -> Arc<AppState> {
    Arc::new(AppState::new(api, roster, ttl, user_list))
}
