use crate::errors::StatusError;
use crate::models::canonical_login;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;


const MAX_LOGIN_LEN: usize = 25;

/// Canonicalizes a login and checks it looks like a Twitch username.
pub fn validate_login(login: &str) -> Result<String, StatusError> {
    let login = canonical_login(login);
    let valid = !login.is_empty()
        && login.len() <= MAX_LOGIN_LEN
        && login.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(login)
    } else {
        Err(StatusError::InvalidLogin(login))
    }
}

/// Logins a visitor added on top of the curated roster, kept as a JSON array
/// in a single file. Anything unreadable reads as an empty list.
pub struct UserListStore {
    path: PathBuf,
}

impl UserListStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn list(&self) -> Vec<String> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(_) => return Vec::new(),
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(login) => Some(login),
                    _ => None,
                })
                .collect(),
            Ok(_) => {
                log::warn!("User list {:?} is not a JSON array, ignoring it", self.path);
                Vec::new()
            }
            Err(e) => {
                log::warn!("User list {:?} is malformed, ignoring it: {}", self.path, e);
                Vec::new()
            }
        }
    }

    pub async fn replace(&self, logins: &[String]) -> Result<Vec<String>, StatusError> {
        let mut stored: Vec<String> = Vec::with_capacity(logins.len());
        for login in logins.iter().map(|l| canonical_login(l)) {
            if !login.is_empty() && !stored.contains(&login) {
                stored.push(login);
            }
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StatusError::Storage(format!("{:?}: {}", parent, e)))?;
            }
        }
        let json = serde_json::to_string(&stored)
            .map_err(|e| StatusError::Storage(e.to_string()))?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| StatusError::Storage(format!("{:?}: {}", self.path, e)))?;

        Ok(stored)
    }

    pub async fn add(&self, login: &str) -> Result<Vec<String>, StatusError> {
        let login = canonical_login(login);
        let mut current = self.list().await;
        if current.iter().any(|existing| canonical_login(existing) == login) {
            return Ok(current);
        }
        current.push(login);
        self.replace(&current).await
    }

    /// Removing a login that is not stored leaves the file untouched.
    pub async fn remove(&self, login: &str) -> Result<Vec<String>, StatusError> {
        let login = canonical_login(login);
        let current = self.list().await;
        if !current.iter().any(|existing| canonical_login(existing) == login) {
            return Ok(current);
        }
        let remaining: Vec<String> = current
            .into_iter()
            .filter(|existing| canonical_login(existing) != login)
            .collect();
        self.replace(&remaining).await
    }
}
