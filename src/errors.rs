use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StatusError {
    Upstream(String),
    Config(String),
    Storage(String),
    InvalidLogin(String),
    TooManyLogins(usize),
    NotFound,
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Upstream(e) => write!(f, "Upstream error: {}", e),
            Self::Config(e) => write!(f, "Configuration error: {}", e),
            Self::Storage(e) => write!(f, "Storage error: {}", e),
            Self::InvalidLogin(login) => write!(f, "Invalid login: {:?}", login),
            Self::TooManyLogins(count) => write!(f, "Too many logins: {}", count),
            Self::NotFound => write!(f, "Not found"),
        }
    }
}

impl std::error::Error for StatusError {}

impl From<reqwest::Error> for StatusError {
    fn from(e: reqwest::Error) -> Self {
        Self::Upstream(e.to_string())
    }
}

impl warp::reject::Reject for StatusError {}
