pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::StatusError;
pub use models::{AppState, CreatorEntry, CreatorStatus, Roster, StreamSnapshot, UserProfile};
pub use services::{get_status, TwitchApi};
