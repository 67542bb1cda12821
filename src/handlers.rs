use std::convert::Infallible;
use std::sync::Arc;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use warp::{Filter, Rejection, Reply};
use crate::config::{ADHOC_MAX_AGE_SECS, ADHOC_MAX_LOGINS};
use crate::errors::StatusError;
use crate::middleware::{cache_control_value, cors_headers};
use crate::models::AppState;
use crate::services::featured::{filter_by_search, select_featured};
use crate::services::user_list::validate_login;
use crate::services::{get_status, parse_login_list};


#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub users: Option<String>,
    pub search: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let state_filter = warp::any().map(move || state.clone());

    let health_check = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "OK");

    let status = warp::path!("api" / "twitch-status")
        .and(warp::get())
        .and(warp::query::<StatusQuery>())
        .and(state_filter.clone())
        .and_then(twitch_status);

    let featured = warp::path!("api" / "twitch-status" / "featured")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(featured_status);

    let list_users = warp::path!("api" / "user-streamers")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(list_user_streamers);

    let replace_users = warp::path!("api" / "user-streamers")
        .and(warp::put())
        .and(warp::body::content_length_limit(64 * 1024))
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(replace_user_streamers);

    let users_status = warp::path!("api" / "user-streamers" / "status")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(user_streamers_status);

    let add_user = warp::path!("api" / "user-streamers" / String)
        .and(warp::post())
        .and(state_filter.clone())
        .and_then(add_user_streamer);

    let remove_user = warp::path!("api" / "user-streamers" / String)
        .and(warp::delete())
        .and(state_filter)
        .and_then(remove_user_streamer);

    health_check
        .or(status)
        .or(featured)
        .or(list_users)
        .or(replace_users)
        .or(users_status)
        .or(add_user)
        .or(remove_user)
        .recover(handle_rejection)
        .with(warp::reply::with::headers(cors_headers()))
        .with(warp::log::custom(|info| {
            log::info!(
                "{} {} {} {}ms",
                info.method(),
                info.path(),
                info.status(),
                info.elapsed().as_millis()
            );
        }))
}

pub async fn twitch_status(query: StatusQuery, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let logins = query
        .users
        .as_deref()
        .map(parse_login_list)
        .transpose()
        .map_err(warp::reject::custom)?;
    let max_age = if logins.is_some() {
        ADHOC_MAX_AGE_SECS
    } else {
        state.status_cache.ttl().as_secs()
    };

    let statuses = get_status(&state, logins).await.map_err(warp::reject::custom)?;
    let body = match query.search.as_deref() {
        Some(search) => warp::reply::json(&filter_by_search(&statuses, state.roster.primary(), search)),
        None => warp::reply::json(&*statuses),
    };

    Ok(warp::reply::with_header(body, "cache-control", cache_control_value(max_age)))
}

pub async fn featured_status(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let statuses = get_status(&state, None).await.map_err(warp::reject::custom)?;
    match select_featured(&statuses, state.roster.primary()) {
        Some(featured) => Ok(warp::reply::json(featured)),
        None => Err(warp::reject::custom(StatusError::NotFound)),
    }
}

pub async fn list_user_streamers(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let store = state.user_list.lock().await;
    Ok(warp::reply::json(&store.list().await))
}

pub async fn replace_user_streamers(
    logins: Vec<String>,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let logins = logins
        .iter()
        .map(|login| validate_login(login))
        .collect::<Result<Vec<_>, _>>()
        .map_err(warp::reject::custom)?;
    let store = state.user_list.lock().await;
    let stored = store.replace(&logins).await.map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&stored))
}

pub async fn add_user_streamer(login: String, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let login = validate_login(&login).map_err(warp::reject::custom)?;
    let store = state.user_list.lock().await;
    let stored = store.add(&login).await.map_err(warp::reject::custom)?;
    log::info!("Added {} to the user list", login);
    Ok(warp::reply::json(&stored))
}

pub async fn remove_user_streamer(login: String, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let store = state.user_list.lock().await;
    let stored = store.remove(&login).await.map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&stored))
}

pub async fn user_streamers_status(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let logins = state.user_list.lock().await.list().await;
    let statuses = get_status(&state, Some(logins)).await.map_err(warp::reject::custom)?;
    Ok(warp::reply::with_header(
        warp::reply::json(&*statuses),
        "cache-control",
        cache_control_value(ADHOC_MAX_AGE_SECS),
    ))
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(e) = err.find::<StatusError>() {
        match e {
            StatusError::Upstream(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch Twitch status".to_string()),
            StatusError::InvalidLogin(login) => (StatusCode::BAD_REQUEST, format!("Invalid login: {}", login)),
            StatusError::TooManyLogins(count) => (StatusCode::BAD_REQUEST, format!("Too many logins: {} (at most {})", count, ADHOC_MAX_LOGINS)),
            StatusError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            StatusError::Storage(_) | StatusError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string()),
        }
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid query string".to_string())
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid request body".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody { error: message }),
        code,
    ))
}
