use hyper::{HeaderMap, header::{HeaderName, HeaderValue}};


pub fn add_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("Content-Type"),
    );
}

pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    add_cors_headers(&mut headers);
    headers
}

pub fn cache_control_value(max_age_secs: u64) -> String {
    format!("public, max-age={}", max_age_secs)
}
