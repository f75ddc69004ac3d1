//! Channel cookie middleware.

use crate::manager::AsyncQueryManagerInterface;
use crate::session::{CurrentUser, Session};
use axum::{
    body::Body,
    extract::State,
    http::{header::SET_COOKIE, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::warn;

/// Issues a channel cookie on responses whose session has no valid channel.
///
/// Reads the [`Session`] and [`CurrentUser`] request extensions. Without a
/// session extension, the session is rebuilt from the token cookie. A
/// response that already carries the cookie is passed through untouched,
/// and a cookie that cannot be issued is only logged.
pub async fn async_channel_middleware(
    State(manager): State<Arc<dyn AsyncQueryManagerInterface>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let cookie_name = manager.cookie_name().to_string();
    let has_cookie = CookieJar::from_headers(request.headers())
        .get(&cookie_name)
        .is_some();

    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .unwrap_or_else(|| {
            manager
                .channel_claims_from_request(request.headers())
                .map(|claims| Session::from_claims(&claims))
                .unwrap_or_default()
        });
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .unwrap_or_default();

    let mut response = next.run(request).await;

    if sets_cookie(&response, &cookie_name) {
        return response;
    }

    match manager.validate_session(&session, user.user_id, has_cookie) {
        Ok(Some(cookie)) => match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => warn!(error = %e, "Channel cookie is not a valid header value"),
        },
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Failed to issue async channel cookie"),
    }

    response
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}
