//! Request-scoped session and user context.
//!
//! Both are placed into request extensions by the layers in front of the
//! channel middleware. When no session layer is installed, the middleware
//! reconstructs one from the channel token itself.

use crate::token::ChannelClaims;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Session key holding the channel id.
pub const SESSION_CHANNEL_KEY: &str = "async_channel_id";
/// Session key holding the user id bound to the channel.
pub const SESSION_USER_KEY: &str = "async_user_id";

/// Shared handle to a session's key/value map.
#[derive(Debug, Clone, Default)]
pub struct Session(Arc<RwLock<Map<String, Value>>>);

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session pre-filled with `values`.
    #[must_use]
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self(Arc::new(RwLock::new(values)))
    }

    /// Session state implied by a verified channel token.
    #[must_use]
    pub fn from_claims(claims: &ChannelClaims) -> Self {
        let session = Self::new();
        session.insert(SESSION_CHANNEL_KEY, Value::String(claims.channel.clone()));
        session.insert(
            SESSION_USER_KEY,
            claims.user_id().map_or(Value::Null, Value::from),
        );
        session
    }

    /// Returns a copy of the value under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Sets `key` to `value`.
    pub fn insert(&self, key: &str, value: Value) {
        self.0.write().insert(key.to_string(), value);
    }

    /// Channel id stored in the session.
    #[must_use]
    pub fn channel_id(&self) -> Option<String> {
        self.get(SESSION_CHANNEL_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

/// The authenticated caller of the current request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentUser {
    /// Numeric user id; `None` for anonymous and guest users.
    pub user_id: Option<i64>,
    /// Guest token when the request is authenticated as a guest.
    pub guest_token: Option<Value>,
}

impl CurrentUser {
    /// An anonymous caller.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A logged-in user.
    #[must_use]
    pub fn user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            guest_token: None,
        }
    }

    /// A guest authenticated by `token`.
    #[must_use]
    pub fn guest(token: Value) -> Self {
        Self {
            user_id: None,
            guest_token: Some(token),
        }
    }
}
