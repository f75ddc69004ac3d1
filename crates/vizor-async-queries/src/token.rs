//! Channel token signing and verification.

use crate::error::{AsyncQueryError, AsyncQueryResult};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vizor_core::ChannelId;

/// Claims carried by the channel cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelClaims {
    /// Channel id.
    #[serde(default)]
    pub channel: String,
    /// Bound user id as a string, `null` for anonymous users.
    pub sub: Option<String>,
}

impl ChannelClaims {
    /// Claims for `channel` bound to `user_id`.
    #[must_use]
    pub fn new(channel: &ChannelId, user_id: Option<i64>) -> Self {
        Self {
            channel: channel.to_string(),
            sub: user_id.map(|id| id.to_string()),
        }
    }

    /// The bound user id, if it is numeric.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.sub.as_deref().and_then(|s| s.parse().ok())
    }
}

/// HS256 codec for channel tokens.
///
/// Tokens carry no expiry; they are rotated by the session check instead.
#[derive(Clone)]
pub struct ChannelTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl ChannelTokenCodec {
    /// Creates a codec from the shared secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Signs `claims`.
    pub fn encode(&self, claims: &ChannelClaims) -> AsyncQueryResult<String> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AsyncQueryError::TokenInvalid(format!("Failed to sign token: {}", e)))?;
        debug!(channel = %claims.channel, "Issued channel token");
        Ok(token)
    }

    /// Verifies `token` and returns its claims.
    pub fn decode(&self, token: &str) -> AsyncQueryResult<ChannelClaims> {
        let data = decode::<ChannelClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            warn!("Channel token validation failed: {}", e);
            match e.kind() {
                ErrorKind::InvalidSignature => {
                    AsyncQueryError::TokenInvalid("Invalid token signature".to_string())
                }
                ErrorKind::InvalidToken | ErrorKind::Base64(_) => {
                    AsyncQueryError::TokenInvalid("Malformed token".to_string())
                }
                _ => AsyncQueryError::TokenInvalid(e.to_string()),
            }
        })?;

        if data.claims.channel.is_empty() {
            return Err(AsyncQueryError::TokenInvalid(
                "Token has no channel claim".to_string(),
            ));
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for ChannelTokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelTokenCodec").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx";

    #[test]
    fn test_encode_decode() {
        let codec = ChannelTokenCodec::new(SECRET);
        let channel = ChannelId::new();
        let token = codec.encode(&ChannelClaims::new(&channel, Some(42))).unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.channel, channel.as_str());
        assert_eq!(claims.sub.as_deref(), Some("42"));
        assert_eq!(claims.user_id(), Some(42));
    }

    #[test]
    fn test_anonymous_sub_is_null() {
        let codec = ChannelTokenCodec::new(SECRET);
        let token = codec
            .encode(&ChannelClaims::new(&ChannelId::from("C"), None))
            .unwrap();
        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.sub, None);
        assert_eq!(claims.user_id(), None);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = ChannelTokenCodec::new(SECRET)
            .encode(&ChannelClaims::new(&ChannelId::from("C"), None))
            .unwrap();
        let other = ChannelTokenCodec::new("yyyyyyyyyyyyyyyyyyyyyyyyyyyyyyyy");
        assert!(matches!(
            other.decode(&token),
            Err(AsyncQueryError::TokenInvalid(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = ChannelTokenCodec::new(SECRET);
        assert!(matches!(
            codec.decode("not-a-token"),
            Err(AsyncQueryError::TokenInvalid(_))
        ));
    }

    #[test]
    fn test_missing_channel_claim_rejected() {
        #[derive(Serialize)]
        struct NoChannel {
            sub: Option<String>,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoChannel { sub: None },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = ChannelTokenCodec::new(SECRET).decode(&token).unwrap_err();
        assert!(err.to_string().contains("channel"));
    }
}
