//! HTTP Basic authentication for the bot endpoints
//!
//! A single username/password pair comes from configuration. Both halves
//! are always compared, each in constant time, so a response never reveals
//! which half was wrong.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::api::AppState;
use crate::config::AuthSection;
use crate::Error;

/// Expected credentials
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let username_ok = constant_time_eq(self.username.as_bytes(), username.as_bytes());
        let password_ok = constant_time_eq(self.password.as_bytes(), password.as_bytes());
        username_ok & password_ok
    }
}

impl From<&AuthSection> for Credentials {
    fn from(section: &AuthSection) -> Self {
        Self::new(section.username.clone(), section.password.clone())
    }
}

/// Compares every byte regardless of where the first mismatch is.
fn constant_time_eq(expected: &[u8], given: &[u8]) -> bool {
    let mut diff = expected.len() ^ given.len();
    for i in 0..expected.len().max(given.len()) {
        let a = expected.get(i).copied().unwrap_or(0);
        let b = given.get(i).copied().unwrap_or(0);
        diff |= usize::from(a ^ b);
    }
    diff == 0
}

/// Split an `Authorization: Basic ...` header value into username and password.
pub fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Middleware rejecting requests without valid Basic credentials.
pub async fn require_basic_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(decode_basic)
        .map(|(username, password)| state.credentials.verify(&username, &password))
        .unwrap_or(false);

    if !authorized {
        tracing::warn!(path = %request.uri().path(), "rejected request with bad credentials");
        return Err(Error::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_requires_both_halves() {
        let credentials = Credentials::new("voicebot", "s3cret");

        assert!(credentials.verify("voicebot", "s3cret"));
        assert!(!credentials.verify("voicebot", "wrong"));
        assert!(!credentials.verify("someone", "s3cret"));
        assert!(!credentials.verify("voicebot", "s3cret "));
        assert!(!credentials.verify("", ""));
    }

    #[test]
    fn test_constant_time_eq_handles_length_mismatch() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(!constant_time_eq(b"ab", b"abc"));
        assert!(!constant_time_eq(b"abc\0", b"abc"));
    }

    #[test]
    fn test_decode_basic_header() {
        let header = format!("Basic {}", STANDARD.encode("voicebot:pa:ss"));
        assert_eq!(
            decode_basic(&header),
            Some(("voicebot".to_string(), "pa:ss".to_string()))
        );

        assert_eq!(decode_basic("Bearer abc"), None);
        assert_eq!(decode_basic("Basic not-base64!"), None);
        assert_eq!(decode_basic(&format!("Basic {}", STANDARD.encode("nocolon"))), None);
    }
}
