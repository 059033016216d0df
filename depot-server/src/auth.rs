//! HTTP basic authentication against argon2 password hashes.

use crate::error::{ApiError, ApiResult};
use crate::AppState;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use std::collections::HashMap;
use tracing::warn;

/// The user a request authenticated as, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser(pub String);

/// Accounts allowed to use the service: user name to PHC password hash.
#[derive(Debug, Clone, Default)]
pub struct Users {
    hashes: HashMap<String, String>,
}

impl Users {
    pub fn new(hashes: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            hashes: hashes.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Checks `password` against the stored hash of `username`.
    #[must_use]
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let Some(stored) = self.hashes.get(username) else {
            return false;
        };
        match PasswordHash::new(stored) {
            Ok(hash) => Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok(),
            Err(e) => {
                warn!(user = username, error = %e, "stored password hash is malformed");
                false
            }
        }
    }
}

/// Hashes `password` with Argon2id and a fresh random salt, in PHC format.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes)?;
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Splits a `Basic` authorization header value into user and password.
fn parse_basic(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Rejects requests without valid credentials when accounts are configured.
pub(crate) async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(users) = state.users.clone() else {
        return Ok(next.run(request).await);
    };

    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let Some(header) = header else {
        return Err(ApiError::Unauthorized("Basic Authorization required".into()));
    };
    let Some((user, password)) = parse_basic(&header) else {
        warn!("malformed authorization header");
        return Err(ApiError::Unauthorized("Invalid Authorization".into()));
    };

    // Argon2 verification is CPU-bound.
    let check_user = user.clone();
    let ok = tokio::task::spawn_blocking(move || users.verify(&check_user, &password))
        .await
        .map_err(|e| ApiError::Internal(format!("authentication task failed: {e}")))?;
    if !ok {
        warn!(user = %user, "invalid credentials");
        return Err(ApiError::Unauthorized("Invalid Authorization".into()));
    }

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}
