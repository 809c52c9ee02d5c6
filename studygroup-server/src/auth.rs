//! Session authentication.
//!
//! Students sign up or log in with email and password and receive an opaque
//! session token in an `HttpOnly` cookie. Handlers that need a caller take a
//! [`CurrentStudent`] argument, which resolves the cookie against the
//! `sessions` table.

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::info;

use studygroup_core::profile::normalize_email;
use studygroup_core::StudentId;

use crate::error::ApiError;
use crate::repository::RepositoryError;
use crate::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE_NAME: &str = "sessionId";

/// Build the `Set-Cookie` value for a fresh session.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE_NAME}={token}; HttpOnly{secure_flag}; SameSite=Lax; Path=/; Max-Age={max_age_secs}"
    )
}

/// Extract the session token from the `Cookie` header, if present.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;

    cookie_str
        .split(';')
        .filter_map(|part| part.trim().strip_prefix(&format!("{SESSION_COOKIE_NAME}=")))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// 32 bytes from the OS RNG, URL-safe base64 without padding.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// When a session opened at `now` stops being valid.
fn session_expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, ApiError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| ApiError::Internal(format!("session lifetime {ttl} out of range")))
}

fn hash_password_blocking(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password_blocking(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| ApiError::from(RepositoryError::corruption("password hash")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ApiError::Internal(format!(
            "password verification failed: {e}"
        ))),
    }
}

/// Argon2id hash in PHC string format, computed off the async runtime.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentStudent(pub StudentId);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(&parts.headers)
            .ok_or(ApiError::Unauthorized("Not authenticated"))?;

        let session = state
            .repository
            .read::<_, RepositoryError, _>("authenticate", move |tx| tx.session(&token))
            .await?;

        match session {
            Some(session) if !session.is_expired(Utc::now()) => {
                Ok(CurrentStudent(session.student_id))
            }
            _ => Err(ApiError::Unauthorized("Session expired")),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub id: StudentId,
    pub email: String,
}

impl CredentialsRequest {
    /// Normalise the email and reject blank fields.
    fn validate(self) -> Result<(String, String), ApiError> {
        let email = normalize_email(&self.email);
        if email.is_empty() {
            return Err(ApiError::BadRequest("Email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(ApiError::BadRequest("Password is required".to_string()));
        }
        Ok((email, self.password))
    }
}

/// Attach a new session cookie to `body`.
fn with_session(
    status: StatusCode,
    state: &AppState,
    token: &str,
    body: AuthResponse,
) -> Response {
    let cookie = session_cookie(
        token,
        state.session_ttl.num_seconds(),
        state.cookie_secure,
    );
    (status, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

/// Handler: POST /auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Response, ApiError> {
    let (email, password) = body.validate()?;
    let password_hash = hash_password(password).await?;

    let token = generate_session_token();
    let session_token = token.clone();
    let now = Utc::now();
    let expires_at = session_expiry(now, state.session_ttl)?;

    let (id, email) = state
        .repository
        .write("signup", move |tx| {
            if tx.student_id_by_email(&email)?.is_some() {
                return Err(ApiError::Conflict("Email already registered"));
            }
            let id = tx.insert_student(&email, &password_hash)?;
            tx.insert_session(&session_token, id, now, expires_at)?;
            Ok((id, email))
        })
        .await?;

    info!("Student {} signed up", id);
    Ok(with_session(
        StatusCode::CREATED,
        &state,
        &token,
        AuthResponse { id, email },
    ))
}

/// Handler: POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialsRequest>,
) -> Result<Response, ApiError> {
    let (email, password) = body.validate()?;

    let lookup = email.clone();
    let credentials = state
        .repository
        .read::<_, RepositoryError, _>("login", move |tx| tx.credentials(&lookup))
        .await?;
    let Some((id, password_hash)) = credentials else {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    };
    if !verify_password(password, password_hash).await? {
        return Err(ApiError::Unauthorized("Invalid credentials"));
    }

    let token = generate_session_token();
    let session_token = token.clone();
    let now = Utc::now();
    let expires_at = session_expiry(now, state.session_ttl)?;
    state
        .repository
        .write::<_, RepositoryError, _>("open session", move |tx| {
            tx.insert_session(&session_token, id, now, expires_at)
        })
        .await?;

    info!("Student {} logged in", id);
    Ok(with_session(
        StatusCode::OK,
        &state,
        &token,
        AuthResponse { id, email },
    ))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        assert_eq!(
            session_expiry(now, Duration::days(7)).unwrap(),
            now + Duration::days(7)
        );
        assert!(matches!(
            session_expiry(now, Duration::days(1_000_000_000)),
            Err(ApiError::Internal(_))
        ));
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc", 604_800, true);
        assert_eq!(
            cookie,
            "sessionId=abc; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=604800"
        );
    }

    #[test]
    fn test_session_cookie_without_secure() {
        let cookie = session_cookie("abc", 60, false);
        assert!(!cookie.contains("Secure"));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn test_extract_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionId=tok123 ; other=1"),
        );
        assert_eq!(extract_session_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_extract_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("sessionId="));
        assert_eq!(extract_session_token(&headers), None);
    }

    #[test]
    fn test_generated_tokens_are_unique_and_url_safe() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password_blocking("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password_blocking("correct horse", &hash).unwrap());
        assert!(!verify_password_blocking("battery staple", &hash).unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password_blocking("pw", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_credentials_are_normalised() {
        let request = CredentialsRequest {
            email: "  Ada@Campus.EDU ".to_string(),
            password: "pw".to_string(),
        };
        let (email, _) = request.validate().unwrap();
        assert_eq!(email, "ada@campus.edu");
    }

    #[test]
    fn test_blank_password_rejected() {
        let request = CredentialsRequest {
            email: "ada@campus.edu".to_string(),
            password: String::new(),
        };
        assert!(matches!(request.validate(), Err(ApiError::BadRequest(_))));
    }
}
