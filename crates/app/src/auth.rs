use axum::{
    async_trait,
    extract::{rejection::QueryRejection, FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{DateTime, Utc};
use hvac_portal_core::{SignIn, User, UserRole};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::problem::ProblemResponse;
use crate::router::AppState;

pub const SESSION_COOKIE: &str = "hvac_session";

/// Verifies HS256 session tokens issued by the identity provider.
#[derive(Clone)]
pub struct SessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionValidator {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        // Expiry is checked against the application clock in `validate`.
        validation.validate_exp = false;
        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| AuthError::InvalidToken(err.to_string()))?;
        let claims = data.claims;
        if now.timestamp() >= claims.exp as i64 {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

/// Claims carried by a session token. `sub` is the user's openId.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub login_method: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing session token")]
    MissingToken,
    #[error("invalid session token: {0}")]
    InvalidToken(String),
    #[error("session token expired")]
    Expired,
}

impl From<AuthError> for ProblemResponse {
    fn from(err: AuthError) -> Self {
        let problem_type = match err {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::Expired => "token_expired",
        };
        ProblemResponse::unauthorized(problem_type, err.to_string())
    }
}

/// The signed-in user for the current request.
///
/// Resolved from `Authorization: Bearer <token>` or the session cookie. The
/// token must belong to a user that completed the sign-in callback.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ProblemResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = state.sessions().validate(&token, state.now())?;

        let user = state
            .storage()
            .users()
            .fetch_by_open_id(&claims.sub)
            .await
            .map_err(|err| {
                error!(stage = "auth", error = %err, "failed to load session user");
                ProblemResponse::internal("failed to load session user")
            })?
            .ok_or_else(|| {
                ProblemResponse::unauthorized(
                    "session_not_established",
                    "sign in before using the portal",
                )
            })?;

        Ok(Self(user))
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub token: String,
}

/// Sign-in callback for browsers: records the user, sets the cookie, and
/// returns to the portal.
pub async fn callback(
    State(state): State<AppState>,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Result<Response, ProblemResponse> {
    let Query(query) = query?;
    establish_session(&state, &query.token).await?;
    let mut response = Redirect::to("/").into_response();
    attach_cookie(&mut response, &session_cookie(&query.token, state.secure_cookies()))?;
    Ok(response)
}

/// Sign-in endpoint for API clients presenting a bearer token.
pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ProblemResponse> {
    let token = bearer_token(&headers).ok_or(AuthError::MissingToken)?;
    let user = establish_session(&state, &token).await?;
    let mut response = (StatusCode::OK, Json(user)).into_response();
    attach_cookie(&mut response, &session_cookie(&token, state.secure_cookies()))?;
    Ok(response)
}

pub async fn logout(State(state): State<AppState>) -> Result<Response, ProblemResponse> {
    let mut response = StatusCode::NO_CONTENT.into_response();
    attach_cookie(
        &mut response,
        &format!(
            "{SESSION_COOKIE}=; {}; Max-Age=0",
            cookie_attributes(state.secure_cookies())
        ),
    )?;
    Ok(response)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

async fn establish_session(state: &AppState, token: &str) -> Result<User, ProblemResponse> {
    let claims = match state.sessions().validate(token, state.now()) {
        Ok(claims) => claims,
        Err(err) => {
            warn!(stage = "auth", error = %err, "rejected session token");
            counter!("auth_sessions_total", "result" => "rejected").increment(1);
            return Err(err.into());
        }
    };

    let sign_in = SignIn::new(&claims.sub, claims.name, claims.email, claims.login_method)?;
    let role = state
        .owner_open_id()
        .filter(|owner| *owner == sign_in.open_id())
        .map(|_| UserRole::Admin);

    let user = state
        .storage()
        .users()
        .upsert_sign_in(&sign_in, role, state.now())
        .await
        .map_err(|err| {
            error!(stage = "auth", error = %err, "failed to persist sign-in");
            counter!("auth_sessions_total", "result" => "failed").increment(1);
            ProblemResponse::internal("failed to persist sign-in")
        })?;

    info!(stage = "auth", user_id = user.id, role = user.role.as_str(), "session established");
    counter!("auth_sessions_total", "result" => "ok").increment(1);
    Ok(user)
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find(|token| !token.is_empty())
        .map(str::to_string)
}

fn session_cookie(token: &str, secure: bool) -> String {
    format!("{SESSION_COOKIE}={token}; {}", cookie_attributes(secure))
}

fn cookie_attributes(secure: bool) -> &'static str {
    if secure {
        "Path=/; HttpOnly; SameSite=Lax; Secure"
    } else {
        "Path=/; HttpOnly; SameSite=Lax"
    }
}

fn attach_cookie(response: &mut Response, cookie: &str) -> Result<(), ProblemResponse> {
    let value = HeaderValue::from_str(cookie).map_err(|_| {
        ProblemResponse::new(
            StatusCode::BAD_REQUEST,
            "invalid_token",
            "session token contains invalid characters",
        )
    })?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const TEST_SECRET: &[u8] = b"test-session-secret";

    pub fn issue_token(open_id: &str, exp: DateTime<Utc>) -> String {
        let claims = SessionClaims {
            sub: open_id.to_string(),
            exp: exp.timestamp() as usize,
            name: Some("Portal Reviewer".to_string()),
            email: Some("reviewer@vantech.example".to_string()),
            login_method: Some("email".to_string()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET),
        )
        .expect("encode token")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{issue_token, TEST_SECRET};
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn validator_accepts_fresh_token() {
        let validator = SessionValidator::new(TEST_SECRET);
        let token = issue_token("open-1", now() + Duration::hours(1));

        let claims = validator.validate(&token, now()).expect("valid token");
        assert_eq!(claims.sub, "open-1");
        assert_eq!(claims.login_method.as_deref(), Some("email"));
    }

    #[test]
    fn validator_rejects_expired_and_foreign_tokens() {
        let validator = SessionValidator::new(TEST_SECRET);
        let expired = issue_token("open-1", now() - Duration::seconds(1));
        assert!(matches!(
            validator.validate(&expired, now()),
            Err(AuthError::Expired)
        ));

        let other = SessionValidator::new(b"another-secret");
        let token = issue_token("open-1", now() + Duration::hours(1));
        assert!(matches!(
            other.validate(&token, now()),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_is_read_from_bearer_then_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; hvac_session=cookie-token"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("cookie-token"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("header-token"));

        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
