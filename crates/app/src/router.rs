use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use hvac_portal_storage::Database;

use crate::auth::{self, SessionValidator};
use crate::{applicants, pages, telemetry};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    sessions: SessionValidator,
    owner_open_id: Option<Arc<str>>,
    secure_cookies: bool,
    clock: Clock,
}

impl AppState {
    pub fn new(
        metrics: PrometheusHandle,
        storage: Database,
        session_secret: &[u8],
        owner_open_id: Option<String>,
    ) -> Self {
        Self {
            metrics,
            storage,
            sessions: SessionValidator::new(session_secret),
            owner_open_id: owner_open_id.map(Arc::from),
            secure_cookies: false,
            clock: Arc::new(Utc::now),
        }
    }

    /// Marks session cookies `Secure`, for deployments served over HTTPS.
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn sessions(&self) -> &SessionValidator {
        &self.sessions
    }

    pub fn owner_open_id(&self) -> Option<&str> {
        self.owner_open_id.as_deref()
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/", get(pages::portal))
        .route("/applicants/:id/print", get(pages::print))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/session", post(auth::create_session))
        .route("/auth/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        .route(
            "/api/applicants",
            get(applicants::list).post(applicants::create),
        )
        .route("/api/applicants/:id", get(applicants::get))
        .route("/api/applicants/:id/status", patch(applicants::update_status))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
        .into_response()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::auth::test_support::issue_token;
    use axum::{http::Request, response::Response};
    use chrono::Duration;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should read")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn session_endpoint_creates_user_and_sets_cookie() {
        let state = setup_state().await;
        let app = app_router(state.clone());
        let token = issue_token("owner-1", fixed_now() + Duration::hours(1));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/session")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .expect("cookie set")
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("hvac_session="));
        let user = body_json(response).await;
        assert_eq!(user["openId"], "owner-1");
        assert_eq!(user["role"], "admin");
        assert_eq!(user["name"], "Portal Reviewer");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/me")
                    .header(header::COOKIE, format!("hvac_session={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["openId"], "owner-1");
    }

    #[tokio::test]
    async fn callback_redirects_to_portal() {
        let app = app_router(setup_state().await);
        let token = issue_token("reviewer-7", fixed_now() + Duration::hours(1));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/auth/callback?token={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
        assert!(response.headers().contains_key(header::SET_COOKIE));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let app = app_router(setup_state().await);
        let token = issue_token("reviewer-7", fixed_now() - Duration::minutes(5));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/session")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["type"], "token_expired");
    }

    #[tokio::test]
    async fn token_without_sign_in_is_rejected() {
        let app = app_router(setup_state().await);
        let token = issue_token("stranger", fixed_now() + Duration::hours(1));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["type"], "session_not_established");
    }

    #[tokio::test]
    async fn secure_state_marks_session_cookie_secure() {
        let state = setup_state().await;
        let token = issue_token("reviewer-7", fixed_now() + Duration::hours(1));

        let cookie_for = |app: Router, token: String| async move {
            let response = app
                .oneshot(
                    Request::builder()
                        .uri(format!("/auth/callback?token={token}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .expect("handler should respond");
            response
                .headers()
                .get(header::SET_COOKIE)
                .expect("cookie set")
                .to_str()
                .unwrap()
                .to_string()
        };

        let plain = cookie_for(app_router(state.clone()), token.clone()).await;
        assert!(!plain.contains("Secure"));

        let secure = cookie_for(app_router(state.with_secure_cookies(true)), token).await;
        assert!(secure.starts_with("hvac_session="));
        assert!(secure.contains("; Secure"));
    }

    #[tokio::test]
    async fn callback_without_token_is_a_validation_problem() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/callback")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["type"], "validation_failed");
    }

    #[tokio::test]
    async fn logout_clears_cookie() {
        let app = app_router(setup_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("handler should respond");

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let cookie = response.headers().get(header::SET_COOKIE).unwrap();
        assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
    }
}
