#![allow(dead_code)]

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use tray::app::identity::SESSION_COOKIE_NAME;
use tray::app::nonce::NOTIFICATION_NONCE_ACTION;
use tray::app::notifications::NotificationStore;
use tray::config::decode_key_32;
use tray::domain::notification::{NewNotification, Notification, Owner, SessionToken};
use tray::http::{ACTION_GET_NOTIFICATIONS, ACTION_MARK_AS_READ};
use tray::infra::memory::MemoryNotificationStore;
use tray::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

// "0123456789abcdef0123456789abcdef" (32 bytes)
const TEST_PASETO_ACCESS_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
// "fedcba9876543210fedcba9876543210" (32 bytes)
const TEST_NONCE_KEY: &str = "ZmVkY2JhOTg3NjU0MzIxMGZlZGNiYTk4NzY1NDMyMTA=";
pub const TEST_ADMIN_TOKEN: &str = "test-admin-token-12345";

// ---------------------------------------------------------------------------
// TestApp: one per test, backed by an in-memory store
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub store: MemoryNotificationStore,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body_bytes: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).into_owned()
    }

    pub fn success(&self) -> Option<bool> {
        self.json()["success"].as_bool()
    }

    pub fn message(&self) -> String {
        self.json()["data"]["message"].as_str().unwrap_or("").to_string()
    }

    /// Value of the guest session cookie if the response set one.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookie| {
                cookie
                    .split(';')
                    .next()?
                    .trim()
                    .strip_prefix(&format!("{}=", SESSION_COOKIE_NAME))
                    .map(str::to_string)
            })
    }

    pub fn raw_set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }
}

pub fn app() -> TestApp {
    TestApp::with_admin_token(Some(TEST_ADMIN_TOKEN))
}

impl TestApp {
    pub fn with_admin_token(admin_token: Option<&str>) -> Self {
        let store = MemoryNotificationStore::new();
        let state = AppState {
            store: Arc::new(store.clone()),
            admin_token: admin_token.map(str::to_string),
            paseto_access_key: decode_key_32("PASETO_ACCESS_KEY", TEST_PASETO_ACCESS_KEY)
                .expect("test access key decodes"),
            access_ttl_minutes: 15,
            nonce_key: decode_key_32("NONCE_KEY", TEST_NONCE_KEY).expect("test nonce key decodes"),
            nonce_lifetime_seconds: 86400,
        };
        let router = tray::http::router(state.clone());

        TestApp {
            router,
            state,
            store,
        }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<(&str, String)>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = match body {
            Some((content_type, body)) => builder
                .header("content-type", content_type)
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body_bytes,
        }
    }

    // ------------------------------------------------------------------
    // Convenience HTTP helpers
    // ------------------------------------------------------------------
    pub async fn post_form(
        &self,
        path: &str,
        fields: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        self.request(
            Method::POST,
            path,
            Some(("application/x-www-form-urlencoded", body)),
            headers,
        )
        .await
    }

    pub async fn get(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request(Method::GET, path, None, headers).await
    }

    /// POST JSON with an admin token in the x-admin-token header.
    pub async fn post_admin(&self, path: &str, body: Value, admin_token: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        if let Some(t) = admin_token {
            headers.push(("x-admin-token", t));
        }
        self.request(
            Method::POST,
            path,
            Some(("application/json", body.to_string())),
            &headers,
        )
        .await
    }

    /// Delivery call as a guest, optionally presenting a session cookie.
    pub async fn deliver_as_guest(&self, session: Option<&str>) -> TestResponse {
        let nonce = self.guest_nonce();
        let cookie = session.map(|token| format!("{}={}", SESSION_COOKIE_NAME, token));
        let mut headers = vec![];
        if let Some(cookie) = cookie.as_deref() {
            headers.push(("cookie", cookie));
        }
        self.post_form(
            "/ajax",
            &[("action", ACTION_GET_NOTIFICATIONS), ("nonce", nonce.as_str())],
            &headers,
        )
        .await
    }

    pub async fn deliver_as_user(&self, user_id: i64) -> TestResponse {
        let nonce = self.nonce_for(user_id);
        let bearer = self.bearer(user_id);
        self.post_form(
            "/ajax",
            &[("action", ACTION_GET_NOTIFICATIONS), ("nonce", nonce.as_str())],
            &[("authorization", bearer.as_str())],
        )
        .await
    }

    /// Acknowledgement call as a guest with a valid nonce.
    pub async fn acknowledge(&self, id: i64) -> TestResponse {
        let nonce = self.guest_nonce();
        let id = id.to_string();
        self.post_form(
            "/ajax",
            &[
                ("action", ACTION_MARK_AS_READ),
                ("nonce", nonce.as_str()),
                ("notification_id", id.as_str()),
            ],
            &[],
        )
        .await
    }

    // ------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------
    pub fn nonce_for(&self, uid: i64) -> String {
        self.state
            .nonce_service()
            .create(NOTIFICATION_NONCE_ACTION, uid)
            .expect("nonce creation failed")
    }

    pub fn guest_nonce(&self) -> String {
        self.nonce_for(0)
    }

    pub fn bearer(&self, user_id: i64) -> String {
        let token = self
            .state
            .auth_service()
            .issue_access_token(user_id)
            .expect("issue_access_token failed");
        format!("Bearer {}", token.token)
    }

    // ------------------------------------------------------------------
    // Test data helpers
    // ------------------------------------------------------------------
    pub async fn notify_user(&self, user_id: i64, message: &str) -> Notification {
        self.store
            .create(NewNotification::new(Owner::User(user_id), message))
            .await
            .expect("create notification failed")
    }

    pub async fn notify_guest(&self, session: &str, message: &str) -> Notification {
        let token = SessionToken::parse(session).expect("valid session token");
        self.store
            .create(NewNotification::new(Owner::Session(token), message))
            .await
            .expect("create notification failed")
    }

    pub async fn create(&self, new: NewNotification) -> Notification {
        self.store.create(new).await.expect("create notification failed")
    }

    /// `(id, is_read)` for every stored row, for before/after comparisons.
    pub fn store_state(&self) -> Vec<(i64, bool)> {
        self.store
            .snapshot()
            .into_iter()
            .map(|n| (n.id, n.is_read))
            .collect()
    }
}
