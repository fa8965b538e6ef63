use std::{
    collections::{HashMap, HashSet},
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::ApiError;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;
/// Above this many tracked clients, expired windows are swept on insert.
const SWEEP_THRESHOLD: usize = 4_096;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Bearer tokens accepted on `/api/v1/admin/*`; `None` means auth is off.
#[derive(Debug, Clone)]
pub struct AuthState {
    admin_keys: Option<Arc<HashSet<String>>>,
}

impl AuthState {
    /// Builds auth from the configured admin keys.
    ///
    /// An empty key list is only accepted in development, where it turns
    /// admin auth off.
    pub fn from_keys(keys: &[String], is_development: bool) -> anyhow::Result<Self> {
        let keys: HashSet<String> = keys
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .collect();

        match (keys.is_empty(), is_development) {
            (false, _) => Ok(Self {
                admin_keys: Some(Arc::new(keys)),
            }),
            (true, true) => {
                tracing::warn!("SOLESTOCK_ADMIN_API_KEYS not set; admin routes are open");
                Ok(Self { admin_keys: None })
            }
            (true, false) => anyhow::bail!(
                "SOLESTOCK_ADMIN_API_KEYS is required outside development"
            ),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.admin_keys.is_some()
    }

    fn allows(&self, token: Option<&str>) -> bool {
        match (&self.admin_keys, token) {
            (None, _) => true,
            (Some(keys), Some(token)) => keys.contains(token),
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    started_at: Instant,
    orders: usize,
}

/// Per-client fixed-window limit on order submissions.
///
/// Clients are told apart by [`client_key`], so one busy buyer cannot use up
/// the allowance of every other storefront visitor.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_orders: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, ClientWindow>>>,
}

/// Outcome of counting one request against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Allowed,
    Limited { retry_after: Duration },
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_orders: usize, window: Duration) -> Self {
        Self {
            max_orders,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn admit(&self, client: &str, now: Instant) -> Admission {
        let mut clients = self.clients.lock().await;

        if clients.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.started_at) < window);
        }

        let entry = clients
            .entry(client.to_owned())
            .or_insert(ClientWindow {
                started_at: now,
                orders: 0,
            });

        let elapsed = now.duration_since(entry.started_at);
        if elapsed >= self.window {
            *entry = ClientWindow {
                started_at: now,
                orders: 0,
            };
        }

        if entry.orders >= self.max_orders {
            return Admission::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            };
        }

        entry.orders += 1;
        Admission::Allowed
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.clients.lock().await.len()
    }
}

/// Identifies the submitting client: the first `x-forwarded-for` hop when the
/// server sits behind a proxy, else the peer address, else `"unknown"`.
fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_owned())
}

fn current_request_id(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Reuses a caller-supplied `x-request-id` when it is short printable ASCII,
/// otherwise generates a `UUIDv4`. The id is stored as [`RequestId`], echoed
/// on the response and attached to a `request` tracing span.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| {
            !v.is_empty()
                && v.len() <= MAX_REQUEST_ID_LEN
                && v.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let span = tracing::info_span!("request", request_id = %id);
    let mut res = next.run(req).instrument(span).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert(REQUEST_ID_HEADER, val);
    }

    res
}

/// Guards the admin router with the configured bearer tokens.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let token = extract_bearer_token(req.headers().get(header::AUTHORIZATION));
    if auth.allows(token) {
        return next.run(req).await;
    }

    tracing::warn!(path = %req.uri().path(), "admin request rejected: bad bearer token");
    ApiError::new(
        current_request_id(&req),
        "unauthorized",
        "missing or invalid bearer token",
    )
    .into_response()
}

/// Counts an order submission against the caller's window.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer);

    match rate_limit.admit(&client, Instant::now()).await {
        Admission::Allowed => next.run(req).await,
        Admission::Limited { retry_after } => {
            tracing::info!(client = %client, "order submission rate limited");
            let mut res = ApiError::new(
                current_request_id(&req),
                "rate_limited",
                "too many orders from this client; try again shortly",
            )
            .into_response();
            let secs = retry_after.as_secs().max(1);
            if let Ok(val) = HeaderValue::from_str(&secs.to_string()) {
                res.headers_mut().insert(header::RETRY_AFTER, val);
            }
            res
        }
    }
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::StatusCode, routing::post, Router};
    use tower::ServiceExt;

    use super::*;

    fn limited_router(state: RateLimitState) -> Router {
        Router::new()
            .route("/orders", post(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                state,
                enforce_rate_limit,
            ))
    }

    fn order_from(client: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/orders")
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn auth_state_is_open_without_keys_in_dev() {
        let state = AuthState::from_keys(&[], true).expect("dev should allow missing keys");
        assert!(!state.is_enabled());
        assert!(state.allows(None));
    }

    #[test]
    fn auth_state_requires_keys_outside_dev() {
        assert!(AuthState::from_keys(&[" ".to_string()], false).is_err());
    }

    #[test]
    fn auth_state_trims_configured_keys() {
        let state = AuthState::from_keys(&[" secret ".to_string()], false).expect("keys");
        assert!(state.is_enabled());
        assert!(state.allows(Some("secret")));
        assert!(!state.allows(Some("other")));
        assert!(!state.allows(None));
    }

    #[test]
    fn client_key_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer: SocketAddr = "10.0.0.1:5000".parse().expect("addr");
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn client_key_falls_back_to_peer_then_unknown() {
        let peer: SocketAddr = "198.51.100.2:443".parse().expect("addr");
        assert_eq!(client_key(&HeaderMap::new(), Some(peer)), "198.51.100.2");
        assert_eq!(client_key(&HeaderMap::new(), None), "unknown");
    }

    #[tokio::test]
    async fn windows_are_counted_per_client() {
        let state = RateLimitState::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert_eq!(state.admit("a", now).await, Admission::Allowed);
        assert_eq!(state.admit("a", now).await, Admission::Allowed);
        assert!(matches!(
            state.admit("a", now).await,
            Admission::Limited { .. }
        ));
        assert_eq!(state.admit("b", now).await, Admission::Allowed);
    }

    #[tokio::test]
    async fn window_resets_after_it_elapses() {
        let state = RateLimitState::new(1, Duration::from_secs(60));
        let start = Instant::now();

        assert_eq!(state.admit("a", start).await, Admission::Allowed);
        assert_eq!(
            state.admit("a", start + Duration::from_secs(15)).await,
            Admission::Limited {
                retry_after: Duration::from_secs(45)
            }
        );
        assert_eq!(
            state.admit("a", start + Duration::from_secs(61)).await,
            Admission::Allowed
        );
    }

    #[tokio::test]
    async fn expired_windows_are_swept_once_the_map_is_large() {
        let state = RateLimitState::new(1, Duration::from_secs(60));
        let start = Instant::now();
        for i in 0..SWEEP_THRESHOLD {
            state.admit(&format!("client-{i}"), start).await;
        }
        assert_eq!(state.tracked_clients().await, SWEEP_THRESHOLD);

        state
            .admit("late", start + Duration::from_secs(120))
            .await;
        assert_eq!(state.tracked_clients().await, 1);
    }

    #[tokio::test]
    async fn busy_client_does_not_block_other_buyers() {
        let app = limited_router(RateLimitState::new(1, Duration::from_secs(60)));

        let first = app
            .clone()
            .oneshot(order_from("203.0.113.7"))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let repeat = app
            .clone()
            .oneshot(order_from("203.0.113.7"))
            .await
            .expect("response");
        assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(repeat.headers().contains_key(header::RETRY_AFTER));

        let other = app
            .oneshot(order_from("198.51.100.2"))
            .await
            .expect("response");
        assert_eq!(other.status(), StatusCode::OK);
    }
}
