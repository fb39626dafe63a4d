//! Scripted HTTP transport
//!
//! Responses are queued per `(method, path)`. The last queued response keeps
//! repeating once the queue is drained, so a route mounted with a single
//! response answers every call the same way.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use belay_core::HttpTransport;
use belay_domain::constants::AUTHORIZATION_HEADER;
use belay_domain::{ApiRequest, ApiResponse, HttpMethod, TransportError, TransportErrorKind};
use parking_lot::Mutex;

#[derive(Clone)]
enum Scripted {
    Respond(ApiResponse),
    Fail(TransportError),
}

type Route = (HttpMethod, String);

#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<Route, VecDeque<Scripted>>>,
    delays: Mutex<HashMap<Route, Duration>>,
    requests: Mutex<Vec<ApiRequest>>,
    calls: AtomicUsize,
}

impl MockTransport {
    /// Queue `status` + JSON `body` for the route.
    pub fn respond(&self, method: HttpMethod, path: &str, status: u16, body: serde_json::Value) {
        let response = ApiResponse::new(status, body.to_string().into_bytes());
        self.push(method, path, Scripted::Respond(response));
    }

    pub fn respond_raw(&self, method: HttpMethod, path: &str, response: ApiResponse) {
        self.push(method, path, Scripted::Respond(response));
    }

    pub fn fail(&self, method: HttpMethod, path: &str, kind: TransportErrorKind) {
        self.push(method, path, Scripted::Fail(TransportError::new(kind, "scripted failure")));
    }

    /// Hold every response on the route for `delay`.
    pub fn delay(&self, method: HttpMethod, path: &str, delay: Duration) {
        self.delays.lock().insert((method, path.to_string()), delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, method: HttpMethod, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == method && request.target == path)
            .count()
    }

    pub fn requests_to(&self, method: HttpMethod, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == method && request.target == path)
            .cloned()
            .collect()
    }

    /// Bearer tokens sent to the route, in order.
    pub fn bearers_to(&self, method: HttpMethod, path: &str) -> Vec<String> {
        self.requests_to(method, path)
            .iter()
            .filter_map(|request| request.header_value(AUTHORIZATION_HEADER))
            .map(|value| value.trim_start_matches("Bearer ").to_string())
            .collect()
    }

    fn push(&self, method: HttpMethod, path: &str, scripted: Scripted) {
        self.routes.lock().entry((method, path.to_string())).or_default().push_back(scripted);
    }

    fn next(&self, route: &Route) -> Option<Scripted> {
        let mut routes = self.routes.lock();
        let queue = routes.get_mut(route)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let route = (request.method, request.target.clone());
        let delay = self.delays.lock().get(&route).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match self.next(&route) {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(error)) => Err(error),
            None => Ok(ApiResponse::new(404, format!("no route for {} {}", route.0, route.1))),
        }
    }
}

/// Token endpoint body for a pair.
pub fn token_response(access: &str, refresh: &str, expires_at: i64) -> serde_json::Value {
    serde_json::json!({
        "accessToken": access,
        "refreshToken": refresh,
        "expiresAt": expires_at,
    })
}
