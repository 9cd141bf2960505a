//! In-process stand-in for the GeoConfess server.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use geoconfess_sync::api::{ApiRequest, HttpMethod, Transport};
use geoconfess_sync::SyncError;
use serde_json::{json, Value};
use tokio::sync::{Notify, Semaphore};
use tokio::time::Instant;

use super::constants::*;

type Route = (HttpMethod, String);

/// Answers requests from per-route scripts.
///
/// Queued responses are consumed in order; once a route's queue is empty its
/// fallback answers. Without a fallback, `GET /notifications` and
/// `GET /messages` return an empty list and everything else `null`.
#[derive(Default)]
pub struct ScriptedTransport {
    queued: Mutex<HashMap<Route, VecDeque<Result<Value, SyncError>>>>,
    fallbacks: Mutex<HashMap<Route, Result<Value, SyncError>>>,
    gates: Mutex<HashMap<Route, Arc<Semaphore>>>,
    log: Mutex<Vec<(Instant, ApiRequest)>>,
    request_logged: Notify,
}

/// Holds requests on one route until released.
pub struct Gate(Arc<Semaphore>);

impl Gate {
    /// Lets one held (or future) request through.
    pub fn release(&self) {
        self.0.add_permits(1);
    }
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, method: HttpMethod, path: &str, response: Result<Value, SyncError>) {
        self.queued
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(response);
    }

    pub fn set_fallback(&self, method: HttpMethod, path: &str, response: Result<Value, SyncError>) {
        self.fallbacks
            .lock()
            .unwrap()
            .insert((method, path.to_string()), response);
    }

    /// Queues a `GET /notifications` window.
    pub fn push_notifications(&self, window: Vec<Value>) {
        self.push(HttpMethod::Get, NOTIFICATIONS_PATH, Ok(json!(window)));
    }

    /// Makes every request on the route wait for a [`Gate::release`].
    pub fn hold(&self, method: HttpMethod, path: &str) -> Gate {
        let semaphore = Arc::new(Semaphore::new(0));
        self.gates
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Arc::clone(&semaphore));
        Gate(semaphore)
    }

    pub fn requests(&self, method: HttpMethod, path: &str) -> Vec<ApiRequest> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.method == method && r.path == path)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn request_count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests(method, path).len()
    }

    /// When each request on the route arrived.
    pub fn request_times(&self, method: HttpMethod, path: &str) -> Vec<Instant> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, r)| r.method == method && r.path == path)
            .map(|(at, _)| *at)
            .collect()
    }

    /// Waits until the route has seen at least `count` requests.
    pub async fn wait_for_requests(&self, method: HttpMethod, path: &str, count: usize) {
        let wait = async {
            loop {
                let logged = self.request_logged.notified();
                if self.request_count(method, path) >= count {
                    return;
                }
                logged.await;
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(EVENT_TIMEOUT_SECS), wait)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {} {} x{}", method, path, count));
    }

    fn next_response(&self, route: &Route) -> Result<Value, SyncError> {
        if let Some(response) = self
            .queued
            .lock()
            .unwrap()
            .get_mut(route)
            .and_then(|queue| queue.pop_front())
        {
            return response;
        }
        if let Some(response) = self.fallbacks.lock().unwrap().get(route) {
            return response.clone();
        }
        match (route.0, route.1.as_str()) {
            (HttpMethod::Get, NOTIFICATIONS_PATH) | (HttpMethod::Get, MESSAGES_PATH) => {
                Ok(json!([]))
            }
            _ => Ok(Value::Null),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> Result<Value, SyncError> {
        let route = (request.method, request.path.clone());
        self.log.lock().unwrap().push((Instant::now(), request));
        self.request_logged.notify_waiters();

        let gate = self.gates.lock().unwrap().get(&route).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        self.next_response(&route)
    }
}
