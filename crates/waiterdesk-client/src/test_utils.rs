//! Test utilities for client types
//!
//! Provides a scripted [`FakeBackend`] plus helpers for building sessions and
//! wire records.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use url::Url;

use waiterdesk_core::prelude::*;
use waiterdesk_core::{Session, User, UserRole};

use crate::http::{ApiClient, HttpBackend, HttpRequest, HttpResponse};
use crate::session::SessionStore;

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct FakeInner {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    fallback: Mutex<Option<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
    hook: Mutex<Option<Hook>>,
    yield_before_reply: AtomicBool,
}

/// An [`HttpBackend`] that replays queued responses and records requests.
///
/// Queued responses are consumed in order; once the queue is empty the
/// fallback (if set) answers every request, otherwise a 404 does.
#[derive(Clone, Default)]
pub struct FakeBackend {
    inner: Arc<FakeInner>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield to the scheduler between recording a request and answering it,
    /// so concurrently polled requests interleave.
    pub fn yield_before_reply(self) -> Self {
        self.inner.yield_before_reply.store(true, Ordering::SeqCst);
        self
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_status(status, &body.to_string());
    }

    pub fn push_status(&self, status: u16, body: &str) {
        lock(&self.inner.responses).push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn push_error(&self, error: Error) {
        lock(&self.inner.responses).push_back(Err(error));
    }

    pub fn set_fallback(&self, status: u16, body: Value) {
        *lock(&self.inner.fallback) = Some(HttpResponse {
            status,
            body: body.to_string(),
        });
    }

    /// Run `hook` once, inside the next `execute`, before it answers.
    pub fn on_execute(&self, hook: impl FnOnce() + Send + 'static) {
        *lock(&self.inner.hook) = Some(Box::new(hook));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.inner.requests).clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        lock(&self.inner.requests).last().cloned()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.inner.requests).len()
    }
}

impl HttpBackend for FakeBackend {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        lock(&self.inner.requests).push(request);

        if self.inner.yield_before_reply.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        let hook = lock(&self.inner.hook).take();
        if let Some(hook) = hook {
            hook();
        }

        if let Some(next) = lock(&self.inner.responses).pop_front() {
            return next;
        }
        let fallback = lock(&self.inner.fallback).clone();
        Ok(fallback.unwrap_or_else(|| HttpResponse {
            status: 404,
            body: json!({"message": "no scripted response"}).to_string(),
        }))
    }
}

/// An [`ApiClient`] over a fresh [`FakeBackend`] at `http://api.test/api`.
pub fn fake_client(session: SessionStore) -> (ApiClient<FakeBackend>, FakeBackend) {
    let backend = FakeBackend::new();
    let base = Url::parse("http://api.test/api").expect("valid test URL");
    (ApiClient::new(backend.clone(), base, session), backend)
}

/// A waiter belonging to restaurant `r1`.
pub fn sample_user() -> User {
    User {
        id: "u1".to_string(),
        name: "Ana".to_string(),
        email: "ana@example.com".to_string(),
        role: UserRole::Waiter,
        restaurant_id: Some("r1".to_string()),
    }
}

pub fn sample_session(token: &str) -> Session {
    Session {
        token: token.to_string(),
        user: sample_user(),
    }
}

/// A REST-shaped waiter call record for restaurant `r1`.
pub fn call_json(call_id: &str, status: &str) -> Value {
    json!({
        "_id": call_id,
        "restaurant": "r1",
        "table": {"_id": format!("t-{call_id}"), "number": 3},
        "customerName": "Guest",
        "message": "",
        "status": status,
        "createdAt": "2024-05-01T19:55:00Z"
    })
}
