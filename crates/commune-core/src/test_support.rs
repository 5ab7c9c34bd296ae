//! Scripted transport and gate fixtures for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::api::{ApiRequest, RawResponse, Transport, TransportError};
use crate::auth::{AuthGate, AuthSession, AuthUser};
use crate::events::EventBus;
use crate::models::UserRole;

type Scripted = (Duration, Result<RawResponse, TransportError>);

/// Replays scripted responses in order and records every request.
#[derive(Clone, Default)]
pub struct FakeTransport {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<ApiRequest>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<RawResponse, TransportError>) {
        self.push_delayed(Duration::ZERO, response);
    }

    pub fn push_delayed(&self, delay: Duration, response: Result<RawResponse, TransportError>) {
        self.responses.lock().unwrap().push_back((delay, response));
    }

    pub fn push_network_error(&self, message: &str) {
        self.push(Err(TransportError(message.to_string())));
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|request| format!("{} {}", request.method, request.path))
            .collect()
    }
}

impl Transport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, TransportError> {
        self.calls.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        let Some((delay, response)) = next else {
            return Err(TransportError("no scripted response".to_string()));
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

pub fn ok_json(value: Value) -> Result<RawResponse, TransportError> {
    status_json(200, value)
}

pub fn status_json(status: u16, value: Value) -> Result<RawResponse, TransportError> {
    Ok(RawResponse::new(status, value.to_string()))
}

pub fn test_session(expires_at: Option<i64>) -> AuthSession {
    AuthSession {
        access_token: "test-token".to_string(),
        expires_at,
        user: AuthUser {
            id: "1".to_string(),
            name: Some("Agent d'accueil".to_string()),
            email: Some("accueil@mairie.example.fr".to_string()),
            role: UserRole::Admin,
        },
    }
}

pub fn anonymous_gate() -> Arc<AuthGate> {
    Arc::new(AuthGate::in_memory(EventBus::default()))
}

pub fn signed_in_gate() -> Arc<AuthGate> {
    signed_in_gate_on(EventBus::default())
}

pub fn signed_in_gate_on(bus: EventBus) -> Arc<AuthGate> {
    let gate = AuthGate::in_memory(bus);
    gate.sign_in(test_session(None)).unwrap();
    Arc::new(gate)
}

pub fn expired_gate() -> Arc<AuthGate> {
    let gate = AuthGate::in_memory(EventBus::default());
    gate.sign_in(test_session(Some(0))).unwrap();
    Arc::new(gate)
}
