//! Generic request wrapper shared by every synchronized resource.
//!
//! Attaches the bearer token, classifies the response status into the error
//! taxonomy, raises auth signals on the gate and decodes JSON bodies.

mod transport;

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

pub use transport::{
    ApiRequest, FilePart, HttpTransport, RawResponse, RequestBody, Transport, TransportError,
};

use crate::auth::{AuthGate, AuthSignal, BearerToken};
use crate::config::GENERIC_ERROR_MESSAGE;
use crate::events::EventBus;
use crate::util::compact_text;

const TOKEN_EXPIRED_CODE: &str = "token_expired";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error (HTTP {status}): {}", message.as_deref().unwrap_or("no message"))]
    Server {
        status: u16,
        message: Option<String>,
    },
    #[error("Not found: {}", .0.as_deref().unwrap_or("resource does not exist"))]
    NotFound(Option<String>),
    #[error("{0}")]
    Auth(AuthSignal),
    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),
}

impl ApiError {
    /// Failures worth retrying for idempotent reads.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    #[must_use]
    pub const fn auth_signal(&self) -> Option<AuthSignal> {
        match self {
            Self::Auth(signal) => Some(*signal),
            _ => None,
        }
    }

    /// Message reported by the server, when it sent one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Server { message, .. } | Self::NotFound(message) => message.as_deref(),
            _ => None,
        }
    }

    /// Text for a user-visible notification.
    #[must_use]
    pub fn user_message(&self, generic: &str) -> String {
        if let Some(signal) = self.auth_signal() {
            return signal.message().to_string();
        }
        self.server_message().unwrap_or(generic).to_string()
    }
}

pub struct ApiClient<T: Transport> {
    transport: T,
    gate: Arc<AuthGate>,
    generic_error_message: String,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, gate: Arc<AuthGate>) -> Self {
        Self {
            transport,
            gate,
            generic_error_message: GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    #[must_use]
    pub fn with_generic_error_message(mut self, message: impl Into<String>) -> Self {
        self.generic_error_message = message.into();
        self
    }

    pub fn gate(&self) -> &Arc<AuthGate> {
        &self.gate
    }

    pub fn bus(&self) -> &EventBus {
        self.gate.bus()
    }

    pub fn generic_error_message(&self) -> &str {
        &self.generic_error_message
    }

    pub fn user_message(&self, error: &ApiError) -> String {
        error.user_message(&self.generic_error_message)
    }

    /// Send one request; never retries.
    pub async fn send(&self, mut request: ApiRequest) -> Result<Value, ApiError> {
        match self.gate.bearer_token() {
            BearerToken::Present(token) => request.bearer_token = Some(token),
            BearerToken::Absent => {}
            BearerToken::Expired => {
                self.gate.handle_signal(AuthSignal::TokenExpired);
                return Err(ApiError::Auth(AuthSignal::TokenExpired));
            }
        }

        let method = request.method.clone();
        let path = request.path.clone();
        tracing::debug!(%method, %path, "Sending API request");

        let response = self.transport.execute(request).await.map_err(|error| {
            tracing::warn!(%method, %path, "API request did not complete: {}", error);
            ApiError::Network(error.to_string())
        })?;

        let result = classify_response(&response);
        match &result {
            Ok(_) => tracing::debug!(%method, %path, status = response.status, "API request succeeded"),
            Err(ApiError::Auth(signal)) => {
                tracing::warn!(%method, %path, status = response.status, ?signal, "API request rejected by auth");
                self.gate.handle_signal(*signal);
            }
            Err(error) => {
                tracing::warn!(%method, %path, status = response.status, "API request failed: {}", error);
            }
        }
        result
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ErrorDetails {
    message: Option<String>,
    code: Option<String>,
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToString::to_string)
}

fn parse_error_body(body: &str) -> ErrorDetails {
    let Ok(Value::Object(payload)) = serde_json::from_str::<Value>(body) else {
        return ErrorDetails::default();
    };

    let nested = payload.get("error").filter(|value| value.is_object());

    let message = text(payload.get("message"))
        .or_else(|| text(payload.get("msg")))
        .or_else(|| text(nested.and_then(|error| error.get("message"))))
        .or_else(|| text(payload.get("error")));
    let code = text(payload.get("code"))
        .or_else(|| text(nested.and_then(|error| error.get("code"))));

    ErrorDetails { message, code }
}

fn classify_response(response: &RawResponse) -> Result<Value, ApiError> {
    let status = response.status;
    if (200..300).contains(&status) {
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(&response.body).map_err(|error| {
            ApiError::InvalidPayload(format!("{error}: {}", compact_text(&response.body)))
        });
    }

    let details = parse_error_body(&response.body);
    match status {
        401 => {
            let expired = details
                .code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case(TOKEN_EXPIRED_CODE));
            Err(ApiError::Auth(if expired {
                AuthSignal::TokenExpired
            } else {
                AuthSignal::Unauthorized
            }))
        }
        403 => Err(ApiError::Auth(AuthSignal::Unauthorized)),
        404 => Err(ApiError::NotFound(details.message)),
        _ => Err(ApiError::Server {
            status,
            message: details.message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ok_json, FakeTransport};

    #[test]
    fn success_with_empty_body_is_null() {
        assert_eq!(
            classify_response(&RawResponse::new(204, "")).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn token_expired_code_maps_to_expiry_signal() {
        let response = RawResponse::new(401, r#"{"code": "token_expired", "message": "jwt expired"}"#);
        assert_eq!(
            classify_response(&response).unwrap_err(),
            ApiError::Auth(AuthSignal::TokenExpired)
        );
    }

    #[test]
    fn other_auth_failures_map_to_unauthorized() {
        assert_eq!(
            classify_response(&RawResponse::new(401, "")).unwrap_err(),
            ApiError::Auth(AuthSignal::Unauthorized)
        );
        assert_eq!(
            classify_response(&RawResponse::new(403, r#"{"code": "token_expired"}"#)).unwrap_err(),
            ApiError::Auth(AuthSignal::Unauthorized)
        );
    }

    #[test]
    fn server_message_is_extracted_from_common_shapes() {
        let flat = classify_response(&RawResponse::new(422, r#"{"message": "Titre déjà utilisé"}"#));
        assert_eq!(
            flat.unwrap_err().server_message(),
            Some("Titre déjà utilisé")
        );

        let nested = classify_response(&RawResponse::new(
            500,
            r#"{"error": {"message": "db down", "code": "E_DB"}}"#,
        ));
        assert_eq!(nested.unwrap_err().server_message(), Some("db down"));

        let plain = classify_response(&RawResponse::new(502, "<html>Bad gateway</html>"));
        assert_eq!(plain.unwrap_err().server_message(), None);
    }

    #[test]
    fn user_message_falls_back_to_generic_text() {
        let error = ApiError::Server {
            status: 500,
            message: None,
        };
        assert_eq!(error.user_message("Erreur"), "Erreur");
        assert!(error.is_transient());
        assert!(!ApiError::NotFound(None).is_transient());
    }

    #[tokio::test]
    async fn send_attaches_bearer_token() {
        let transport = FakeTransport::new();
        transport.push(ok_json(serde_json::json!([])));
        let gate = crate::test_support::signed_in_gate();
        let client = ApiClient::new(transport.clone(), gate);

        client.send(ApiRequest::get("/api/news")).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].bearer_token.as_deref(), Some("test-token"));
    }

    #[tokio::test]
    async fn locally_expired_session_fails_without_network() {
        let transport = FakeTransport::new();
        let gate = crate::test_support::expired_gate();
        let client = ApiClient::new(transport.clone(), gate.clone());

        let error = client.send(ApiRequest::get("/api/news")).await.unwrap_err();

        assert_eq!(error, ApiError::Auth(AuthSignal::TokenExpired));
        assert!(transport.calls().is_empty());
        assert!(gate.session_ended());
    }

    #[tokio::test]
    async fn transport_failure_is_a_network_error() {
        let transport = FakeTransport::new();
        transport.push_network_error("connection reset");
        let client = ApiClient::new(transport, crate::test_support::anonymous_gate());

        let error = client.send(ApiRequest::get("/api/news")).await.unwrap_err();
        assert!(matches!(error, ApiError::Network(_)));
    }
}
