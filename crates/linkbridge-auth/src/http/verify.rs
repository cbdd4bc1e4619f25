//! Verify endpoint.
//!
//! Accepts `{ "accessToken": "..." }` and answers `{ "credential": "..." }`.
//! Failures are reported as `{ "error": <message>, "code": <code> }` with the
//! status from [`ExchangeError::status_code`].

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::ExchangeError;
use crate::federation::TokenExchangeVerifier;

/// Shared state for the verify endpoint.
#[derive(Clone)]
pub struct VerifyState {
    /// The exchange verifier.
    pub verifier: Arc<TokenExchangeVerifier>,

    /// Parent token for in-flight exchanges. Cancelling it aborts every
    /// exchange that has not minted its credential yet.
    pub cancel: CancellationToken,
}

impl VerifyState {
    /// Creates state with a token that is never cancelled.
    #[must_use]
    pub fn new(verifier: Arc<TokenExchangeVerifier>) -> Self {
        Self {
            verifier,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `cancel` as the parent of every exchange's cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Verify request body.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    /// Provider access token.
    #[serde(rename = "accessToken", default)]
    pub access_token: String,
}

/// Verify response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Signed custom credential for the Account Service.
    pub credential: String,
}

/// `POST /verify`
///
/// A missing or malformed body is reported as `InvalidInput` so clients see
/// the same error shape as for an empty token.
pub async fn verify_handler(
    State(state): State<VerifyState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ExchangeError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected verify request body");
        ExchangeError::invalid_input("Request body must be JSON with an accessToken field")
    })?;

    let cancel = state.cancel.child_token();
    let credential = state
        .verifier
        .exchange_with_cancellation(&request.access_token, &cancel)
        .await?;

    Ok(Json(VerifyResponse {
        credential: credential.token,
    }))
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.public_message(),
            "code": self.error_code(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        routing::post,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::ProviderConfig;
    use crate::federation::testing::{ScriptedStore, StaticProvider};
    use crate::storage::AccountStoreError;

    fn app(provider: Arc<StaticProvider>, store: Arc<ScriptedStore>) -> Router {
        let verifier = TokenExchangeVerifier::new(provider, store, &ProviderConfig::default());
        Router::new()
            .route("/verify", post(verify_handler))
            .with_state(VerifyState::new(Arc::new(verifier)))
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/verify")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_verify_success() {
        let store = ScriptedStore::new();
        let app = app(StaticProvider::profile("U1", Some("Alice")), store.clone());

        let (status, body) = post_json(app, r#"{"accessToken":"tok-abc"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["credential"], "credential-for-line:U1");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_verify_missing_field() {
        let provider = StaticProvider::profile("U1", None);
        let app = app(provider.clone(), ScriptedStore::new());

        let (status, body) = post_json(app, "{}").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_verify_token_with_control_characters() {
        let provider = StaticProvider::profile("U1", None);
        let store = ScriptedStore::new();
        let app = app(provider.clone(), store.clone());

        let (status, body) = post_json(app, r#"{"accessToken":"tok\nabc"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
        assert_eq!(provider.calls(), 0);
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_verify_malformed_json() {
        let app = app(StaticProvider::profile("U1", None), ScriptedStore::new());

        let (status, body) = post_json(app, "not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn test_verify_upstream_error_hides_body() {
        let provider = StaticProvider::failing(|| {
            ExchangeError::upstream_status(401, "{\"message\":\"internal detail\"}")
        });
        let app = app(provider, ScriptedStore::new());

        let (status, body) = post_json(app, r#"{"accessToken":"expired"}"#).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "upstream_unavailable");
        assert!(!body.to_string().contains("internal detail"));
    }

    #[tokio::test]
    async fn test_verify_mint_failure() {
        let store = ScriptedStore::new();
        store.fail_mint(AccountStoreError::backend("signer offline"));
        let app = app(StaticProvider::profile("U1", None), store);

        let (status, body) = post_json(app, r#"{"accessToken":"tok-abc"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "credential_mint_failed");
        assert_eq!(body["error"], "Failed to mint credential");
    }

    #[tokio::test]
    async fn test_verify_cancelled_parent() {
        let provider = StaticProvider::profile("U1", None);
        let store = ScriptedStore::new();
        let verifier = TokenExchangeVerifier::new(provider, store.clone(), &ProviderConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let app = Router::new()
            .route("/verify", post(verify_handler))
            .with_state(VerifyState::new(Arc::new(verifier)).with_cancellation(cancel));

        let (status, body) = post_json(app, r#"{"accessToken":"tok-abc"}"#).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "cancelled");
        assert_eq!(store.total_calls(), 0);
    }
}
