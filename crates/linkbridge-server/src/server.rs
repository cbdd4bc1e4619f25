use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use linkbridge_auth::{
    CredentialSigner, HttpProviderClient, ProviderClient, TokenExchangeVerifier, VerifyState,
    verify_handler,
};
use linkbridge_db_memory::{DynAccountStore, create_account_store};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::AppConfig, handlers, middleware as app_middleware};

/// Router state.
pub type AppState = VerifyState;

pub struct LinkbridgeServer {
    addr: SocketAddr,
    app: Router,
    shutdown: CancellationToken,
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        // Health endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        // Token exchange; /verifyToken is kept for existing clients
        .route("/verify", post(verify_handler))
        .route("/verifyToken", post(verify_handler))
        .with_state(state)
        // Middleware stack (outermost last: request id -> trace -> cors -> body limit)
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
    account_store: Option<DynAccountStore>,
    provider: Option<Arc<dyn ProviderClient>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
            account_store: None,
            provider: None,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Use this store instead of the in-memory one built from `[credential]`.
    pub fn with_account_store(mut self, store: DynAccountStore) -> Self {
        self.account_store = Some(store);
        self
    }

    /// Use this provider client instead of the HTTP one built from `[provider]`.
    pub fn with_provider_client(mut self, provider: Arc<dyn ProviderClient>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> anyhow::Result<LinkbridgeServer> {
        let store = match self.account_store {
            Some(store) => store,
            None => {
                let signer = CredentialSigner::new(self.config.credential.clone())?;
                tracing::info!(
                    algorithm = ?self.config.credential.algorithm,
                    issuer = %self.config.credential.issuer,
                    "Using in-memory account store"
                );
                create_account_store(signer)
            }
        };
        let provider: Arc<dyn ProviderClient> = match self.provider {
            Some(provider) => provider,
            None => Arc::new(HttpProviderClient::new(self.config.provider.clone())?),
        };

        let verifier = TokenExchangeVerifier::new(provider, store, &self.config.provider);
        let shutdown = CancellationToken::new();
        let state = VerifyState::new(Arc::new(verifier)).with_cancellation(shutdown.clone());

        Ok(LinkbridgeServer {
            addr: self.addr,
            app: build_app(state, &self.config),
            shutdown,
        })
    }
}

impl LinkbridgeServer {
    /// Token that stops the server. Cancelling it also aborts exchanges still
    /// in flight.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Binds the configured address and serves until Ctrl+C.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.cancel();
        });
        self.serve(listener).await
    }

    /// Serves on an already bound listener until the shutdown token fires.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        tracing::info!("listening on {}", listener.local_addr()?);
        let shutdown = self.shutdown;
        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
