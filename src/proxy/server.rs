use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::proxy::binding::PanelBindingStore;
use crate::proxy::envelope::ApiEnvelope;
use crate::proxy::forwarder::RequestForwarder;
use crate::proxy::session::SessionStore;
use crate::proxy::ProxyConfig;

/// How often expired sessions (and their bindings) are swept
const SESSION_SWEEP_INTERVAL_SECS: u64 = 600;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub sessions: Arc<SessionStore>,
    pub bindings: Arc<PanelBindingStore>,
    pub forwarder: Arc<RequestForwarder>,
}

/// Axum server instance
pub struct AxumServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl AxumServer {
    /// Start the proxy server
    pub async fn start(
        host: String,
        port: u16,
        config: Arc<ProxyConfig>,
        sessions: Arc<SessionStore>,
        bindings: Arc<PanelBindingStore>,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), String> {
        let forwarder = Arc::new(RequestForwarder::new(config.request_timeout));

        let state = AppState {
            config,
            sessions: sessions.clone(),
            bindings: bindings.clone(),
            forwarder,
        };

        // Periodic sweep keeps the in-memory stores bounded in long-lived
        // processes; bindings die with their owning session
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                let removed = sessions.cleanup_expired();
                for session_id in &removed {
                    bindings.clear(session_id);
                }
                if !removed.is_empty() {
                    debug!("swept {} expired session(s)", removed.len());
                }
            }
        });

        use crate::proxy::handlers;

        let app = Router::new()
            // Session lifecycle
            .route("/auth/login", post(handlers::auth::login))
            .route("/auth/logout", post(handlers::auth::logout))
            .route("/auth/status", get(handlers::auth::status))
            // Panel binding and forwarding
            .route(
                "/proxy/bind-panel-key",
                post(handlers::panel::bind_panel_key),
            )
            .route(
                "/proxy/request",
                get(handlers::panel::proxy_request_get).post(handlers::panel::proxy_request_post),
            )
            .route(
                "/btpanel/request",
                get(handlers::panel::btpanel_request_get)
                    .post(handlers::panel::btpanel_request_post),
            )
            .route("/healthz", get(health_check_handler))
            .fallback(not_found_handler)
            .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
            .layer(crate::proxy::middleware::cors_layer())
            .layer(TraceLayer::new_for_http())
            .layer(axum::middleware::from_fn_with_state(
                state.clone(),
                crate::proxy::middleware::auth_middleware,
            ))
            .with_state(state);

        // Bind address
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| format!("Failed to bind address {}: {}", addr, e))?;

        tracing::info!("Panel proxy server started at http://{}", addr);

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let server_instance = Self {
            shutdown_tx: Some(shutdown_tx),
        };

        // Serve connections in a new task
        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling ended or error: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("Panel proxy server stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server_instance, handle))
    }

    /// Stop the server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Health check handler
async fn health_check_handler() -> ApiEnvelope {
    ApiEnvelope::success(json!({ "status": "ok" }))
}

/// Enveloped 404 so unknown paths never leave the boundary unwrapped
async fn not_found_handler() -> ApiEnvelope {
    ApiEnvelope::error(404, "not found", serde_json::Value::Null)
}
