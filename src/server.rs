//! Webhook HTTP server.
//!
//! One route: Telegram POSTs updates to `/webhook/{token}`, where the token
//! segment doubles as shared-secret authentication. The handler only decodes
//! and enqueues; all conversation logic lives behind the channel in the
//! dispatch loop. Telegram retries non-200 responses, so the handler answers
//! 200 even for bodies it cannot parse.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::error::ServerError;
use crate::telegram::Update;

#[derive(Clone)]
struct AppState {
    token: String,
    updates: mpsc::Sender<Update>,
}

/// The webhook endpoint and its background serve task.
pub struct WebhookServer {
    addr: SocketAddr,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl WebhookServer {
    pub fn new(addr: SocketAddr, token: String, updates: mpsc::Sender<Update>) -> Self {
        Self {
            addr,
            state: AppState { token, updates },
            shutdown_tx: None,
            handle: None,
        }
    }

    /// Bind the listener and spawn the server task.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/webhook/{token}", post(receive_update))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone());

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;

        tracing::info!("webhook server listening on {}", self.addr);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("webhook server shutting down");
                })
                .await
            {
                tracing::error!("webhook server error: {}", e);
            }
        });

        self.handle = Some(handle);
        Ok(())
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn receive_update(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    if token != state.token {
        tracing::warn!("webhook request with wrong token");
        return StatusCode::NOT_FOUND;
    }

    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            if state.updates.send(update).await.is_err() {
                tracing::warn!("update channel closed, dropping update");
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "unparseable update body");
        }
    }

    StatusCode::OK
}
