//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one task per connection. Bodies are collected
//! (up to `MAX_BODY_BYTES`) before routing.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::assets::{AssetHost, PassthroughAssetHost};
use crate::auth::JwtValidator;
use crate::config::Args;
use crate::routes::{self, response};
use crate::store::{MemoryStore, SocialStore};
use crate::types::{ChorusError, Result};

/// Largest accepted request body (images arrive inline before upload)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub store: Arc<dyn SocialStore>,
    /// Session issuer and verifier
    pub sessions: JwtValidator,
    pub assets: Arc<dyn AssetHost>,
}

impl AppState {
    pub fn new(
        args: Args,
        store: Arc<dyn SocialStore>,
        assets: Arc<dyn AssetHost>,
    ) -> Result<Self> {
        let sessions = JwtValidator::new(args.jwt_secret(), args.session_ttl())?;
        Ok(Self {
            args,
            store,
            sessions,
            assets,
        })
    }

    /// In-memory store with images stored as submitted
    pub fn in_memory(args: Args) -> Result<Self> {
        Self::new(
            args,
            Arc::new(MemoryStore::default()),
            Arc::new(PassthroughAssetHost),
        )
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        listen = %state.args.listen,
        transport = ?state.args.session_transport,
        "Chorus listening"
    );
    if state.args.dev_mode {
        warn!("Development mode enabled - do not expose this instance");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Collect the body and hand the request to the router
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!(%request_id, peer = %addr, %method, %path, "Request");

    let (parts, body) = req.into_parts();
    let response = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => {
            let req = Request::from_parts(parts, collected.to_bytes());
            routes::dispatch(&state, req).await
        }
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(%request_id, "Request body over {} bytes", MAX_BODY_BYTES);
            response::payload_too_large()
        }
        Err(e) => response::error_response(ChorusError::Validation(format!(
            "Failed to read body: {}",
            e
        ))),
    };

    info!(
        %request_id,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Response"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_requires_secret_outside_dev_mode() {
        let mut args = Args::for_tests();
        args.dev_mode = false;
        args.jwt_secret = None;
        assert!(matches!(
            AppState::in_memory(args).err(),
            Some(ChorusError::Config(_))
        ));
    }

    #[test]
    fn test_state_with_configured_secret() {
        let mut args = Args::for_tests();
        args.dev_mode = false;
        args.jwt_secret = Some("0123456789abcdef0123456789abcdef".into());
        let state = AppState::in_memory(args).unwrap();
        assert_eq!(state.sessions.ttl(), state.args.session_ttl());
    }
}
