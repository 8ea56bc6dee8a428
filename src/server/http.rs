//! HTTP server implementation
//!
//! hyper http1 with TokioIo; one spawned task per connection, route
//! dispatch via `match (method, path)`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::Args;
use crate::engine::{DistributionEngine, MemberDirectory};
use crate::routes;
use crate::types::GuildError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub engine: Arc<DistributionEngine>,
    pub directory: Arc<MemberDirectory>,
    /// Which store backend is active ("sled" or "memory")
    pub store_backend: &'static str,
}

impl AppState {
    pub fn new(
        args: Args,
        engine: Arc<DistributionEngine>,
        directory: Arc<MemberDirectory>,
        store_backend: &'static str,
    ) -> Self {
        Self {
            args,
            engine,
            directory,
            store_backend,
        }
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), GuildError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Guildhall listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
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

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
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

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    // CORS preflight
    if method == Method::OPTIONS {
        return Ok(preflight_response());
    }

    // Member routes consume the request (JSON bodies)
    if path.starts_with("/api/v1/members") {
        if let Some(response) = routes::handle_members_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    // Distribution list routes
    if path.starts_with("/api/v1/lists") {
        if let Some(response) = routes::handle_lists_request(req, Arc::clone(&state)).await {
            return Ok(response);
        }
        return Ok(not_found_response(&path));
    }

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(Arc::clone(&state))
        }

        // Readiness probe - store must be reachable
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state)).await
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // Full grant log
        (Method::GET, "/api/v1/history") => match state.directory.grant_log().await {
            Ok(records) => routes::json_response(StatusCode::OK, &records),
            Err(e) => routes::guild_error_response(e),
        },

        _ => not_found_response(&path),
    };

    Ok(response)
}

fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": format!("Not found: {}", path) });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
