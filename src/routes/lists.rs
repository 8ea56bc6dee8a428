//! Distribution list API routes
//!
//! - `GET  /api/v1/lists` - status for every tier
//! - `GET  /api/v1/lists/{tier}` - status for one tier
//! - `POST /api/v1/lists/refresh` - refresh every tier from the member store
//! - `POST /api/v1/lists/{tier}/refresh` - refresh one tier
//! - `POST /api/v1/lists/{tier}/draw` - select a winner
//! - `POST /api/v1/lists/{tier}/force-complete` - close out a stalled cycle

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::models::LinkTier;
use crate::server::AppState;

use super::{error_response, guild_error_response, json_response};

/// Parsed list route components
#[derive(Debug)]
struct ListRoute<'a> {
    head: Option<&'a str>,
    action: Option<&'a str>,
}

impl<'a> ListRoute<'a> {
    /// Parse "/api/v1/lists", "/api/v1/lists/{tier}", or
    /// "/api/v1/lists/{tier}/{action}"
    fn parse(path: &'a str) -> Option<Self> {
        let stripped = path.strip_prefix("/api/v1/lists")?;
        let stripped = stripped.strip_prefix('/').unwrap_or(stripped);

        if stripped.is_empty() {
            return Some(Self {
                head: None,
                action: None,
            });
        }

        let mut parts = stripped.splitn(2, '/');
        let head = parts.next().filter(|s| !s.is_empty())?;
        let action = parts.next().filter(|s| !s.is_empty());

        Some(Self {
            head: Some(head),
            action,
        })
    }
}

#[derive(Debug, Deserialize, Default)]
struct ForceCompleteRequest {
    #[serde(default)]
    reason: String,
}

/// Handle requests under /api/v1/lists. Returns None for paths outside
/// this prefix.
pub async fn handle_lists_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<Full<Bytes>>> {
    let path = req.uri().path().to_string();
    let route = ListRoute::parse(&path)?;
    let method = req.method().clone();

    let response = match (method, route.head, route.action) {
        (Method::GET, None, None) => match state.engine.all_statuses().await {
            Ok(statuses) => json_response(StatusCode::OK, &statuses),
            Err(e) => guild_error_response(e),
        },

        (Method::POST, Some("refresh"), None) => {
            let mut statuses = Vec::new();
            for tier in LinkTier::ALL {
                match state.engine.refresh_list(tier).await {
                    Ok(status) => statuses.push(status),
                    Err(e) => return Some(guild_error_response(e)),
                }
            }
            json_response(StatusCode::OK, &statuses)
        }

        (Method::GET, Some(tier), None) => {
            let tier: LinkTier = match tier.parse() {
                Ok(t) => t,
                Err(e) => return Some(guild_error_response(e)),
            };
            match state.engine.get_status(tier).await {
                Ok(status) => json_response(StatusCode::OK, &status),
                Err(e) => guild_error_response(e),
            }
        }

        (Method::POST, Some(tier), Some(action)) => {
            let tier: LinkTier = match tier.parse() {
                Ok(t) => t,
                Err(e) => return Some(guild_error_response(e)),
            };

            match action {
                "refresh" => match state.engine.refresh_list(tier).await {
                    Ok(status) => json_response(StatusCode::OK, &status),
                    Err(e) => guild_error_response(e),
                },

                "draw" => match state.engine.select_winner(tier).await {
                    Ok(selection) => json_response(StatusCode::OK, &selection),
                    Err(e) => guild_error_response(e),
                },

                "force-complete" => {
                    let request: ForceCompleteRequest = match read_optional_json_body(req).await {
                        Ok(r) => r,
                        Err(resp) => return Some(resp),
                    };
                    match state.engine.force_complete(tier, &request.reason).await {
                        Ok(status) => json_response(StatusCode::OK, &status),
                        Err(e) => guild_error_response(e),
                    }
                }

                other => error_response(
                    StatusCode::NOT_FOUND,
                    &format!("Unknown list action: {}", other),
                ),
            }
        }

        _ => error_response(StatusCode::NOT_FOUND, &format!("Unknown route: {}", path)),
    };

    Some(response)
}

/// Read a JSON body, treating an empty body as the default value
async fn read_optional_json_body<T: serde::de::DeserializeOwned + Default>(
    req: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let body_bytes = match req.into_body().collect().await {
        Ok(b) => b.to_bytes(),
        Err(e) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read body: {}", e),
            ))
        }
    };

    if body_bytes.is_empty() {
        return Ok(T::default());
    }

    serde_json::from_slice(&body_bytes).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON body: {}", e))
    })
}
