//! Member API routes
//!
//! - `GET    /api/v1/members` - list members
//! - `POST   /api/v1/members` - create member
//! - `GET    /api/v1/members/{id}` - get member record
//! - `DELETE /api/v1/members/{id}` - delete member (admin escape hatch)
//! - `GET    /api/v1/members/{id}/status` - derived status + aggregates
//! - `GET    /api/v1/members/{id}/history` - grant history
//! - `POST   /api/v1/members/{id}/participation` - mark event attendance
//! - `POST   /api/v1/members/{id}/recurring` - set recurring-participation
//! - `POST   /api/v1/members/{id}/promote` - promote to officer
//! - `POST   /api/v1/members/{id}/demote` - demote from officer
//!
//! Handlers carry no business logic; they parse, call the directory, and
//! translate errors to status codes.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use std::sync::Arc;

use crate::server::AppState;

use super::{error_response, guild_error_response, json_response};

/// Parsed member route components
#[derive(Debug)]
struct MemberRoute<'a> {
    member_id: Option<&'a str>,
    action: Option<&'a str>,
}

impl<'a> MemberRoute<'a> {
    /// Parse "/api/v1/members", "/api/v1/members/{id}", or
    /// "/api/v1/members/{id}/{action}"
    fn parse(path: &'a str) -> Option<Self> {
        let stripped = path.strip_prefix("/api/v1/members")?;
        let stripped = stripped.strip_prefix('/').unwrap_or(stripped);

        if stripped.is_empty() {
            return Some(Self {
                member_id: None,
                action: None,
            });
        }

        let mut parts = stripped.splitn(2, '/');
        let member_id = parts.next().filter(|s| !s.is_empty())?;
        let action = parts.next().filter(|s| !s.is_empty());

        Some(Self {
            member_id: Some(member_id),
            action,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreateMemberRequest {
    id: String,
    display_name: String,
    join_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ParticipationRequest {
    participated: bool,
    event_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RecurringRequest {
    participating: bool,
}

async fn read_json_body<T: serde::de::DeserializeOwned>(
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

    serde_json::from_slice(&body_bytes).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON body: {}", e))
    })
}

/// Handle requests under /api/v1/members. Returns None for paths outside
/// this prefix.
pub async fn handle_members_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<Full<Bytes>>> {
    let path = req.uri().path().to_string();
    let route = MemberRoute::parse(&path)?;
    let method = req.method().clone();

    let response = match (method, route.member_id, route.action) {
        (Method::GET, None, None) => match state.directory.list_members().await {
            Ok(members) => json_response(StatusCode::OK, &members),
            Err(e) => guild_error_response(e),
        },

        (Method::POST, None, None) => {
            let request: CreateMemberRequest = match read_json_body(req).await {
                Ok(r) => r,
                Err(resp) => return Some(resp),
            };
            match state
                .directory
                .create_member(&request.id, &request.display_name, request.join_date)
                .await
            {
                Ok(member) => json_response(StatusCode::CREATED, &member),
                Err(e) => guild_error_response(e),
            }
        }

        (Method::GET, Some(id), None) => match state.directory.get_member(id).await {
            Ok(member) => json_response(StatusCode::OK, &member),
            Err(e) => guild_error_response(e),
        },

        (Method::DELETE, Some(id), None) => match state.directory.delete_member(id).await {
            Ok(()) => json_response(StatusCode::OK, &serde_json::json!({ "deleted": id })),
            Err(e) => guild_error_response(e),
        },

        (Method::GET, Some(id), Some("status")) => {
            match state.directory.member_status(id).await {
                Ok(status) => json_response(StatusCode::OK, &status),
                Err(e) => guild_error_response(e),
            }
        }

        (Method::GET, Some(id), Some("history")) => {
            match state.directory.member_history(id).await {
                Ok(records) => json_response(StatusCode::OK, &records),
                Err(e) => guild_error_response(e),
            }
        }

        (Method::POST, Some(id), Some("participation")) => {
            let id = id.to_string();
            let request: ParticipationRequest = match read_json_body(req).await {
                Ok(r) => r,
                Err(resp) => return Some(resp),
            };
            let event_date = request.event_date.unwrap_or_else(Utc::now);
            match state
                .directory
                .mark_event_participation(&id, request.participated, event_date)
                .await
            {
                Ok(member) => json_response(StatusCode::OK, &member),
                Err(e) => guild_error_response(e),
            }
        }

        (Method::POST, Some(id), Some("recurring")) => {
            let id = id.to_string();
            let request: RecurringRequest = match read_json_body(req).await {
                Ok(r) => r,
                Err(resp) => return Some(resp),
            };
            match state
                .directory
                .set_recurring_participation(&id, request.participating)
                .await
            {
                Ok(member) => json_response(StatusCode::OK, &member),
                Err(e) => guild_error_response(e),
            }
        }

        (Method::POST, Some(id), Some("promote")) => {
            match state.directory.promote_officer(id).await {
                Ok(member) => json_response(StatusCode::OK, &member),
                Err(e) => guild_error_response(e),
            }
        }

        (Method::POST, Some(id), Some("demote")) => {
            match state.directory.demote_officer(id).await {
                Ok(member) => json_response(StatusCode::OK, &member),
                Err(e) => guild_error_response(e),
            }
        }

        _ => error_response(StatusCode::NOT_FOUND, &format!("Unknown route: {}", path)),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parse_collection() {
        let route = MemberRoute::parse("/api/v1/members").unwrap();
        assert_eq!(route.member_id, None);
        assert_eq!(route.action, None);
    }

    #[test]
    fn test_route_parse_member() {
        let route = MemberRoute::parse("/api/v1/members/m-1").unwrap();
        assert_eq!(route.member_id, Some("m-1"));
        assert_eq!(route.action, None);
    }

    #[test]
    fn test_route_parse_action() {
        let route = MemberRoute::parse("/api/v1/members/m-1/status").unwrap();
        assert_eq!(route.member_id, Some("m-1"));
        assert_eq!(route.action, Some("status"));
    }

    #[test]
    fn test_route_parse_foreign_prefix() {
        assert!(MemberRoute::parse("/api/v1/lists").is_none());
    }
}
