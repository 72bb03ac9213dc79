//! HTTP boundary over the rotation engine.
//!
//! Handlers only bind requests, resolve the client address and map
//! engine outcomes to status codes.

use crate::error::RotationError;
use crate::metrics;
use crate::refresh::{Issuance, RotationEngine, TokenPair};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

pub const INVALID_REQUEST: &str = "INVALID_REQUEST";

const FORWARDED_FOR: &str = "x-forwarded-for";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RotationEngine>,
    /// Honour `X-Forwarded-For` when resolving the client address
    pub trust_forwarded_for: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/tokens", post(handle_issue))
        .route("/auth/refresh", post(handle_refresh))
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for RotationError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code(),
            message: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: INVALID_REQUEST,
        message: message.into(),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
struct IssueParams {
    user_id: Option<String>,
}

/// POST /auth/tokens?user_id=<uuid>
async fn handle_issue(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: Result<Query<IssueParams>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(e) => {
            debug!(error = %e, "Malformed issue query");
            return bad_request("query must carry a single user_id");
        }
    };
    let Some(raw) = params.user_id else {
        return bad_request("user_id is required");
    };
    let Ok(user_id) = Uuid::parse_str(raw.trim()) else {
        return bad_request("user_id must be a UUID");
    };

    let address = client_address(&headers, peer, state.trust_forwarded_for);
    match state.engine.issue(&user_id.to_string(), &address.to_string()).await {
        Ok(Issuance::Issued(pair)) => (StatusCode::OK, Json(pair)).into_response(),
        Ok(Issuance::AlreadyActive) => RotationError::Conflict.into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

/// POST /auth/refresh
async fn handle_refresh(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenPair>, Response> {
    let Json(request) = body.map_err(|e| {
        debug!(error = %e, "Malformed refresh request");
        bad_request("body must be JSON with a refresh_token string")
    })?;
    if request.refresh_token.trim().is_empty() {
        return Err(bad_request("refresh_token must not be empty"));
    }

    let address = client_address(&headers, peer, state.trust_forwarded_for);
    state
        .engine
        .refresh(&request.refresh_token, &address.to_string())
        .await
        .map(Json)
        .map_err(IntoResponse::into_response)
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_metrics() -> Response {
    match metrics::render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Peer IP, or the first `X-Forwarded-For` hop when trusted and parseable.
fn client_address(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        let forwarded = headers
            .get(FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|hop| hop.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }
    peer.ip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.0.2.1:4242".parse().unwrap()
    }

    fn forwarded(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_peer_address_by_default() {
        let headers = forwarded("203.0.113.7");
        assert_eq!(client_address(&headers, peer(), false), peer().ip());
    }

    #[test]
    fn test_first_forwarded_hop_when_trusted() {
        let headers = forwarded(" 203.0.113.7 , 10.0.0.1");
        assert_eq!(
            client_address(&headers, peer(), true),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_unparseable_forwarded_falls_back_to_peer() {
        let headers = forwarded("unknown");
        assert_eq!(client_address(&headers, peer(), true), peer().ip());
        assert_eq!(client_address(&HeaderMap::new(), peer(), true), peer().ip());
    }
}
