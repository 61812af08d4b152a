//! HTTP route handlers
//!
//! `dispatch` takes a request whose body is already collected, so it runs
//! the same way behind the socket loop and in tests.

pub mod auth_routes;
pub mod health;
pub mod notification_routes;
pub mod post_routes;
pub mod response;
pub mod user_routes;

use bytes::Bytes;
use hyper::{Method, Request};

pub use response::HttpResponse;

use crate::server::AppState;

/// Route one request
pub async fn dispatch(state: &AppState, req: Request<Bytes>) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return response::preflight();
    }

    let path = req.uri().path().to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match segments.as_slice() {
        ["health"] if req.method() == Method::GET => Ok(health::live()),
        ["ready"] if req.method() == Method::GET => Ok(health::ready(state).await),
        ["health"] | ["ready"] => Ok(response::method_not_allowed()),

        ["api", "auth", rest @ ..] => auth_routes::handle(state, &req, rest).await,
        ["api", "posts", rest @ ..] => post_routes::handle(state, &req, rest).await,
        ["api", "user", rest @ ..] => user_routes::handle(state, &req, rest).await,
        ["api", "notification", rest @ ..] => notification_routes::handle(state, &req, rest).await,

        _ => Ok(response::not_found(&path)),
    };

    result.unwrap_or_else(response::error_response)
}
