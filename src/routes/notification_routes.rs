//! Notification routes
//!
//! - `GET    /api/notification/get` (marks everything returned as read)
//! - `DELETE /api/notification/delete`
//! - `DELETE /api/notification/:id`

use bytes::Bytes;
use hyper::{Method, Request, StatusCode};

use super::response::{
    json_response, message_response, method_not_allowed, not_found, parse_object_id, HttpResponse,
};
use crate::auth::authenticate;
use crate::server::AppState;
use crate::services::notifications;
use crate::types::Result;

/// Route `/api/notification/<rest>`
pub async fn handle(state: &AppState, req: &Request<Bytes>, rest: &[&str]) -> Result<HttpResponse> {
    if rest.len() != 1 {
        return Ok(not_found(req.uri().path()));
    }

    let identity = authenticate(state, req.headers()).await?;

    match (req.method(), rest) {
        (&Method::GET, ["get"]) => {
            let views = notifications::list_and_mark_read(state, &identity).await?;
            Ok(json_response(StatusCode::OK, &views))
        }
        (&Method::DELETE, ["delete"]) => {
            notifications::delete_all(state, &identity).await?;
            Ok(message_response(StatusCode::OK, "Notifications deleted"))
        }
        (&Method::DELETE, [id]) => {
            let id = parse_object_id(id)?;
            notifications::delete_one(state, &identity, &id).await?;
            Ok(message_response(StatusCode::OK, "Notification deleted"))
        }
        _ => Ok(method_not_allowed()),
    }
}
