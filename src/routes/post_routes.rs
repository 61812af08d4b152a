//! Post routes
//!
//! - `GET    /api/posts/all`
//! - `GET    /api/posts/following`
//! - `GET    /api/posts/user/:username`
//! - `GET    /api/posts/likes/:userId`
//! - `POST   /api/posts/create`
//! - `POST   /api/posts/like/:id`
//! - `POST   /api/posts/comment/:id`
//! - `DELETE /api/posts/:id`

use bytes::Bytes;
use hyper::{Method, Request, StatusCode};
use serde::Serialize;

use super::response::{
    json_response, message_response, method_not_allowed, not_found, parse_json, parse_object_id,
    HttpResponse,
};
use crate::auth::authenticate;
use crate::db::schemas::hex_ids;
use crate::server::AppState;
use crate::services::posts;
use crate::store::LikeOutcome;
use crate::types::Result;

#[derive(Debug, Serialize)]
struct LikeResponse {
    message: &'static str,
    status: &'static str,
    likes: Vec<String>,
}

/// Route `/api/posts/<rest>`; every post route requires a session
pub async fn handle(state: &AppState, req: &Request<Bytes>, rest: &[&str]) -> Result<HttpResponse> {
    if !matches!(rest, [_] | ["user" | "likes" | "like" | "comment", _]) {
        return Ok(not_found(req.uri().path()));
    }

    let identity = authenticate(state, req.headers()).await?;

    match (req.method(), rest) {
        (&Method::GET, ["all"]) => {
            let views = posts::all_posts(state).await?;
            Ok(json_response(StatusCode::OK, &views))
        }
        (&Method::GET, ["following"]) => {
            let views = posts::following_posts(state, &identity).await?;
            Ok(json_response(StatusCode::OK, &views))
        }
        (&Method::GET, ["user", username]) => {
            let views = posts::user_posts(state, username).await?;
            Ok(json_response(StatusCode::OK, &views))
        }
        (&Method::GET, ["likes", user_id]) => {
            let user_id = parse_object_id(user_id)?;
            let views = posts::liked_posts(state, &user_id).await?;
            Ok(json_response(StatusCode::OK, &views))
        }
        (&Method::POST, ["create"]) => {
            let body = parse_json(req.body())?;
            let view = posts::create_post(state, &identity, body).await?;
            Ok(json_response(StatusCode::CREATED, &view))
        }
        (&Method::POST, ["like", id]) => {
            let id = parse_object_id(id)?;
            let toggle = posts::toggle_like(state, &identity, &id).await?;
            let (message, status) = match toggle.outcome {
                LikeOutcome::Liked => ("Post liked", "liked"),
                LikeOutcome::Unliked => ("Post unliked", "unliked"),
            };
            let body = LikeResponse {
                message,
                status,
                likes: hex_ids(&toggle.likes),
            };
            Ok(json_response(StatusCode::OK, &body))
        }
        (&Method::POST, ["comment", id]) => {
            let id = parse_object_id(id)?;
            let body = parse_json(req.body())?;
            let view = posts::add_comment(state, &identity, &id, body).await?;
            Ok(json_response(StatusCode::CREATED, &view))
        }
        (&Method::DELETE, [id]) => {
            let id = parse_object_id(id)?;
            posts::delete_post(state, &identity, &id).await?;
            Ok(message_response(StatusCode::OK, "Post deleted successfully"))
        }
        _ => Ok(method_not_allowed()),
    }
}
