//! User routes
//!
//! - `GET  /api/user/profile/:username`
//! - `GET  /api/user/suggested`
//! - `POST /api/user/follow/:id`
//! - `POST /api/user/update`

use bytes::Bytes;
use hyper::{Method, Request, StatusCode};
use serde::Serialize;

use super::response::{
    json_response, method_not_allowed, not_found, parse_json, parse_object_id, HttpResponse,
};
use crate::auth::authenticate;
use crate::server::AppState;
use crate::services::{accounts, graph};
use crate::store::FollowOutcome;
use crate::types::Result;

#[derive(Debug, Serialize)]
struct FollowResponse {
    message: &'static str,
    status: &'static str,
}

impl From<FollowOutcome> for FollowResponse {
    fn from(outcome: FollowOutcome) -> Self {
        match outcome {
            FollowOutcome::Followed => Self {
                message: "User followed successfully",
                status: "followed",
            },
            FollowOutcome::Unfollowed => Self {
                message: "User unfollowed successfully",
                status: "unfollowed",
            },
        }
    }
}

/// Route `/api/user/<rest>`; every user route requires a session
pub async fn handle(state: &AppState, req: &Request<Bytes>, rest: &[&str]) -> Result<HttpResponse> {
    if !matches!(rest, ["profile", _] | ["suggested"] | ["follow", _] | ["update"]) {
        return Ok(not_found(req.uri().path()));
    }

    let identity = authenticate(state, req.headers()).await?;

    match (req.method(), rest) {
        (&Method::GET, ["profile", username]) => {
            let profile = accounts::profile(state, username).await?;
            Ok(json_response(StatusCode::OK, &profile))
        }
        (&Method::GET, ["suggested"]) => {
            let users = accounts::suggested(state, &identity).await?;
            Ok(json_response(StatusCode::OK, &users))
        }
        (&Method::POST, ["follow", id]) => {
            let target = parse_object_id(id)?;
            let outcome = graph::toggle_follow(state, &identity, &target).await?;
            Ok(json_response(StatusCode::OK, &FollowResponse::from(outcome)))
        }
        (&Method::POST, ["update"]) => {
            let body = parse_json(req.body())?;
            let user = accounts::update_profile(state, &identity, body).await?;
            Ok(json_response(StatusCode::OK, &user))
        }
        _ => Ok(method_not_allowed()),
    }
}
