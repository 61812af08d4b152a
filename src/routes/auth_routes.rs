//! Authentication routes
//!
//! - `POST /api/auth/signup`
//! - `POST /api/auth/login`
//! - `POST /api/auth/logout`
//! - `GET  /api/auth/me`
//!
//! Signup and login deliver the session according to `SESSION_TRANSPORT`:
//! a `Set-Cookie` header, the token in the JSON body, or both.

use bytes::Bytes;
use hyper::{Method, Request, StatusCode};
use serde::Serialize;

use super::response::{
    json_response, message_response, method_not_allowed, not_found, parse_json, with_cookie,
    HttpResponse,
};
use crate::auth::{authenticate, clear_session_cookie, session_cookie};
use crate::db::schemas::PublicUser;
use crate::server::AppState;
use crate::services::accounts::{self, Session};
use crate::types::Result;

/// Public identity plus, for bearer transport, the issued token
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

fn session_response(state: &AppState, status: StatusCode, session: Session) -> Result<HttpResponse> {
    let transport = state.args.session_transport;
    let (token, expires_at) = if transport.uses_bearer() {
        (Some(session.token.token.clone()), Some(session.token.expires_at))
    } else {
        (None, None)
    };

    let body = AuthResponse {
        user: session.user.to_public(),
        token,
        expires_at,
    };
    let response = json_response(status, &body);

    if transport.uses_cookie() {
        let cookie = session_cookie(
            &session.token.token,
            state.sessions.ttl(),
            state.args.cookie_secure,
        );
        return with_cookie(response, &cookie);
    }
    Ok(response)
}

async fn handle_signup(state: &AppState, req: &Request<Bytes>) -> Result<HttpResponse> {
    let body = parse_json(req.body())?;
    let session = accounts::signup(state, body).await?;
    session_response(state, StatusCode::CREATED, session)
}

async fn handle_login(state: &AppState, req: &Request<Bytes>) -> Result<HttpResponse> {
    let body = parse_json(req.body())?;
    let session = accounts::login(state, body).await?;
    session_response(state, StatusCode::OK, session)
}

async fn handle_logout(state: &AppState, req: &Request<Bytes>) -> Result<HttpResponse> {
    authenticate(state, req.headers()).await?;
    let response = message_response(StatusCode::OK, "Logged out successfully");
    if state.args.session_transport.uses_cookie() {
        return with_cookie(response, &clear_session_cookie());
    }
    Ok(response)
}

async fn handle_me(state: &AppState, req: &Request<Bytes>) -> Result<HttpResponse> {
    let identity = authenticate(state, req.headers()).await?;
    Ok(json_response(StatusCode::OK, &accounts::me(&identity)))
}

/// Route `/api/auth/<rest>`
pub async fn handle(state: &AppState, req: &Request<Bytes>, rest: &[&str]) -> Result<HttpResponse> {
    match (req.method(), rest) {
        (&Method::POST, ["signup"]) => handle_signup(state, req).await,
        (&Method::POST, ["login"]) => handle_login(state, req).await,
        (&Method::POST, ["logout"]) => handle_logout(state, req).await,
        (&Method::GET, ["me"]) => handle_me(state, req).await,

        (_, ["signup"]) | (_, ["login"]) | (_, ["logout"]) | (_, ["me"]) => {
            Ok(method_not_allowed())
        }
        _ => Ok(not_found(req.uri().path())),
    }
}
