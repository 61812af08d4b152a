//! Request gate
//!
//! Resolves the session token on a request to the stored identity making
//! the request. Protected handlers take the returned `Identity` instead of
//! touching headers themselves.

use bson::oid::ObjectId;
use hyper::HeaderMap;
use tracing::debug;

use super::session::extract_session_token;
use crate::db::schemas::UserDoc;
use crate::server::AppState;
use crate::types::{ChorusError, Result};

/// The authenticated identity behind a request, loaded fresh from the store.
/// `authenticate` clears the password hash; handlers that need it re-read
/// the stored document.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: UserDoc,
}

impl Identity {
    pub fn id(&self) -> ObjectId {
        self.user.id
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }
}

/// Authenticate a request.
///
/// - no credential: `Unauthenticated`
/// - bad signature, expired or malformed: `InvalidToken`
/// - valid token for an identity that no longer exists: `UnknownIdentity`
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity> {
    let token = extract_session_token(headers, state.args.session_transport)
        .ok_or(ChorusError::Unauthenticated)?;

    let claims = state.sessions.verify_token(&token)?;
    let user_id = claims.user_id()?;

    match state.store.find_user_by_id(&user_id).await? {
        Some(mut user) => {
            user.password_hash.clear();
            Ok(Identity { user })
        }
        None => {
            debug!(user_id = %user_id, "Token subject no longer exists");
            Err(ChorusError::UnknownIdentity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Args;
    use hyper::header::{HeaderValue, COOKIE};

    fn cookie_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("jwt={}", token)).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_missing_token() {
        let state = AppState::in_memory(Args::for_tests()).unwrap();
        let err = authenticate(&state, &HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, ChorusError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_garbage_token() {
        let state = AppState::in_memory(Args::for_tests()).unwrap();
        let err = authenticate(&state, &cookie_headers("not.a.jwt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChorusError::InvalidToken(_)));
    }

    #[tokio::test]
    async fn test_deleted_identity() {
        let state = AppState::in_memory(Args::for_tests()).unwrap();
        let issued = state.sessions.issue(&ObjectId::new()).unwrap();
        let err = authenticate(&state, &cookie_headers(&issued.token))
            .await
            .unwrap_err();
        assert!(matches!(err, ChorusError::UnknownIdentity));
    }

    #[tokio::test]
    async fn test_valid_session() {
        let state = AppState::in_memory(Args::for_tests()).unwrap();
        let user = UserDoc::new("ada".into(), "Ada".into(), "ada@x.com".into(), "h".into());
        let id = user.id;
        state.store.insert_user(user).await.unwrap();

        let issued = state.sessions.issue(&id).unwrap();
        let identity = authenticate(&state, &cookie_headers(&issued.token))
            .await
            .unwrap();
        assert_eq!(identity.id(), id);
        assert_eq!(identity.username(), "ada");
        assert!(identity.user.password_hash.is_empty());
    }
}
