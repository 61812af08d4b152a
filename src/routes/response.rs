//! Response builders and request helpers shared by the route handlers

use bson::oid::ObjectId;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{
    HeaderName, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CACHE_CONTROL, CONTENT_TYPE, SET_COOKIE,
};
use hyper::{HeaderMap, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, warn};

use crate::types::{ChorusError, Result};

pub type HttpResponse = Response<Full<Bytes>>;

fn add_cors(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

fn with_status(status: StatusCode, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    let json = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = with_status(status, Bytes::from(json));

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    add_cors(headers);
    response
}

/// `{"message": ...}` body
pub fn message_response(status: StatusCode, message: &str) -> HttpResponse {
    json_response(status, &serde_json::json!({ "message": message }))
}

/// Translate a failure into its status and `{error, code}` body
pub fn error_response(err: ChorusError) -> HttpResponse {
    let status = err.status_code();
    if err.is_server_error() {
        error!(code = err.code(), "Request failed: {}", err);
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!(code = err.code(), "Request rejected: {}", err);
    }

    let (status, body) = err.into_status_code_and_body();
    json_response(status, &body)
}

pub fn not_found(path: &str) -> HttpResponse {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": format!("No route for {}", path),
            "code": "NOT_FOUND",
        }),
    )
}

pub fn method_not_allowed() -> HttpResponse {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({
            "error": "Method not allowed",
            "code": "METHOD_NOT_ALLOWED",
        }),
    )
}

pub fn payload_too_large() -> HttpResponse {
    json_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        &serde_json::json!({
            "error": "Request body too large",
            "code": "PAYLOAD_TOO_LARGE",
        }),
    )
}

/// CORS preflight
pub fn preflight() -> HttpResponse {
    let mut response = with_status(StatusCode::NO_CONTENT, Bytes::new());
    let headers = response.headers_mut();
    add_cors(headers);
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

/// Attach a header built at runtime
pub fn with_header(mut response: HttpResponse, name: HeaderName, value: &str) -> Result<HttpResponse> {
    let value = HeaderValue::from_str(value)
        .map_err(|e| ChorusError::Internal(format!("Invalid {} header: {}", name, e)))?;
    response.headers_mut().append(name, value);
    Ok(response)
}

pub fn with_cookie(response: HttpResponse, cookie: &str) -> Result<HttpResponse> {
    with_header(response, SET_COOKIE, cookie)
}

/// Decode a JSON request body. An empty body decodes as `{}`.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"{}")?);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Parse a path parameter as a document id
pub fn parse_object_id(raw: &str) -> Result<ObjectId> {
    ObjectId::parse_str(raw).map_err(|_| ChorusError::Validation(format!("Invalid id: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde::Deserialize;

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = error_response(ChorusError::NotFound("Post"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = body_json(response).await;
        assert_eq!(body["error"], "Post not found");
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[test]
    fn test_parse_object_id() {
        let id = ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex()).unwrap(), id);
        assert!(matches!(
            parse_object_id("nope").unwrap_err(),
            ChorusError::Validation(_)
        ));
    }

    #[test]
    fn test_parse_json_empty_body() {
        #[derive(Deserialize, Default)]
        struct Body {
            #[serde(default)]
            text: String,
        }

        let parsed: Body = parse_json(&Bytes::new()).unwrap();
        assert!(parsed.text.is_empty());

        let parsed: Body = parse_json(&Bytes::from_static(br#"{"text":"hi"}"#)).unwrap();
        assert_eq!(parsed.text, "hi");

        assert!(parse_json::<Body>(&Bytes::from_static(b"{oops")).is_err());
    }

    #[test]
    fn test_cookie_header_attached() {
        let response = with_cookie(
            message_response(StatusCode::OK, "ok"),
            "jwt=abc; HttpOnly",
        )
        .unwrap();
        assert_eq!(response.headers().get(SET_COOKIE).unwrap(), "jwt=abc; HttpOnly");
    }
}
