//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Bodies longer than this many characters are truncated in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The text logged in place of secrets.
const REDACTED: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
///
/// The `Authorization` header and `password` fields of JSON bodies are
/// redacted, and multipart bodies are not logged at all.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    if is_multipart(request.headers()) {
        tracing::info!(
            "Received request: {} {}\nheaders: {:#?}\nbody: <multipart>",
            request.method(),
            request.uri(),
            redact_headers(request.headers())
        );

        return log_and_rebuild_response(next.run(request).await).await;
    }

    let (parts, body) = request.into_parts();
    let body_text = match read_body_text(body).await {
        Ok(body_text) => body_text,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    let display_text = if is_json(&parts.headers) {
        redact_json_password(&body_text)
    } else {
        body_text.clone()
    };
    log_body(
        &format!(
            "Received request: {} {}\nheaders: {:#?}",
            parts.method,
            parts.uri,
            redact_headers(&parts.headers)
        ),
        &display_text,
    );

    let request = Request::from_parts(parts, body_text.into());

    log_and_rebuild_response(next.run(request).await).await
}

async fn log_and_rebuild_response(response: Response) -> Response {
    let (parts, body) = response.into_parts();
    let body_text = match read_body_text(body).await {
        Ok(body_text) => body_text,
        Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    log_body(
        &format!("Sending response: {}\nheaders: {:#?}", parts.status, parts.headers),
        &body_text,
    );

    Response::from_parts(parts, body_text.into())
}

async fn read_body_text(body: Body) -> Result<String, axum::Error> {
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .inspect_err(|error| tracing::error!("could not read body for logging: {error}"))?;

    Ok(String::from_utf8_lossy(&body_bytes).to_string())
}

fn content_type_starts_with(headers: &HeaderMap, prefix: &str) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(prefix))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    content_type_starts_with(headers, "multipart/")
}

fn is_json(headers: &HeaderMap) -> bool {
    content_type_starts_with(headers, "application/json")
}

fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();

    if headers.contains_key(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, HeaderValue::from_static(REDACTED));
    }

    headers
}

/// Replace the value of any `password` field in a JSON body.
///
/// Bodies that are not JSON objects are returned unchanged.
fn redact_json_password(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(mut object)) => {
            for (key, value) in object.iter_mut() {
                if key.to_ascii_lowercase().contains("password") {
                    *value = Value::String(REDACTED.to_owned());
                }
            }

            Value::Object(object).to_string()
        }
        _ => body.to_owned(),
    }
}

/// Cut `text` to at most `limit` characters.
fn truncate(text: &str, limit: usize) -> Option<&str> {
    text.char_indices()
        .nth(limit)
        .map(|(byte_index, _)| &text[..byte_index])
}

fn log_body(message: &str, body: &str) {
    match truncate(body, LOG_BODY_LENGTH_LIMIT) {
        Some(truncated) => {
            tracing::info!("{message}\nbody: {truncated}...");
            tracing::debug!("Full body: {body:?}");
        }
        None => tracing::info!("{message}\nbody: {body:?}"),
    }
}

#[cfg(test)]
mod logging_tests {
    use axum::{
        Json, Router,
        http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION},
        middleware,
        routing::post,
    };
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use super::{REDACTED, logging_middleware, redact_headers, redact_json_password, truncate};

    #[test]
    fn redacts_password_fields() {
        let body = r#"{"email":"a@example.com","password":"hunter2","newPassword":"x"}"#;

        let redacted: Value = serde_json::from_str(&redact_json_password(body)).unwrap();

        assert_eq!(
            redacted,
            json!({ "email": "a@example.com", "password": REDACTED, "newPassword": REDACTED })
        );
    }

    #[test]
    fn leaves_other_bodies_alone() {
        assert_eq!(redact_json_password("password=hunter2"), "password=hunter2");
        assert_eq!(redact_json_password("[1, 2]"), "[1, 2]");
    }

    #[test]
    fn redacts_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));

        let redacted = redact_headers(&headers);

        assert_eq!(redacted.get(AUTHORIZATION).unwrap(), REDACTED);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret");
    }

    #[test]
    fn truncates_on_character_boundaries() {
        assert_eq!(truncate("héllo", 2), Some("hé"));
        assert_eq!(truncate("hi", 2), None);
    }

    #[tokio::test]
    async fn passes_bodies_through() {
        let app = Router::new()
            .route("/echo", post(|Json(body): Json<Value>| async move { Json(body) }))
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::new(app);
        let body = json!({ "password": "hunter2", "note": "x".repeat(100) });

        let response = server.post("/echo").json(&body).await;

        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Value>(), body);
    }
}
