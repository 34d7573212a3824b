//! HTTP helpers shared by the API entry points.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::ValidationErrors;

/// Body returned for schema validation failures.
#[derive(Debug, Serialize)]
pub struct ValidationFailure<'a> {
    pub error: &'static str,
    pub fields: &'a ValidationErrors,
}

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Response {
    (status, Json(data)).into_response()
}

/// Create an error response with the given status code and message.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    json_response(status, &serde_json::json!({ "error": message.into() }))
}

/// Create a 400 response listing every violated field.
pub fn validation_response(errors: &ValidationErrors) -> Response {
    json_response(
        StatusCode::BAD_REQUEST,
        &ValidationFailure {
            error: "Validation failed",
            fields: errors,
        },
    )
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// An empty body is treated as an empty object so that schema validation can
/// report the missing fields individually.
pub fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Response> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };

    serde_json::from_slice(body).map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {}", e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: Option<String>,
    }

    #[test]
    fn test_empty_body_parses_as_empty_object() {
        let named: Named = parse_json_body(b"  ").unwrap();
        assert!(named.name.is_none());
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let response = parse_json_body::<Named>(b"{not json").unwrap_err();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_validation_response_status() {
        let response = validation_response(&ValidationErrors::new());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
