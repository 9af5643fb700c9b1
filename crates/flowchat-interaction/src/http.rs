//! Error mapping shared by the HTTP completion clients.

use flowchat_core::CompletionError;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Statuses worth retrying: rate limiting and transient upstream failures.
pub(crate) fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

pub(crate) fn request_error(provider: &str, err: reqwest::Error) -> CompletionError {
    CompletionError::Request {
        message: format!("{provider} request failed: {err}"),
        is_retryable: err.is_connect() || err.is_timeout(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    /// `{"error": {"message": "..."}}`
    Nested { error: NestedError },
    /// `{"error": "..."}`
    Flat { error: String },
}

#[derive(Deserialize)]
struct NestedError {
    message: String,
}

/// Maps a non-success response to a `CompletionError::Status`, preferring the
/// server's own error message over the raw body.
pub(crate) fn map_http_error(status: StatusCode, body: String) -> CompletionError {
    let message = match serde_json::from_str::<ErrorPayload>(&body) {
        Ok(ErrorPayload::Nested { error }) => error.message,
        Ok(ErrorPayload::Flat { error }) => error,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };

    CompletionError::Status {
        status_code: status.as_u16(),
        message,
        is_retryable: is_retryable_status(status),
    }
}

pub(crate) fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_error_message_is_extracted() {
        let err = map_http_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error": {"message": "slow down", "type": "rate_limit"}}"#.to_string(),
        );
        assert_eq!(
            err,
            CompletionError::Status {
                status_code: 429,
                message: "slow down".to_string(),
                is_retryable: true,
            }
        );
    }

    #[test]
    fn test_flat_error_message_is_extracted() {
        let err = map_http_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": "Failed to get AI response"}"#.to_string(),
        );
        assert_eq!(err.status_code(), Some(500));
        assert!(err.is_retryable());
        assert!(err.to_string().contains("Failed to get AI response"));
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let err = map_http_error(StatusCode::UNAUTHORIZED, String::new());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("Unauthorized"));
    }
}
