//! OpenStack provider error types

use stackstep_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenStackError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("No public {0} endpoint in the service catalog")]
    ServiceNotFound(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Identity response carried no X-Subject-Token header")]
    MissingToken,

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OpenStackError>;

impl From<OpenStackError> for CloudError {
    fn from(err: OpenStackError) -> Self {
        match err {
            OpenStackError::Http(e) if e.is_decode() => CloudError::InvalidResponse(e.to_string()),
            OpenStackError::Http(e) => CloudError::Transport(e.to_string()),
            OpenStackError::Api { status, message } => CloudError::ApiError { status, message },
            OpenStackError::AuthenticationFailed(message) => {
                CloudError::AuthenticationFailed(message)
            }
            e @ OpenStackError::ServiceNotFound(_) => CloudError::ResourceNotFound(e.to_string()),
            OpenStackError::InvalidEndpoint(message) => CloudError::InvalidConfig(message),
            e @ OpenStackError::MissingToken => CloudError::InvalidResponse(e.to_string()),
            OpenStackError::JsonError(e) => CloudError::InvalidResponse(e.to_string()),
        }
    }
}

/// Pull the human-readable message out of an OpenStack error body
///
/// Keystone wraps it as `{"error": {"message": ..}}`, Nova as
/// `{"<faultName>": {"message": ..}}`; some proxies answer with a bare
/// `{"message": ..}` or plain text.
pub(crate) fn api_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return Some(body.to_string());
    };

    if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }

    let fault = value.as_object().and_then(|faults| {
        faults
            .values()
            .find_map(|fault| fault.get("message").and_then(|m| m.as_str()))
    });

    // No recognised message: keep the body verbatim
    Some(fault.unwrap_or(body).to_string())
}

/// Error for a non-2xx response
pub(crate) fn api_error(status: reqwest::StatusCode, body: &str) -> OpenStackError {
    let message = api_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    });
    OpenStackError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_message_keystone() {
        let body = r#"{"error": {"message": "The request you have made requires authentication.", "code": 401, "title": "Unauthorized"}}"#;
        assert_eq!(
            api_message(body).as_deref(),
            Some("The request you have made requires authentication.")
        );
    }

    #[test]
    fn test_api_message_nova_fault() {
        let body = r#"{"forbidden": {"message": "Quota exceeded for instances: Requested 1, but already used 10 of 10 instances", "code": 403}}"#;
        assert_eq!(
            api_message(body).as_deref(),
            Some("Quota exceeded for instances: Requested 1, but already used 10 of 10 instances")
        );
    }

    #[test]
    fn test_api_message_plain_text() {
        assert_eq!(
            api_message("502 Bad Gateway\n").as_deref(),
            Some("502 Bad Gateway")
        );
        assert_eq!(api_message("  "), None);
    }

    #[test]
    fn test_api_message_unrecognised_json_kept_verbatim() {
        assert_eq!(
            api_message(r#""Quota exceeded""#).as_deref(),
            Some(r#""Quota exceeded""#)
        );
        assert_eq!(
            api_message(r#"["instance limit reached"]"#).as_deref(),
            Some(r#"["instance limit reached"]"#)
        );
        assert_eq!(
            api_message(r#"{"code": 413}"#).as_deref(),
            Some(r#"{"code": 413}"#)
        );

        let err = api_error(reqwest::StatusCode::FORBIDDEN, r#""Quota exceeded""#);
        assert!(
            matches!(err, OpenStackError::Api { status: 403, message } if message == r#""Quota exceeded""#)
        );
    }

    #[test]
    fn test_api_error_falls_back_to_reason() {
        let err = api_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "");
        match err {
            OpenStackError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_into_cloud_error_keeps_message() {
        let err: CloudError = OpenStackError::Api {
            status: 400,
            message: "Invalid flavorRef provided.".to_string(),
        }
        .into();
        assert_eq!(err.diagnostic(), "Invalid flavorRef provided.");
    }
}
