//! Failure taxonomy for calls against the Pulsar admin API.

use super::transport::TransportResponse;

/// Result type alias for admin API operations
pub type PulsarResult<T> = std::result::Result<T, PulsarError>;

/// Errors returned by the admin clients.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PulsarError {
    /// The entity does not exist on the broker. Recoverable by creating it.
    #[error("{0} not found")]
    NotFound(String),

    /// The broker rejected a schema as incompatible with the registered one.
    #[error("Schema is incompatible")]
    Incompatible,

    /// The broker answered with a body we could not interpret.
    #[error("Unable to parse response: {0}")]
    Parsing(String),

    /// Any other non-success answer from the broker.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl PulsarError {
    /// HTTP status code attached to the error, if the broker answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            PulsarError::Api { status, .. } => Some(*status),
            PulsarError::NotFound(_) => Some(404),
            PulsarError::Incompatible => Some(409),
            _ => None,
        }
    }

    /// Whether repeating the same call without a spec change can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, PulsarError::Incompatible | PulsarError::Parsing(_))
    }
}

/// Build the error for a non-success response.
///
/// The message is the `reason` field of a JSON body when present, else the
/// raw body, else a synthetic message carrying the status code.
pub(crate) fn api_error(res: &TransportResponse) -> PulsarError {
    let message = match serde_json::from_str::<serde_json::Value>(&res.body) {
        Ok(serde_json::Value::Object(body)) => match body.get("reason") {
            Some(serde_json::Value::String(reason)) => reason.clone(),
            Some(other) => other.to_string(),
            None => res.body.clone(),
        },
        _ if !res.body.trim().is_empty() => res.body.clone(),
        _ => format!("Unknown error. status_code='{}'", res.status),
    };

    PulsarError::Api {
        status: res.status,
        message,
    }
}

/// Like [`api_error`], translating a 404 into [`PulsarError::NotFound`].
pub(crate) fn api_error_or_not_found(res: &TransportResponse, what: &str) -> PulsarError {
    if res.status == 404 {
        PulsarError::NotFound(what.to_string())
    } else {
        api_error(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> TransportResponse {
        TransportResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_reason_field_preferred() {
        let err = api_error(&response(409, r#"{"reason":"Namespace already exists"}"#));
        assert_eq!(
            err,
            PulsarError::Api {
                status: 409,
                message: "Namespace already exists".to_string()
            }
        );
    }

    #[test]
    fn test_raw_text_without_reason() {
        let err = api_error(&response(500, "internal failure"));
        assert_eq!(err.to_string(), "internal failure");

        let err = api_error(&response(500, r#"{"code":500}"#));
        assert_eq!(err.to_string(), r#"{"code":500}"#);
    }

    #[test]
    fn test_synthetic_message_on_empty_body() {
        let err = api_error(&response(503, ""));
        assert_eq!(err.to_string(), "Unknown error. status_code='503'");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_not_found_translation() {
        let err = api_error_or_not_found(&response(404, ""), "tenant acme");
        assert_eq!(err, PulsarError::NotFound("tenant acme".to_string()));
        assert!(err.is_retryable());

        let err = api_error_or_not_found(&response(403, "forbidden"), "tenant acme");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_retry_classification() {
        assert!(!PulsarError::Incompatible.is_retryable());
        assert!(!PulsarError::Parsing("bad".to_string()).is_retryable());
        assert!(PulsarError::Transport("refused".to_string()).is_retryable());
    }
}
