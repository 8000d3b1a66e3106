//! Error types for the request builder.
//!
//! # Design
//! `Client` and `Server` are the two outcomes a caller normally handles: the
//! first means no response arrived at all, the second means one did but it
//! failed the success check. Both carry the same `message`/`code`/`response`
//! triple so callers can log or surface them uniformly. The remaining
//! variants cover misuse of the builder and encoding failures.

use thiserror::Error;

use crate::options::OptionId;

pub type Result<T> = std::result::Result<T, RequestError>;

/// Errors returned while building or sending a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transport could not open a handle for the URI.
    #[error("failed to initialize transport: {0}")]
    Initialization(String),

    /// No response was received (DNS failure, refused connection, timeout).
    #[error("{message}")]
    Client {
        message: String,
        code: u16,
        response: String,
    },

    /// A response was received but its status failed the success check.
    #[error("{message}")]
    Server {
        message: String,
        code: u16,
        response: String,
    },

    /// The method is not one of the supported HTTP verbs.
    #[error("unsupported HTTP method: {0:?}")]
    UnsupportedMethod(String),

    /// The transport rejected an option or its value.
    #[error("invalid option {option}: {reason}")]
    InvalidOption { option: OptionId, reason: String },

    /// The request was already sent and its handle released.
    #[error("request was already sent; build a new one")]
    Reuse,

    #[error("failed to encode parameters: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    #[error("failed to (de)serialize request: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RequestError {
    pub(crate) fn client(message: impl Into<String>) -> Self {
        RequestError::Client {
            message: message.into(),
            code: 0,
            response: String::new(),
        }
    }

    pub(crate) fn server(code: u16, response: String) -> Self {
        RequestError::Server {
            message: format!("Server returned an error response with status code {code}."),
            code,
            response,
        }
    }

    pub(crate) fn invalid_option(option: &OptionId, reason: impl Into<String>) -> Self {
        RequestError::InvalidOption {
            option: option.clone(),
            reason: reason.into(),
        }
    }

    /// Numeric code for `Client`/`Server` errors; `None` for everything else.
    pub fn code(&self) -> Option<u16> {
        match self {
            RequestError::Client { code, .. } | RequestError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Raw response payload carried by `Client`/`Server` errors.
    pub fn response(&self) -> Option<&str> {
        match self {
            RequestError::Client { response, .. } | RequestError::Server { response, .. } => {
                Some(response)
            }
            _ => None,
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, RequestError::Client { .. })
    }

    pub fn is_server(&self) -> bool {
        matches!(self, RequestError::Server { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_message_includes_status() {
        let err = RequestError::server(404, "missing".to_string());
        assert_eq!(
            err.to_string(),
            "Server returned an error response with status code 404."
        );
        assert_eq!(err.code(), Some(404));
        assert_eq!(err.response(), Some("missing"));
        assert!(err.is_server());
    }

    #[test]
    fn client_error_has_zero_code_and_empty_response() {
        let err = RequestError::client("Connection refused");
        assert_eq!(err.to_string(), "Connection refused");
        assert_eq!(err.code(), Some(0));
        assert_eq!(err.response(), Some(""));
        assert!(err.is_client());
    }

    #[test]
    fn builder_errors_carry_no_code() {
        assert_eq!(RequestError::Reuse.code(), None);
        assert_eq!(RequestError::Reuse.response(), None);
        let err = RequestError::invalid_option(&OptionId::Timeout, "expected an integer");
        assert_eq!(err.to_string(), "invalid option timeout: expected an integer");
    }
}
