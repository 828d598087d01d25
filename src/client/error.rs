//! Error taxonomy for single HTTP exchanges with the control plane.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

const UNKNOWN_ERROR: &str = "Unknown error";

/// Decoded non-2xx response from the control plane.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ApiError {
    /// HTTP status code.
    pub status_code: u16,
    /// Top-level message (`message`, then `error`, then the raw body).
    pub message: String,
    /// Per-field validation failures. Empty when the body carried none.
    pub field_errors: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    /// Converts a response status and body into an [`ApiError`].
    ///
    /// A JSON body contributes `message` (falling back to `error`) and the
    /// `errors` field map. A non-JSON body becomes the message verbatim; an
    /// empty body yields `"Unknown error"`.
    #[must_use]
    pub fn from_response(status_code: u16, body: &str) -> Self {
        if body.trim().is_empty() {
            return Self {
                status_code,
                message: UNKNOWN_ERROR.to_owned(),
                field_errors: BTreeMap::new(),
            };
        }

        let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
            return Self {
                status_code,
                message: body.to_owned(),
                field_errors: BTreeMap::new(),
            };
        };

        let message = parsed
            .message
            .filter(|msg| !msg.is_empty())
            .or_else(|| match parsed.error {
                Some(serde_json::Value::String(text)) if !text.is_empty() => Some(text),
                Some(serde_json::Value::Object(map)) => map
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned),
                _ => None,
            })
            .unwrap_or_else(|| UNKNOWN_ERROR.to_owned());

        Self {
            status_code,
            message,
            field_errors: parsed.errors.unwrap_or_default(),
        }
    }

    /// Returns `true` when the control plane answered 404.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.status_code == 404
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field_errors.is_empty() {
            return write!(f, "API error {}: {}", self.status_code, self.message);
        }
        let details = self
            .field_errors
            .iter()
            .map(|(field, errors)| format!("{field}: {}", errors.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "API error {}: {details}", self.status_code)
    }
}

impl std::error::Error for ApiError {}

/// Errors raised by [`ApiClient`](super::ApiClient).
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ClientError {
    /// The exchange failed before any HTTP response arrived.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the network failure.
        message: String,
    },
    /// The caller cancelled the operation while the request was in flight.
    #[error("request cancelled")]
    Cancelled,
    /// The control plane rejected the request.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A 2xx body could not be decoded into the expected shape.
    #[error("failed to decode response from {path}: {message}")]
    Decode {
        /// Request path whose body failed to decode.
        path: String,
        /// Decoder message.
        message: String,
    },
    /// An item was absent from a listing that should have contained it.
    #[error("{resource} with ID {id} not found")]
    Missing {
        /// Resource noun.
        resource: String,
        /// Identifier looked up.
        id: String,
    },
    /// The resource kind does not support the requested action.
    #[error("{action} is not supported for this resource kind")]
    Unsupported {
        /// Action name (for example `stop`).
        action: String,
    },
}

impl ClientError {
    /// Returns `true` when the error means the resource does not exist,
    /// whichever form the absence took.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::Api(api) => api.is_not_found(),
            Self::Missing { .. } => true,
            Self::Transport { .. }
            | Self::Cancelled
            | Self::Decode { .. }
            | Self::Unsupported { .. } => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport {
            message: value.to_string(),
        }
    }
}
