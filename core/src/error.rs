//! Error types for the MaxCDN client.
//!
//! # Design
//! Input problems are caught before any network I/O and get their own
//! variants. Transport failures pass through untouched. When the server
//! answers with an `error` envelope, the decoded `Response` rides inside
//! `Error::Api` so callers can still reach its structured fields.

use thiserror::Error;

use crate::http::TransportError;
use crate::response::Response;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A constructor or operation argument is unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A GET endpoint already carries a query string, so the form has
    /// nowhere unambiguous to go.
    #[error("oauth: url must not contain a query string: {url}")]
    AmbiguousQuery { url: String },

    /// Environment configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The signer could not produce an `Authorization` header.
    #[error("signature error: {0}")]
    Signature(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The payload was received but is not a JSON object.
    #[error("failed to decode response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        raw: Vec<u8>,
    },

    /// A non-2xx status whose body is not a decodable envelope.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The server returned an `error` envelope.
    #[error("{kind}, {message}")]
    Api {
        kind: String,
        message: String,
        response: Box<Response>,
    },
}

impl Error {
    /// The decoded envelope, for errors that carry one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Api { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Whether repeating the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
