//! Error types for the amoCRM client.
//!
//! # Design
//! `InvalidArgument` is the only error the entity layer raises on its own.
//! Every other variant originates in a transport (the wire client or a host
//! executor) and is handed back to the caller untouched by the batch adapter.

use thiserror::Error;

/// Errors returned by the client, the wire layer and transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A caller-supplied argument was rejected before any request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server rejected the credentials (HTTP 401).
    #[error("unauthorized")]
    Unauthorized,

    /// The server reported an error in the `response.error` envelope.
    #[error("amoCRM error {code}: {message}")]
    Api { code: String, message: String },

    /// The server returned an unexpected status without a readable error body.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The host executor failed before a response was received.
    #[error("transport failed: {0}")]
    Transport(String),

    /// Client configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias used across the crate.
pub type ApiResult<T> = Result<T, ApiError>;
