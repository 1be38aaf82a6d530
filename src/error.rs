use thiserror::Error;

use crate::request::Method;

/// Error type transports report; the executor classifies it into a
/// [`TransportErrorKind`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification of a transport-level failure, derived from the
/// underlying error the transport reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransportErrorKind {
    Dns,
    Connect,
    Tls,
    Timeout,
    Read,
    Other,
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Dns => "dns",
            Self::Connect => "connect",
            Self::Tls => "tls",
            Self::Timeout => "timeout",
            Self::Read => "read",
            Self::Other => "other",
        };
        formatter.write_str(text)
    }
}

/// Stable machine-readable mirror of the [`Error`] variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    InvalidUrl,
    EncodeParams,
    Serialize,
    InvalidHeaderName,
    InvalidHeaderValue,
    TransportInit,
    Transport,
    HttpStatus,
    Deserialize,
    Cancelled,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid_url",
            Self::EncodeParams => "encode_params",
            Self::Serialize => "serialize",
            Self::InvalidHeaderName => "invalid_header_name",
            Self::InvalidHeaderValue => "invalid_header_value",
            Self::TransportInit => "transport_init",
            Self::Transport => "transport",
            Self::HttpStatus => "http_status",
            Self::Deserialize => "deserialize",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Everything that can go wrong while executing a declared request.
///
/// Each failure mode is a distinct variant so callers can match on exactly
/// what happened: a URL that would not build, a parameter or body that would
/// not encode, the transport failing, a non-success status code, a response
/// that would not decode, or a cooperative cancellation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid request url: {url}")]
    InvalidUrl { url: String },
    #[error("failed to encode request parameters: {message}")]
    EncodeParams { message: String },
    #[error("failed to serialize request value: {source}")]
    Serialize {
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid header name {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
    #[error("invalid header value for {name}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: http::header::InvalidHeaderValue,
    },
    #[error("failed to initialize transport: {message}")]
    TransportInit { message: String },
    #[error("transport error ({kind}) for {method} {url}: {source}")]
    Transport {
        kind: TransportErrorKind,
        method: Method,
        url: String,
        #[source]
        source: BoxError,
    },
    #[error("http status error {status} for {method} {url}: {body}")]
    HttpStatus {
        status: u16,
        method: Method,
        url: String,
        body: String,
    },
    #[error("failed to decode response json: {source}; body={body}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
        body: String,
    },
    #[error("request cancelled for {method} {url}")]
    Cancelled { method: Method, url: String },
}

impl Error {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidUrl { .. } => ErrorCode::InvalidUrl,
            Self::EncodeParams { .. } => ErrorCode::EncodeParams,
            Self::Serialize { .. } => ErrorCode::Serialize,
            Self::InvalidHeaderName { .. } => ErrorCode::InvalidHeaderName,
            Self::InvalidHeaderValue { .. } => ErrorCode::InvalidHeaderValue,
            Self::TransportInit { .. } => ErrorCode::TransportInit,
            Self::Transport { .. } => ErrorCode::Transport,
            Self::HttpStatus { .. } => ErrorCode::HttpStatus,
            Self::Deserialize { .. } => ErrorCode::Deserialize,
            Self::Cancelled { .. } => ErrorCode::Cancelled,
        }
    }
}
