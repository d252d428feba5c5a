//! Error types for building, sending and decoding HTTP requests.
//!
//! Every failure is tagged with the stage it happened in: building the
//! request, talking to the transport, reading the response body, or decoding
//! it. Nothing is retried and no partial result accompanies an error.

use std::time::Duration;

/// A boxed error as produced by custom [`Transport`](crate::Transport) implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The main error type of this crate.
///
/// # Examples
///
/// ```no_run
/// use fluent_request::{Context, Error, RequestBuilder};
/// use http::Method;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Status {
///     healthy: bool,
/// }
///
/// # async fn example() {
/// let ctx = Context::background();
/// let result = RequestBuilder::new()
///     .with_json_result::<Status>()
///     .send(&ctx, Method::GET, "https://api.example.com/status")
///     .await;
///
/// match result {
///     Ok(outcome) => println!("healthy: {}", outcome.data.healthy),
///     Err(Error::DecodeJson(e)) => eprintln!("Unexpected payload: {}", e),
///     Err(e) if e.is_timeout() => eprintln!("Gave up waiting: {}", e),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The URL passed to `send` could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The method, URL and headers could not be assembled into a request.
    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] http::Error),

    /// A header name or value given to the builder was not valid.
    ///
    /// Header setters never fail, so the first invalid header is kept on the
    /// builder and reported here when the request is sent.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The builder's one-shot body was already handed to a previous send.
    #[error("Request body was already consumed by a previous send")]
    BodyConsumed,

    /// A result wrapper was sent without an underlying request builder.
    #[error("Missing request")]
    MissingRequest,

    /// The `reqwest` transport failed (connection refused, DNS, TLS, or a
    /// failure while streaming the request body).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A custom transport failed.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The request did not complete within the effective timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The deadline carried by the [`Context`](crate::Context) passed.
    #[error("Context deadline exceeded")]
    DeadlineExceeded,

    /// The [`Context`](crate::Context) was cancelled.
    #[error("Context cancelled")]
    Cancelled,

    /// Reading the response body failed partway.
    #[error("Failed to read response body: {0}")]
    ReadBody(#[source] std::io::Error),

    /// The response body is not valid JSON for the expected type.
    #[error("Failed to decode JSON response: {0}")]
    DecodeJson(#[source] serde_json::Error),

    /// The response body is not valid XML for the expected type.
    #[error("Failed to decode XML response: {0}")]
    DecodeXml(#[source] quick_xml::DeError),

    /// The XML response body is not UTF-8.
    #[error("Failed to decode XML response: {0}")]
    InvalidUtf8(#[source] std::str::Utf8Error),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl Error {
    /// Wraps an arbitrary error coming out of a custom transport.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Error::Transport(err.into())
    }

    /// Returns `true` if the request ran out of time, either through the
    /// effective timeout or the context deadline.
    ///
    /// # Examples
    ///
    /// ```
    /// use fluent_request::Error;
    /// use std::time::Duration;
    ///
    /// assert!(Error::Timeout(Duration::from_secs(1)).is_timeout());
    /// assert!(Error::DeadlineExceeded.is_timeout());
    /// assert!(!Error::Cancelled.is_timeout());
    /// ```
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout(_) | Error::DeadlineExceeded => true,
            Error::Network(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Returns `true` if the failure happened on the transport path, which
    /// includes failures of a streamed request body.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Transport(_)
                | Error::Timeout(_)
                | Error::DeadlineExceeded
                | Error::Cancelled
        )
    }

    /// Returns `true` if the response was received but could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::DecodeJson(_) | Error::DecodeXml(_) | Error::InvalidUtf8(_)
        )
    }

    /// Returns `true` if the request was rejected before anything was sent.
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_)
                | Error::InvalidRequest(_)
                | Error::InvalidHeader(_)
                | Error::BodyConsumed
                | Error::MissingRequest
        )
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
