//! Reading and decoding responses.
//!
//! A [`ResultWrapper`] sends its [`RequestBuilder`], reads the whole response
//! body into memory, closes it, and optionally decodes it. The result is a
//! [`SendOutcome`] carrying the response head, the raw bytes and the decoded
//! value.

use crate::{codec::Decoder, Body, Context, Error, RequestBuilder, Result};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::time::{Duration, Instant};

/// A request builder whose `send` returns a [`SendOutcome`] instead of a raw
/// response.
///
/// Created with [`RequestBuilder::with_result`],
/// [`RequestBuilder::with_json_result`] or [`RequestBuilder::with_xml_result`].
///
/// # Examples
///
/// ```no_run
/// use fluent_request::{Context, RequestBuilder};
/// use http::Method;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), fluent_request::Error> {
/// let ctx = Context::background();
/// let user = RequestBuilder::new()
///     .bearer_auth("secret-token")
///     .with_json_result::<User>()
///     .send(&ctx, Method::GET, "https://api.example.com/users/123")
///     .await?;
///
/// println!("User: {}", user.data.name);
/// println!("Raw: {}", String::from_utf8_lossy(&user.raw_data));
/// # Ok(())
/// # }
/// ```
pub struct ResultWrapper<T> {
    request: Option<RequestBuilder>,
    decode: Decoder<T>,
}

impl<T> ResultWrapper<T> {
    pub(crate) fn new(request: RequestBuilder, decode: Decoder<T>) -> Self {
        Self {
            request: Some(request),
            decode,
        }
    }

    /// The wrapped builder, unless it was taken out.
    pub fn request(&self) -> Option<&RequestBuilder> {
        self.request.as_ref()
    }

    /// Takes the wrapped builder back out. Sending the wrapper afterwards
    /// fails with [`Error::MissingRequest`].
    pub fn take_request(&mut self) -> Option<RequestBuilder> {
        self.request.take()
    }

    /// Sends the request, reads the whole response body and decodes it.
    ///
    /// The body is closed once read, whether reading succeeded or not, and
    /// the decoder only runs on a fully read body.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingRequest`] if there is no builder to send.
    /// - Any error of [`RequestBuilder::send`], unchanged.
    /// - [`Error::ReadBody`] if reading the body fails partway.
    /// - [`Error::Timeout`] if the body is not fully read before the request's
    ///   timeout, which counts from when the request was sent.
    /// - A decode error ([`Error::DecodeJson`], [`Error::DecodeXml`]) if the
    ///   body does not match `T`. The raw bytes are not returned then.
    pub async fn send<M>(&mut self, ctx: &Context, method: M, url: &str) -> Result<SendOutcome<T>>
    where
        Method: TryFrom<M>,
        <Method as TryFrom<M>>::Error: Into<http::Error>,
    {
        let request = self.request.as_mut().ok_or(Error::MissingRequest)?;

        let start_time = Instant::now();
        let (response, deadline) = request.dispatch(ctx, method, url).await?;
        let (parts, body) = response.into_parts();

        // `collect` owns the body, so it is dropped on every path out of here.
        let raw_data = ctx
            .run(deadline.bound(async { body.collect().await.map_err(Error::ReadBody) }))
            .await?;
        let latency = start_time.elapsed();

        let data = match (self.decode)(&raw_data) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    status = parts.status.as_u16(),
                    raw_response = %String::from_utf8_lossy(&raw_data),
                    "Failed to decode response"
                );
                return Err(e);
            }
        };

        Ok(SendOutcome {
            data,
            raw_data,
            response: http::Response::from_parts(parts, Body::empty()),
            latency,
        })
    }
}

impl<T> std::fmt::Debug for ResultWrapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultWrapper")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// The outcome of sending a [`ResultWrapper`].
///
/// # Type Parameters
///
/// * `T` - The decoded response body, `()` when no decoding was requested
///
/// # Examples
///
/// ```
/// # use fluent_request::{Body, SendOutcome};
/// # use std::time::Duration;
/// let mut response = http::Response::new(Body::empty());
/// response
///     .headers_mut()
///     .insert("content-type", http::HeaderValue::from_static("application/json"));
///
/// let outcome = SendOutcome::new(response, "42".into(), 42, Duration::from_millis(100));
///
/// assert_eq!(*outcome, 42);
/// assert_eq!(outcome.header("content-type"), Some("application/json"));
/// assert_eq!(outcome.map(|n| n.to_string()).data, "42");
/// ```
#[derive(Debug)]
pub struct SendOutcome<T> {
    /// The decoded response body.
    pub data: T,

    /// Every byte of the response body.
    pub raw_data: Bytes,

    /// The response head. Its body has already been read and closed, so
    /// reading it again yields nothing; use `raw_data` instead.
    pub response: http::Response<Body>,

    /// Time from sending the request until the body was fully read.
    pub latency: Duration,
}

impl<T> SendOutcome<T> {
    /// Creates a new `SendOutcome`. The response body is replaced with an
    /// empty one.
    pub fn new(response: http::Response<Body>, raw_data: Bytes, data: T, latency: Duration) -> Self {
        Self {
            data,
            raw_data,
            response: response.map(|_| Body::empty()),
            latency,
        }
    }

    /// The HTTP status code of the response.
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.headers().get(name)?.to_str().ok()
    }

    /// Maps the decoded data to a different type, keeping everything else.
    pub fn map<U, F>(self, f: F) -> SendOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        SendOutcome {
            data: f(self.data),
            raw_data: self.raw_data,
            response: self.response,
            latency: self.latency,
        }
    }
}

impl<T> AsRef<T> for SendOutcome<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for SendOutcome<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
