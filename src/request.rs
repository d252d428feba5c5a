//! The fluent request builder.
//!
//! A [`RequestBuilder`] collects headers, a body and an optional timeout,
//! then sends one request with [`RequestBuilder::send`] using the client
//! resolved from a [`Context`]. Wrap it with one of the `with_*result`
//! methods to have the response body read and decoded for you.

use crate::{
    codec::{self, JSON_MIME, XML_MIME},
    Body, Context, Error, ResultWrapper, Result,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use url::Url;

/// Builds and sends a single HTTP request.
///
/// Configuration methods never fail and can be chained. An invalid header
/// name or value is remembered and reported when the request is sent.
///
/// Builders are meant to be used once. A builder without a body can be sent
/// again, but a body is handed to the first send that gets that far, so a
/// second send of a builder that had one fails with [`Error::BodyConsumed`].
///
/// `send` borrows the builder, so a chain ending in `.send(..)` must be
/// awaited in the same statement. To keep the future around, bind the
/// builder (or the [`ResultWrapper`]) to a variable first:
///
/// ```no_run
/// # use fluent_request::{Context, RequestBuilder};
/// # use http::Method;
/// # async fn example() -> Result<(), fluent_request::Error> {
/// let ctx = Context::background();
/// let mut wrapper = RequestBuilder::new().with_json_result::<serde_json::Value>();
/// let pending = wrapper.send(&ctx, Method::GET, "https://api.example.com/status");
/// let outcome = pending.await?;
/// # drop(outcome);
/// # Ok(())
/// # }
/// ```
///
/// # Examples
///
/// ```no_run
/// use fluent_request::{Context, RequestBuilder};
/// use http::Method;
/// use serde::Serialize;
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct Payload {
///     message: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let ctx = Context::background();
/// let response = RequestBuilder::new()
///     .timeout(Duration::from_secs(10))
///     .basic_auth("username", "password")
///     .json_body(Payload { message: "This is an example.".to_string() })
///     .send(&ctx, Method::POST, "https://api.example.com/messages")
///     .await?;
///
/// println!("Status: {}", response.status());
/// let body = response.into_body().collect().await?;
/// println!("Body: {}", String::from_utf8_lossy(&body));
/// # Ok(())
/// # }
/// ```
pub struct RequestBuilder {
    headers: HeaderMap,
    timeout: Option<Duration>,
    body: BodySlot,
    invalid_header: Option<String>,
}

enum BodySlot {
    Unset,
    Ready(Body),
    Consumed,
}

/// The point in time by which one request, including its response body, has
/// to be done.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    pub(crate) at: tokio::time::Instant,
    pub(crate) timeout: Duration,
}

impl Deadline {
    fn after(timeout: Duration) -> Self {
        Self {
            at: tokio::time::Instant::now() + timeout,
            timeout,
        }
    }

    /// Runs `fut`, failing with [`Error::Timeout`] if the deadline passes first.
    pub(crate) async fn bound<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout_at(self.at, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.timeout)),
        }
    }
}

impl RequestBuilder {
    /// Creates a builder with no headers, no body and no timeout override.
    pub fn new() -> Self {
        Self {
            headers: HeaderMap::new(),
            timeout: None,
            body: BodySlot::Unset,
            invalid_header: None,
        }
    }

    /// Overrides the timeout of the client the request is sent with.
    ///
    /// The client itself is left untouched; the override only applies to
    /// requests sent by this builder.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the request body. Does not touch `Content-Type`.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = BodySlot::Ready(body.into());
        self
    }

    /// Sets the body to the JSON representation of `value` and
    /// `Content-Type` to `application/json`.
    ///
    /// Serialization streams while the request is being sent; a
    /// serialization failure shows up as a failure of the send.
    pub fn json_body<T>(mut self, value: T) -> Self
    where
        T: Serialize + Send + 'static,
    {
        self.body = BodySlot::Ready(Body::encoded(codec::json_encoder(value)));
        self.header(CONTENT_TYPE, JSON_MIME)
    }

    /// Sets the body to the XML representation of `value` and
    /// `Content-Type` to `application/xml`.
    ///
    /// Serialization streams while the request is being sent; a
    /// serialization failure shows up as a failure of the send.
    pub fn xml_body<T>(mut self, value: T) -> Self
    where
        T: Serialize + Send + 'static,
    {
        self.body = BodySlot::Ready(Body::encoded(codec::xml_encoder(value)));
        self.header(CONTENT_TYPE, XML_MIME)
    }

    /// Sets the header `key` to the single value `value`, replacing any
    /// existing values. Header names are case-insensitive.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        if let Some((name, value)) = self.parse_header(key, value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Adds `value` to the header `key`, keeping any existing values.
    pub fn append_header<K, V>(mut self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        if let Some((name, value)) = self.parse_header(key, value) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type<V>(self, value: V) -> Self
    where
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.header(CONTENT_TYPE, value)
    }

    /// Sets the `Accept` header.
    pub fn accept<V>(self, value: V) -> Self
    where
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.header(ACCEPT, value)
    }

    /// Sets `Authorization` to HTTP Basic authentication with the given
    /// credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use fluent_request::RequestBuilder;
    ///
    /// let builder = RequestBuilder::new().basic_auth("username", "password");
    /// assert_eq!(
    ///     builder.headers()["authorization"],
    ///     "Basic dXNlcm5hbWU6cGFzc3dvcmQ="
    /// );
    /// ```
    pub fn basic_auth<U, P>(self, username: U, password: P) -> Self
    where
        U: fmt::Display,
        P: fmt::Display,
    {
        let credentials = STANDARD.encode(format!("{}:{}", username, password));
        self.sensitive_header(AUTHORIZATION, format!("Basic {}", credentials))
    }

    /// Sets `Authorization` to HTTP Bearer authentication with `token`,
    /// sent verbatim.
    pub fn bearer_auth<T>(self, token: T) -> Self
    where
        T: fmt::Display,
    {
        self.sensitive_header(AUTHORIZATION, format!("Bearer {}", token))
    }

    /// The headers configured so far.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The timeout override, if one was set.
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Wraps the builder so that `send` reads the whole response body and
    /// returns it alongside the response.
    pub fn with_result(self) -> ResultWrapper<()> {
        ResultWrapper::new(self, codec::decode_nothing)
    }

    /// Wraps the builder so that `send` reads the whole response body and
    /// decodes it as JSON into `T`.
    ///
    /// Sets `Accept` to `application/json` unless an `Accept` header is
    /// already present.
    pub fn with_json_result<T: DeserializeOwned>(self) -> ResultWrapper<T> {
        ResultWrapper::new(self.accept_if_unset(JSON_MIME), codec::decode_json::<T>)
    }

    /// Wraps the builder so that `send` reads the whole response body and
    /// decodes it as XML into `T`.
    ///
    /// Sets `Accept` to `application/xml` unless an `Accept` header is
    /// already present.
    pub fn with_xml_result<T: DeserializeOwned>(self) -> ResultWrapper<T> {
        ResultWrapper::new(self.accept_if_unset(XML_MIME), codec::decode_xml::<T>)
    }

    /// Sends the request and returns the raw response.
    ///
    /// The response body is not read; the caller owns it. The request is sent
    /// through the client attached to `ctx`, or the default client if there
    /// is none, and is bounded by the timeout override (or the client's
    /// timeout) as well as the context's deadline and cancellation.
    ///
    /// The timeout counts from the moment the request goes out and also
    /// covers reading the returned body: once it elapses, the body yields an
    /// [`io::ErrorKind::TimedOut`](std::io::ErrorKind::TimedOut) error.
    ///
    /// # Errors
    ///
    /// - A construction error ([`Error::InvalidUrl`], [`Error::InvalidRequest`],
    ///   [`Error::InvalidHeader`], [`Error::BodyConsumed`]) if the request
    ///   cannot be assembled. Nothing is sent in that case.
    /// - The transport's error if the exchange fails, including failures
    ///   while streaming the body.
    /// - [`Error::Timeout`], [`Error::DeadlineExceeded`] or [`Error::Cancelled`].
    pub async fn send<M>(&mut self, ctx: &Context, method: M, url: &str) -> Result<Response<Body>>
    where
        Method: TryFrom<M>,
        <Method as TryFrom<M>>::Error: Into<http::Error>,
    {
        let (response, deadline) = self.dispatch(ctx, method, url).await?;
        Ok(response.map(|body| body.with_deadline(deadline.at, deadline.timeout)))
    }

    /// Sends the request and returns the response together with the deadline
    /// that still applies to reading its body.
    pub(crate) async fn dispatch<M>(
        &mut self,
        ctx: &Context,
        method: M,
        url: &str,
    ) -> Result<(Response<Body>, Deadline)>
    where
        Method: TryFrom<M>,
        <Method as TryFrom<M>>::Error: Into<http::Error>,
    {
        if let Some(message) = &self.invalid_header {
            return Err(Error::InvalidHeader(message.clone()));
        }
        let method = Method::try_from(method).map_err(|e| Error::InvalidRequest(e.into()))?;
        let url = Url::parse(url)?;
        let client = ctx.resolve_client()?;

        let mut headers = client.default_headers().clone();
        for name in self.headers.keys() {
            headers.remove(name);
            for value in self.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }

        let (mut parts, ()) = Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .body(())?
            .into_parts();
        parts.headers = headers;
        // Last fallible step: the body is only given up for a request that will go out.
        let body = self.take_body()?.unwrap_or_default();
        let request = Request::from_parts(parts, body);

        let deadline = Deadline::after(self.timeout.unwrap_or_else(|| client.timeout()));
        tracing::debug!(
            method = %method,
            url = %url,
            timeout_ms = deadline.timeout.as_millis(),
            "Executing HTTP request"
        );

        let start_time = Instant::now();
        let result = ctx.run(deadline.bound(client.execute(request))).await;

        match &result {
            Ok(response) => tracing::info!(
                status = response.status().as_u16(),
                latency_ms = start_time.elapsed().as_millis(),
                "Received HTTP response"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                method = %method,
                url = %url,
                "Request failed"
            ),
        }

        Ok((result?, deadline))
    }

    fn take_body(&mut self) -> Result<Option<Body>> {
        match std::mem::replace(&mut self.body, BodySlot::Consumed) {
            BodySlot::Unset => {
                self.body = BodySlot::Unset;
                Ok(None)
            }
            BodySlot::Ready(body) => Ok(Some(body)),
            BodySlot::Consumed => Err(Error::BodyConsumed),
        }
    }

    fn accept_if_unset(mut self, mime: &'static str) -> Self {
        let unset = self.headers.get(ACCEPT).map_or(true, HeaderValue::is_empty);
        if unset {
            self.headers.insert(ACCEPT, HeaderValue::from_static(mime));
        }
        self
    }

    fn sensitive_header(mut self, name: HeaderName, value: String) -> Self {
        match HeaderValue::try_from(value) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(name, value);
            }
            Err(e) => self.record_invalid_header(format!("{}: {}", name, e)),
        }
        self
    }

    fn parse_header<K, V>(&mut self, key: K, value: V) -> Option<(HeaderName, HeaderValue)>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = match HeaderName::try_from(key) {
            Ok(name) => name,
            Err(e) => {
                self.record_invalid_header(e.into().to_string());
                return None;
            }
        };
        match HeaderValue::try_from(value) {
            Ok(value) => Some((name, value)),
            Err(e) => {
                self.record_invalid_header(format!("{}: {}", name, e.into()));
                None
            }
        }
    }

    fn record_invalid_header(&mut self, message: String) {
        // Only the first problem is reported.
        if self.invalid_header.is_none() {
            self.invalid_header = Some(message);
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            BodySlot::Unset => "unset",
            BodySlot::Ready(_) => "ready",
            BodySlot::Consumed => "consumed",
        };
        f.debug_struct("RequestBuilder")
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("body", &body)
            .finish()
    }
}
