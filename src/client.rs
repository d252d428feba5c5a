//! HTTP clients and the transports they drive.
//!
//! An [`HttpClient`] pairs a [`Transport`] with a default timeout and a set
//! of default headers. Clients are immutable once built and cheap to clone,
//! so a single instance can be shared by any number of concurrent requests.
//! Per-request timeouts never touch the client.

use crate::{Body, Error, Result};
use futures::future::{BoxFuture, FutureExt};
use futures::TryStreamExt;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use once_cell::sync::OnceCell;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Timeout of the process-wide default client.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

static DEFAULT_CLIENT: OnceCell<HttpClient> = OnceCell::new();

/// Sends a fully formed request and produces the response head plus a
/// streaming body.
///
/// Implemented for [`reqwest::Client`], which is what the default client
/// uses, and for [`RoundTripFn`], which turns an async closure into a
/// transport for tests and fakes.
pub trait Transport: Send + Sync + 'static {
    /// Performs one HTTP exchange.
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>>>;
}

impl Transport for reqwest::Client {
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>>> {
        let client = self.clone();
        async move {
            let request = into_reqwest(request)?;
            let response = client.execute(request).await?;
            Ok(from_reqwest(response))
        }
        .boxed()
    }
}

/// A [`Transport`] backed by an async function.
///
/// # Examples
///
/// ```
/// use fluent_request::{Body, HttpClient, RoundTripFn};
/// use http::Response;
///
/// // Echoes the request body back with a 200.
/// let echo = HttpClient::new(RoundTripFn(|request: http::Request<Body>| async move {
///     Ok::<_, fluent_request::Error>(Response::new(request.into_body()))
/// }));
/// ```
pub struct RoundTripFn<F>(pub F);

impl<F, Fut> Transport for RoundTripFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response<Body>>> + Send + 'static,
{
    fn round_trip(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>>> {
        (self.0)(request).boxed()
    }
}

fn into_reqwest(request: Request<Body>) -> Result<reqwest::Request> {
    let (parts, body) = request.into_parts();
    let url = reqwest::Url::parse(&parts.uri.to_string())?;

    let mut out = reqwest::Request::new(parts.method, url);
    *out.headers_mut() = parts.headers;
    *out.version_mut() = parts.version;
    *out.body_mut() = body.into_reqwest();
    Ok(out)
}

fn from_reqwest(response: reqwest::Response) -> Response<Body> {
    let mut out = Response::new(Body::empty());
    *out.status_mut() = response.status();
    *out.version_mut() = response.version();
    *out.headers_mut() = response.headers().clone();
    *out.body_mut() = Body::from_stream(response.bytes_stream().map_err(std::io::Error::other));
    out
}

/// An HTTP client: a transport plus the defaults applied to every request
/// sent through it.
///
/// Attach a client to a [`Context`](crate::Context) to have request builders
/// use it; without one the process-wide [`HttpClient::default_client`] is used.
///
/// # Examples
///
/// ```no_run
/// use fluent_request::{Context, HttpClient, RequestBuilder};
/// use http::Method;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), fluent_request::Error> {
/// let client = HttpClient::builder()
///     .timeout(Duration::from_secs(10))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
///
/// let ctx = Context::background().with_client(client);
/// let response = RequestBuilder::new()
///     .send(&ctx, Method::GET, "https://api.example.com/health")
///     .await?;
/// println!("Status: {}", response.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Box<dyn Transport>,
    timeout: Duration,
    default_headers: HeaderMap,
}

impl HttpClient {
    /// Creates a new `HttpClientBuilder` for configuring a client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Creates a client over `transport` with the default timeout and no
    /// default headers.
    pub fn new(transport: impl Transport) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport: Box::new(transport),
                timeout: DEFAULT_CLIENT_TIMEOUT,
                default_headers: HeaderMap::new(),
            }),
        }
    }

    /// Returns the process-wide default client, backed by `reqwest` with a
    /// timeout of [`DEFAULT_CLIENT_TIMEOUT`]. It is built on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest` client cannot be built.
    pub fn default_client() -> Result<HttpClient> {
        DEFAULT_CLIENT
            .get_or_try_init(|| HttpClientBuilder::new().build())
            .cloned()
    }

    /// The timeout applied to requests that don't override it.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Headers sent with every request unless the request sets them itself.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.inner.default_headers
    }

    /// Hands the request to the transport. No timeout is applied here.
    pub(crate) fn execute(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>>> {
        self.inner.transport.round_trip(request)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.inner.timeout)
            .field("default_headers", &self.inner.default_headers)
            .finish_non_exhaustive()
    }
}

/// Builder for configuring and creating an [`HttpClient`].
///
/// # Examples
///
/// ```no_run
/// use fluent_request::HttpClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), fluent_request::Error> {
/// let client = HttpClientBuilder::new()
///     .timeout(Duration::from_secs(30))
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HttpClientBuilder {
    transport: Option<Box<dyn Transport>>,
    timeout: Duration,
    default_headers: HeaderMap,
}

impl HttpClientBuilder {
    /// Creates a new `HttpClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            timeout: DEFAULT_CLIENT_TIMEOUT,
            default_headers: HeaderMap::new(),
        }
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.append(name, value);
        Ok(self)
    }

    /// Sets the timeout for requests that don't override it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sends requests through an existing `reqwest` client, sharing its
    /// connection pool.
    pub fn reqwest_client(self, client: reqwest::Client) -> Self {
        self.transport(client)
    }

    /// Sends requests through a custom transport.
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Builds the configured `HttpClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport was given and the default `reqwest`
    /// client cannot be built.
    pub fn build(self) -> Result<HttpClient> {
        let transport: Box<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let client = reqwest::Client::builder().build().map_err(|e| {
                    Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
                })?;
                Box::new(client)
            }
        };

        Ok(HttpClient {
            inner: Arc::new(ClientInner {
                transport,
                timeout: self.timeout,
                default_headers: self.default_headers,
            }),
        })
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
