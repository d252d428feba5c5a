//! Request-scoped execution context.
//!
//! A [`Context`] carries what a caller wants to apply to everything done on
//! its behalf: an attached [`HttpClient`], a deadline, and a cancellation
//! token. Contexts are cheap to clone and derive from one another.

use crate::{Error, HttpClient, Result};
use std::future::{self, Future};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Execution context for sending requests.
///
/// # Examples
///
/// ```no_run
/// use fluent_request::{Context, HttpClient, RequestBuilder};
/// use http::Method;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), fluent_request::Error> {
/// let shutdown = CancellationToken::new();
/// let ctx = Context::background()
///     .with_client(HttpClient::builder().timeout(Duration::from_secs(5)).build()?)
///     .with_timeout(Duration::from_secs(30))
///     .with_cancellation(shutdown.child_token());
///
/// let response = RequestBuilder::new()
///     .send(&ctx, Method::GET, "https://api.example.com/items")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    client: Option<HttpClient>,
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl Context {
    /// An empty context: default client, no deadline, never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Attaches `client`; requests sent with this context use it instead of
    /// the default client.
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets a deadline. An earlier deadline already on the context wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Cancels in-flight work once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The attached client, if any.
    pub fn client(&self) -> Option<&HttpClient> {
        self.client.as_ref()
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns `true` if the context's cancellation token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// The attached client, falling back to the process-wide default.
    pub(crate) fn resolve_client(&self) -> Result<HttpClient> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => HttpClient::default_client(),
        }
    }

    /// Runs `fut` until it completes, the deadline passes, or the context is
    /// cancelled. Cancellation is checked first.
    pub(crate) async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending().await,
            }
        };
        let cancelled = async {
            match &self.cancellation {
                Some(token) => token.cancelled().await,
                None => future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(Error::Cancelled),
            _ = deadline => Err(Error::DeadlineExceeded),
            result = fut => result,
        }
    }
}
