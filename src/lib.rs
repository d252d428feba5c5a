//! # fluent-request - sending HTTP requests with sane defaults
//!
//! A fluent [`RequestBuilder`] for outbound HTTP requests. It manages
//! headers, authentication and timeouts, streams JSON/XML request bodies
//! while they are being sent, and can read and decode the response for you.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fluent_request::{Context, RequestBuilder};
//! use http::Method;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//!     email: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fluent_request::Error> {
//!     let ctx = Context::background();
//!
//!     // Raw response: the caller reads the body.
//!     let response = RequestBuilder::new()
//!         .bearer_auth("secret-token")
//!         .send(&ctx, Method::GET, "https://api.example.com/health")
//!         .await?;
//!     println!("Status: {}", response.status());
//!
//!     // Decoded response: the body is read, closed and decoded.
//!     let created = RequestBuilder::new()
//!         .timeout(Duration::from_secs(10))
//!         .json_body(CreateUser {
//!             name: "Alice".to_string(),
//!             email: "alice@example.com".to_string(),
//!         })
//!         .with_json_result::<User>()
//!         .send(&ctx, Method::POST, "https://api.example.com/users")
//!         .await?;
//!     println!("Created user {} with ID {}", created.data.name, created.data.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Clients and contexts
//!
//! Requests are sent through the [`HttpClient`] attached to the [`Context`]
//! passed to `send`, or through a process-wide default client with a one
//! minute timeout. Attaching a client is how tests swap in a fake transport:
//!
//! ```
//! use fluent_request::{Body, Context, HttpClient, RequestBuilder, RoundTripFn};
//! use http::Method;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Payload {
//!     message: String,
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), fluent_request::Error> {
//! // Repeats whatever is in the request body.
//! let echo = HttpClient::new(RoundTripFn(|request: http::Request<Body>| async move {
//!     Ok::<_, fluent_request::Error>(http::Response::new(request.into_body()))
//! }));
//! let ctx = Context::background().with_client(echo);
//!
//! let result = RequestBuilder::new()
//!     .json_body(Payload { message: "This is an example.".to_string() })
//!     .with_json_result::<Payload>()
//!     .send(&ctx, Method::POST, "http://localhost")
//!     .await?;
//!
//! assert_eq!(result.status(), 200);
//! assert_eq!(result.raw_data, r#"{"message":"This is an example."}"#);
//! assert_eq!(result.data.message, "This is an example.");
//! # Ok(())
//! # }
//! ```
//!
//! A timeout set on the builder applies to that request only. The client
//! keeps its own timeout, so one client can be shared freely between
//! concurrent requests with different timeouts.
//!
//! ## Error Handling
//!
//! Every error names the stage that failed; nothing is retried:
//!
//! ```no_run
//! use fluent_request::{Context, Error, RequestBuilder};
//! use http::Method;
//!
//! # async fn example() {
//! let result = RequestBuilder::new()
//!     .with_json_result::<serde_json::Value>()
//!     .send(&Context::background(), Method::GET, "https://api.example.com/endpoint")
//!     .await;
//!
//! match result {
//!     Ok(outcome) => println!("Success: {:?}", outcome.data),
//!     Err(e) if e.is_construction() => eprintln!("Bad request: {}", e),
//!     Err(e) if e.is_decode() => eprintln!("Unexpected payload: {}", e),
//!     Err(Error::ReadBody(e)) => eprintln!("Connection dropped mid-body: {}", e),
//!     Err(e) => eprintln!("Transport error: {}", e),
//! }
//! # }
//! ```

mod body;
pub mod client;
mod codec;
pub mod context;
mod error;
pub mod request;
pub mod response;

pub use body::Body;
pub use client::{HttpClient, HttpClientBuilder, RoundTripFn, Transport, DEFAULT_CLIENT_TIMEOUT};
pub use codec::{JSON_MIME, XML_MIME};
pub use context::Context;
pub use error::{BoxError, Error, Result};
pub use request::RequestBuilder;
pub use response::{ResultWrapper, SendOutcome};
