//! Basic example demonstrating raw and decoded requests.
//!
//! This example shows how to:
//! - Send a request and read the raw response body yourself
//! - Send a JSON body and decode the JSON response
//! - Override the timeout for a single request
//! - Access the outcome's metadata
//!
//! Run with: `cargo run --example basic_call`

use fluent_request::{Context, Error, HttpClient, RequestBuilder};
use http::Method;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter("fluent_request=debug,basic_call=info")
        .init();

    let client = HttpClient::builder()
        .timeout(Duration::from_secs(30))
        .default_header("User-Agent", "fluent-request-demo")?
        .build()?;
    let ctx = Context::background().with_client(client);

    println!("=== Raw Request Example ===");
    let response = RequestBuilder::new()
        .send(&ctx, Method::GET, "https://jsonplaceholder.typicode.com/posts/1")
        .await?;
    println!("Status code: {}", response.status());
    let body = response.into_body().collect().await.map_err(Error::ReadBody)?;
    println!("Body: {}", String::from_utf8_lossy(&body));
    println!();

    println!("=== JSON Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };

    let outcome = RequestBuilder::new()
        .timeout(Duration::from_secs(5))
        .json_body(new_post)
        .with_json_result::<Post>()
        .send(&ctx, Method::POST, "https://jsonplaceholder.typicode.com/posts")
        .await?;

    println!("Created post ID: {}", outcome.data.id);
    println!("Title: {}", outcome.data.title);
    println!("Request latency: {:?}", outcome.latency);
    println!("Status code: {}", outcome.status());
    println!();

    println!("=== Accessing Outcome Metadata ===");
    println!("Raw response length: {} bytes", outcome.raw_data.len());
    println!("Content-Type: {:?}", outcome.header("content-type"));

    Ok(())
}
