//! Contact Form Relay Example
//!
//! This example demonstrates how to:
//! - Configure the relay with the builder pattern
//! - Feed it a base64-encoded multipart submission
//! - Observe the redirect outcome and the relay metrics

use std::sync::Arc;

use formrelay::mocks::{FormPayload, MockTransport};
use formrelay::{FormRelay, RelayConfig, RelayError};

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    // Configure the relay
    let config = RelayConfig::builder()
        .sender("forms@example.org")
        .recipient("owner@example.org")
        .subject("contact me")
        .region("us-west-2")
        .success_url("https://example.org/sent.html")
        .failure_url("https://example.org/error.html")
        .build()?;

    // A recording transport stands in for the production mail sender
    let transport = Arc::new(MockTransport::new());
    let relay = FormRelay::new(config, transport.clone())?;

    // A browser-shaped multipart submission, base64-encoded
    let request = FormPayload::new("demo-boundary")
        .text_field("name", "Ada Lovelace")
        .text_field("email", "ada@example.org")
        .text_field("message", "The engine weaves algebraic patterns.")
        .file_field("attachment", "notes.txt", b"first actual program")
        .into_request();

    println!("Relaying contact submission...");
    let redirect = relay.handle(&request).await;
    println!("  Redirect: {} -> {}", redirect.status, redirect.location);
    println!("  Messages handed to transport: {}", transport.sent_count());

    if let Some(message) = transport.sent().first() {
        println!("  Outbound message size: {} bytes", message.len());
    }

    // A bot submission trips the honeypot and is never sent
    let spam = FormPayload::new("demo-boundary")
        .text_field("name", "Definitely Human")
        .text_field("office", "buy cheap widgets")
        .into_request();

    println!("Relaying bot submission...");
    let redirect = relay.handle(&spam).await;
    println!("  Redirect: {} -> {}", redirect.status, redirect.location);
    println!("  Messages handed to transport: {}", transport.sent_count());

    let snapshot = relay.metrics().snapshot();
    println!("Relay metrics:");
    println!("  received:  {}", snapshot.submissions_received);
    println!("  delivered: {}", snapshot.submissions_delivered);
    println!("  spam:      {}", snapshot.spam_rejections);

    Ok(())
}
