//! Exercises the HTTP clients against a throwaway local server.

use flowchat_core::completion::complete_or_fallback;
use flowchat_core::completion::fallback::is_fallback_text;
use flowchat_core::{CompletionError, CompletionService};
use flowchat_interaction::{ChatEndpointClient, OpenAiClient};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves exactly one request with a canned response and hands back the
/// raw request text.
async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        request
    });

    (format!("http://{addr}/api/chat"), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[tokio::test]
async fn chat_endpoint_returns_response_field() {
    let (url, server) = serve_once("200 OK", r#"{"response": "Hello from the model"}"#).await;
    let client = ChatEndpointClient::new(url, Duration::from_secs(5));

    let text = client.complete("Human: hi").await.unwrap();
    assert_eq!(text, "Hello from the model");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /api/chat"));
    assert!(request.contains(r#"{"prompt":"Human: hi"}"#));
}

#[tokio::test]
async fn chat_endpoint_maps_server_errors() {
    let (url, server) = serve_once(
        "500 Internal Server Error",
        r#"{"error": "Failed to get AI response"}"#,
    )
    .await;
    let client = ChatEndpointClient::new(url, Duration::from_secs(5));

    let err = client.complete("anything").await.unwrap_err();
    assert_eq!(err.status_code(), Some(500));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("Failed to get AI response"));
    server.await.unwrap();
}

#[tokio::test]
async fn chat_endpoint_failure_becomes_fallback() {
    let (url, server) = serve_once("503 Service Unavailable", "").await;
    let client = ChatEndpointClient::new(url, Duration::from_secs(5));

    let generated = complete_or_fallback(&client, "Let's plan the project").await;
    assert!(generated.fallback);
    assert!(is_fallback_text(&generated.content));
    server.await.unwrap();
}

#[tokio::test]
async fn chat_endpoint_blank_response_is_empty() {
    let (url, server) = serve_once("200 OK", r#"{"response": "   "}"#).await;
    let client = ChatEndpointClient::new(url, Duration::from_secs(5));

    assert_eq!(
        client.complete("x").await.unwrap_err(),
        CompletionError::EmptyResponse
    );
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_endpoint_is_a_request_error() {
    // bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ChatEndpointClient::new(format!("http://{addr}/api/chat"), Duration::from_secs(5));
    let err = client.complete("x").await.unwrap_err();
    assert!(matches!(err, CompletionError::Request { .. }));
}

#[tokio::test]
async fn openai_client_sends_bearer_and_reads_choice() {
    let (url, server) = serve_once(
        "200 OK",
        r#"{"choices": [{"message": {"role": "assistant", "content": "merged view"}}]}"#,
    )
    .await;
    let client =
        OpenAiClient::new("sk-test", "gpt-4o-mini", Duration::from_secs(5)).with_base_url(url);

    assert_eq!(client.complete("synthesize").await.unwrap(), "merged view");

    let request = server.await.unwrap().to_lowercase();
    assert!(request.contains("authorization: bearer sk-test"));
    assert!(request.contains(r#""model":"gpt-4o-mini""#));
}

#[tokio::test]
async fn openai_client_maps_rate_limit() {
    let (url, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#,
    )
    .await;
    let client = OpenAiClient::new("sk-test", "gpt-4o", Duration::from_secs(5)).with_base_url(url);

    let err = client.complete("x").await.unwrap_err();
    assert_eq!(
        err,
        CompletionError::Status {
            status_code: 429,
            message: "Rate limit reached".to_string(),
            is_retryable: true,
        }
    );
    server.await.unwrap();
}
