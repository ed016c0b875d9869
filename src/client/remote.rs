//! Hosted Data Service Client
//!
//! Create and delete go over REST; the live query is a WebSocket that pushes a
//! full listing on connect and after every change.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::error::{ClientError, ClientResult};
use super::messages::{ClientMessage, ServerMessage};
use super::subscription::Subscription;
use super::ExpenseClient;
use crate::model::{ExpenseId, ExpenseRecord, NewExpense, Snapshot};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for the hosted data service client
#[derive(Debug, Clone)]
pub struct RemoteClientConfig {
    /// Base URL of the data service (e.g., "https://data.example.com")
    pub base_url: String,
    /// Collection name ("Expense")
    pub collection: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Reconnect attempts before a live query gives up
    pub reconnect_attempts: u32,
    /// Upper bound on the reconnect delay in milliseconds
    pub max_backoff_ms: u64,
    /// Keepalive ping interval in seconds
    pub ping_interval_secs: u64,
}

impl Default for RemoteClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8090".to_string(),
            collection: "Expense".to_string(),
            request_timeout_ms: 10_000,
            reconnect_attempts: 5,
            max_backoff_ms: 30_000,
            ping_interval_secs: 30,
        }
    }
}

/// Data service client authorized as one principal
pub struct RemoteExpenseClient {
    client: Client,
    config: RemoteClientConfig,
    access_token: String,
}

impl RemoteExpenseClient {
    /// Create a client that sends the given bearer token with every request
    pub fn new(config: RemoteClientConfig, access_token: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            config,
            access_token: access_token.into(),
        })
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.collection
        )
    }

    fn item_url(&self, id: &ExpenseId) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn observe_url(&self) -> ClientResult<String> {
        let http_url = format!("{}/observe", self.collection_url());
        if let Some(rest) = http_url.strip_prefix("https://") {
            Ok(format!("wss://{rest}"))
        } else if let Some(rest) = http_url.strip_prefix("http://") {
            Ok(format!("ws://{rest}"))
        } else {
            Err(ClientError::InvalidEndpoint(self.config.base_url.clone()))
        }
    }
}

#[async_trait]
impl ExpenseClient for RemoteExpenseClient {
    async fn observe_query(&self) -> ClientResult<Subscription> {
        let url = self.observe_url()?;
        let stream = connect(&url, &self.access_token).await?;
        tracing::info!(url = %url, "Live query connected");

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_live_query(
            stream,
            url,
            self.access_token.clone(),
            tx,
            self.config.clone(),
        ));

        Ok(Subscription::new(rx, move || task.abort()))
    }

    async fn create(&self, expense: NewExpense) -> ClientResult<ExpenseRecord> {
        let url = self.collection_url();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&expense)
            .send()
            .await
            .map_err(map_request_error)?;

        if response.status().is_success() {
            let record: ExpenseRecord = response
                .json()
                .await
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            tracing::info!(id = ?record.id, "Expense created");
            Ok(record)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn delete(&self, id: &ExpenseId) -> ClientResult<()> {
        let url = self.item_url(id);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_request_error)?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(id = %id, "Expense deleted");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(id.clone())),
            _ => Err(error_from_response(response).await),
        }
    }
}

fn map_request_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else if e.is_connect() {
        ClientError::Unavailable
    } else {
        ClientError::Request(e)
    }
}

async fn error_from_response(response: reqwest::Response) -> ClientError {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ClientError::Unauthorized;
    }
    let message = response.text().await.unwrap_or_default();
    ClientError::ApiError {
        status: status.as_u16(),
        message,
    }
}

/// Open the live query socket with the principal's bearer token
async fn connect(url: &str, access_token: &str) -> ClientResult<WsStream> {
    let mut request = url.into_client_request()?;
    let auth = HeaderValue::from_str(&format!("Bearer {access_token}"))
        .map_err(|e| ClientError::InvalidEndpoint(e.to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, auth);

    match connect_async(request).await {
        Ok((stream, _)) => Ok(stream),
        Err(tokio_tungstenite::tungstenite::Error::Http(response))
            if response.status().as_u16() == 401 =>
        {
            Err(ClientError::Unauthorized)
        }
        Err(e) => Err(e.into()),
    }
}

/// Reconnect delay: 1s, 2s, 4s, ... capped at `max_ms`
pub(crate) fn backoff_delay(attempt: u32, max_ms: u64) -> Duration {
    let delay_ms = 1000u64.saturating_mul(1u64 << attempt.min(16));
    Duration::from_millis(delay_ms.min(max_ms))
}

enum PumpEnd {
    /// The subscription side is gone; stop for good
    ReceiverGone,
    /// The socket dropped; try to reconnect
    Disconnected(String),
}

/// Background task behind one live query
///
/// Dropping `tx` (on return) ends the subscription's stream.
async fn run_live_query(
    mut stream: WsStream,
    url: String,
    access_token: String,
    tx: mpsc::UnboundedSender<Snapshot>,
    config: RemoteClientConfig,
) {
    let ping_every = Duration::from_secs(config.ping_interval_secs.max(1));

    loop {
        match pump(&mut stream, &tx, ping_every).await {
            PumpEnd::ReceiverGone => return,
            PumpEnd::Disconnected(reason) => {
                tracing::warn!(url = %url, reason = %reason, "Live query disconnected");
            }
        }

        let mut attempts = 0;
        stream = loop {
            if attempts >= config.reconnect_attempts {
                tracing::error!(url = %url, attempts, "Live query gave up reconnecting");
                return;
            }

            let delay = backoff_delay(attempts, config.max_backoff_ms);
            attempts += 1;
            tokio::time::sleep(delay).await;

            tracing::info!(url = %url, attempt = attempts, "Reconnecting live query");
            match connect(&url, &access_token).await {
                Ok(stream) => break stream,
                Err(ClientError::Unauthorized) => {
                    tracing::error!(url = %url, "Live query rejected: not authorized");
                    return;
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Reconnect failed");
                }
            }
        };
    }
}

/// Forward snapshots from the socket until it closes or nobody listens
async fn pump(
    stream: &mut WsStream,
    tx: &mpsc::UnboundedSender<Snapshot>,
    ping_every: Duration,
) -> PumpEnd {
    let mut ping = tokio::time::interval(ping_every);
    // First tick completes immediately
    ping.tick().await;

    loop {
        tokio::select! {
            _ = tx.closed() => return PumpEnd::ReceiverGone,
            _ = ping.tick() => {
                let text = match serde_json::to_string(&ClientMessage::Ping) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize ping");
                        continue;
                    }
                };
                if let Err(e) = stream.send(Message::text(text)).await {
                    return PumpEnd::Disconnected(e.to_string());
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(ServerMessage::Pong) => tracing::trace!("Pong"),
                        Ok(ServerMessage::Error { message }) => {
                            tracing::warn!(message = %message, "Data service reported an error");
                        }
                        Ok(message) => {
                            if let Some(snapshot) = message.into_snapshot() {
                                tracing::debug!(
                                    items = snapshot.items.len(),
                                    is_synced = snapshot.is_synced,
                                    "Snapshot received"
                                );
                                if tx.send(snapshot).is_err() {
                                    return PumpEnd::ReceiverGone;
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring malformed live query message");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return PumpEnd::Disconnected("closed by server".to_string());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return PumpEnd::Disconnected(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::accept_async;

    fn client_with_base(base_url: &str) -> RemoteExpenseClient {
        let config = RemoteClientConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        };
        RemoteExpenseClient::new(config, "token").unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = RemoteClientConfig::default();
        assert_eq!(config.collection, "Expense");
        assert_eq!(config.reconnect_attempts, 5);
        assert_eq!(config.max_backoff_ms, 30_000);
    }

    #[test]
    fn test_urls() {
        let client = client_with_base("https://data.example.com/");
        assert_eq!(
            client.collection_url(),
            "https://data.example.com/models/Expense"
        );
        assert_eq!(
            client.item_url(&ExpenseId::new("e-1")),
            "https://data.example.com/models/Expense/e-1"
        );
        assert_eq!(
            client.observe_url().unwrap(),
            "wss://data.example.com/models/Expense/observe"
        );
    }

    #[test]
    fn test_observe_url_plain_http() {
        let client = client_with_base("http://localhost:8090");
        assert_eq!(
            client.observe_url().unwrap(),
            "ws://localhost:8090/models/Expense/observe"
        );
    }

    #[test]
    fn test_observe_url_rejects_unknown_scheme() {
        let client = client_with_base("ftp://localhost");
        assert!(matches!(
            client.observe_url(),
            Err(ClientError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_backoff_delay() {
        assert_eq!(backoff_delay(0, 30_000), Duration::from_secs(1));
        assert_eq!(backoff_delay(1, 30_000), Duration::from_secs(2));
        assert_eq!(backoff_delay(3, 30_000), Duration::from_secs(8));
        assert_eq!(backoff_delay(10, 30_000), Duration::from_secs(30));
        assert_eq!(backoff_delay(u32::MAX, 30_000), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_observe_unreachable_service_fails() {
        let client = client_with_base("http://127.0.0.1:1");
        assert!(client.observe_query().await.is_err());
    }

    fn fast_reconnect(base_url: String) -> RemoteClientConfig {
        RemoteClientConfig {
            base_url,
            reconnect_attempts: 3,
            max_backoff_ms: 10,
            ..Default::default()
        }
    }

    fn snapshot_frame(id: &str) -> Message {
        Message::text(format!(
            r#"{{"type":"snapshot","items":[{{"id":"{id}","name":"Coffee","amount":4.5}}],"is_synced":true}}"#
        ))
    }

    async fn within<F: Future>(future: F) -> F::Output {
        tokio::time::timeout(Duration::from_secs(5), future)
            .await
            .expect("timed out")
    }

    /// Read one HTTP request, headers and body
    async fn read_request(tcp: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let text = String::from_utf8_lossy(&buf).into_owned();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return text;
                }
            }

            let n = tcp.read(&mut chunk).await.unwrap();
            if n == 0 {
                return text;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    async fn respond(tcp: &mut TcpStream, status: &str, body: &str) {
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        tcp.write_all(response.as_bytes()).await.unwrap();
        let _ = tcp.shutdown().await;
    }

    /// Answer a single HTTP request; the handle yields the raw request
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut tcp, _) = listener.accept().await.unwrap();
            let request = read_request(&mut tcp).await;
            respond(&mut tcp, status, body).await;
            request
        });

        (base_url, server)
    }

    #[tokio::test]
    async fn test_create_decodes_returned_record() {
        let (base_url, server) = serve_once(
            "201 Created",
            r#"{"id":"e-1","name":"Coffee","amount":4.5,"owner":"alice","createdAt":"2024-03-01T09:30:00.000Z"}"#,
        )
        .await;
        let client = client_with_base(&base_url);

        let record = within(client.create(NewExpense::new("Coffee", 4.5)))
            .await
            .unwrap();

        assert_eq!(record.id, Some(ExpenseId::new("e-1")));
        assert_eq!(record.owner.as_deref(), Some("alice"));
        assert_eq!(record.amount, Some(4.5));

        let request = within(server).await.unwrap();
        assert!(request.starts_with("POST /models/Expense HTTP/1.1"));
        assert!(request.to_lowercase().contains("authorization: bearer token"));
        assert!(request.ends_with(r#"{"name":"Coffee","amount":4.5}"#));
    }

    #[tokio::test]
    async fn test_delete_success() {
        let (base_url, server) = serve_once("200 OK", "{}").await;
        let client = client_with_base(&base_url);

        within(client.delete(&ExpenseId::new("e-1"))).await.unwrap();

        let request = within(server).await.unwrap();
        assert!(request.starts_with("DELETE /models/Expense/e-1 HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (base_url, _server) = serve_once("404 Not Found", "").await;
        let client = client_with_base(&base_url);

        let result = within(client.delete(&ExpenseId::new("e-9"))).await;

        match result {
            Err(ClientError::NotFound(id)) => assert_eq!(id, ExpenseId::new("e-9")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        for status in ["401 Unauthorized", "403 Forbidden"] {
            let (base_url, _server) = serve_once(status, "").await;
            let client = client_with_base(&base_url);

            let result = within(client.create(NewExpense::new("Coffee", 4.5))).await;
            assert!(
                matches!(result, Err(ClientError::Unauthorized)),
                "status {status} gave {:?}",
                result
            );
        }
    }

    #[tokio::test]
    async fn test_other_status_is_api_error() {
        let (base_url, _server) = serve_once("500 Internal Server Error", "boom").await;
        let client = client_with_base(&base_url);

        let result = within(client.delete(&ExpenseId::new("e-1"))).await;

        match result {
            Err(ClientError::ApiError { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_live_query_survives_noise_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(snapshot_frame("e1")).await.unwrap();
            ws.send(Message::text(
                r#"{"type":"error","message":"slow down"}"#.to_string(),
            ))
            .await
            .unwrap();
            ws.send(Message::text("not json".to_string())).await.unwrap();
            ws.send(snapshot_frame("e1b")).await.unwrap();
            ws.send(Message::Close(None)).await.unwrap();
            drop(ws);

            // Reconnect gets a fresh listing
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(snapshot_frame("e2")).await.unwrap();

            // Runs until the client side goes away
            while let Some(Ok(_)) = ws.next().await {}
        });

        let client = RemoteExpenseClient::new(fast_reconnect(base_url), "token").unwrap();
        let mut sub = client.observe_query().await.unwrap();

        for expected in ["e1", "e1b", "e2"] {
            let snapshot = within(sub.next_snapshot()).await.unwrap();
            assert_eq!(snapshot.items[0].id, Some(ExpenseId::new(expected)));
        }

        assert!(sub.unsubscribe());
        assert!(sub.next_snapshot().await.is_none());

        // Release closed the socket
        within(server).await.unwrap();
    }

    #[tokio::test]
    async fn test_live_query_stops_when_reconnect_is_unauthorized() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(tcp).await.unwrap();
            ws.send(snapshot_frame("e1")).await.unwrap();
            ws.send(Message::Close(None)).await.unwrap();
            drop(ws);

            // Token revoked while disconnected
            let (mut tcp, _) = listener.accept().await.unwrap();
            read_request(&mut tcp).await;
            respond(&mut tcp, "401 Unauthorized", "").await;

            // True if no further attempt arrives
            tokio::time::timeout(Duration::from_millis(300), listener.accept())
                .await
                .is_err()
        });

        let client = RemoteExpenseClient::new(fast_reconnect(base_url), "token").unwrap();
        let mut sub = client.observe_query().await.unwrap();

        assert!(within(sub.next_snapshot()).await.is_some());
        assert!(within(sub.next_snapshot()).await.is_none());
        assert!(within(server).await.unwrap());
    }
}
