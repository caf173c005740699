//! Mock HTTP server setup for integration tests

use apic::{ApiClient, ConfigOverlay};
use mockito::{Mock, Server, ServerGuard};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Client over the real `reqwest` transport with short retry delays.
    pub fn client(&self, overlay: ConfigOverlay) -> ApiClient {
        let base = ConfigOverlay::new().retry_delay(Duration::from_millis(10));
        ApiClient::builder()
            .config(base)
            .config(overlay)
            .build()
            .expect("client")
    }

    /// JSON response for `method path`, expected exactly `hits` times.
    pub async fn mock_json(&self, method: &str, path: &str, status: usize, body: &str, hits: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// Successful response with an empty body.
    pub async fn mock_empty(&self, method: &str, path: &str, status: usize) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .with_status(status)
            .create_async()
            .await
    }
}

/// Address of a listener that accepts connections and never answers.
pub async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}
