use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use uuid::Uuid;

use volunteer_api::auth::{generate_jwt, Claims};
use volunteer_api::routes::{app, AppState};
use volunteer_api::store::MemoryStore;

pub struct TestServer {
    pub base_url: String,
}

/// Spawn a fresh in-process server on a free port, backed by an empty
/// in-memory store. Each test gets its own server so state never leaks
/// between tests.
pub async fn spawn_server() -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let state = AppState {
        store: Arc::new(MemoryStore::new()),
    };
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.expect("test server");
    });

    let server = TestServer { base_url };
    server.wait_ready(Duration::from_secs(5)).await?;
    Ok(server)
}

impl TestServer {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

/// Mint an Authorization header value for the given caller. The test
/// process and the in-process server share the development JWT secret.
pub fn bearer(user: Uuid) -> String {
    let token = generate_jwt(Claims::new(user)).expect("failed to mint test token");
    format!("Bearer {}", token)
}
