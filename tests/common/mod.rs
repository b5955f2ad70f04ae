//! Shared test infrastructure for integration tests
//!
//! Provides TestServer, which spawns the real club_session binary with a
//! temporary TOML config, plus known kiosk and member credentials.

#![allow(dead_code)]

use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Port counter to avoid conflicts between tests.
static PORT_COUNTER: AtomicU16 = AtomicU16::new(19400);

pub const SECRET: &str = "integration-test-secret";
pub const EVENT_CODE: &str = "SPRING25";
pub const KIOSK_PIN: &str = "4321";
pub const MEMBER_ID: &str = "M-0042";
pub const MEMBER_PASSWORD: &str = "correct horse battery";

/// Test server wrapper that spawns a real club_session binary
pub struct TestServer {
    process: Child,
    port: u16,
    _config_dir: TempDir,
}

impl TestServer {
    // ── Factory methods ──

    /// Start a server with one kiosk event and one member account.
    pub async fn start() -> Self {
        Self::spawn_with_config(&default_config_body("")).await
    }

    /// Start a server with extra top-level settings ahead of the tables.
    pub async fn with_settings(settings: &str) -> Self {
        Self::spawn_with_config(&default_config_body(settings)).await
    }

    // ── Shared spawn logic ──

    /// Allocate a port, write a TOML config, spawn the server and wait for
    /// readiness. All factory methods delegate here.
    async fn spawn_with_config(config_body: &str) -> Self {
        let port = PORT_COUNTER.fetch_add(1, Ordering::SeqCst);
        let config_dir = TempDir::new().expect("Failed to create temp dir");

        let full_config = format!("listen_addr = \"127.0.0.1:{}\"\n{}", port, config_body);
        let config_path = config_dir.path().join("test.toml");
        std::fs::write(&config_path, &full_config).expect("Failed to write test config");

        let process = Command::new(env!("CARGO_BIN_EXE_club_session"))
            .arg("--config")
            .arg(&config_path)
            .env("RUST_LOG", "club_session=warn")
            .env_remove("CLUB_ENV")
            .env_remove("CLUB_SESSION_SECRET")
            .env_remove("CLUB_KIOSK_SECRET")
            .env_remove("CLUB_MEMBER_SECRET")
            .spawn()
            .expect("Failed to start server");

        let mut server = Self {
            process,
            port,
            _config_dir: config_dir,
        };
        server.wait_ready().await;
        server
    }

    // ── Instance methods ──

    async fn wait_ready(&mut self) {
        let addr = format!("127.0.0.1:{}", self.port);
        for _ in 0..150 {
            if std::net::TcpStream::connect(&addr).is_ok() {
                sleep(Duration::from_millis(100)).await;
                return;
            }

            if let Ok(Some(status)) = self.process.try_wait() {
                panic!("Server exited before becoming ready: {}", status);
            }

            sleep(Duration::from_millis(100)).await;
        }

        let _ = self.process.kill();
        panic!("Timed out waiting for server on {}", addr);
    }

    /// Get the HTTP endpoint URL
    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint(), path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}

/// Config body: shared secret, one event, one member. Hashes use the
/// minimum bcrypt cost to keep tests fast.
fn default_config_body(settings: &str) -> String {
    let pin_hash = bcrypt::hash(KIOSK_PIN, 4).expect("bcrypt hash");
    let password_hash = bcrypt::hash(MEMBER_PASSWORD, 4).expect("bcrypt hash");
    format!(
        concat!(
            "session_secret = \"{}\"\n",
            "{}\n",
            "[[kiosk.events]]\n",
            "event_code = \"{}\"\n",
            "pin_hash = \"{}\"\n",
            "\n",
            "[[member.accounts]]\n",
            "member_id = \"{}\"\n",
            "display_name = \"Ada L.\"\n",
            "email = \"ada@example.org\"\n",
            "password_hash = \"{}\"\n",
        ),
        SECRET, settings, EVENT_CODE, pin_hash, MEMBER_ID, password_hash,
    )
}

/// Client that keeps cookies between requests, like a browser.
pub fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("client builds")
}

/// Client without a cookie store; cookies must be sent by hand.
pub fn bare_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Log a kiosk in and return the raw Set-Cookie header.
pub async fn kiosk_login(client: &reqwest::Client, server: &TestServer) -> String {
    let resp = client
        .post(server.url("/api/kiosk/login"))
        .json(&serde_json::json!({ "event_code": EVENT_CODE, "pin": KIOSK_PIN }))
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status().as_u16(), 200, "kiosk login should succeed");
    resp.headers()
        .get("set-cookie")
        .expect("login sets a cookie")
        .to_str()
        .expect("ascii cookie")
        .to_string()
}

/// `name=value` part of a Set-Cookie header.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_string()
}
