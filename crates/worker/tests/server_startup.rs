use std::net::TcpListener;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use reqwest::Client;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Required deployment variables plus a private port, queue and temp directory.
fn base_env(dir: &Path, port: u16) -> Vec<(&'static str, String)> {
    vec![
        ("R2_ACCOUNT_ID", "acc".to_string()),
        ("R2_ACCESS_KEY_ID", "key".to_string()),
        ("R2_SECRET_ACCESS_KEY", "secret".to_string()),
        ("R2_ENDPOINT", "http://127.0.0.1:9".to_string()),
        ("RESEND_API_KEY", "re_test".to_string()),
        ("API_URL", "http://127.0.0.1:9".to_string()),
        (
            "DATABASE_URL",
            dir.join("queue.db").to_string_lossy().into_owned(),
        ),
        ("FULFILLMENT_SERVER__HOST", "127.0.0.1".to_string()),
        ("FULFILLMENT_SERVER__PORT", port.to_string()),
        (
            "FULFILLMENT_WORKSPACE__TMP_DIR",
            dir.join("tmp").to_string_lossy().into_owned(),
        ),
        ("RUST_LOG", "info".to_string()),
    ]
}

fn worker(dir: &Path, env: Vec<(&'static str, String)>) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fulfillment-worker"));
    command
        .env_clear()
        .envs(env)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_missing_access_key_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let env = base_env(dir.path(), get_available_port())
        .into_iter()
        .filter(|(key, _)| *key != "R2_ACCESS_KEY_ID")
        .collect();

    let output = timeout(Duration::from_secs(10), worker(dir.path(), env).output())
        .await
        .expect("Command timed out")
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let logs = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(
        logs.contains("R2_ACCESS_KEY_ID"),
        "missing variable not named in output: {logs}"
    );
    assert!(!dir.path().join("queue.db").exists());
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let mut env = base_env(dir.path(), get_available_port());
    env.push(("FULFILLMENT_CONFIG", "/nonexistent/fulfillment.toml".to_string()));

    let output = timeout(Duration::from_secs(10), worker(dir.path(), env).output())
        .await
        .expect("Command timed out")
        .expect("Failed to execute command");

    assert!(!output.status.success());
}

async fn start_worker(dir: &TempDir, port: u16) -> Child {
    let child = worker(dir.path(), base_env(dir.path(), port))
        .spawn()
        .expect("Failed to spawn worker");
    assert!(
        wait_for_server(port, 100).await,
        "Worker did not start in time"
    );
    child
}

#[tokio::test]
async fn test_status_endpoints_after_startup() {
    let dir = TempDir::new().unwrap();
    let port = get_available_port();
    let mut child = start_worker(&dir, port).await;

    let client = Client::new();
    let health: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let config = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(!config.contains("re_test"));
    assert!(!config.contains("\"secret\""));

    let status: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/status", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    for queue in ["orders", "confirmation_emails", "confirmations"] {
        assert_eq!(status["queues"][queue]["pending"], 0, "queue {queue}");
    }

    assert!(dir.path().join("queue.db").exists());
    assert!(dir.path().join("tmp").is_dir());

    child.kill().await.ok();
}

#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let port = get_available_port();
    let child = start_worker(&dir, port).await;

    let pid = child.id().expect("worker has no pid");
    let status = std::process::Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let output = timeout(Duration::from_secs(10), child.wait_with_output())
        .await
        .expect("Worker did not shut down in time")
        .unwrap();
    assert!(output.status.success());
}
