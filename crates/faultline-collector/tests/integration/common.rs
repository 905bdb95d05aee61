//! Shared helpers: a collector running in the background on `127.0.0.1:0`.

use std::path::PathBuf;

use faultline_collector::CollectorServer;
use faultline_core::config::{ConfigBuilder, ServerConfig};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct TestCollector {
    pub base_url: String,
    pub errors_file: PathBuf,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
    _dir: TempDir,
}

impl TestCollector {
    /// Stops the server and waits for its loop to end.
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

fn server_config(errors_file: PathBuf, max_errors: usize) -> ServerConfig {
    ConfigBuilder::new()
        .server_listen("127.0.0.1:0")
        .server_errors_file(errors_file)
        .server_max_errors(max_errors)
        .build()
        .server
}

pub async fn start_collector(max_errors: usize) -> TestCollector {
    let dir = tempfile::tempdir().unwrap();
    let errors_file = dir.path().join("errors.json");
    start_with(server_config(errors_file.clone(), max_errors), errors_file, dir).await
}

/// A collector whose store cannot be written.
pub async fn start_unwritable_collector() -> TestCollector {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let errors_file = blocker.join("errors.json");
    start_with(server_config(errors_file.clone(), 100), errors_file, dir).await
}

async fn start_with(config: ServerConfig, errors_file: PathBuf, dir: TempDir) -> TestCollector {
    let server = CollectorServer::bind(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.run(shutdown.clone()));

    TestCollector {
        base_url: format!("http://{}", addr),
        errors_file,
        shutdown,
        handle,
        _dir: dir,
    }
}
