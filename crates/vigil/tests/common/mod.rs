//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use vigil::monitoring::{Checker, ProbeError, Reading};
use vigil::{CommandServer, PeriodicTask, TaskRegistry};

/// Checker that only counts its invocations.
#[derive(Debug, Default)]
pub struct CountingChecker {
    calls: AtomicU64,
}

impl CountingChecker {
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Checker for CountingChecker {
    fn target(&self) -> &str {
        "in-process"
    }

    async fn check(&self) -> Result<Reading, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Reading::new(0))
    }
}

pub struct Harness {
    pub addr: SocketAddr,
    pub registry: Arc<TaskRegistry>,
    pub checkers: Vec<(String, Arc<CountingChecker>)>,
    pub server: JoinHandle<Result<(), vigil::error::ServerError>>,
}

impl Harness {
    pub fn checker(&self, name: &str) -> &CountingChecker {
        self.checkers
            .iter()
            .find(|(task, _)| task == name)
            .map(|(_, checker)| checker.as_ref())
            .unwrap()
    }
}

/// Start a server on an ephemeral loopback port with one counting task per name.
pub async fn start(names: &[&str], interval: Duration) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let mut checkers = Vec::new();
    let mut tasks = Vec::new();
    for name in names {
        let checker = Arc::new(CountingChecker::default());
        tasks.push(PeriodicTask::spawn(*name, interval, checker.clone()).unwrap());
        checkers.push((name.to_string(), checker));
    }

    let registry = Arc::new(TaskRegistry::new(tasks).unwrap());
    let server = CommandServer::bind("127.0.0.1:0".parse().unwrap(), registry.clone())
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let server = tokio::spawn(server.run());

    Harness { addr, registry, checkers, server }
}

/// Poll `condition` until it holds or `timeout` passes.
pub async fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
