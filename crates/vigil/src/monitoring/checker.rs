use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use url::Url;

use super::types::FailureKind;

/// What a successful check observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reading {
    pub latency_ms: u64,
    pub status_code: Option<u16>,
    pub detail: Option<String>,
}

impl Reading {
    pub fn new(latency_ms: u64) -> Self {
        Self { latency_ms, ..Self::default() }
    }
}

/// Classified failure of a single check
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("server answered with status code {0}")]
    Status(u16),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Process(String),
    #[error("resolution failed: {0}")]
    Resolve(String),
    #[error("no records found for {0}")]
    NoRecords(String),
    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeError::Status(_) => FailureKind::Status,
            ProbeError::Connection(_) => FailureKind::Connection,
            ProbeError::Timeout(_) => FailureKind::Timeout,
            ProbeError::Process(_) => FailureKind::Process,
            ProbeError::Resolve(_) => FailureKind::Resolve,
            ProbeError::NoRecords(_) => FailureKind::NoRecords,
            ProbeError::Other(_) => FailureKind::Other,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ProbeError::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// One bounded network operation, run once per task cycle.
///
/// Implementations must not block indefinitely; every built-in checker
/// carries its own timeout.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// The host, URL or server being checked
    fn target(&self) -> &str;

    /// Perform the check once
    async fn check(&self) -> Result<Reading, ProbeError>;
}

pub(super) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// HTTP/HTTPS checker
pub struct HttpChecker {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpChecker {
    pub fn new(url: &str, timeout: Duration, user_agent: Option<&str>) -> Result<Self> {
        let parsed = Url::parse(url).map_err(|e| anyhow!("Invalid URL {}: {}", url, e))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(anyhow!("Invalid scheme for HTTP check: {}", other)),
        }

        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }

        Ok(Self { client: builder.build()?, url: url.to_string(), timeout })
    }

    fn classify(&self, error: reqwest::Error) -> ProbeError {
        if error.is_timeout() {
            ProbeError::Timeout(self.timeout)
        } else if error.is_connect() {
            ProbeError::Connection(error.to_string())
        } else {
            ProbeError::Other(error.to_string())
        }
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    fn target(&self) -> &str {
        &self.url
    }

    async fn check(&self) -> Result<Reading, ProbeError> {
        let start = Instant::now();

        let response =
            self.client.get(&self.url).send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        // Anything below 400 means the server is up, redirects included
        if status.as_u16() >= 400 {
            return Err(ProbeError::Status(status.as_u16()));
        }

        Ok(Reading {
            latency_ms: elapsed_ms(start),
            status_code: Some(status.as_u16()),
            detail: status.canonical_reason().map(str::to_string),
        })
    }
}

/// Reachability checker, shells out to the system `ping`
pub struct PingChecker {
    host: String,
    timeout: Duration,
}

impl PingChecker {
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() || host.starts_with('-') || host.contains(char::is_whitespace) {
            return Err(anyhow!("Invalid ping host: {:?}", host));
        }
        Ok(Self { host: host.to_string(), timeout })
    }

    fn count_flag() -> &'static str {
        if cfg!(windows) { "-n" } else { "-c" }
    }
}

/// Last non-empty line of the ping output, usually the round-trip summary.
fn summary_line(output: &str) -> Option<String> {
    output.lines().map(str::trim).filter(|line| !line.is_empty()).last().map(str::to_string)
}

#[async_trait::async_trait]
impl Checker for PingChecker {
    fn target(&self) -> &str {
        &self.host
    }

    async fn check(&self) -> Result<Reading, ProbeError> {
        let start = Instant::now();

        let mut command = Command::new("ping");
        command
            .args([Self::count_flag(), "1", self.host.as_str()])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))?
            .map_err(|e| ProbeError::Process(format!("failed to run ping: {e}")))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(Reading { detail: summary_line(&text), ..Reading::new(elapsed_ms(start)) })
        } else {
            Err(ProbeError::Process(format!(
                "ping request failed ({}): {}",
                output.status,
                summary_line(&text).unwrap_or_default()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_checker_rejects_bad_urls() {
        assert!(HttpChecker::new("not a url", Duration::from_secs(1), None).is_err());
        assert!(HttpChecker::new("ftp://example.com", Duration::from_secs(1), None).is_err());
        assert!(HttpChecker::new("https://example.com", Duration::from_secs(1), Some("ua")).is_ok());
    }

    #[test]
    fn test_ping_checker_rejects_option_like_hosts() {
        assert!(PingChecker::new("-f", Duration::from_secs(1)).is_err());
        assert!(PingChecker::new("", Duration::from_secs(1)).is_err());
        assert!(PingChecker::new("a b", Duration::from_secs(1)).is_err());
        assert_eq!(PingChecker::new(" 8.8.8.8 ", Duration::from_secs(1)).unwrap().target(), "8.8.8.8");
    }

    #[test]
    fn test_summary_line() {
        let output = "PING 8.8.8.8\n64 bytes from 8.8.8.8\n\nrtt min/avg/max = 1/2/3 ms\n\n";
        assert_eq!(summary_line(output).as_deref(), Some("rtt min/avg/max = 1/2/3 ms"));
        assert_eq!(summary_line("  \n"), None);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(ProbeError::Status(503).kind(), FailureKind::Status);
        assert_eq!(ProbeError::Status(503).status_code(), Some(503));
        assert_eq!(ProbeError::Timeout(Duration::from_secs(5)).kind(), FailureKind::Timeout);
        assert_eq!(ProbeError::Connection("refused".into()).status_code(), None);
    }

    #[tokio::test]
    async fn test_http_checker_reports_connection_error() {
        // Port 9 on loopback has nothing listening
        let checker = HttpChecker::new("http://127.0.0.1:9/", Duration::from_secs(2), None).unwrap();
        let err = checker.check().await.unwrap_err();
        assert!(matches!(err.kind(), FailureKind::Connection | FailureKind::Other | FailureKind::Timeout));
    }
}
