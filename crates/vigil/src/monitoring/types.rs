use std::fmt;
use std::time::SystemTime;

/// Status of a monitoring check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Up,
    Down,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
        }
    }
}

/// Classification of a failed check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The target answered with an error status code.
    Status,
    Connection,
    Timeout,
    /// The external command ran but reported failure.
    Process,
    Resolve,
    NoRecords,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Status => "bad status",
            FailureKind::Connection => "connection error",
            FailureKind::Timeout => "timeout",
            FailureKind::Process => "process failure",
            FailureKind::Resolve => "resolution failure",
            FailureKind::NoRecords => "no records",
            FailureKind::Other => "error",
        };
        f.write_str(label)
    }
}

/// Result of a monitoring check
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the task that ran the check
    pub probe: String,

    /// URL, host or nameserver that was checked
    pub target: String,

    /// Timestamp when the check was performed
    pub timestamp: SystemTime,

    pub status: MonitorStatus,

    /// Response time in milliseconds
    pub latency_ms: Option<u64>,

    /// HTTP status code (if applicable)
    pub status_code: Option<u16>,

    /// Free-form output of the check, e.g. the ping summary or DNS answers
    pub detail: Option<String>,

    /// Why the check failed (if it did)
    pub failure: Option<(FailureKind, String)>,
}

impl CheckResult {
    /// Create a new check result, initially down until marked otherwise
    pub fn new(probe: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            probe: probe.into(),
            target: target.into(),
            timestamp: SystemTime::now(),
            status: MonitorStatus::Down,
            latency_ms: None,
            status_code: None,
            detail: None,
            failure: None,
        }
    }

    /// Mark the check as successful with latency
    pub fn success(mut self, latency_ms: u64, status_code: Option<u16>) -> Self {
        self.status = MonitorStatus::Up;
        self.latency_ms = Some(latency_ms);
        self.status_code = status_code;
        self
    }

    /// Mark the check as failed
    pub fn failure(mut self, kind: FailureKind, message: impl Into<String>) -> Self {
        self.status = MonitorStatus::Down;
        self.failure = Some((kind, message.into()));
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == MonitorStatus::Up
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} is {}", self.probe, self.target, self.status)?;
        if let Some(code) = self.status_code {
            write!(f, " (status code {code})")?;
        }
        if let Some(latency) = self.latency_ms {
            write!(f, " in {latency}ms")?;
        }
        if let Some((kind, message)) = &self.failure {
            write!(f, ": {kind}: {message}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_success() {
        let result = CheckResult::new("HTTP", "http://example.com").success(42, Some(200));
        assert!(result.is_up());
        assert_eq!(result.to_string(), "HTTP http://example.com is up (status code 200) in 42ms");
    }

    #[test]
    fn test_display_failure() {
        let result = CheckResult::new("HTTPS", "https://example.com")
            .with_status_code(503)
            .failure(FailureKind::Status, "service unavailable");
        assert!(!result.is_up());
        assert_eq!(
            result.to_string(),
            "HTTPS https://example.com is down (status code 503): bad status: service unavailable"
        );
    }
}
