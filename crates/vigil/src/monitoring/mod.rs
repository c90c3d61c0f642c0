/// Monitoring module - the check functions driven by periodic tasks
///
/// This module is responsible for:
/// - Executing PING/HTTP/HTTPS/DNS checks
/// - Classifying failures into a single result type
/// - Reporting each outcome to the console
pub mod checker;
pub mod dns;
pub mod executor;
pub mod types;

pub use checker::{Checker, HttpChecker, PingChecker, ProbeError, Reading};
pub use dns::DnsChecker;
pub use executor::{execute_check, report};
pub use types::{CheckResult, FailureKind, MonitorStatus};
