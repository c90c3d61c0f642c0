use tracing::{info, warn};

use super::checker::Checker;
use super::types::CheckResult;

/// Run `checker` once and fold the outcome into a [`CheckResult`].
pub async fn execute_check(probe: &str, checker: &dyn Checker) -> CheckResult {
    let result = CheckResult::new(probe, checker.target());

    match checker.check().await {
        Ok(reading) => result
            .success(reading.latency_ms, reading.status_code)
            .with_detail(reading.detail),
        Err(error) => {
            let result = match error.status_code() {
                Some(code) => result.with_status_code(code),
                None => result,
            };
            result.failure(error.kind(), error.to_string())
        }
    }
}

/// Emit the console-visible line for a finished check.
pub fn report(result: &CheckResult) {
    match &result.failure {
        None => info!(
            probe = %result.probe,
            detail = result.detail.as_deref().unwrap_or(""),
            "{result}"
        ),
        Some((kind, _)) => warn!(probe = %result.probe, kind = %kind, "{result}"),
    }
}
