use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::PeriodicTask;
use crate::config::ProbesConfig;
use crate::error::TaskError;
use crate::monitoring::{Checker, DnsChecker, HttpChecker, PingChecker};

pub const PING: &str = "PING";
pub const HTTP: &str = "HTTP";
pub const HTTPS: &str = "HTTPS";
pub const DNS: &str = "DNS";

/// Every target name a default registry can contain.
pub const KNOWN_TARGETS: [&str; 4] = [PING, HTTP, HTTPS, DNS];

/// Fixed set of named tasks, immutable once built.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<String, PeriodicTask>,
}

impl TaskRegistry {
    /// Build a registry from already started tasks.
    ///
    /// A duplicate name is an error; every task handed in is stopped in that case.
    pub fn new(tasks: impl IntoIterator<Item = PeriodicTask>) -> Result<Self, TaskError> {
        let mut map = BTreeMap::new();
        for task in tasks {
            let name = task.name().to_string();
            if map.insert(name.clone(), task).is_some() {
                return Err(TaskError::DuplicateTask(name));
            }
        }
        Ok(Self { tasks: map })
    }

    /// Start one task per enabled probe kind.
    pub fn from_config(config: &ProbesConfig) -> Result<Self, TaskError> {
        let mut tasks = Vec::new();

        if config.ping.enabled {
            let checker = PingChecker::new(&config.ping.host, config.ping.timeout())
                .map_err(|e| probe_error(PING, e))?;
            tasks.push(spawn(PING, config.ping.interval(), checker)?);
        }

        if config.http.enabled {
            let checker = HttpChecker::new(&config.http.url, config.http.timeout(), None)
                .map_err(|e| probe_error(HTTP, e))?;
            tasks.push(spawn(HTTP, config.http.interval(), checker)?);
        }

        if config.https.enabled {
            let checker = HttpChecker::new(
                &config.https.url,
                config.https.timeout(),
                Some(&config.https.user_agent),
            )
            .map_err(|e| probe_error(HTTPS, e))?;
            tasks.push(spawn(HTTPS, config.https.interval(), checker)?);
        }

        if config.dns.enabled {
            let server = config.dns.server_addr().map_err(|e| probe_error(DNS, e))?;
            let queries = config.dns.parsed_queries().map_err(|e| probe_error(DNS, e))?;
            let checker = DnsChecker::new(server, queries, config.dns.timeout())
                .map_err(|e| probe_error(DNS, e))?;
            tasks.push(spawn(DNS, config.dns.interval(), checker)?);
        }

        if tasks.is_empty() {
            warn!("Every probe is disabled, the registry is empty");
        }

        Self::new(tasks)
    }

    /// Look a task up by its target name, case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<&PeriodicTask> {
        self.tasks.get(name).or_else(|| self.tasks.get(&name.to_ascii_uppercase()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodicTask> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn stop_all(&self) {
        for task in self.tasks.values() {
            task.stop();
        }
    }

    /// Join every task thread, reporting the first panic after joining all.
    pub fn join_all(&self) -> Result<(), TaskError> {
        let mut first_error = None;
        for task in self.tasks.values() {
            if let Err(e) = task.join() {
                warn!(task = %task.name(), "Task thread ended abnormally");
                first_error.get_or_insert(e);
            }
        }
        info!(tasks = self.tasks.len(), "All task threads joined");
        first_error.map_or(Ok(()), Err)
    }
}

fn spawn(
    name: &str,
    interval: Duration,
    checker: impl Checker + 'static,
) -> Result<PeriodicTask, TaskError> {
    PeriodicTask::spawn(name, interval, Arc::new(checker))
}

fn probe_error(name: &str, reason: impl std::fmt::Display) -> TaskError {
    TaskError::Probe { name: name.to_string(), reason: reason.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::{ProbeError, Reading};
    use crate::task::TaskState;

    struct Idle;

    #[async_trait::async_trait]
    impl Checker for Idle {
        fn target(&self) -> &str {
            "idle"
        }

        async fn check(&self) -> Result<Reading, ProbeError> {
            Ok(Reading::new(0))
        }
    }

    fn idle_task(name: &str) -> PeriodicTask {
        PeriodicTask::spawn(name, Duration::from_secs(60), Arc::new(Idle)).unwrap()
    }

    #[test]
    fn test_lookup_by_name() {
        let registry = TaskRegistry::new([idle_task(PING), idle_task(HTTP)]).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![HTTP, PING]);
        assert_eq!(registry.lookup("PING").map(PeriodicTask::name), Some(PING));
        assert_eq!(registry.lookup("http").map(PeriodicTask::name), Some(HTTP));
        assert!(registry.lookup("DNS").is_none());
        assert!(registry.lookup("FOO").is_none());

        registry.stop_all();
        registry.join_all().unwrap();
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let result = TaskRegistry::new([idle_task("dns"), idle_task("DNS")]);
        assert!(matches!(result, Err(TaskError::DuplicateTask(name)) if name == DNS));
    }

    #[test]
    fn test_stop_all_reaches_every_task() {
        let registry =
            TaskRegistry::new(KNOWN_TARGETS.iter().map(|name| idle_task(name))).unwrap();
        registry.lookup(HTTPS).unwrap().pause();

        registry.stop_all();
        registry.join_all().unwrap();

        assert!(registry.iter().all(|task| task.state() == TaskState::Stopped));
        assert!(registry.iter().all(PeriodicTask::is_finished));
    }

    #[test]
    fn test_from_config_skips_disabled_probes() {
        let mut config = ProbesConfig::default();
        config.ping.enabled = false;
        config.http.enabled = false;
        config.https.enabled = false;
        config.dns.interval_secs = 3600;
        config.dns.timeout_secs = 1;
        config.dns.server = "127.0.0.1:9".into();

        let registry = TaskRegistry::from_config(&config).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![DNS]);

        registry.stop_all();
        registry.join_all().unwrap();
    }

    #[test]
    fn test_from_config_reports_bad_probe() {
        let mut config = ProbesConfig::default();
        config.http.url = "not a url".into();
        config.ping.enabled = false;
        config.https.enabled = false;
        config.dns.enabled = false;

        let result = TaskRegistry::from_config(&config);
        assert!(matches!(result, Err(TaskError::Probe { name, .. }) if name == HTTP));
    }

    #[test]
    fn test_from_config_with_everything_disabled_is_empty() {
        let mut config = ProbesConfig::default();
        config.ping.enabled = false;
        config.http.enabled = false;
        config.https.enabled = false;
        config.dns.enabled = false;

        let registry = TaskRegistry::from_config(&config).unwrap();
        assert!(registry.is_empty());
        registry.join_all().unwrap();
    }
}
