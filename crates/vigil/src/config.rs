use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt, fs, path};

use hickory_resolver::proto::rr::RecordType;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default port of the control socket.
pub const DEFAULT_PORT: u16 = 65432;

/// Default port of a DNS server given without one.
pub const DNS_PORT: u16 = 53;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 \
     Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub probes: ProbesConfig,
    /// Monitoring services reachable from the management console, `id -> host:port`.
    pub services: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    pub ping: PingProbeConfig,
    pub http: HttpProbeConfig,
    pub https: HttpsProbeConfig,
    pub dns: DnsProbeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PingProbeConfig {
    pub enabled: bool,
    pub host: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpProbeConfig {
    pub enabled: bool,
    pub url: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpsProbeConfig {
    pub enabled: bool,
    pub url: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    /// Sent as `User-Agent`; some sites reject requests without a browser-like one.
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsProbeConfig {
    pub enabled: bool,
    /// Nameserver to query, `ip` or `ip:port`.
    pub server: String,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub queries: Vec<DnsQuery>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsQuery {
    pub name: String,
    pub record_type: String,
}

impl DnsQuery {
    pub fn new(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self { name: name.into(), record_type: record_type.into() }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        services.insert("local".to_string(), format!("127.0.0.1:{DEFAULT_PORT}"));

        Self { server: ServerConfig::default(), probes: ProbesConfig::default(), services }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1".into(), port: DEFAULT_PORT }
    }
}

impl Default for PingProbeConfig {
    fn default() -> Self {
        Self { enabled: true, host: "8.8.8.8".into(), interval_secs: 1, timeout_secs: 5 }
    }
}

impl Default for HttpProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://www.google.com".into(),
            interval_secs: 6,
            timeout_secs: 10,
        }
    }
}

impl Default for HttpsProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://www.google.com".into(),
            interval_secs: 6,
            timeout_secs: 5,
            user_agent: BROWSER_USER_AGENT.into(),
        }
    }
}

impl Default for DnsProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            server: "8.8.8.8".into(),
            interval_secs: 6,
            timeout_secs: 5,
            queries: vec![
                DnsQuery::new("example.com", "A"),
                DnsQuery::new("example.com", "AAAA"),
                DnsQuery::new("example.com", "MX"),
            ],
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|_| ConfigError::invalid("server.bind", format!("{} is not an IP", self.bind)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl PingProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl HttpProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl HttpsProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DnsProbeConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Nameserver address, defaulting the port to 53.
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        if let Ok(addr) = self.server.parse::<SocketAddr>() {
            return Ok(addr);
        }
        self.server
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, DNS_PORT))
            .map_err(|_| {
                ConfigError::invalid("probes.dns.server", format!("{} is not an address", self.server))
            })
    }

    /// Queries with their record types parsed.
    pub fn parsed_queries(&self) -> Result<Vec<(String, RecordType)>, ConfigError> {
        self.queries
            .iter()
            .map(|query| {
                let record_type = RecordType::from_str(&query.record_type.to_ascii_uppercase())
                    .map_err(|_| {
                        ConfigError::invalid(
                            "probes.dns.queries",
                            format!("unknown record type {}", query.record_type),
                        )
                    })?;
                Ok((query.name.clone(), record_type))
            })
            .collect()
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/vigil/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Some(config_home) = env::var_os("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::var_os("HOME") {
        path::PathBuf::from(home_dir).join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("vigil/config.toml"))
}

fn ensure_positive(field: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

fn ensure_present(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    Ok(())
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let on_off = |enabled: bool| if enabled { "enabled" } else { "disabled" };

        writeln!(f, "Current Configuration:")?;
        write_title_1(f, "Control Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;

        let ping = &self.probes.ping;
        write_title_1(f, "PING")?;
        write_1(f, "State", &on_off(ping.enabled))?;
        write_1(f, "Host", &ping.host)?;
        write_1(f, "Interval (s)", &ping.interval_secs)?;

        let http = &self.probes.http;
        write_title_1(f, "HTTP")?;
        write_1(f, "State", &on_off(http.enabled))?;
        write_1(f, "URL", &http.url)?;
        write_1(f, "Interval (s)", &http.interval_secs)?;

        let https = &self.probes.https;
        write_title_1(f, "HTTPS")?;
        write_1(f, "State", &on_off(https.enabled))?;
        write_1(f, "URL", &https.url)?;
        write_1(f, "Interval (s)", &https.interval_secs)?;
        write_1(f, "Timeout (s)", &https.timeout_secs)?;

        let dns = &self.probes.dns;
        write_title_1(f, "DNS")?;
        write_1(f, "State", &on_off(dns.enabled))?;
        write_1(f, "Server", &dns.server)?;
        write_1(f, "Interval (s)", &dns.interval_secs)?;
        write_1(f, "Queries", &dns.queries.len())?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/vigil/config.toml
    ///  or the specified path if one does not exist
    ///
    /// ```no_run
    /// let cfg = vigil::config::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), vigil::error::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(ConfigError::ReadFailed)?;
            toml::from_str(raw_string.as_str())?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        fs::write(path, config_str).map_err(ConfigError::WriteFailed)
    }

    /// Reject values the probes and the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        let ping = &self.probes.ping;
        ensure_present("probes.ping.host", &ping.host)?;
        ensure_positive("probes.ping.interval_secs", ping.interval_secs)?;
        ensure_positive("probes.ping.timeout_secs", ping.timeout_secs)?;

        let http = &self.probes.http;
        ensure_present("probes.http.url", &http.url)?;
        ensure_positive("probes.http.interval_secs", http.interval_secs)?;
        ensure_positive("probes.http.timeout_secs", http.timeout_secs)?;

        let https = &self.probes.https;
        ensure_present("probes.https.url", &https.url)?;
        ensure_positive("probes.https.interval_secs", https.interval_secs)?;
        ensure_positive("probes.https.timeout_secs", https.timeout_secs)?;

        let dns = &self.probes.dns;
        dns.server_addr()?;
        ensure_positive("probes.dns.interval_secs", dns.interval_secs)?;
        ensure_positive("probes.dns.timeout_secs", dns.timeout_secs)?;
        if dns.enabled && dns.queries.is_empty() {
            return Err(ConfigError::invalid("probes.dns.queries", "must not be empty"));
        }
        dns.parsed_queries()?;

        for (id, address) in &self.services {
            if address.parse::<SocketAddr>().is_err() && !address.contains(':') {
                return Err(ConfigError::invalid(
                    format!("services.{id}"),
                    format!("{address} is not host:port"),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/vigil.toml");

        let config = Config::from_config(Some(&path)).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = Config::from_config(Some(&path)).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_extension_is_normalized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.conf");

        Config::from_config(Some(&path)).unwrap();

        assert!(dir.path().join("settings.toml").exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[server]
port = 7000

[probes.dns]
server = "1.1.1.1:5353"
queries = [{ name = "example.org", record_type = "txt" }]
"#,
        )
        .unwrap();

        let config = Config::from_config(Some(&path)).unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.probes.ping, PingProbeConfig::default());
        let expected: SocketAddr = "1.1.1.1:5353".parse().unwrap();
        assert_eq!(config.probes.dns.server_addr().unwrap(), expected);
        assert_eq!(
            config.probes.dns.parsed_queries().unwrap(),
            vec![("example.org".to_string(), RecordType::TXT)]
        );
    }

    #[test]
    fn test_dns_server_defaults_port() {
        let dns = DnsProbeConfig { server: "9.9.9.9".into(), ..DnsProbeConfig::default() };
        assert_eq!(dns.server_addr().unwrap(), SocketAddr::from(([9, 9, 9, 9], DNS_PORT)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.probes.ping.interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));

        let mut config = Config::default();
        config.server.bind = "not-an-ip".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.probes.dns.queries = vec![DnsQuery::new("example.com", "BOGUS")];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.probes.https.url = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nport = ").unwrap();

        assert!(matches!(Config::from_config(Some(&path)), Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn test_display_lists_every_probe() {
        let rendered = Config::default().to_string();
        for section in ["Control Server", "PING", "HTTP", "HTTPS", "DNS"] {
            assert!(rendered.contains(section), "missing {section}");
        }
    }
}
