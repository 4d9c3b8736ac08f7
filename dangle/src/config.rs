use libdns_dangle::{ScanConfig, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

pub const DEFAULT_OUTPUT: &str = "subdomain_status.csv";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanSection {
    pub workers: usize,
    pub timeout_secs: u64,
    pub dns_timeout_secs: u64,
    pub get_fallback: bool,
    pub user_agent: String,
}

impl Default for ScanSection {
    fn default() -> Self {
        let defaults = ScanConfig::default();
        Self {
            workers: defaults.workers,
            timeout_secs: defaults.timeout.as_secs(),
            dns_timeout_secs: defaults.dns_timeout.as_secs(),
            get_fallback: defaults.get_fallback,
            user_agent: defaults.user_agent,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSection {
    pub path: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT),
        }
    }
}

impl Config {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            workers: self.scan.workers.max(1),
            timeout: Duration::from_secs(self.scan.timeout_secs.max(1)),
            dns_timeout: Duration::from_secs(self.scan.dns_timeout_secs.max(1)),
            get_fallback: self.scan.get_fallback,
            user_agent: self.scan.user_agent.clone(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("dangle").join("config.toml"))
}

pub fn load_config() -> Config {
    config_path()
        .and_then(|path| std::fs::read_to_string(&path).ok())
        .and_then(|content| parse_config(&content))
        .unwrap_or_default()
}

pub fn parse_config(content: &str) -> Option<Config> {
    toml::from_str(content).ok()
}

pub fn get_default_config_toml() -> String {
    format!(
        r#"# Dangling DNS scanner (dangle) configuration

[scan]
# Concurrent hosts in flight
workers = 20

# Per-request timeout for every HTTP/HTTPS attempt
timeout_secs = 15

# Upper bound for a single A-record lookup
dns_timeout_secs = 5

# Retry with GET when HEAD fails
get_fallback = true

user_agent = "{}"

[output]
path = "{}"
"#,
        DEFAULT_USER_AGENT, DEFAULT_OUTPUT
    )
}
