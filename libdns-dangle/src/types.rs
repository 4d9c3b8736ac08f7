use serde::Serialize;
use std::{fmt, net::Ipv4Addr, time::Duration};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Resolved { ip_addresses: Vec<Ipv4Addr> },
    Unresolved,
}

impl ResolutionResult {
    /// An empty answer counts as a failed resolution.
    pub fn from_addresses(ip_addresses: Vec<Ipv4Addr>) -> Self {
        if ip_addresses.is_empty() {
            ResolutionResult::Unresolved
        } else {
            ResolutionResult::Resolved { ip_addresses }
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionResult::Resolved { .. })
    }

    pub fn label(&self) -> String {
        match self {
            ResolutionResult::Resolved { ip_addresses } => ip_addresses
                .iter()
                .map(|ip| ip.to_string())
                .collect::<Vec<_>>()
                .join("; "),
            ResolutionResult::Unresolved => "No".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn url_for(&self, host: &str) -> String {
        format!("{}://{}", self.as_str(), host)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => f.write_str("HTTP"),
            Scheme::Https => f.write_str("HTTPS"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    HttpStatus {
        code: u16,
        elapsed: Duration,
        server: Option<String>,
    },
    ConnectionRefused(Scheme),
    Timeout(Scheme),
    NoResponse,
}

impl ProbeOutcome {
    /// Any HTTP status, 4xx and 5xx included, means something answered.
    pub fn is_response(&self) -> bool {
        matches!(self, ProbeOutcome::HttpStatus { .. })
    }

    pub fn is_unreachable(&self) -> bool {
        !self.is_response()
    }

    pub fn label(&self) -> String {
        match self {
            ProbeOutcome::HttpStatus { code, .. } => code.to_string(),
            ProbeOutcome::ConnectionRefused(scheme) => format!("Connection Refused ({})", scheme),
            ProbeOutcome::Timeout(scheme) => format!("Timeout ({})", scheme),
            ProbeOutcome::NoResponse => "No Response".to_string(),
        }
    }

    pub fn response_time_label(&self) -> String {
        match self {
            ProbeOutcome::HttpStatus { elapsed, .. } => format!("{:.2}s", elapsed.as_secs_f64()),
            _ => "N/A".to_string(),
        }
    }

    pub fn server_label(&self) -> String {
        match self {
            ProbeOutcome::HttpStatus { server: Some(server), .. } => server.clone(),
            _ => "Unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Active,
    PossibleDanglingDns,
    DnsError,
    Error,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Active => "Active",
            Verdict::PossibleDanglingDns => "Possible Dangling DNS",
            Verdict::DnsError => "DNS Error",
            Verdict::Error => "Error",
        }
    }

    pub fn is_dangling(&self) -> bool {
        matches!(self, Verdict::PossibleDanglingDns)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub host: String,
    pub outcome_label: String,
    pub dns_label: String,
    pub response_time_label: String,
    pub server_info_label: String,
    pub verdict: Verdict,
}

impl StatusRecord {
    /// Record for a host whose pipeline failed unexpectedly.
    pub fn error(host: &str, description: impl Into<String>) -> Self {
        Self {
            host: host.to_string(),
            outcome_label: "Error".to_string(),
            dns_label: "Error".to_string(),
            response_time_label: "N/A".to_string(),
            server_info_label: description.into(),
            verdict: Verdict::Error,
        }
    }

    pub fn to_row(&self) -> [&str; 6] {
        [
            self.host.as_str(),
            self.outcome_label.as_str(),
            self.dns_label.as_str(),
            self.response_time_label.as_str(),
            self.server_info_label.as_str(),
            self.verdict.label(),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub workers: usize,
    pub timeout: Duration,
    pub dns_timeout: Duration,
    pub get_fallback: bool,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            timeout: Duration::from_secs(15),
            dns_timeout: Duration::from_secs(5),
            get_fallback: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_answer_is_unresolved() {
        assert_eq!(ResolutionResult::from_addresses(vec![]), ResolutionResult::Unresolved);
    }

    #[test]
    fn dns_label_joins_addresses() {
        let resolved = ResolutionResult::from_addresses(vec![
            Ipv4Addr::new(192, 0, 2, 1),
            Ipv4Addr::new(192, 0, 2, 7),
        ]);
        assert_eq!(resolved.label(), "192.0.2.1; 192.0.2.7");
        assert_eq!(ResolutionResult::Unresolved.label(), "No");
    }

    #[test]
    fn outcome_labels() {
        let ok = ProbeOutcome::HttpStatus {
            code: 503,
            elapsed: Duration::from_millis(1234),
            server: None,
        };
        assert_eq!(ok.label(), "503");
        assert_eq!(ok.response_time_label(), "1.23s");
        assert_eq!(ok.server_label(), "Unknown");

        let refused = ProbeOutcome::ConnectionRefused(Scheme::Https);
        assert_eq!(refused.label(), "Connection Refused (HTTPS)");
        assert_eq!(refused.response_time_label(), "N/A");
        assert_eq!(ProbeOutcome::Timeout(Scheme::Http).label(), "Timeout (HTTP)");
        assert_eq!(ProbeOutcome::NoResponse.label(), "No Response");
    }

    #[test]
    fn only_possible_dangling_is_dangling() {
        assert!(Verdict::PossibleDanglingDns.is_dangling());
        for verdict in [Verdict::Active, Verdict::DnsError, Verdict::Error] {
            assert!(!verdict.is_dangling(), "{verdict}");
        }
    }

    #[test]
    fn error_record_row() {
        let record = StatusRecord::error("a.example.com", "worker crashed");
        assert_eq!(
            record.to_row(),
            ["a.example.com", "Error", "Error", "N/A", "worker crashed", "Error"]
        );
    }
}
