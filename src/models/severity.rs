// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Severity tiers and the heuristics assigning them to findings and ports.
//!
//! All functions in here are pure and total. They look at a snapshot of the
//! entity they classify and never fail, so the same input always yields the
//! same tier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Finding, Port};

/// Ordered risk tiers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no security impact
    #[default]
    Info,
    /// Low severity, minimal risk
    Low,
    /// Medium severity, moderate risk
    Medium,
    /// High severity, significant risk
    High,
    /// Critical severity, immediate action required
    Critical,
}

impl Severity {
    /// Lowercase label as used in reports and CLI options.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Well-known service ports. Exposure on anything outside this set biases
/// the severity of a port upwards.
pub const COMMON_PORTS: &[u16] = &[
    20, 21, 22, 23, 25, 53, 67, 68, 69, 80, 110, 111, 123, 137, 138, 139, 143, 161, 162, 389, 443,
    445, 465, 514, 587, 993, 995, 1080, 1194, 1433, 1521, 2049, 2375, 2376, 3000, 3128, 3306,
    3389, 4000, 4444, 5000, 5432, 5601, 5900, 5985, 5986, 6379, 6443, 6667, 8000, 8001, 8008,
    8080, 8081, 8443, 9000, 9200, 9300, 10000,
];

/// Service names historically associated with higher exploitation risk.
/// Matched case-insensitively as substrings of the reported service name.
pub const RISKY_SERVICES: &[&str] = &[
    "rdp", "smb", "mssql", "mysql", "postgresql", "ssh", "telnet", "vnc", "ftp", "http", "https",
    "ldap", "winrm", "elastic", "redis",
];

/// Whether the port number is in the well-known set.
pub fn is_common_port(port: u16) -> bool {
    COMMON_PORTS.contains(&port)
}

/// Classifies a single finding from its own text.
///
/// Anything mentioning a CVE or "critical" is High, the softer vulnerability
/// keywords are Medium, everything else is informational.
pub fn classify_finding(finding: &Finding) -> Severity {
    let text = format!(
        "{} {}",
        finding.output.to_lowercase(),
        finding.id.to_lowercase()
    );
    if text.contains("cve-") || text.contains("critical") {
        return Severity::High;
    }
    if ["vulnerab", "weak", "insecure"]
        .iter()
        .any(|needle| text.contains(needle))
    {
        return Severity::Medium;
    }
    Severity::Info
}

/// Classifies a port from its number, service name and findings.
///
/// Escalation only, the maximum tier reached wins. A finding mentioning a
/// CVE or "critical" short-circuits to High.
pub fn classify_port(port: &Port) -> Severity {
    let mut severity = Severity::Info;
    if !is_common_port(port.port) {
        severity = Severity::Low;
    }
    let service_name = port
        .service
        .as_ref()
        .map(|service| service.name.to_lowercase())
        .unwrap_or_else(|| "unknown".to_string());
    if RISKY_SERVICES
        .iter()
        .any(|risky| service_name.contains(risky))
    {
        severity = severity.max(Severity::Medium);
    }
    for finding in &port.findings {
        let output = finding.output.to_lowercase();
        if ["cve-", "vulnerab", "critical"]
            .iter()
            .any(|needle| output.contains(needle))
        {
            return Severity::High;
        }
        if output.contains("weak") || output.contains("insecure") {
            severity = severity.max(Severity::Medium);
        }
    }
    severity
}

/// Numeric weight of a port.
///
/// Monotonic in severity; an uncommon port number and the presence of
/// findings add a small constant on top.
pub fn risk_score(port: &Port) -> u32 {
    let mut score = match port.severity {
        Severity::Info => 0,
        Severity::Low => 2,
        Severity::Medium => 5,
        Severity::High => 8,
        Severity::Critical => 10,
    };
    if !is_common_port(port.port) {
        score += 1;
    }
    if !port.findings.is_empty() {
        score += 2;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Service;

    fn port(number: u16, service: Option<&str>, outputs: &[&str]) -> Port {
        Port {
            port: number,
            protocol: "tcp".to_string(),
            state: "open".to_string(),
            service: service.map(|name| Service {
                name: name.to_string(),
                ..Default::default()
            }),
            findings: outputs
                .iter()
                .map(|output| Finding::new("test".to_string(), output.to_string()))
                .collect(),
            severity: Severity::Info,
            risk_score: 0,
        }
    }

    #[test]
    fn ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(Severity::Low > Severity::Info);
    }

    #[test]
    fn finding_cve_is_high() {
        let finding = Finding::new(
            "http-check".to_string(),
            "matches CVE-2021-1234".to_string(),
        );
        assert_eq!(finding.severity, Severity::High);
        let finding = Finding::new("critical-check".to_string(), "".to_string());
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn finding_keywords_are_medium() {
        for output in ["vulnerable cipher", "weak key exchange", "insecure renegotiation"] {
            let finding = Finding::new("ssl-check".to_string(), output.to_string());
            assert_eq!(finding.severity, Severity::Medium, "{output}");
        }
    }

    #[test]
    fn finding_default_is_info() {
        let finding = Finding::new("banner".to_string(), "Apache httpd 2.4".to_string());
        assert_eq!(finding.severity, Severity::Info);
    }

    #[test]
    fn uncommon_port_is_low() {
        assert_eq!(classify_port(&port(9999, None, &[])), Severity::Low);
        assert_eq!(classify_port(&port(123, None, &[])), Severity::Info);
    }

    #[test]
    fn risky_service_escalates_to_medium() {
        assert_eq!(classify_port(&port(22, Some("ssh"), &[])), Severity::Medium);
        // substring match covers variants like ssl/https
        assert_eq!(
            classify_port(&port(8443, Some("ssl/https"), &[])),
            Severity::Medium
        );
    }

    #[test]
    fn cve_finding_wins_outright() {
        let p = port(80, Some("http"), &["CVE-2021-1234 exposure"]);
        assert_eq!(classify_port(&p), Severity::High);
    }

    #[test]
    fn weak_finding_escalates() {
        let p = port(12345, None, &["weak cipher"]);
        assert_eq!(classify_port(&p), Severity::Medium);
    }

    #[test]
    fn risk_is_monotonic_in_severity() {
        let mut p = port(80, None, &[]);
        let mut previous = 0;
        for severity in [
            Severity::Info,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ] {
            p.severity = severity;
            let score = risk_score(&p);
            assert!(
                severity == Severity::Info || score > previous,
                "{severity} must outweigh the previous tier"
            );
            previous = score;
        }
    }

    #[test]
    fn risk_bonuses() {
        let mut common = port(80, None, &[]);
        common.severity = Severity::Medium;
        let mut uncommon = port(9999, None, &[]);
        uncommon.severity = Severity::Medium;
        assert!(risk_score(&uncommon) > risk_score(&common));

        let mut with_findings = port(80, None, &["banner"]);
        with_findings.severity = Severity::Medium;
        assert!(risk_score(&with_findings) > risk_score(&common));
    }
}
