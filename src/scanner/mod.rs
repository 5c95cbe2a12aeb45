// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Invocation of the external nmap process.
//!
//! The core never blocks on I/O; this module is the boundary that does. It
//! builds the command line for a scan profile, waits for the process with a
//! timeout and hands the XML output to the parser.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use tokio::process::Command;
use tokio::time::timeout;

use crate::models::ScanResult;
use crate::parser::{self, ParseError};
use crate::summary::{summarize, Summary};

const SCAN_TIMEOUT: Duration = Duration::from_secs(300);
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Scan profiles mapped to nmap argument sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanType {
    /// Version detection plus default scripts
    #[default]
    Basic,
    /// Version detection plus the vuln script category
    Vuln,
    /// Aggressive scan
    Aggressive,
}

impl ScanType {
    fn arguments(&self) -> &'static [&'static str] {
        match self {
            ScanType::Basic => &["-sV", "-sC"],
            ScanType::Vuln => &["-sV", "--script=vuln"],
            ScanType::Aggressive => &["-A"],
        }
    }

    /// Lowercase label as used on the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Basic => "basic",
            ScanType::Vuln => "vuln",
            ScanType::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "basic" => Ok(ScanType::Basic),
            "vuln" => Ok(ScanType::Vuln),
            "aggressive" => Ok(ScanType::Aggressive),
            _ => Err(format!("unknown scan type: {s}")),
        }
    }
}

/// Failure while driving a scan or asking for its outcome.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// nmap could not be found or did not respond to a version probe
    #[error("nmap is not installed or not in PATH")]
    NotInstalled,
    /// The scan exceeded the timeout
    #[error("scan timed out after {} seconds", SCAN_TIMEOUT.as_secs())]
    Timeout,
    /// nmap exited nonzero
    #[error("nmap scan failed: {0}")]
    Failed(String),
    /// The process could not be spawned or awaited
    #[error("unable to run nmap: {0}")]
    Io(#[from] std::io::Error),
    /// The scan output could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A summary was requested before any scan or parse
    #[error("no scan results available")]
    NoResults,
}

/// Wrapper for nmap scanning operations.
///
/// Keeps the last parsed result so summaries and reports can be derived
/// without re-running the scan.
#[derive(Debug, Default)]
pub struct NmapScanner {
    binary: Option<PathBuf>,
    last_result: Option<ScanResult>,
}

impl NmapScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an explicit nmap binary instead of resolving via PATH.
    pub fn with_binary(path: PathBuf) -> Self {
        NmapScanner {
            binary: Some(path),
            last_result: None,
        }
    }

    fn binary(&self) -> &Path {
        self.binary.as_deref().unwrap_or(Path::new("nmap"))
    }

    /// Verifies nmap is available on the system.
    pub async fn check_installed(&self) -> bool {
        let probe = Command::new(self.binary()).arg("--version").output();
        match timeout(VERSION_CHECK_TIMEOUT, probe).await {
            Ok(Ok(output)) => output.status.success(),
            _ => false,
        }
    }

    fn arguments(target: &str, scan_type: ScanType, ports: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = scan_type
            .arguments()
            .iter()
            .map(|arg| arg.to_string())
            .collect();
        if let Some(ports) = ports {
            args.push("-p".to_string());
            args.push(ports.to_string());
        }
        // XML to stdout for parsing
        args.push("-oX".to_string());
        args.push("-".to_string());
        args.push(target.to_string());
        args
    }

    /// Executes an nmap scan and parses its XML output.
    pub async fn scan_target(
        &mut self,
        target: &str,
        scan_type: ScanType,
        ports: Option<&str>,
    ) -> Result<&ScanResult, Error> {
        if !self.check_installed().await {
            return Err(Error::NotInstalled);
        }
        let args = Self::arguments(target, scan_type, ports);
        tracing::debug!(?args, "starting nmap");
        let output = timeout(SCAN_TIMEOUT, Command::new(self.binary()).args(&args).output())
            .await
            .map_err(|_| Error::Timeout)??;
        if !output.status.success() {
            return Err(Error::Failed(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        let scan_time = Local::now().format(TIME_FORMAT).to_string();
        let result = parser::parse_report(output.stdout.as_slice(), target, &scan_time)?;
        tracing::info!(
            hosts = result.hosts.len(),
            total_risk = result.total_risk,
            "scan finished"
        );
        Ok(&*self.last_result.insert(result))
    }

    /// Parses an existing nmap XML report, `.gz` accepted, for offline
    /// analysis. The label defaults to "offline" when no target is given.
    pub fn parse_file(
        &mut self,
        path: &Path,
        target: Option<&str>,
    ) -> Result<&ScanResult, Error> {
        let scan_time = Local::now().format(TIME_FORMAT).to_string();
        let result = parser::parse_file(path, target.unwrap_or("offline"), &scan_time)?;
        Ok(&*self.last_result.insert(result))
    }

    /// The last parsed result, if any.
    pub fn last_result(&self) -> Option<&ScanResult> {
        self.last_result.as_ref()
    }

    /// Mutable access for in-place filtering and sorting.
    pub fn last_result_mut(&mut self) -> Option<&mut ScanResult> {
        self.last_result.as_mut()
    }

    /// Summary of the last scan.
    ///
    /// Asking before any scan or parse is a usage error.
    pub fn summary(&self) -> Result<Summary, Error> {
        self.last_result
            .as_ref()
            .map(summarize)
            .ok_or(Error::NoResults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_scan_arguments() {
        assert_eq!(
            NmapScanner::arguments("192.0.2.10", ScanType::Basic, None),
            vec!["-sV", "-sC", "-oX", "-", "192.0.2.10"]
        );
    }

    #[test]
    fn vuln_scan_arguments_with_ports() {
        assert_eq!(
            NmapScanner::arguments("192.0.2.10", ScanType::Vuln, Some("80,443")),
            vec!["-sV", "--script=vuln", "-p", "80,443", "-oX", "-", "192.0.2.10"]
        );
    }

    #[test]
    fn aggressive_scan_arguments() {
        assert_eq!(
            NmapScanner::arguments("example.com", ScanType::Aggressive, Some("1-1000")),
            vec!["-A", "-p", "1-1000", "-oX", "-", "example.com"]
        );
    }

    #[test]
    fn summary_before_scan_is_a_usage_error() {
        let scanner = NmapScanner::new();
        assert!(matches!(scanner.summary(), Err(Error::NoResults)));
    }

    #[test]
    fn summary_after_parse() {
        let mut scanner = NmapScanner::new();
        let xml = "<nmaprun version=\"7.94\"/>";
        let dir = std::env::temp_dir().join("scanreport-scanner-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("empty.xml");
        std::fs::write(&path, xml).unwrap();
        scanner.parse_file(&path, Some("replay")).unwrap();
        let summary = scanner.summary().unwrap();
        assert_eq!(summary.target, "replay");
        assert_eq!(summary.host_count, 0);
    }
}
