// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Compact statistics over a parsed scan.

use serde::Serialize;

use crate::models::ScanResult;

/// Counts derived from a finished scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Logical target label of the scan
    pub target: String,
    /// Timestamp of the scan
    pub scan_time: String,
    /// Hosts that were up
    pub host_count: usize,
    /// Open ports across all hosts
    pub open_port_count: usize,
    /// Findings flagged as vulnerability-class by the scan engine
    pub vulnerability_count: usize,
}

/// Derives the summary counts.
///
/// `vulnerability_count` counts findings whose script id contains "vuln".
/// That follows the scan engine's naming convention and is narrower than
/// everything the local heuristic rates medium or higher.
pub fn summarize(result: &ScanResult) -> Summary {
    let open_port_count = result.hosts.iter().map(|host| host.ports.len()).sum();
    let vulnerability_count = result
        .hosts
        .iter()
        .flat_map(|host| &host.ports)
        .flat_map(|port| &port.findings)
        .filter(|finding| finding.id.to_lowercase().contains("vuln"))
        .count();
    Summary {
        target: result.target.clone(),
        scan_time: result.scan_time.clone(),
        host_count: result.hosts.len(),
        open_port_count,
        vulnerability_count,
    }
}
