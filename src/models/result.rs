// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

use super::host::Host;

/// A complete parsed scan.
///
/// This is the aggregate handed to the filter engine and the report
/// renderers. Renderers read `severity` and `risk_score` as computed at
/// parse time and never recompute them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Logical target label supplied by the caller
    pub target: String,
    /// Timestamp of the scan, preformatted
    pub scan_time: String,
    /// Version of the scan engine that produced the report
    pub scanner_version: String,
    /// Hosts that were up, in report order
    #[serde(default)]
    pub hosts: Vec<Host>,
    /// Sum of the host risk scores
    #[serde(default)]
    pub total_risk: u32,
}

impl ScanResult {
    /// Sums the host scores. Called once after all hosts are parsed.
    pub fn aggregate_risk(&mut self) {
        self.total_risk = self.hosts.iter().map(|host| host.risk_score).sum();
    }

    /// Re-derives host and scan totals from the current port set.
    ///
    /// Filtering keeps the parse-time totals as a snapshot of the unfiltered
    /// scan. Callers that need totals consistent with a filtered aggregate
    /// call this explicitly.
    pub fn recompute_totals(&mut self) {
        for host in &mut self.hosts {
            host.aggregate_risk();
        }
        self.aggregate_risk();
    }
}
