// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

use super::port::Port;

/// One network address of a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Address kind, e.g. ipv4, ipv6 or mac
    #[serde(rename = "type")]
    pub addr_type: String,
    /// The address itself
    pub address: String,
}

/// Best OS match reported for a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsMatch {
    /// OS name
    pub name: String,
    /// Match accuracy in percent, as reported
    pub accuracy: String,
}

/// A host that was up during the scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Status reported by the scan engine, always "up" after parsing
    pub status: String,
    /// Addresses in report order
    #[serde(default)]
    pub addresses: Vec<Address>,
    /// Hostnames in report order
    #[serde(default)]
    pub hostnames: Vec<String>,
    /// Open ports in report order
    #[serde(default)]
    pub ports: Vec<Port>,
    /// First OS match, if OS detection ran
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub os: Option<OsMatch>,
    /// Sum of the port risk scores
    #[serde(default)]
    pub risk_score: u32,
}

impl Host {
    /// Sums the port scores. Called once after all ports are parsed.
    pub fn aggregate_risk(&mut self) {
        self.risk_score = self.ports.iter().map(|port| port.risk_score).sum();
    }
}
