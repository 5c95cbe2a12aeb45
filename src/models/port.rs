// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

use super::severity::{classify_finding, classify_port, risk_score, Severity};

/// Identification of the software listening on a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service name as reported by the scan engine
    #[serde(default = "unknown")]
    pub name: String,
    /// Product name, if detected
    #[serde(default)]
    pub product: String,
    /// Product version, if detected
    #[serde(default)]
    pub version: String,
    /// Additional free-form detection info
    #[serde(default)]
    pub extrainfo: String,
}

fn unknown() -> String {
    "unknown".to_string()
}

impl Default for Service {
    fn default() -> Self {
        Service {
            name: unknown(),
            product: String::new(),
            version: String::new(),
            extrainfo: String::new(),
        }
    }
}

/// A single script/probe result attached to a port.
///
/// The severity is not part of the scan output, it is derived from the
/// finding's own text when the finding is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Script id that produced the finding
    pub id: String,
    /// Free-text output of the script
    pub output: String,
    /// Derived severity tier
    #[serde(default)]
    pub severity: Severity,
}

impl Finding {
    /// Builds a finding and classifies it from its text.
    pub fn new(id: String, output: String) -> Self {
        let mut finding = Finding {
            id,
            output,
            severity: Severity::Info,
        };
        finding.severity = classify_finding(&finding);
        finding
    }
}

/// An open port of a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Port number
    pub port: u16,
    /// Transport protocol
    pub protocol: String,
    /// State reported by the scan engine, always "open" after parsing
    pub state: String,
    /// Detected service, if any
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub service: Option<Service>,
    /// Script findings in report order
    #[serde(default)]
    pub findings: Vec<Finding>,
    /// Derived severity tier
    #[serde(default)]
    pub severity: Severity,
    /// Derived numeric weight
    #[serde(default)]
    pub risk_score: u32,
}

impl Port {
    /// Derives severity and risk score once all findings are attached.
    ///
    /// Pure over the port's own fields, so calling it again on an unchanged
    /// port yields the same values.
    pub fn classify(&mut self) {
        self.severity = classify_port(self);
        self.risk_score = risk_score(self);
    }
}
