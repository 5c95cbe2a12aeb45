// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Post-parse filtering and ordering of scan results.
//!
//! Both operations mutate the aggregate in place and assume exclusive
//! access. Filtering is a strict subset projection over each host's ports;
//! risk totals keep their parse-time snapshot of the unfiltered scan, see
//! [`ScanResult::recompute_totals`].

use std::collections::HashSet;
use std::str::FromStr;

use crate::models::{is_common_port, ScanResult, Severity};

/// Independently combinable port predicates.
///
/// A port survives only if it passes every predicate that is set.
#[derive(Debug, Default, Clone)]
pub struct FilterOptions {
    /// Drop ports whose severity is strictly below this tier
    pub min_severity: Option<Severity>,
    /// Drop ports with these numbers
    pub exclude_ports: HashSet<u16>,
    /// Drop ports whose service name matches one of these, case-insensitive.
    /// Members are expected lowercased, see [`parse_service_set`].
    pub exclude_services: HashSet<String>,
    /// Keep only ports outside the well-known set
    pub only_uncommon_ports: bool,
}

/// Splits a comma separated list of port numbers.
///
/// Tokens that do not parse as a port number are skipped, not an error.
pub fn parse_port_set(value: &str) -> HashSet<u16> {
    value
        .split(',')
        .filter_map(|token| token.trim().parse().ok())
        .collect()
}

/// Splits a comma separated list of service names, lowercased.
pub fn parse_service_set(value: &str) -> HashSet<String> {
    value
        .split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Drops ports not passing the options, per host, in place.
pub fn apply_filters(result: &mut ScanResult, options: &FilterOptions) {
    let threshold = options.min_severity.unwrap_or(Severity::Info);
    for host in &mut result.hosts {
        host.ports.retain(|port| {
            if options.exclude_ports.contains(&port.port) {
                return false;
            }
            if let Some(service) = &port.service {
                if options.exclude_services.contains(&service.name.to_lowercase()) {
                    return false;
                }
            }
            if options.only_uncommon_ports && is_common_port(port.port) {
                return false;
            }
            port.severity >= threshold
        });
    }
}

/// Port ordering applied within each host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortStrategy {
    /// Descending risk score, ties by descending severity, then ascending
    /// port number
    #[default]
    Risk,
    /// Descending severity, ties by descending risk score, then ascending
    /// port number
    Severity,
    /// Ascending port number
    Port,
    /// Keep report order
    None,
}

impl FromStr for SortStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "risk" => Ok(SortStrategy::Risk),
            "severity" => Ok(SortStrategy::Severity),
            "port" => Ok(SortStrategy::Port),
            "none" => Ok(SortStrategy::None),
            _ => Err(format!("unknown sort strategy: {s}")),
        }
    }
}

/// Reorders each host's ports in place. All sorts are stable, equal keys
/// keep their report order.
pub fn sort_ports(result: &mut ScanResult, strategy: SortStrategy) {
    for host in &mut result.hosts {
        match strategy {
            SortStrategy::Risk => host.ports.sort_by(|a, b| {
                b.risk_score
                    .cmp(&a.risk_score)
                    .then_with(|| b.severity.cmp(&a.severity))
                    .then_with(|| a.port.cmp(&b.port))
            }),
            SortStrategy::Severity => host.ports.sort_by(|a, b| {
                b.severity
                    .cmp(&a.severity)
                    .then_with(|| b.risk_score.cmp(&a.risk_score))
                    .then_with(|| a.port.cmp(&b.port))
            }),
            SortStrategy::Port => host.ports.sort_by(|a, b| a.port.cmp(&b.port)),
            SortStrategy::None => {}
        }
    }
}
