// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use scanreport::filter::{apply_filters, parse_service_set, sort_ports, FilterOptions, SortStrategy};
use scanreport::models::{ScanResult, Severity};
use scanreport::parser;
use scanreport::summary::summarize;

fn load_report(filename: &str) -> ScanResult {
    let path = format!("tests/{filename}");
    parser::parse_file(path, "sample", "2024-05-01 12:00:00").unwrap()
}

#[test]
fn parse_sample_report() {
    let result = load_report("nmap_sample.xml");

    assert_eq!(result.target, "sample");
    assert_eq!(result.scanner_version, "7.94");
    assert_eq!(result.hosts.len(), 1);

    let host = &result.hosts[0];
    assert_eq!(host.status, "up");
    assert_eq!(host.hostnames, vec!["sample.example.com".to_string()]);
    assert_eq!(host.ports.len(), 3);

    let severity_of = |number: u16| {
        host.ports
            .iter()
            .find(|port| port.port == number)
            .map(|port| port.severity)
            .unwrap()
    };
    // http port high due to the CVE finding, ssh medium due to "weak",
    // 9999 low due to the uncommon number
    assert_eq!(severity_of(80), Severity::High);
    assert_eq!(severity_of(22), Severity::Medium);
    assert_eq!(severity_of(9999), Severity::Low);

    assert!(host.risk_score > 0);
    assert_eq!(result.total_risk, host.risk_score);
}

#[test]
fn gzip_replay_matches_plain_parse() {
    let plain = load_report("nmap_sample.xml");
    let compressed = load_report("nmap_sample.xml.gz");
    assert_eq!(plain, compressed);
}

#[test]
fn empty_report_is_a_valid_result() {
    let result = load_report("nmap_empty.xml");
    assert!(result.hosts.is_empty());
    assert_eq!(result.total_risk, 0);
    let summary = summarize(&result);
    assert_eq!(summary.host_count, 0);
    assert_eq!(summary.open_port_count, 0);
}

#[test]
fn filters_reduce_ports() {
    let mut result = load_report("nmap_sample.xml");

    // min severity medium drops the low-severity uncommon port 9999
    apply_filters(
        &mut result,
        &FilterOptions {
            min_severity: Some(Severity::Medium),
            ..Default::default()
        },
    );
    let remaining: Vec<u16> = result.hosts[0].ports.iter().map(|port| port.port).collect();
    assert!(remaining.contains(&80));
    assert!(remaining.contains(&22));
    assert!(!remaining.contains(&9999));

    // excluding the ssh service removes port 22 only
    let mut result = load_report("nmap_sample.xml");
    apply_filters(
        &mut result,
        &FilterOptions {
            exclude_services: parse_service_set("ssh"),
            ..Default::default()
        },
    );
    let remaining: Vec<u16> = result.hosts[0].ports.iter().map(|port| port.port).collect();
    assert!(!remaining.contains(&22));
    assert!(remaining.contains(&80));
    assert!(remaining.contains(&9999));
}

#[test]
fn sorting_orders_each_host() {
    let mut result = load_report("nmap_sample.xml");
    sort_ports(&mut result, SortStrategy::Port);
    let numbers: Vec<u16> = result.hosts[0].ports.iter().map(|port| port.port).collect();
    assert_eq!(numbers, vec![22, 80, 9999]);

    sort_ports(&mut result, SortStrategy::Risk);
    let scores: Vec<u32> = result.hosts[0]
        .ports
        .iter()
        .map(|port| port.risk_score)
        .collect();
    assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn summary_counts_vulnerability_class_findings() {
    let result = load_report("nmap_sample.xml");
    let summary = summarize(&result);
    assert_eq!(summary.host_count, 1);
    assert_eq!(summary.open_port_count, 3);
    // only the http-vuln-check id contains "vuln"
    assert_eq!(summary.vulnerability_count, 1);
}

#[test]
fn parsing_twice_is_idempotent() {
    let first = load_report("nmap_sample.xml");
    let second = load_report("nmap_sample.xml");
    assert_eq!(first, second);
}
