// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Streaming parser for nmap XML reports.
//!
//! The reader walks the event stream one host subtree at a time and converts
//! it into the data model immediately, so peak memory stays bounded by a
//! single host regardless of the document size. Hosts that are not up and
//! ports that are not open are dropped during the walk.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::models::{Address, Finding, Host, OsMatch, Port, ScanResult, Service, Severity};

/// Failure to turn raw scan output into a [`ScanResult`].
///
/// Missing optional attributes are never an error, they default silently.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Malformed markup
    #[error("invalid XML: {0}")]
    InvalidXml(String),
    /// Input ended while elements were still open
    #[error("unexpected end of document")]
    UnexpectedEof,
    /// Input contained no XML document at all
    #[error("no root element found")]
    EmptyDocument,
    /// Failure reading the input source
    #[error("unable to read scan output: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for ParseError {
    fn from(value: quick_xml::Error) -> Self {
        ParseError::InvalidXml(value.to_string())
    }
}

/// Parses an nmap XML report from a reader.
///
/// `target` is the caller-supplied logical label; a target embedded in the
/// document is ignored. `scan_time` is stored verbatim. A report without
/// host elements is a valid empty result, not an error.
pub fn parse_report<R: BufRead>(
    input: R,
    target: &str,
    scan_time: &str,
) -> Result<ScanResult, ParseError> {
    let mut reader = Reader::from_reader(input);
    let mut buf = Vec::new();
    let mut scanner_version = None;
    let mut hosts = Vec::new();
    let mut saw_root = false;
    let mut depth = 0usize;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => {
                if !saw_root {
                    saw_root = true;
                    scanner_version = attr(&element, "version")?;
                    depth += 1;
                } else if element.name().as_ref() == b"host" {
                    if let Some(host) = parse_host(&mut reader)? {
                        hosts.push(host);
                    }
                } else {
                    depth += 1;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Empty(element) => {
                if !saw_root {
                    // empty root element, a valid report without hosts
                    saw_root = true;
                    scanner_version = attr(&element, "version")?;
                }
            }
            Event::Eof => {
                if !saw_root {
                    return Err(ParseError::EmptyDocument);
                }
                if depth > 0 {
                    return Err(ParseError::UnexpectedEof);
                }
                break;
            }
            _ => {}
        }
    }

    let mut result = ScanResult {
        target: target.to_string(),
        scan_time: scan_time.to_string(),
        scanner_version: scanner_version.unwrap_or_else(|| "Unknown".to_string()),
        hosts,
        total_risk: 0,
    };
    result.aggregate_risk();
    Ok(result)
}

/// Parses an nmap XML report from a string.
pub fn parse_str(xml: &str, target: &str, scan_time: &str) -> Result<ScanResult, ParseError> {
    parse_report(xml.as_bytes(), target, scan_time)
}

/// Parses an nmap XML report file for offline analysis.
///
/// Files ending in `.gz` are decompressed transparently while reading.
pub fn parse_file<P: AsRef<Path>>(
    path: P,
    target: &str,
    scan_time: &str,
) -> Result<ScanResult, ParseError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    if path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gz"))
    {
        parse_report(BufReader::new(GzDecoder::new(file)), target, scan_time)
    } else {
        parse_report(BufReader::new(file), target, scan_time)
    }
}

/// Consumes one host subtree. Returns `None` for hosts that are not up.
fn parse_host<R: BufRead>(reader: &mut Reader<R>) -> Result<Option<Host>, ParseError> {
    let mut buf = Vec::new();
    let mut status = String::new();
    let mut addresses = Vec::new();
    let mut hostnames = Vec::new();
    let mut ports = Vec::new();
    let mut os = None;

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => match element.name().as_ref() {
                b"hostnames" => parse_hostnames(reader, &mut hostnames)?,
                b"ports" => parse_ports(reader, &mut ports)?,
                b"os" => parse_os(reader, &mut os)?,
                b"status" => {
                    status = attr(&element, "state")?.unwrap_or_default();
                    skip_subtree(reader, &element)?;
                }
                b"address" => {
                    addresses.push(address_from(&element)?);
                    skip_subtree(reader, &element)?;
                }
                _ => skip_subtree(reader, &element)?,
            },
            Event::Empty(element) => match element.name().as_ref() {
                b"status" => status = attr(&element, "state")?.unwrap_or_default(),
                b"address" => addresses.push(address_from(&element)?),
                _ => {}
            },
            Event::End(element) if element.name().as_ref() == b"host" => break,
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }

    if status != "up" {
        return Ok(None);
    }

    let mut host = Host {
        status,
        addresses,
        hostnames,
        ports,
        os,
        risk_score: 0,
    };
    host.aggregate_risk();
    Ok(Some(host))
}

fn parse_hostnames<R: BufRead>(
    reader: &mut Reader<R>,
    hostnames: &mut Vec<String>,
) -> Result<(), ParseError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => {
                if element.name().as_ref() == b"hostname" {
                    hostnames.push(attr(&element, "name")?.unwrap_or_default());
                }
                skip_subtree(reader, &element)?;
            }
            Event::Empty(element) if element.name().as_ref() == b"hostname" => {
                hostnames.push(attr(&element, "name")?.unwrap_or_default());
            }
            Event::End(element) if element.name().as_ref() == b"hostnames" => return Ok(()),
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
}

fn parse_ports<R: BufRead>(
    reader: &mut Reader<R>,
    ports: &mut Vec<Port>,
) -> Result<(), ParseError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => {
                if element.name().as_ref() == b"port" {
                    let protocol = attr(&element, "protocol")?.unwrap_or_default();
                    let number = attr(&element, "portid")?
                        .and_then(|value| value.parse().ok())
                        .unwrap_or(0);
                    if let Some(port) = parse_port(reader, protocol, number)? {
                        ports.push(port);
                    }
                } else {
                    skip_subtree(reader, &element)?;
                }
            }
            Event::End(element) if element.name().as_ref() == b"ports" => return Ok(()),
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
}

/// Consumes one port subtree. Returns `None` for ports that are not open.
fn parse_port<R: BufRead>(
    reader: &mut Reader<R>,
    protocol: String,
    number: u16,
) -> Result<Option<Port>, ParseError> {
    let mut buf = Vec::new();
    let mut state = String::new();
    let mut service = None;
    let mut findings = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => match element.name().as_ref() {
                b"state" => {
                    state = attr(&element, "state")?.unwrap_or_default();
                    skip_subtree(reader, &element)?;
                }
                b"service" => {
                    service = Some(service_from(&element)?);
                    skip_subtree(reader, &element)?;
                }
                b"script" => {
                    findings.push(finding_from(&element)?);
                    skip_subtree(reader, &element)?;
                }
                _ => skip_subtree(reader, &element)?,
            },
            Event::Empty(element) => match element.name().as_ref() {
                b"state" => state = attr(&element, "state")?.unwrap_or_default(),
                b"service" => service = Some(service_from(&element)?),
                b"script" => findings.push(finding_from(&element)?),
                _ => {}
            },
            Event::End(element) if element.name().as_ref() == b"port" => break,
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }

    if state != "open" {
        return Ok(None);
    }

    let mut port = Port {
        port: number,
        protocol,
        state,
        service,
        findings,
        severity: Severity::Info,
        risk_score: 0,
    };
    port.classify();
    Ok(Some(port))
}

fn parse_os<R: BufRead>(
    reader: &mut Reader<R>,
    os: &mut Option<OsMatch>,
) -> Result<(), ParseError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(element) => {
                if element.name().as_ref() == b"osmatch" && os.is_none() {
                    *os = Some(os_match_from(&element)?);
                }
                skip_subtree(reader, &element)?;
            }
            Event::Empty(element) if element.name().as_ref() == b"osmatch" => {
                if os.is_none() {
                    *os = Some(os_match_from(&element)?);
                }
            }
            Event::End(element) if element.name().as_ref() == b"os" => return Ok(()),
            Event::Eof => return Err(ParseError::UnexpectedEof),
            _ => {}
        }
    }
}

/// Skips everything up to and including the end tag of `start`.
fn skip_subtree<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
) -> Result<(), ParseError> {
    let end = start.to_end().into_owned();
    let mut buf = Vec::new();
    reader.read_to_end_into(end.name(), &mut buf)?;
    Ok(())
}

fn attr(element: &BytesStart, name: &str) -> Result<Option<String>, ParseError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|error| ParseError::InvalidXml(error.to_string()))?;
        if attribute.key.as_ref() == name.as_bytes() {
            let value = attribute
                .unescape_value()
                .map_err(|error| ParseError::InvalidXml(error.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn address_from(element: &BytesStart) -> Result<Address, ParseError> {
    Ok(Address {
        addr_type: attr(element, "addrtype")?.unwrap_or_else(|| "unknown".to_string()),
        address: attr(element, "addr")?.unwrap_or_default(),
    })
}

fn service_from(element: &BytesStart) -> Result<Service, ParseError> {
    Ok(Service {
        name: attr(element, "name")?.unwrap_or_else(|| "unknown".to_string()),
        product: attr(element, "product")?.unwrap_or_default(),
        version: attr(element, "version")?.unwrap_or_default(),
        extrainfo: attr(element, "extrainfo")?.unwrap_or_default(),
    })
}

fn finding_from(element: &BytesStart) -> Result<Finding, ParseError> {
    Ok(Finding::new(
        attr(element, "id")?.unwrap_or_default(),
        attr(element, "output")?.unwrap_or_default(),
    ))
}

fn os_match_from(element: &BytesStart) -> Result<OsMatch, ParseError> {
    Ok(OsMatch {
        name: attr(element, "name")?.unwrap_or_else(|| "Unknown".to_string()),
        accuracy: attr(element, "accuracy")?.unwrap_or_else(|| "0".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<nmaprun scanner="nmap" version="7.94">
  <host>
    <status state="up" reason="echo-reply"/>
    <address addr="192.0.2.10" addrtype="ipv4"/>
    <hostnames>
      <hostname name="sample.example.com" type="PTR"/>
    </hostnames>
    <ports>
      <port protocol="tcp" portid="22">
        <state state="open" reason="syn-ack"/>
        <service name="ssh" product="OpenSSH" version="8.9p1"/>
        <script id="ssh2-enum-algos" output="weak cipher: aes128-cbc"/>
      </port>
      <port protocol="tcp" portid="80">
        <state state="open" reason="syn-ack"/>
        <service name="http" product="nginx"/>
        <script id="http-vuln-check" output="Possible CVE-2021-1234 exposure"/>
      </port>
      <port protocol="tcp" portid="443">
        <state state="closed"/>
      </port>
      <port protocol="tcp" portid="9999">
        <state state="open"/>
      </port>
    </ports>
    <os>
      <osmatch name="Linux 5.4" accuracy="96"/>
      <osmatch name="Linux 4.15" accuracy="91"/>
    </os>
  </host>
  <host>
    <status state="down"/>
    <address addr="192.0.2.11" addrtype="ipv4"/>
  </host>
</nmaprun>
"#;

    #[test]
    fn parses_sample_report() {
        let result = parse_str(SAMPLE, "sample", "2024-05-01 12:00:00").unwrap();
        assert_eq!(result.target, "sample");
        assert_eq!(result.scan_time, "2024-05-01 12:00:00");
        assert_eq!(result.scanner_version, "7.94");
        assert_eq!(result.hosts.len(), 1, "down host must be dropped");

        let host = &result.hosts[0];
        assert_eq!(host.status, "up");
        assert_eq!(host.addresses.len(), 1);
        assert_eq!(host.addresses[0].address, "192.0.2.10");
        assert_eq!(host.addresses[0].addr_type, "ipv4");
        assert_eq!(host.hostnames, vec!["sample.example.com".to_string()]);
        assert_eq!(host.ports.len(), 3, "closed port must be dropped");

        let os = host.os.as_ref().unwrap();
        assert_eq!(os.name, "Linux 5.4");
        assert_eq!(os.accuracy, "96", "only the first osmatch is kept");
    }

    #[test]
    fn classifies_ports_during_parse() {
        let result = parse_str(SAMPLE, "sample", "now").unwrap();
        let host = &result.hosts[0];
        let severity_of = |number: u16| {
            host.ports
                .iter()
                .find(|p| p.port == number)
                .map(|p| p.severity)
                .unwrap()
        };
        assert_eq!(severity_of(80), Severity::High);
        assert_eq!(severity_of(22), Severity::Medium);
        assert_eq!(severity_of(9999), Severity::Low);
    }

    #[test]
    fn aggregates_risk_bottom_up() {
        let result = parse_str(SAMPLE, "sample", "now").unwrap();
        let host = &result.hosts[0];
        let port_sum: u32 = host.ports.iter().map(|p| p.risk_score).sum();
        assert!(host.risk_score > 0);
        assert_eq!(host.risk_score, port_sum);
        assert_eq!(result.total_risk, host.risk_score);
    }

    #[test]
    fn missing_optional_fields_default() {
        let xml = r#"<nmaprun><host><status state="up"/><ports>
            <port protocol="tcp"><state state="open"/><service/></port>
            <port protocol="tcp" portid="bogus"><state state="open"/></port>
        </ports></host></nmaprun>"#;
        let result = parse_str(xml, "defaults", "now").unwrap();
        assert_eq!(result.scanner_version, "Unknown");
        let host = &result.hosts[0];
        assert_eq!(host.ports[0].port, 0, "absent portid degrades to 0");
        assert_eq!(host.ports[1].port, 0, "unparsable portid degrades to 0");
        let service = host.ports[0].service.as_ref().unwrap();
        assert_eq!(service.name, "unknown");
        assert_eq!(service.product, "");
    }

    #[test]
    fn empty_envelope_is_valid() {
        let result = parse_str("<nmaprun version=\"7.94\"></nmaprun>", "empty", "now").unwrap();
        assert!(result.hosts.is_empty());
        assert_eq!(result.total_risk, 0);
        let result = parse_str("<nmaprun version=\"7.94\"/>", "empty", "now").unwrap();
        assert!(result.hosts.is_empty());
    }

    #[test]
    fn truncated_document_is_an_error() {
        let truncated = &SAMPLE[..SAMPLE.len() / 2];
        assert!(parse_str(truncated, "bad", "now").is_err());
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        let xml = "<nmaprun><host><status state=\"up\"/></ports></nmaprun>";
        assert!(parse_str(xml, "bad", "now").is_err());
    }

    #[test]
    fn blank_input_is_an_error() {
        assert!(matches!(
            parse_str("", "bad", "now"),
            Err(ParseError::EmptyDocument)
        ));
    }

    #[test]
    fn caller_target_wins_over_embedded_labels() {
        let xml = r#"<nmaprun version="7.94" args="nmap scanme.example.com"></nmaprun>"#;
        let result = parse_str(xml, "replay", "now").unwrap();
        assert_eq!(result.target, "replay");
    }

    #[test]
    fn parsing_twice_is_deterministic() {
        let first = parse_str(SAMPLE, "sample", "now").unwrap();
        let second = parse_str(SAMPLE, "sample", "now").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_elements_are_skipped() {
        let xml = r#"<nmaprun version="7.94">
            <scaninfo type="syn" protocol="tcp"/>
            <verbose level="0"/>
            <host>
              <status state="up"/>
              <times srtt="1000" rttvar="500" to="100000"/>
              <ports>
                <extraports state="closed" count="997"/>
                <port protocol="tcp" portid="80"><state state="open"/></port>
              </ports>
            </host>
            <runstats><finished time="1" timestr="now"/></runstats>
        </nmaprun>"#;
        let result = parse_str(xml, "skip", "now").unwrap();
        assert_eq!(result.hosts.len(), 1);
        assert_eq!(result.hosts[0].ports.len(), 1);
    }
}
