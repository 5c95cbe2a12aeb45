// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Report renderers over a finished scan result.
//!
//! Renderers consume the aggregate as computed at parse time; severity and
//! risk scores are printed verbatim, never recomputed.

use std::fs;
use std::path::Path;

use chrono::Local;

use crate::models::{Finding, Host, ScanResult, Service, Severity};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Output formats, selected from the report file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Markdown,
    Html,
    Json,
}

impl Format {
    /// Picks the format from a file extension. `None` for unsupported ones.
    pub fn from_path(path: &Path) -> Option<Format> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "txt" | "text" => Some(Format::Text),
            "md" | "markdown" => Some(Format::Markdown),
            "html" | "htm" => Some(Format::Html),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Failure while rendering or writing a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("unable to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to serialize result: {0}")]
    Json(#[from] serde_json::Error),
}

/// Renders the result in the requested format.
pub fn render(result: &ScanResult, format: Format) -> Result<String, ReportError> {
    match format {
        Format::Text => Ok(render_text(result)),
        Format::Markdown => Ok(render_markdown(result)),
        Format::Html => Ok(render_html(result)),
        Format::Json => Ok(serde_json::to_string_pretty(result)?),
    }
}

/// Renders the result and writes it to `path`.
pub fn write_report(result: &ScanResult, format: Format, path: &Path) -> Result<(), ReportError> {
    let rendered = render(result, format)?;
    fs::write(path, rendered)?;
    Ok(())
}

/// Port severity counts in display order, critical first.
fn severity_counts(result: &ScanResult) -> [(Severity, usize); 5] {
    let mut counts = [
        (Severity::Critical, 0),
        (Severity::High, 0),
        (Severity::Medium, 0),
        (Severity::Low, 0),
        (Severity::Info, 0),
    ];
    for port in result.hosts.iter().flat_map(|host| &host.ports) {
        if let Some(entry) = counts.iter_mut().find(|(sev, _)| *sev == port.severity) {
            entry.1 += 1;
        }
    }
    counts
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "#8B0000",
        Severity::High => "#E74C3C",
        Severity::Medium => "#F39C12",
        Severity::Low => "#27AE60",
        Severity::Info => "#7F8C8D",
    }
}

fn version_info(service: Option<&Service>) -> String {
    match service {
        Some(service) => format!("{} {}", service.product, service.version)
            .trim()
            .to_string(),
        None => String::new(),
    }
}

fn service_name(service: Option<&Service>) -> &str {
    service.map(|service| service.name.as_str()).unwrap_or("unknown")
}

fn addresses_line(host: &Host) -> String {
    host.addresses
        .iter()
        .map(|address| address.address.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn hostnames_line(host: &Host) -> String {
    if host.hostnames.is_empty() {
        "N/A".to_string()
    } else {
        host.hostnames.join(", ")
    }
}

/// Findings worth listing: vulnerability-class ids plus anything with output.
fn vuln_findings(host: &Host) -> Vec<(u16, &Finding)> {
    host.ports
        .iter()
        .flat_map(|port| port.findings.iter().map(move |finding| (port.port, finding)))
        .filter(|(_, finding)| {
            finding.id.to_lowercase().contains("vuln") || !finding.output.is_empty()
        })
        .collect()
}

fn render_text(result: &ScanResult) -> String {
    let rule = "-".repeat(60);
    let mut out = String::new();
    out.push_str(&format!("{}\n", "=".repeat(60)));
    out.push_str("VULNERABILITY SCAN REPORT\n");
    out.push_str(&format!("{}\n\n", "=".repeat(60)));

    out.push_str("SCAN SUMMARY\n");
    out.push_str(&format!("{rule}\n"));
    out.push_str(&format!("Target: {}\n", result.target));
    out.push_str(&format!("Scan Date: {}\n", result.scan_time));
    out.push_str(&format!(
        "Report Generated: {}\n",
        Local::now().format(TIME_FORMAT)
    ));
    out.push_str(&format!("Scanner Version: {}\n", result.scanner_version));
    out.push_str(&format!("Total Risk Score: {}\n\n", result.total_risk));

    for host in &result.hosts {
        out.push_str("HOST DETAILS\n");
        out.push_str(&format!("{rule}\n"));
        out.push_str(&format!("IP Address(es): {}\n", addresses_line(host)));
        out.push_str(&format!("Hostname(s): {}\n", hostnames_line(host)));
        out.push_str(&format!("Status: {}\n", host.status));
        if let Some(os) = &host.os {
            out.push_str(&format!(
                "OS Detection: {} ({}% accuracy)\n",
                os.name, os.accuracy
            ));
        }
        out.push_str(&format!("Host Risk Score: {}\n\n", host.risk_score));

        if !host.ports.is_empty() {
            out.push_str("OPEN PORTS AND SERVICES\n");
            out.push_str(&format!("{rule}\n"));
            for port in &host.ports {
                out.push_str(&format!(
                    "Port {}/{}: {} {} [{}]\n",
                    port.port,
                    port.protocol,
                    service_name(port.service.as_ref()),
                    version_info(port.service.as_ref()),
                    port.severity.as_str().to_uppercase(),
                ));
            }
            out.push('\n');

            let findings = vuln_findings(host);
            if !findings.is_empty() {
                out.push_str("POTENTIAL VULNERABILITIES\n");
                out.push_str(&format!("{rule}\n"));
                for (port, finding) in findings {
                    out.push_str(&format!("Port {port} - {}\n", finding.id));
                    out.push_str(&format!("{}\n\n", finding.output));
                }
            }
        }
    }
    out
}

fn render_markdown(result: &ScanResult) -> String {
    let mut out = String::new();
    out.push_str("# Vulnerability Scan Report\n\n");
    out.push_str(&format!("**Target:** {}  \n", result.target));
    out.push_str(&format!("**Scan Date:** {}  \n", result.scan_time));
    out.push_str(&format!(
        "**Report Generated:** {}  \n",
        Local::now().format(TIME_FORMAT)
    ));
    out.push_str(&format!("**Scanner Version:** {}  \n", result.scanner_version));
    out.push_str(&format!("**Total Risk Score:** {}\n\n", result.total_risk));

    let counts = severity_counts(result);
    out.push_str("## Severity Summary\n\n");
    out.push_str("| Severity | Count |\n|---|---|\n");
    for (severity, count) in counts {
        out.push_str(&format!("| {} | {count} |\n", capitalize(severity.as_str())));
    }

    let total: usize = counts.iter().map(|(_, count)| count).sum::<usize>().max(1);
    out.push_str("\n```\n");
    for (severity, count) in counts {
        let label = match severity {
            Severity::Critical => "CRIT",
            Severity::High => "HIGH",
            Severity::Medium => "MED ",
            Severity::Low => "LOW ",
            Severity::Info => "INFO",
        };
        out.push_str(&format!("{label} |{}|\n", bar(count, total)));
    }
    out.push_str("```\n");

    for host in &result.hosts {
        out.push_str("\n## Host Details\n\n");
        out.push_str(&format!("- IP: {}\n", addresses_line(host)));
        out.push_str(&format!("- Hostnames: {}\n", hostnames_line(host)));
        out.push_str(&format!("- Status: {}\n", host.status));
        if let Some(os) = &host.os {
            out.push_str(&format!("- OS: {} ({}% accuracy)\n", os.name, os.accuracy));
        }

        if !host.ports.is_empty() {
            out.push_str("\n### Open Ports and Services\n\n");
            out.push_str("| Port | Proto | Service | Version | Severity |\n|---|---|---|---|---|\n");
            for port in &host.ports {
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} |\n",
                    port.port,
                    port.protocol,
                    service_name(port.service.as_ref()),
                    version_info(port.service.as_ref()),
                    port.severity.as_str().to_uppercase(),
                ));
            }
            out.push_str(&format!("\n**Host Risk Score:** {}\n", host.risk_score));

            let findings = vuln_findings(host);
            if !findings.is_empty() {
                out.push_str("\n### Potential Vulnerabilities\n\n");
                for (port, finding) in findings {
                    out.push_str(&format!("- **Port {port} - {}**\n\n", finding.id));
                    out.push_str(&format!("  {}\n\n", finding.output.trim()));
                }
            }
        }
    }
    out
}

fn render_html(result: &ScanResult) -> String {
    const CSS: &str = "body{font-family:Arial,Helvetica,sans-serif;color:#1a1a1a;margin:20px}\
h1,h2,h3{color:#2c3e50}\
table{border-collapse:collapse;width:100%;margin:10px 0}\
th,td{border:1px solid #ddd;padding:8px;font-size:14px}\
th{background:#34495e;color:#fff;text-align:left}\
tr:nth-child(even){background:#f8f9fa}\
.sev{font-weight:bold;padding:2px 6px;border-radius:4px;color:#fff;display:inline-block}";

    let sev_span = |severity: Severity| {
        format!(
            "<span class='sev' style='background:{}'>{}</span>",
            severity_color(severity),
            severity.as_str().to_uppercase()
        )
    };

    let mut out = String::new();
    out.push_str(&format!(
        "<html><head><meta charset='utf-8'><style>{CSS}</style>\
<title>Vulnerability Scan Report</title></head><body>"
    ));
    out.push_str("<h1>Vulnerability Scan Report</h1>");
    out.push_str(&format!(
        "<p><b>Target:</b> {}<br/><b>Scan Date:</b> {}<br/>\
<b>Report Generated:</b> {}<br/><b>Scanner Version:</b> {}<br/>\
<b>Total Risk Score:</b> {}</p>",
        escape(&result.target),
        escape(&result.scan_time),
        Local::now().format(TIME_FORMAT),
        escape(&result.scanner_version),
        result.total_risk
    ));

    out.push_str("<h2>Severity Summary</h2>");
    out.push_str("<table><tr><th>Severity</th><th>Count</th></tr>");
    for (severity, count) in severity_counts(result) {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{count}</td></tr>",
            capitalize(severity.as_str())
        ));
    }
    out.push_str("</table>");

    for host in &result.hosts {
        out.push_str("<h2>Host Details</h2>");
        out.push_str(&format!(
            "<p><b>IP:</b> {}<br/><b>Hostnames:</b> {}<br/><b>Status:</b> {}",
            escape(&addresses_line(host)),
            escape(&hostnames_line(host)),
            escape(&host.status)
        ));
        if let Some(os) = &host.os {
            out.push_str(&format!(
                "<br/><b>OS:</b> {} ({}% accuracy)",
                escape(&os.name),
                escape(&os.accuracy)
            ));
        }
        out.push_str(&format!("<br/><b>Risk Score:</b> {}</p>", host.risk_score));

        if !host.ports.is_empty() {
            out.push_str("<h3>Open Ports and Services</h3>");
            out.push_str(
                "<table><tr><th>Port</th><th>Proto</th><th>Service</th>\
<th>Version</th><th>Severity</th></tr>",
            );
            for port in &host.ports {
                out.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    port.port,
                    escape(&port.protocol),
                    escape(service_name(port.service.as_ref())),
                    escape(&version_info(port.service.as_ref())),
                    sev_span(port.severity)
                ));
            }
            out.push_str("</table>");

            let findings = vuln_findings(host);
            if !findings.is_empty() {
                out.push_str("<h3>Potential Vulnerabilities</h3>");
                for (port, finding) in findings {
                    out.push_str(&format!(
                        "<p><b>Port {port} - {}</b><br/>{}</p>",
                        escape(&finding.id),
                        escape(&finding.output).replace('\n', "<br/>")
                    ));
                }
            }
        }
    }
    out.push_str("</body></html>");
    out
}

fn bar(count: usize, total: usize) -> String {
    const WIDTH: usize = 30;
    let filled = WIDTH * count / total;
    format!("{}{}", "█".repeat(filled), " ".repeat(WIDTH - filled))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
