// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

#![doc = include_str!("README.md")]

mod error;

use std::io::{self, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use scanreport::filter::{
    apply_filters, parse_port_set, parse_service_set, sort_ports, FilterOptions, SortStrategy,
};
use scanreport::models::Severity;
use scanreport::report::{self, Format};
use scanreport::scanner::{self, NmapScanner, ScanType};

use error::CliError;

const BANNER: &str = "\
================================================================================
               Nmap Vulnerability Scanner & Report Generator
================================================================================

WARNING: Ensure you have explicit written authorization before scanning any
         target. Unauthorized scanning may be illegal in your jurisdiction.
";

#[derive(clap::Parser)]
#[command(
    name = "scanreportctl",
    version,
    about = "Scans targets with nmap and renders risk-scored reports."
)]
struct Args {
    /// Target IP address or hostname to scan; with --input it only relabels
    /// the replayed report.
    #[arg(short, long, required_unless_present = "input")]
    target: Option<String>,

    /// Scan profile (basic, vuln, aggressive).
    #[arg(short = 's', long, default_value = "basic", value_parser = parse_scan_type)]
    scan_type: ScanType,

    /// Port specification, e.g. 1-1000 or 80,443,8080.
    #[arg(short, long)]
    ports: Option<String>,

    /// Parse an existing nmap XML report (.gz accepted) instead of scanning.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Report output path; the extension picks the format
    /// (.txt, .md, .html, .json).
    #[arg(short, long)]
    output: PathBuf,

    /// Drop ports below this severity (info, low, medium, high, critical).
    #[arg(long, value_parser = parse_severity)]
    min_severity: Option<Severity>,

    /// Comma separated port numbers to drop.
    #[arg(long)]
    exclude_ports: Option<String>,

    /// Comma separated service names to drop.
    #[arg(long)]
    exclude_services: Option<String>,

    /// Keep only ports outside the well-known set.
    #[arg(long)]
    only_uncommon_ports: bool,

    /// Port ordering within each host (risk, severity, port, none).
    #[arg(long, default_value = "risk", value_parser = parse_sort_strategy)]
    sort: SortStrategy,

    /// Print a scan summary before writing the report.
    #[arg(short, long)]
    verbose: bool,

    /// Skip the authorization prompt (authorized lab environments only).
    #[arg(long)]
    skip_auth_check: bool,

    /// Path to the nmap binary.
    #[arg(long, env = "SCANREPORT_NMAP")]
    nmap_path: Option<PathBuf>,
}

fn parse_scan_type(value: &str) -> Result<ScanType, String> {
    ScanType::from_str(value)
}

fn parse_severity(value: &str) -> Result<Severity, String> {
    Severity::from_str(value)
}

fn parse_sort_strategy(value: &str) -> Result<SortStrategy, String> {
    SortStrategy::from_str(value)
}

fn setup_log(verbose: bool) {
    let default = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_log(args.verbose);
    if let Err(error) = run(args).await {
        tracing::error!("{error}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let format = Format::from_path(&args.output)
        .ok_or_else(|| CliError::UnsupportedFormat(args.output.clone()))?;

    let mut scanner = match args.nmap_path {
        Some(path) => NmapScanner::with_binary(path),
        None => NmapScanner::new(),
    };

    if let Some(input) = &args.input {
        scanner.parse_file(input, args.target.as_deref())?;
    } else {
        // clap enforces the target unless --input is given
        let target = args.target.clone().ok_or(CliError::MissingTarget)?;
        println!("{BANNER}");
        if !args.skip_auth_check && !confirm_authorization()? {
            println!("Scan aborted: written authorization is required to proceed.");
            return Ok(());
        }
        if !scanner.check_installed().await {
            return Err(scanner::Error::NotInstalled.into());
        }
        println!("Starting {} scan on target: {target}", args.scan_type);
        if let Some(ports) = &args.ports {
            println!("Scanning ports: {ports}");
        }
        println!("This may take a few minutes...\n");
        scanner.scan_target(&target, args.scan_type, args.ports.as_deref()).await?;
    }

    let options = FilterOptions {
        min_severity: args.min_severity,
        exclude_ports: args
            .exclude_ports
            .as_deref()
            .map(parse_port_set)
            .unwrap_or_default(),
        exclude_services: args
            .exclude_services
            .as_deref()
            .map(parse_service_set)
            .unwrap_or_default(),
        only_uncommon_ports: args.only_uncommon_ports,
    };
    if let Some(result) = scanner.last_result_mut() {
        apply_filters(result, &options);
        sort_ports(result, args.sort);
    }

    if args.verbose {
        let summary = scanner.summary()?;
        println!("Scan Summary:");
        println!("  Target: {}", summary.target);
        println!("  Scan Time: {}", summary.scan_time);
        println!("  Hosts Found: {}", summary.host_count);
        println!("  Open Ports: {}", summary.open_port_count);
        println!(
            "  Potential Vulnerabilities: {}\n",
            summary.vulnerability_count
        );
    }

    let result = scanner.last_result().ok_or(scanner::Error::NoResults)?;
    report::write_report(result, format, &args.output)?;
    println!("Report generated successfully: {}", args.output.display());
    Ok(())
}

fn confirm_authorization() -> Result<bool, CliError> {
    print!("Do you have WRITTEN AUTHORIZATION to scan this target? (yes/no): ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "yes" | "y"))
}
