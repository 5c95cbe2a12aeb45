// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::path::PathBuf;

use scanreport::parser::ParseError;
use scanreport::report::ReportError;
use scanreport::scanner;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] scanner::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(
        "unsupported report format: {} (expected .txt, .md, .html or .json)",
        .0.display()
    )]
    UnsupportedFormat(PathBuf),
    #[error("a target is required unless --input is given")]
    MissingTarget,
    #[error("{0}")]
    Io(#[from] std::io::Error),
}
