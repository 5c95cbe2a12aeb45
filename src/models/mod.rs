// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Entities of a parsed scan and the heuristics that score them.

mod host;
mod port;
mod result;
mod severity;

pub use host::*;
pub use port::*;
pub use result::*;
pub use severity::*;
