// SPDX-FileCopyrightText: 2024 Greenbone AG
//
// SPDX-License-Identifier: GPL-2.0-or-later

#![doc = include_str!("../README.md")]

pub mod filter;
pub mod models;
pub mod parser;
pub mod report;
pub mod scanner;
pub mod summary;
