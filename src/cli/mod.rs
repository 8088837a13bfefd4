// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! CLI module for runctl using clap derive.
//!
//! # Command Structure
//!
//! ```text
//! runctl [global options] <command>
//! run [options] -- PROGRAM [ARGS...]
//! list
//! options
//! inis
//! version
//! ```

pub mod global;
pub mod run;


use crate::cli::global::GlobalOptions;
use crate::cli::run::RunArgs;
use clap::{Parser, Subcommand};

/// Run session orchestration engine.
#[derive(Debug, Parser)]
#[command(
    name = "runctl",
    author,
    version,
    about = "Run session orchestration engine",
    long_about = "runctl Copyright (C) 2026 Romeo Ahmed\n\
                  This program comes with ABSOLUTELY NO WARRANTY\n\
                  This is free software, and you are welcome to redistribute it\n\
                  under certain conditions; see LICENSE for details.\n\n\
                  Starts a program as a run session: helper workers are started\n\
                  in dependency order, output is streamed, and Ctrl-C stops the\n\
                  session (twice to force it). See `runctl <command> --help`.",
    after_help = "CONFIG FILES:\n\n\
                  runctl loads `runctl.toml` from the current directory if it\n\
                  exists, then every file given with --config, in order. Later\n\
                  files override earlier ones. RUNCTL_<SECTION>__<KEY> environment\n\
                  variables override files, and command-line flags override all."
)]
pub struct Cli {
    /// Global options shared by all commands
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Command to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Shows the version.
    #[command(visible_alias = "-v")]
    Version,

    /// Lists all options and their effective values.
    Options,

    /// Lists the configuration files used by runctl.
    Inis,

    /// Lists the registered worker factories.
    List,

    /// Runs a program as a session.
    Run(RunArgs),
}

/// Parses command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Parses command-line arguments from an iterator.
pub fn parse_from<I, T>(iter: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::parse_from(iter)
}

/// Tries to parse command-line arguments, returning an error on failure.
///
/// # Errors
///
/// Returns a `clap::Error` if the arguments are invalid or if help/version information
/// was requested.
pub fn try_parse() -> Result<Cli, clap::Error> {
    Cli::try_parse()
}
