// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Async process spawning and supervision.
//!
//! ```text
//! ProcessBuilder::new("app")
//!   .args() .cwd() .env() .name()
//!   .spawn()
//!       --> resolve program (which, env PATH)
//!       --> tokio::process::Command (piped stdout/stderr)
//!       --> RunningProcess { pid }
//!   .wait_streaming(token, on_line)
//!       --> stdout/stderr reader tasks --> on_line(StreamKind, &str)
//!       --> token cancelled: kill
//!       --> ProcessExit { code, interrupted }
//! ```

pub mod builder;
mod io;
mod runner;

pub use builder::ProcessBuilder;
pub use runner::{ProcessExit, RunningProcess, StreamKind};
