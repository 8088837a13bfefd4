// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process and environment plumbing used by the built-in workers.
//!
//! ```text
//!              core
//!               |
//!        +------+------+
//!        |             |
//!        v             v
//!       env         process
//!        |             |
//!   Environment   ProcessBuilder
//!   (overlay)     RunningProcess
//!                 ProcessExit
//! ```

pub mod env;
pub mod process;
