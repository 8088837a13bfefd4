// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! List command implementation for runctl.

use crate::run::workers::builtin_registry;

/// Prints one line per (run mode, device type, run configuration) a factory
/// accepts.
pub fn run_list_command() {
    let registry = builtin_registry();
    if registry.is_empty() {
        println!("No worker factories registered");
        return;
    }
    for line in registry.dump_all() {
        println!("{line}");
    }
}
