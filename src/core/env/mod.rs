// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Process environment for a runnable.
//!
//! ```text
//! Environment (copy-on-write overlay)
//!   inherit = true   parent env + overlay (set / unset)
//!   inherit = false  overlay only
//! Ops: set/unset/get/prepend_path/apply_to(Command)
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tokio::process::Command;

/// Variable consulted by `sudo -A` for a graphical password prompt.
pub const SUDO_ASKPASS: &str = "SUDO_ASKPASS";

/// Environment changes applied when launching a process.
///
/// Clones share the overlay until one of them is modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    inherit: bool,
    /// `None` marks a variable removed from the inherited environment.
    overlay: Arc<BTreeMap<String, Option<String>>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::inherited()
    }
}

impl Environment {
    /// Parent environment plus local changes.
    #[must_use]
    pub fn inherited() -> Self {
        Self {
            inherit: true,
            overlay: Arc::default(),
        }
    }

    /// Only the variables set on this environment.
    #[must_use]
    pub fn clean() -> Self {
        Self {
            inherit: false,
            overlay: Arc::default(),
        }
    }

    /// Whether the parent environment is inherited.
    #[must_use]
    pub const fn inherits(&self) -> bool {
        self.inherit
    }

    /// Sets a variable.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        Arc::make_mut(&mut self.overlay).insert(key.into(), Some(value.into()));
        self
    }

    /// Removes a variable, including an inherited one.
    pub fn unset(&mut self, key: impl Into<String>) -> &mut Self {
        Arc::make_mut(&mut self.overlay).insert(key.into(), None);
        self
    }

    /// Effective value of a variable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        match self.overlay.get(key) {
            Some(value) => value.clone(),
            None if self.inherit => std::env::var(key).ok(),
            None => None,
        }
    }

    /// Prepends a directory to `PATH`.
    pub fn prepend_path(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        let dir = dir.as_ref().to_string_lossy().into_owned();
        let separator = if cfg!(windows) { ";" } else { ":" };
        let value = match self.get("PATH") {
            Some(current) if !current.is_empty() => format!("{dir}{separator}{current}"),
            _ => dir,
        };
        self.set("PATH", value)
    }

    /// Points `SUDO_ASKPASS` at `askpass` unless already set.
    ///
    /// Nothing happens when the helper does not exist.
    pub fn provide_askpass_entry(&mut self, askpass: &Path) -> &mut Self {
        let unset = self.get(SUDO_ASKPASS).is_none_or(|v| v.is_empty());
        if unset && askpass.exists() {
            self.set(SUDO_ASKPASS, askpass.display().to_string());
        }
        self
    }

    /// Local changes in key order.
    pub fn changes(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.overlay
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Returns true if nothing was changed.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.inherit && self.overlay.is_empty()
    }

    /// Applies this environment to a command about to be spawned.
    pub fn apply_to(&self, command: &mut Command) {
        if !self.inherit {
            command.env_clear();
        }
        for (key, value) in self.overlay.iter() {
            match value {
                Some(value) => command.env(key, value),
                None => command.env_remove(key),
            };
        }
    }
}
