// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! String identifiers for run modes, device types and run configurations.

use std::fmt;
use std::sync::Arc;

/// Plain run of the application.
pub const NORMAL_RUN_MODE: &str = "RunConfiguration.NormalRunMode";

/// Run under a debugger.
pub const DEBUG_RUN_MODE: &str = "RunConfiguration.DebugRunMode";

/// Run under a profiler.
pub const PROFILER_RUN_MODE: &str = "RunConfiguration.QmlProfilerRunMode";

/// The local machine.
pub const DESKTOP_DEVICE_TYPE: &str = "Desktop";

/// An interned, cheaply cloneable identifier.
///
/// Ids compare by value. The empty id is "unset".
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(Arc<str>);

impl Id {
    /// Creates an id from a name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the id is unset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({:?})", &*self.0)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Id {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
