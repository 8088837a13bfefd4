// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Opaque session inputs: what to run, where, and in which mode.
//!
//! ```text
//! RunConfiguration (host-provided)
//!   id, display_name, runnable(), device()
//!          |
//!          v  RunControl::set_run_configuration
//! RunContext
//!   run_mode   run_config_id   display_name
//!   device --> device_type() used for factory matching
//!   runnable { command, working_directory, environment, device? }
//! ```

use std::fmt::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::env::Environment;
use crate::run::ids::{DESKTOP_DEVICE_TYPE, Id, NORMAL_RUN_MODE};

/// Program plus arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    program: PathBuf,
    arguments: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Returns true if no program is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.program.as_os_str().is_empty()
    }

    /// Renders the command line for the output pane, quoting spaced arguments.
    #[must_use]
    pub fn to_user_output(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.arguments {
            if arg.is_empty() || arg.contains(' ') {
                let _ = write!(out, " \"{arg}\"");
            } else {
                let _ = write!(out, " {arg}");
            }
        }
        out
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_user_output())
    }
}

/// A machine that can run the application.
pub trait Device: fmt::Debug + Send + Sync {
    /// Type id used to select worker factories.
    fn device_type(&self) -> Id;

    /// Human-readable name.
    fn display_name(&self) -> String {
        self.device_type().to_string()
    }
}

/// The local machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopDevice;

impl Device for DesktopDevice {
    fn device_type(&self) -> Id {
        Id::new(DESKTOP_DEVICE_TYPE)
    }

    fn display_name(&self) -> String {
        "Local PC".to_string()
    }
}

/// A device known only by its type id.
#[derive(Debug, Clone)]
pub struct TypedDevice(Id);

impl TypedDevice {
    pub fn new(device_type: impl Into<Id>) -> Self {
        Self(device_type.into())
    }
}

impl Device for TypedDevice {
    fn device_type(&self) -> Id {
        self.0.clone()
    }
}

/// Returns the device for a type id, the local machine for `Desktop`.
#[must_use]
pub fn device_for_type(device_type: &str) -> Arc<dyn Device> {
    if device_type == DESKTOP_DEVICE_TYPE {
        Arc::new(DesktopDevice)
    } else {
        Arc::new(TypedDevice::new(device_type))
    }
}

/// What to execute: command line, working directory and environment.
#[derive(Debug, Clone, Default)]
pub struct Runnable {
    pub command: CommandLine,
    pub working_directory: Option<PathBuf>,
    pub environment: Environment,
    /// Overrides the run configuration's device when set.
    pub device: Option<Arc<dyn Device>>,
}

impl Runnable {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }
}

/// Host-side description of something runnable.
pub trait RunConfiguration {
    /// Id matched by prefix against factory registrations.
    fn id(&self) -> Id;

    fn display_name(&self) -> String;

    fn runnable(&self) -> Runnable;

    /// Target device, `None` for the local machine.
    fn device(&self) -> Option<Arc<dyn Device>> {
        None
    }
}

/// A run configuration built from a plain command line.
#[derive(Debug, Clone)]
pub struct CustomExecutableConfiguration {
    id: Id,
    display_name: String,
    runnable: Runnable,
    device: Option<Arc<dyn Device>>,
}

impl CustomExecutableConfiguration {
    /// Id prefix of custom executable configurations.
    pub const ID_PREFIX: &'static str = "RunConfiguration.CustomExecutable";

    pub fn new(runnable: Runnable) -> Self {
        let display_name = runnable
            .command
            .program()
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        Self {
            id: Id::new(Self::ID_PREFIX),
            display_name,
            runnable,
            device: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: Arc<dyn Device>) -> Self {
        self.device = Some(device);
        self
    }
}

impl RunConfiguration for CustomExecutableConfiguration {
    fn id(&self) -> Id {
        self.id.clone()
    }

    fn display_name(&self) -> String {
        self.display_name.clone()
    }

    fn runnable(&self) -> Runnable {
        self.runnable.clone()
    }

    fn device(&self) -> Option<Arc<dyn Device>> {
        self.device.clone()
    }
}

/// Session-wide pass-through data.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_mode: Id,
    pub run_config_id: Id,
    pub display_name: String,
    pub runnable: Runnable,
    pub device: Option<Arc<dyn Device>>,
}

impl RunContext {
    pub fn new(run_mode: impl Into<Id>) -> Self {
        Self {
            run_mode: run_mode.into(),
            run_config_id: Id::default(),
            display_name: String::new(),
            runnable: Runnable::default(),
            device: None,
        }
    }

    /// Type of the target device, empty when no device is set.
    #[must_use]
    pub fn device_type(&self) -> Id {
        self.device
            .as_ref()
            .map(|d| d.device_type())
            .unwrap_or_default()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(NORMAL_RUN_MODE)
    }
}
