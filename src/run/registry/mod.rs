// runctl: Run session orchestration engine
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Worker factories and their registry.
//!
//! ```text
//! WorkerFactoryRegistry (populated at startup, read-only afterwards)
//!   [WorkerFactory]
//!     run_modes     must contain the mode
//!     run_configs   empty = any, else prefix match on run config id
//!     device_types  empty = any, else must contain the device type
//!     producer      Fn(&mut RunControl) -> RunResult<WorkerId>
//!
//! find_main()      exactly one match, else NoMatchingFactory / AmbiguousFactories
//! find_auxiliary() first match for (worker id as mode, device, ""), or None
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{RegistryError, RunResult};
use crate::run::control::RunControl;
use crate::run::ids::Id;
use crate::run::worker::WorkerId;

/// Builds a worker inside a session.
pub type Producer = Arc<dyn Fn(&mut RunControl) -> RunResult<WorkerId> + Send + Sync>;

/// Describes when and how to construct one kind of worker.
#[derive(Clone)]
pub struct WorkerFactory {
    name: String,
    producer: Option<Producer>,
    run_modes: Vec<Id>,
    run_configs: Vec<Id>,
    device_types: Vec<Id>,
}

impl WorkerFactory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            producer: None,
            run_modes: Vec::new(),
            run_configs: Vec::new(),
            device_types: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_producer<F>(&mut self, producer: F) -> &mut Self
    where
        F: Fn(&mut RunControl) -> RunResult<WorkerId> + Send + Sync + 'static,
    {
        self.producer = Some(Arc::new(producer));
        self
    }

    pub fn add_supported_run_mode(&mut self, run_mode: impl Into<Id>) -> &mut Self {
        self.run_modes.push(run_mode.into());
        self
    }

    /// Run configuration ids are matched as prefixes.
    pub fn add_supported_run_config(&mut self, run_config: impl Into<Id>) -> &mut Self {
        self.run_configs.push(run_config.into());
        self
    }

    pub fn add_supported_device_type(&mut self, device_type: impl Into<Id>) -> &mut Self {
        self.device_types.push(device_type.into());
        self
    }

    #[must_use]
    pub fn run_modes(&self) -> &[Id] {
        &self.run_modes
    }

    #[must_use]
    pub fn run_configs(&self) -> &[Id] {
        &self.run_configs
    }

    #[must_use]
    pub fn device_types(&self) -> &[Id] {
        &self.device_types
    }

    /// Whether this factory feels responsible for the combination.
    #[must_use]
    pub fn can_run(&self, run_mode: &Id, device_type: &Id, run_config_id: &str) -> bool {
        self.run_modes.contains(run_mode)
            && (self.run_configs.is_empty()
                || self
                    .run_configs
                    .iter()
                    .any(|prefix| run_config_id.starts_with(prefix.as_str())))
            && (self.device_types.is_empty() || self.device_types.contains(device_type))
    }

    /// Runs the producer against `control`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::ProducerFailed` if no producer was set, or the
    /// producer's own error.
    pub fn produce(&self, control: &mut RunControl) -> RunResult<WorkerId> {
        let producer = self.producer.as_ref().ok_or_else(|| RegistryError::ProducerFailed {
            message: format!("factory '{}' has no producer", self.name),
        })?;
        producer(control)
    }
}

impl fmt::Debug for WorkerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerFactory")
            .field("name", &self.name)
            .field("has_producer", &self.producer.is_some())
            .field("run_modes", &self.run_modes)
            .field("run_configs", &self.run_configs)
            .field("device_types", &self.device_types)
            .finish()
    }
}

/// The set of factories sessions are assembled from.
#[derive(Debug, Clone, Default)]
pub struct WorkerFactoryRegistry {
    factories: Vec<WorkerFactory>,
}

impl WorkerFactoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: WorkerFactory) -> &mut Self {
        debug!(factory = factory.name(), "registered worker factory");
        self.factories.push(factory);
        self
    }

    #[must_use]
    pub fn factories(&self) -> &[WorkerFactory] {
        &self.factories
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Whether any factory can run the combination.
    #[must_use]
    pub fn can_run(&self, run_mode: &Id, device_type: &Id, run_config_id: &str) -> bool {
        self.factories
            .iter()
            .any(|f| f.can_run(run_mode, device_type, run_config_id))
    }

    /// The single factory for a session's main worker.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NoMatchingFactory` or
    /// `RegistryError::AmbiguousFactories` unless exactly one factory matches.
    pub fn find_main(
        &self,
        run_mode: &Id,
        device_type: &Id,
        run_config_id: &str,
    ) -> RunResult<&WorkerFactory> {
        let mut matching = self
            .factories
            .iter()
            .filter(|f| f.can_run(run_mode, device_type, run_config_id));
        match (matching.next(), matching.count()) {
            (Some(factory), 0) => Ok(factory),
            (None, _) => Err(RegistryError::NoMatchingFactory {
                run_mode: run_mode.to_string(),
                device_type: device_type.to_string(),
                run_config: run_config_id.to_string(),
            }
            .into()),
            (Some(_), rest) => Err(RegistryError::AmbiguousFactories {
                count: rest + 1,
                run_mode: run_mode.to_string(),
                device_type: device_type.to_string(),
            }
            .into()),
        }
    }

    /// The first factory providing auxiliary worker `worker_id`, if any.
    #[must_use]
    pub fn find_auxiliary(&self, worker_id: &Id, device_type: &Id) -> Option<&WorkerFactory> {
        self.factories
            .iter()
            .find(|f| f.can_run(worker_id, device_type, ""))
    }

    /// Lists every registered (mode, device, run config) combination.
    ///
    /// Wildcards print as `*`.
    #[must_use]
    pub fn dump_all(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for factory in &self.factories {
            let devices = ids_or_wildcard(&factory.device_types);
            let configs = ids_or_wildcard(&factory.run_configs);
            for mode in &factory.run_modes {
                for device in &devices {
                    for config in &configs {
                        let line = format!("{mode}  {device}  {config}  -> {}", factory.name);
                        debug!("{line}");
                        lines.push(line);
                    }
                }
            }
        }
        lines
    }
}

fn ids_or_wildcard(ids: &[Id]) -> Vec<String> {
    if ids.is_empty() {
        vec!["*".to_string()]
    } else {
        ids.iter().map(ToString::to_string).collect()
    }
}
