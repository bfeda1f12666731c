use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::PersistenceConfig;
use crate::error::StoreResult;
use crate::identity::CalibratorIdentity;
use crate::persistence::Persistence;
use crate::registry::{Payload, Registry};

/// Persistable state owned by one calibrator instance: its identity, its
/// registry of named objects, and whether it has been fitted.
#[derive(Debug, Clone)]
pub struct CalibratorState {
    identity: CalibratorIdentity,
    registry: Registry,
    fit_status: bool,
    persistence: Persistence,
}

impl CalibratorState {
    pub fn new(identity: CalibratorIdentity) -> Self {
        Self::with_config(identity, PersistenceConfig::default())
    }

    pub fn with_config(identity: CalibratorIdentity, config: PersistenceConfig) -> Self {
        Self {
            identity,
            registry: Registry::new(),
            fit_status: false,
            persistence: Persistence::new(config),
        }
    }

    pub fn identity(&self) -> &CalibratorIdentity {
        &self.identity
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn fit_status(&self) -> bool {
        self.fit_status
    }

    pub fn set_fit_status(&mut self, fitted: bool) {
        self.fit_status = fitted;
    }

    pub fn register(&mut self, name: impl Into<String>, payload: Payload) {
        self.registry.register(name, payload);
    }

    pub fn register_binary<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> StoreResult<()> {
        self.registry.register_binary(name, value)
    }

    pub fn register_structured<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> StoreResult<()> {
        self.registry.register_structured(name, value)
    }

    /// Persist every registered object into `output_dir`
    pub fn save(&self, output_dir: impl AsRef<Path>) -> StoreResult<Vec<PathBuf>> {
        self.persistence.save(self, output_dir.as_ref())
    }

    /// Replace the registry with the artifacts found under `input_dir` and
    /// mark the state fitted. On error the current registry is left untouched.
    pub fn load(&mut self, input_dir: impl AsRef<Path>) -> StoreResult<()> {
        let registry = self.load_registry(input_dir)?;
        self.restore(registry);
        Ok(())
    }

    /// Read this identity's artifacts without touching the current state
    pub fn load_registry(&self, input_dir: impl AsRef<Path>) -> StoreResult<Registry> {
        self.persistence.load(&self.identity, input_dir.as_ref())
    }

    /// Adopt a previously loaded registry and mark the state fitted
    pub fn restore(&mut self, registry: Registry) {
        self.registry = registry;
        self.fit_status = true;
    }
}
