//! Calibration Store
//!
//! Typed object registry and on-disk persistence for probability
//! calibrators. A calibrator registers named pieces of fitted state as
//! either binary (bincode) or structured (JSON) objects, saves them as one
//! file per object, and a fresh instance reloads them by directory scan.

pub mod codec;
pub mod config;
pub mod error;
pub mod identity;
pub mod persistence;
pub mod registry;
pub mod state;


pub use config::PersistenceConfig;
pub use error::{StoreError, StoreResult};
pub use identity::CalibratorIdentity;
pub use persistence::Persistence;
pub use registry::{Payload, Registry, RegistryEntry, SerializationKind};
pub use state::CalibratorState;
