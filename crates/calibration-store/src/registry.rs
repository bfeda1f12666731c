//! Object Registry
//!
//! In-memory mapping from a logical object name to its payload. Each
//! calibrator instance owns exactly one registry; nothing here is shared.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{StoreError, StoreResult};

/// How a registered object is serialized on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SerializationKind {
    /// Opaque bincode bytes, written as `.bin`
    Binary,
    /// JSON-like data, written as `.json`
    Structured,
}

impl SerializationKind {
    pub const ALL: [SerializationKind; 2] = [SerializationKind::Binary, SerializationKind::Structured];

    pub fn extension(&self) -> &'static str {
        match self {
            SerializationKind::Binary => "bin",
            SerializationKind::Structured => "json",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "bin" => Some(SerializationKind::Binary),
            "json" => Some(SerializationKind::Structured),
            _ => None,
        }
    }
}

impl fmt::Display for SerializationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationKind::Binary => write!(f, "binary"),
            SerializationKind::Structured => write!(f, "structured"),
        }
    }
}

/// A registered value, tagged with its serialization kind
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Binary(Vec<u8>),
    Structured(serde_json::Value),
}

impl Payload {
    pub fn kind(&self) -> SerializationKind {
        match self {
            Payload::Binary(_) => SerializationKind::Binary,
            Payload::Structured(_) => SerializationKind::Structured,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub name: String,
    pub payload: Payload,
}

impl RegistryEntry {
    pub fn kind(&self) -> SerializationKind {
        self.payload.kind()
    }
}

/// Named collection of a calibrator's persistable state.
///
/// Names are unique: registering an existing name replaces the previous
/// entry, whatever its kind. Iteration is in name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry at `name`
    pub fn register(&mut self, name: impl Into<String>, payload: Payload) {
        let name = name.into();
        let entry = RegistryEntry {
            name: name.clone(),
            payload,
        };
        if let Some(previous) = self.entries.insert(name, entry) {
            tracing::debug!(
                "Registry entry '{}' overwritten ({} -> {})",
                previous.name,
                previous.kind(),
                self.entries[&previous.name].kind()
            );
        }
    }

    /// Encode `value` with bincode and register it as a binary object
    pub fn register_binary<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> StoreResult<()> {
        let name = name.into();
        let bytes = codec::encode_binary(value).map_err(|e| StoreError::Encode {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        self.register(name, Payload::Binary(bytes));
        Ok(())
    }

    /// Convert `value` to JSON and register it as a structured object
    pub fn register_structured<T: Serialize + ?Sized>(
        &mut self,
        name: impl Into<String>,
        value: &T,
    ) -> StoreResult<()> {
        let name = name.into();
        let json = serde_json::to_value(value).map_err(|e| StoreError::Encode {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        self.register(name, Payload::Structured(json));
        Ok(())
    }

    pub fn get(&self, name: &str) -> StoreResult<&RegistryEntry> {
        self.entries.get(name).ok_or_else(|| StoreError::NotFound {
            name: name.to_string(),
        })
    }

    /// Decode a binary object back into `T`
    pub fn get_binary<T: DeserializeOwned>(&self, name: &str) -> StoreResult<T> {
        match &self.get(name)?.payload {
            Payload::Binary(bytes) => codec::decode_binary(bytes).map_err(|e| StoreError::Decode {
                name: name.to_string(),
                reason: e.to_string(),
            }),
            other => Err(StoreError::KindMismatch {
                name: name.to_string(),
                expected: SerializationKind::Binary,
                found: other.kind(),
            }),
        }
    }

    /// Decode a structured object back into `T`
    pub fn get_structured<T: DeserializeOwned>(&self, name: &str) -> StoreResult<T> {
        match &self.get(name)?.payload {
            Payload::Structured(value) => {
                T::deserialize(value).map_err(|e| StoreError::Decode {
                    name: name.to_string(),
                    reason: e.to_string(),
                })
            }
            other => Err(StoreError::KindMismatch {
                name: name.to_string(),
                expected: SerializationKind::Structured,
                found: other.kind(),
            }),
        }
    }

    /// `(name, payload)` pairs of one kind, in name order
    pub fn entries_of_kind(
        &self,
        kind: SerializationKind,
    ) -> impl Iterator<Item = (&str, &Payload)> + '_ {
        self.entries
            .values()
            .filter(move |entry| entry.kind() == kind)
            .map(|entry| (entry.name.as_str(), &entry.payload))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> + '_ {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<RegistryEntry> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_overwrites_previous_payload() {
        let mut registry = Registry::new();
        registry.register_structured("params", &json!({"a": 1})).unwrap();
        registry.register_structured("params", &json!({"a": 2})).unwrap();

        assert_eq!(registry.len(), 1);
        let params: serde_json::Value = registry.get_structured("params").unwrap();
        assert_eq!(params, json!({"a": 2}));
    }

    #[test]
    fn test_overwrite_can_change_kind() {
        let mut registry = Registry::new();
        registry.register_structured("table", &vec![1.0, 2.0]).unwrap();
        registry.register_binary("table", &vec![3.0f64, 4.0]).unwrap();

        assert_eq!(registry.get("table").unwrap().kind(), SerializationKind::Binary);
        assert_eq!(registry.entries_of_kind(SerializationKind::Structured).count(), 0);
    }

    #[test]
    fn test_entries_of_kind_filters_and_orders_by_name() {
        let mut registry = Registry::new();
        registry.register_binary("zeta", &1u32).unwrap();
        registry.register_structured("beta", &"x").unwrap();
        registry.register_binary("alpha", &2u32).unwrap();

        let binary: Vec<&str> = registry
            .entries_of_kind(SerializationKind::Binary)
            .map(|(name, _)| name)
            .collect();
        assert_eq!(binary, vec!["alpha", "zeta"]);

        let structured: Vec<&str> = registry
            .entries_of_kind(SerializationKind::Structured)
            .map(|(name, _)| name)
            .collect();
        assert_eq!(structured, vec!["beta"]);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let registry = Registry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(StoreError::NotFound { name }) if name == "missing"
        ));
    }

    #[test]
    fn test_typed_getters_check_kind() {
        let mut registry = Registry::new();
        registry.register_binary("weights", &vec![(0.1f64, 0.2f64)]).unwrap();

        let weights: Vec<(f64, f64)> = registry.get_binary("weights").unwrap();
        assert_eq!(weights, vec![(0.1, 0.2)]);

        let err = registry.get_structured::<serde_json::Value>("weights").unwrap_err();
        assert!(matches!(
            err,
            StoreError::KindMismatch {
                expected: SerializationKind::Structured,
                found: SerializationKind::Binary,
                ..
            }
        ));
    }

    #[test]
    fn test_structured_rejects_non_string_map_keys() {
        use std::collections::HashMap;

        let mut registry = Registry::new();
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1.0f64);

        let err = registry.register_structured("bad", &map).unwrap_err();
        assert!(matches!(err, StoreError::Encode { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_extension_round_trip() {
        for kind in SerializationKind::ALL {
            assert_eq!(SerializationKind::from_extension(kind.extension()), Some(kind));
        }
        assert_eq!(SerializationKind::from_extension("pkl"), None);
    }
}
