use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::registry::SerializationKind;

/// Stable key for a calibrator type, used as the prefix of every artifact
/// file it writes: `<identity>-<name>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CalibratorIdentity(String);

impl CalibratorIdentity {
    pub const SEPARATOR: char = '-';

    pub fn new(identity: impl Into<String>) -> StoreResult<Self> {
        let identity = identity.into();
        if identity.is_empty() || has_path_separator(&identity) {
            return Err(StoreError::InvalidIdentity(identity));
        }
        Ok(Self(identity))
    }

    /// Identity from a compile-time constant.
    ///
    /// # Panics
    ///
    /// Panics if `identity` is empty or contains a path separator.
    pub fn from_static(identity: &'static str) -> Self {
        assert!(
            !identity.is_empty() && !has_path_separator(identity),
            "invalid calibrator identity: {:?}",
            identity
        );
        Self(identity.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for an object registered under `name`
    pub fn file_name(&self, name: &str, kind: SerializationKind) -> String {
        format!("{}{}{}.{}", self.0, Self::SEPARATOR, name, kind.extension())
    }

    /// Recover `(name, kind)` from a file name written by [`file_name`].
    ///
    /// Returns `None` for files of another identity, unknown extensions,
    /// and files whose name part is empty.
    ///
    /// [`file_name`]: CalibratorIdentity::file_name
    pub fn parse_file_name<'a>(&self, file_name: &'a str) -> Option<(&'a str, SerializationKind)> {
        let rest = file_name
            .strip_prefix(self.0.as_str())?
            .strip_prefix(Self::SEPARATOR)?;
        let (name, ext) = rest.rsplit_once('.')?;
        let kind = SerializationKind::from_extension(ext)?;
        if name.is_empty() {
            return None;
        }
        Some((name, kind))
    }
}

pub(crate) fn has_path_separator(s: &str) -> bool {
    s.contains('/') || s.contains('\\')
}

impl fmt::Display for CalibratorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CalibratorIdentity {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CalibratorIdentity {
    type Error = StoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CalibratorIdentity> for String {
    fn from(identity: CalibratorIdentity) -> Self {
        identity.0
    }
}

impl AsRef<str> for CalibratorIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_validation() {
        assert!(CalibratorIdentity::new("isotonic_regression").is_ok());
        assert!(matches!(
            CalibratorIdentity::new(""),
            Err(StoreError::InvalidIdentity(_))
        ));
        assert!(CalibratorIdentity::new("../escape").is_err());
        assert!(CalibratorIdentity::new("a\\b").is_err());
    }

    #[test]
    #[should_panic(expected = "invalid calibrator identity")]
    fn test_from_static_panics_on_separator() {
        CalibratorIdentity::from_static("a/b");
    }

    #[test]
    fn test_file_name_grammar() {
        let id = CalibratorIdentity::new("platt").unwrap();
        assert_eq!(id.file_name("params", SerializationKind::Structured), "platt-params.json");
        assert_eq!(id.file_name("table", SerializationKind::Binary), "platt-table.bin");
    }

    #[test]
    fn test_parse_file_name() {
        let id = CalibratorIdentity::new("platt").unwrap();

        assert_eq!(
            id.parse_file_name("platt-params.json"),
            Some(("params", SerializationKind::Structured))
        );
        // Only the leading prefix and trailing extension are stripped
        assert_eq!(
            id.parse_file_name("platt-platt-x.bin.bin"),
            Some(("platt-x.bin", SerializationKind::Binary))
        );
        assert_eq!(id.parse_file_name("platt-params.pkl"), None);
        assert_eq!(id.parse_file_name("platt-.json"), None);
        assert_eq!(id.parse_file_name("platt.json"), None);
        assert_eq!(id.parse_file_name("platt_scaling-params.json"), None);
        assert_eq!(id.parse_file_name("other-params.json"), None);
    }

    #[test]
    fn test_serde_rejects_invalid_identity() {
        let ok: CalibratorIdentity = serde_json::from_str("\"temperature\"").unwrap();
        assert_eq!(ok.as_str(), "temperature");
        assert!(serde_json::from_str::<CalibratorIdentity>("\"\"").is_err());
    }
}
