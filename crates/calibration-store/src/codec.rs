//! Byte-level encodings for the two serialization kinds.
//!
//! Binary payloads are bincode with fixed-width integers and trailing bytes
//! rejected, so a truncated or padded `.bin` artifact fails to decode instead
//! of silently yielding a shorter payload. Structured payloads are JSON.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::registry::{Payload, SerializationKind};

fn binary_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .reject_trailing_bytes()
}

pub fn encode_binary<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, bincode::Error> {
    binary_options().serialize(value)
}

pub fn decode_binary<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, bincode::Error> {
    binary_options().deserialize(bytes)
}

/// Encode a payload into the exact bytes written to its artifact file.
pub(crate) fn encode_artifact(payload: &Payload, pretty_json: bool) -> Result<Vec<u8>, String> {
    match payload {
        // The file carries a length prefix ahead of the payload bytes
        Payload::Binary(bytes) => encode_binary(bytes).map_err(|e| e.to_string()),
        Payload::Structured(value) => {
            let encoded = if pretty_json {
                serde_json::to_vec_pretty(value)
            } else {
                serde_json::to_vec(value)
            };
            encoded.map_err(|e| e.to_string())
        }
    }
}

/// Decode the contents of an artifact file of the given kind.
pub(crate) fn decode_artifact(kind: SerializationKind, bytes: &[u8]) -> Result<Payload, String> {
    match kind {
        SerializationKind::Binary => decode_binary::<Vec<u8>>(bytes)
            .map(Payload::Binary)
            .map_err(|e| e.to_string()),
        SerializationKind::Structured => serde_json::from_slice(bytes)
            .map(Payload::Structured)
            .map_err(|e| e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_binary_artifact_rejects_truncation() {
        let payload = Payload::Binary(vec![1, 2, 3, 4, 5]);
        let bytes = encode_artifact(&payload, false).unwrap();

        assert!(decode_artifact(SerializationKind::Binary, &bytes[..bytes.len() - 1]).is_err());
        assert!(decode_artifact(SerializationKind::Binary, &[]).is_err());
    }

    #[test]
    fn test_binary_artifact_rejects_trailing_bytes() {
        let payload = Payload::Binary(vec![9, 8, 7]);
        let mut bytes = encode_artifact(&payload, false).unwrap();
        bytes.push(0);

        assert!(decode_artifact(SerializationKind::Binary, &bytes).is_err());
    }

    #[test]
    fn test_pretty_and_compact_json_decode_identically() {
        let payload = Payload::Structured(json!({"a": [1, 2.5, null], "b": {"c": true}}));
        let compact = encode_artifact(&payload, false).unwrap();
        let pretty = encode_artifact(&payload, true).unwrap();

        assert_ne!(compact, pretty);
        assert_eq!(
            decode_artifact(SerializationKind::Structured, &compact).unwrap(),
            decode_artifact(SerializationKind::Structured, &pretty).unwrap()
        );
    }

    #[test]
    fn test_truncated_json_fails() {
        let bytes = br#"{"platt_a": 1.5, "platt_b""#;
        assert!(decode_artifact(SerializationKind::Structured, bytes).is_err());
    }
}
