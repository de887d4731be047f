//! Payload serialization.
//!
//! Converts state values to compact JSON bytes and back, with optional
//! zlib compression for payloads where it helps.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::{DecodeError, EncodeError};

/// First byte of a zlib stream with a 32K window (RFC 1950 CMF). No JSON
/// document starts with this byte, so it doubles as the compression marker.
const ZLIB_MAGIC: u8 = 0x78;

/// Inflated payloads larger than this are rejected outright.
const MAX_INFLATED_LEN: usize = 1024 * 1024;

/// Serializes values to compact JSON bytes and back.
///
/// Output is canonical: map keys come out sorted and struct fields in
/// declaration order, so equal values always produce identical bytes. With
/// compression enabled, payloads are deflated only when that actually makes
/// them smaller; decoding sniffs the marker byte, so either side of the
/// toggle reads the other's output.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    compression: Option<Compression>,
}

impl JsonSerializer {
    /// Creates a serializer without compression.
    #[must_use]
    pub fn new() -> Self {
        Self { compression: None }
    }

    /// Enables zlib compression at the given level; levels above 9 are
    /// clamped to 9.
    #[must_use]
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = Some(Compression::new(level.min(9)));
        self
    }

    /// Serializes a value to payload bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Serialization`] when the value cannot be
    /// represented as JSON (e.g. a map with non-string keys).
    pub fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, EncodeError> {
        let json =
            serde_json::to_vec(value).map_err(|e| EncodeError::Serialization(e.to_string()))?;
        if let Some(level) = self.compression {
            let compressed = deflate(&json, level);
            if compressed.len() < json.len() {
                return Ok(compressed);
            }
        }
        Ok(json)
    }

    /// Deserializes payload bytes produced by [`dumps`](Self::dumps).
    ///
    /// Safe on arbitrary input; compressed payloads are inflated under a
    /// hard size cap first.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Deserialization`] for corrupt zlib data, a
    /// payload inflating past the cap, or JSON that does not match `T`.
    pub fn loads<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, DecodeError> {
        let inflated;
        let json = if bytes.first() == Some(&ZLIB_MAGIC) {
            inflated = inflate(bytes)?;
            &inflated[..]
        } else {
            bytes
        };
        serde_json::from_slice(json).map_err(|e| DecodeError::Deserialization(e.to_string()))
    }
}

fn deflate(bytes: &[u8], level: Compression) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), level);
    encoder
        .write_all(bytes)
        .expect("zlib compression to memory cannot fail");
    encoder
        .finish()
        .expect("zlib compression to memory cannot fail")
}

fn inflate(bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    let mut decoder = ZlibDecoder::new(bytes).take(MAX_INFLATED_LEN as u64 + 1);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Deserialization(format!("zlib inflate failed: {e}")))?;
    if out.len() > MAX_INFLATED_LEN {
        return Err(DecodeError::Deserialization(
            "inflated payload exceeds size cap".to_string(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        visits: u32,
        beta: bool,
    }

    #[test]
    fn test_value_tree_roundtrip() {
        let serializer = JsonSerializer::new();
        let value = json!({
            "user": "amy",
            "visits": 3,
            "ratio": 0.5,
            "flags": [true, false, null],
            "nested": {"a": 1, "b": "two"},
        });

        let bytes = serializer.dumps(&value).unwrap();
        let back: Value = serializer.loads(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_struct_roundtrip() {
        let serializer = JsonSerializer::new();
        let prefs = Prefs {
            theme: "dark".to_string(),
            visits: 7,
            beta: true,
        };

        let bytes = serializer.dumps(&prefs).unwrap();
        let back: Prefs = serializer.loads(&bytes).unwrap();
        assert_eq!(back, prefs);
    }

    #[test]
    fn test_canonical_key_order() {
        let serializer = JsonSerializer::new();
        let a: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"m": 3, "a": 2, "z": 1}"#).unwrap();
        assert_eq!(serializer.dumps(&a).unwrap(), serializer.dumps(&b).unwrap());
    }

    #[test]
    fn test_compression_only_when_smaller() {
        let plain = JsonSerializer::new();
        let compressing = JsonSerializer::new().with_compression(6);

        // Too small to benefit, so the output stays plain JSON.
        let small = json!(1);
        assert_eq!(
            compressing.dumps(&small).unwrap(),
            plain.dumps(&small).unwrap()
        );

        let large = json!({ "blob": "a".repeat(4096) });
        let compressed = compressing.dumps(&large).unwrap();
        let uncompressed = plain.dumps(&large).unwrap();
        assert_eq!(compressed.first(), Some(&ZLIB_MAGIC));
        assert!(compressed.len() < uncompressed.len());
    }

    #[test]
    fn test_compression_level_clamped() {
        let value = json!({ "blob": "a".repeat(4096) });
        let nine = JsonSerializer::new().with_compression(9);
        let clamped = JsonSerializer::new().with_compression(u32::MAX);

        let bytes = clamped.dumps(&value).unwrap();
        assert_eq!(bytes, nine.dumps(&value).unwrap());
        let back: Value = clamped.loads(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_sniffing_reads_either_encoding() {
        let plain = JsonSerializer::new();
        let compressing = JsonSerializer::new().with_compression(6);
        let value = json!({ "blob": "a".repeat(4096) });

        let compressed = compressing.dumps(&value).unwrap();
        let uncompressed = plain.dumps(&value).unwrap();

        let a: Value = plain.loads(&compressed).unwrap();
        let b: Value = compressing.loads(&uncompressed).unwrap();
        assert_eq!(a, value);
        assert_eq!(b, value);
    }

    #[test]
    fn test_non_string_map_keys_rejected() {
        let serializer = JsonSerializer::new();
        let map = HashMap::from([(vec![1u8, 2], 7u32)]);
        assert!(matches!(
            serializer.dumps(&map),
            Err(EncodeError::Serialization(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let serializer = JsonSerializer::new();
        assert!(matches!(
            serializer.loads::<Value>(b"\xffnot json"),
            Err(DecodeError::Deserialization(_))
        ));
        assert!(matches!(
            serializer.loads::<Value>(b"{\"open\":"),
            Err(DecodeError::Deserialization(_))
        ));
        assert!(matches!(
            serializer.loads::<Value>(&[ZLIB_MAGIC, 0x9c, 0x00, 0x01]),
            Err(DecodeError::Deserialization(_))
        ));
    }

    #[test]
    fn test_inflation_cap() {
        let serializer = JsonSerializer::new();
        let huge = serde_json::to_vec(&json!({ "blob": "a".repeat(2 * 1024 * 1024) })).unwrap();
        let bomb = deflate(&huge, Compression::new(6));
        assert_eq!(bomb.first(), Some(&ZLIB_MAGIC));
        assert!(matches!(
            serializer.loads::<Value>(&bomb),
            Err(DecodeError::Deserialization(_))
        ));
    }
}
