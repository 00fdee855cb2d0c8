//! Pluggable value serialization

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::SessionError;

/// Turns values into bytes and back before they are encrypted and signed.
///
/// Implementations must be deterministic and round-trippable.
pub trait Serializer: Send + Sync + 'static {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SessionError>;

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SessionError>;
}

/// JSON via serde_json (default)
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SessionError> {
        serde_json::to_vec(value).map_err(|e| SessionError::SerializationError(e.to_string()))
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SessionError> {
        serde_json::from_slice(bytes)
            .map_err(|e| SessionError::DeserializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_json_rejects_garbage() {
        let err = JsonSerializer
            .deserialize::<HashMap<String, i32>>(b"{not json")
            .unwrap_err();
        assert!(matches!(err, SessionError::DeserializationError(_)));
    }

    #[test]
    fn test_json_reports_serialization_failure() {
        // JSON object keys must be strings
        let mut map = HashMap::new();
        map.insert((1, 2), "tuple key");
        let err = JsonSerializer.serialize(&map).unwrap_err();
        assert!(matches!(err, SessionError::SerializationError(_)));
    }
}
