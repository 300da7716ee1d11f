//! Byte-level codec: JSON over UTF-8, and base64 for binary fields.
//!
//! JSON objects are emitted with sorted keys, so equal objects always
//! encode to equal bytes.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Map, Value};

use crate::error::{ProtocolError, Result};

/// JSON-encode then UTF-8-encode.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// UTF-8-decode then JSON-decode. Empty input is absent, not an error.
pub fn decode(bytes: &[u8]) -> Result<Option<Value>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let text = std::str::from_utf8(bytes)?;
    Ok(Some(serde_json::from_str(text)?))
}

/// Encode a JSON object.
pub fn encode_object(object: Map<String, Value>) -> Result<Vec<u8>> {
    encode(&Value::Object(object))
}

/// Decode bytes that must hold a JSON object.
pub fn decode_object(bytes: &[u8]) -> Result<Option<Map<String, Value>>> {
    match decode(bytes)? {
        None => Ok(None),
        Some(Value::Object(object)) => Ok(Some(object)),
        Some(_) => Err(ProtocolError::NotAnObject),
    }
}

/// Standard base64 with padding.
pub fn base64_encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard base64.
pub fn base64_decode(text: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encode_sorts_keys() {
        let bytes = encode(&json!({ "T": 1, "C": "hi" })).unwrap();

        assert_eq!(bytes, br#"{"C":"hi","T":1}"#);
    }

    #[test]
    fn empty_input_is_absent() {
        assert!(decode(b"").unwrap().is_none());
        assert!(decode_object(b"").unwrap().is_none());
    }

    #[test]
    fn invalid_utf8_rejected() {
        assert!(matches!(decode(&[0xFF, 0xFE]), Err(ProtocolError::Utf8(_))));
    }

    #[test]
    fn non_object_rejected() {
        assert!(matches!(decode_object(b"[1,2]"), Err(ProtocolError::NotAnObject)));
    }

    #[test]
    fn base64_roundtrip() {
        assert_eq!(base64_encode(b"hi"), "aGk=");
        assert_eq!(base64_decode("aGk=").unwrap(), b"hi");
        assert!(base64_decode("not base64!").is_err());
    }
}
