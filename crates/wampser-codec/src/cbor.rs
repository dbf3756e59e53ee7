//! CBOR adapter using `ciborium`.
//!
//! Blobs map to CBOR byte strings (major type 2), text to text strings.

use crate::codec::ValueCodec;
use crate::error::{CodecError, Result};
use crate::format::Format;
use crate::value::Value;

/// CBOR value adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl ValueCodec for CborCodec {
    fn format(&self) -> Format {
        Format::Cbor
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        ciborium::into_writer(value, &mut out)
            .map_err(|err| CodecError::encode(Format::Cbor, err))?;
        Ok(out)
    }

    fn decode(&self, payload: &[u8]) -> Result<Value> {
        ciborium::from_reader(payload).map_err(|err| CodecError::decode(Format::Cbor, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_uses_byte_strings() {
        let encoded = CborCodec.encode(&Value::Binary(vec![9, 8])).unwrap();
        assert_eq!(encoded, vec![0x42, 9, 8]);
    }

    #[test]
    fn text_uses_text_strings() {
        let encoded = CborCodec.encode(&Value::from("a")).unwrap();
        assert_eq!(encoded, vec![0x61, b'a']);
    }

    #[test]
    fn negative_integers_roundtrip() {
        let value = Value::Integer(-123_456);
        assert_eq!(CborCodec.decode(&CborCodec.encode(&value).unwrap()).unwrap(), value);
    }

    #[test]
    fn empty_payload_is_a_decode_error() {
        assert!(matches!(CborCodec.decode(&[]), Err(CodecError::Decode { .. })));
    }
}
