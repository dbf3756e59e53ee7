//! MessagePack adapter using `rmp-serde`.
//!
//! Blobs use the native `bin` family, strings the `str` family.

use crate::codec::ValueCodec;
use crate::error::{CodecError, Result};
use crate::format::Format;
use crate::value::Value;

/// MessagePack value adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl ValueCodec for MsgPackCodec {
    fn format(&self) -> Format {
        Format::MsgPack
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        rmp_serde::to_vec(value).map_err(|err| CodecError::encode(Format::MsgPack, err))
    }

    fn decode(&self, payload: &[u8]) -> Result<Value> {
        rmp_serde::from_slice(payload).map_err(|err| CodecError::decode(Format::MsgPack, err))
    }
}
