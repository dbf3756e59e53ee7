//! Codec-neutral values and wire-format adapters for WAMP payloads.
//!
//! Messages marshal to a [`Value`] tree; a [`ValueCodec`] turns that tree
//! into bytes for one wire format:
//! - JSON (text frames, binary blobs wrapped as NUL-prefixed base64 strings)
//! - MessagePack (binary frames, native `bin`)
//! - CBOR (binary frames, native byte strings)
//! - UBJSON (binary frames, blobs as typed `uint8` arrays)
//!
//! [`WireCodec`] adds the batched framing mode, where one transport payload
//! carries zero or more records.

pub mod cbor;
pub mod codec;
pub mod error;
pub mod format;
pub mod json;
pub mod msgpack;
pub mod ubjson;
pub mod value;

pub use cbor::CborCodec;
pub use codec::{
    codec_for, encode_record, split_records, ValueCodec, WireCodec, DEFAULT_MAX_RECORD,
    RECORD_PREFIX_SIZE,
};
pub use error::{CodecError, Result};
pub use format::{BatchFraming, Format, RECORD_SEPARATOR};
pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
pub use ubjson::UbjsonCodec;
pub use value::{Dict, Value};
