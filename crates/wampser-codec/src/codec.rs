use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::cbor::CborCodec;
use crate::error::{CodecError, Result};
use crate::format::{BatchFraming, Format};
use crate::json::JsonCodec;
use crate::msgpack::MsgPackCodec;
use crate::ubjson::UbjsonCodec;
use crate::value::Value;

/// Length prefix size for length-prefixed batch records.
pub const RECORD_PREFIX_SIZE: usize = 4;

/// Default maximum size of a single batch record: 16 MiB.
pub const DEFAULT_MAX_RECORD: usize = 16 * 1024 * 1024;

/// Converts between [`Value`] trees and the bytes of one wire format.
pub trait ValueCodec: Send + Sync {
    /// The format this adapter implements.
    fn format(&self) -> Format;

    /// Encode a single value.
    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    /// Decode a single value.
    fn decode(&self, payload: &[u8]) -> Result<Value>;

    /// Whether the format's native payload type is binary.
    fn is_binary(&self) -> bool {
        self.format().is_binary()
    }

    /// Whether blobs pass through natively rather than via a wrapper encoding.
    fn supports_native_binary(&self) -> bool {
        self.format().supports_native_binary()
    }
}

/// Build the adapter for a format.
pub fn codec_for(format: Format) -> Box<dyn ValueCodec> {
    match format {
        Format::Json => Box::new(JsonCodec),
        Format::MsgPack => Box::new(MsgPackCodec),
        Format::Cbor => Box::new(CborCodec),
        Format::Ubjson => Box::new(UbjsonCodec),
    }
}

/// A value adapter plus batching mode: the unit that produces transport payloads.
pub struct WireCodec {
    codec: Box<dyn ValueCodec>,
    batched: bool,
    max_record: usize,
}

impl WireCodec {
    /// Create a wire codec for a format.
    pub fn new(format: Format, batched: bool) -> Self {
        Self::from_codec(codec_for(format), batched)
    }

    /// Wrap an existing adapter.
    pub fn from_codec(codec: Box<dyn ValueCodec>, batched: bool) -> Self {
        Self {
            codec,
            batched,
            max_record: DEFAULT_MAX_RECORD,
        }
    }

    /// Limit the size of a single record inside a batch.
    pub fn with_max_record(mut self, max_record: usize) -> Self {
        self.max_record = max_record;
        self
    }

    pub fn format(&self) -> Format {
        self.codec.format()
    }

    pub fn is_batched(&self) -> bool {
        self.batched
    }

    /// Static frame type of the format. Batching does not change it.
    pub fn is_binary(&self) -> bool {
        self.codec.is_binary()
    }

    pub fn supports_native_binary(&self) -> bool {
        self.codec.supports_native_binary()
    }

    /// Encode one value into a payload.
    ///
    /// In batched mode the payload is a batch holding exactly one record.
    pub fn encode(&self, value: &Value) -> Result<(Bytes, bool)> {
        let record = self.codec.encode(value)?;
        if !self.batched {
            return Ok((Bytes::from(record), self.is_binary()));
        }
        let mut dst = BytesMut::with_capacity(record.len() + RECORD_PREFIX_SIZE);
        encode_record(self.format().batch_framing(), &record, &mut dst)?;
        Ok((dst.freeze(), self.is_binary()))
    }

    /// Encode several values into one batch payload.
    ///
    /// Without batching only a single value fits in a payload.
    pub fn encode_batch(&self, values: &[Value]) -> Result<(Bytes, bool)> {
        if !self.batched {
            return match values {
                [value] => self.encode(value),
                _ => Err(CodecError::encode(
                    self.format(),
                    format!("unbatched payload holds exactly one value, got {}", values.len()),
                )),
            };
        }
        let framing = self.format().batch_framing();
        let mut dst = BytesMut::new();
        for value in values {
            let record = self.codec.encode(value)?;
            encode_record(framing, &record, &mut dst)?;
        }
        Ok((dst.freeze(), self.is_binary()))
    }

    /// Decode a payload into its values.
    ///
    /// Unbatched payloads always yield exactly one value; batches yield zero or more.
    pub fn decode(&self, payload: &[u8]) -> Result<Vec<Value>> {
        if !self.batched {
            return Ok(vec![self.codec.decode(payload)?]);
        }
        let records = split_records(self.format().batch_framing(), payload, self.max_record)?;
        trace!(format = %self.format(), records = records.len(), "split batch payload");
        records
            .into_iter()
            .map(|record| self.codec.decode(record))
            .collect()
    }
}

impl std::fmt::Debug for WireCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireCodec")
            .field("format", &self.format())
            .field("batched", &self.batched)
            .field("max_record", &self.max_record)
            .finish()
    }
}

/// Append one framed record to a batch.
///
/// Length-prefixed wire format:
/// ```text
/// ┌──────────────┬──────────────────┐
/// │ Length       │ Record           │
/// │ (4B BE)      │ (Length bytes)   │
/// └──────────────┴──────────────────┘
/// ```
/// Delimited records are followed by the separator byte instead.
pub fn encode_record(framing: BatchFraming, record: &[u8], dst: &mut BytesMut) -> Result<()> {
    match framing {
        BatchFraming::Delimited(separator) => {
            dst.reserve(record.len() + 1);
            dst.put_slice(record);
            dst.put_u8(separator);
        }
        BatchFraming::LengthPrefixed => {
            if record.len() > u32::MAX as usize {
                return Err(CodecError::RecordTooLarge {
                    size: record.len(),
                    max: u32::MAX as usize,
                });
            }
            dst.reserve(RECORD_PREFIX_SIZE + record.len());
            dst.put_u32(record.len() as u32);
            dst.put_slice(record);
        }
    }
    Ok(())
}

/// Split a batch payload into its records.
///
/// An empty payload is an empty batch.
pub fn split_records(
    framing: BatchFraming,
    payload: &[u8],
    max_record: usize,
) -> Result<Vec<&[u8]>> {
    let mut records = Vec::new();
    match framing {
        BatchFraming::Delimited(separator) => {
            let mut rest = payload;
            while !rest.is_empty() {
                let Some(end) = rest.iter().position(|b| *b == separator) else {
                    return Err(CodecError::UnterminatedRecord {
                        trailing: rest.len(),
                    });
                };
                if end > max_record {
                    return Err(CodecError::RecordTooLarge {
                        size: end,
                        max: max_record,
                    });
                }
                records.push(&rest[..end]);
                rest = &rest[end + 1..];
            }
        }
        BatchFraming::LengthPrefixed => {
            let mut rest = payload;
            while !rest.is_empty() {
                if rest.len() < RECORD_PREFIX_SIZE {
                    return Err(CodecError::TruncatedBatch {
                        needed: RECORD_PREFIX_SIZE,
                        available: rest.len(),
                    });
                }
                let len = rest.get_u32() as usize;
                if len > max_record {
                    return Err(CodecError::RecordTooLarge {
                        size: len,
                        max: max_record,
                    });
                }
                if rest.len() < len {
                    return Err(CodecError::TruncatedBatch {
                        needed: len,
                        available: rest.len(),
                    });
                }
                records.push(&rest[..len]);
                rest = &rest[len..];
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::RECORD_SEPARATOR;

    fn sample() -> Value {
        Value::List(vec![Value::from(48), Value::from("com.myapp.procedure1")])
    }

    #[test]
    fn unbatched_decode_yields_one_value() {
        for format in Format::ALL {
            let codec = WireCodec::new(format, false);
            let (payload, binary) = codec.encode(&sample()).unwrap();
            assert_eq!(binary, format.is_binary());
            assert_eq!(codec.decode(&payload).unwrap(), vec![sample()]);
        }
    }

    #[test]
    fn batched_encode_emits_single_record() {
        for format in Format::ALL {
            let codec = WireCodec::new(format, true);
            let (payload, _) = codec.encode(&sample()).unwrap();
            let records =
                split_records(format.batch_framing(), &payload, DEFAULT_MAX_RECORD).unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(codec.decode(&payload).unwrap(), vec![sample()]);
        }
    }

    #[test]
    fn batching_does_not_change_frame_type() {
        for format in Format::ALL {
            assert_eq!(
                WireCodec::new(format, true).is_binary(),
                WireCodec::new(format, false).is_binary()
            );
        }
    }

    #[test]
    fn json_batch_records_end_with_separator() {
        let codec = WireCodec::new(Format::Json, true);
        let (payload, _) = codec.encode(&Value::from(1)).unwrap();
        assert_eq!(payload.as_ref(), &[b'1', RECORD_SEPARATOR]);
    }

    #[test]
    fn length_prefix_is_big_endian() {
        let codec = WireCodec::new(Format::MsgPack, true);
        let (payload, _) = codec.encode(&Value::from(1)).unwrap();
        assert_eq!(payload.as_ref(), &[0, 0, 0, 1, 0x01]);
    }

    #[test]
    fn empty_batch_decodes_to_nothing() {
        for format in Format::ALL {
            let codec = WireCodec::new(format, true);
            assert!(codec.decode(&[]).unwrap().is_empty());
        }
    }

    #[test]
    fn multi_record_batch() {
        for format in Format::ALL {
            let codec = WireCodec::new(format, true);
            let values = vec![Value::from(1), Value::from("two"), Value::Binary(vec![3])];
            let (payload, _) = codec.encode_batch(&values).unwrap();
            assert_eq!(codec.decode(&payload).unwrap(), values);
        }
    }

    #[test]
    fn unbatched_encode_batch_requires_one_value() {
        let codec = WireCodec::new(Format::Cbor, false);
        assert!(codec.encode_batch(&[]).is_err());
        assert!(codec.encode_batch(&[Value::Null]).is_ok());
    }

    #[test]
    fn truncated_length_prefixed_batch() {
        let payload = [0u8, 0, 0, 5, 1, 2];
        let result = split_records(BatchFraming::LengthPrefixed, &payload, DEFAULT_MAX_RECORD);
        assert!(matches!(
            result,
            Err(CodecError::TruncatedBatch {
                needed: 5,
                available: 2
            })
        ));

        let result = split_records(BatchFraming::LengthPrefixed, &[0, 0], DEFAULT_MAX_RECORD);
        assert!(matches!(result, Err(CodecError::TruncatedBatch { .. })));
    }

    #[test]
    fn unterminated_delimited_record() {
        let payload = b"[1]\x1e[2]";
        let result = split_records(
            BatchFraming::Delimited(RECORD_SEPARATOR),
            payload,
            DEFAULT_MAX_RECORD,
        );
        assert!(matches!(
            result,
            Err(CodecError::UnterminatedRecord { trailing: 3 })
        ));
    }

    #[test]
    fn record_size_limit() {
        let codec = WireCodec::new(Format::Cbor, true).with_max_record(2);
        let (payload, _) = WireCodec::new(Format::Cbor, true)
            .encode(&Value::from("too long"))
            .unwrap();
        assert!(matches!(
            codec.decode(&payload),
            Err(CodecError::RecordTooLarge { .. })
        ));
    }
}
