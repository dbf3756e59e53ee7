//! UBJSON adapter (Draft 12).
//!
//! Integers use the smallest marker that holds them and floats always use the
//! 64-bit `D` marker. Blobs are strongly typed `uint8` arrays (`[$U#<len>`),
//! and such arrays decode back to blobs.

use bytes::{Buf, BufMut};

use crate::codec::ValueCodec;
use crate::error::{CodecError, Result};
use crate::format::Format;
use crate::value::{Dict, Value};

/// Maximum container nesting accepted on decode.
pub const MAX_DEPTH: usize = 256;

/// Maximum element count for typed containers whose elements carry no bytes
/// (`Z`, `T`, `F`).
const MAX_EMPTY_ELEMENTS: usize = 1 << 16;

/// UBJSON value adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct UbjsonCodec;

impl ValueCodec for UbjsonCodec {
    fn format(&self) -> Format {
        Format::Ubjson
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        write_value(value, &mut out)?;
        Ok(out)
    }

    fn decode(&self, payload: &[u8]) -> Result<Value> {
        let mut reader = Reader { rest: payload };
        let marker = reader.marker()?;
        let value = reader.value(marker, 0)?;
        if !reader.rest.is_empty() {
            return Err(decode_error(format!(
                "{} trailing bytes after value",
                reader.rest.len()
            )));
        }
        Ok(value)
    }
}

fn encode_error(message: impl std::fmt::Display) -> CodecError {
    CodecError::encode(Format::Ubjson, message)
}

fn decode_error(message: impl std::fmt::Display) -> CodecError {
    CodecError::decode(Format::Ubjson, message)
}

fn write_value(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null => out.put_u8(b'Z'),
        Value::Bool(true) => out.put_u8(b'T'),
        Value::Bool(false) => out.put_u8(b'F'),
        Value::Integer(n) => write_integer(*n, out),
        Value::Float(f) => {
            out.put_u8(b'D');
            out.put_f64(*f);
        }
        Value::String(s) => {
            out.put_u8(b'S');
            write_str(s, out)?;
        }
        Value::List(items) => {
            out.put_u8(b'[');
            for item in items {
                write_value(item, out)?;
            }
            out.put_u8(b']');
        }
        Value::Map(map) => {
            out.put_u8(b'{');
            for (key, item) in map {
                write_str(key, out)?;
                write_value(item, out)?;
            }
            out.put_u8(b'}');
        }
        Value::Binary(bytes) => {
            out.put_slice(b"[$U#");
            write_length(bytes.len(), out)?;
            out.put_slice(bytes);
        }
    }
    Ok(())
}

fn write_integer(n: i64, out: &mut Vec<u8>) {
    if let Ok(v) = u8::try_from(n) {
        out.put_u8(b'U');
        out.put_u8(v);
    } else if let Ok(v) = i8::try_from(n) {
        out.put_u8(b'i');
        out.put_i8(v);
    } else if let Ok(v) = i16::try_from(n) {
        out.put_u8(b'I');
        out.put_i16(v);
    } else if let Ok(v) = i32::try_from(n) {
        out.put_u8(b'l');
        out.put_i32(v);
    } else {
        out.put_u8(b'L');
        out.put_i64(n);
    }
}

fn write_length(len: usize, out: &mut Vec<u8>) -> Result<()> {
    let len = i64::try_from(len).map_err(|_| encode_error(format!("length {len} too large")))?;
    write_integer(len, out);
    Ok(())
}

fn write_str(s: &str, out: &mut Vec<u8>) -> Result<()> {
    write_length(s.len(), out)?;
    out.put_slice(s.as_bytes());
    Ok(())
}

struct Reader<'a> {
    rest: &'a [u8],
}

impl<'a> Reader<'a> {
    fn need(&self, n: usize) -> Result<()> {
        if self.rest.len() < n {
            return Err(decode_error(format!(
                "unexpected end of payload (need {n} bytes, have {})",
                self.rest.len()
            )));
        }
        Ok(())
    }

    fn peek(&self) -> Option<u8> {
        self.rest.first().copied()
    }

    fn marker(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.rest.get_u8())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n)?;
        let (head, tail) = self.rest.split_at(n);
        self.rest = tail;
        Ok(head)
    }

    fn integer(&mut self, marker: u8) -> Result<i64> {
        let n = match marker {
            b'i' => {
                self.need(1)?;
                i64::from(self.rest.get_i8())
            }
            b'U' => {
                self.need(1)?;
                i64::from(self.rest.get_u8())
            }
            b'I' => {
                self.need(2)?;
                i64::from(self.rest.get_i16())
            }
            b'l' => {
                self.need(4)?;
                i64::from(self.rest.get_i32())
            }
            b'L' => {
                self.need(8)?;
                self.rest.get_i64()
            }
            other => {
                return Err(decode_error(format!(
                    "expected integer marker, got {}",
                    describe(other)
                )))
            }
        };
        Ok(n)
    }

    fn length(&mut self) -> Result<usize> {
        let marker = self.marker()?;
        let n = self.integer(marker)?;
        usize::try_from(n).map_err(|_| decode_error(format!("negative length {n}")))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.length()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(decode_error)
    }

    fn value(&mut self, marker: u8, depth: usize) -> Result<Value> {
        match marker {
            b'Z' => Ok(Value::Null),
            b'T' => Ok(Value::Bool(true)),
            b'F' => Ok(Value::Bool(false)),
            b'i' | b'U' | b'I' | b'l' | b'L' => Ok(Value::Integer(self.integer(marker)?)),
            b'd' => {
                self.need(4)?;
                Ok(Value::Float(f64::from(self.rest.get_f32())))
            }
            b'D' => {
                self.need(8)?;
                Ok(Value::Float(self.rest.get_f64()))
            }
            b'H' => {
                let text = self.string()?;
                if let Ok(n) = text.parse::<i64>() {
                    return Ok(Value::Integer(n));
                }
                text.parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| decode_error(format!("invalid high-precision number '{text}'")))
            }
            b'C' => {
                let byte = self.take(1)?[0];
                if !byte.is_ascii() {
                    return Err(decode_error(format!("char {byte:#04x} is not ASCII")));
                }
                Ok(Value::String(char::from(byte).to_string()))
            }
            b'S' => Ok(Value::String(self.string()?)),
            b'[' => self.array(depth + 1),
            b'{' => self.object(depth + 1),
            other => Err(decode_error(format!("unexpected marker {}", describe(other)))),
        }
    }

    /// Read the optional `$type` and `#count` that follow a container opener.
    fn container_header(&mut self) -> Result<(Option<u8>, Option<usize>)> {
        let mut kind = None;
        if self.peek() == Some(b'$') {
            self.rest.advance(1);
            kind = Some(self.marker()?);
            if self.peek() != Some(b'#') {
                return Err(decode_error("typed container without a count"));
            }
        }
        let count = if self.peek() == Some(b'#') {
            self.rest.advance(1);
            let count = self.length()?;
            let limit = match kind {
                Some(b'Z' | b'T' | b'F') => MAX_EMPTY_ELEMENTS,
                _ => self.rest.len(),
            };
            if count > limit {
                return Err(decode_error(format!(
                    "container count {count} exceeds available data"
                )));
            }
            Some(count)
        } else {
            None
        };
        Ok((kind, count))
    }

    fn array(&mut self, depth: usize) -> Result<Value> {
        check_depth(depth)?;
        let (kind, count) = self.container_header()?;
        let mut items = Vec::with_capacity(count.unwrap_or(0).min(4096));
        match (kind, count) {
            (Some(b'U'), Some(len)) => return Ok(Value::Binary(self.take(len)?.to_vec())),
            (Some(kind), Some(len)) => {
                for _ in 0..len {
                    items.push(self.value(kind, depth)?);
                }
            }
            (None, Some(len)) => {
                for _ in 0..len {
                    let marker = self.marker()?;
                    items.push(self.value(marker, depth)?);
                }
            }
            _ => loop {
                match self.marker()? {
                    b']' => break,
                    b'N' => continue,
                    marker => items.push(self.value(marker, depth)?),
                }
            },
        }
        Ok(Value::List(items))
    }

    fn object(&mut self, depth: usize) -> Result<Value> {
        check_depth(depth)?;
        let (kind, count) = self.container_header()?;
        let mut map = Dict::new();
        match count {
            Some(len) => {
                for _ in 0..len {
                    let key = self.string()?;
                    let marker = match kind {
                        Some(kind) => kind,
                        None => self.marker()?,
                    };
                    map.insert(key, self.value(marker, depth)?);
                }
            }
            None => loop {
                match self.peek() {
                    Some(b'}') => {
                        self.rest.advance(1);
                        break;
                    }
                    Some(b'N') => self.rest.advance(1),
                    _ => {
                        let key = self.string()?;
                        let marker = self.marker()?;
                        map.insert(key, self.value(marker, depth)?);
                    }
                }
            },
        }
        Ok(Value::Map(map))
    }
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(decode_error(format!("nesting deeper than {MAX_DEPTH}")));
    }
    Ok(())
}

fn describe(marker: u8) -> String {
    if marker.is_ascii_graphic() {
        format!("'{}'", char::from(marker))
    } else {
        format!("{marker:#04x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_use_smallest_marker() {
        assert_eq!(UbjsonCodec.encode(&Value::from(200)).unwrap(), vec![b'U', 200]);
        assert_eq!(UbjsonCodec.encode(&Value::from(-1)).unwrap(), vec![b'i', 0xff]);
        assert_eq!(
            UbjsonCodec.encode(&Value::from(1000)).unwrap(),
            vec![b'I', 0x03, 0xe8]
        );
        assert_eq!(
            UbjsonCodec.encode(&Value::from(123_456)).unwrap(),
            vec![b'l', 0x00, 0x01, 0xe2, 0x40]
        );
        let big = Value::Integer(1 << 53);
        assert_eq!(UbjsonCodec.encode(&big).unwrap()[0], b'L');
        assert_eq!(UbjsonCodec.decode(&UbjsonCodec.encode(&big).unwrap()).unwrap(), big);
    }

    #[test]
    fn binary_uses_typed_uint8_array() {
        let encoded = UbjsonCodec.encode(&Value::Binary(vec![1, 2])).unwrap();
        assert_eq!(encoded, b"[$U#U\x02\x01\x02".to_vec());
        assert_eq!(UbjsonCodec.decode(&encoded).unwrap(), Value::Binary(vec![1, 2]));

        let empty = UbjsonCodec.encode(&Value::Binary(vec![])).unwrap();
        assert_eq!(UbjsonCodec.decode(&empty).unwrap(), Value::Binary(vec![]));
    }

    #[test]
    fn strings_and_maps() {
        let mut map = Dict::new();
        map.insert("a".to_string(), Value::from("hi"));
        let encoded = UbjsonCodec.encode(&Value::Map(map.clone())).unwrap();
        assert_eq!(encoded, b"{U\x01aSU\x02hi}".to_vec());
        assert_eq!(UbjsonCodec.decode(&encoded).unwrap(), Value::Map(map));
    }

    #[test]
    fn floats_use_64_bit_marker() {
        let encoded = UbjsonCodec.encode(&Value::Float(1.5)).unwrap();
        assert_eq!(encoded[0], b'D');
        assert_eq!(encoded.len(), 9);
        // float32 1.5
        assert_eq!(
            UbjsonCodec.decode(&[b'd', 0x3f, 0xc0, 0x00, 0x00]).unwrap(),
            Value::Float(1.5)
        );
    }

    #[test]
    fn decodes_noops_and_counted_containers() {
        // [ N U1 N U2 ]
        let decoded = UbjsonCodec.decode(b"[NU\x01NU\x02]").unwrap();
        assert_eq!(decoded, Value::List(vec![Value::from(1), Value::from(2)]));

        // counted untyped array
        let decoded = UbjsonCodec.decode(b"[#U\x02TZ").unwrap();
        assert_eq!(decoded, Value::List(vec![Value::Bool(true), Value::Null]));

        // typed, counted object of int8 values
        let decoded = UbjsonCodec.decode(b"{$i#U\x01U\x01x\xfe").unwrap();
        let mut map = Dict::new();
        map.insert("x".to_string(), Value::from(-2));
        assert_eq!(decoded, Value::Map(map));
    }

    #[test]
    fn char_and_high_precision() {
        assert_eq!(UbjsonCodec.decode(b"Ca").unwrap(), Value::from("a"));
        assert_eq!(UbjsonCodec.decode(b"HU\x031.5").unwrap(), Value::Float(1.5));
        assert_eq!(UbjsonCodec.decode(b"HU\x0242").unwrap(), Value::from(42));
    }

    #[test]
    fn malformed_payloads_are_decode_errors() {
        assert!(matches!(UbjsonCodec.decode(&[]), Err(CodecError::Decode { .. })));
        assert!(UbjsonCodec.decode(b"SU\x05ab").is_err());
        assert!(UbjsonCodec.decode(b"[U\x01").is_err());
        assert!(UbjsonCodec.decode(b"ZZ").is_err());
        assert!(UbjsonCodec.decode(b"[$U]").is_err());
        assert!(UbjsonCodec.decode(b"Si\xff").is_err());
        assert!(UbjsonCodec.decode(b"[$U#l\x7f\xff\xff\xff").is_err());
        assert!(UbjsonCodec.decode(b"?").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = vec![b'['; MAX_DEPTH + 1];
        let err = UbjsonCodec.decode(&deep).unwrap_err();
        assert!(err.to_string().contains("nesting"));
    }
}
