//! Supported wire formats.
//!
//! Each format has a stable serializer ID used in WebSocket subprotocol names
//! (`wamp.2.<id>` and `wamp.2.<id>.batched`) and a RawSocket serializer number.

use std::fmt;

/// JSON serializer ID.
pub const JSON: &str = "json";

/// MessagePack serializer ID.
pub const MSGPACK: &str = "msgpack";

/// CBOR serializer ID.
pub const CBOR: &str = "cbor";

/// UBJSON serializer ID.
pub const UBJSON: &str = "ubjson";

/// Prefix shared by all WAMP v2 WebSocket subprotocols.
pub const SUBPROTOCOL_PREFIX: &str = "wamp.2.";

/// Suffix marking the batched variant of a subprotocol.
pub const BATCHED_SUFFIX: &str = ".batched";

/// A wire format understood by the codec layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    Json,
    MsgPack,
    Cbor,
    Ubjson,
}

/// How a batched payload separates its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFraming {
    /// Each record is followed by a single separator byte.
    Delimited(u8),
    /// Each record is preceded by a 4-byte big-endian length.
    LengthPrefixed,
}

/// ASCII record separator used by batched JSON.
pub const RECORD_SEPARATOR: u8 = 0x1e;

impl Format {
    /// All formats, in RawSocket serializer order.
    pub const ALL: [Format; 4] = [Format::Json, Format::MsgPack, Format::Cbor, Format::Ubjson];

    /// Stable serializer ID.
    pub fn id(self) -> &'static str {
        match self {
            Format::Json => JSON,
            Format::MsgPack => MSGPACK,
            Format::Cbor => CBOR,
            Format::Ubjson => UBJSON,
        }
    }

    /// Serializer number used in the RawSocket handshake.
    pub fn rawsocket_id(self) -> u8 {
        match self {
            Format::Json => 1,
            Format::MsgPack => 2,
            Format::Cbor => 3,
            Format::Ubjson => 4,
        }
    }

    /// MIME type for the plain payload.
    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::MsgPack => "application/x-msgpack",
            Format::Cbor => "application/cbor",
            Format::Ubjson => "application/ubjson",
        }
    }

    /// Whether payloads travel in binary transport frames.
    pub fn is_binary(self) -> bool {
        !matches!(self, Format::Json)
    }

    /// Whether binary blobs are encoded natively rather than wrapped.
    pub fn supports_native_binary(self) -> bool {
        !matches!(self, Format::Json)
    }

    /// Record framing used in batched mode.
    pub fn batch_framing(self) -> BatchFraming {
        match self {
            Format::Json => BatchFraming::Delimited(RECORD_SEPARATOR),
            Format::MsgPack | Format::Cbor | Format::Ubjson => BatchFraming::LengthPrefixed,
        }
    }

    /// WebSocket subprotocol name.
    pub fn subprotocol(self, batched: bool) -> String {
        if batched {
            format!("{SUBPROTOCOL_PREFIX}{}{BATCHED_SUFFIX}", self.id())
        } else {
            format!("{SUBPROTOCOL_PREFIX}{}", self.id())
        }
    }

    /// Look up a format by serializer ID.
    pub fn from_id(id: &str) -> Option<Format> {
        match id {
            JSON => Some(Format::Json),
            MSGPACK => Some(Format::MsgPack),
            CBOR => Some(Format::Cbor),
            UBJSON => Some(Format::Ubjson),
            _ => None,
        }
    }

    /// Look up a format by RawSocket serializer number.
    pub fn from_rawsocket_id(id: u8) -> Option<Format> {
        Format::ALL.into_iter().find(|f| f.rawsocket_id() == id)
    }

    /// Parse a serializer name such as `cbor` or `json.batched`.
    ///
    /// Returns the format and whether the batched variant was requested.
    pub fn parse_serializer(name: &str) -> Option<(Format, bool)> {
        match name.strip_suffix(BATCHED_SUFFIX) {
            Some(id) => Format::from_id(id).map(|f| (f, true)),
            None => Format::from_id(name).map(|f| (f, false)),
        }
    }

    /// Parse a WebSocket subprotocol such as `wamp.2.msgpack.batched`.
    pub fn from_subprotocol(subprotocol: &str) -> Option<(Format, bool)> {
        subprotocol
            .strip_prefix(SUBPROTOCOL_PREFIX)
            .and_then(Format::parse_serializer)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subprotocol_names() {
        assert_eq!(Format::Json.subprotocol(false), "wamp.2.json");
        assert_eq!(Format::Cbor.subprotocol(true), "wamp.2.cbor.batched");
    }

    #[test]
    fn subprotocol_lookup() {
        assert_eq!(
            Format::from_subprotocol("wamp.2.msgpack.batched"),
            Some((Format::MsgPack, true))
        );
        assert_eq!(
            Format::from_subprotocol("wamp.2.json"),
            Some((Format::Json, false))
        );
        assert_eq!(
            Format::from_subprotocol("wamp.2.ubjson"),
            Some((Format::Ubjson, false))
        );
        assert_eq!(Format::from_subprotocol("wamp.2.flatbuffers"), None);
        assert_eq!(Format::from_subprotocol("json"), None);
    }

    #[test]
    fn rawsocket_ids_roundtrip() {
        for format in Format::ALL {
            assert_eq!(Format::from_rawsocket_id(format.rawsocket_id()), Some(format));
        }
        assert_eq!(Format::from_rawsocket_id(0), None);
    }

    #[test]
    fn only_json_is_text() {
        assert!(!Format::Json.is_binary());
        assert!(Format::MsgPack.is_binary());
        assert!(Format::Cbor.is_binary());
        assert!(Format::Ubjson.supports_native_binary());
        assert!(!Format::Json.supports_native_binary());
    }
}
