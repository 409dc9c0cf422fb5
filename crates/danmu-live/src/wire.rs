//! Live danmaku wire format.
//!
//! Every websocket binary frame carries one or more packets. Each packet is
//! a 16-byte big-endian header followed by its body. Bodies with protocol
//! version 2 (zlib) or 3 (brotli) are themselves a run of packets once
//! decompressed.
//!
//! The header is a zerocopy struct with a compile-time size guard; there is
//! no unsafe code in this module.

use std::io::Read;

use static_assertions::assert_eq_size;
use zerocopy::byteorder::{BigEndian, U16, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Header ────────────────────────────────────────────────────────────────────

/// Wire size: 16 bytes.
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, FromZeroes)]
#[repr(C)]
pub struct PacketHeader {
    /// Header plus body length.
    pub packet_len: U32<BigEndian>,
    /// Always 16 in practice; honoured when larger.
    pub header_len: U16<BigEndian>,
    /// Body encoding, see the `PROTO_*` constants.
    pub proto_ver: U16<BigEndian>,
    pub operation: U32<BigEndian>,
    /// The server ignores it; clients send 1.
    pub sequence: U32<BigEndian>,
}

assert_eq_size!(PacketHeader, [u8; 16]);

pub const HEADER_LEN: usize = 16;

/// Plain JSON body.
pub const PROTO_JSON: u16 = 0;
/// Raw integer body (heartbeat reply); also the version every client packet carries.
pub const PROTO_INT: u16 = 1;
pub const PROTO_ZLIB: u16 = 2;
pub const PROTO_BROTLI: u16 = 3;

/// Compressed bodies nest packets; deeper than this is treated as garbage.
const MAX_NESTING: usize = 4;

/// Upper bound on one decompressed body.
pub const MAX_INFLATED: usize = 16 * 1024 * 1024;

// ── Operations ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Operation {
    Heartbeat = 2,
    HeartbeatReply = 3,
    /// Server push of one JSON command (`DANMU_MSG`, `SEND_GIFT`, ...).
    Command = 5,
    Auth = 7,
    AuthReply = 8,
}

impl TryFrom<u32> for Operation {
    type Error = WireError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Operation::Heartbeat),
            3 => Ok(Operation::HeartbeatReply),
            5 => Ok(Operation::Command),
            7 => Ok(Operation::Auth),
            8 => Ok(Operation::AuthReply),
            other => Err(WireError::UnknownOperation(other)),
        }
    }
}

// ── Packets ───────────────────────────────────────────────────────────────────

/// A decoded server packet the client cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    HeartbeatReply { popularity: u32 },
    Command(serde_json::Value),
    AuthReply(serde_json::Value),
}

/// Frame one client packet: version 1, sequence 1.
pub fn encode(op: Operation, body: &[u8]) -> Vec<u8> {
    let header = PacketHeader {
        packet_len: U32::new((HEADER_LEN + body.len()) as u32),
        header_len: U16::new(HEADER_LEN as u16),
        proto_ver: U16::new(PROTO_INT),
        operation: U32::new(op as u32),
        sequence: U32::new(1),
    };
    let mut buf = Vec::with_capacity(HEADER_LEN + body.len());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(body);
    buf
}

/// Decode every packet in a frame, expanding compressed bodies in place.
/// Operations the client does not consume are skipped.
pub fn decode(frame: &[u8]) -> Result<Vec<Packet>, WireError> {
    let mut out = Vec::new();
    decode_into(frame, 0, &mut out)?;
    Ok(out)
}

fn decode_into(buf: &[u8], depth: usize, out: &mut Vec<Packet>) -> Result<(), WireError> {
    if depth > MAX_NESTING {
        return Err(WireError::TooDeep);
    }

    let mut offset = 0;
    while offset < buf.len() {
        let rest = &buf[offset..];
        let header = PacketHeader::read_from_prefix(rest).ok_or(WireError::Truncated {
            needed: HEADER_LEN,
            available: rest.len(),
        })?;

        let packet_len = header.packet_len.get() as usize;
        let header_len = header.header_len.get() as usize;
        if header_len < HEADER_LEN || packet_len < header_len {
            return Err(WireError::BadLength {
                packet_len,
                header_len,
            });
        }
        if packet_len > rest.len() {
            return Err(WireError::Truncated {
                needed: packet_len,
                available: rest.len(),
            });
        }
        let body = &rest[header_len..packet_len];

        match header.proto_ver.get() {
            PROTO_ZLIB => {
                let inner = inflate(flate2::read::ZlibDecoder::new(body), "zlib")?;
                decode_into(&inner, depth + 1, out)?;
            }
            PROTO_BROTLI => {
                let inner = inflate(brotli::Decompressor::new(body, 4096), "brotli")?;
                decode_into(&inner, depth + 1, out)?;
            }
            _ => {
                if let Some(packet) = decode_body(header.operation.get(), body)? {
                    out.push(packet);
                }
            }
        }

        offset += packet_len;
    }
    Ok(())
}

fn decode_body(operation: u32, body: &[u8]) -> Result<Option<Packet>, WireError> {
    let Ok(op) = Operation::try_from(operation) else {
        return Ok(None);
    };
    let packet = match op {
        Operation::HeartbeatReply => {
            let bytes: [u8; 4] = body
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .ok_or(WireError::Truncated {
                    needed: 4,
                    available: body.len(),
                })?;
            Packet::HeartbeatReply {
                popularity: u32::from_be_bytes(bytes),
            }
        }
        Operation::Command => Packet::Command(serde_json::from_slice(body)?),
        Operation::AuthReply => Packet::AuthReply(serde_json::from_slice(body)?),
        Operation::Heartbeat | Operation::Auth => return Ok(None),
    };
    Ok(Some(packet))
}

fn inflate(reader: impl Read, codec: &'static str) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    reader
        .take(MAX_INFLATED as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|source| WireError::Decompress { codec, source })?;
    if out.len() > MAX_INFLATED {
        return Err(WireError::TooLarge { codec });
    }
    Ok(out)
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("truncated packet: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("bad packet lengths: packet_len={packet_len} header_len={header_len}")]
    BadLength { packet_len: usize, header_len: usize },

    #[error("unknown operation: {0}")]
    UnknownOperation(u32),

    #[error("failed to decompress {codec} body: {source}")]
    Decompress {
        codec: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("compressed packets nested more than {MAX_NESTING} deep")]
    TooDeep,

    #[error("{codec} body inflates past {MAX_INFLATED} bytes")]
    TooLarge { codec: &'static str },
}

// ── Tests ─────────────────────────────────────────────────────────────────────
