//! Packet handles.
//!
//! The queue never interprets payload — it only ever needs a byte count.
//! Keeping that contract as a trait (rather than baking in a concrete
//! packet type) lets a host reuse whatever packet representation its
//! surrounding simulator or device layer already has.

/// Anything the RED core can size and therefore queue.
pub trait Packet {
    /// Size of this packet in bytes, as counted by the queue's byte-mode
    /// accounting and by `modify_p`'s byte-mode probability scaling.
    fn size_bytes(&self) -> u32;
}

/// A minimal packet: an opaque payload plus its byte length, for callers
/// that don't already have their own packet type implementing [`Packet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedPacket {
    payload: bytes::Bytes,
}

impl SizedPacket {
    /// Wrap a payload as a queueable packet.
    pub fn new(payload: bytes::Bytes) -> Self {
        SizedPacket { payload }
    }

    /// Borrow the underlying payload.
    pub fn payload(&self) -> &bytes::Bytes {
        &self.payload
    }

    /// Consume the wrapper, returning the payload.
    pub fn into_payload(self) -> bytes::Bytes {
        self.payload
    }
}

impl Packet for SizedPacket {
    fn size_bytes(&self) -> u32 {
        self.payload.len() as u32
    }
}
