//! Peer wire format: a fixed 16-byte header followed by a
//! stack-oriented payload. Values are appended at the tail and popped
//! from the tail, so readers consume them in reverse push order. All
//! integers and floats are explicit little-endian fixed-width.

use std::fmt;

use crate::error::{ErrorCode, Result};

/// Upper bound on a single payload, as a safety guard against
/// nonsense length fields.
pub const MAX_MESSAGE_SIZE: usize = 2 * 1024 * 1024; // 2 MiB

/// Serialized header length: kind u32 + size u32 + network id u64.
pub const HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageKind {
    NodeGuidRequest = 0,
    NodeGuidResponse = 1,
    AddressAmountRequest = 2,
    AddressAmountResponse = 3,
    /// Reserved; transaction relay is not dispatched by this node yet.
    TransactionBroadcast = 4,
}

impl TryFrom<u32> for MessageKind {
    type Error = ErrorCode;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(MessageKind::NodeGuidRequest),
            1 => Ok(MessageKind::NodeGuidResponse),
            2 => Ok(MessageKind::AddressAmountRequest),
            3 => Ok(MessageKind::AddressAmountResponse),
            4 => Ok(MessageKind::TransactionBroadcast),
            _ => Err(ErrorCode::ReceivedTransmittedDataInvalid),
        }
    }
}

/// Message header carried in front of every payload on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: MessageKind,
    pub size_bytes: u32,
    pub network_id: u64,
}

impl Header {
    pub fn new(kind: MessageKind, network_id: u64) -> Self {
        Self {
            kind,
            size_bytes: 0,
            network_id,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&(self.kind as u32).to_le_bytes());
        out[4..8].copy_from_slice(&self.size_bytes.to_le_bytes());
        out[8..16].copy_from_slice(&self.network_id.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(ErrorCode::ReceivedDataIncomplete);
        }

        let kind_tag = u32::from_le_bytes(bytes[0..4].try_into().expect("4 bytes"));
        let size_bytes = u32::from_le_bytes(bytes[4..8].try_into().expect("4 bytes"));
        let network_id = u64::from_le_bytes(bytes[8..16].try_into().expect("8 bytes"));

        if size_bytes as usize > MAX_MESSAGE_SIZE {
            return Err(ErrorCode::ReceivedTransmittedDataInvalid);
        }

        Ok(Self {
            kind: MessageKind::try_from(kind_tag)?,
            size_bytes,
            network_id,
        })
    }
}

/// A fixed-layout value the payload stack can carry.
pub trait WireValue: Sized {
    const SIZE: usize;
    fn write_le(&self, out: &mut Vec<u8>);
    /// `bytes` is exactly `SIZE` long.
    fn read_le(bytes: &[u8]) -> Self;
}

macro_rules! impl_wire_value {
    ($ty:ty) => {
        impl WireValue for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn write_le(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                <$ty>::from_le_bytes(bytes.try_into().expect("exact width"))
            }
        }
    };
}

impl_wire_value!(i32);
impl_wire_value!(u32);
impl_wire_value!(u64);
impl_wire_value!(f64);

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Message {
    pub fn new(kind: MessageKind, network_id: u64) -> Self {
        Self {
            header: Header::new(kind, network_id),
            payload: Vec::new(),
        }
    }

    /// Appends a fixed-layout value at the payload tail.
    pub fn push<T: WireValue>(&mut self, value: T) -> &mut Self {
        value.write_le(&mut self.payload);
        self.header.size_bytes = self.payload.len() as u32;
        self
    }

    /// Appends the string bytes, then their `u32` length. The length
    /// sits on top so a reader can pop it first.
    pub fn push_str(&mut self, value: &str) -> &mut Self {
        self.payload.extend_from_slice(value.as_bytes());
        self.push(value.len() as u32)
    }

    /// Removes and returns the value at the payload tail.
    pub fn pop<T: WireValue>(&mut self) -> Result<T> {
        if self.payload.len() < T::SIZE {
            return Err(ErrorCode::ReceivedDataIncomplete);
        }

        let offset = self.payload.len() - T::SIZE;
        let value = T::read_le(&self.payload[offset..]);
        self.payload.truncate(offset);
        self.header.size_bytes = self.payload.len() as u32;
        Ok(value)
    }

    /// Removes and returns the string at the payload tail.
    pub fn pop_string(&mut self) -> Result<String> {
        let len = self.pop::<u32>()? as usize;
        if self.payload.len() < len {
            return Err(ErrorCode::ReceivedDataIncomplete);
        }

        let offset = self.payload.len() - len;
        let bytes = self.payload.split_off(offset);
        self.header.size_bytes = self.payload.len() as u32;

        String::from_utf8(bytes).map_err(|_| ErrorCode::ReceivedTransmittedDataInvalid)
    }

    /// Non-consuming back-to-front reader over the payload.
    pub fn reader(&self) -> MessageReader<'_> {
        MessageReader {
            payload: &self.payload,
            offset: self.payload.len(),
        }
    }

    /// Header followed by payload, ready for a single socket write.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = Vec::with_capacity(HEADER_LEN + self.payload.len());
        frame.extend_from_slice(&self.header.to_bytes());
        frame.extend_from_slice(&self.payload);
        frame
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message kind={:?} size={}B network={:#018X}",
            self.header.kind, self.header.size_bytes, self.header.network_id
        )
    }
}

/// Walks a message payload from the tail toward the front, yielding
/// typed elements in reverse push order without mutating the message.
pub struct MessageReader<'a> {
    payload: &'a [u8],
    offset: usize,
}

impl MessageReader<'_> {
    pub fn has_next(&self) -> bool {
        self.offset > 0
    }

    pub fn next<T: WireValue>(&mut self) -> Result<T> {
        if self.offset < T::SIZE {
            return Err(ErrorCode::ReceivedDataIncomplete);
        }

        self.offset -= T::SIZE;
        Ok(T::read_le(&self.payload[self.offset..self.offset + T::SIZE]))
    }

    pub fn next_string(&mut self) -> Result<String> {
        let len = self.next::<u32>()? as usize;
        if self.offset < len {
            return Err(ErrorCode::ReceivedDataIncomplete);
        }

        self.offset -= len;
        let bytes = &self.payload[self.offset..self.offset + len];
        String::from_utf8(bytes.to_vec()).map_err(|_| ErrorCode::ReceivedTransmittedDataInvalid)
    }
}

/// A message tied back to the connection it arrived on. Carries the
/// connection's numeric id rather than a handle, so message processing
/// never extends a connection's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub connection_id: u32,
    pub sender_address: String,
    pub message: Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    const NET: u64 = 0x5F2C_7813_16C7_5688;

    #[test]
    fn header_layout_is_little_endian() {
        let mut header = Header::new(MessageKind::AddressAmountRequest, NET);
        header.size_bytes = 5;

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[2, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[5, 0, 0, 0]);
        assert_eq!(
            &bytes[8..16],
            &[0x88, 0x56, 0xC7, 0x16, 0x13, 0x78, 0x2C, 0x5F]
        );

        assert_eq!(Header::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn short_or_unknown_headers_rejected() {
        assert!(matches!(
            Header::from_bytes(&[0u8; 8]),
            Err(ErrorCode::ReceivedDataIncomplete)
        ));

        let mut bytes = Header::new(MessageKind::NodeGuidRequest, NET).to_bytes();
        bytes[0] = 99;
        assert!(matches!(
            Header::from_bytes(&bytes),
            Err(ErrorCode::ReceivedTransmittedDataInvalid)
        ));

        let mut oversized = Header::new(MessageKind::NodeGuidRequest, NET);
        oversized.size_bytes = (MAX_MESSAGE_SIZE + 1) as u32;
        assert!(matches!(
            Header::from_bytes(&oversized.to_bytes()),
            Err(ErrorCode::ReceivedTransmittedDataInvalid)
        ));
    }

    #[test]
    fn stack_pops_in_reverse_push_order() {
        // Seed scenario: push u32 42, "hello", u64 1; pop them back.
        let mut msg = Message::new(MessageKind::NodeGuidResponse, NET);
        msg.push(42u32);
        msg.push_str("hello");
        msg.push(1u64);

        assert_eq!(msg.pop::<u64>().unwrap(), 1);
        assert_eq!(msg.pop_string().unwrap(), "hello");
        assert_eq!(msg.pop::<u32>().unwrap(), 42);
        assert_eq!(msg.header.size_bytes, 0);
        assert!(msg.payload.is_empty());
    }

    #[test]
    fn size_bytes_tracks_every_mutation() {
        let mut msg = Message::new(MessageKind::NodeGuidRequest, NET);
        assert_eq!(msg.header.size_bytes, 0);

        msg.push(7i32);
        assert_eq!(msg.header.size_bytes, 4);

        msg.push_str("ab");
        // 2 string bytes + 4 length bytes
        assert_eq!(msg.header.size_bytes, 10);

        msg.pop_string().unwrap();
        assert_eq!(msg.header.size_bytes, 4);
    }

    #[test]
    fn reader_walks_without_consuming() {
        let mut msg = Message::new(MessageKind::AddressAmountResponse, NET);
        msg.push(9u32);
        msg.push_str("vpk_abc");
        msg.push(2.5f64);

        let mut reader = msg.reader();
        assert!(reader.has_next());
        assert_eq!(reader.next::<f64>().unwrap(), 2.5);
        assert_eq!(reader.next_string().unwrap(), "vpk_abc");
        assert_eq!(reader.next::<u32>().unwrap(), 9);
        assert!(!reader.has_next());

        // Message untouched.
        assert_eq!(msg.header.size_bytes, msg.payload.len() as u32);
        assert_eq!(msg.reader().next::<f64>().unwrap(), 2.5);
    }

    #[test]
    fn pop_underflow_reports_incomplete_data() {
        let mut msg = Message::new(MessageKind::NodeGuidRequest, NET);
        msg.push(1u32);

        assert!(matches!(
            msg.pop::<u64>(),
            Err(ErrorCode::ReceivedDataIncomplete)
        ));

        // A length prefix claiming more bytes than exist.
        let mut lying = Message::new(MessageKind::NodeGuidRequest, NET);
        lying.push(1_000u32);
        assert!(matches!(
            lying.pop_string(),
            Err(ErrorCode::ReceivedDataIncomplete)
        ));
    }

    #[test]
    fn frame_round_trips_through_header_parse() {
        let mut msg = Message::new(MessageKind::AddressAmountRequest, NET);
        msg.push(77u32);
        msg.push_str("vpk_feed");

        let frame = msg.to_frame();
        assert_eq!(frame.len(), HEADER_LEN + msg.payload.len());

        let header = Header::from_bytes(&frame[..HEADER_LEN]).unwrap();
        assert_eq!(header, msg.header);
        assert_eq!(&frame[HEADER_LEN..], msg.payload.as_slice());
    }

    #[test]
    fn non_utf8_string_payload_rejected() {
        let mut msg = Message::new(MessageKind::NodeGuidRequest, NET);
        msg.payload.extend_from_slice(&[0xFF, 0xFE]);
        msg.push(2u32);

        assert!(matches!(
            msg.pop_string(),
            Err(ErrorCode::ReceivedTransmittedDataInvalid)
        ));
    }
}
