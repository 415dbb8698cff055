//! Frame encoding/decoding

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::constants::{MsgType, HEADER_LEN, MAGIC, PROTOCOL_VERSION};
use crate::error::{ProtocolError, Result};
use crate::header::Header;

/// Frame preamble size (before header and payload):
/// magic(4) + version(2) + msg_type(2) + header_len(2) + payload_len(4) + header_crc(4) + payload_crc(4) = 22
const PREAMBLE_SIZE: usize = 22;

/// A complete wire frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Message type
    pub msg_type: MsgType,
    /// Header (24 bytes in v1)
    pub header: Header,
    /// Payload bytes (can be empty)
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a new frame with the given message type, header, and payload
    pub fn new(msg_type: MsgType, header: Header, payload: Vec<u8>) -> Self {
        Self {
            msg_type,
            header,
            payload,
        }
    }

    /// Encode the frame to bytes
    pub fn encode(&self) -> Vec<u8> {
        let header_bytes = self.header.encode();
        let header_crc = crc32fast::hash(&header_bytes);
        let payload_crc = crc32fast::hash(&self.payload);

        let total_size = PREAMBLE_SIZE + header_bytes.len() + self.payload.len();
        let mut buf = Vec::with_capacity(total_size);

        buf.write_all(&MAGIC).unwrap();
        buf.write_u16::<LittleEndian>(PROTOCOL_VERSION).unwrap();
        buf.write_u16::<LittleEndian>(self.msg_type.to_u16()).unwrap();
        buf.write_u16::<LittleEndian>(HEADER_LEN).unwrap();
        buf.write_u32::<LittleEndian>(self.payload.len() as u32).unwrap();
        buf.write_u32::<LittleEndian>(header_crc).unwrap();
        buf.write_u32::<LittleEndian>(payload_crc).unwrap();
        buf.write_all(&header_bytes).unwrap();
        buf.write_all(&self.payload).unwrap();

        buf
    }

    /// Decode a frame from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < PREAMBLE_SIZE {
            return Err(ProtocolError::BufferTooShort {
                need: PREAMBLE_SIZE,
                have: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        let version = cursor.read_u16::<LittleEndian>()?;
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                got: version,
            });
        }

        let msg_type_raw = cursor.read_u16::<LittleEndian>()?;
        let msg_type = MsgType::from_u16(msg_type_raw)
            .ok_or(ProtocolError::UnknownMessageType(msg_type_raw))?;

        let header_len = cursor.read_u16::<LittleEndian>()?;
        if header_len != HEADER_LEN {
            return Err(ProtocolError::InvalidHeaderLength {
                expected: HEADER_LEN,
                got: header_len,
            });
        }

        let payload_len = cursor.read_u32::<LittleEndian>()? as usize;
        let expected_header_crc = cursor.read_u32::<LittleEndian>()?;
        let expected_payload_crc = cursor.read_u32::<LittleEndian>()?;

        let total_needed = PREAMBLE_SIZE + header_len as usize + payload_len;
        if data.len() < total_needed {
            return Err(ProtocolError::BufferTooShort {
                need: total_needed,
                have: data.len(),
            });
        }

        let header_start = cursor.position() as usize;
        let header_end = header_start + header_len as usize;
        let header_bytes = &data[header_start..header_end];

        let actual_header_crc = crc32fast::hash(header_bytes);
        if actual_header_crc != expected_header_crc {
            return Err(ProtocolError::HeaderCrcMismatch {
                expected: expected_header_crc,
                got: actual_header_crc,
            });
        }

        let header = Header::decode(header_bytes)?;

        let payload = data[header_end..header_end + payload_len].to_vec();
        let actual_payload_crc = crc32fast::hash(&payload);
        if actual_payload_crc != expected_payload_crc {
            return Err(ProtocolError::PayloadCrcMismatch {
                expected: expected_payload_crc,
                got: actual_payload_crc,
            });
        }

        Ok(Self {
            msg_type,
            header,
            payload,
        })
    }

    /// Get the total encoded size of this frame
    pub fn encoded_size(&self) -> usize {
        PREAMBLE_SIZE + HEADER_LEN as usize + self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let header = Header::new([0x11; 16]);
        let payload = vec![1, 2, 3, 4, 5];
        let frame = Frame::new(MsgType::BucketQueryRequest, header.clone(), payload.clone());

        let encoded = frame.encode();
        let decoded = Frame::decode(&encoded).unwrap();

        assert_eq!(decoded.msg_type, MsgType::BucketQueryRequest);
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_frame_empty_payload() {
        let frame = Frame::new(MsgType::InitSessionRequest, Header::pre_session(), vec![]);
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.msg_type, MsgType::InitSessionRequest);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_invalid_magic() {
        let frame = Frame::new(MsgType::InitSessionRequest, Header::pre_session(), vec![]);
        let mut encoded = frame.encode();
        encoded[0] = 0xFF;
        assert!(matches!(
            Frame::decode(&encoded),
            Err(ProtocolError::InvalidMagic)
        ));
    }

    #[test]
    fn test_header_crc_mismatch() {
        let frame = Frame::new(MsgType::BucketQueryRequest, Header::new([0x11; 16]), vec![]);
        let mut encoded = frame.encode();
        // corrupt the first header byte (offset 22, right after the preamble)
        encoded[22] ^= 0xFF;
        assert!(matches!(
            Frame::decode(&encoded),
            Err(ProtocolError::HeaderCrcMismatch { .. })
        ));
    }

    #[test]
    fn test_payload_crc_mismatch() {
        let frame = Frame::new(
            MsgType::BucketQueryRequest,
            Header::pre_session(),
            vec![1, 2, 3],
        );
        let mut encoded = frame.encode();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;
        assert!(matches!(
            Frame::decode(&encoded),
            Err(ProtocolError::PayloadCrcMismatch { .. })
        ));
    }
}
