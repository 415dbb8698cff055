//! Common message header

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::constants::{HEADER_LEN, SESSION_ID_LEN};
use crate::error::{ProtocolError, Result};

/// Session identifier (16 bytes)
pub type SessionId = [u8; SESSION_ID_LEN];

/// Common header (24 bytes): session binding plus a flags word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Session ID (all-zero for pre-session messages)
    pub session_id: SessionId,
    /// Flags bitfield (v1 uses 0)
    pub flags: u32,
    /// Reserved (must be 0)
    pub reserved: u32,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            session_id: [0u8; SESSION_ID_LEN],
            flags: 0,
            reserved: 0,
        }
    }
}

impl Header {
    /// Create a header bound to a session
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            ..Default::default()
        }
    }

    /// Create a pre-session header (all zeros)
    pub fn pre_session() -> Self {
        Self::default()
    }

    /// True when no session is bound yet
    pub fn is_pre_session(&self) -> bool {
        self.session_id == [0u8; SESSION_ID_LEN]
    }

    /// Encode the header to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN as usize);
        self.write_to(&mut buf).expect("Vec write should not fail");
        buf
    }

    /// Write the header to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.session_id)?;
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.reserved)?;
        Ok(())
    }

    /// Decode a header from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN as usize {
            return Err(ProtocolError::BufferTooShort {
                need: HEADER_LEN as usize,
                have: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let mut session_id = [0u8; SESSION_ID_LEN];
        cursor.read_exact(&mut session_id)?;
        let flags = cursor.read_u32::<LittleEndian>()?;
        let reserved = cursor.read_u32::<LittleEndian>()?;

        Ok(Self {
            session_id,
            flags,
            reserved,
        })
    }
}
