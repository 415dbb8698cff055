//! Protocol error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid magic bytes")]
    InvalidMagic,

    #[error("Version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u16, got: u16 },

    #[error("Unknown message type: 0x{0:04X}")]
    UnknownMessageType(u16),

    #[error("Invalid header length: expected {expected}, got {got}")]
    InvalidHeaderLength { expected: u16, got: u16 },

    #[error("Header CRC mismatch: expected 0x{expected:08X}, got 0x{got:08X}")]
    HeaderCrcMismatch { expected: u32, got: u32 },

    #[error("Payload CRC mismatch: expected 0x{expected:08X}, got 0x{got:08X}")]
    PayloadCrcMismatch { expected: u32, got: u32 },

    #[error("Buffer too short: need {need} bytes, have {have}")]
    BufferTooShort { need: usize, have: usize },

    #[error("Invalid payload length for message type")]
    InvalidPayloadLength,

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Token error: {0}")]
    Token(#[from] veilfeed_token::TokenError),

    #[error("Hash reconstruction error: {0}")]
    Anns(#[from] veilfeed_anns::AnnsError),

    #[error("Vector error: {0}")]
    Vector(#[from] veilfeed_vector::VectorError),

    #[error("PIR parameter error: {0}")]
    Pir(#[from] veilfeed_pir::PirError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
