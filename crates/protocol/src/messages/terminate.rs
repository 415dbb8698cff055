//! TerminateSession message pair

use crate::constants::MsgType;
use crate::error::Result;
use crate::messages::Payload;

/// TerminateSession request (Client -> Server), empty; the session to end
/// is the one bound in the frame header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminateSessionRequestPayload;

impl Payload for TerminateSessionRequestPayload {
    const MSG_TYPE: MsgType = MsgType::TerminateSessionRequest;

    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }

    fn decode(_data: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}

/// TerminateSession response (Server -> Client), empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminateSessionResponsePayload;

impl Payload for TerminateSessionResponsePayload {
    const MSG_TYPE: MsgType = MsgType::TerminateSessionResponse;

    fn encode(&self) -> Vec<u8> {
        Vec::new()
    }

    fn decode(_data: &[u8]) -> Result<Self> {
        Ok(Self)
    }
}
