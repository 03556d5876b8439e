//! Frame codec
//!
//! A frame is a leading opcode byte followed by an opaque payload:
//!
//! ```text
//! [0]     : Opcode
//! [1..]   : Payload (layout owned by the peripheral wrapper)
//! ```

use super::error::FrameError;

/// Smallest valid frame: the opcode byte alone
pub const MIN_FRAME_LEN: usize = 1;

/// One command or reply frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    opcode: u8,
    payload: Vec<u8>,
}

impl Frame {
    pub fn new(opcode: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Serialize as `[opcode] ++ payload`
    pub fn encode(&self) -> Vec<u8> {
        encode(self.opcode, &self.payload)
    }

    /// Parse raw frame bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (opcode, payload) = decode(bytes)?;
        Ok(Self { opcode, payload })
    }
}

pub fn encode(opcode: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MIN_FRAME_LEN + payload.len());
    bytes.push(opcode);
    bytes.extend_from_slice(payload);
    bytes
}

pub fn decode(bytes: &[u8]) -> Result<(u8, Vec<u8>), FrameError> {
    match bytes.split_first() {
        Some((&opcode, payload)) => Ok((opcode, payload.to_vec())),
        None => Err(FrameError::Empty),
    }
}
