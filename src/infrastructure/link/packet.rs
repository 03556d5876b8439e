//! Matata wire envelope
//!
//! Frames travel over the UART characteristics wrapped in a packet:
//!
//! ```text
//! [0]        : Header (0xFE)
//! [1..]      : Stuffed body
//!              [len] [frame bytes ...] [crc hi] [crc lo]
//!              len = frame bytes + 2 (crc)
//!              crc = CRC-16 over [len] [frame bytes ...]
//! ```
//!
//! Inside the body, `0xFE` is sent as `0xFD 0xDE` and `0xFD` as `0xFD 0xDD`.
//! Notifications that do not start with the header are plain UTF-8 text
//! (the controller announces itself with `Car:[...]`).

use super::error::FrameError;

pub const HEADER: u8 = 0xfe;
pub const ESCAPE: u8 = 0xfd;
const ESCAPED_HEADER: u8 = 0xde;
const ESCAPED_ESCAPE: u8 = 0xdd;

/// Length byte + opcode + crc
const MIN_BODY_LEN: usize = 4;
const CRC_LEN: usize = 2;

/// Largest frame whose length byte still fits in a u8
pub const MAX_FRAME_LEN: usize = u8::MAX as usize - CRC_LEN;

/// Default write size when the platform does not report an MTU
pub const DEFAULT_CHUNK_SIZE: usize = 20;

pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(0xffff, |crc: u16, &byte| {
        let mut crc = crc.swap_bytes() ^ byte as u16;
        crc ^= (crc & 0xff) >> 4;
        crc ^= crc << 12;
        crc ^= (crc & 0xff) << 5;
        crc
    })
}

/// Wrap raw frame bytes into a packet ready for the write characteristic
pub fn encode(frame: &[u8]) -> Result<Vec<u8>, FrameError> {
    if frame.is_empty() {
        return Err(FrameError::Empty);
    }
    if frame.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLong(frame.len()));
    }

    let mut body = Vec::with_capacity(frame.len() + 1 + CRC_LEN);
    body.push((frame.len() + CRC_LEN) as u8);
    body.extend_from_slice(frame);
    let crc = crc16(&body);
    body.extend_from_slice(&crc.to_be_bytes());

    let mut packet = Vec::with_capacity(body.len() * 2 + 1);
    packet.push(HEADER);
    for byte in body {
        match byte {
            HEADER => packet.extend_from_slice(&[ESCAPE, ESCAPED_HEADER]),
            ESCAPE => packet.extend_from_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            other => packet.push(other),
        }
    }
    Ok(packet)
}

/// Unwrap a packet and return the frame bytes it carries
pub fn decode(packet: &[u8]) -> Result<Vec<u8>, FrameError> {
    let (&header, stuffed) = packet.split_first().ok_or(FrameError::Empty)?;
    if header != HEADER {
        return Err(FrameError::InvalidHeader(header));
    }

    let mut body = Vec::with_capacity(stuffed.len());
    let mut bytes = stuffed.iter();
    while let Some(&byte) = bytes.next() {
        if byte != ESCAPE {
            body.push(byte);
            continue;
        }
        match bytes.next() {
            Some(&ESCAPED_HEADER) => body.push(HEADER),
            Some(&ESCAPED_ESCAPE) => body.push(ESCAPE),
            Some(&other) => return Err(FrameError::InvalidEscape(other)),
            None => return Err(FrameError::UnexpectedEnd),
        }
    }

    if body.len() < MIN_BODY_LEN {
        return Err(FrameError::TooShort(body.len()));
    }

    let split = body.len() - CRC_LEN;
    let expected = u16::from_be_bytes([body[split], body[split + 1]]);
    let computed = crc16(&body[..split]);
    if expected != computed {
        return Err(FrameError::InvalidCrc { expected, computed });
    }

    let declared = body[0];
    let actual = body.len() - 1;
    if declared as usize != actual {
        return Err(FrameError::LengthMismatch { declared, actual });
    }

    Ok(body[1..split].to_vec())
}

/// Split an outbound packet into characteristic-sized writes
pub fn chunks(packet: &[u8], mtu: usize) -> std::slice::Chunks<'_, u8> {
    packet.chunks(mtu.max(1))
}

/// One raw notification from the notify characteristic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Decoded frame bytes
    Packet(Vec<u8>),
    Text(String),
}

impl Notification {
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        match raw.first() {
            None => Err(FrameError::Empty),
            Some(&HEADER) => decode(raw).map(Self::Packet),
            Some(_) => String::from_utf8(raw.to_vec())
                .map(Self::Text)
                .map_err(|_| FrameError::InvalidText),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_vectors() {
        assert_eq!(crc16(&[0x07, 0x7e, 0x02, 0x02, 0x00, 0x00]), 0x9777);
        assert_eq!(crc16(&[0x04, 0x87, 0x02]), 0xb211);
    }

    #[test]
    fn test_encode_handshake_packet() {
        let packet = encode(&[0x7e, 0x02, 0x02, 0x00, 0x00]).unwrap();
        assert_eq!(
            packet,
            vec![0xfe, 0x07, 0x7e, 0x02, 0x02, 0x00, 0x00, 0x97, 0x77]
        );
    }

    #[test]
    fn test_decode_status_packet() {
        let frame = decode(&[0xfe, 0x04, 0x87, 0x02, 0xb2, 0x11]).unwrap();
        assert_eq!(frame, vec![0x87, 0x02]);
    }

    #[test]
    fn test_byte_stuffing() {
        let frame = [0x18, 0xfe, 0xfd, 0x01];
        let packet = encode(&frame).unwrap();
        assert_eq!(packet.iter().filter(|&&b| b == HEADER).count(), 1);
        assert_eq!(&packet[2..7], &[0x18, 0xfd, 0xde, 0xfd, 0xdd]);
        assert_eq!(decode(&packet).unwrap(), frame.to_vec());
    }

    #[test]
    fn test_decode_rejects_corruption() {
        assert_eq!(decode(&[]), Err(FrameError::Empty));
        assert_eq!(
            decode(&[0x04, 0x87, 0x02, 0xb2, 0x11]),
            Err(FrameError::InvalidHeader(0x04))
        );
        assert_eq!(decode(&[0xfe, 0x04, 0x87, 0xfd]), Err(FrameError::UnexpectedEnd));
        assert_eq!(
            decode(&[0xfe, 0x04, 0xfd, 0x01, 0x02, 0x03]),
            Err(FrameError::InvalidEscape(0x01))
        );
        assert_eq!(decode(&[0xfe, 0x04, 0x87, 0x02]), Err(FrameError::TooShort(3)));
        assert!(matches!(
            decode(&[0xfe, 0x04, 0x87, 0x02, 0xb2, 0x12]),
            Err(FrameError::InvalidCrc { expected: 0xb212, computed: 0xb211 })
        ));
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        let mut body = vec![0x05, 0x87, 0x02];
        let crc = crc16(&body);
        body.extend_from_slice(&crc.to_be_bytes());
        let mut packet = vec![HEADER];
        packet.extend_from_slice(&body);
        assert_eq!(
            decode(&packet),
            Err(FrameError::LengthMismatch {
                declared: 0x05,
                actual: 4
            })
        );
    }

    #[test]
    fn test_encode_limits() {
        assert_eq!(encode(&[]), Err(FrameError::Empty));
        assert!(encode(&[0u8; MAX_FRAME_LEN]).is_ok());
        assert_eq!(
            encode(&[0u8; MAX_FRAME_LEN + 1]),
            Err(FrameError::TooLong(MAX_FRAME_LEN + 1))
        );
    }

    #[test]
    fn test_chunks() {
        let packet = [0u8; 45];
        let sizes: Vec<usize> = chunks(&packet, 20).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![20, 20, 5]);
        assert_eq!(chunks(&packet, 0).count(), 45);
    }

    #[test]
    fn test_notification_parse() {
        assert_eq!(
            Notification::parse(b"Car:[1.0]").unwrap(),
            Notification::Text("Car:[1.0]".to_string())
        );
        assert_eq!(
            Notification::parse(&[0xfe, 0x04, 0x87, 0x02, 0xb2, 0x11]).unwrap(),
            Notification::Packet(vec![0x87, 0x02])
        );
        assert_eq!(Notification::parse(&[0x80, 0xff]), Err(FrameError::InvalidText));
    }
}
