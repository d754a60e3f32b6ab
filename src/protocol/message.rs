//! A `Message` is the decoded, owned, host-order unit of protocol exchange:
//! the wire header's routing fields plus a typed `Body`. Encoding happens
//! into a fresh scratch buffer; a `Message` already in memory is never
//! mutated in place for byte-order purposes (§4.1, §9).

use crate::defaults::MAX_BODY_LEN;
use crate::error::ProtocolError;

use super::body::Body;
use super::header::{Direction, Header, HEADER_LEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub address: u8,
    pub direction: Direction,
    pub message_number: u16,
    pub body: Body,
}

impl Message {
    pub fn new(address: u8, direction: Direction, message_number: u16, body: Body) -> Message {
        Message {
            address,
            direction,
            message_number,
            body,
        }
    }

    /// Serializes header + body into one buffer, ready to write to the wire.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let body_bytes = self.body.encode();
        if body_bytes.len() > MAX_BODY_LEN {
            return Err(ProtocolError::BodyTooLong(body_bytes.len(), MAX_BODY_LEN));
        }
        let header = Header {
            address: self.address,
            direction: self.direction,
            message_number: self.message_number,
            body_length: body_bytes.len() as u16,
            message_type: self.body.type_code(),
        };
        let mut out = Vec::with_capacity(HEADER_LEN + body_bytes.len());
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&body_bytes);
        Ok(out)
    }

    /// Decodes a header already read from the wire plus its matching body
    /// slice. This is the shape the two-phase receivers in §4.5/§4.10 use:
    /// read 6 header bytes, then read exactly `header.body_length` more.
    pub fn decode_from_parts(header: &Header, body_bytes: &[u8]) -> Result<Message, ProtocolError> {
        if body_bytes.len() != header.body_length as usize {
            return Err(ProtocolError::BodyLengthMismatch {
                declared: header.body_length as usize,
                actual: body_bytes.len(),
            });
        }
        let body = Body::decode(header.message_type, body_bytes)?;
        Ok(Message {
            address: header.address,
            direction: header.direction,
            message_number: header.message_number,
            body,
        })
    }

    /// Convenience full decode from one contiguous buffer (header + body),
    /// used by tests and by callers that already have the whole frame.
    pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
        if bytes.len() < HEADER_LEN {
            return Err(ProtocolError::BodyLengthMismatch {
                declared: HEADER_LEN,
                actual: bytes.len(),
            });
        }
        let header = Header::parse(&bytes[..HEADER_LEN])?;
        Message::decode_from_parts(&header, &bytes[HEADER_LEN..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::body::Body;

    #[test]
    fn encode_decode_roundtrip() {
        let msg = Message::new(
            0x08,
            Direction::RsmToCcu,
            42,
            Body::ConfirmInit {
                lak: 0x08,
                slp: 0x03,
                vdr: 0x10,
                vor1: 0x11,
                vor2: 0x12,
                bcb: 7,
            },
        );
        let encoded = msg.encode().unwrap();
        let decoded = Message::decode(&encoded).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn two_phase_decode_matches_single_shot() {
        let msg = Message::new(0x01, Direction::CcuToRsm, 7, Body::VydatLineState);
        let encoded = msg.encode().unwrap();
        let header = Header::parse(&encoded[..HEADER_LEN]).unwrap();
        let decoded = Message::decode_from_parts(&header, &encoded[HEADER_LEN..]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn body_length_65522_accepted_65523_rejected() {
        let ok = Body::NavigationData {
            payload: vec![0u8; MAX_BODY_LEN],
        };
        let msg = Message::new(0x08, Direction::CcuToRsm, 0, ok);
        assert!(msg.encode().is_ok());

        let too_big = Body::NavigationData {
            payload: vec![0u8; MAX_BODY_LEN + 1],
        };
        let msg = Message::new(0x08, Direction::CcuToRsm, 0, too_big);
        assert!(matches!(
            msg.encode().unwrap_err(),
            ProtocolError::BodyTooLong(_, _)
        ));
    }
}
