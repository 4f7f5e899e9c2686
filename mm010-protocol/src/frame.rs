//! Frame encoding and decoding for the MM010 serial protocol.
//!
//! Request frame (host -> device):
//! - REQUEST_START (0x04)
//! - DEVICE_ADDRESS (0x30)
//! - TEXT_START (0x02)
//! - COMMAND (1 byte)
//! - PAYLOAD (0-250 bytes)
//! - TEXT_END (0x03)
//! - CHECKSUM (1 byte): XOR of every preceding byte
//!
//! Response data frame (device -> host) has the same layout with
//! RESPONSE_START (0x01) in place of REQUEST_START. There is no length
//! field; the markers delimit the frame.

use heapless::Vec;

/// First byte of every request frame
pub const REQUEST_START: u8 = 0x04;

/// First byte of every response data frame
pub const RESPONSE_START: u8 = 0x01;

/// Communication identifier of the dispenser
pub const DEVICE_ADDRESS: u8 = 0x30;

/// Start of text marker
pub const TEXT_START: u8 = 0x02;

/// End of text marker
pub const TEXT_END: u8 = 0x03;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 250;

/// Maximum complete frame size (START + ADDRESS + STX + CMD + MAX_PAYLOAD + ETX + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = 6 + MAX_PAYLOAD_SIZE;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    InvalidChecksum,
    /// Markers missing or misplaced, or a field could not be decoded
    InvalidFormat,
    /// A numeric argument cannot be represented on the wire
    ValueOutOfRange,
    /// Buffer too small for encoding
    BufferTooSmall,
}

/// XOR-fold of `bytes`, left to right
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &byte| acc ^ byte)
}

/// An outbound request frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestFrame {
    /// Command code
    pub command: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl RequestFrame {
    /// Create a new frame with the given command code and payload
    pub fn new(command: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { command, payload })
    }

    /// Create a frame with no payload
    pub fn empty(command: u8) -> Self {
        Self {
            command,
            payload: Vec::new(),
        }
    }

    /// Number of bytes this frame occupies on the wire
    pub fn encoded_len(&self) -> usize {
        6 + self.payload.len()
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        let end = 4 + self.payload.len();
        buffer[0] = REQUEST_START;
        buffer[1] = DEVICE_ADDRESS;
        buffer[2] = TEXT_START;
        buffer[3] = self.command;
        buffer[4..end].copy_from_slice(&self.payload);
        buffer[end] = TEXT_END;
        buffer[end + 1] = checksum(&buffer[..=end]);

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Decode a complete request frame
    ///
    /// Used by device simulators and to check what the host put on the wire.
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        let (&received, framed) = raw.split_last().ok_or(FrameError::InvalidFormat)?;

        match framed {
            [REQUEST_START, DEVICE_ADDRESS, TEXT_START, command, payload @ .., TEXT_END] => {
                if checksum(framed) != received {
                    return Err(FrameError::InvalidChecksum);
                }
                Self::new(*command, payload)
            }
            _ => Err(FrameError::InvalidFormat),
        }
    }
}

/// Validate a response data frame and return the bytes between the text markers
///
/// Checks, in order: the start and address bytes, the trailing checksum,
/// then the text markers around the body.
pub fn parse_response(raw: &[u8]) -> Result<&[u8], FrameError> {
    if !matches!(raw, [RESPONSE_START, DEVICE_ADDRESS, ..]) {
        return Err(FrameError::InvalidFormat);
    }

    let (&received, framed) = raw.split_last().ok_or(FrameError::InvalidFormat)?;
    if checksum(framed) != received {
        return Err(FrameError::InvalidChecksum);
    }

    match framed {
        [_, _, TEXT_START, body @ .., TEXT_END] => Ok(body),
        _ => Err(FrameError::InvalidFormat),
    }
}

/// Length of the first complete response frame at the start of `buf`
///
/// A frame ends at a TEXT_END whose next byte equals the checksum of
/// everything up to and including that TEXT_END. Status payloads carry raw
/// bit fields, so a bare TEXT_END inside the body is not an end. Bytes after
/// the frame (typically the closing EOT arriving in the same read) are not
/// part of it.
pub fn response_frame_len(buf: &[u8]) -> Option<usize> {
    let mut running = 0u8;
    for (index, &byte) in buf.iter().enumerate() {
        running ^= byte;
        if index >= 3 && byte == TEXT_END && buf.get(index + 1) == Some(&running) {
            return Some(index + 2);
        }
    }
    None
}

/// Length up to the first TEXT_END plus one byte, checksum not verified
///
/// Used once no verified end turns up, so a corrupted frame can still be
/// cut out and reported as a checksum failure.
pub fn unverified_frame_len(buf: &[u8]) -> Option<usize> {
    buf.iter()
        .enumerate()
        .skip(3)
        .find(|&(_, &byte)| byte == TEXT_END)
        .map(|(index, _)| index + 2)
        .filter(|&len| len <= buf.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn response(body: &[u8]) -> std::vec::Vec<u8> {
        let mut raw = std::vec![RESPONSE_START, DEVICE_ADDRESS, TEXT_START];
        raw.extend_from_slice(body);
        raw.push(TEXT_END);
        raw.push(checksum(&raw));
        raw
    }

    #[test]
    fn test_checksum_empty() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = RequestFrame::empty(0x40);
        let mut buffer = [0u8; 10];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 6);
        assert_eq!(&buffer[..5], &[0x04, 0x30, 0x02, 0x40, 0x03]);
        assert_eq!(buffer[5], 0x04 ^ 0x30 ^ 0x02 ^ 0x40 ^ 0x03);
    }

    #[test]
    fn test_encode_dispense_one() {
        let frame = RequestFrame::new(0x42, &[0x21]).unwrap();
        let encoded = frame.encode_to_vec().unwrap();
        let chk = 0x04 ^ 0x30 ^ 0x02 ^ 0x42 ^ 0x21 ^ 0x03;

        assert_eq!(&encoded[..], &[0x04, 0x30, 0x02, 0x42, 0x21, 0x03, chk]);
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let frame = RequestFrame::new(0x42, &[0x21]).unwrap();
        let mut buffer = [0u8; 6];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_payload_too_large() {
        let large_payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        let result = RequestFrame::new(0x52, &large_payload);
        assert_eq!(result, Err(FrameError::PayloadTooLarge));
    }

    #[test]
    fn test_parse_request_bad_checksum() {
        let mut encoded = RequestFrame::empty(0x40).encode_to_vec().unwrap();
        let last_idx = encoded.len() - 1;
        encoded[last_idx] ^= 0xFF;

        assert_eq!(RequestFrame::parse(&encoded), Err(FrameError::InvalidChecksum));
    }

    #[test]
    fn test_parse_request_rejects_response_frame() {
        let raw = response(&[0x40]);
        assert_eq!(RequestFrame::parse(&raw), Err(FrameError::InvalidFormat));
    }

    #[test]
    fn test_parse_response_body() {
        let raw = response(&[0x42, 0x20, 0x21, 0x22]);
        assert_eq!(parse_response(&raw), Ok(&[0x42, 0x20, 0x21, 0x22][..]));
    }

    #[test]
    fn test_parse_response_empty_body() {
        let raw = response(&[]);
        assert_eq!(parse_response(&raw), Ok(&[][..]));
    }

    #[test]
    fn test_parse_response_missing_header() {
        let mut raw = response(&[0x40, 0x20]);
        raw.remove(0);
        assert_eq!(parse_response(&raw), Err(FrameError::InvalidFormat));

        let mut raw = response(&[0x40, 0x20]);
        raw[1] = 0x31;
        assert_eq!(parse_response(&raw), Err(FrameError::InvalidFormat));
    }

    #[test]
    fn test_parse_response_bad_checksum() {
        let mut raw = response(&[0x40, 0x20]);
        let last_idx = raw.len() - 1;
        raw[last_idx] ^= 0x01;
        assert_eq!(parse_response(&raw), Err(FrameError::InvalidChecksum));
    }

    #[test]
    fn test_parse_response_missing_text_markers() {
        // Valid checksum, but STX replaced
        let mut raw = std::vec![RESPONSE_START, DEVICE_ADDRESS, 0x05, 0x40, TEXT_END];
        raw.push(checksum(&raw));
        assert_eq!(parse_response(&raw), Err(FrameError::InvalidFormat));

        // Valid checksum, but ETX missing
        let mut raw = std::vec![RESPONSE_START, DEVICE_ADDRESS, TEXT_START, 0x40, 0x20];
        raw.push(checksum(&raw));
        assert_eq!(parse_response(&raw), Err(FrameError::InvalidFormat));
    }

    #[test]
    fn test_parse_response_truncated() {
        assert_eq!(parse_response(&[]), Err(FrameError::InvalidFormat));
        assert_eq!(parse_response(&[RESPONSE_START]), Err(FrameError::InvalidFormat));
        assert_eq!(
            parse_response(&[RESPONSE_START, DEVICE_ADDRESS, DEVICE_ADDRESS ^ RESPONSE_START]),
            Err(FrameError::InvalidFormat)
        );
    }

    #[test]
    fn test_response_frame_len() {
        let raw = response(&[0x40, 0x20]);
        assert_eq!(response_frame_len(&raw), Some(raw.len()));
        assert_eq!(response_frame_len(&raw[..raw.len() - 1]), None);
        assert_eq!(response_frame_len(&raw[..3]), None);
        assert_eq!(response_frame_len(&[]), None);
    }

    #[test]
    fn test_response_frame_len_with_trailing_eot() {
        let mut raw = response(&[0x40, 0x20]);
        let frame_len = raw.len();
        raw.push(0x04);
        assert_eq!(response_frame_len(&raw), Some(frame_len));
    }

    #[test]
    fn test_response_frame_len_checksum_equals_text_end() {
        // Body chosen so the checksum is itself 0x03
        let body = [RESPONSE_START ^ DEVICE_ADDRESS ^ TEXT_START];
        let raw = response(&body);
        assert_eq!(raw[raw.len() - 1], TEXT_END);
        assert_eq!(response_frame_len(&raw), Some(raw.len()));
    }

    #[test]
    fn test_response_frame_len_text_end_in_body() {
        // Feed and exit sensor bits set give a raw 0x03 status byte
        let raw = response(&[0x40, 0x03, 0x20, 0x25, 0x30]);
        assert_eq!(response_frame_len(&raw), Some(raw.len()));
        assert_eq!(unverified_frame_len(&raw), Some(6));
        assert_eq!(parse_response(&raw), Ok(&[0x40, 0x03, 0x20, 0x25, 0x30][..]));
    }

    #[test]
    fn test_response_frame_len_bad_checksum() {
        let mut raw = response(&[0x40, 0x20]);
        let last = raw.len() - 1;
        raw[last] ^= 0x55;
        assert_eq!(response_frame_len(&raw), None);
        assert_eq!(unverified_frame_len(&raw), Some(raw.len()));
    }

    proptest! {
        #[test]
        fn prop_request_roundtrip(
            command in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let frame = RequestFrame::new(command, &payload).unwrap();
            let encoded = frame.encode_to_vec().unwrap();
            let parsed = RequestFrame::parse(&encoded).unwrap();

            prop_assert_eq!(parsed.command, command);
            prop_assert_eq!(&parsed.payload[..], &payload[..]);
        }

        #[test]
        fn prop_checksum_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            prop_assert_eq!(checksum(&bytes), checksum(&bytes));
        }

        #[test]
        fn prop_checksum_detects_single_byte_change(
            bytes in proptest::collection::vec(any::<u8>(), 1..64),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut altered = bytes.clone();
            let i = index.index(altered.len());
            altered[i] ^= flip;
            prop_assert_ne!(checksum(&bytes), checksum(&altered));
        }

        #[test]
        fn prop_response_body_roundtrip(body in proptest::collection::vec(0x20u8..0x7F, 0..32)) {
            let raw = response(&body);
            prop_assert_eq!(response_frame_len(&raw), Some(raw.len()));
            prop_assert_eq!(parse_response(&raw), Ok(&body[..]));
        }
    }
}
