//! Single-byte handshake codes exchanged around a data frame

/// Positive acknowledgement
pub const ACK: u8 = 0x06;
/// Negative acknowledgement
pub const NAK: u8 = 0x15;
/// End of transmission
pub const EOT: u8 = 0x04;

/// Code byte read at the start and end of every reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseCode {
    /// Device accepted the request; a data frame follows
    Ack,
    /// Device rejected the request frame
    Nack,
    /// Device finished the exchange
    Eot,
    /// Any other byte
    Unrecognized(u8),
}

impl ResponseCode {
    /// Classify a received code byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            ACK => ResponseCode::Ack,
            NAK => ResponseCode::Nack,
            EOT => ResponseCode::Eot,
            other => ResponseCode::Unrecognized(other),
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            ResponseCode::Ack => ACK,
            ResponseCode::Nack => NAK,
            ResponseCode::Eot => EOT,
            ResponseCode::Unrecognized(byte) => byte,
        }
    }

    /// Short mnemonic used in traffic logs
    pub fn mnemonic(self) -> &'static str {
        match self {
            ResponseCode::Ack => "ACK",
            ResponseCode::Nack => "NAK",
            ResponseCode::Eot => "EOT",
            ResponseCode::Unrecognized(_) => "???",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(ResponseCode::from_byte(0x06), ResponseCode::Ack);
        assert_eq!(ResponseCode::from_byte(0x15), ResponseCode::Nack);
        assert_eq!(ResponseCode::from_byte(0x04), ResponseCode::Eot);
    }

    #[test]
    fn test_unrecognized_code_keeps_byte() {
        let code = ResponseCode::from_byte(0x01);
        assert_eq!(code, ResponseCode::Unrecognized(0x01));
        assert_eq!(code.to_byte(), 0x01);
        assert_eq!(code.mnemonic(), "???");
    }

    #[test]
    fn test_code_roundtrip() {
        for byte in 0..=u8::MAX {
            assert_eq!(ResponseCode::from_byte(byte).to_byte(), byte);
        }
    }
}
