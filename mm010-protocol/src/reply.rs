//! Typed replies decoded from a response body
//!
//! A response body is the command echo followed by the payload. Each
//! command has a fixed payload shape: a result code, then zero, one or two
//! offset fields.

use heapless::Vec;

use crate::command::Command;
use crate::frame::{FrameError, MAX_PAYLOAD_SIZE};
use crate::status::{decode_offset, field, StatusCode};

/// Strip the command echo from a response body
///
/// The device repeats the request's command code as the first body byte.
/// A different byte means the reply belongs to some other exchange.
pub fn split_echo(body: &[u8], command: Command) -> Result<&[u8], FrameError> {
    match body.split_first() {
        Some((&echo, payload)) if echo == command.code() => Ok(payload),
        _ => Err(FrameError::InvalidFormat),
    }
}

/// Decode the leading result code
pub fn result_code(payload: &[u8]) -> Result<StatusCode, FrameError> {
    payload
        .first()
        .map(|&byte| StatusCode::from_byte(byte))
        .ok_or(FrameError::InvalidFormat)
}

/// Outcome of a purge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PurgeResult {
    pub code: StatusCode,
    /// Notes moved to the reject vault
    pub purged: u8,
}

impl PurgeResult {
    pub fn from_payload(payload: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            code: result_code(payload)?,
            purged: field(payload, 1)?,
        })
    }
}

/// Outcome of a dispense, test dispense or the last-status query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DispenseResult {
    pub code: StatusCode,
    /// Notes delivered to the exit
    pub dispensed: u8,
    /// Notes diverted to the reject vault
    pub rejected: u8,
}

impl DispenseResult {
    pub fn from_payload(payload: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            code: result_code(payload)?,
            dispensed: field(payload, 1)?,
            rejected: field(payload, 2)?,
        })
    }
}

/// Outcome of a single-note dispense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SingleNoteResult {
    pub code: StatusCode,
    pub dispensed: u8,
}

impl SingleNoteResult {
    pub fn from_payload(payload: &[u8]) -> Result<Self, FrameError> {
        Ok(Self {
            code: result_code(payload)?,
            dispensed: field(payload, 1)?,
        })
    }
}

/// Result code plus a variable run of offset values
///
/// Returned by the configuration status and the diagnostic commands, whose
/// value layout depends on the firmware revision.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    pub code: StatusCode,
    pub values: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Diagnostics {
    pub fn from_payload(payload: &[u8]) -> Result<Self, FrameError> {
        let code = result_code(payload)?;
        let mut values = Vec::new();
        for &byte in &payload[1..] {
            let value = decode_offset(byte).ok_or(FrameError::InvalidFormat)?;
            values.push(value).map_err(|_| FrameError::PayloadTooLarge)?;
        }
        Ok(Self { code, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_echo() {
        assert_eq!(split_echo(&[0x42, 0x20], Command::Dispense), Ok(&[0x20][..]));
        assert_eq!(
            split_echo(&[0x41, 0x20], Command::Dispense),
            Err(FrameError::InvalidFormat)
        );
        assert_eq!(split_echo(&[], Command::Dispense), Err(FrameError::InvalidFormat));
    }

    #[test]
    fn test_dispense_result() {
        let result = DispenseResult::from_payload(&[0x20, 0x21, 0x22]).unwrap();
        assert_eq!(result.code, StatusCode::GoodOperation);
        assert_eq!(result.dispensed, 1);
        assert_eq!(result.rejected, 2);
    }

    #[test]
    fn test_dispense_result_ignores_trailing_bytes() {
        let result = DispenseResult::from_payload(&[0x2E, 0x23, 0x20, 0x41]).unwrap();
        assert_eq!(result.code, StatusCode::WrongCount);
        assert_eq!(result.dispensed, 3);
        assert_eq!(result.rejected, 0);
    }

    #[test]
    fn test_short_payloads() {
        assert_eq!(
            DispenseResult::from_payload(&[0x20, 0x21]),
            Err(FrameError::InvalidFormat)
        );
        assert_eq!(PurgeResult::from_payload(&[0x20]), Err(FrameError::InvalidFormat));
        assert_eq!(SingleNoteResult::from_payload(&[]), Err(FrameError::InvalidFormat));
    }

    #[test]
    fn test_field_below_offset_rejected() {
        assert_eq!(
            PurgeResult::from_payload(&[0x20, 0x10]),
            Err(FrameError::InvalidFormat)
        );
    }

    #[test]
    fn test_purge_result() {
        let result = PurgeResult::from_payload(&[0x20, 0x24]).unwrap();
        assert_eq!(result.code, StatusCode::GoodOperation);
        assert_eq!(result.purged, 4);
    }

    #[test]
    fn test_diagnostics_values() {
        let diag = Diagnostics::from_payload(&[0x20, 0x20, 0x2A, 0x7F]).unwrap();
        assert_eq!(diag.code, StatusCode::GoodOperation);
        assert_eq!(&diag.values[..], &[0, 10, 0x5F]);
    }

    #[test]
    fn test_diagnostics_code_only() {
        let diag = Diagnostics::from_payload(&[0x4F]).unwrap();
        assert_eq!(diag.code, StatusCode::InvalidCommand);
        assert!(diag.values.is_empty());
    }
}
