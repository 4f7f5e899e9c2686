//! Result codes, machine status flags and the printable offset
//!
//! Numeric fields travel shifted up by 0x20 so that every payload byte stays
//! out of the control-character range used by the frame markers.

use crate::frame::FrameError;

/// Offset added to numeric fields on the wire
pub const ASCII_OFFSET: u8 = 0x20;

/// Largest value that survives the offset without wrapping
pub const MAX_OFFSET_VALUE: u8 = u8::MAX - ASCII_OFFSET;

/// Shift a numeric value into its wire form
///
/// Returns `None` for values above [`MAX_OFFSET_VALUE`].
pub fn encode_offset(value: u8) -> Option<u8> {
    value.checked_add(ASCII_OFFSET)
}

/// Recover a numeric value from its wire form
///
/// Returns `None` for bytes below the offset, which no valid field produces.
pub fn decode_offset(byte: u8) -> Option<u8> {
    byte.checked_sub(ASCII_OFFSET)
}

/// Decode the offset field at `index`, or fail if it is absent or malformed
pub(crate) fn field(payload: &[u8], index: usize) -> Result<u8, FrameError> {
    payload
        .get(index)
        .copied()
        .and_then(decode_offset)
        .ok_or(FrameError::InvalidFormat)
}

// Wire values for operation results
const GOOD_OPERATION: u8 = 0x20;
const FEED_FAILURE: u8 = 0x21;
const MISTRACKED_NOTE_AT_EXIT: u8 = 0x24;
const TOO_LONG_AT_EXIT: u8 = 0x25;
const BLOCKED_EXIT: u8 = 0x26;
const TRANSPORT_ERROR: u8 = 0x2A;
const DOUBLE_DETECT_ERROR: u8 = 0x2C;
const DIVERTED_ERROR: u8 = 0x2D;
const WRONG_COUNT: u8 = 0x2E;
const NOTE_MISSING_AT_DD: u8 = 0x2F;
const REJECT_RATE_EXCEEDED: u8 = 0x30;
const NON_VOLATILE_RAM_ERROR: u8 = 0x34;
const OPERATION_TIMEOUT: u8 = 0x36;
const INTERNAL_QUEUE_ERROR: u8 = 0x37;
const INVALID_COMMAND: u8 = 0x4F;

/// Result code reported as the first byte of most replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusCode {
    GoodOperation,
    FeedFailure,
    MistrackedNoteAtExit,
    TooLongAtExit,
    BlockedExit,
    TransportError,
    DoubleDetectError,
    DivertedError,
    WrongCount,
    NoteMissingAtDoubleDetect,
    RejectRateExceeded,
    NonVolatileRamError,
    OperationTimeout,
    InternalQueueError,
    InvalidCommand,
    /// A code this driver has no name for
    Other(u8),
}

impl StatusCode {
    /// Parse a result code from its wire format byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            GOOD_OPERATION => StatusCode::GoodOperation,
            FEED_FAILURE => StatusCode::FeedFailure,
            MISTRACKED_NOTE_AT_EXIT => StatusCode::MistrackedNoteAtExit,
            TOO_LONG_AT_EXIT => StatusCode::TooLongAtExit,
            BLOCKED_EXIT => StatusCode::BlockedExit,
            TRANSPORT_ERROR => StatusCode::TransportError,
            DOUBLE_DETECT_ERROR => StatusCode::DoubleDetectError,
            DIVERTED_ERROR => StatusCode::DivertedError,
            WRONG_COUNT => StatusCode::WrongCount,
            NOTE_MISSING_AT_DD => StatusCode::NoteMissingAtDoubleDetect,
            REJECT_RATE_EXCEEDED => StatusCode::RejectRateExceeded,
            NON_VOLATILE_RAM_ERROR => StatusCode::NonVolatileRamError,
            OPERATION_TIMEOUT => StatusCode::OperationTimeout,
            INTERNAL_QUEUE_ERROR => StatusCode::InternalQueueError,
            INVALID_COMMAND => StatusCode::InvalidCommand,
            other => StatusCode::Other(other),
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            StatusCode::GoodOperation => GOOD_OPERATION,
            StatusCode::FeedFailure => FEED_FAILURE,
            StatusCode::MistrackedNoteAtExit => MISTRACKED_NOTE_AT_EXIT,
            StatusCode::TooLongAtExit => TOO_LONG_AT_EXIT,
            StatusCode::BlockedExit => BLOCKED_EXIT,
            StatusCode::TransportError => TRANSPORT_ERROR,
            StatusCode::DoubleDetectError => DOUBLE_DETECT_ERROR,
            StatusCode::DivertedError => DIVERTED_ERROR,
            StatusCode::WrongCount => WRONG_COUNT,
            StatusCode::NoteMissingAtDoubleDetect => NOTE_MISSING_AT_DD,
            StatusCode::RejectRateExceeded => REJECT_RATE_EXCEEDED,
            StatusCode::NonVolatileRamError => NON_VOLATILE_RAM_ERROR,
            StatusCode::OperationTimeout => OPERATION_TIMEOUT,
            StatusCode::InternalQueueError => INTERNAL_QUEUE_ERROR,
            StatusCode::InvalidCommand => INVALID_COMMAND,
            StatusCode::Other(byte) => byte,
        }
    }

    /// Returns true if the device reported success
    pub fn is_success(self) -> bool {
        self == StatusCode::GoodOperation
    }
}

/// Machine status reported by the status command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub feed_sensor_blocked: bool,
    pub exit_sensor_blocked: bool,
    pub reset_since_last_status: bool,
    pub timing_wheel_sensor_blocked: bool,
    pub calibrating_double_detect: bool,
    /// Average note thickness seen by the double detect
    pub average_thickness: u8,
    /// Average note length seen by the double detect
    pub average_length: u8,
}

impl Status {
    /// Decode the four status bytes
    ///
    /// Byte 0: bit0 feed sensor, bit1 exit sensor, bit3 reset, bit4 timing wheel.
    /// Byte 1: bit4 double detect calibration.
    /// Bytes 2 and 3: offset thickness and length.
    pub fn from_payload(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() < 4 {
            return Err(FrameError::InvalidFormat);
        }

        let sensors = payload[0];
        let flags = payload[1];

        Ok(Self {
            feed_sensor_blocked: sensors & (1 << 0) != 0,
            exit_sensor_blocked: sensors & (1 << 1) != 0,
            reset_since_last_status: sensors & (1 << 3) != 0,
            timing_wheel_sensor_blocked: sensors & (1 << 4) != 0,
            calibrating_double_detect: flags & (1 << 4) != 0,
            average_thickness: field(payload, 2)?,
            average_length: field(payload, 3)?,
        })
    }
}
