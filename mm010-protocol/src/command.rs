//! Command codes and host request messages

use crate::frame::{FrameError, RequestFrame};
use crate::param::ParameterItem;
use crate::status::encode_offset;

// Command codes: host -> dispenser
pub const CMD_STATUS: u8 = 0x40;
pub const CMD_PURGE: u8 = 0x41;
pub const CMD_DISPENSE: u8 = 0x42;
pub const CMD_TEST_DISPENSE: u8 = 0x43;
pub const CMD_RESET: u8 = 0x44;
pub const CMD_LAST_STATUS: u8 = 0x45;
pub const CMD_CONFIGURATION_STATUS: u8 = 0x46;
pub const CMD_DOUBLE_DETECT_DIAGNOSTICS: u8 = 0x47;
pub const CMD_SENSOR_DIAGNOSTICS: u8 = 0x48;
pub const CMD_SINGLE_NOTE_DISPENSE: u8 = 0x4A;
pub const CMD_SINGLE_NOTE_EJECT: u8 = 0x4B;
pub const CMD_READ_PARAMETER: u8 = 0x52;
pub const CMD_TEST_MODE: u8 = 0x54;
pub const CMD_WRITE_PARAMETER: u8 = 0x57;

/// Operation selected by a request frame's command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    Status,
    Purge,
    Dispense,
    TestDispense,
    Reset,
    LastStatus,
    ConfigurationStatus,
    DoubleDetectDiagnostics,
    SensorDiagnostics,
    SingleNoteDispense,
    SingleNoteEject,
    ReadParameter,
    TestMode,
    WriteParameter,
}

impl Command {
    /// Wire format byte
    pub fn code(self) -> u8 {
        match self {
            Command::Status => CMD_STATUS,
            Command::Purge => CMD_PURGE,
            Command::Dispense => CMD_DISPENSE,
            Command::TestDispense => CMD_TEST_DISPENSE,
            Command::Reset => CMD_RESET,
            Command::LastStatus => CMD_LAST_STATUS,
            Command::ConfigurationStatus => CMD_CONFIGURATION_STATUS,
            Command::DoubleDetectDiagnostics => CMD_DOUBLE_DETECT_DIAGNOSTICS,
            Command::SensorDiagnostics => CMD_SENSOR_DIAGNOSTICS,
            Command::SingleNoteDispense => CMD_SINGLE_NOTE_DISPENSE,
            Command::SingleNoteEject => CMD_SINGLE_NOTE_EJECT,
            Command::ReadParameter => CMD_READ_PARAMETER,
            Command::TestMode => CMD_TEST_MODE,
            Command::WriteParameter => CMD_WRITE_PARAMETER,
        }
    }

    /// Parse a command from its wire format byte
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CMD_STATUS => Some(Command::Status),
            CMD_PURGE => Some(Command::Purge),
            CMD_DISPENSE => Some(Command::Dispense),
            CMD_TEST_DISPENSE => Some(Command::TestDispense),
            CMD_RESET => Some(Command::Reset),
            CMD_LAST_STATUS => Some(Command::LastStatus),
            CMD_CONFIGURATION_STATUS => Some(Command::ConfigurationStatus),
            CMD_DOUBLE_DETECT_DIAGNOSTICS => Some(Command::DoubleDetectDiagnostics),
            CMD_SENSOR_DIAGNOSTICS => Some(Command::SensorDiagnostics),
            CMD_SINGLE_NOTE_DISPENSE => Some(Command::SingleNoteDispense),
            CMD_SINGLE_NOTE_EJECT => Some(Command::SingleNoteEject),
            CMD_READ_PARAMETER => Some(Command::ReadParameter),
            CMD_TEST_MODE => Some(Command::TestMode),
            CMD_WRITE_PARAMETER => Some(Command::WriteParameter),
            _ => None,
        }
    }
}

/// Requests from the host to the dispenser
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostMessage<'a> {
    /// Query sensor flags and double detect averages
    Status,
    /// Clear the note path into the reject vault
    Purge,
    /// Dispense `count` notes to the exit
    Dispense { count: u8 },
    /// Dispense `count` notes straight to the reject vault
    TestDispense { count: u8 },
    /// Reset the dispenser
    Reset,
    /// Repeat the result of the last operation
    LastStatus,
    ConfigurationStatus,
    DoubleDetectDiagnostics,
    SensorDiagnostics,
    SingleNoteDispense,
    SingleNoteEject,
    ReadParameter { item: ParameterItem },
    WriteParameter { item: ParameterItem, value: &'a str },
    /// Enter the device's self-test mode
    TestMode,
}

impl<'a> HostMessage<'a> {
    /// Command code this message is sent with
    pub fn command(&self) -> Command {
        match self {
            HostMessage::Status => Command::Status,
            HostMessage::Purge => Command::Purge,
            HostMessage::Dispense { .. } => Command::Dispense,
            HostMessage::TestDispense { .. } => Command::TestDispense,
            HostMessage::Reset => Command::Reset,
            HostMessage::LastStatus => Command::LastStatus,
            HostMessage::ConfigurationStatus => Command::ConfigurationStatus,
            HostMessage::DoubleDetectDiagnostics => Command::DoubleDetectDiagnostics,
            HostMessage::SensorDiagnostics => Command::SensorDiagnostics,
            HostMessage::SingleNoteDispense => Command::SingleNoteDispense,
            HostMessage::SingleNoteEject => Command::SingleNoteEject,
            HostMessage::ReadParameter { .. } => Command::ReadParameter,
            HostMessage::WriteParameter { .. } => Command::WriteParameter,
            HostMessage::TestMode => Command::TestMode,
        }
    }

    /// Encode this message into a frame
    pub fn to_frame(&self) -> Result<RequestFrame, FrameError> {
        let code = self.command().code();
        match self {
            HostMessage::Dispense { count } | HostMessage::TestDispense { count } => {
                let wire = encode_offset(*count).ok_or(FrameError::ValueOutOfRange)?;
                RequestFrame::new(code, &[wire])
            }
            HostMessage::ReadParameter { item } => {
                RequestFrame::new(code, item.read_request()?.as_bytes())
            }
            HostMessage::WriteParameter { item, value } => {
                RequestFrame::new(code, item.write_request(value)?.as_bytes())
            }
            _ => Ok(RequestFrame::empty(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_roundtrip() {
        for code in 0..=u8::MAX {
            if let Some(command) = Command::from_code(code) {
                assert_eq!(command.code(), code);
            }
        }
        assert_eq!(Command::from_code(0x49), None);
    }

    #[test]
    fn test_status_frame() {
        let frame = HostMessage::Status.to_frame().unwrap();
        assert_eq!(frame.command, CMD_STATUS);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_dispense_frame_offsets_count() {
        let frame = HostMessage::Dispense { count: 1 }.to_frame().unwrap();
        assert_eq!(frame.command, CMD_DISPENSE);
        assert_eq!(&frame.payload[..], &[0x21]);

        let frame = HostMessage::TestDispense { count: 10 }.to_frame().unwrap();
        assert_eq!(frame.command, CMD_TEST_DISPENSE);
        assert_eq!(&frame.payload[..], &[0x2A]);
    }

    #[test]
    fn test_dispense_count_out_of_range() {
        let result = HostMessage::Dispense { count: 0xE0 }.to_frame();
        assert_eq!(result, Err(FrameError::ValueOutOfRange));
    }

    #[test]
    fn test_parameter_frames() {
        let item = ParameterItem::new(3).unwrap();

        let frame = HostMessage::ReadParameter { item }.to_frame().unwrap();
        assert_eq!(frame.command, CMD_READ_PARAMETER);
        assert_eq!(&frame.payload[..], b"D/003");

        let frame = HostMessage::WriteParameter { item, value: "1" }
            .to_frame()
            .unwrap();
        assert_eq!(frame.command, CMD_WRITE_PARAMETER);
        assert_eq!(&frame.payload[..], b"D/003/1");
    }

    #[test]
    fn test_message_roundtrip_through_wire() {
        let encoded = HostMessage::Dispense { count: 5 }
            .to_frame()
            .unwrap()
            .encode_to_vec()
            .unwrap();
        let parsed = RequestFrame::parse(&encoded).unwrap();
        assert_eq!(Command::from_code(parsed.command), Some(Command::Dispense));
        assert_eq!(&parsed.payload[..], &[0x25]);
    }
}
