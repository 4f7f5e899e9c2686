//! Parameter addressing
//!
//! Device settings are addressed by a three-digit item number and carried
//! as text: `D/<item>` to read, `D/<item>/<value>` to write.

use core::fmt::{self, Write};

use heapless::String;

use crate::frame::{FrameError, MAX_PAYLOAD_SIZE};
use crate::reply::result_code;
use crate::status::StatusCode;

/// Highest addressable item number
pub const MAX_ITEM: u16 = 999;

/// Length of the `D/iii/` prefix
const PREFIX_LEN: usize = 6;

/// A readable/writable device setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterItem(u16);

impl ParameterItem {
    /// Create an item, checking that it fits in three digits
    pub fn new(item: u16) -> Option<Self> {
        (item <= MAX_ITEM).then_some(Self(item))
    }

    /// Item number
    pub fn number(self) -> u16 {
        self.0
    }

    /// Payload text for a read request: `D/<item>`
    pub fn read_request(self) -> Result<String<MAX_PAYLOAD_SIZE>, FrameError> {
        let mut text = String::new();
        write!(text, "D/{}", self).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(text)
    }

    /// Payload text for a write request: `D/<item>/<value>`
    ///
    /// The value must be printable ASCII so it cannot collide with a frame marker.
    pub fn write_request(self, value: &str) -> Result<String<MAX_PAYLOAD_SIZE>, FrameError> {
        if !value.bytes().all(|b| (0x20..=0x7E).contains(&b)) {
            return Err(FrameError::ValueOutOfRange);
        }

        let mut text = String::new();
        write!(text, "D/{}/{}", self, value).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(text)
    }

    fn reply_prefix(self) -> String<PREFIX_LEN> {
        let mut prefix = String::new();
        // Three digits always fit
        let _ = write!(prefix, "D/{}/", self);
        prefix
    }
}

impl fmt::Display for ParameterItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Reply to a parameter read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParameterReply<'a> {
    /// Acknowledged marker; anything but `GoodOperation` is a rejection
    pub code: StatusCode,
    /// Value text with any echoed `D/<item>/` prefix removed
    pub value: &'a str,
}

impl<'a> ParameterReply<'a> {
    /// Decode a reply payload; a rejected reply carries no value text
    pub fn from_payload(payload: &'a [u8], item: ParameterItem) -> Result<Self, FrameError> {
        let code = result_code(payload)?;
        if !code.is_success() {
            return Ok(Self { code, value: "" });
        }

        let text = core::str::from_utf8(&payload[1..]).map_err(|_| FrameError::InvalidFormat)?;
        let prefix = item.reply_prefix();
        let value = text.strip_prefix(prefix.as_str()).unwrap_or(text);

        Ok(Self { code, value })
    }

    /// Returns true if the device accepted the parameter operation
    pub fn is_acknowledged(&self) -> bool {
        self.code.is_success()
    }
}
