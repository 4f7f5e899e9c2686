//! MM010 Dispenser Serial Protocol
//!
//! This crate defines the polled, half-duplex protocol spoken by the MM010
//! note dispenser. The host sends a request frame and the device answers
//! with a code byte, a data frame and a closing code byte:
//!
//! ```text
//! host   -> 04 30 02 <CMD> <PAYLOAD...> 03 <BCC>
//! device <- 06                                      (ACK)
//! device <- 01 30 02 <CMD> <PAYLOAD...> 03 <BCC>    (data frame)
//! host   -> 06                                      (ACK)
//! device <- 04                                      (EOT)
//! ```
//!
//! `BCC` is the XOR of every byte from the start marker through `03`.
//! Numeric payload fields are shifted by 0x20 so they stay printable.

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod control;
pub mod frame;
pub mod param;
pub mod reply;
pub mod status;

pub use command::{Command, HostMessage};
pub use control::ResponseCode;
pub use frame::{
    checksum, parse_response, response_frame_len, unverified_frame_len, FrameError, RequestFrame,
    MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
};
pub use param::{ParameterItem, ParameterReply};
pub use reply::{Diagnostics, DispenseResult, PurgeResult, SingleNoteResult};
pub use status::{decode_offset, encode_offset, Status, StatusCode};
