//! Host-side driver for the MM010 note dispenser
//!
//! This crate runs the dispenser protocol over any port that implements
//! the `mm010-hal` traits:
//!
//! - Handshake engine (code bytes, data frame accumulation, ACK/EOT)
//! - Per-call cycle state machine
//! - Connection object with the command surface
//! - Configuration loading
//!
//! Commands on one connection are serialized internally: the port lock is
//! held from the request write until the closing EOT has been read.

#![deny(unsafe_code)]

pub mod config;
pub mod dispenser;
pub mod error;
pub mod handshake;
pub mod state;

#[cfg(test)]
mod mock;

pub use config::{Baud, DispenserConfig, RetryPolicy};
pub use dispenser::Dispenser;
pub use error::{Error, Result};
pub use state::{CycleEvent, CycleState, FailureKind};

pub use mm010_protocol::{
    Diagnostics, DispenseResult, ParameterItem, PurgeResult, ResponseCode, SingleNoteResult,
    Status, StatusCode,
};
