//! MM010 transport abstraction
//!
//! This crate defines the serial port contract the dispenser driver talks
//! through. The driver never touches an operating system handle directly,
//! so the same protocol code runs against a real port or a scripted one.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (mm010-cli, etc.)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mm010-core (handshake + commands)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mm010-hal (this crate - traits)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  mm010-hal-serialport (native port)     │
//! └─────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]

pub mod serial;

pub use serial::{
    DataBits, ErrorType, Parity, SerialConfig, SerialOpen, SerialPort, SerialRx, SerialTx,
    StopBits,
};
