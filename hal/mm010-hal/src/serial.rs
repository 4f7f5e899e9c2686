//! Serial port abstractions
//!
//! Blocking, byte-oriented duplex channel with a bounded read timeout.

use std::time::Duration;

/// Error type shared by the receive and transmit halves of a port
pub trait ErrorType {
    /// Error type for port operations
    type Error: std::error::Error + Send + Sync + 'static;
}

/// Serial transmitter
pub trait SerialTx: ErrorType {
    /// Write all of `data` to the port
    ///
    /// Blocks until every byte has been handed to the driver or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Serial receiver
pub trait SerialRx: ErrorType {
    /// Read whatever is available into `buf`
    ///
    /// Blocks for at most the configured read timeout. Returning `Ok(0)`
    /// means the timeout elapsed with nothing received; it is not an error.
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Ports that can be opened from a [`SerialConfig`]
pub trait SerialOpen: Sized + ErrorType {
    /// Open the port described by `config`
    fn open(config: &SerialConfig) -> Result<Self, Self::Error>;
}

/// Combined serial interface
pub trait SerialPort: SerialTx + SerialRx {}

// Blanket implementation
impl<T: SerialTx + SerialRx> SerialPort for T {}

/// Serial line configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM4`
    pub path: String,
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
    /// Longest time a single read may block
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Line settings used by the dispenser: 7 data bits, even parity, 1 stop bit
    pub fn seven_even_one(path: impl Into<String>, baudrate: u32, read_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            baudrate,
            data_bits: DataBits::Seven,
            parity: Parity::Even,
            stop_bits: StopBits::One,
            read_timeout,
        }
    }
}

/// Number of data bits per character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}
