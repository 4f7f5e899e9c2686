//! Native serial port transport
//!
//! Implements the `mm010-hal` traits on top of the `serialport` crate.
//! The OS driver reports an expired read timeout as an error; this crate
//! turns it into an empty read so callers can count attempts.

#![deny(unsafe_code)]

use std::io::{self, Read, Write};

use log::debug;
use mm010_hal::{DataBits, ErrorType, Parity, SerialConfig, SerialOpen, SerialRx, SerialTx, StopBits};
use thiserror::Error;

/// Errors from the native port
#[derive(Debug, Error)]
pub enum NativePortError {
    /// The port could not be opened or configured
    #[error("failed to open serial port: {0}")]
    Open(#[from] serialport::Error),
    /// A read or write on the open port failed
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A serial port opened through the operating system
pub struct NativePort {
    name: String,
    inner: Box<dyn serialport::SerialPort>,
}

impl NativePort {
    /// Device path this port was opened with
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl core::fmt::Debug for NativePort {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NativePort").field("name", &self.name).finish()
    }
}

fn data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Seven => serialport::DataBits::Seven,
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
        Parity::Even => serialport::Parity::Even,
        Parity::Odd => serialport::Parity::Odd,
    }
}

fn stop_bits(bits: StopBits) -> serialport::StopBits {
    match bits {
        StopBits::One => serialport::StopBits::One,
        StopBits::Two => serialport::StopBits::Two,
    }
}

impl ErrorType for NativePort {
    type Error = NativePortError;
}

impl SerialOpen for NativePort {
    fn open(config: &SerialConfig) -> Result<Self, Self::Error> {
        debug!(
            "Opening {} at {} baud, timeout {:?}",
            config.path, config.baudrate, config.read_timeout
        );

        let inner = serialport::new(config.path.as_str(), config.baudrate)
            .data_bits(data_bits(config.data_bits))
            .parity(parity(config.parity))
            .stop_bits(stop_bits(config.stop_bits))
            .flow_control(serialport::FlowControl::None)
            .timeout(config.read_timeout)
            .open()?;

        Ok(Self {
            name: config.path.clone(),
            inner,
        })
    }
}

impl SerialRx for NativePort {
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.inner.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl SerialTx for NativePort {
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.inner.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_setting_mapping() {
        assert_eq!(data_bits(DataBits::Seven), serialport::DataBits::Seven);
        assert_eq!(parity(Parity::Even), serialport::Parity::Even);
        assert_eq!(stop_bits(StopBits::One), serialport::StopBits::One);
    }

    #[test]
    fn test_open_missing_port_fails() {
        let config = SerialConfig::seven_even_one(
            "/dev/mm010-does-not-exist",
            9600,
            std::time::Duration::from_millis(10),
        );
        let result = NativePort::open(&config);
        assert!(matches!(result, Err(NativePortError::Open(_))));
    }
}
