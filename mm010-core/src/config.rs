//! Connection configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//! baud = 9600
//! logging = true
//! read_timeout_ms = 5000
//! max_read_attempts = 1050
//! ```
//!
//! Only `port` is required.

use std::fs;
use std::path::Path;
use std::time::Duration;

use mm010_hal::SerialConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default per-read timeout
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

/// Default number of reads before a wait is abandoned
pub const DEFAULT_MAX_READ_ATTEMPTS: u32 = 1_050;

/// Line speeds supported by the dispenser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Baud {
    B1200,
    B2400,
    B4800,
    #[default]
    B9600,
}

impl Baud {
    /// Bits per second
    pub fn bits_per_second(self) -> u32 {
        match self {
            Baud::B1200 => 1200,
            Baud::B2400 => 2400,
            Baud::B4800 => 4800,
            Baud::B9600 => 9600,
        }
    }
}

impl TryFrom<u32> for Baud {
    type Error = String;

    fn try_from(rate: u32) -> std::result::Result<Self, Self::Error> {
        match rate {
            1200 => Ok(Baud::B1200),
            2400 => Ok(Baud::B2400),
            4800 => Ok(Baud::B4800),
            9600 => Ok(Baud::B9600),
            other => Err(format!("unsupported baud rate {other}")),
        }
    }
}

impl From<Baud> for u32 {
    fn from(baud: Baud) -> Self {
        baud.bits_per_second()
    }
}

/// Bound on how long the driver waits for the device
///
/// A wait gives up after `max_attempts` reads, each of which may block for
/// up to `read_timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub read_timeout: Duration,
}

impl RetryPolicy {
    /// Longest time a single wait can take
    pub fn ceiling(&self) -> Duration {
        self.read_timeout.saturating_mul(self.max_attempts)
    }
}

/// Dispenser connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispenserConfig {
    /// Serial device path
    pub port: String,
    #[serde(default)]
    pub baud: Baud,
    /// Log every frame at info level instead of trace
    #[serde(default)]
    pub logging: bool,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_max_read_attempts")]
    pub max_read_attempts: u32,
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

fn default_max_read_attempts() -> u32 {
    DEFAULT_MAX_READ_ATTEMPTS
}

impl DispenserConfig {
    /// Settings for `port` at `baud` with default timeouts
    pub fn new(port: impl Into<String>, baud: Baud) -> Self {
        Self {
            port: port.into(),
            baud,
            logging: false,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            max_read_attempts: DEFAULT_MAX_READ_ATTEMPTS,
        }
    }

    #[must_use]
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_read_attempts: u32, read_timeout: Duration) -> Self {
        self.max_read_attempts = max_read_attempts;
        self.read_timeout_ms = read_timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject settings that would make the driver misbehave
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(Error::Config("port must not be empty".into()));
        }
        if self.max_read_attempts == 0 {
            return Err(Error::Config("max_read_attempts must be at least 1".into()));
        }
        if self.read_timeout_ms == 0 {
            return Err(Error::Config("read_timeout_ms must be non-zero".into()));
        }
        Ok(())
    }

    /// Per-read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_read_attempts,
            read_timeout: self.read_timeout(),
        }
    }

    /// Line settings for the transport: 7 data bits, even parity, 1 stop bit
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig::seven_even_one(
            self.port.clone(),
            self.baud.bits_per_second(),
            self.read_timeout(),
        )
    }
}
