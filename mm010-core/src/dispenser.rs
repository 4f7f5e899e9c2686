//! Dispenser connection and command surface
//!
//! A [`Dispenser`] owns the port. Each command locks the connection, writes
//! one request and runs one full response cycle before releasing it, so a
//! shared `Dispenser` can be used from several threads without interleaving
//! frames on the wire.

use log::{debug, info};
use mm010_hal::{SerialOpen, SerialPort};
use mm010_protocol::reply::{result_code, split_echo};
use mm010_protocol::{
    Diagnostics, DispenseResult, HostMessage, ParameterItem, ParameterReply, PurgeResult,
    SingleNoteResult, Status, StatusCode,
};
use parking_lot::Mutex;

use crate::config::DispenserConfig;
use crate::error::{Error, Result};
use crate::handshake::Handshake;
use crate::state::{CycleEvent, CycleState, FailureKind};

struct Connection<P> {
    port: Option<P>,
    last_state: CycleState,
}

/// Connection to one MM010 dispenser
pub struct Dispenser<P> {
    config: DispenserConfig,
    conn: Mutex<Connection<P>>,
}

impl<P: SerialPort + SerialOpen> Dispenser<P> {
    /// Open the port described by `config`
    pub fn open(config: DispenserConfig) -> Result<Self> {
        config.validate()?;
        let port = P::open(&config.serial_config()).map_err(Error::io)?;
        info!("Opened {} at {} baud", config.port, config.baud.bits_per_second());
        Ok(Self::with_port(port, config))
    }

    /// Open the port again with the stored configuration
    ///
    /// An open port is closed first.
    pub fn reopen(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        if let Some(mut port) = conn.port.take() {
            port.flush().map_err(Error::io)?;
        }
        conn.port = Some(P::open(&self.config.serial_config()).map_err(Error::io)?);
        conn.last_state = CycleState::Idle;
        info!("Reopened {}", self.config.port);
        Ok(())
    }
}

impl<P: SerialPort> Dispenser<P> {
    /// Adopt an already open port
    pub fn with_port(port: P, config: DispenserConfig) -> Self {
        Self {
            config,
            conn: Mutex::new(Connection {
                port: Some(port),
                last_state: CycleState::Idle,
            }),
        }
    }

    pub fn config(&self) -> &DispenserConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().port.is_some()
    }

    /// Close the port
    ///
    /// Waits for a command in progress on another thread to finish.
    /// Closing a closed connection does nothing.
    pub fn close(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        if let Some(mut port) = conn.port.take() {
            port.flush().map_err(Error::io)?;
            info!("Closed {}", self.config.port);
        }
        Ok(())
    }

    /// State the most recent command ended in
    pub fn last_cycle_state(&self) -> CycleState {
        self.conn.lock().last_state
    }

    /// Send a bare ACK byte
    pub fn ack(&self) -> Result<()> {
        self.with_link(|link| link.acknowledge())
    }

    /// Send a bare NAK byte
    pub fn nack(&self) -> Result<()> {
        self.with_link(|link| link.reject())
    }

    fn with_link<T>(&self, f: impl FnOnce(&mut Handshake<'_, P>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let port = conn.port.as_mut().ok_or(Error::ConnectionClosed)?;
        let mut link = Handshake::new(port, self.config.retry_policy(), self.config.logging);
        f(&mut link)
    }

    /// Run one exchange and decode the payload after the command echo
    fn execute<T>(
        &self,
        message: &HostMessage<'_>,
        decode: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.conn.lock();
        let Connection { port, last_state } = &mut *conn;

        let Some(port) = port.as_mut() else {
            *last_state = CycleState::Failed(FailureKind::ConnectionClosed);
            return Err(Error::ConnectionClosed);
        };

        let command = message.command();
        debug!("Executing {:?}", command);

        let mut link = Handshake::new(port, self.config.retry_policy(), self.config.logging);
        let result = message.to_frame().map_err(Error::from).and_then(|frame| {
            let body = link.exchange(&frame)?;
            let payload = split_echo(&body, command)?;
            decode(payload)
        });

        *last_state = match &result {
            Ok(_) => link.state(),
            Err(e) => link.state().transition(CycleEvent::Failed(e.kind())),
        };
        result
    }

    /// Sensor flags and double detect averages
    pub fn status(&self) -> Result<Status> {
        self.execute(&HostMessage::Status, |p| Ok(Status::from_payload(p)?))
    }

    /// Clear the note path into the reject vault
    pub fn purge(&self) -> Result<PurgeResult> {
        self.execute(&HostMessage::Purge, |p| Ok(PurgeResult::from_payload(p)?))
    }

    /// Dispense `count` notes to the exit
    pub fn dispense(&self, count: u8) -> Result<DispenseResult> {
        self.execute(&HostMessage::Dispense { count }, |p| {
            Ok(DispenseResult::from_payload(p)?)
        })
    }

    /// Dispense `count` notes into the reject vault
    pub fn test_dispense(&self, count: u8) -> Result<DispenseResult> {
        self.execute(&HostMessage::TestDispense { count }, |p| {
            Ok(DispenseResult::from_payload(p)?)
        })
    }

    pub fn reset(&self) -> Result<StatusCode> {
        self.execute(&HostMessage::Reset, |p| Ok(result_code(p)?))
    }

    /// Result of the previous dispense-type operation
    pub fn last_status(&self) -> Result<DispenseResult> {
        self.execute(&HostMessage::LastStatus, |p| {
            Ok(DispenseResult::from_payload(p)?)
        })
    }

    pub fn configuration_status(&self) -> Result<Diagnostics> {
        self.execute(&HostMessage::ConfigurationStatus, |p| {
            Ok(Diagnostics::from_payload(p)?)
        })
    }

    pub fn double_detect_diagnostics(&self) -> Result<Diagnostics> {
        self.execute(&HostMessage::DoubleDetectDiagnostics, |p| {
            Ok(Diagnostics::from_payload(p)?)
        })
    }

    pub fn sensor_diagnostics(&self) -> Result<Diagnostics> {
        self.execute(&HostMessage::SensorDiagnostics, |p| {
            Ok(Diagnostics::from_payload(p)?)
        })
    }

    pub fn single_note_dispense(&self) -> Result<SingleNoteResult> {
        self.execute(&HostMessage::SingleNoteDispense, |p| {
            Ok(SingleNoteResult::from_payload(p)?)
        })
    }

    pub fn single_note_eject(&self) -> Result<StatusCode> {
        self.execute(&HostMessage::SingleNoteEject, |p| Ok(result_code(p)?))
    }

    /// Read a parameter's value text
    pub fn read_parameter(&self, item: ParameterItem) -> Result<String> {
        self.execute(&HostMessage::ReadParameter { item }, |p| {
            let reply = ParameterReply::from_payload(p, item)?;
            if !reply.is_acknowledged() {
                return Err(Error::IllegalCommand(reply.code));
            }
            Ok(reply.value.to_owned())
        })
    }

    /// Write a parameter's value text
    pub fn write_parameter(&self, item: ParameterItem, value: &str) -> Result<()> {
        self.execute(&HostMessage::WriteParameter { item, value }, |p| {
            let reply = ParameterReply::from_payload(p, item)?;
            if !reply.is_acknowledged() {
                return Err(Error::IllegalCommand(reply.code));
            }
            Ok(())
        })
    }

    /// Put the dispenser into self-test mode
    pub fn test_mode(&self) -> Result<StatusCode> {
        self.execute(&HostMessage::TestMode, |p| Ok(result_code(p)?))
    }
}
