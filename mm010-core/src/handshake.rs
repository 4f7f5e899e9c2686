//! Handshake engine
//!
//! Drives one request/reply exchange over a borrowed port:
//!
//! ```text
//! -> request frame
//! <- ACK
//! <- data frame
//! -> ACK
//! <- EOT
//! ```
//!
//! Every wait is a bounded loop of blocking reads. A read that times out
//! returns zero bytes and counts as one attempt; after `max_attempts`
//! attempts the wait fails with [`Error::RetryExhausted`].

use core::fmt;

use heapless::Vec;
use log::{debug, log, trace, warn, Level};
use mm010_hal::SerialPort;
use mm010_protocol::control::{ACK, NAK};
use mm010_protocol::{
    parse_response, response_frame_len, unverified_frame_len, RequestFrame, ResponseCode,
    MAX_FRAME_SIZE,
};

use crate::config::RetryPolicy;
use crate::error::{Error, Result};
use crate::state::{CycleEvent, CycleState};

/// Bytes requested from the port per read
const READ_CHUNK_SIZE: usize = 64;

/// Bytes between the text markers of a response: command echo plus payload
pub type ResponseBody = Vec<u8, MAX_FRAME_SIZE>;

/// Space-separated hex dump for traffic logs
pub(crate) struct Hex<'a>(pub &'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

/// One exchange in progress on a port
pub struct Handshake<'a, P> {
    port: &'a mut P,
    policy: RetryPolicy,
    traffic: Level,
    state: CycleState,
    /// Received bytes not yet consumed
    pending: Vec<u8, MAX_FRAME_SIZE>,
}

impl<'a, P: SerialPort> Handshake<'a, P> {
    /// Start an exchange; `logging` raises traffic logs from trace to info
    pub fn new(port: &'a mut P, policy: RetryPolicy, logging: bool) -> Self {
        Self {
            port,
            policy,
            traffic: if logging { Level::Info } else { Level::Trace },
            state: CycleState::Idle,
            pending: Vec::new(),
        }
    }

    /// Current cycle state
    pub fn state(&self) -> CycleState {
        self.state
    }

    fn advance(&mut self, event: CycleEvent) {
        let next = self.state.transition(event);
        if next != self.state {
            debug!("Cycle {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    /// Send a request and run the full response cycle
    ///
    /// Any failure leaves the exchange in `Failed(kind)`.
    pub fn exchange(&mut self, frame: &RequestFrame) -> Result<ResponseBody> {
        let result = self.send_frame(frame).and_then(|()| self.response_cycle());
        if let Err(e) = &result {
            self.advance(CycleEvent::Failed(e.kind()));
        }
        result
    }

    /// Build a request frame and write it in one write
    pub fn send_request(&mut self, command: u8, payload: &[u8]) -> Result<()> {
        let frame = RequestFrame::new(command, payload)?;
        self.send_frame(&frame)
    }

    /// Write an already built request frame
    pub fn send_frame(&mut self, frame: &RequestFrame) -> Result<()> {
        let encoded = frame.encode_to_vec()?;
        log!(self.traffic, "-> {}", Hex(&encoded));

        self.port.write_blocking(&encoded).map_err(Error::io)?;
        self.port.flush().map_err(Error::io)?;
        self.advance(CycleEvent::RequestWritten);
        Ok(())
    }

    /// ACK, data frame, ACK back, EOT
    ///
    /// Returns the response body once the closing EOT has been read.
    pub fn response_cycle(&mut self) -> Result<ResponseBody> {
        self.advance(CycleEvent::WaitForAck);
        let code = self.read_response_code()?;
        if code != ResponseCode::Ack {
            return Err(Error::ResponseNotAck(code));
        }
        self.advance(CycleEvent::AckReceived);

        let body = self.read_response_data()?;
        self.acknowledge()?;
        self.advance(CycleEvent::DataReceived);

        let code = self.read_response_code()?;
        if code != ResponseCode::Eot {
            return Err(Error::ResponseNotEot(code));
        }
        self.advance(CycleEvent::EotReceived);

        if !self.pending.is_empty() {
            debug!("Discarding {} bytes after EOT: {}", self.pending.len(), Hex(&self.pending[..]));
            self.pending.clear();
        }

        Ok(body)
    }

    /// Wait for one code byte and classify it
    ///
    /// Unknown bytes are returned as [`ResponseCode::Unrecognized`]; it is up
    /// to the caller to decide whether they are acceptable here.
    pub fn read_response_code(&mut self) -> Result<ResponseCode> {
        self.await_bytes(|buf| (!buf.is_empty()).then_some(1))?;
        let byte = self.consume(1)[0];

        let code = ResponseCode::from_byte(byte);
        match code {
            ResponseCode::Unrecognized(byte) => log!(self.traffic, "<- {byte:02X} (unrecognized)"),
            known => log!(self.traffic, "<- {}", known.mnemonic()),
        }
        Ok(code)
    }

    /// Accumulate a data frame, validate it and return its body
    pub fn read_response_data(&mut self) -> Result<ResponseBody> {
        let len = match self.await_bytes(response_frame_len) {
            Ok(len) => len,
            // Markers arrived but the checksum never matched
            Err(e @ Error::RetryExhausted { .. }) => {
                unverified_frame_len(&self.pending[..]).ok_or(e)?
            }
            Err(e) => return Err(e),
        };
        let raw = self.consume(len);
        log!(self.traffic, "<- {}", Hex(&raw));

        let body = parse_response(&raw)?;
        Vec::from_slice(body).map_err(|_| Error::Format)
    }

    /// Acknowledge the data frame
    pub fn acknowledge(&mut self) -> Result<()> {
        self.send_control(ACK)
    }

    /// Reject the data frame
    pub fn reject(&mut self) -> Result<()> {
        self.send_control(NAK)
    }

    fn send_control(&mut self, byte: u8) -> Result<()> {
        log!(self.traffic, "-> {}", ResponseCode::from_byte(byte).mnemonic());
        self.port
            .write_blocking(&[byte])
            .and_then(|()| self.port.flush())
            .map_err(|e| {
                warn!("Failed to send control byte {byte:02X}: {e}");
                Error::io(e)
            })
    }

    /// Read until `ready` finds what it needs in the pending bytes
    fn await_bytes<T>(&mut self, mut ready: impl FnMut(&[u8]) -> Option<T>) -> Result<T> {
        let mut attempts = 0;
        loop {
            if let Some(found) = ready(&self.pending[..]) {
                return Ok(found);
            }
            if attempts >= self.policy.max_attempts {
                debug!("Giving up after {attempts} reads, {} bytes pending", self.pending.len());
                return Err(Error::RetryExhausted { attempts });
            }
            attempts += 1;

            let room = self.pending.capacity() - self.pending.len();
            if room == 0 {
                // Full buffer and still no frame end: the stream is out of step
                return Err(Error::Format);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let want = room.min(READ_CHUNK_SIZE);
            let n = self.port.read_blocking(&mut chunk[..want]).map_err(Error::io)?;
            if n == 0 {
                trace!("Read timeout ({attempts}/{})", self.policy.max_attempts);
                continue;
            }

            // `want` never exceeds the remaining room
            let _ = self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    /// Remove and return the first `n` pending bytes
    fn consume(&mut self, n: usize) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut taken = Vec::new();
        let _ = taken.extend_from_slice(&self.pending[..n]);
        self.pending.rotate_left(n);
        self.pending.truncate(self.pending.len() - n);
        taken
    }
}
