//! Scripted in-memory port for tests
//!
//! Replays a queue of read steps and records every write. A test keeps a
//! [`ScriptHandle`] to inspect the traffic after the port has been moved
//! into a dispenser.

use std::collections::VecDeque;
use std::sync::Arc;

use mm010_hal::{ErrorType, SerialConfig, SerialOpen, SerialRx, SerialTx};
use mm010_protocol::frame::{checksum, DEVICE_ADDRESS, RESPONSE_START, TEXT_END, TEXT_START};
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("scripted port failure")]
pub struct ScriptError;

enum Step {
    Data(Vec<u8>),
    Timeout,
    Fail,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    written: Vec<u8>,
    write_calls: usize,
    read_calls: usize,
    /// Writes allowed before every further write fails
    write_budget: Option<usize>,
}

pub struct ScriptedPort {
    script: Arc<Mutex<Script>>,
}

#[derive(Clone)]
pub struct ScriptHandle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub fn handle(&self) -> ScriptHandle {
        ScriptHandle {
            script: Arc::clone(&self.script),
        }
    }

    pub fn reply(self, bytes: &[u8]) -> Self {
        self.script.lock().steps.push_back(Step::Data(bytes.to_vec()));
        self
    }

    pub fn timeouts(self, count: usize) -> Self {
        {
            let mut script = self.script.lock();
            for _ in 0..count {
                script.steps.push_back(Step::Timeout);
            }
        }
        self
    }

    pub fn fail_read(self) -> Self {
        self.script.lock().steps.push_back(Step::Fail);
        self
    }

    pub fn fail_writes_after(self, allowed: usize) -> Self {
        self.script.lock().write_budget = Some(allowed);
        self
    }
}

impl ScriptHandle {
    /// Queue more read steps on a port that has already been handed out
    pub fn push_reply(&self, bytes: &[u8]) {
        self.script.lock().steps.push_back(Step::Data(bytes.to_vec()));
    }

    pub fn written(&self) -> Vec<u8> {
        self.script.lock().written.clone()
    }

    pub fn write_calls(&self) -> usize {
        self.script.lock().write_calls
    }

    pub fn read_calls(&self) -> usize {
        self.script.lock().read_calls
    }
}

impl ErrorType for ScriptedPort {
    type Error = ScriptError;
}

impl SerialRx for ScriptedPort {
    fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut script = self.script.lock();
        script.read_calls += 1;

        match script.steps.pop_front() {
            Some(Step::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    let rest = bytes.split_off(n);
                    script.steps.push_front(Step::Data(rest));
                }
                Ok(n)
            }
            Some(Step::Fail) => Err(ScriptError),
            // A silent device looks like an endless run of timeouts
            Some(Step::Timeout) | None => Ok(0),
        }
    }
}

impl SerialTx for ScriptedPort {
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        let mut script = self.script.lock();
        if let Some(budget) = script.write_budget {
            if script.write_calls >= budget {
                return Err(ScriptError);
            }
        }
        script.write_calls += 1;
        script.written.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl SerialOpen for ScriptedPort {
    fn open(_config: &SerialConfig) -> Result<Self, Self::Error> {
        Ok(Self::new())
    }
}

/// A valid response data frame around `body`
pub fn data_frame(body: &[u8]) -> Vec<u8> {
    let mut raw = vec![RESPONSE_START, DEVICE_ADDRESS, TEXT_START];
    raw.extend_from_slice(body);
    raw.push(TEXT_END);
    raw.push(checksum(&raw));
    raw
}

/// ACK, data frame for `command` with `payload`, EOT
pub fn full_reply(command: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = vec![command];
    body.extend_from_slice(payload);

    let mut reply = vec![0x06];
    reply.extend_from_slice(&data_frame(&body));
    reply.push(0x04);
    reply
}
