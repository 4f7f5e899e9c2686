//! Events that advance an exchange

use super::machine::FailureKind;

/// Events that can trigger cycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEvent {
    /// Request frame handed to the port
    RequestWritten,
    /// Started waiting for the first code byte
    WaitForAck,
    /// First code byte was ACK
    AckReceived,
    /// Data frame validated and acknowledged
    DataReceived,
    /// Closing code byte was EOT
    EotReceived,
    /// Anything went wrong
    Failed(FailureKind),
}
