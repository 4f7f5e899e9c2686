//! Cycle state definition

use super::events::CycleEvent;

/// Exchange states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    /// No exchange in progress
    #[default]
    Idle,
    /// Request frame written
    RequestSent,
    /// Reading the first code byte
    AwaitingAck,
    /// Accumulating the data frame
    AwaitingData,
    /// Reading the closing code byte
    AwaitingEot,
    /// Exchange finished and reply decoded
    Complete,
    /// Exchange aborted
    Failed(FailureKind),
}

/// Types of failure that end an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Io,
    RetryExhausted,
    Format,
    Checksum,
    ResponseNotAck,
    ResponseNotEot,
    IllegalCommand,
    ConnectionClosed,
    InvalidArgument,
    Config,
}

impl CycleState {
    /// Check if the exchange has ended, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, CycleState::Complete | CycleState::Failed(_))
    }

    /// Check if this is a failure state
    pub fn is_failed(&self) -> bool {
        matches!(self, CycleState::Failed(_))
    }

    /// Process an event and return the next state
    pub fn transition(self, event: CycleEvent) -> Self {
        match (self, event) {
            // A failed exchange stays failed with its first cause
            (CycleState::Failed(kind), _) => CycleState::Failed(kind),
            (_, CycleEvent::Failed(kind)) => CycleState::Failed(kind),

            (CycleState::Idle, CycleEvent::RequestWritten) => CycleState::RequestSent,
            (CycleState::RequestSent, CycleEvent::WaitForAck) => CycleState::AwaitingAck,
            (CycleState::AwaitingAck, CycleEvent::AckReceived) => CycleState::AwaitingData,
            (CycleState::AwaitingData, CycleEvent::DataReceived) => CycleState::AwaitingEot,
            (CycleState::AwaitingEot, CycleEvent::EotReceived) => CycleState::Complete,

            // Default: stay in current state
            _ => self,
        }
    }
}
