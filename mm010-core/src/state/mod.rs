//! Per-call protocol state machine
//!
//! Every command runs one fresh exchange:
//! Idle → RequestSent → AwaitingAck → AwaitingData → AwaitingEot → Complete.
//! Any failure moves straight to `Failed(kind)`.

pub mod events;
pub mod machine;

pub use events::CycleEvent;
pub use machine::{CycleState, FailureKind};
