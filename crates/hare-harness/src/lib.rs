//! Hare Harness
//!
//! Collaborators for exercising the game without a messaging platform:
//! a transport that records every call and can be scripted to fail private
//! deliveries, and a clock that only moves when told to.

pub mod clock;
pub mod recording_transport;

pub use clock::ManualClock;
pub use recording_transport::{RecordingTransport, TransportCall};
