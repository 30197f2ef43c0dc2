//! `skynet-protocol` — wire formats shared across the workspace: the client
//! WebSocket envelopes carried by the session gateway (`frames`), the
//! device-wake control-plane message and queue job payloads pushed by the
//! deferred dispatcher (`dispatch`), and the two functions the live model
//! declares as callable tools (`tools`).

pub mod dispatch;
pub mod frames;
pub mod tools;

pub use dispatch::{QueueJob, WakeSignal};
pub use frames::{ClientFrame, ServerFrame};
