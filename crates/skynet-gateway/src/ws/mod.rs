//! The Session Gateway (C6, `SPEC_FULL.md` §4.6): the axum WebSocket
//! endpoint and the three cooperating tasks — reader, uplink, downlink —
//! that drive one client's conversation against the live model.

pub mod connection;
pub mod context;
pub mod echo_filter;
pub mod playback;
