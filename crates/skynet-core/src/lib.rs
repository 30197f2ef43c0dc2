//! `skynet-core` — shared types, layered configuration, and the error
//! taxonomy common to every crate in the workspace.
//!
//! Every other crate depends on this one; it must stay free of any
//! dependency on `skynet-agent`, `skynet-gateway`, or the store/channel
//! crates to avoid cycles.

pub mod config;
pub mod error;

pub use error::{Result, SkynetError};
