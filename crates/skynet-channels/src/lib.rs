//! `skynet-channels` — Outbound Channels (C8): the authenticated device
//! channel used to push wake signals when a deferred job needs to reach an
//! inactive session, plus the generic adapter/backoff scaffolding the
//! session gateway's other outbound surfaces could reuse.

pub mod channel;
pub mod device;
pub mod error;
pub mod manager;
pub mod types;

pub use channel::Channel;
pub use device::DeviceChannel;
pub use error::ChannelError;
pub use manager::ChannelManager;
pub use types::ChannelStatus;
