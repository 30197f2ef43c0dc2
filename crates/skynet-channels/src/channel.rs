use async_trait::async_trait;
use skynet_protocol::dispatch::WakeSignal;

use crate::{error::ChannelError, types::ChannelStatus};

/// Common interface implemented by every outbound channel adapter. The
/// workspace currently ships one: the authenticated device channel (C8)
/// that pushes wake signals to the edge device. The trait is kept generic
/// so an additional outbound surface can be added without touching
/// [`ChannelManager`](crate::manager::ChannelManager)'s reconnect logic.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable lowercase identifier for this channel (e.g. `"device"`).
    ///
    /// The name is used as the key inside [`ChannelManager`](crate::manager::ChannelManager)
    /// and must be unique across all registered adapters.
    fn name(&self) -> &str;

    /// Establish the connection to the external service.
    ///
    /// Implementations should transition their internal state to
    /// [`ChannelStatus::Connected`] on success. Takes `&self` — status is
    /// interior-mutable (see [`DeviceChannel`](crate::device::DeviceChannel))
    /// so the manager can hold and share adapters behind an `Arc`.
    async fn connect(&self) -> Result<(), ChannelError>;

    /// Gracefully close the connection.
    ///
    /// Implementations should transition their internal state to
    /// [`ChannelStatus::Disconnected`] on success.
    async fn disconnect(&self) -> Result<(), ChannelError>;

    /// Push a single wake signal to the channel.
    ///
    /// This is intentionally `&self` (shared reference) so that a connected
    /// adapter can send concurrently without a mutable borrow.
    async fn send(&self, signal: &WakeSignal) -> Result<(), ChannelError>;

    /// Return the current runtime status without blocking.
    fn status(&self) -> ChannelStatus;
}
