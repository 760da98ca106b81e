//! Transport boundary to the radio collaborator
//!
//! The OS radio stack (enumeration, scanning, socket setup, permission
//! prompts) lives outside this crate. It plugs in through [`RadioTransport`];
//! the core only ever sees typed device values and a blocking byte channel.

use crate::core::types::DeviceInfo;
use crate::error::Result;
use uuid::Uuid;

pub mod mock;

/// Handle that tears down a byte channel from another thread.
///
/// Closing the channel is the only cancellation mechanism for the read loop:
/// a pending blocking read must fail once `close` has been called.
pub trait ChannelCloser: Send + Sync {
    fn close(&self);
}

/// Reliable, ordered, bidirectional byte channel to a connected device.
///
/// `read` blocks until data arrives, the peer goes away, or a
/// [`ChannelCloser`] closes the channel. EOF and errors are equivalent to the
/// caller; both end the stream.
pub trait ByteChannel: Send {
    /// Read into `buffer`, returning the number of bytes read (0 on EOF)
    fn read(&mut self, buffer: &mut [u8]) -> std::io::Result<usize>;

    /// Handle that unblocks any pending read when closed
    fn closer(&self) -> Box<dyn ChannelCloser>;
}

/// Radio collaborator surface: device enumeration, discovery control and
/// channel setup. Authorization failures surface as errors.
pub trait RadioTransport: Send + Sync {
    /// Radio hardware present and enabled
    fn is_available(&self) -> bool;

    /// Devices previously paired and persisted by the transport layer
    fn bonded_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Ask the radio to start an active scan
    fn start_discovery(&self) -> Result<()>;

    /// Ask the radio to stop scanning; safe to call when no scan is active.
    /// Returns whether a stop request was issued.
    fn cancel_discovery(&self) -> bool;

    /// Open a byte channel to `address` using the given well-known service
    /// identifier
    fn open_channel(&self, address: &str, service: Uuid) -> Result<Box<dyn ByteChannel>>;
}
