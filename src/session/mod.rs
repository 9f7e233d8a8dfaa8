//! Session and channel contracts
//!
//! The stream adapter does not speak the wire protocol itself. A session
//! object (external to this crate) owns the secure connection, multiplexes
//! channels over it, and performs framing and flow control. This module
//! defines the message-passing surface the adapter consumes:
//!
//! - [`TunnelSession`] opens direct tunnel channels and broadcasts
//!   session-level notifications
//! - [`TunnelChannel`] carries payload bytes and lifecycle events for one
//!   multiplexed sub-connection

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

/// Errors reported by the session collaborator
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Channel open failed: {0}")]
    ChannelOpen(String),

    #[error("Session disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session-level notification
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The transport connection dropped; every channel on it is dead
    Disconnected,
    /// The session hit an asynchronous fault; the session itself stays up
    Error(Arc<SessionError>),
}

/// Event posted by the session for one channel
#[derive(Debug)]
pub enum ChannelEvent {
    /// Payload bytes arrived from the remote end
    Data(Bytes),
    /// The channel was closed, by the remote end or by the session
    Closed,
}

/// Command sent to the session for one channel
#[derive(Debug)]
pub enum ChannelCommand {
    /// Transmit payload bytes to the remote end
    Send { channel_id: u32, data: Bytes },
    /// Tear the channel down
    Close { channel_id: u32 },
}

/// Handle to one open tunnel channel.
///
/// Commands flow to the session, events flow back. The session has already
/// confirmed the open by the time a handle exists; dropping the event
/// receiver is how the holder unsubscribes.
pub struct TunnelChannel {
    channel_id: u32,
    cmd_tx: mpsc::Sender<ChannelCommand>,
    event_rx: mpsc::Receiver<ChannelEvent>,
}

impl TunnelChannel {
    /// Create a handle from its two channel halves
    pub fn new(
        channel_id: u32,
        cmd_tx: mpsc::Sender<ChannelCommand>,
        event_rx: mpsc::Receiver<ChannelEvent>,
    ) -> Self {
        Self {
            channel_id,
            cmd_tx,
            event_rx,
        }
    }

    /// Get channel ID
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Split into command and event halves
    pub(crate) fn into_parts(
        self,
    ) -> (
        u32,
        mpsc::Sender<ChannelCommand>,
        mpsc::Receiver<ChannelEvent>,
    ) {
        (self.channel_id, self.cmd_tx, self.event_rx)
    }
}

/// A session that can open direct tunnel channels
pub trait TunnelSession {
    /// Open a channel tunneled to `dest_host:dest_port`.
    ///
    /// `origin_host:origin_port` identifies the local endpoint the
    /// forwarded connection is reported to originate from.
    fn open_direct(
        &self,
        dest_host: &str,
        dest_port: u16,
        origin_host: &str,
        origin_port: u16,
    ) -> Result<TunnelChannel, SessionError>;

    /// Subscribe to session lifecycle notifications
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
