//! Blocking stream adapter over a tunnel channel
//!
//! Provides:
//! - Incoming buffer bridging asynchronous data arrival to blocking reads
//! - Outgoing buffer with capacity-bounded flushing
//! - Lifecycle pump translating channel/session events into stream state
//! - [`ChannelStream`], the public blocking stream type

mod adapter;
mod incoming;
mod lifecycle;
mod outgoing;

pub use adapter::{ChannelStream, DisposeHandle, StreamNotice};

use thiserror::Error;

use crate::session::SessionError;

/// Stream adapter errors
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Channel open failed: {0}")]
    Open(#[from] SessionError),

    #[error("Stream disposed")]
    Disposed,

    #[error("No tokio runtime available for the event pump")]
    Runtime,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StreamError> for std::io::Error {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Disposed => {
                std::io::Error::new(std::io::ErrorKind::NotConnected, err)
            }
            StreamError::Io(e) => e,
            _ => std::io::Error::new(std::io::ErrorKind::Other, err),
        }
    }
}

/// Adapter lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Stream is open and usable
    Open,
    /// Stream has been disposed; reads drain what is buffered, then
    /// report end-of-stream
    Disposed,
}

/// Default outgoing buffer capacity (64 KiB)
pub const SEND_BUFFER_SIZE: usize = 65536;

/// Tuning knobs for a channel stream
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Outgoing buffer capacity; a full buffer forces a transmission
    pub send_buffer_size: usize,
    /// Queue depth for observer notices
    pub notice_capacity: usize,
    /// Origin host reported when opening the channel
    pub origin_host: String,
    /// Origin port reported when opening the channel
    pub origin_port: u16,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            send_buffer_size: SEND_BUFFER_SIZE,
            notice_capacity: 64,
            origin_host: "127.0.0.1".to_string(),
            origin_port: 0,
        }
    }
}
