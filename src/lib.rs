//! # Tunnel Stream
//!
//! Blocking byte-stream access to a forwarded tunnel channel.
//!
//! A multiplexed session (anything that hosts independent logical channels
//! over one secure connection) delivers channel data through asynchronous
//! notifications. Ordinary blocking-I/O code wants a socket-like object it
//! can `read` and `write`. This crate bridges the two:
//! [`ChannelStream`](stream::ChannelStream) owns one tunnel channel and
//! exposes it as a [`std::io::Read`] + [`std::io::Write`] stream.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Caller threads (blocking)              │
//! │             read() / write() / flush()              │
//! ├─────────────────────────────────────────────────────┤
//! │                   Stream Adapter                    │
//! │     incoming buffer (mutex + condvar, FIFO)         │
//! │     outgoing buffer (bounded, flush on full)        │
//! │     lifecycle pump (event task, state machine)      │
//! ├─────────────────────────────────────────────────────┤
//! │          Session / channel (async, external)        │
//! │        events in ── commands out (channels)         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! The session and channel collaborators are consumed purely through the
//! contracts in [`session`]; transport security, channel multiplexing and
//! wire-level flow control all live on the session side.

pub mod session;
pub mod stream;

pub use stream::ChannelStream;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Stream error: {0}")]
    Stream(#[from] stream::StreamError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
