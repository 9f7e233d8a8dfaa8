//! The public blocking stream type

use std::io::{self, Read, Write};
use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, Notify};
use tracing::debug;

use super::incoming::IncomingBuffer;
use super::lifecycle::Pump;
use super::outgoing::OutgoingBuffer;
use super::{StreamConfig, StreamError, StreamState};
use crate::session::{ChannelCommand, SessionError, TunnelSession};

/// Observer notification mirroring the stream's push-side activity
#[derive(Debug, Clone)]
pub enum StreamNotice {
    /// One arrival batch; the same bytes are also buffered for `read`
    Data(Bytes),
    /// Asynchronous session error; the stream stays open
    Error(Arc<SessionError>),
}

/// Clonable disposal handle.
///
/// Disposal is the only way to interrupt a blocked read, and the reading
/// thread holds the stream itself, so shutdown from elsewhere goes through
/// one of these.
#[derive(Clone)]
pub struct DisposeHandle {
    channel_id: u32,
    incoming: Arc<IncomingBuffer>,
    cmd_tx: mpsc::Sender<ChannelCommand>,
    shutdown: Arc<Notify>,
}

impl DisposeHandle {
    /// Dispose the stream. Idempotent.
    ///
    /// Closes the channel, stops the event pump and wakes every blocked
    /// reader; they drain what is buffered and then read 0.
    pub fn dispose(&self) {
        if self.incoming.dispose() {
            debug!("Channel {} stream disposed", self.channel_id);
            let _ = self.cmd_tx.try_send(ChannelCommand::Close {
                channel_id: self.channel_id,
            });
            self.shutdown.notify_one();
        }
    }
}

/// Blocking byte-stream over one forwarded tunnel channel.
///
/// Reads block until data arrives or the stream is disposed; writes are
/// fully transmitted by the time they return. The type implements
/// [`std::io::Read`] and [`std::io::Write`] and nothing else: there is no
/// seeking and no stream length, only buffer occupancy
/// ([`available`](Self::available)).
///
/// Reads and writes are blocking calls. Issue them from ordinary threads
/// (or `spawn_blocking`), not from an async executor thread.
pub struct ChannelStream {
    control: DisposeHandle,
    outgoing: OutgoingBuffer,
    notices: broadcast::Sender<StreamNotice>,
}

impl std::fmt::Debug for ChannelStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStream")
            .field("channel_id", &self.control.channel_id)
            .finish_non_exhaustive()
    }
}

impl ChannelStream {
    /// Open a tunnel channel to `dest_host:dest_port` and wrap it.
    ///
    /// Requires a tokio runtime context to host the event pump. If the
    /// open fails, every subscription made along the way is released
    /// before the error is returned.
    pub fn open<S: TunnelSession>(
        session: &S,
        dest_host: &str,
        dest_port: u16,
    ) -> Result<Self, StreamError> {
        Self::open_with(session, dest_host, dest_port, StreamConfig::default())
    }

    /// Open with explicit configuration
    pub fn open_with<S: TunnelSession>(
        session: &S,
        dest_host: &str,
        dest_port: u16,
        config: StreamConfig,
    ) -> Result<Self, StreamError> {
        let runtime = Handle::try_current().map_err(|_| StreamError::Runtime)?;

        // Subscribe before opening so a disconnect racing the open is not
        // missed; the receiver is dropped again if the open fails.
        let session_events = session.subscribe();
        let channel = session.open_direct(
            dest_host,
            dest_port,
            &config.origin_host,
            config.origin_port,
        )?;
        let (channel_id, cmd_tx, event_rx) = channel.into_parts();

        debug!("Channel {} open to {}:{}", channel_id, dest_host, dest_port);

        let incoming = Arc::new(IncomingBuffer::new());
        let (notices, _) = broadcast::channel(config.notice_capacity);
        let shutdown = Arc::new(Notify::new());

        let pump = Pump {
            channel_id,
            incoming: Arc::clone(&incoming),
            events: event_rx,
            session_events,
            notices: notices.clone(),
            cmd_tx: cmd_tx.clone(),
            shutdown: Arc::clone(&shutdown),
        };
        pump.spawn(&runtime);

        Ok(Self {
            control: DisposeHandle {
                channel_id,
                incoming,
                cmd_tx,
                shutdown,
            },
            outgoing: OutgoingBuffer::new(config.send_buffer_size),
            notices,
        })
    }

    /// ID of the underlying tunnel channel
    pub fn channel_id(&self) -> u32 {
        self.control.channel_id
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        if self.control.incoming.is_disposed() {
            StreamState::Disposed
        } else {
            StreamState::Open
        }
    }

    /// Check if the stream is open
    pub fn is_open(&self) -> bool {
        self.state() == StreamState::Open
    }

    /// Count of buffered, unread incoming bytes.
    ///
    /// Buffer occupancy, not a stream size: the value moves as data
    /// arrives and reads drain it.
    pub fn available(&self) -> usize {
        self.control.incoming.available()
    }

    /// Subscribe to push notifications.
    ///
    /// Observers see every arrival batch the blocking reads see; a caller
    /// consuming both paths will see every byte twice.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamNotice> {
        self.notices.subscribe()
    }

    /// Get a handle that can dispose the stream from another thread
    pub fn dispose_handle(&self) -> DisposeHandle {
        self.control.clone()
    }

    /// Dispose the stream. Idempotent.
    pub fn dispose(&self) {
        self.control.dispose();
    }

    /// Buffer bytes for transmission, flushing whenever the outgoing
    /// buffer fills, then flush the remainder. Every call is fully
    /// transmitted by the time it returns.
    fn append(&mut self, mut src: &[u8]) -> Result<(), StreamError> {
        if self.control.incoming.is_disposed() {
            return Err(StreamError::Disposed);
        }
        while !src.is_empty() {
            let taken = self.outgoing.fill(src);
            src = &src[taken..];
            if self.outgoing.is_full() {
                self.transmit()?;
            }
        }
        self.transmit()
    }

    /// Send pending outgoing bytes to the channel as a single payload
    fn transmit(&mut self) -> Result<(), StreamError> {
        if self.control.incoming.is_disposed() {
            return Err(StreamError::Disposed);
        }
        if let Some(data) = self.outgoing.take() {
            self.control
                .cmd_tx
                .blocking_send(ChannelCommand::Send {
                    channel_id: self.control.channel_id,
                    data,
                })
                .map_err(|_| StreamError::Disposed)?;
        }
        Ok(())
    }
}

impl Read for ChannelStream {
    /// Blocking read in FIFO order.
    ///
    /// Blocks only while no data is buffered and the stream is live. A
    /// short read is normal: whatever is buffered when the call drains,
    /// up to `buf.len()`, comes back immediately. Returns `Ok(0)` for an
    /// empty `buf` or at end-of-stream.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.control.incoming.read_blocking(buf))
    }
}

impl Write for ChannelStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.transmit().map_err(Into::into)
    }
}

impl Drop for ChannelStream {
    fn drop(&mut self) {
        self.dispose();
    }
}
