//! Lifecycle pump: translates channel and session notifications into
//! buffer state and observer notices

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::adapter::StreamNotice;
use super::incoming::IncomingBuffer;
use crate::session::{ChannelCommand, ChannelEvent, SessionEvent};

/// Why the pump stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseReason {
    /// The channel closed, remotely or because the session dropped it
    ChannelClosed,
    /// Session-level disconnect; the channel is closed on the way down
    SessionDisconnected,
    /// Explicit disposal through the adapter
    Disposed,
}

/// Event consumer for one channel stream.
///
/// Runs until the channel closes, the session disconnects, or the adapter
/// disposes the stream, then marks the incoming buffer disposed so every
/// blocked reader wakes. Asynchronous session errors pass through to
/// observers without touching stream state.
pub(crate) struct Pump {
    pub(crate) channel_id: u32,
    pub(crate) incoming: Arc<IncomingBuffer>,
    pub(crate) events: mpsc::Receiver<ChannelEvent>,
    pub(crate) session_events: broadcast::Receiver<SessionEvent>,
    pub(crate) notices: broadcast::Sender<StreamNotice>,
    pub(crate) cmd_tx: mpsc::Sender<ChannelCommand>,
    pub(crate) shutdown: Arc<Notify>,
}

impl Pump {
    /// Spawn the pump on the given runtime
    pub(crate) fn spawn(self, runtime: &Handle) -> JoinHandle<()> {
        runtime.spawn(self.run())
    }

    async fn run(mut self) {
        let reason = self.pump_events().await;
        debug!("Channel {} stream closing: {:?}", self.channel_id, reason);

        // First transition wins; an explicit dispose has already sent the
        // Close command itself.
        let first = self.incoming.dispose();
        if first && reason == CloseReason::SessionDisconnected {
            let _ = self.cmd_tx.try_send(ChannelCommand::Close {
                channel_id: self.channel_id,
            });
        }
    }

    async fn pump_events(&mut self) -> CloseReason {
        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(ChannelEvent::Data(data)) => {
                        trace!("Channel {} received {} bytes", self.channel_id, data.len());
                        if !self.incoming.push(&data) {
                            return CloseReason::Disposed;
                        }
                        let _ = self.notices.send(StreamNotice::Data(data));
                    }
                    Some(ChannelEvent::Closed) | None => {
                        return CloseReason::ChannelClosed;
                    }
                },
                event = self.session_events.recv() => match event {
                    Ok(SessionEvent::Disconnected) => {
                        return CloseReason::SessionDisconnected;
                    }
                    Ok(SessionEvent::Error(err)) => {
                        // Reported out of band; never wakes a blocked read
                        warn!("Channel {} session error: {}", self.channel_id, err);
                        let _ = self.notices.send(StreamNotice::Error(err));
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(
                            "Channel {} missed {} session events",
                            self.channel_id, missed
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // The session itself is gone
                        return CloseReason::SessionDisconnected;
                    }
                },
                _ = self.shutdown.notified() => {
                    return CloseReason::Disposed;
                }
            }
        }
    }
}
