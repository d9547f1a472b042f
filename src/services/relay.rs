//! Stream relay
//!
//! Owns one client-facing streaming session: pumps upstream wire chunks
//! through the adapter's normalizer and forwards canonical events to the
//! downstream channel. The state machine is
//! `Idle -> Streaming -> {Completed | Failed | ClientClosed}`; no state
//! accepts events after reaching a terminal state.

use crate::backends::ChunkNormalizer;
use crate::models::canonical::CanonicalEvent;
use crate::utils::error::GatewayError;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Relay session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Streaming,
    /// Adapter emitted Done, or the transport ended cleanly
    Completed,
    /// Adapter emitted Error, or the transport failed mid-stream
    Failed,
    /// The downstream consumer disconnected; upstream was cancelled
    ClientClosed,
}

impl RelayState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RelayState::Completed | RelayState::Failed | RelayState::ClientClosed
        )
    }
}

/// What a finished relay session leaves behind for accounting
#[derive(Debug)]
pub struct RelayOutcome {
    pub state: RelayState,
    /// Delta text accumulated up to the terminal state
    pub completion: String,
}

/// One client-facing streaming session
pub struct StreamRelay {
    state: RelayState,
    normalizer: Box<dyn ChunkNormalizer>,
    completion: String,
}

impl StreamRelay {
    pub fn new(normalizer: Box<dyn ChunkNormalizer>) -> Self {
        Self {
            state: RelayState::Idle,
            normalizer,
            completion: String::new(),
        }
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Pump the upstream chunk stream to the downstream channel until a
    /// terminal state is reached.
    ///
    /// Each event is forwarded before the next chunk is read, so downstream
    /// back-pressure (a full channel) pauses the upstream read. A failed
    /// send means the downstream consumer went away: the upstream stream is
    /// dropped, which cancels the in-flight request, and any late events
    /// are discarded rather than buffered.
    pub async fn pump<S>(mut self, mut upstream: S, tx: mpsc::Sender<CanonicalEvent>) -> RelayOutcome
    where
        S: Stream<Item = Result<Vec<u8>, GatewayError>> + Unpin,
    {
        self.state = RelayState::Streaming;

        while self.state == RelayState::Streaming {
            match upstream.next().await {
                Some(Ok(chunk)) => {
                    let events = self.normalizer.feed(&chunk);
                    self.forward_all(events, &tx).await;
                }
                Some(Err(error)) => {
                    warn!("upstream transport failed mid-stream: {}", error);
                    self.forward(
                        CanonicalEvent::Error {
                            message: error.to_string(),
                        },
                        &tx,
                    )
                    .await;
                    if self.state == RelayState::Streaming {
                        self.state = RelayState::Failed;
                    }
                }
                None => {
                    // Clean transport end without an explicit terminal event
                    let events = self.normalizer.finish();
                    self.forward_all(events, &tx).await;
                    if self.state == RelayState::Streaming {
                        self.state = RelayState::Completed;
                    }
                }
            }
        }

        debug!("relay finished in state {:?}", self.state);
        RelayOutcome {
            state: self.state,
            completion: self.completion,
        }
    }

    async fn forward_all(&mut self, events: Vec<CanonicalEvent>, tx: &mpsc::Sender<CanonicalEvent>) {
        for event in events {
            if !self.forward(event, tx).await {
                break;
            }
        }
    }

    /// Forward one event downstream; returns false once the session is over
    async fn forward(&mut self, event: CanonicalEvent, tx: &mpsc::Sender<CanonicalEvent>) -> bool {
        match &event {
            CanonicalEvent::Delta { text } => self.completion.push_str(text),
            CanonicalEvent::Done => self.state = RelayState::Completed,
            CanonicalEvent::Error { .. } => self.state = RelayState::Failed,
        }

        if tx.send(event).await.is_err() {
            debug!("downstream closed, cancelling upstream");
            self.state = RelayState::ClientClosed;
            return false;
        }

        self.state == RelayState::Streaming
    }
}
