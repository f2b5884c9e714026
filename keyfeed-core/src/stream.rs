//! Live notification stream connection state machine.
//!
//! Pure and side-effect free: events go in, a new state and a list of
//! actions come out. keyfeed-client opens the HTTP stream, arms timers and
//! reports back. The session also tracks the newest event id so every
//! (re)connect resumes from it.

use std::time::Duration;

use keyfeed_types::EventId;

/// Default cap on the exponential part of the reconnect delay.
pub const DEFAULT_MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Upper bound of the random jitter added to every reconnect delay.
pub const MAX_JITTER_MS: u64 = 5000;

/// Connection lifecycle of the live stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No stream and no reconnect pending.
    Closed,
    /// Connection attempt in progress.
    Connecting {
        /// Reconnect attempts made before this one (0 for the first connect).
        attempt: u32,
    },
    /// The stream is delivering events.
    Open,
    /// Disconnected, waiting for the reconnect timer.
    Reconnecting {
        /// Number of reconnection attempts so far.
        attempt: u32,
    },
}

impl StreamState {
    /// Whether the stream is delivering events.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether a connect or reconnect is underway.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting { .. } | Self::Reconnecting { .. })
    }
}

impl Default for StreamState {
    fn default() -> Self {
        Self::Closed
    }
}

/// Inputs to [`StreamSession::on_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The application wants the stream.
    OpenRequested,
    /// The server accepted the stream.
    Connected,
    /// The connection attempt failed.
    ConnectFailed {
        /// What went wrong.
        error: String,
    },
    /// An open stream ended or errored.
    Disconnected {
        /// Why the stream ended.
        reason: String,
    },
    /// The reconnect timer fired.
    ReconnectTimer,
    /// The application tore the stream down.
    CloseRequested,
    /// The server rejected the connection and no session is left to retry with.
    SessionEnded,
}

/// Instructions for the I/O layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamAction {
    /// Open the stream, resuming after `last_event_id`.
    Connect {
        /// Value for the `Last-Event-ID` header.
        last_event_id: Option<EventId>,
    },
    /// Drop the current stream.
    Disconnect,
    /// Arm the reconnect timer.
    StartReconnectTimer {
        /// Delay before the next attempt.
        delay: Duration,
    },
    /// Disarm the reconnect timer.
    CancelReconnect,
    /// Report to the application.
    Emit(StreamNotice),
}

/// What the application hears about the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamNotice {
    /// The stream is open.
    Opened,
    /// The stream failed and a reconnect is scheduled.
    Degraded {
        /// Underlying error.
        error: String,
        /// Reconnect attempt that is now scheduled.
        attempt: u32,
    },
    /// The stream was closed on request.
    Closed,
    /// The session ended; no further reconnects until a new subscription.
    SignedOut,
}

/// Reconnect delay settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Cap on the exponential base delay.
    pub max_delay: Duration,
    /// Server-provided `retry:` hint; replaces the exponential base.
    pub retry_hint: Option<Duration>,
}

impl ReconnectPolicy {
    /// Policy with the given cap and no hint.
    pub fn with_max_delay(max_delay: Duration) -> Self {
        Self {
            max_delay,
            retry_hint: None,
        }
    }

    /// Base delay for `attempt`, before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        if let Some(hint) = self.retry_hint {
            return hint;
        }
        let secs = 2u64.pow(attempt.min(16));
        Duration::from_secs(secs).min(self.max_delay)
    }

    /// Delay for `attempt` including jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay(attempt) + Duration::from_millis(random_jitter_ms())
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::with_max_delay(DEFAULT_MAX_RECONNECT_DELAY)
    }
}

/// The stream state plus what each (re)connect needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSession {
    state: StreamState,
    policy: ReconnectPolicy,
    last_event_id: Option<EventId>,
}

impl StreamSession {
    /// A closed session that will resume after `last_event_id`.
    pub fn new(last_event_id: Option<EventId>, policy: ReconnectPolicy) -> Self {
        Self {
            state: StreamState::Closed,
            policy,
            last_event_id,
        }
    }

    /// Current state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Newest event id seen.
    pub fn last_event_id(&self) -> Option<&EventId> {
        self.last_event_id.as_ref()
    }

    /// Record the id of a delivered event.
    pub fn record_event_id(&mut self, id: EventId) {
        self.last_event_id = Some(id);
    }

    /// Apply a server `retry:` hint to later reconnects.
    pub fn set_retry_hint(&mut self, hint: Duration) {
        self.policy.retry_hint = Some(hint);
    }

    /// Process an event and return the actions to execute.
    ///
    /// Invalid transitions leave the state unchanged and produce no actions.
    pub fn on_event(&mut self, event: StreamEvent) -> Vec<StreamAction> {
        use StreamState as S;

        let (next, actions) = match (self.state, event) {
            (S::Closed, StreamEvent::OpenRequested) => {
                (S::Connecting { attempt: 0 }, vec![self.connect()])
            }

            (S::Connecting { .. }, StreamEvent::Connected) => {
                (S::Open, vec![StreamAction::Emit(StreamNotice::Opened)])
            }
            (S::Connecting { attempt }, StreamEvent::ConnectFailed { error })
            | (S::Connecting { attempt }, StreamEvent::Disconnected { reason: error }) => {
                self.schedule_reconnect(attempt.saturating_add(1), error)
            }

            (S::Open, StreamEvent::Disconnected { reason }) => {
                let mut actions = vec![StreamAction::Disconnect];
                let (next, more) = self.schedule_reconnect(1, reason);
                actions.extend(more);
                (next, actions)
            }

            (S::Reconnecting { attempt }, StreamEvent::ReconnectTimer) => {
                (S::Connecting { attempt }, vec![self.connect()])
            }

            (S::Connecting { .. } | S::Open, StreamEvent::CloseRequested) => (
                S::Closed,
                vec![
                    StreamAction::Disconnect,
                    StreamAction::Emit(StreamNotice::Closed),
                ],
            ),
            (S::Reconnecting { .. }, StreamEvent::CloseRequested) => (
                S::Closed,
                vec![
                    StreamAction::CancelReconnect,
                    StreamAction::Emit(StreamNotice::Closed),
                ],
            ),

            (S::Connecting { .. }, StreamEvent::SessionEnded) => {
                (S::Closed, vec![StreamAction::Emit(StreamNotice::SignedOut)])
            }

            (state, _) => (state, Vec::new()),
        };

        self.state = next;
        actions
    }

    fn connect(&self) -> StreamAction {
        StreamAction::Connect {
            last_event_id: self.last_event_id.clone(),
        }
    }

    fn schedule_reconnect(&self, attempt: u32, error: String) -> (StreamState, Vec<StreamAction>) {
        (
            StreamState::Reconnecting { attempt },
            vec![
                StreamAction::Emit(StreamNotice::Degraded { error, attempt }),
                StreamAction::StartReconnectTimer {
                    delay: self.policy.delay(attempt),
                },
            ],
        )
    }
}

/// Random jitter between 0 and [`MAX_JITTER_MS`] milliseconds.
fn random_jitter_ms() -> u64 {
    let mut bytes = [0u8; 8];
    if getrandom::getrandom(&mut bytes).is_err() {
        return 0;
    }
    u64::from_le_bytes(bytes) % (MAX_JITTER_MS + 1)
}
