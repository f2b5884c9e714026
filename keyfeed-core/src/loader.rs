//! Cursor-paginated list loading.
//!
//! [`LoadPhase`] is a pure transition table; [`PagedList`] owns the items and
//! hands out [`LoadTicket`]s so that the caller (keyfeed-client) performs the
//! request and reports back. A ticket carries a generation number: a refresh
//! bumps it, and completions for an older generation are discarded. This
//! makes overlapping requests harmless instead of relying on the caller's
//! timing.

use keyfeed_types::ApiError;
use thiserror::Error;

/// Message shown when the backend reports 503.
pub const SERVICE_BUSY_MESSAGE: &str =
    "The service is busy or under maintenance. Please try again in a moment.";

/// Message shown when a failure carries no message of its own.
pub const LOAD_FAILED_MESSAGE: &str = "Could not load content. Please try again later.";

/// Loader lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadPhase {
    /// Nothing requested yet.
    Idle,
    /// Initial or refresh load in flight.
    Loading,
    /// Pagination load in flight.
    LoadingMore,
    /// Last load succeeded.
    Ready,
    /// Last load failed; previously loaded items are kept.
    Failed,
}

/// Inputs to [`LoadPhase::on_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadEvent {
    /// Start an initial or refresh load.
    Refresh,
    /// Start a pagination load.
    Paginate,
    /// The in-flight load succeeded.
    Succeeded,
    /// The in-flight load failed.
    Failed,
}

/// A transition the phase table does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot apply {event:?} while {from:?}")]
pub struct TransitionError {
    /// Phase the event was applied to.
    pub from: LoadPhase,
    /// The rejected event.
    pub event: LoadEvent,
}

impl LoadPhase {
    /// Apply an event, returning the next phase.
    ///
    /// A refresh supersedes an in-flight pagination load but not another
    /// refresh. Pagination only starts from a settled phase.
    pub fn on_event(self, event: LoadEvent) -> Result<Self, TransitionError> {
        use LoadEvent as E;
        use LoadPhase as P;

        match (self, event) {
            (P::Idle | P::Ready | P::Failed | P::LoadingMore, E::Refresh) => Ok(P::Loading),
            (P::Ready | P::Failed, E::Paginate) => Ok(P::LoadingMore),
            (P::Loading | P::LoadingMore, E::Succeeded) => Ok(P::Ready),
            (P::Loading | P::LoadingMore, E::Failed) => Ok(P::Failed),
            (from, event) => Err(TransitionError { from, event }),
        }
    }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadPhase::Loading | LoadPhase::LoadingMore)
    }
}

/// Items addressable by a stable string key.
pub trait Keyed {
    /// The item's key (e.g. the content id as a string).
    fn key(&self) -> &str;
}

/// One page returned by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T, C> {
    /// Items in server order.
    pub items: Vec<T>,
    /// Cursor for the next page.
    pub next_cursor: Option<C>,
    /// Whether another page exists.
    pub has_next: bool,
}

impl<T, C> Page<T, C> {
    /// A final page.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
            has_next: false,
        }
    }
}

/// Permission to perform one load, issued by [`PagedList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket<C> {
    generation: u64,
    cursor: Option<C>,
}

impl<C> LoadTicket<C> {
    /// Cursor to send; `None` for an initial or refresh load.
    pub fn cursor(&self) -> Option<&C> {
        self.cursor.as_ref()
    }

    /// Whether this is a pagination load.
    pub fn is_pagination(&self) -> bool {
        self.cursor.is_some()
    }

    /// Generation this ticket belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a reported result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// The result was merged into the list.
    Applied,
    /// The ticket was superseded; the result was dropped.
    Stale,
}

/// A cursor-paginated list.
#[derive(Debug, Clone)]
pub struct PagedList<T, C> {
    items: Vec<T>,
    next_cursor: Option<C>,
    has_next: bool,
    phase: LoadPhase,
    error: Option<String>,
    generation: u64,
}

impl<T, C: Clone> PagedList<T, C> {
    /// An empty list that has not loaded anything yet.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_next: true,
            phase: LoadPhase::Idle,
            error: None,
            generation: 0,
        }
    }

    /// Start an initial or refresh load.
    ///
    /// Fails while another initial load is in flight.
    pub fn begin_load(&mut self) -> Result<LoadTicket<C>, TransitionError> {
        self.start(LoadEvent::Refresh, None)
    }

    /// Start loading the next page.
    ///
    /// Returns `None` (a no-op) when the list failed, is exhausted, is
    /// already loading, or has no cursor.
    pub fn begin_next(&mut self) -> Option<LoadTicket<C>> {
        if self.phase != LoadPhase::Ready || !self.has_next {
            return None;
        }
        let cursor = self.next_cursor.clone()?;
        self.start(LoadEvent::Paginate, Some(cursor)).ok()
    }

    /// Recover from a failure.
    ///
    /// With no items this is an initial load. Otherwise pagination resumes
    /// from the last cursor when more pages exist, else the list reloads.
    pub fn begin_retry(&mut self) -> Result<LoadTicket<C>, TransitionError> {
        if self.items.is_empty() {
            return self.begin_load();
        }
        match (self.has_next, self.next_cursor.clone()) {
            (true, Some(cursor)) => self.start(LoadEvent::Paginate, Some(cursor)),
            _ => self.begin_load(),
        }
    }

    /// Report a successful load.
    pub fn complete(&mut self, ticket: &LoadTicket<C>, page: Page<T, C>) -> Settled {
        if !self.is_current(ticket) {
            return Settled::Stale;
        }
        let Ok(next) = self.phase.on_event(LoadEvent::Succeeded) else {
            return Settled::Stale;
        };

        if ticket.is_pagination() {
            self.items.extend(page.items);
        } else {
            self.items = page.items;
        }
        self.next_cursor = page.next_cursor;
        self.has_next = page.has_next;
        self.phase = next;
        Settled::Applied
    }

    /// Report a failed load. Loaded items are kept.
    pub fn fail(&mut self, ticket: &LoadTicket<C>, message: impl Into<String>) -> Settled {
        if !self.is_current(ticket) {
            return Settled::Stale;
        }
        let Ok(next) = self.phase.on_event(LoadEvent::Failed) else {
            return Settled::Stale;
        };
        self.phase = next;
        self.error = Some(message.into());
        Settled::Applied
    }

    /// Loaded items in display order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Current phase.
    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Message of the last failure, cleared when a new load starts.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether more pages exist.
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Cursor for the next page.
    pub fn next_cursor(&self) -> Option<&C> {
        self.next_cursor.as_ref()
    }

    fn start(&mut self, event: LoadEvent, cursor: Option<C>) -> Result<LoadTicket<C>, TransitionError> {
        self.phase = self.phase.on_event(event)?;
        self.error = None;
        self.generation += 1;
        Ok(LoadTicket {
            generation: self.generation,
            cursor,
        })
    }

    fn is_current(&self, ticket: &LoadTicket<C>) -> bool {
        ticket.generation == self.generation && self.phase.is_loading()
    }
}

impl<T: Keyed, C> PagedList<T, C> {
    /// Look up an item by key.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    /// Mutable lookup by key.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.key() == key)
    }
}

impl<T, C: Clone> Default for PagedList<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// User-facing message for a failed load.
pub fn failure_message(error: &ApiError) -> String {
    match error {
        ApiError::ServiceUnavailable { .. } => SERVICE_BUSY_MESSAGE.to_string(),
        other => {
            let message = other.to_string();
            if message.trim().is_empty() {
                LOAD_FAILED_MESSAGE.to_string()
            } else {
                message
            }
        }
    }
}
