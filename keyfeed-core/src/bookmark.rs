//! Optimistic bookmark toggling.
//!
//! A toggle is planned from the state the caller observed, applied locally
//! at once, and later either confirmed with the server's answer or rolled
//! back to exactly the observed state.

use std::collections::HashSet;

use keyfeed_types::BookmarkId;

use crate::loader::Keyed;

/// Bookmark flag plus the server id backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BookmarkState {
    /// Whether the item is bookmarked.
    pub bookmarked: bool,
    /// Server id, [`BookmarkId::PLACEHOLDER`] while a create is in flight.
    pub bookmark_id: Option<BookmarkId>,
}

impl BookmarkState {
    /// Bookmarked with a known id.
    pub fn saved(id: BookmarkId) -> Self {
        Self {
            bookmarked: true,
            bookmark_id: Some(id),
        }
    }

    /// Not bookmarked.
    pub fn unsaved() -> Self {
        Self::default()
    }
}

/// Items carrying bookmark state.
pub trait Bookmarkable: Keyed {
    /// Current bookmark state.
    fn bookmark(&self) -> BookmarkState;
    /// Replace the bookmark state.
    fn set_bookmark(&mut self, state: BookmarkState);
}

/// Server call a toggle needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkCommand {
    /// Create a bookmark for the item.
    Create,
    /// Delete the bookmark with this id.
    Delete(BookmarkId),
    /// Nothing to tell the server (no id known).
    Skip,
}

/// A toggle that has been applied locally but not settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingToggle {
    previous: BookmarkState,
    optimistic: BookmarkState,
    command: BookmarkCommand,
}

impl PendingToggle {
    /// Plan a toggle from the observed state.
    pub fn plan(currently_bookmarked: bool, existing_id: Option<BookmarkId>) -> Self {
        let previous = BookmarkState {
            bookmarked: currently_bookmarked,
            bookmark_id: existing_id,
        };
        if currently_bookmarked {
            let command = match existing_id {
                Some(id) if !id.is_placeholder() => BookmarkCommand::Delete(id),
                _ => BookmarkCommand::Skip,
            };
            Self {
                previous,
                optimistic: BookmarkState::unsaved(),
                command,
            }
        } else {
            Self {
                previous,
                optimistic: BookmarkState::saved(BookmarkId::PLACEHOLDER),
                command: BookmarkCommand::Create,
            }
        }
    }

    /// State to show while the command is in flight.
    pub fn optimistic(&self) -> BookmarkState {
        self.optimistic
    }

    /// Server call to make.
    pub fn command(&self) -> BookmarkCommand {
        self.command
    }

    /// Final state after the command succeeded.
    ///
    /// `created` is the id returned by a create; it replaces the placeholder.
    pub fn confirm(&self, created: Option<BookmarkId>) -> BookmarkState {
        match (self.command, created) {
            (BookmarkCommand::Create, Some(id)) => BookmarkState::saved(id),
            _ => self.optimistic,
        }
    }

    /// The observed state, restored after a failure.
    pub fn rollback(&self) -> BookmarkState {
        self.previous
    }
}

/// Keys of items whose toggle is in flight.
#[derive(Debug, Clone, Default)]
pub struct InFlightToggles {
    keys: HashSet<String>,
}

impl InFlightToggles {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`. Returns `false` if a toggle for it is already in flight.
    pub fn try_begin(&mut self, key: &str) -> bool {
        self.keys.insert(key.to_string())
    }

    /// Release `key`.
    pub fn finish(&mut self, key: &str) {
        self.keys.remove(key);
    }

    /// Whether `key` has a toggle in flight.
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turning_on_uses_placeholder_then_server_id() {
        let toggle = PendingToggle::plan(false, None);
        assert_eq!(toggle.command(), BookmarkCommand::Create);
        assert_eq!(
            toggle.optimistic(),
            BookmarkState::saved(BookmarkId::PLACEHOLDER)
        );
        assert_eq!(
            toggle.confirm(Some(BookmarkId::new(555))),
            BookmarkState::saved(BookmarkId::new(555))
        );
    }

    #[test]
    fn failed_on_rolls_back_to_none() {
        let toggle = PendingToggle::plan(false, None);
        let restored = toggle.rollback();
        assert!(!restored.bookmarked);
        assert_eq!(restored.bookmark_id, None);
    }

    #[test]
    fn turning_off_deletes_existing_id() {
        let toggle = PendingToggle::plan(true, Some(BookmarkId::new(9)));
        assert_eq!(toggle.command(), BookmarkCommand::Delete(BookmarkId::new(9)));
        assert_eq!(toggle.optimistic(), BookmarkState::unsaved());
        assert_eq!(toggle.confirm(None), BookmarkState::unsaved());
    }

    #[test]
    fn failed_off_restores_id() {
        let toggle = PendingToggle::plan(true, Some(BookmarkId::new(9)));
        assert_eq!(toggle.rollback(), BookmarkState::saved(BookmarkId::new(9)));
    }

    #[test]
    fn turning_off_without_id_skips_server() {
        assert_eq!(PendingToggle::plan(true, None).command(), BookmarkCommand::Skip);
        assert_eq!(
            PendingToggle::plan(true, Some(BookmarkId::PLACEHOLDER)).command(),
            BookmarkCommand::Skip
        );
    }

    #[test]
    fn in_flight_set_rejects_duplicates() {
        let mut set = InFlightToggles::new();
        assert!(set.try_begin("42"));
        assert!(!set.try_begin("42"));
        assert!(set.try_begin("43"));
        set.finish("42");
        assert!(!set.contains("42"));
        assert!(set.try_begin("42"));
    }
}
