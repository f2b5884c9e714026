//! Identifier and cursor types for KeyFeed.
//!
//! Numeric identifiers come from database sequences on the server and may
//! exceed 2^53, so the lenient JSON parser in [`crate::json`] can hand them to
//! us as strings. Every numeric id therefore deserializes from either a JSON
//! number or a numeric string.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident, $repr:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name($repr);

        impl $name {
            /// Wrap a raw value.
            pub const fn new(value: $repr) -> Self {
                Self(value)
            }

            /// Get the raw value.
            pub const fn value(&self) -> $repr {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<$repr>().map(Self)
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                Self(value)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer
                    .deserialize_any(LenientIntVisitor::<$repr>::new())
                    .map(Self)
            }
        }
    };
}

numeric_id!(
    /// Server id of a piece of content (an article in the feed).
    ContentId,
    u64
);

numeric_id!(
    /// Server id of a bookmark.
    ///
    /// Signed so that [`BookmarkId::PLACEHOLDER`] can mark an optimistic
    /// bookmark that the server has not confirmed yet.
    BookmarkId,
    i64
);

numeric_id!(
    /// Server id of a bookmark folder.
    FolderId,
    u64
);

numeric_id!(
    /// Server id of a notification keyword.
    KeywordId,
    u64
);

numeric_id!(
    /// Server id of a crawled source.
    SourceId,
    u64
);

numeric_id!(
    /// Id of the link between the current user and a source.
    UserSourceId,
    u64
);

numeric_id!(
    /// Server id of a user account.
    UserId,
    u64
);

numeric_id!(
    /// Opaque numeric page cursor for the feed and bookmark lists.
    ///
    /// Returned by the server as `nextCursorId` and sent back as `lastId`.
    Cursor,
    u64
);

impl BookmarkId {
    /// Local sentinel for a bookmark whose creation is still in flight.
    ///
    /// Real bookmark ids are positive, so this never collides with one.
    pub const PLACEHOLDER: BookmarkId = BookmarkId(-1);

    /// Whether this is the optimistic placeholder rather than a server id.
    pub fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }
}

/// Id of a notification event.
///
/// Used both as the history cursor and as the live stream resume marker
/// (`Last-Event-ID`). Kept as a string because the transport's event id and
/// the payload id are both free-form.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create an event id, trimming surrounding whitespace.
    ///
    /// Returns `None` for an empty or whitespace-only value.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EventIdVisitor;

        impl<'de> Visitor<'de> for EventIdVisitor {
            type Value = EventId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-empty string or an integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<EventId, E> {
                Ok(EventId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<EventId, E> {
                Ok(EventId(v.to_string()))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EventId, E> {
                EventId::new(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(EventIdVisitor)
    }
}

/// Visitor accepting an integer either as a JSON number or a numeric string.
struct LenientIntVisitor<T>(std::marker::PhantomData<T>);

impl<T> LenientIntVisitor<T> {
    fn new() -> Self {
        Self(std::marker::PhantomData)
    }
}

impl<'de, T> Visitor<'de> for LenientIntVisitor<T>
where
    T: TryFrom<u64> + TryFrom<i64> + FromStr,
{
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<T, E> {
        T::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<T, E> {
        T::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<T, E> {
        v.trim()
            .parse::<T>()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}
