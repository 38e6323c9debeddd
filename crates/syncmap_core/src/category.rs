//! Record categories, sync actions and change-queue operations.

use std::fmt;
use std::str::FromStr;

/// The kind of synced record a local id belongs to.
///
/// Each category owns its own local-id space, separated in the store by a
/// one-character key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordCategory {
    /// No category; keys are stored bare.
    Unset,
    /// Bookmarks, prefix `b`.
    Bookmark,
    /// History items, prefix `h`.
    History,
}

impl RecordCategory {
    /// Every category.
    pub const ALL: [RecordCategory; 3] = [Self::Unset, Self::Bookmark, Self::History];

    /// Key prefix of the category, `None` for [`RecordCategory::Unset`].
    #[must_use]
    pub const fn tag(self) -> Option<char> {
        match self {
            Self::Unset => None,
            Self::Bookmark => Some('b'),
            Self::History => Some('h'),
        }
    }

    /// The category owning a key prefix.
    #[must_use]
    pub const fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'b' => Some(Self::Bookmark),
            'h' => Some(Self::History),
            _ => None,
        }
    }

    /// Record type name used to key the not-synced sets.
    #[must_use]
    pub const fn record_type_name(self) -> Option<&'static str> {
        match self {
            Self::Unset => None,
            Self::Bookmark => Some("BOOKMARKS"),
            Self::History => Some("HISTORY_SITES"),
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unset => "Unset",
            Self::Bookmark => "Bookmark",
            Self::History => "History",
        }
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RecordCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unset" | "none" => Ok(Self::Unset),
            "bookmark" | "bookmarks" | "b" => Ok(Self::Bookmark),
            "history" | "h" => Ok(Self::History),
            other => Err(format!("unknown record category: {other}")),
        }
    }
}

/// A pending sync action, as coded by the sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordAction {
    /// Code `"0"`.
    Create,
    /// Code `"1"`.
    Update,
    /// Code `"2"`, the final delete.
    Delete,
}

impl RecordAction {
    /// Protocol code of the action.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Create => "0",
            Self::Update => "1",
            Self::Delete => "2",
        }
    }

    /// Parses a protocol code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Create),
            "1" => Some(Self::Update),
            "2" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Whether removing an id from this action's set also drops its mapping.
    #[must_use]
    pub const fn is_final_delete(self) -> bool {
        matches!(self, Self::Delete)
    }
}

impl fmt::Display for RecordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RecordAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(action) = Self::from_code(s) {
            return Ok(action);
        }
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown record action: {other}")),
        }
    }
}

/// What to do with a not-synced set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotSyncedOperation {
    /// Read the set.
    Get,
    /// Union the given ids into the set.
    Add,
    /// Remove the given ids from the set.
    Delete,
}

impl fmt::Display for NotSyncedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GetItems",
            Self::Add => "AddItems",
            Self::Delete => "DeleteItems",
        })
    }
}
