//! Natively separated key namespaces.

use std::fmt;

/// One of the store's independent key namespaces.
///
/// Keys in different keyspaces never collide, even when their bytes are
/// identical. A store has a small fixed number of keyspaces, identified by
/// a byte in each log frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keyspace(u8);

impl Keyspace {
    /// Number of keyspaces every store carries.
    pub const COUNT: usize = 4;

    /// Keyspace 0, the default namespace.
    pub const DEFAULT: Keyspace = Keyspace(0);

    /// Keyspace 1, conventionally used for secondary lookups.
    pub const INDEX: Keyspace = Keyspace(1);

    /// Returns the keyspace with the given id, if it is in range.
    #[must_use]
    pub const fn new(id: u8) -> Option<Self> {
        if (id as usize) < Self::COUNT {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Returns the keyspace id.
    #[must_use]
    pub const fn id(self) -> u8 {
        self.0
    }

    /// Iterates over every keyspace in id order.
    pub fn all() -> impl Iterator<Item = Keyspace> {
        (0..Self::COUNT as u8).map(Keyspace)
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Keyspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ks{}", self.0)
    }
}
