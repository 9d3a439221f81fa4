//! Fixed-capacity bump arena backing parsed and outgoing protocol data.
//!
//! Allocations are handed out as [`Span`]s into the arena's storage. There is
//! no free; an arena is recycled with [`Arena::reset`].

use std::fmt;
use std::mem::size_of;

use bytes::BytesMut;
use tracing::trace;

/// Location of an allocation inside an [`Arena`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    start: u32,
    len: u32,
}

impl Span {
    /// Length in bytes.
    #[must_use]
    pub const fn len(self) -> usize {
        self.len as usize
    }

    /// Whether the allocation is zero bytes long.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.len == 0
    }

    const fn range(self) -> std::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

/// Bytes charged per slot of a string or property table.
pub const SLOT_SIZE: usize = size_of::<Span>();

/// Errors raised by arena allocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaError {
    /// Not enough free bytes left.
    Exhausted {
        /// Bytes requested.
        requested: usize,
        /// Bytes still free.
        remaining: usize,
    },
    /// Property table already holds its reserved number of pairs.
    SetFull {
        /// Reserved pairs.
        capacity: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted {
                requested,
                remaining,
            } => write!(
                f,
                "arena exhausted: requested {requested} bytes, {remaining} remaining"
            ),
            Self::SetFull { capacity } => write!(f, "property set full ({capacity} pairs)"),
        }
    }
}

impl std::error::Error for ArenaError {}

/// Bump allocator over a fixed number of bytes.
#[derive(Debug)]
pub struct Arena {
    data: BytesMut,
    capacity: usize,
}

impl Arena {
    /// Create an arena able to hold `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// Drop every allocation, keeping the backing storage.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Total capacity in bytes.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes handed out so far.
    #[must_use]
    pub fn used(&self) -> usize {
        self.data.len()
    }

    /// Bytes still available.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    fn reserve(&self, size: usize) -> Result<u32, ArenaError> {
        let remaining = self.remaining();
        if size > remaining {
            trace!(requested = size, remaining, "arena exhausted");
            return Err(ArenaError::Exhausted {
                requested: size,
                remaining,
            });
        }
        u32::try_from(self.data.len()).map_err(|_| ArenaError::Exhausted {
            requested: size,
            remaining,
        })
    }

    /// Allocate `size` zero-filled bytes.
    pub fn try_alloc(&mut self, size: usize) -> Result<Span, ArenaError> {
        let start = self.reserve(size)?;
        self.data.resize(self.data.len() + size, 0);
        Ok(Span {
            start,
            len: size as u32,
        })
    }

    /// Copy a string into the arena.
    pub fn alloc_str(&mut self, src: &str) -> Result<Span, ArenaError> {
        let start = self.reserve(src.len())?;
        self.data.extend_from_slice(src.as_bytes());
        Ok(Span {
            start,
            len: src.len() as u32,
        })
    }

    /// Copy an optional string; an absent source stays absent.
    pub fn alloc_opt_str(&mut self, src: Option<&str>) -> Result<Option<Span>, ArenaError> {
        src.map(|s| self.alloc_str(s)).transpose()
    }

    /// Copy a list of strings, charging its terminated slot table as well.
    pub fn alloc_str_set(&mut self, list: &[&str]) -> Result<Vec<Span>, ArenaError> {
        self.try_alloc((list.len() + 1) * SLOT_SIZE)?;
        list.iter().map(|s| self.alloc_str(s)).collect()
    }

    /// Reserve a table for up to `pairs` key/value properties.
    pub fn alloc_property_set(&mut self, pairs: usize) -> Result<PropertySet, ArenaError> {
        self.try_alloc((pairs * 2 + 1) * SLOT_SIZE)?;
        Ok(PropertySet {
            capacity: pairs,
            entries: Vec::with_capacity(pairs),
        })
    }

    /// Raw bytes of an allocation.
    #[must_use]
    pub fn bytes(&self, span: Span) -> &[u8] {
        self.data.get(span.range()).unwrap_or_default()
    }

    /// String view of an allocation made with one of the string allocators.
    #[must_use]
    pub fn str(&self, span: Span) -> &str {
        std::str::from_utf8(self.bytes(span)).unwrap_or_default()
    }
}

/// Key/value table whose slots were reserved up front in an [`Arena`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    capacity: usize,
    entries: Vec<(Span, Span)>,
}

impl PropertySet {
    /// Append a pair. Absent keys or values are skipped without error.
    pub fn push(
        &mut self,
        arena: &mut Arena,
        key: Option<&str>,
        value: Option<&str>,
    ) -> Result<(), ArenaError> {
        let (Some(key), Some(value)) = (key, value) else {
            return Ok(());
        };
        if self.entries.len() >= self.capacity {
            return Err(ArenaError::SetFull {
                capacity: self.capacity,
            });
        }
        let key = arena.alloc_str(key)?;
        let value = arena.alloc_str(value)?;
        self.entries.push((key, value));
        Ok(())
    }

    /// Reserved pairs.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pair is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs in insertion order.
    pub fn iter<'a>(&'a self, arena: &'a Arena) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .iter()
            .map(move |&(key, value)| (arena.str(key), arena.str(value)))
    }

    /// First value stored under `key`.
    #[must_use]
    pub fn get<'a>(&'a self, arena: &'a Arena, key: &str) -> Option<&'a str> {
        self.iter(arena).find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_zero_fills_and_tracks_usage() {
        let mut arena = Arena::new(16);
        let span = arena.try_alloc(8).unwrap();
        assert_eq!(arena.bytes(span), &[0u8; 8]);
        assert_eq!(arena.used(), 8);
        assert_eq!(arena.remaining(), 8);
    }

    #[test]
    fn alloc_fails_past_capacity_without_side_effects() {
        let mut arena = Arena::new(4);
        arena.alloc_str("abc").unwrap();
        let err = arena.alloc_str("de").unwrap_err();
        assert_eq!(
            err,
            ArenaError::Exhausted {
                requested: 2,
                remaining: 1
            }
        );
        assert_eq!(arena.used(), 3);
    }

    #[test]
    fn absent_string_stays_absent() {
        let mut arena = Arena::new(8);
        assert_eq!(arena.alloc_opt_str(None).unwrap(), None);
        let span = arena.alloc_opt_str(Some("")).unwrap().unwrap();
        assert!(span.is_empty());
    }

    #[test]
    fn string_set_fails_on_first_exhaustion() {
        let mut arena = Arena::new(3 * SLOT_SIZE + 4);
        assert!(arena.alloc_str_set(&["ab", "cd", "ef"]).is_err());
        let mut arena = Arena::new(3 * SLOT_SIZE + 4);
        let spans = arena.alloc_str_set(&["ab", "cd"]).unwrap();
        assert_eq!(arena.str(spans[1]), "cd");
    }

    #[test]
    fn property_set_skips_absent_values_and_caps_pairs() {
        let mut arena = Arena::new(256);
        let mut set = arena.alloc_property_set(2).unwrap();
        set.push(&mut arena, Some("label"), None).unwrap();
        set.push(&mut arena, Some("a"), Some("1")).unwrap();
        set.push(&mut arena, Some("b"), Some("2")).unwrap();
        assert_eq!(
            set.push(&mut arena, Some("c"), Some("3")),
            Err(ArenaError::SetFull { capacity: 2 })
        );
        assert_eq!(set.get(&arena, "b"), Some("2"));
        assert_eq!(set.get(&arena, "label"), None);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn reset_recycles_storage() {
        let mut arena = Arena::new(4);
        arena.alloc_str("full").unwrap();
        arena.reset();
        assert_eq!(arena.remaining(), 4);
        assert!(arena.alloc_str("next").is_ok());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn usage_never_exceeds_capacity(
                capacity in 0usize..256,
                sizes in proptest::collection::vec(0usize..64, 0..32),
            ) {
                let mut arena = Arena::new(capacity);
                for size in sizes {
                    let before = arena.used();
                    match arena.try_alloc(size) {
                        Ok(span) => prop_assert_eq!(span.len(), size),
                        Err(_) => prop_assert_eq!(arena.used(), before),
                    }
                    prop_assert!(arena.used() <= capacity);
                }
            }
        }
    }
}
