//! Fixed-capacity pool of active behaviors.
//!
//! Slots are reserved up front. Active behaviors form a ring, kept as an
//! ordered list of slot handles plus an anchor position; scans start at the
//! anchor and wrap around.

use tracing::trace;

use super::BehaviorKind;
use crate::protocol::{Error, Result, Timestamp};

/// Handle to a pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BehaviorId(usize);

impl BehaviorId {
    /// Slot index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// An active behavior instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behavior {
    kind: BehaviorKind,
    transducer: Option<usize>,
    /// Instant the behavior is next due.
    pub next_firing: Timestamp,
    /// Informational period in seconds.
    pub firing_period: Timestamp,
}

impl Behavior {
    /// Which standard behavior this is
    #[must_use]
    pub const fn kind(&self) -> BehaviorKind {
        self.kind
    }

    /// Index of the bound transducer; `None` for device-wide behaviors
    #[must_use]
    pub const fn transducer(&self) -> Option<usize> {
        self.transducer
    }
}

/// Fixed-capacity behavior storage with an anchored active ring.
#[derive(Debug, Clone)]
pub struct BehaviorPool {
    slots: Vec<Option<Behavior>>,
    active: Vec<BehaviorId>,
    anchor: usize,
}

impl BehaviorPool {
    /// Pool able to hold `capacity` behaviors at once.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            active: Vec::with_capacity(capacity),
            anchor: 0,
        }
    }

    /// Maximum number of active behaviors.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active behaviors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no behavior is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Behavior in slot `id`.
    #[must_use]
    pub fn get(&self, id: BehaviorId) -> Option<&Behavior> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable behavior in slot `id`.
    pub fn get_mut(&mut self, id: BehaviorId) -> Option<&mut Behavior> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Active behavior pairing `kind` with `transducer`.
    #[must_use]
    pub fn find(&self, kind: BehaviorKind, transducer: Option<usize>) -> Option<BehaviorId> {
        self.ring().find(|&id| {
            self.get(id)
                .is_some_and(|b| b.kind == kind && b.transducer == transducer)
        })
    }

    /// Active handles in ring order, starting at the anchor.
    pub fn ring(&self) -> impl Iterator<Item = BehaviorId> + '_ {
        let (tail, head) = self.active.split_at(self.anchor.min(self.active.len()));
        head.iter().chain(tail).copied()
    }

    /// Activate `kind` for `transducer`, or return the existing instance.
    ///
    /// A new behavior is inserted right after the anchor and becomes the
    /// anchor.
    pub fn include(&mut self, kind: BehaviorKind, transducer: Option<usize>) -> Result<BehaviorId> {
        if let Some(existing) = self.find(kind, transducer) {
            return Ok(existing);
        }
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::BehaviorPoolExhausted)?;
        self.slots[slot] = Some(Behavior {
            kind,
            transducer,
            next_firing: 0,
            firing_period: 0,
        });
        let id = BehaviorId(slot);
        if self.active.is_empty() {
            self.active.push(id);
            self.anchor = 0;
        } else {
            self.anchor += 1;
            self.active.insert(self.anchor, id);
        }
        trace!(%kind, ?transducer, slot, "behavior included");
        Ok(id)
    }

    /// Deactivate `id` and free its slot.
    pub fn exclude(&mut self, id: BehaviorId) -> Result<()> {
        let position = self
            .active
            .iter()
            .position(|&active| active == id)
            .ok_or(Error::BehaviorNotFound)?;
        self.active.remove(position);
        self.slots[id.0] = None;
        if position < self.anchor {
            self.anchor -= 1;
        }
        if self.anchor >= self.active.len() {
            self.anchor = 0;
        }
        trace!(slot = id.0, "behavior excluded");
        Ok(())
    }

    /// First behavior in ring order that is due at `now`.
    #[must_use]
    pub fn find_due(&self, now: Timestamp) -> Option<BehaviorId> {
        self.ring()
            .find(|&id| self.get(id).is_some_and(|b| b.next_firing <= now))
    }

    /// Behavior with the earliest firing time; ties go to the first in ring
    /// order.
    #[must_use]
    pub fn earliest(&self) -> Option<BehaviorId> {
        let mut best: Option<(BehaviorId, Timestamp)> = None;
        for id in self.ring() {
            let Some(behavior) = self.get(id) else {
                continue;
            };
            if best.is_none_or(|(_, at)| behavior.next_firing < at) {
                best = Some((id, behavior.next_firing));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Make `id` the anchor.
    pub fn anchor_at(&mut self, id: BehaviorId) {
        if let Some(position) = self.active.iter().position(|&active| active == id) {
            self.anchor = position;
        }
    }

    /// Make the behavior after `id` the anchor.
    pub fn anchor_after(&mut self, id: BehaviorId) {
        if let Some(position) = self.active.iter().position(|&active| active == id) {
            self.anchor = (position + 1) % self.active.len();
        }
    }

    /// Current anchor.
    #[must_use]
    pub fn anchor(&self) -> Option<BehaviorId> {
        self.active.get(self.anchor).copied()
    }

    /// Deactivate everything.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.active.clear();
        self.anchor = 0;
    }
}
