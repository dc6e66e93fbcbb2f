//! A fixed-capacity selector for the `k` smallest distances seen so far.

use serde::{Deserialize, Serialize};

/// One entry of a neighbor list.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Global index of the training point, or `None` for an empty slot.
    pub index: Option<usize>,
    /// Distance from the query to the training point.
    pub distance: f64,
    /// Output value of the training point.
    pub value: f64,
}

impl Neighbor {
    /// An empty slot: no point, infinite distance.
    pub const SENTINEL: Self = Self {
        index: None,
        distance: f64::INFINITY,
        value: 0.0,
    };

    /// A neighbor at global index `index`.
    #[must_use]
    pub const fn new(index: usize, distance: f64, value: f64) -> Self {
        Self {
            index: Some(index),
            distance,
            value,
        }
    }

    /// Whether this is an empty slot.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        self.index.is_none()
    }
}

/// Keeps the `k` smallest-distance neighbors offered to it.
///
/// The slots start out as sentinels. Each offer is compared against the slot
/// holding the current maximum distance, and replaces it only when strictly
/// closer. When several slots share the maximum, the first of them is the
/// one replaced. So among equal distances the earliest offer is kept, and the
/// order of the slots reflects the order of replacement rather than the
/// order of the input. Use [`TopK::into_sorted`] for an ascending list.
///
/// Each offer costs `O(k)` to find the new maximum, which is fine for `k` in
/// the tens.
#[derive(Clone, Debug, PartialEq)]
pub struct TopK {
    /// The `k` slots.
    slots: Vec<Neighbor>,
    /// Position of the first slot holding the maximum distance.
    max_slot: usize,
}

impl TopK {
    /// `k` empty slots.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            slots: vec![Neighbor::SENTINEL; k],
            max_slot: 0,
        }
    }

    /// Resumes selection from an existing list of slots, e.g. a candidate
    /// set received from a peer.
    #[must_use]
    pub fn from_slots(slots: Vec<Neighbor>) -> Self {
        let max_slot = argmax(&slots);
        Self { slots, max_slot }
    }

    /// The capacity.
    #[must_use]
    pub fn k(&self) -> usize {
        self.slots.len()
    }

    /// The distance an offer must beat to be kept.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.slots
            .get(self.max_slot)
            .map_or(f64::NEG_INFINITY, |n| n.distance)
    }

    /// Offers a neighbor, returning whether it was kept.
    pub fn offer(&mut self, neighbor: Neighbor) -> bool {
        if neighbor.distance < self.threshold() {
            self.slots[self.max_slot] = neighbor;
            self.max_slot = argmax(&self.slots);
            true
        } else {
            false
        }
    }

    /// Folds another list of neighbors into this one, entry by entry, with
    /// the same rule as [`TopK::offer`]. Sentinels are never kept.
    pub fn merge(&mut self, other: &[Neighbor]) {
        for &n in other {
            self.offer(n);
        }
    }

    /// The slots in their current, unsorted order.
    #[must_use]
    pub fn slots(&self) -> &[Neighbor] {
        &self.slots
    }

    /// Consumes the selector and returns its slots unsorted.
    #[must_use]
    pub fn into_slots(self) -> Vec<Neighbor> {
        self.slots
    }

    /// Consumes the selector and returns its slots in ascending order of
    /// distance. Equal distances may come out in either order.
    #[must_use]
    pub fn into_sorted(self) -> Vec<Neighbor> {
        let mut slots = self.slots;
        slots.sort_unstable_by(|a, b| a.distance.total_cmp(&b.distance));
        slots
    }

    /// Number of slots holding a real neighbor.
    #[must_use]
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|n| !n.is_sentinel()).count()
    }
}

impl Extend<Neighbor> for TopK {
    fn extend<I: IntoIterator<Item = Neighbor>>(&mut self, iter: I) {
        for n in iter {
            self.offer(n);
        }
    }
}

/// Position of the first slot holding the largest distance.
fn argmax(slots: &[Neighbor]) -> usize {
    let mut max_i = 0;
    for (i, n) in slots.iter().enumerate().skip(1) {
        if n.distance > slots[max_i].distance {
            max_i = i;
        }
    }
    max_i
}
