//! One worker's top-k for one query, as exchanged between workers.

use serde::{Deserialize, Serialize};

use super::{Neighbor, TopK};

/// The top-k computed by one worker, against its own shard, for one query.
///
/// Neighbors carry their global index and output value, so the owning
/// worker can predict without holding the sender's shard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateSet {
    /// Global index of the query.
    pub query: usize,
    /// The worker that computed the set.
    pub worker: usize,
    /// The neighbor slots, unsorted.
    pub neighbors: Vec<Neighbor>,
}

impl CandidateSet {
    /// Packs the slots of a selector for sending.
    #[must_use]
    pub fn new(query: usize, worker: usize, top_k: TopK) -> Self {
        Self {
            query,
            worker,
            neighbors: top_k.into_slots(),
        }
    }

    /// Resumes selection from these neighbors.
    #[must_use]
    pub fn into_top_k(self) -> TopK {
        TopK::from_slots(self.neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::CandidateSet;
    use crate::knn::{Neighbor, TopK};

    #[test]
    fn merge_order_does_not_change_the_set() {
        let sets = [
            vec![Neighbor::new(0, 0.9, 0.0), Neighbor::new(1, 0.1, 1.0)],
            vec![Neighbor::new(2, 0.4, 2.0), Neighbor::new(3, 2.5, 3.0)],
            vec![Neighbor::new(4, 0.2, 4.0), Neighbor::SENTINEL],
        ];

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        let mut results = orders.iter().map(|order| {
            let mut top = CandidateSet {
                query: 0,
                worker: order[0],
                neighbors: sets[order[0]].clone(),
            }
            .into_top_k();
            for &o in &order[1..] {
                top.merge(&sets[o]);
            }
            top.into_sorted()
        });

        let first = results.next().unwrap_or_default();
        assert_eq!(
            first.iter().map(|n| n.index).collect::<Vec<_>>(),
            vec![Some(1), Some(4)]
        );
        for other in results {
            assert_eq!(other, first);
        }
    }

    #[test]
    fn round_trip_through_top_k() {
        let mut top = TopK::new(2);
        top.offer(Neighbor::new(5, 1.0, 2.0));
        let set = CandidateSet::new(3, 1, top.clone());
        assert_eq!(set.query, 3);
        assert_eq!(set.into_top_k(), top);
    }
}
