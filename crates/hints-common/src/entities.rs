//! Core domain entities for the hinTS construction subsystem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A 32-byte content hash (roster hash, preprocessed-keys hash, ...).
pub type Hash = [u8; 32];

/// Non-negative integer stake/participation weight.
pub type Weight = u64;

/// A monotonically assigned identifier for a construction.
pub type ConstructionId = u64;

/// Consensus time, measured in whatever monotonically increasing unit the
/// surrounding consensus round provides (NOT wall-clock). Two honest nodes
/// observing the same consensus-ordered input stream agree on this value.
pub type ConsensusTime = u64;

/// Identifies a node in the network.
///
/// Ordering is byte-lexicographic over the big-endian encoding, which for a
/// fixed-width integer coincides with numeric order - so the "ties broken by
/// node-id numeric order" clause of the party assignment rule is
/// unreachable for well-formed rosters: a roster's keys are already unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Urgency of a construction.
///
/// HIGH when source-roster-hash == target-roster-hash (the genesis
/// self-transition); LOW otherwise. Selects the hint-keys gathering grace
/// period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    High,
    Low,
}

impl Urgency {
    /// Derive urgency from the pair of roster hashes identifying a construction.
    pub fn from_roster_hashes(source_hash: Hash, target_hash: Hash) -> Self {
        if source_hash == target_hash {
            Urgency::High
        } else {
            Urgency::Low
        }
    }
}

/// An ordered mapping of node-id to weight.
///
/// Backed by a `BTreeMap` so iteration order is always the deterministic
/// node-id order the rest of the subsystem relies on for party assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    weights: BTreeMap<NodeId, Weight>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    pub fn from_weights(weights: BTreeMap<NodeId, Weight>) -> Self {
        Self { weights }
    }

    pub fn insert(&mut self, node_id: NodeId, weight: Weight) {
        self.weights.insert(node_id, weight);
    }

    pub fn get(&self, node_id: &NodeId) -> Option<Weight> {
        self.weights.get(node_id).copied()
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.weights.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn total_weight(&self) -> Weight {
        self.weights.values().sum()
    }

    /// Node ids in deterministic (lexicographic-by-node-id) order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.weights.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Weight)> + '_ {
        self.weights.iter().map(|(id, w)| (*id, *w))
    }

    /// The party-size (`N`) for this roster: the smallest power of two that
    /// is `>=` the node count.
    pub fn party_size(&self) -> PartySize {
        PartySize::for_node_count(self.len())
    }

    /// The deterministic party-id for a node-id, or `None` if the node is
    /// not a member of this roster.
    ///
    /// Party ids run `0..N-1` assigned by lexicographic node-id order; the
    /// first `node_count` slots are filled, any remaining slots (when
    /// `node_count` is not itself a power of two) are left empty.
    ///
    pub fn party_id_of(&self, node_id: &NodeId) -> Option<u32> {
        self.weights
            .keys()
            .position(|id| id == node_id)
            .map(|idx| idx as u32)
    }

    /// The weight assigned to each of the `N` party slots, in party-id
    /// order. Slots beyond the node count carry weight zero.
    pub fn weights_by_party(&self) -> Vec<Weight> {
        let n = self.party_size().n() as usize;
        let mut weights: Vec<Weight> = self.weights.values().copied().collect();
        weights.resize(n, 0);
        weights
    }
}

/// The party-size `N` for a roster together with its log2, `k`:
/// `N = smallest power of two >= node count`, `k = log2(N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySize {
    k: u32,
}

impl PartySize {
    /// Construct from an explicit party-size-log2.
    pub fn from_log2(k: u32) -> Self {
        Self { k }
    }

    /// The smallest `PartySize` whose `N` is `>=` the given node count.
    ///
    /// A node count of zero yields `k = 0`, `N = 1`; callers that require a
    /// non-empty roster must check that separately - a total target weight
    /// of zero is a configuration error, not a party-size one.
    pub fn for_node_count(node_count: usize) -> Self {
        let k = if node_count <= 1 {
            0
        } else {
            (usize::BITS - (node_count - 1).leading_zeros()) as u32
        };
        Self { k }
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn n(&self) -> u64 {
        1u64 << self.k
    }
}

/// The strict super-majority threshold for a total weight: the smallest
/// integer weight that is strictly more than two-thirds of `total_weight`.
///
/// Worked examples that pin down the rounding convention: `total_weight =
/// 4` gives threshold `4`; `total_weight = 10` gives threshold `8`; a
/// total weight of `3w` crosses at `2w + 1`, not `2w`. This is
/// `ceil((2 * total_weight + 2) / 3)`, computed without floating point via
/// the standard ceiling-division identity `ceil(a / b) = (a + b - 1) / b`.
pub fn super_majority_threshold(total_weight: Weight) -> Weight {
    let numerator = 2u128 * total_weight as u128 + 2;
    let threshold = (numerator + 3 - 1) / 3;
    threshold as Weight
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn party_size_matches_powers_of_two() {
        assert_eq!(PartySize::for_node_count(1).n(), 1);
        assert_eq!(PartySize::for_node_count(2).n(), 2);
        assert_eq!(PartySize::for_node_count(3).n(), 4);
        assert_eq!(PartySize::for_node_count(4).n(), 4);
        assert_eq!(PartySize::for_node_count(5).n(), 8);
        assert_eq!(PartySize::for_node_count(16).n(), 16);
        assert_eq!(PartySize::for_node_count(17).n(), 32);
    }

    #[test]
    fn party_ids_are_lexicographic_by_node_id() {
        let mut roster = Roster::new();
        roster.insert(NodeId(5), 1);
        roster.insert(NodeId(1), 1);
        roster.insert(NodeId(3), 1);

        assert_eq!(roster.party_id_of(&NodeId(1)), Some(0));
        assert_eq!(roster.party_id_of(&NodeId(3)), Some(1));
        assert_eq!(roster.party_id_of(&NodeId(5)), Some(2));
    }

    #[test]
    fn weights_by_party_pads_empty_slots() {
        let mut roster = Roster::new();
        roster.insert(NodeId(0), 5);
        roster.insert(NodeId(1), 3);
        roster.insert(NodeId(2), 1);

        // node count 3 -> N = 4, slot 3 empty
        let weights = roster.weights_by_party();
        assert_eq!(weights, vec![5, 3, 1, 0]);
    }

    #[test]
    fn super_majority_threshold_matches_worked_examples() {
        // Four equal-weight nodes: totalWeight = 4 -> threshold 4.
        assert_eq!(super_majority_threshold(4), 4);
        // totalWeight = 10 -> threshold 8.
        assert_eq!(super_majority_threshold(10), 8);
    }

    #[test]
    fn super_majority_threshold_boundary_at_two_thirds() {
        // totalWeight = 3w crosses at strictly more than 2w;
        // exactly 2w does not cross.
        for w in 1..=10u64 {
            let total = 3 * w;
            let threshold = super_majority_threshold(total);
            assert!(2 * w < threshold, "w={w}: {threshold} should exceed {}", 2 * w);
            assert!(threshold <= 2 * w + 1, "w={w}: {threshold} should be minimal");
        }
    }

    #[test]
    fn urgency_from_matching_hashes_is_high() {
        let h = [7u8; 32];
        assert_eq!(Urgency::from_roster_hashes(h, h), Urgency::High);
        let other = [9u8; 32];
        assert_eq!(Urgency::from_roster_hashes(h, other), Urgency::Low);
    }
}
