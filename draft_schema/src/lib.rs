//! Serialisable data contracts shared by the generator, the draft runtime and
//! external consumers (CLI output, persisted results).

use ahash::RandomState;
use serde::{Deserialize, Serialize};
use std::hash::{BuildHasher, Hasher};

/// Tile identifier used for ring slots that the visual template has but the
/// current player count does not fill.
pub const PLACEHOLDER_TILE: i32 = -1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SlicesHeader {
    pub variant: String,
    pub player_count: u32,
    pub slice_count: u32,
    pub attempts: u32,
    pub hash: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SliceState {
    pub index: u32,
    pub label: String,
    pub tiles: Vec<i32>,
    pub optimal_resources: f32,
    pub optimal_influence: f32,
    pub wormholes: u32,
    pub legendaries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneratedSlicesState {
    pub header: SlicesHeader,
    pub slices: Vec<SliceState>,
    /// Ring entries in template order; unused template slots carry [`PLACEHOLDER_TILE`].
    pub ring: Vec<i32>,
}

impl GeneratedSlicesState {
    pub fn finalize(mut self) -> Self {
        self.header.hash = hash_slices(&self);
        self
    }

    pub fn tile_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.slices
            .iter()
            .flat_map(|slice| slice.tiles.iter().copied())
            .chain(self.ring.iter().copied())
            .filter(|tile| *tile != PLACEHOLDER_TILE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatAssignmentState {
    pub seat: u32,
    pub actor: u32,
    pub faction: String,
    pub slice_index: u32,
    pub slice_label: String,
    pub tiles: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OutcomeHeader {
    pub player_count: u32,
    pub hash: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DraftOutcomeState {
    pub header: OutcomeHeader,
    pub seats: Vec<SeatAssignmentState>,
    /// Actor ids in turn order (speaker first).
    pub turn_order: Vec<u32>,
    /// Flattened layout handed to the map applier: ring first, then each seat's slice.
    pub map_tiles: Vec<i32>,
}

impl DraftOutcomeState {
    pub fn finalize(mut self) -> Self {
        self.header.hash = hash_outcome(&self);
        self
    }
}

fn fixed_hasher() -> impl Hasher {
    RandomState::with_seeds(0, 0, 0, 0).build_hasher()
}

pub fn hash_slices(state: &GeneratedSlicesState) -> u64 {
    let mut clone = state.clone();
    clone.header.hash = 0;
    let encoded = bincode::serialize(&clone).expect("slices serialization for hashing");
    let mut hasher = fixed_hasher();
    hasher.write(&encoded);
    hasher.finish()
}

pub fn hash_outcome(state: &DraftOutcomeState) -> u64 {
    let mut clone = state.clone();
    clone.header.hash = 0;
    let encoded = bincode::serialize(&clone).expect("outcome serialization for hashing");
    let mut hasher = fixed_hasher();
    hasher.write(&encoded);
    hasher.finish()
}

pub fn encode_slices(state: &GeneratedSlicesState) -> bincode::Result<Vec<u8>> {
    bincode::serialize(state)
}

pub fn encode_outcome(state: &DraftOutcomeState) -> bincode::Result<Vec<u8>> {
    bincode::serialize(state)
}

pub fn encode_slices_json(state: &GeneratedSlicesState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

pub fn decode_slices_json(data: &str) -> serde_json::Result<GeneratedSlicesState> {
    serde_json::from_str(data)
}

pub fn encode_outcome_json(state: &DraftOutcomeState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

pub fn decode_outcome_json(data: &str) -> serde_json::Result<DraftOutcomeState> {
    serde_json::from_str(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_slices() -> GeneratedSlicesState {
        GeneratedSlicesState {
            header: SlicesHeader {
                variant: "linear".to_string(),
                player_count: 3,
                slice_count: 1,
                attempts: 4,
                hash: 0,
            },
            slices: vec![SliceState {
                index: 0,
                label: "A".to_string(),
                tiles: vec![26, 41, 29, 47, 62],
                optimal_resources: 6.0,
                optimal_influence: 5.0,
                wormholes: 1,
                legendaries: 0,
            }],
            ring: vec![PLACEHOLDER_TILE, 19],
        }
    }

    #[test]
    fn hash_ignores_existing_header_hash() {
        let a = sample_slices().finalize();
        let mut b = sample_slices();
        b.header.hash = 12345;
        let b = b.finalize();
        assert_eq!(a.header.hash, b.header.hash);
        assert_ne!(a.header.hash, 0);
    }

    #[test]
    fn hash_changes_with_tile_order() {
        let a = sample_slices().finalize();
        let mut b = sample_slices();
        b.slices[0].tiles.swap(0, 1);
        let b = b.finalize();
        assert_ne!(a.header.hash, b.header.hash);
    }

    #[test]
    fn tile_ids_skip_placeholders() {
        let state = sample_slices();
        let ids: Vec<i32> = state.tile_ids().collect();
        assert_eq!(ids, vec![26, 41, 29, 47, 62, 19]);
    }

    #[test]
    fn outcome_json_roundtrip_preserves_hash() {
        let outcome = DraftOutcomeState {
            header: OutcomeHeader {
                player_count: 1,
                hash: 0,
            },
            seats: vec![SeatAssignmentState {
                seat: 0,
                actor: 7,
                faction: "The Barony of Letnev".to_string(),
                slice_index: 0,
                slice_label: "A".to_string(),
                tiles: vec![26, 41, 29, 47, 62],
            }],
            turn_order: vec![7],
            map_tiles: vec![26, 41, 29, 47, 62],
        }
        .finalize();
        let json = encode_outcome_json(&outcome).expect("encode");
        let decoded = decode_outcome_json(&json).expect("decode");
        assert_eq!(decoded, outcome);
        assert_eq!(hash_outcome(&decoded), outcome.header.hash);
    }
}
