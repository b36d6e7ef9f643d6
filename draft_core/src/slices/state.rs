use std::fmt;

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use crate::tiles::{OptimalValue, Tier, TileCatalog, TileId};

/// One position inside a slice or the shared ring: a desired tier, then the
/// concrete tile once resolution reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEntry {
    pub tier: Tier,
    pub tile: Option<TileId>,
}

impl SlotEntry {
    pub fn with_tier(tier: Tier) -> Self {
        Self { tier, tile: None }
    }

    pub fn resolved(tier: Tier, tile: TileId) -> Self {
        Self {
            tier,
            tile: Some(tile),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.tile.is_some()
    }
}

/// Which tile group a slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum GroupRef {
    Slice(usize),
    Ring,
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRef::Slice(index) => write!(f, "slice {}", index),
            GroupRef::Ring => f.write_str("ring"),
        }
    }
}

/// Tile identifiers bucketed by tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierPools {
    pools: [Vec<TileId>; 4],
}

impl TierPools {
    pub fn get(&self, tier: Tier) -> &[TileId] {
        &self.pools[tier.index()]
    }

    pub fn get_mut(&mut self, tier: Tier) -> &mut Vec<TileId> {
        &mut self.pools[tier.index()]
    }

    pub fn push(&mut self, tier: Tier, tile: TileId) {
        self.pools[tier.index()].push(tile);
    }

    pub fn remove(&mut self, tier: Tier, tile: TileId) -> bool {
        let pool = &mut self.pools[tier.index()];
        match pool.iter().position(|candidate| *candidate == tile) {
            Some(index) => {
                pool.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self, tier: Tier) -> usize {
        self.pools[tier.index()].len()
    }

    pub fn is_empty(&self, tier: Tier) -> bool {
        self.pools[tier.index()].is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, TileId)> + '_ {
        Tier::ALL
            .into_iter()
            .flat_map(move |tier| self.get(tier).iter().map(move |tile| (tier, *tile)))
    }
}

/// Working state of one generation attempt.
#[derive(Debug, Clone)]
pub struct GeneratorState<'a> {
    pub catalog: &'a TileCatalog,
    pub slices: Vec<Vec<SlotEntry>>,
    pub ring: Vec<SlotEntry>,
    /// Tiles not yet committed to this attempt, shuffled once per attempt.
    pub unused: TierPools,
    /// Blue tiles reserved by quota but not yet placed in a slot.
    pub reserved: TierPools,
}

impl<'a> GeneratorState<'a> {
    pub fn new<R: Rng + ?Sized>(catalog: &'a TileCatalog, rng: &mut R) -> Self {
        let mut unused = TierPools::default();
        for tier in Tier::ALL {
            let pool = unused.get_mut(tier);
            pool.extend_from_slice(catalog.all_tiles_of_tier(tier));
            pool.shuffle(rng);
        }
        Self {
            catalog,
            slices: Vec::new(),
            ring: Vec::new(),
            unused,
            reserved: TierPools::default(),
        }
    }

    pub fn groups(&self) -> Vec<GroupRef> {
        let mut groups: Vec<GroupRef> = (0..self.slices.len()).map(GroupRef::Slice).collect();
        if !self.ring.is_empty() {
            groups.push(GroupRef::Ring);
        }
        groups
    }

    pub fn group(&self, group: GroupRef) -> &[SlotEntry] {
        match group {
            GroupRef::Slice(index) => &self.slices[index],
            GroupRef::Ring => &self.ring,
        }
    }

    pub fn group_mut(&mut self, group: GroupRef) -> &mut Vec<SlotEntry> {
        match group {
            GroupRef::Slice(index) => &mut self.slices[index],
            GroupRef::Ring => &mut self.ring,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &SlotEntry> {
        self.slices.iter().flatten().chain(self.ring.iter())
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut SlotEntry> {
        self.slices.iter_mut().flatten().chain(self.ring.iter_mut())
    }

    pub fn placed_tiles(&self, group: GroupRef) -> Vec<TileId> {
        self.group(group).iter().filter_map(|entry| entry.tile).collect()
    }

    pub fn group_optimal(&self, group: GroupRef) -> OptimalValue {
        self.catalog.optimal_of(&self.placed_tiles(group))
    }

    pub fn count_tier(&self, tier: Tier) -> usize {
        self.entries().filter(|entry| entry.tier == tier).count()
    }
}
