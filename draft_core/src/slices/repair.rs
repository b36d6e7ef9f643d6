//! Passes that patch a generation attempt after tiers are picked: wormhole and
//! legendary promotion, anomaly separation and weak-slice strengthening.
//!
//! Every pass is best effort. Outcomes are reported instead of failing the
//! attempt, so callers can tell a repaired group from one accepted as-is.

use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use super::state::{GeneratorState, GroupRef, SlotEntry};
use crate::generator_config::WeakSliceRepairConfig;
use crate::tiles::{Tier, TileCatalog, TileFeatures, TileId};

const REPAIR_TARGET: &str = "slice_draft::repair";

/// How far a promotion pass got towards its sampled minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromotionOutcome {
    pub target: usize,
    pub reached: usize,
}

impl PromotionOutcome {
    pub fn met(&self) -> bool {
        self.reached >= self.target
    }
}

/// Raise the number of reserved blue tiles carrying `feature` to at least
/// `target`.
///
/// Each swap trades an unused blue tile with the feature for a reserved blue
/// tile of the same tier that carries no wormhole or legendary, so tier counts
/// never move. Red tiles are never counted or touched.
pub fn promote_feature<R: Rng + ?Sized>(
    state: &mut GeneratorState<'_>,
    feature: TileFeatures,
    target: usize,
    rng: &mut R,
) -> PromotionOutcome {
    let mut reached = count_reserved_blue(state, feature);
    while reached < target {
        if !swap_in_feature(state, feature, rng) {
            break;
        }
        reached = count_reserved_blue(state, feature);
    }

    tracing::debug!(
        target: REPAIR_TARGET,
        feature = ?feature,
        target_count = target,
        reached,
        "repair.promotion"
    );
    PromotionOutcome { target, reached }
}

fn count_reserved_blue(state: &GeneratorState<'_>, feature: TileFeatures) -> usize {
    Tier::BLUE
        .into_iter()
        .flat_map(|tier| state.reserved.get(tier).iter())
        .filter(|id| state.catalog.tile(**id).features.contains(feature))
        .count()
}

pub fn promote_wormholes<R: Rng + ?Sized>(
    state: &mut GeneratorState<'_>,
    target: usize,
    rng: &mut R,
) -> [PromotionOutcome; 2] {
    [
        promote_feature(state, TileFeatures::ALPHA, target, rng),
        promote_feature(state, TileFeatures::BETA, target, rng),
    ]
}

pub fn promote_legendaries<R: Rng + ?Sized>(
    state: &mut GeneratorState<'_>,
    target: usize,
    rng: &mut R,
) -> PromotionOutcome {
    promote_feature(state, TileFeatures::LEGENDARY, target, rng)
}

fn swap_in_feature<R: Rng + ?Sized>(
    state: &mut GeneratorState<'_>,
    feature: TileFeatures,
    rng: &mut R,
) -> bool {
    let catalog = state.catalog;
    let mut tiers = Tier::BLUE;
    tiers.shuffle(rng);

    for tier in tiers {
        let incoming = state
            .unused
            .get(tier)
            .iter()
            .copied()
            .find(|id| catalog.tile(*id).features.contains(feature));
        let outgoing = state
            .reserved
            .get(tier)
            .iter()
            .copied()
            .find(|id| !catalog.tile(*id).is_notable());
        let (Some(incoming), Some(outgoing)) = (incoming, outgoing) else {
            continue;
        };

        state.reserved.remove(tier, outgoing);
        state.reserved.push(tier, incoming);
        state.unused.remove(tier, incoming);
        state.unused.push(tier, outgoing);
        log_swap(feature, outgoing, incoming);
        return true;
    }
    false
}

fn log_swap(feature: TileFeatures, outgoing: TileId, incoming: TileId) {
    tracing::trace!(
        target: REPAIR_TARGET,
        feature = ?feature,
        outgoing = %outgoing,
        incoming = %incoming,
        "repair.promotion.swap"
    );
}

fn is_anomaly(catalog: &TileCatalog, entry: &SlotEntry) -> bool {
    entry
        .tile
        .map_or(false, |id| catalog.tile(id).is_anomaly())
}

fn conflicts(group: &[SlotEntry], adjacency: &[(usize, usize)], catalog: &TileCatalog) -> usize {
    adjacency
        .iter()
        .filter(|&&(a, b)| is_anomaly(catalog, &group[a]) && is_anomaly(catalog, &group[b]))
        .count()
}

/// Move anomalies apart inside one group.
///
/// Each step swaps one side of an adjacent anomaly pair with a non-anomaly
/// entry elsewhere in the group, and only when that strictly lowers the number
/// of adjacent anomaly pairs. Returns whether no adjacent pair remains. A group
/// with no adjacent pair is left untouched.
pub fn separate_anomalies(
    group: &mut [SlotEntry],
    adjacency: &[(usize, usize)],
    catalog: &TileCatalog,
) -> bool {
    loop {
        let current = conflicts(group, adjacency, catalog);
        if current == 0 {
            return true;
        }

        let mut best: Option<(usize, usize, usize)> = None;
        for &(a, b) in adjacency {
            if !(is_anomaly(catalog, &group[a]) && is_anomaly(catalog, &group[b])) {
                continue;
            }
            for side in [b, a] {
                for other in 0..group.len() {
                    if other == a || other == b || is_anomaly(catalog, &group[other]) {
                        continue;
                    }
                    group.swap(side, other);
                    let after = conflicts(group, adjacency, catalog);
                    group.swap(side, other);
                    if after < current && best.map_or(true, |(_, _, score)| after < score) {
                        best = Some((side, other, after));
                    }
                }
            }
        }

        match best {
            Some((side, other, _)) => group.swap(side, other),
            None => return false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeakStat {
    Resources,
    Influence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum WeakSliceResult {
    Repaired { removed: TileId, added: TileId },
    NoSwapOut,
    NoHelpfulSwapIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeakSliceRepair {
    pub slice: usize,
    pub deficient: WeakStat,
    pub result: WeakSliceResult,
}

impl WeakSliceRepair {
    pub fn repaired(&self) -> bool {
        matches!(self.result, WeakSliceResult::Repaired { .. })
    }
}

fn stat_of(catalog: &TileCatalog, id: TileId, stat: WeakStat) -> f32 {
    let optimal = catalog.tile(id).optimal();
    match stat {
        WeakStat::Resources => optimal.resources,
        WeakStat::Influence => optimal.influence,
    }
}

/// Strengthen slices whose optimal resources or influence sit under the
/// configured floors. At most one swap per slice; only slices that needed a
/// swap are recorded in `report.weak_slices`. A swapped slice is separated
/// again and its anomaly entry in `report` updated.
pub fn repair_weak_slices(
    state: &mut GeneratorState<'_>,
    floors: &WeakSliceRepairConfig,
    adjacency: &[(usize, usize)],
    report: &mut RepairReport,
) {
    let catalog = state.catalog;

    for index in 0..state.slices.len() {
        let optimal = state.group_optimal(GroupRef::Slice(index));
        let res_gap = floors.min_optimal_resources() - optimal.resources;
        let inf_gap = floors.min_optimal_influence() - optimal.influence;
        if res_gap <= 0.0 && inf_gap <= 0.0 {
            continue;
        }
        let deficient = if res_gap >= inf_gap {
            WeakStat::Resources
        } else {
            WeakStat::Influence
        };

        let swap_out = state.slices[index]
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.tier.is_blue())
            .filter_map(|(pos, entry)| entry.tile.map(|id| (pos, id)))
            .filter(|(_, id)| !catalog.tile(*id).is_notable())
            .min_by(|(_, a), (_, b)| {
                let key = |id: TileId| {
                    (
                        stat_of(catalog, id, deficient),
                        catalog.tile(id).optimal().total(),
                    )
                };
                key(*a)
                    .partial_cmp(&key(*b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        let result = match swap_out {
            None => WeakSliceResult::NoSwapOut,
            Some((pos, outgoing)) => {
                let floor = stat_of(catalog, outgoing, deficient);
                let swap_in = Tier::BLUE
                    .into_iter()
                    .flat_map(|tier| state.unused.get(tier).iter().copied())
                    .filter(|id| !catalog.tile(*id).is_notable())
                    .filter(|id| stat_of(catalog, *id, deficient) > floor)
                    .max_by(|a, b| {
                        stat_of(catalog, *a, deficient)
                            .partial_cmp(&stat_of(catalog, *b, deficient))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                match swap_in {
                    None => WeakSliceResult::NoHelpfulSwapIn,
                    Some(incoming) => {
                        let incoming_tier = catalog.tier_of(incoming);
                        let outgoing_tier = catalog.tier_of(outgoing);
                        state.unused.remove(incoming_tier, incoming);
                        state.unused.push(outgoing_tier, outgoing);
                        state.slices[index][pos] = SlotEntry::resolved(incoming_tier, incoming);
                        let separated =
                            separate_anomalies(&mut state.slices[index], adjacency, catalog);
                        report.record_separation(GroupRef::Slice(index), separated);
                        WeakSliceResult::Repaired {
                            removed: outgoing,
                            added: incoming,
                        }
                    }
                }
            }
        };

        match result {
            WeakSliceResult::Repaired { removed, added } => tracing::debug!(
                target: REPAIR_TARGET,
                slice = index,
                removed = %removed,
                added = %added,
                "repair.weak_slice.repaired"
            ),
            _ => tracing::warn!(
                target: REPAIR_TARGET,
                slice = index,
                deficient = ?deficient,
                result = ?result,
                "repair.weak_slice.unresolved"
            ),
        }
        report.weak_slices.push(WeakSliceRepair {
            slice: index,
            deficient,
            result,
        });
    }
}

/// What the repair passes of an accepted attempt achieved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairReport {
    pub wormholes: Vec<PromotionOutcome>,
    pub legendaries: Option<PromotionOutcome>,
    pub anomalies_separated: Vec<(GroupRef, bool)>,
    pub weak_slices: Vec<WeakSliceRepair>,
}

impl RepairReport {
    /// True when every anomaly pass resolved and every weak slice was repaired.
    /// Promotion targets are best effort and do not count.
    pub fn fully_resolved(&self) -> bool {
        self.anomalies_separated.iter().all(|(_, resolved)| *resolved)
            && self.weak_slices.iter().all(WeakSliceRepair::repaired)
    }

    /// Set the separation result of `group`, replacing an earlier one.
    pub fn record_separation(&mut self, group: GroupRef, resolved: bool) {
        match self
            .anomalies_separated
            .iter_mut()
            .find(|(known, _)| *known == group)
        {
            Some(entry) => entry.1 = resolved,
            None => self.anomalies_separated.push((group, resolved)),
        }
    }

    pub fn unresolved_groups(&self) -> impl Iterator<Item = GroupRef> + '_ {
        self.anomalies_separated
            .iter()
            .filter(|(_, resolved)| !resolved)
            .map(|(group, _)| *group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator_config::GeneratorConfig;
    use crate::slices::policy::ring_adjacency;
    use rand::{rngs::SmallRng, SeedableRng};

    // 41 and 42 are anomalies; 47 and 48 are empty space.
    fn entries(ids: &[i32]) -> Vec<SlotEntry> {
        ids.iter()
            .map(|id| SlotEntry::resolved(Tier::Red, TileId(*id)))
            .collect()
    }

    fn ids(group: &[SlotEntry]) -> Vec<i32> {
        group.iter().map(|e| e.tile.map_or(-1, |t| t.0)).collect()
    }

    #[test]
    fn adjacent_anomalies_are_split() {
        let catalog = TileCatalog::builtin();
        let adjacency = [(0, 1), (1, 2), (2, 3)];
        let mut group = entries(&[41, 42, 47, 48]);
        assert!(separate_anomalies(&mut group, &adjacency, &catalog));
        assert_eq!(conflicts(&group, &adjacency, &catalog), 0);
        let mut sorted = ids(&group);
        sorted.sort();
        assert_eq!(sorted, vec![41, 42, 47, 48]);
    }

    #[test]
    fn separation_is_idempotent() {
        let catalog = TileCatalog::builtin();
        let adjacency = [(0, 1), (1, 2), (2, 3)];
        let mut group = entries(&[41, 42, 47, 48]);
        separate_anomalies(&mut group, &adjacency, &catalog);
        let once = group.clone();
        assert!(separate_anomalies(&mut group, &adjacency, &catalog));
        assert_eq!(group, once);
    }

    #[test]
    fn majority_anomaly_ring_reports_unresolved() {
        let catalog = TileCatalog::builtin();
        let adjacency = ring_adjacency(3);
        let mut group = entries(&[41, 42, 43]);
        let before = group.clone();
        assert!(!separate_anomalies(&mut group, &adjacency, &catalog));
        assert_eq!(group, before);
    }

    #[test]
    fn promotion_swaps_preserve_tiers() {
        let catalog = TileCatalog::builtin();
        let mut rng = SmallRng::seed_from_u64(21);
        let mut state = GeneratorState::new(&catalog, &mut rng);
        // Reserve two plain med tiles and nothing carrying a wormhole.
        for id in [27, 31] {
            state.unused.remove(Tier::Med, TileId(id));
            state.reserved.push(Tier::Med, TileId(id));
        }
        let outcome = promote_feature(&mut state, TileFeatures::ALPHA, 1, &mut rng);
        assert!(outcome.met());
        // 26 is the only unused blue alpha; it lives in the med pool.
        assert_eq!(state.reserved.len(Tier::Med), 2);
        assert!(state.reserved.get(Tier::Med).contains(&TileId(26)));
    }

    #[test]
    fn placed_red_wormholes_do_not_count_towards_promotion() {
        let catalog = TileCatalog::builtin();
        let mut rng = SmallRng::seed_from_u64(34);
        let mut state = GeneratorState::new(&catalog, &mut rng);
        // A red slot already holds alpha tile 39; the blue reserve is plain.
        state.unused.remove(Tier::Red, TileId(39));
        state.slices.push(vec![
            SlotEntry::resolved(Tier::Red, TileId(39)),
            SlotEntry::with_tier(Tier::Med),
        ]);
        for id in [27, 31] {
            state.unused.remove(Tier::Med, TileId(id));
            state.reserved.push(Tier::Med, TileId(id));
        }

        let outcome = promote_feature(&mut state, TileFeatures::ALPHA, 1, &mut rng);
        assert_eq!(outcome, PromotionOutcome { target: 1, reached: 1 });
        assert!(state.reserved.get(Tier::Med).contains(&TileId(26)));
        assert_eq!(state.slices[0][0].tile, Some(TileId(39)));
        assert!(!state.unused.get(Tier::Red).contains(&TileId(39)));
    }

    #[test]
    fn promotion_stops_without_candidates() {
        let catalog = TileCatalog::builtin();
        let mut rng = SmallRng::seed_from_u64(5);
        let mut state = GeneratorState::new(&catalog, &mut rng);
        let outcome = promote_feature(&mut state, TileFeatures::LEGENDARY, 2, &mut rng);
        assert_eq!(outcome.reached, 0);
        assert!(!outcome.met());
    }

    #[test]
    fn weak_slice_gets_stronger_tile() {
        let catalog = TileCatalog::builtin();
        let config = GeneratorConfig::default();
        let mut rng = SmallRng::seed_from_u64(9);
        let mut state = GeneratorState::new(&catalog, &mut rng);
        // Two empty reds plus two 1/1 low tiles.
        let slice = vec![
            SlotEntry::resolved(Tier::Red, TileId(47)),
            SlotEntry::resolved(Tier::Low, TileId(21)),
            SlotEntry::resolved(Tier::Low, TileId(22)),
            SlotEntry::resolved(Tier::Red, TileId(48)),
        ];
        for entry in &slice {
            if let Some(id) = entry.tile {
                state.unused.remove(entry.tier, id);
            }
        }
        state.slices.push(slice);

        let adjacency = [(0, 1), (1, 2), (1, 3)];
        let mut report = RepairReport::default();
        repair_weak_slices(&mut state, config.weak_slice_repair(), &adjacency, &mut report);
        let repairs = &report.weak_slices;
        assert_eq!(repairs.len(), 1);
        assert!(repairs[0].repaired(), "{:?}", repairs[0]);
        let optimal = state.group_optimal(GroupRef::Slice(0));
        assert!(optimal.total() > 2.0);
        assert_eq!(state.count_tier(Tier::Red), 2);
    }

    #[test]
    fn weak_slice_swap_refreshes_anomaly_entry() {
        let catalog = TileCatalog::builtin();
        let config = GeneratorConfig::default();
        let mut rng = SmallRng::seed_from_u64(12);
        let mut state = GeneratorState::new(&catalog, &mut rng);
        // Adjacent anomalies 41 and 42 next to two 1/1 low tiles.
        let slice = vec![
            SlotEntry::resolved(Tier::Red, TileId(41)),
            SlotEntry::resolved(Tier::Red, TileId(42)),
            SlotEntry::resolved(Tier::Low, TileId(21)),
            SlotEntry::resolved(Tier::Low, TileId(22)),
        ];
        for entry in &slice {
            if let Some(id) = entry.tile {
                state.unused.remove(entry.tier, id);
            }
        }
        state.slices.push(slice);

        let adjacency = [(0, 1), (1, 2), (2, 3)];
        let mut report = RepairReport::default();
        report.anomalies_separated.push((GroupRef::Slice(0), false));
        repair_weak_slices(&mut state, config.weak_slice_repair(), &adjacency, &mut report);

        assert!(report.weak_slices[0].repaired());
        assert_eq!(report.anomalies_separated, vec![(GroupRef::Slice(0), true)]);
        assert_eq!(conflicts(&state.slices[0], &adjacency, &catalog), 0);
    }
}
