//! Slice generation.
//!
//! One pipeline serves every [`DraftVariant`]; the variant only selects the
//! [`VariantPolicy`] tables. A request runs whole attempts until one passes
//! every stage, retrying with the same random stream up to the configured
//! attempt ceiling.

pub mod policy;
pub mod repair;
pub mod state;

use std::{collections::BTreeSet, sync::Arc};

use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use draft_schema::{GeneratedSlicesState, SliceState, SlicesHeader};

use crate::generator_config::{GeneratorConfig, ScoringConfig};
use crate::sampler::{choose, choose_index};
use crate::tiles::{Tier, TileCatalog, TileFeatures, TileId};

pub use policy::{
    ring_adjacency, DraftVariant, UnknownVariant, VariantPolicy, MAX_PLAYERS, MIN_PLAYERS,
};
pub use repair::{
    separate_anomalies, PromotionOutcome, RepairReport, WeakSliceRepair, WeakSliceResult,
    WeakStat,
};
pub use state::{GeneratorState, GroupRef, SlotEntry, TierPools};

const SLICES_TARGET: &str = "slice_draft::slices";

/// Parameters of one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub variant: DraftVariant,
    pub player_count: usize,
    /// Defaults to the variant's documented count when absent.
    pub slice_count: Option<usize>,
    /// Push extra wormholes and legendaries into the active pool.
    pub extra_features: bool,
    /// Entropy-seeded when absent.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(variant: DraftVariant, player_count: usize) -> Self {
        Self {
            variant,
            player_count,
            slice_count: None,
            extra_features: false,
            seed: None,
        }
    }

    pub fn with_slice_count(mut self, slice_count: usize) -> Self {
        self.slice_count = Some(slice_count);
        self
    }

    pub fn with_extra_features(mut self, enabled: bool) -> Self {
        self.extra_features = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A request that no attempt could ever satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestIssue {
    #[error("player count {0} is outside {}..={}", MIN_PLAYERS, MAX_PLAYERS)]
    PlayerCount(usize),
    #[error("{variant} drafts take {min}..={max} slices, {requested} requested")]
    SliceCount {
        variant: DraftVariant,
        requested: usize,
        min: usize,
        max: usize,
    },
    #[error("{needed} tiles needed but the catalog holds {available}")]
    NotEnoughTiles { needed: usize, available: usize },
    #[error("at least {needed} red tiles needed but the catalog holds {available}")]
    NotEnoughRedTiles { needed: usize, available: usize },
}

/// Why a single attempt was thrown away.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttemptRejection {
    #[error("needed {needed} red tiles but only {available} remain")]
    RedPoolExhausted { needed: usize, available: usize },
    #[error("every blue pool was empty when filling a {requested} slot")]
    TierPoolsExhausted { requested: Tier },
    #[error("slice {slice} is unbalanced ({resources} resources / {influence} influence)")]
    Unbalanced {
        slice: usize,
        resources: f32,
        influence: f32,
    },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("invalid generation request: {0}")]
    InvalidRequest(#[from] RequestIssue),
    #[error("no valid layout after {attempts} attempts, last rejection: {last}")]
    AttemptsExhausted {
        attempts: u32,
        last: AttemptRejection,
    },
}

/// Accepted generator output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedSlices {
    pub variant: DraftVariant,
    pub player_count: usize,
    pub slices: Vec<Vec<TileId>>,
    /// Ring in template order, padded with [`TileId::PLACEHOLDER`]. Empty for
    /// variants without a ring.
    pub ring: Vec<TileId>,
    /// Number of red slots filled from the red pool.
    pub reds_reserved: usize,
    pub attempts: u32,
    pub report: RepairReport,
}

/// Bare slice and ring identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleSlices {
    pub slices: Vec<Vec<TileId>>,
    pub ring: Vec<TileId>,
}

/// Per-slice totals for display and balance checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SliceSummary {
    pub index: usize,
    pub optimal_resources: f32,
    pub optimal_influence: f32,
    pub total: f32,
    pub wormholes: usize,
    pub legendaries: usize,
    pub red_count: usize,
}

impl SliceSummary {
    pub fn of(index: usize, tiles: &[TileId], catalog: &TileCatalog) -> Self {
        let optimal = catalog.optimal_of(tiles);
        let mut wormholes = 0;
        let mut legendaries = 0;
        let mut red_count = 0;
        for id in tiles.iter().filter(|id| !id.is_placeholder()) {
            let tile = catalog.tile(*id);
            wormholes += tile.wormholes().iter().count();
            legendaries += usize::from(tile.is_legendary());
            red_count += usize::from(tile.tier == Tier::Red);
        }
        Self {
            index,
            optimal_resources: optimal.resources,
            optimal_influence: optimal.influence,
            total: optimal.total(),
            wormholes,
            legendaries,
            red_count,
        }
    }
}

/// Default display label of a slice: `A`, `B`, ...
pub fn slice_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(offset) if offset < 26 => char::from(b'A' + offset).to_string(),
        _ => format!("S{}", index + 1),
    }
}

impl GeneratedSlices {
    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    /// Every placed tile, ring placeholders excluded.
    pub fn tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.slices
            .iter()
            .flatten()
            .chain(self.ring.iter())
            .copied()
            .filter(|id| !id.is_placeholder())
    }

    pub fn summaries(&self, catalog: &TileCatalog) -> Vec<SliceSummary> {
        self.slices
            .iter()
            .enumerate()
            .map(|(index, tiles)| SliceSummary::of(index, tiles, catalog))
            .collect()
    }

    pub fn to_simple(&self) -> SimpleSlices {
        SimpleSlices {
            slices: self.slices.clone(),
            ring: self.ring.clone(),
        }
    }

    pub fn to_state(&self, catalog: &TileCatalog) -> GeneratedSlicesState {
        let slices = self
            .summaries(catalog)
            .into_iter()
            .zip(&self.slices)
            .map(|(summary, tiles)| SliceState {
                index: summary.index as u32,
                label: slice_label(summary.index),
                tiles: tiles.iter().map(|id| id.0).collect(),
                optimal_resources: summary.optimal_resources,
                optimal_influence: summary.optimal_influence,
                wormholes: summary.wormholes as u32,
                legendaries: summary.legendaries as u32,
            })
            .collect();
        GeneratedSlicesState {
            header: SlicesHeader {
                variant: self.variant.to_string(),
                player_count: self.player_count as u32,
                slice_count: self.slices.len() as u32,
                attempts: self.attempts,
                hash: 0,
            },
            slices,
            ring: self.ring.iter().map(|id| id.0).collect(),
        }
        .finalize()
    }
}

/// Produces balanced slices from an injected catalog and configuration.
#[derive(Debug, Clone)]
pub struct SliceGenerator {
    catalog: Arc<TileCatalog>,
    config: Arc<GeneratorConfig>,
}

impl SliceGenerator {
    pub fn new(catalog: Arc<TileCatalog>, config: Arc<GeneratorConfig>) -> Self {
        Self { catalog, config }
    }

    pub fn builtin() -> Self {
        Self::new(TileCatalog::builtin(), GeneratorConfig::builtin())
    }

    pub fn catalog(&self) -> &Arc<TileCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &Arc<GeneratorConfig> {
        &self.config
    }

    pub fn simple_generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<SimpleSlices, GenerationError> {
        self.generate(request).map(|generated| generated.to_simple())
    }

    pub fn generate(&self, request: &GenerationRequest) -> Result<GeneratedSlices, GenerationError> {
        let policy = VariantPolicy::for_variant(request.variant);
        let slice_count = self.validate(request, &policy).map_err(|issue| {
            tracing::warn!(
                target: SLICES_TARGET,
                variant = %request.variant,
                players = request.player_count,
                error = %issue,
                "slices.request.invalid"
            );
            issue
        })?;

        let mut rng = match request.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let max_attempts = self.config.max_attempts();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.attempt(&policy, request, slice_count, &mut rng) {
                Ok(mut generated) => {
                    generated.attempts = attempts;
                    tracing::info!(
                        target: SLICES_TARGET,
                        variant = %request.variant,
                        players = request.player_count,
                        slices = slice_count,
                        attempts,
                        fully_resolved = generated.report.fully_resolved(),
                        "slices.generated"
                    );
                    return Ok(generated);
                }
                Err(rejection) if attempts >= max_attempts => {
                    tracing::error!(
                        target: SLICES_TARGET,
                        variant = %request.variant,
                        attempts,
                        last = %rejection,
                        "slices.attempts.exhausted"
                    );
                    return Err(GenerationError::AttemptsExhausted {
                        attempts,
                        last: rejection,
                    });
                }
                Err(rejection) => {
                    tracing::debug!(
                        target: SLICES_TARGET,
                        attempt = attempts,
                        reason = %rejection,
                        "slices.attempt.rejected"
                    );
                }
            }
        }
    }

    fn validate(
        &self,
        request: &GenerationRequest,
        policy: &VariantPolicy,
    ) -> Result<usize, RequestIssue> {
        let players = request.player_count;
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
            return Err(RequestIssue::PlayerCount(players));
        }
        let slice_count = request
            .slice_count
            .unwrap_or_else(|| policy.default_slice_count(players));
        let bounds = policy.slice_bounds(players);
        if !bounds.contains(&slice_count) {
            return Err(RequestIssue::SliceCount {
                variant: policy.variant(),
                requested: slice_count,
                min: *bounds.start(),
                max: *bounds.end(),
            });
        }

        let needed = slice_count * policy.slice_len() + policy.ring_len(players);
        if needed > self.catalog.len() {
            return Err(RequestIssue::NotEnoughTiles {
                needed,
                available: self.catalog.len(),
            });
        }
        let min_reds = policy
            .red_counts()
            .iter()
            .filter(|option| option.weight > 0.0)
            .map(|option| option.value)
            .min()
            .unwrap_or(0);
        let available = self.catalog.all_tiles_of_tier(Tier::Red).len();
        if slice_count * min_reds > available {
            return Err(RequestIssue::NotEnoughRedTiles {
                needed: slice_count * min_reds,
                available,
            });
        }
        Ok(slice_count)
    }

    fn attempt<R: Rng + ?Sized>(
        &self,
        policy: &VariantPolicy,
        request: &GenerationRequest,
        slice_count: usize,
        rng: &mut R,
    ) -> Result<GeneratedSlices, AttemptRejection> {
        let catalog = self.catalog.as_ref();
        let mut state = GeneratorState::new(catalog, rng);

        pick_tiers(
            &mut state,
            policy,
            slice_count,
            policy.ring_len(request.player_count),
            rng,
        );
        let reds_reserved = assign_reds(&mut state)?;
        downgrade_rich_slices(&mut state, rng);
        reserve_blues(&mut state)?;

        let mut report = RepairReport::default();
        if request.extra_features {
            let promotion = self.config.promotion();
            let wormhole_target = *choose(&promotion.wormhole_targets(), rng);
            report.wormholes = repair::promote_wormholes(&mut state, wormhole_target, rng).to_vec();
            let legendary_target = *choose(&promotion.legendary_targets(), rng);
            report.legendaries = Some(repair::promote_legendaries(
                &mut state,
                legendary_target,
                rng,
            ));
        }

        resolve_blues(&mut state, self.config.scoring(), rng);

        for group in state.groups() {
            let adjacency = match group {
                GroupRef::Slice(_) => policy.adjacency().to_vec(),
                GroupRef::Ring => ring_adjacency(state.ring.len()),
            };
            let resolved = separate_anomalies(state.group_mut(group), &adjacency, catalog);
            if !resolved {
                tracing::debug!(
                    target: "slice_draft::repair",
                    group = %group,
                    "repair.anomaly.unresolved"
                );
            }
            report.anomalies_separated.push((group, resolved));
        }

        if policy.repairs_weak_slices() {
            repair::repair_weak_slices(
                &mut state,
                self.config.weak_slice_repair(),
                policy.adjacency(),
                &mut report,
            );
        }

        if policy.checks_balance() {
            self.check_balance(&state)?;
        }

        let slices = state
            .slices
            .iter()
            .enumerate()
            .map(|(index, entries)| finalize_group(GroupRef::Slice(index), entries))
            .collect();
        let ring = place_in_template(
            finalize_group(GroupRef::Ring, &state.ring),
            self.config.ring_template_slots(),
        );

        Ok(GeneratedSlices {
            variant: policy.variant(),
            player_count: request.player_count,
            slices,
            ring,
            reds_reserved,
            attempts: 0,
            report,
        })
    }

    fn check_balance(&self, state: &GeneratorState<'_>) -> Result<(), AttemptRejection> {
        let balance = self.config.balance();
        for index in 0..state.slices.len() {
            let optimal = state.group_optimal(GroupRef::Slice(index));
            let total = optimal.total();
            let balanced = optimal.resources >= balance.min_optimal_resources()
                && optimal.influence >= balance.min_optimal_influence()
                && total >= balance.min_optimal_total()
                && total <= balance.max_optimal_total();
            if !balanced {
                return Err(AttemptRejection::Unbalanced {
                    slice: index,
                    resources: optimal.resources,
                    influence: optimal.influence,
                });
            }
        }
        Ok(())
    }
}

/// Stage 1: give every slice and ring slot a tier.
fn pick_tiers<R: Rng + ?Sized>(
    state: &mut GeneratorState<'_>,
    policy: &VariantPolicy,
    slice_count: usize,
    ring_len: usize,
    rng: &mut R,
) {
    for _ in 0..slice_count {
        let red_count = *choose(policy.red_counts(), rng);
        let mut tiers = vec![Tier::Red; red_count];
        let combo: &Vec<Tier> = choose(policy.blue_combos(red_count), rng);
        tiers.extend_from_slice(combo);
        tiers.shuffle(rng);
        state
            .slices
            .push(tiers.into_iter().map(SlotEntry::with_tier).collect());
    }

    let mut ring_reds = 0;
    for _ in 0..ring_len {
        let tier = *choose(policy.ring_tiers(ring_reds, ring_len), rng);
        if tier == Tier::Red {
            ring_reds += 1;
        }
        state.ring.push(SlotEntry::with_tier(tier));
    }
}

/// Stages 2 and 3: reserve one red tile per red slot and place it.
fn assign_reds(state: &mut GeneratorState<'_>) -> Result<usize, AttemptRejection> {
    let needed = state.count_tier(Tier::Red);
    let pool = state.unused.get_mut(Tier::Red);
    if needed > pool.len() {
        return Err(AttemptRejection::RedPoolExhausted {
            needed,
            available: pool.len(),
        });
    }
    let mut reserved = pool.split_off(pool.len() - needed).into_iter();
    for entry in state.entries_mut().filter(|entry| entry.tier == Tier::Red) {
        entry.tile = reserved.next();
    }
    Ok(needed)
}

/// Stage 4: a slice holding a red tile with planets loses one blue tier step.
fn downgrade_rich_slices<R: Rng + ?Sized>(state: &mut GeneratorState<'_>, rng: &mut R) {
    let catalog = state.catalog;
    for (index, slice) in state.slices.iter_mut().enumerate() {
        let rich = slice
            .iter()
            .filter_map(|entry| entry.tile)
            .any(|id| catalog.tile(id).is_rich_red());
        if !rich || slice.is_empty() {
            continue;
        }
        let offset = rng.gen_range(0..slice.len());
        let order: Vec<usize> = (0..slice.len())
            .map(|step| (offset + step) % slice.len())
            .collect();
        for (from, to) in [(Tier::High, Tier::Med), (Tier::Med, Tier::Low)] {
            if let Some(&pos) = order.iter().find(|&&pos| slice[pos].tier == from) {
                slice[pos].tier = to;
                tracing::trace!(
                    target: SLICES_TARGET,
                    slice = index,
                    from = %from,
                    to = %to,
                    "slices.downgrade"
                );
                break;
            }
        }
    }
}

/// Stage 5: reserve a blue tile for every blue slot, strongest tiers first,
/// falling back through [`Tier::fallback_order`] when a pool runs dry.
fn reserve_blues(state: &mut GeneratorState<'_>) -> Result<(), AttemptRejection> {
    let mut wanted = Vec::new();
    for tier in [Tier::High, Tier::Med, Tier::Low] {
        for group in state.groups() {
            for (pos, entry) in state.group(group).iter().enumerate() {
                if entry.tier == tier && !entry.is_resolved() {
                    wanted.push((group, pos, tier));
                }
            }
        }
    }

    for (group, pos, tier) in wanted {
        let drawn = tier
            .fallback_order()
            .into_iter()
            .find_map(|source| state.unused.get_mut(source).pop().map(|id| (source, id)));
        let Some((source, tile)) = drawn else {
            return Err(AttemptRejection::TierPoolsExhausted { requested: tier });
        };
        state.reserved.push(source, tile);
        state.group_mut(group)[pos].tier = source;
    }
    Ok(())
}

/// Stage 7: resolve every open slot in random order with a scored draw.
fn resolve_blues<R: Rng + ?Sized>(
    state: &mut GeneratorState<'_>,
    scoring: &ScoringConfig,
    rng: &mut R,
) {
    let mut open = Vec::new();
    for group in state.groups() {
        for (pos, entry) in state.group(group).iter().enumerate() {
            if !entry.is_resolved() {
                open.push((group, pos));
            }
        }
    }
    open.shuffle(rng);

    for (group, pos) in open {
        let tier = state.group(group)[pos].tier;
        let candidates = state.reserved.get(tier).to_vec();
        assert!(
            !candidates.is_empty(),
            "no reserved {} tile left for {} position {}",
            tier,
            group,
            pos
        );
        let placed = state.placed_tiles(group);
        let weights: Vec<f64> = candidates
            .iter()
            .map(|id| score_candidate(state.catalog, scoring, &placed, *id))
            .collect();
        let chosen = candidates[choose_index(&weights, rng)];
        state.reserved.remove(tier, chosen);
        state.group_mut(group)[pos].tile = Some(chosen);
    }
}

fn score_candidate(
    catalog: &TileCatalog,
    scoring: &ScoringConfig,
    placed: &[TileId],
    candidate: TileId,
) -> f64 {
    let tile = catalog.tile(candidate);
    let mut present = TileFeatures::empty();
    let mut traits = BTreeSet::new();
    let mut techs = BTreeSet::new();
    for id in placed {
        let other = catalog.tile(*id);
        present |= other.features & TileFeatures::NOTABLE;
        traits.extend(other.traits());
        techs.extend(other.techs());
    }
    if present.intersects(tile.features & TileFeatures::NOTABLE) {
        return scoring.duplicate_feature_weight();
    }

    let mut weight = scoring.base_weight();

    let have = catalog.optimal_of(placed);
    let offered = tile.optimal();
    if offered.total() > 0.0 {
        let share = if have.resources > have.influence {
            offered.influence / offered.total()
        } else if have.influence > have.resources {
            offered.resources / offered.total()
        } else {
            0.0
        };
        weight += scoring.balance_bonus() * f64::from(share);
    }

    let new_traits = tile
        .traits()
        .collect::<BTreeSet<_>>()
        .difference(&traits)
        .count();
    let new_techs = tile
        .techs()
        .collect::<BTreeSet<_>>()
        .difference(&techs)
        .count();
    weight + scoring.diversity_bonus() * (new_traits + new_techs) as f64
}

fn finalize_group(group: GroupRef, entries: &[SlotEntry]) -> Vec<TileId> {
    entries
        .iter()
        .enumerate()
        .map(|(pos, entry)| match entry.tile {
            Some(id) => id,
            None => panic!("{} position {} finished without a tile", group, pos),
        })
        .collect()
}

/// Spread ring tiles over the visual template, filling gaps with placeholders.
fn place_in_template(ring: Vec<TileId>, template_slots: usize) -> Vec<TileId> {
    if ring.is_empty() || ring.len() >= template_slots {
        return ring;
    }
    let mut placed = vec![TileId::PLACEHOLDER; template_slots];
    let count = ring.len();
    for (index, tile) in ring.into_iter().enumerate() {
        placed[index * template_slots / count] = tile;
    }
    placed
}
