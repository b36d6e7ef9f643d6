//! Draft session wiring: turns generator output into selection categories and
//! a committed seat/slice/faction assignment.

use std::{collections::BTreeSet, fmt, sync::Arc};

use rand::{rngs::SmallRng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use draft_runtime::{parse_custom_config, CustomConfig, CustomConfigError};
use draft_schema::{DraftOutcomeState, OutcomeHeader, SeatAssignmentState};

use crate::factions::{Faction, FactionRegistry};
use crate::notify::{Broadcast, DraftNotice};
use crate::selection::{
    ActorId, ClaimMode, ClaimOutcome, SelectionArbiter, SelectionError, SelectionObserver,
    TurnAdvance,
};
use crate::slices::{
    slice_label, DraftVariant, GeneratedSlices, GenerationError, GenerationRequest,
    SliceGenerator, VariantPolicy, MAX_PLAYERS, MIN_PLAYERS,
};
use crate::tiles::{TileCatalog, TileId};

const DRAFT_TARGET: &str = "slice_draft::draft";

pub const SLICE_CATEGORY: &str = "slice";
pub const FACTION_CATEGORY: &str = "faction";
pub const SEAT_CATEGORY: &str = "seat";

/// Anything an actor can claim during a draft.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftItem {
    Slice(usize),
    Faction(String),
    Seat(usize),
}

impl fmt::Display for DraftItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftItem::Slice(index) => write!(f, "slice {}", slice_label(*index)),
            DraftItem::Faction(name) => f.write_str(name),
            DraftItem::Seat(seat) => write!(f, "seat {}", seat + 1),
        }
    }
}

pub fn seat_label(seat: usize) -> String {
    if seat == 0 {
        "Seat 1 (Speaker)".to_string()
    } else {
        format!("Seat {}", seat + 1)
    }
}

/// Receives the final actor order, speaker first.
pub trait TurnOrderSink {
    fn set_turn_order(&mut self, order: &[ActorId]);
}

impl<F> TurnOrderSink for F
where
    F: FnMut(&[ActorId]),
{
    fn set_turn_order(&mut self, order: &[ActorId]) {
        self(order)
    }
}

/// Receives the flattened tile layout: ring first, then each seat's slice.
pub trait MapLayoutApplier {
    fn apply_layout(&mut self, tiles: &[TileId]);
}

impl<F> MapLayoutApplier for F
where
    F: FnMut(&[TileId]),
{
    fn apply_layout(&mut self, tiles: &[TileId]) {
        self(tiles)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSettings {
    pub variant: DraftVariant,
    /// Participants; their count is the player count.
    pub actors: Vec<ActorId>,
    pub slice_count: Option<usize>,
    /// Size of the random faction pool; defaults to one more than the players.
    pub faction_count: Option<usize>,
    pub extra_features: bool,
    pub mode: ClaimMode,
    pub seed: Option<u64>,
}

impl DraftSettings {
    pub fn new(variant: DraftVariant, actors: Vec<ActorId>) -> Self {
        Self {
            variant,
            actors,
            slice_count: None,
            faction_count: None,
            extra_features: false,
            mode: ClaimMode::Simultaneous,
            seed: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.actors.len()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_mode(mut self, mode: ClaimMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_faction_count(mut self, count: usize) -> Self {
        self.faction_count = Some(count);
        self
    }

    pub fn generation_request(&self) -> GenerationRequest {
        GenerationRequest {
            variant: self.variant,
            player_count: self.player_count(),
            slice_count: self.slice_count,
            extra_features: self.extra_features,
            seed: self.seed,
        }
    }
}

/// External services a draft talks to.
pub struct DraftCollaborators {
    pub catalog: Arc<TileCatalog>,
    pub factions: Arc<FactionRegistry>,
    pub broadcast: Box<dyn Broadcast>,
    pub turn_order: Box<dyn TurnOrderSink>,
    pub layout: Box<dyn MapLayoutApplier>,
    pub turn_advance: Option<Box<dyn TurnAdvance>>,
}

impl DraftCollaborators {
    pub fn new(
        catalog: Arc<TileCatalog>,
        factions: Arc<FactionRegistry>,
        broadcast: Box<dyn Broadcast>,
    ) -> Self {
        Self {
            catalog,
            factions,
            broadcast,
            turn_order: Box::new(|_: &[ActorId]| {}),
            layout: Box::new(|_: &[TileId]| {}),
            turn_advance: None,
        }
    }

    pub fn with_turn_order(mut self, sink: Box<dyn TurnOrderSink>) -> Self {
        self.turn_order = sink;
        self
    }

    pub fn with_layout(mut self, layout: Box<dyn MapLayoutApplier>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_turn_advance(mut self, turns: Box<dyn TurnAdvance>) -> Self {
        self.turn_advance = Some(turns);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftPhase {
    Selecting,
    Committed,
    Cancelled,
}

/// Why a custom configuration was refused after it parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigRejection {
    #[error("{found} slices given but {players} players need at least {players}")]
    TooFewSlices { found: usize, players: usize },
    #[error("slice {index} has {found} tiles, {variant} slices take {expected}")]
    SliceLength {
        index: usize,
        found: usize,
        expected: usize,
        variant: DraftVariant,
    },
    #[error("tile {0} is not a draftable system")]
    UnknownTile(i32),
    #[error("tile {0} is used more than once")]
    DuplicateTile(i32),
    #[error("unknown faction '{0}'")]
    UnknownFaction(String),
    #[error("faction '{0}' is listed more than once")]
    DuplicateFaction(String),
    #[error("{found} factions given but {players} players need at least {players}")]
    TooFewFactions { found: usize, players: usize },
    #[error("{labels} labels given for {slices} slices")]
    LabelCount { labels: usize, slices: usize },
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft is {0:?}, not selecting")]
    NotActive(DraftPhase),
    #[error("actor {0} is not part of this draft")]
    UnknownActor(ActorId),
    #[error("'{0}' is not a draft category")]
    UnknownCategory(String),
    #[error("actor {0} has not finished selecting")]
    NotReady(ActorId),
    #[error("{item} is claimed by both actor {first} and actor {second}")]
    Collision {
        item: DraftItem,
        first: ActorId,
        second: ActorId,
    },
    #[error("draft needs {}..={} distinct actors, got {0}", MIN_PLAYERS, MAX_PLAYERS)]
    InvalidActors(usize),
    #[error("custom configuration rejected: {0}")]
    CustomConfig(#[from] CustomConfigError),
    #[error("custom configuration rejected: {0}")]
    Rejected(#[from] ConfigRejection),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftSlice {
    pub label: String,
    pub tiles: Vec<TileId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatAssignment {
    pub seat: usize,
    pub actor: ActorId,
    pub faction: Faction,
    pub slice_index: usize,
    pub slice: DraftSlice,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftOutcome {
    /// Ordered by seat; seat 0 is the speaker.
    pub seats: Vec<SeatAssignment>,
    pub turn_order: Vec<ActorId>,
    pub map_tiles: Vec<TileId>,
}

impl DraftOutcome {
    pub fn to_state(&self) -> DraftOutcomeState {
        DraftOutcomeState {
            header: OutcomeHeader {
                player_count: self.seats.len() as u32,
                hash: 0,
            },
            seats: self
                .seats
                .iter()
                .map(|seat| SeatAssignmentState {
                    seat: seat.seat as u32,
                    actor: seat.actor.0,
                    faction: seat.faction.name.clone(),
                    slice_index: seat.slice_index as u32,
                    slice_label: seat.slice.label.clone(),
                    tiles: seat.slice.tiles.iter().map(|id| id.0).collect(),
                })
                .collect(),
            turn_order: self.turn_order.iter().map(|actor| actor.0).collect(),
            map_tiles: self.map_tiles.iter().map(|id| id.0).collect(),
        }
        .finalize()
    }
}

/// One draft session from category setup to commit or cancel.
pub struct DraftOrchestrator {
    settings: DraftSettings,
    policy: VariantPolicy,
    catalog: Arc<TileCatalog>,
    registry: Arc<FactionRegistry>,
    broadcast: Box<dyn Broadcast>,
    turn_order: Box<dyn TurnOrderSink>,
    layout: Box<dyn MapLayoutApplier>,
    slices: Vec<DraftSlice>,
    ring: Vec<TileId>,
    factions: Vec<Faction>,
    arbiter: SelectionArbiter<DraftItem>,
    phase: DraftPhase,
}

impl fmt::Debug for DraftOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DraftOrchestrator")
            .field("settings", &self.settings)
            .field("slices", &self.slices)
            .field("ring", &self.ring)
            .field("factions", &self.factions)
            .field("arbiter", &self.arbiter)
            .field("phase", &self.phase)
            .finish()
    }
}

impl DraftOrchestrator {
    /// Generate slices for `settings` and open the draft on them.
    pub fn generate(
        settings: DraftSettings,
        generator: &SliceGenerator,
        collaborators: DraftCollaborators,
    ) -> Result<Self, DraftError> {
        let generated = generator.generate(&settings.generation_request())?;
        Self::begin(settings, &generated, collaborators)
    }

    /// Open a draft on already generated slices.
    pub fn begin(
        settings: DraftSettings,
        generated: &GeneratedSlices,
        collaborators: DraftCollaborators,
    ) -> Result<Self, DraftError> {
        let players = settings.player_count();
        let distinct: BTreeSet<_> = settings.actors.iter().collect();
        if distinct.len() != players || !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
            return Err(DraftError::InvalidActors(players));
        }

        let DraftCollaborators {
            catalog,
            factions: registry,
            broadcast,
            turn_order,
            layout,
            turn_advance,
        } = collaborators;

        let slices: Vec<DraftSlice> = generated
            .slices
            .iter()
            .enumerate()
            .map(|(index, tiles)| DraftSlice {
                label: slice_label(index),
                tiles: tiles.clone(),
            })
            .collect();

        let pool_size = settings
            .faction_count
            .unwrap_or(players + 1)
            .max(players)
            .min(registry.len());
        let mut rng = match settings.seed {
            Some(seed) => SmallRng::seed_from_u64(seed ^ 0xfac7_10c5),
            None => SmallRng::from_entropy(),
        };
        let factions = registry.sample(pool_size, &mut rng);

        let mut arbiter = SelectionArbiter::new(settings.mode);
        if let Some(turns) = turn_advance {
            arbiter = arbiter.with_turn_advance(turns);
        }
        arbiter.register_category(SLICE_CATEGORY, slice_items(&slices));
        arbiter.register_category(FACTION_CATEGORY, faction_items(&factions));
        arbiter.register_category(
            SEAT_CATEGORY,
            (0..players)
                .map(|seat| (DraftItem::Seat(seat), seat_label(seat)))
                .collect(),
        );

        tracing::info!(
            target: DRAFT_TARGET,
            variant = %settings.variant,
            players,
            slices = slices.len(),
            factions = factions.len(),
            "draft.begin"
        );

        Ok(Self {
            policy: VariantPolicy::for_variant(settings.variant),
            settings,
            catalog,
            registry,
            broadcast,
            turn_order,
            layout,
            slices,
            ring: generated.ring.clone(),
            factions,
            arbiter,
            phase: DraftPhase::Selecting,
        })
    }

    pub fn settings(&self) -> &DraftSettings {
        &self.settings
    }

    pub fn phase(&self) -> DraftPhase {
        self.phase
    }

    pub fn slices(&self) -> &[DraftSlice] {
        &self.slices
    }

    pub fn ring(&self) -> &[TileId] {
        &self.ring
    }

    pub fn factions(&self) -> &[Faction] {
        &self.factions
    }

    pub fn arbiter(&self) -> &SelectionArbiter<DraftItem> {
        &self.arbiter
    }

    pub fn add_observer(&mut self, observer: Box<dyn SelectionObserver<DraftItem>>) {
        self.arbiter.add_observer(observer);
    }

    fn ensure_selecting(&self) -> Result<(), DraftError> {
        match self.phase {
            DraftPhase::Selecting => Ok(()),
            phase => Err(DraftError::NotActive(phase)),
        }
    }

    fn ensure_actor(&self, actor: ActorId) -> Result<(), DraftError> {
        if self.settings.actors.contains(&actor) {
            Ok(())
        } else {
            Err(DraftError::UnknownActor(actor))
        }
    }

    fn ensure_category(&self, category: &str) -> Result<(), DraftError> {
        match self.arbiter.category(category) {
            Some(_) => Ok(()),
            None => Err(DraftError::UnknownCategory(category.to_string())),
        }
    }

    pub fn claim(
        &mut self,
        actor: ActorId,
        category: &str,
        item: DraftItem,
    ) -> Result<ClaimOutcome<DraftItem>, DraftError> {
        self.ensure_selecting()?;
        self.ensure_actor(actor)?;
        self.ensure_category(category)?;
        Ok(self.arbiter.claim(category, actor, item)?)
    }

    pub fn release(
        &mut self,
        actor: ActorId,
        category: &str,
    ) -> Result<Option<DraftItem>, DraftError> {
        self.ensure_selecting()?;
        self.ensure_actor(actor)?;
        self.ensure_category(category)?;
        Ok(self.arbiter.release(category, actor))
    }

    /// Replace generated slices, labels or the faction pool with a user
    /// override. On rejection the message is broadcast and nothing changes.
    pub fn apply_custom_config(&mut self, text: &str) -> Result<(), DraftError> {
        self.ensure_selecting()?;
        let config = match parse_custom_config(text) {
            Ok(config) => config,
            Err(err) => {
                self.broadcast
                    .broadcast(DraftNotice::rejection(format!("custom configuration: {}", err)));
                return Err(err.into());
            }
        };
        for dropped in &config.dropped {
            self.broadcast.broadcast(DraftNotice::warning(format!(
                "ignored slice {} '{}': {}",
                dropped.position + 1,
                dropped.text,
                dropped.issue
            )));
        }

        let (slices, factions) = match self.validate_custom(&config) {
            Ok(validated) => validated,
            Err(rejection) => {
                tracing::info!(
                    target: DRAFT_TARGET,
                    reason = %rejection,
                    "draft.custom_config.rejected"
                );
                self.broadcast.broadcast(DraftNotice::rejection(format!(
                    "custom configuration: {}",
                    rejection
                )));
                return Err(rejection.into());
            }
        };

        if let Some(slices) = slices {
            self.arbiter
                .replace_items(SLICE_CATEGORY, slice_items(&slices));
            self.slices = slices;
        }
        if let Some(factions) = factions {
            self.arbiter
                .replace_items(FACTION_CATEGORY, faction_items(&factions));
            self.factions = factions;
        }

        tracing::info!(
            target: DRAFT_TARGET,
            slices = self.slices.len(),
            factions = self.factions.len(),
            "draft.custom_config.applied"
        );
        self.broadcast.broadcast(DraftNotice::info(format!(
            "custom configuration applied: {} slices, {} factions",
            self.slices.len(),
            self.factions.len()
        )));
        Ok(())
    }

    #[allow(clippy::type_complexity)]
    fn validate_custom(
        &self,
        config: &CustomConfig,
    ) -> Result<(Option<Vec<DraftSlice>>, Option<Vec<Faction>>), ConfigRejection> {
        let players = self.settings.player_count();

        let slices = if config.has_slices() {
            if config.slices.len() < players {
                return Err(ConfigRejection::TooFewSlices {
                    found: config.slices.len(),
                    players,
                });
            }
            let expected = self.policy.slice_len();
            let mut seen: BTreeSet<i32> = self
                .ring
                .iter()
                .filter(|id| !id.is_placeholder())
                .map(|id| id.0)
                .collect();
            for (index, slice) in config.slices.iter().enumerate() {
                if slice.len() != expected {
                    return Err(ConfigRejection::SliceLength {
                        index,
                        found: slice.len(),
                        expected,
                        variant: self.settings.variant,
                    });
                }
                for &id in slice {
                    if !self.catalog.contains(TileId(id)) {
                        return Err(ConfigRejection::UnknownTile(id));
                    }
                    if !seen.insert(id) {
                        return Err(ConfigRejection::DuplicateTile(id));
                    }
                }
            }
            Some(config.slices.as_slice())
        } else {
            None
        };

        let slice_total = slices.map_or(self.slices.len(), <[Vec<i32>]>::len);
        if !config.labels.is_empty() && config.labels.len() != slice_total {
            return Err(ConfigRejection::LabelCount {
                labels: config.labels.len(),
                slices: slice_total,
            });
        }

        let factions = if config.factions.is_empty() {
            None
        } else {
            let mut distinct = BTreeSet::new();
            let mut resolved = Vec::with_capacity(config.factions.len());
            for name in &config.factions {
                let faction = self
                    .registry
                    .resolve(name)
                    .ok_or_else(|| ConfigRejection::UnknownFaction(name.clone()))?;
                if !distinct.insert(faction.name.as_str()) {
                    return Err(ConfigRejection::DuplicateFaction(faction.name.clone()));
                }
                resolved.push(faction.clone());
            }
            if resolved.len() < players {
                return Err(ConfigRejection::TooFewFactions {
                    found: resolved.len(),
                    players,
                });
            }
            Some(resolved)
        };

        let label_for = |index: usize| {
            config
                .labels
                .get(index)
                .cloned()
                .unwrap_or_else(|| slice_label(index))
        };
        let new_slices = match slices {
            Some(slices) => Some(
                slices
                    .iter()
                    .enumerate()
                    .map(|(index, tiles)| DraftSlice {
                        label: label_for(index),
                        tiles: tiles.iter().copied().map(TileId).collect(),
                    })
                    .collect(),
            ),
            None if !config.labels.is_empty() => Some(
                self.slices
                    .iter()
                    .enumerate()
                    .map(|(index, slice)| DraftSlice {
                        label: label_for(index),
                        tiles: slice.tiles.clone(),
                    })
                    .collect(),
            ),
            None => None,
        };
        Ok((new_slices, factions))
    }

    /// Abandon the draft. Claims are cleared and no collaborator is called.
    pub fn cancel(&mut self) {
        if self.phase != DraftPhase::Selecting {
            return;
        }
        self.arbiter.reset();
        self.phase = DraftPhase::Cancelled;
        tracing::info!(target: DRAFT_TARGET, "draft.cancelled");
        self.broadcast.broadcast(DraftNotice::info("draft cancelled"));
    }

    /// Turn every actor's claims into seat assignments.
    ///
    /// Requires every actor to be ready and no item to be held by two actors.
    /// A refused commit broadcasts why and leaves the draft selecting.
    pub fn commit(&mut self) -> Result<DraftOutcome, DraftError> {
        self.ensure_selecting()?;
        match self.assemble_outcome() {
            Ok(outcome) => {
                self.turn_order.set_turn_order(&outcome.turn_order);
                self.layout.apply_layout(&outcome.map_tiles);
                self.phase = DraftPhase::Committed;
                tracing::info!(
                    target: DRAFT_TARGET,
                    seats = outcome.seats.len(),
                    tiles = outcome.map_tiles.len(),
                    "draft.committed"
                );
                let summary = outcome
                    .seats
                    .iter()
                    .map(|seat| {
                        format!(
                            "{}: actor {} as {} on slice {}",
                            seat_label(seat.seat),
                            seat.actor,
                            seat.faction.short_name,
                            seat.slice.label
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                self.broadcast
                    .broadcast(DraftNotice::info(format!("draft committed. {}", summary)));
                Ok(outcome)
            }
            Err(err) => {
                tracing::info!(target: DRAFT_TARGET, reason = %err, "draft.commit.rejected");
                self.broadcast
                    .broadcast(DraftNotice::rejection(format!("cannot commit: {}", err)));
                Err(err)
            }
        }
    }

    fn assemble_outcome(&self) -> Result<DraftOutcome, DraftError> {
        for &actor in &self.settings.actors {
            if !self.arbiter.ready_to_commit(actor) {
                return Err(DraftError::NotReady(actor));
            }
        }
        for category in self.arbiter.categories() {
            if let Some((item, holders)) = category.collisions().into_iter().next() {
                return Err(DraftError::Collision {
                    item,
                    first: holders[0],
                    second: holders[1],
                });
            }
        }

        let mut seats = Vec::with_capacity(self.settings.actors.len());
        for &actor in &self.settings.actors {
            let claim = |category: &str| {
                self.arbiter
                    .current_claim(category, actor)
                    .cloned()
                    .ok_or(DraftError::NotReady(actor))
            };
            let (DraftItem::Seat(seat), DraftItem::Slice(slice_index), DraftItem::Faction(name)) =
                (claim(SEAT_CATEGORY)?, claim(SLICE_CATEGORY)?, claim(FACTION_CATEGORY)?)
            else {
                panic!("draft categories hold items of the wrong kind");
            };
            let faction = self
                .factions
                .iter()
                .find(|faction| faction.name == name)
                .cloned()
                .unwrap_or_else(|| panic!("claimed faction {} is not in the pool", name));
            seats.push(SeatAssignment {
                seat,
                actor,
                faction,
                slice_index,
                slice: self.slices[slice_index].clone(),
            });
        }
        seats.sort_by_key(|assignment| assignment.seat);

        let turn_order = seats.iter().map(|assignment| assignment.actor).collect();
        let map_tiles = self
            .ring
            .iter()
            .copied()
            .chain(seats.iter().flat_map(|assignment| assignment.slice.tiles.iter().copied()))
            .collect();
        Ok(DraftOutcome {
            seats,
            turn_order,
            map_tiles,
        })
    }
}

fn slice_items(slices: &[DraftSlice]) -> Vec<(DraftItem, String)> {
    slices
        .iter()
        .enumerate()
        .map(|(index, slice)| (DraftItem::Slice(index), slice.label.clone()))
        .collect()
}

fn faction_items(factions: &[Faction]) -> Vec<(DraftItem, String)> {
    factions
        .iter()
        .map(|faction| (DraftItem::Faction(faction.name.clone()), faction.short_name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{ChannelBroadcast, NoticeLevel};
    use crate::slices::RepairReport;
    use crossbeam_channel::Receiver;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fixture_slices() -> GeneratedSlices {
        let slices: Vec<Vec<TileId>> = [
            [26, 41, 19, 47, 62],
            [27, 42, 20, 48, 63],
            [31, 43, 21, 49, 59],
            [34, 44, 22, 50, 60],
        ]
        .iter()
        .map(|slice| slice.iter().copied().map(TileId).collect())
        .collect();
        GeneratedSlices {
            variant: DraftVariant::Linear,
            player_count: 3,
            slices,
            ring: Vec::new(),
            reds_reserved: 8,
            attempts: 1,
            report: RepairReport::default(),
        }
    }

    fn actors() -> Vec<ActorId> {
        vec![ActorId(10), ActorId(20), ActorId(30)]
    }

    fn open_draft() -> (DraftOrchestrator, Receiver<DraftNotice>) {
        let (broadcast, notices) = ChannelBroadcast::channel();
        let collaborators = DraftCollaborators::new(
            TileCatalog::builtin(),
            FactionRegistry::builtin(),
            Box::new(broadcast),
        );
        let settings = DraftSettings::new(DraftVariant::Linear, actors()).with_seed(4);
        let draft =
            DraftOrchestrator::begin(settings, &fixture_slices(), collaborators).expect("begin");
        (draft, notices)
    }

    fn claim_all(draft: &mut DraftOrchestrator) {
        let factions: Vec<String> = draft.factions().iter().map(|f| f.name.clone()).collect();
        // Actor order is reversed against seat order to check seat sorting.
        for (index, actor) in actors().into_iter().enumerate() {
            draft
                .claim(actor, SEAT_CATEGORY, DraftItem::Seat(2 - index))
                .expect("seat");
            draft
                .claim(actor, SLICE_CATEGORY, DraftItem::Slice(index))
                .expect("slice");
            draft
                .claim(actor, FACTION_CATEGORY, DraftItem::Faction(factions[index].clone()))
                .expect("faction");
        }
    }

    #[test]
    fn begin_builds_three_categories() {
        let (draft, _) = open_draft();
        let names: Vec<_> = draft.arbiter().categories().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["slice", "faction", "seat"]);
        assert_eq!(draft.factions().len(), 4);
        let seat = draft.arbiter().category(SEAT_CATEGORY).expect("seat");
        assert_eq!(seat.label_of(&DraftItem::Seat(0)), Some("Seat 1 (Speaker)"));
    }

    #[test]
    fn commit_orders_seats_and_calls_collaborators() {
        let order: Rc<RefCell<Vec<ActorId>>> = Rc::default();
        let layout: Rc<RefCell<Vec<TileId>>> = Rc::default();
        let (broadcast, notices) = ChannelBroadcast::channel();
        let order_log = Rc::clone(&order);
        let layout_log = Rc::clone(&layout);
        let collaborators = DraftCollaborators::new(
            TileCatalog::builtin(),
            FactionRegistry::builtin(),
            Box::new(broadcast),
        )
        .with_turn_order(Box::new(move |actors: &[ActorId]| {
            order_log.borrow_mut().extend_from_slice(actors)
        }))
        .with_layout(Box::new(move |tiles: &[TileId]| {
            layout_log.borrow_mut().extend_from_slice(tiles)
        }));
        let settings = DraftSettings::new(DraftVariant::Linear, actors()).with_seed(4);
        let mut draft =
            DraftOrchestrator::begin(settings, &fixture_slices(), collaborators).expect("begin");
        claim_all(&mut draft);

        let outcome = draft.commit().expect("commit");
        assert_eq!(draft.phase(), DraftPhase::Committed);
        assert_eq!(
            outcome.turn_order,
            vec![ActorId(30), ActorId(20), ActorId(10)]
        );
        assert_eq!(*order.borrow(), outcome.turn_order);
        assert_eq!(layout.borrow().len(), 15);
        assert_eq!(layout.borrow()[0], TileId(31));
        assert_eq!(outcome.seats[0].slice.label, "C");
        let last = notices.try_iter().last().expect("summary");
        assert_eq!(last.level, NoticeLevel::Info);
        assert!(matches!(
            draft.claim(ActorId(10), SEAT_CATEGORY, DraftItem::Seat(0)),
            Err(DraftError::NotActive(DraftPhase::Committed))
        ));
    }

    #[test]
    fn commit_refuses_until_everyone_is_ready() {
        let (mut draft, notices) = open_draft();
        draft
            .claim(ActorId(10), SLICE_CATEGORY, DraftItem::Slice(0))
            .expect("claim");
        assert!(matches!(
            draft.commit(),
            Err(DraftError::NotReady(ActorId(10)))
        ));
        assert_eq!(draft.phase(), DraftPhase::Selecting);
        let notice = notices.try_iter().last().expect("rejection");
        assert_eq!(notice.level, NoticeLevel::Rejection);
    }

    #[test]
    fn commit_refuses_collisions() {
        let (mut draft, _) = open_draft();
        claim_all(&mut draft);
        draft
            .claim(ActorId(20), SLICE_CATEGORY, DraftItem::Slice(0))
            .expect("claim");
        match draft.commit() {
            Err(DraftError::Collision { item, first, second }) => {
                assert_eq!(item, DraftItem::Slice(0));
                assert_eq!((first, second), (ActorId(10), ActorId(20)));
            }
            other => panic!("expected collision, got {:?}", other),
        }
        draft
            .claim(ActorId(20), SLICE_CATEGORY, DraftItem::Slice(3))
            .expect("claim");
        assert!(draft.commit().is_ok());
    }

    #[test]
    fn unknown_actor_cannot_claim() {
        let (mut draft, _) = open_draft();
        assert!(matches!(
            draft.claim(ActorId(99), SLICE_CATEGORY, DraftItem::Slice(0)),
            Err(DraftError::UnknownActor(ActorId(99)))
        ));
    }

    #[test]
    fn unknown_category_is_rejected_before_the_arbiter() {
        let (mut draft, _) = open_draft();
        assert!(matches!(
            draft.claim(ActorId(10), "color", DraftItem::Seat(0)),
            Err(DraftError::UnknownCategory(name)) if name == "color"
        ));
        assert!(matches!(
            draft.release(ActorId(10), "color"),
            Err(DraftError::UnknownCategory(_))
        ));
    }

    #[test]
    fn custom_config_replaces_slices_and_factions() {
        let (mut draft, notices) = open_draft();
        draft
            .claim(ActorId(10), SLICE_CATEGORY, DraftItem::Slice(0))
            .expect("claim");
        draft
            .apply_custom_config(
                "19 20 21 22 23|24 25 26 27 28|29 30 31 32 33&labels=x|y|z&factions=Letnev|Hacan|The Arborec",
            )
            .expect("apply");
        assert_eq!(draft.slices().len(), 3);
        assert_eq!(draft.slices()[1].label, "y");
        assert_eq!(draft.factions()[0].name, "The Barony of Letnev");
        assert_eq!(draft.arbiter().current_claim(SLICE_CATEGORY, ActorId(10)), None);
        assert_eq!(
            notices.try_iter().last().map(|n| n.level),
            Some(NoticeLevel::Info)
        );
    }

    #[test]
    fn rejected_custom_config_leaves_draft_untouched() {
        let (mut draft, notices) = open_draft();
        draft
            .claim(ActorId(10), SLICE_CATEGORY, DraftItem::Slice(2))
            .expect("claim");
        let before = draft.slices().to_vec();

        let cases = [
            ("19 20 21 22 23|24 25 26 27 28", "too few slices"),
            ("19 20 21 22|24 25 26 27|29 30 31 32", "wrong length"),
            ("19 20 21 22 23|24 25 26 27 28|29 30 31 32 99", "unknown tile"),
            ("19 20 21 22 23|23 25 26 27 28|29 30 31 32 33", "duplicate tile"),
            ("factions=Letnev|Hacan|Nobody", "unknown faction"),
            ("factions=Letnev|The Barony of Letnev|Hacan", "duplicate faction"),
            ("labels=a|b", "label count"),
            ("slices=1 2 3 4&slices=5 6 7 8", "duplicate key"),
        ];
        for (text, case) in cases {
            assert!(draft.apply_custom_config(text).is_err(), "{}", case);
            let notice = notices.try_iter().last().expect(case);
            assert_eq!(notice.level, NoticeLevel::Rejection, "{}", case);
        }
        assert_eq!(draft.slices(), before.as_slice());
        assert_eq!(
            draft.arbiter().current_claim(SLICE_CATEGORY, ActorId(10)),
            Some(&DraftItem::Slice(2))
        );
    }

    #[test]
    fn short_and_full_name_of_one_faction_are_a_duplicate() {
        let (mut draft, _) = open_draft();
        let before = draft.factions().to_vec();
        match draft.apply_custom_config("factions=Letnev|The Barony of Letnev|Hacan") {
            Err(DraftError::Rejected(ConfigRejection::DuplicateFaction(name))) => {
                assert_eq!(name, "The Barony of Letnev")
            }
            other => panic!("expected duplicate faction, got {:?}", other),
        }
        assert_eq!(draft.factions(), before.as_slice());

        draft
            .apply_custom_config("factions=Letnev|Hacan|Arborec")
            .expect("distinct factions");
        assert_eq!(draft.factions().len(), 3);
    }

    #[test]
    fn dropped_slices_are_warned_about() {
        let (mut draft, notices) = open_draft();
        draft
            .apply_custom_config("19 20 21 22 23|24 x 26 27 28|29 30 31 32 33|34 35 36 37 38")
            .expect("apply");
        let levels: Vec<_> = notices.try_iter().map(|n| n.level).collect();
        assert_eq!(levels, vec![NoticeLevel::Warning, NoticeLevel::Info]);
        assert_eq!(draft.slices().len(), 3);
    }

    #[test]
    fn cancel_clears_claims_without_commit() {
        let (mut draft, _) = open_draft();
        claim_all(&mut draft);
        draft.cancel();
        assert_eq!(draft.phase(), DraftPhase::Cancelled);
        assert!(draft.arbiter().claims_by_actor(ActorId(10)).is_empty());
        assert!(matches!(
            draft.commit(),
            Err(DraftError::NotActive(DraftPhase::Cancelled))
        ));
    }
}
