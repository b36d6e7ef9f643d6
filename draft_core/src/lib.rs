//! Core crate of the slice draft.
//!
//! Generates balanced tile slices for a galaxy-building draft and arbitrates
//! the claims players make on slices, factions and seats until the draft is
//! committed. Catalogs and configuration are injected as shared read-only
//! values; nothing here reads global state except the `*_from_env` loaders.

pub mod draft;
pub mod factions;
pub mod generator_config;
mod hashing;
pub mod notify;
pub mod sampler;
pub mod selection;
pub mod slices;
pub mod tiles;

pub use draft::{
    seat_label, ConfigRejection, DraftCollaborators, DraftError, DraftItem, DraftOrchestrator,
    DraftOutcome, DraftPhase, DraftSettings, DraftSlice, MapLayoutApplier, SeatAssignment,
    TurnOrderSink, FACTION_CATEGORY, SEAT_CATEGORY, SLICE_CATEGORY,
};
pub use factions::{
    load_faction_registry_from_env, Faction, FactionRegistry, FactionRegistryError,
};
pub use generator_config::{load_generator_config_from_env, GeneratorConfig, GeneratorConfigError};
pub use hashing::{seed_from_label, FnvHasher};
pub use notify::{
    Broadcast, ChannelBroadcast, DraftNotice, LogBroadcast, NoticeLevel, NoticeReceiver,
};
pub use sampler::{choose, choose_index, WeightedOption};
pub use selection::{
    ActorId, ClaimMode, ClaimOutcome, DraftState, SelectionArbiter, SelectionCategory,
    SelectionChange, SelectionError, SelectionObserver, TurnAdvance,
};
pub use slices::{
    slice_label, AttemptRejection, DraftVariant, GeneratedSlices, GenerationError,
    GenerationRequest, RepairReport, RequestIssue, SimpleSlices, SliceGenerator, SliceSummary,
    UnknownVariant, VariantPolicy, MAX_PLAYERS, MIN_PLAYERS,
};
pub use tiles::{
    load_tile_catalog_from_env, CatalogError, OptimalValue, Tier, Tile, TileCatalog,
    TileFeatures, TileId,
};
