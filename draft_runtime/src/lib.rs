//! Shared runtime utilities for the slice draft.
//!
//! This crate re-exports the data contracts from `draft_schema` and hosts the
//! helpers that operate on user-supplied text (the custom configuration
//! mini-language) without depending on the tile catalog or the generator in
//! `draft_core`.

pub use draft_schema::*;

pub mod custom_config;

pub use custom_config::{
    parse_custom_config, CustomConfig, CustomConfigError, DroppedSlice, SliceParseIssue,
    MAX_SLICE_TOKENS, MIN_SLICE_TOKENS,
};
