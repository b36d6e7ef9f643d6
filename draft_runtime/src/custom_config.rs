use std::fmt;
use std::num::ParseIntError;

use serde::Serialize;
use thiserror::Error;

/// Fewest tile identifiers a single slice may list.
pub const MIN_SLICE_TOKENS: usize = 4;
/// Most tile identifiers a single slice may list.
pub const MAX_SLICE_TOKENS: usize = 5;

const LABELS_KEY: &str = "labels";
const FACTIONS_KEY: &str = "factions";
const SLICES_KEY: &str = "slices";

/// Structural errors that reject the whole configuration string.
///
/// Problems inside a single slice never surface here; the slice is dropped
/// and recorded in [`CustomConfig::dropped`] instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustomConfigError {
    #[error("empty custom configuration")]
    Empty,
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("key '{0}' given more than once")]
    DuplicateKey(String),
    #[error("segment '{0}' has no key; only the leading segment may be unkeyed")]
    UnkeyedSegment(String),
}

/// Reason a slice was dropped during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SliceParseIssue {
    TokenCount(usize),
    NotANumber { token: String, reason: String },
    NotPositive(i32),
}

impl fmt::Display for SliceParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceParseIssue::TokenCount(count) => write!(
                f,
                "expected {}-{} tile ids, found {}",
                MIN_SLICE_TOKENS, MAX_SLICE_TOKENS, count
            ),
            SliceParseIssue::NotANumber { token, reason } => {
                write!(f, "'{}' is not a tile id: {}", token, reason)
            }
            SliceParseIssue::NotPositive(value) => write!(f, "tile id {} is not positive", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedSlice {
    /// Position of the slice inside its slice-set, counting dropped ones.
    pub position: usize,
    pub text: String,
    pub issue: SliceParseIssue,
}

/// Parsed custom configuration: a user override of generated output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomConfig {
    pub slices: Vec<Vec<i32>>,
    pub labels: Vec<String>,
    pub factions: Vec<String>,
    pub dropped: Vec<DroppedSlice>,
}

impl CustomConfig {
    pub fn has_slices(&self) -> bool {
        !self.slices.is_empty()
    }
}

/// Parse the `&`-delimited custom configuration mini-language.
///
/// ```text
/// <slice-set>&labels=a|b|c&factions=Name|Name&slices=<slice-set>
/// ```
///
/// The leading segment may be an unkeyed slice-set. Keys are case-sensitive.
pub fn parse_custom_config(input: &str) -> Result<CustomConfig, CustomConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CustomConfigError::Empty);
    }

    let mut config = CustomConfig::default();
    let mut slices_seen = false;
    let mut labels_seen = false;
    let mut factions_seen = false;

    for (index, segment) in trimmed.split('&').enumerate() {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((key, value)) = segment.split_once('=') else {
            if index != 0 {
                return Err(CustomConfigError::UnkeyedSegment(segment.to_string()));
            }
            parse_slice_set(segment, &mut config);
            slices_seen = true;
            continue;
        };

        match key.trim() {
            SLICES_KEY => {
                mark_seen(&mut slices_seen, SLICES_KEY)?;
                parse_slice_set(value, &mut config);
            }
            LABELS_KEY => {
                mark_seen(&mut labels_seen, LABELS_KEY)?;
                config.labels = split_names(value);
            }
            FACTIONS_KEY => {
                mark_seen(&mut factions_seen, FACTIONS_KEY)?;
                config.factions = split_names(value);
            }
            other => return Err(CustomConfigError::UnknownKey(other.to_string())),
        }
    }

    Ok(config)
}

fn mark_seen(seen: &mut bool, key: &str) -> Result<(), CustomConfigError> {
    if *seen {
        return Err(CustomConfigError::DuplicateKey(key.to_string()));
    }
    *seen = true;
    Ok(())
}

fn split_names(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_slice_set(value: &str, config: &mut CustomConfig) {
    for (position, text) in value.split('|').enumerate() {
        match parse_slice(text) {
            Ok(tiles) => config.slices.push(tiles),
            Err(issue) => config.dropped.push(DroppedSlice {
                position,
                text: text.trim().to_string(),
                issue,
            }),
        }
    }
}

fn parse_slice(text: &str) -> Result<Vec<i32>, SliceParseIssue> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if !(MIN_SLICE_TOKENS..=MAX_SLICE_TOKENS).contains(&tokens.len()) {
        return Err(SliceParseIssue::TokenCount(tokens.len()));
    }
    tokens.into_iter().map(parse_tile).collect()
}

fn parse_tile(token: &str) -> Result<i32, SliceParseIssue> {
    let value = token
        .parse::<i32>()
        .map_err(|source: ParseIntError| SliceParseIssue::NotANumber {
            token: token.to_string(),
            reason: source.to_string(),
        })?;
    if value <= 0 {
        return Err(SliceParseIssue::NotPositive(value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_slices_and_labels() {
        let config = parse_custom_config("1 2 3 4 5|6 7 8 9 10&labels=a|b").expect("parse");
        assert_eq!(config.slices, vec![vec![1, 2, 3, 4, 5], vec![6, 7, 8, 9, 10]]);
        assert_eq!(config.labels, vec!["a".to_string(), "b".to_string()]);
        assert!(config.factions.is_empty());
        assert!(config.dropped.is_empty());
    }

    #[test]
    fn keyed_slices_and_factions() {
        let config = parse_custom_config(
            "factions=The Arborec|The Emirates of Hacan&slices=25 26 27 28|29 30 31 32",
        )
        .expect("parse");
        assert_eq!(config.slices.len(), 2);
        assert_eq!(config.slices[1], vec![29, 30, 31, 32]);
        assert_eq!(
            config.factions,
            vec!["The Arborec".to_string(), "The Emirates of Hacan".to_string()]
        );
    }

    #[test]
    fn malformed_slice_is_dropped_not_fatal() {
        let config = parse_custom_config("1 2 3 4 5|6 7 x 9 10|11 12 13|14 15 16 17").expect("parse");
        assert_eq!(config.slices, vec![vec![1, 2, 3, 4, 5], vec![14, 15, 16, 17]]);
        assert_eq!(config.dropped.len(), 2);
        assert_eq!(config.dropped[0].position, 1);
        assert!(matches!(
            config.dropped[0].issue,
            SliceParseIssue::NotANumber { ref token, .. } if token == "x"
        ));
        assert_eq!(config.dropped[1].issue, SliceParseIssue::TokenCount(3));
    }

    #[test]
    fn negative_tile_ids_are_dropped() {
        let config = parse_custom_config("1 2 3 -4").expect("parse");
        assert!(config.slices.is_empty());
        assert_eq!(config.dropped[0].issue, SliceParseIssue::NotPositive(-4));
    }

    #[test]
    fn keys_are_case_sensitive() {
        let err = parse_custom_config("1 2 3 4&Labels=a").expect_err("unknown key");
        assert_eq!(err, CustomConfigError::UnknownKey("Labels".to_string()));
    }

    #[test]
    fn only_leading_segment_may_be_unkeyed() {
        let err = parse_custom_config("labels=a&1 2 3 4").expect_err("unkeyed");
        assert_eq!(err, CustomConfigError::UnkeyedSegment("1 2 3 4".to_string()));
    }

    #[test]
    fn leading_slices_conflict_with_slices_key() {
        let err = parse_custom_config("1 2 3 4&slices=5 6 7 8").expect_err("duplicate");
        assert_eq!(err, CustomConfigError::DuplicateKey("slices".to_string()));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse_custom_config("   "), Err(CustomConfigError::Empty));
    }
}
