use std::{fmt, ops::RangeInclusive, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sampler::WeightedOption;
use crate::tiles::Tier;

use crate::tiles::Tier::{High as H, Low as L, Med as M, Red};

pub const MIN_PLAYERS: usize = 3;
pub const MAX_PLAYERS: usize = 8;

/// Generator variant. All variants share one pipeline; they differ only in the
/// tables carried by their [`VariantPolicy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftVariant {
    /// Five-tile slices, no shared ring.
    Linear,
    /// Four-tile slices plus one equidistant ring tile per player.
    Equidistant,
    /// Four-tile slices wrapped around a home bunker plus a shared ring.
    Bunker,
}

impl DraftVariant {
    pub const ALL: [DraftVariant; 3] = [
        DraftVariant::Linear,
        DraftVariant::Equidistant,
        DraftVariant::Bunker,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DraftVariant::Linear => "linear",
            DraftVariant::Equidistant => "equidistant",
            DraftVariant::Bunker => "bunker",
        }
    }
}

impl fmt::Display for DraftVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown draft variant '{0}'")]
pub struct UnknownVariant(pub String);

impl FromStr for DraftVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "milty" => Ok(DraftVariant::Linear),
            "equidistant" | "eq" => Ok(DraftVariant::Equidistant),
            "bunker" => Ok(DraftVariant::Bunker),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingRule {
    None,
    OnePerPlayer,
}

type TierCombos = Vec<WeightedOption<Vec<Tier>>>;

/// Tuning tables for one variant.
#[derive(Debug, Clone)]
pub struct VariantPolicy {
    variant: DraftVariant,
    slice_len: usize,
    ring: RingRule,
    max_slices: usize,
    extra_default_slices: usize,
    red_counts: Vec<WeightedOption<usize>>,
    blue_combos: Vec<(usize, TierCombos)>,
    /// Ring draws use `ring_open` while the ring holds fewer reds than
    /// `ring_len / ring_red_divisor`, `ring_capped` afterwards.
    ring_open: Vec<WeightedOption<Tier>>,
    ring_capped: Vec<WeightedOption<Tier>>,
    ring_red_divisor: usize,
    adjacency: Vec<(usize, usize)>,
    repairs_weak_slices: bool,
    checks_balance: bool,
}

fn combo(weight: f64, tiers: &[Tier]) -> WeightedOption<Vec<Tier>> {
    WeightedOption::new(weight, tiers.to_vec())
}

impl VariantPolicy {
    pub fn for_variant(variant: DraftVariant) -> Self {
        match variant {
            DraftVariant::Linear => Self::linear(),
            DraftVariant::Equidistant => Self::equidistant(),
            DraftVariant::Bunker => Self::bunker(),
        }
    }

    fn linear() -> Self {
        Self {
            variant: DraftVariant::Linear,
            slice_len: 5,
            ring: RingRule::None,
            max_slices: 9,
            extra_default_slices: 1,
            red_counts: vec![
                WeightedOption::new(8.0, 2),
                WeightedOption::new(1.0, 1),
                WeightedOption::new(1.0, 3),
            ],
            blue_combos: vec![
                (
                    1,
                    vec![
                        combo(3.0, &[M, M, L, L]),
                        combo(2.0, &[H, M, L, L]),
                        combo(1.0, &[H, L, L, L]),
                        combo(1.0, &[M, M, M, L]),
                    ],
                ),
                (
                    2,
                    vec![
                        combo(6.0, &[H, M, L]),
                        combo(2.0, &[M, M, M]),
                        combo(1.0, &[H, M, M]),
                        combo(1.0, &[H, H, L]),
                        combo(1.0, &[M, M, L]),
                    ],
                ),
                (
                    3,
                    vec![
                        combo(3.0, &[H, M]),
                        combo(2.0, &[M, M]),
                        combo(1.0, &[H, H]),
                    ],
                ),
            ],
            ring_open: Vec::new(),
            ring_capped: Vec::new(),
            ring_red_divisor: 1,
            // 0 left, 1 front, 2 right, 3 front-left, 4 far front
            adjacency: vec![(0, 1), (1, 2), (0, 3), (1, 3), (1, 4), (2, 4), (3, 4)],
            repairs_weak_slices: false,
            checks_balance: true,
        }
    }

    fn equidistant() -> Self {
        Self {
            variant: DraftVariant::Equidistant,
            slice_len: 4,
            ring: RingRule::OnePerPlayer,
            max_slices: 9,
            extra_default_slices: 0,
            red_counts: vec![WeightedOption::new(3.0, 2), WeightedOption::new(2.0, 1)],
            blue_combos: vec![
                (
                    1,
                    vec![
                        combo(4.0, &[H, M, L]),
                        combo(3.0, &[M, M, L]),
                        combo(2.0, &[H, L, L]),
                        combo(1.0, &[M, M, M]),
                    ],
                ),
                (
                    2,
                    vec![
                        combo(4.0, &[H, M]),
                        combo(3.0, &[M, M]),
                        combo(2.0, &[H, L]),
                        combo(1.0, &[H, H]),
                    ],
                ),
            ],
            ring_open: vec![
                WeightedOption::new(2.0, Red),
                WeightedOption::new(2.0, L),
                WeightedOption::new(2.0, M),
                WeightedOption::new(1.0, H),
            ],
            ring_capped: vec![
                WeightedOption::new(2.0, L),
                WeightedOption::new(3.0, M),
                WeightedOption::new(2.0, H),
            ],
            ring_red_divisor: 3,
            // 0 left, 1 front, 2 right, 3 far front
            adjacency: vec![(0, 1), (1, 2), (1, 3)],
            repairs_weak_slices: true,
            checks_balance: false,
        }
    }

    fn bunker() -> Self {
        Self {
            variant: DraftVariant::Bunker,
            slice_len: 4,
            ring: RingRule::OnePerPlayer,
            max_slices: 8,
            extra_default_slices: 0,
            red_counts: vec![WeightedOption::new(4.0, 2), WeightedOption::new(1.0, 1)],
            blue_combos: vec![
                (
                    1,
                    vec![
                        combo(3.0, &[M, M, L]),
                        combo(2.0, &[H, L, L]),
                        combo(2.0, &[H, M, L]),
                    ],
                ),
                (
                    2,
                    vec![
                        combo(3.0, &[H, M]),
                        combo(3.0, &[M, M]),
                        combo(2.0, &[H, L]),
                        combo(1.0, &[H, H]),
                    ],
                ),
            ],
            ring_open: vec![
                WeightedOption::new(3.0, Red),
                WeightedOption::new(2.0, L),
                WeightedOption::new(1.0, M),
            ],
            ring_capped: vec![
                WeightedOption::new(2.0, L),
                WeightedOption::new(2.0, M),
                WeightedOption::new(1.0, H),
            ],
            ring_red_divisor: 2,
            // bunker wraps the home: 0 and 3 flank it, 1 and 2 sit in front
            adjacency: vec![(0, 1), (1, 2), (2, 3)],
            repairs_weak_slices: false,
            checks_balance: false,
        }
    }

    pub fn variant(&self) -> DraftVariant {
        self.variant
    }

    pub fn slice_len(&self) -> usize {
        self.slice_len
    }

    pub fn ring_len(&self, player_count: usize) -> usize {
        match self.ring {
            RingRule::None => 0,
            RingRule::OnePerPlayer => player_count,
        }
    }

    pub fn default_slice_count(&self, player_count: usize) -> usize {
        (player_count + self.extra_default_slices).min(self.max_slices)
    }

    pub fn slice_bounds(&self, player_count: usize) -> RangeInclusive<usize> {
        player_count..=self.max_slices
    }

    pub fn red_counts(&self) -> &[WeightedOption<usize>] {
        &self.red_counts
    }

    /// Blue tier combinations for a slice that already holds `red_count` reds.
    ///
    /// # Panics
    /// If the policy has no table for `red_count`.
    pub fn blue_combos(&self, red_count: usize) -> &[WeightedOption<Vec<Tier>>] {
        self.blue_combos
            .iter()
            .find(|(reds, _)| *reds == red_count)
            .map(|(_, combos)| combos.as_slice())
            .unwrap_or_else(|| {
                panic!(
                    "{} policy has no blue tiers for {} reds",
                    self.variant, red_count
                )
            })
    }

    pub fn ring_tiers(&self, reds_so_far: usize, ring_len: usize) -> &[WeightedOption<Tier>] {
        if reds_so_far < ring_len / self.ring_red_divisor.max(1) {
            &self.ring_open
        } else {
            &self.ring_capped
        }
    }

    pub fn adjacency(&self) -> &[(usize, usize)] {
        &self.adjacency
    }

    pub fn repairs_weak_slices(&self) -> bool {
        self.repairs_weak_slices
    }

    pub fn checks_balance(&self) -> bool {
        self.checks_balance
    }
}

/// Adjacency of a ring treated as a closed cycle.
pub fn ring_adjacency(len: usize) -> Vec<(usize, usize)> {
    match len {
        0 | 1 => Vec::new(),
        2 => vec![(0, 1)],
        n => (0..n).map(|i| (i, (i + 1) % n)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combos_fill_every_slice_exactly() {
        for variant in DraftVariant::ALL {
            let policy = VariantPolicy::for_variant(variant);
            for red in policy.red_counts() {
                for combo in policy.blue_combos(red.value) {
                    assert_eq!(
                        red.value + combo.value.len(),
                        policy.slice_len(),
                        "{} combo {:?} with {} reds",
                        variant,
                        combo.value,
                        red.value
                    );
                    assert!(combo.value.iter().all(|tier| tier.is_blue()));
                }
            }
        }
    }

    #[test]
    fn adjacency_stays_inside_slice() {
        for variant in DraftVariant::ALL {
            let policy = VariantPolicy::for_variant(variant);
            for &(a, b) in policy.adjacency() {
                assert!(a < policy.slice_len() && b < policy.slice_len() && a != b);
            }
        }
    }

    #[test]
    fn linear_defaults_to_one_extra_slice() {
        let policy = VariantPolicy::for_variant(DraftVariant::Linear);
        assert_eq!(policy.default_slice_count(6), 7);
        assert_eq!(policy.default_slice_count(8), 9);
        assert_eq!(policy.ring_len(6), 0);
        let eq = VariantPolicy::for_variant(DraftVariant::Equidistant);
        assert_eq!(eq.default_slice_count(6), 6);
        assert_eq!(eq.ring_len(6), 6);
    }

    #[test]
    fn two_red_slices_prefer_mixed_blues() {
        let policy = VariantPolicy::for_variant(DraftVariant::Equidistant);
        let combos = policy.blue_combos(2);
        let weight_of = |tiers: &[Tier]| {
            combos
                .iter()
                .find(|c| c.value == tiers)
                .map(|c| c.weight)
                .unwrap_or(0.0)
        };
        assert!(weight_of(&[H, M]) > weight_of(&[H, H]));
        assert!(weight_of(&[M, M]) > weight_of(&[H, H]));
    }

    #[test]
    fn ring_adjacency_is_a_cycle() {
        assert_eq!(ring_adjacency(4), vec![(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert_eq!(ring_adjacency(2), vec![(0, 1)]);
        assert!(ring_adjacency(1).is_empty());
    }

    #[test]
    fn variant_names_parse() {
        assert_eq!("Linear".parse::<DraftVariant>(), Ok(DraftVariant::Linear));
        assert_eq!("eq".parse::<DraftVariant>(), Ok(DraftVariant::Equidistant));
        assert!("hex".parse::<DraftVariant>().is_err());
    }
}
