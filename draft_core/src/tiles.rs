use std::{
    collections::BTreeMap,
    env, fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_TILE_CATALOG: &str = include_str!("data/tiles.json");

/// Identifier of a system tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub i32);

impl TileId {
    /// Sentinel for ring template slots left empty at lower player counts.
    pub const PLACEHOLDER: TileId = TileId(draft_schema::PLACEHOLDER_TILE);

    pub fn is_placeholder(self) -> bool {
        self == Self::PLACEHOLDER
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Draft tier of a tile. Blue tiers carry planets; red tiles are hazards,
/// wormholes and empty space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Red,
    Low,
    Med,
    High,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Red, Tier::Low, Tier::Med, Tier::High];
    pub const BLUE: [Tier; 3] = [Tier::Low, Tier::Med, Tier::High];

    pub fn index(self) -> usize {
        match self {
            Tier::Red => 0,
            Tier::Low => 1,
            Tier::Med => 2,
            Tier::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Red => "red",
            Tier::Low => "low",
            Tier::Med => "med",
            Tier::High => "high",
        }
    }

    pub fn is_blue(self) -> bool {
        self != Tier::Red
    }

    /// Next weaker blue tier.
    pub fn lower(self) -> Option<Tier> {
        match self {
            Tier::High => Some(Tier::Med),
            Tier::Med => Some(Tier::Low),
            Tier::Low | Tier::Red => None,
        }
    }

    /// Next stronger blue tier.
    pub fn higher(self) -> Option<Tier> {
        match self {
            Tier::Low => Some(Tier::Med),
            Tier::Med => Some(Tier::High),
            Tier::High | Tier::Red => None,
        }
    }

    /// Order in which blue pools are drained for a slot of this tier: the tier
    /// itself, then each weaker tier, then each stronger tier.
    pub fn fallback_order(self) -> Vec<Tier> {
        let mut order = vec![self];
        let mut cursor = self.lower();
        while let Some(tier) = cursor {
            order.push(tier);
            cursor = tier.lower();
        }
        let mut cursor = self.higher();
        while let Some(tier) = cursor {
            order.push(tier);
            cursor = tier.higher();
        }
        order
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TileFeatures: u8 {
        const ALPHA = 0b0001;
        const BETA = 0b0010;
        const LEGENDARY = 0b0100;
        const ANOMALY = 0b1000;
    }
}

impl TileFeatures {
    pub const WORMHOLES: TileFeatures = TileFeatures::ALPHA.union(TileFeatures::BETA);
    /// Features that make a tile worth protecting from promotion swaps and repair.
    pub const NOTABLE: TileFeatures = TileFeatures::WORMHOLES.union(TileFeatures::LEGENDARY);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wormhole {
    Alpha,
    Beta,
}

impl Wormhole {
    pub fn feature(self) -> TileFeatures {
        match self {
            Wormhole::Alpha => TileFeatures::ALPHA,
            Wormhole::Beta => TileFeatures::BETA,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanetTrait {
    Cultural,
    Hazardous,
    Industrial,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechSpecialty {
    Biotic,
    Cybernetic,
    Propulsion,
    Warfare,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    pub name: String,
    pub resources: u8,
    pub influence: u8,
    #[serde(default, rename = "trait")]
    pub planet_trait: Option<PlanetTrait>,
    #[serde(default)]
    pub tech: Option<TechSpecialty>,
    #[serde(default)]
    pub legendary: bool,
}

impl Planet {
    /// Value the planet contributes when spent on whichever stat it is better
    /// at. Planets with equal values split evenly.
    pub fn optimal(&self) -> OptimalValue {
        let resources = self.resources as f32;
        let influence = self.influence as f32;
        if resources > influence {
            OptimalValue::new(resources, 0.0)
        } else if influence > resources {
            OptimalValue::new(0.0, influence)
        } else {
            OptimalValue::new(resources / 2.0, influence / 2.0)
        }
    }
}

/// Optimal resource/influence pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct OptimalValue {
    pub resources: f32,
    pub influence: f32,
}

impl OptimalValue {
    pub const fn new(resources: f32, influence: f32) -> Self {
        Self {
            resources,
            influence,
        }
    }

    pub fn total(&self) -> f32 {
        self.resources + self.influence
    }
}

impl std::ops::Add for OptimalValue {
    type Output = OptimalValue;

    fn add(self, rhs: OptimalValue) -> OptimalValue {
        OptimalValue::new(self.resources + rhs.resources, self.influence + rhs.influence)
    }
}

impl std::ops::AddAssign for OptimalValue {
    fn add_assign(&mut self, rhs: OptimalValue) {
        self.resources += rhs.resources;
        self.influence += rhs.influence;
    }
}

impl std::iter::Sum for OptimalValue {
    fn sum<I: Iterator<Item = OptimalValue>>(iter: I) -> Self {
        iter.fold(OptimalValue::default(), |acc, value| acc + value)
    }
}

/// Immutable attributes of one system tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub name: String,
    pub tier: Tier,
    pub features: TileFeatures,
    pub planets: Vec<Planet>,
    optimal: OptimalValue,
}

impl Tile {
    pub fn resources(&self) -> u32 {
        self.planets.iter().map(|p| p.resources as u32).sum()
    }

    pub fn influence(&self) -> u32 {
        self.planets.iter().map(|p| p.influence as u32).sum()
    }

    pub fn optimal(&self) -> OptimalValue {
        self.optimal
    }

    pub fn has_planets(&self) -> bool {
        !self.planets.is_empty()
    }

    pub fn is_anomaly(&self) -> bool {
        self.features.contains(TileFeatures::ANOMALY)
    }

    pub fn is_legendary(&self) -> bool {
        self.features.contains(TileFeatures::LEGENDARY)
    }

    pub fn wormholes(&self) -> TileFeatures {
        self.features & TileFeatures::WORMHOLES
    }

    /// Carries a wormhole or a legendary planet.
    pub fn is_notable(&self) -> bool {
        self.features.intersects(TileFeatures::NOTABLE)
    }

    /// Red tile that still brings a planet to its slice.
    pub fn is_rich_red(&self) -> bool {
        self.tier == Tier::Red && self.has_planets()
    }

    pub fn traits(&self) -> impl Iterator<Item = PlanetTrait> + '_ {
        self.planets.iter().filter_map(|p| p.planet_trait)
    }

    pub fn techs(&self) -> impl Iterator<Item = TechSpecialty> + '_ {
        self.planets.iter().filter_map(|p| p.tech)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TileRecord {
    id: i32,
    name: String,
    tier: Tier,
    #[serde(default)]
    wormholes: Vec<Wormhole>,
    #[serde(default)]
    anomaly: bool,
    #[serde(default)]
    planets: Vec<Planet>,
}

impl TileRecord {
    fn into_tile(self) -> Tile {
        let mut features = TileFeatures::empty();
        for wormhole in &self.wormholes {
            features |= wormhole.feature();
        }
        if self.anomaly {
            features |= TileFeatures::ANOMALY;
        }
        if self.planets.iter().any(|p| p.legendary) {
            features |= TileFeatures::LEGENDARY;
        }
        let optimal = self.planets.iter().map(Planet::optimal).sum();
        Tile {
            id: TileId(self.id),
            name: self.name,
            tier: self.tier,
            features,
            planets: self.planets,
            optimal,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TileCatalogFile {
    tiles: Vec<TileRecord>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse tile catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read tile catalog from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("tile {0} listed more than once")]
    DuplicateTile(TileId),
    #[error("tile catalog contains no tiles")]
    Empty,
}

/// Read-only lookup from tile identifier to tile attributes.
///
/// Lookups of identifiers the catalog does not know are programmer errors and
/// panic; use [`TileCatalog::get`] when the identifier comes from user input.
#[derive(Debug, Clone)]
pub struct TileCatalog {
    by_id: BTreeMap<TileId, Tile>,
    by_tier: [Vec<TileId>; 4],
}

impl TileCatalog {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            TileCatalog::from_json_str(BUILTIN_TILE_CATALOG)
                .expect("builtin tile catalog should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let parsed: TileCatalogFile = serde_json::from_str(json)?;
        Self::from_tiles(parsed.tiles.into_iter().map(TileRecord::into_tile))
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        TileCatalog::from_json_str(&contents)
    }

    fn from_tiles(tiles: impl IntoIterator<Item = Tile>) -> Result<Self, CatalogError> {
        let mut by_id = BTreeMap::new();
        let mut by_tier: [Vec<TileId>; 4] = Default::default();
        for tile in tiles {
            let id = tile.id;
            by_tier[tile.tier.index()].push(id);
            if by_id.insert(id, tile).is_some() {
                return Err(CatalogError::DuplicateTile(id));
            }
        }
        if by_id.is_empty() {
            return Err(CatalogError::Empty);
        }
        for ids in by_tier.iter_mut() {
            ids.sort();
        }
        Ok(Self { by_id, by_tier })
    }

    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.by_id.get(&id)
    }

    pub fn contains(&self, id: TileId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Attributes of a known tile.
    ///
    /// # Panics
    /// If `id` is not in the catalog.
    pub fn tile(&self, id: TileId) -> &Tile {
        match self.by_id.get(&id) {
            Some(tile) => tile,
            None => panic!("tile {} is not in the catalog", id),
        }
    }

    pub fn tier_of(&self, id: TileId) -> Tier {
        self.tile(id).tier
    }

    pub fn all_tiles_of_tier(&self, tier: Tier) -> &[TileId] {
        &self.by_tier[tier.index()]
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tile> {
        self.by_id.values()
    }

    /// Summed optimal value of a group of tiles, skipping placeholders.
    pub fn optimal_of(&self, ids: &[TileId]) -> OptimalValue {
        ids.iter()
            .filter(|id| !id.is_placeholder())
            .map(|id| self.tile(*id).optimal())
            .sum()
    }
}

pub fn load_tile_catalog_from_env() -> Arc<TileCatalog> {
    if let Some(path) = env::var("TILE_CATALOG_PATH").ok().map(PathBuf::from) {
        match TileCatalog::from_file(&path) {
            Ok(catalog) => {
                tracing::info!(
                    target: "slice_draft::catalog",
                    path = %path.display(),
                    tiles = catalog.len(),
                    "tile_catalog.loaded=file"
                );
                return Arc::new(catalog);
            }
            Err(err) => {
                tracing::warn!(
                    target: "slice_draft::catalog",
                    path = %path.display(),
                    error = %err,
                    "tile_catalog.load_failed"
                );
            }
        }
    }

    let catalog = TileCatalog::builtin();
    tracing::info!(
        target: "slice_draft::catalog",
        tiles = catalog.len(),
        "tile_catalog.loaded=builtin"
    );
    catalog
}
