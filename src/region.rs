//! World regions: the per-cell record of topography, hydrology and weather.

use serde::{Deserialize, Serialize};

use crate::grid::RegionPos;

/// Maximum number of rivers a single region can carry.
pub const MAX_RIVERS_PER_REGION: usize = 4;

/// Seasons per year.
pub const N_SEASONS: usize = 4;

// ===== HEIGHT SCALE =====

/// Reference heights (blocks). Region heights are sampled onto this scale.
pub mod heights {
    pub const OCEAN_DEPTHS: f32 = 1500.0;
    pub const CONTINENTAL_SHELF: f32 = 14750.0;
    pub const SEA_LEVEL: f32 = 15000.0;
    pub const COASTAL_PLAINS: f32 = 15150.0;
    pub const HIGHLANDS: f32 = 16500.0;
    pub const MOUNTAIN_BASES: f32 = 18500.0;
    pub const MOUNTAIN_TOPS: f32 = 27000.0;
}

// ===== IDS =====

/// Index of a body of water in the world's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyOfWaterId(pub u32);

/// Index of a river in the world's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RiverId(pub u32);

// ===== HYDROLOGY =====

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HydroState {
    #[default]
    Land,
    Ocean,
    Lake,
    OceanShore,
    LakeShore,
}

impl HydroState {
    pub fn is_water(&self) -> bool {
        !matches!(self, HydroState::Land)
    }

    pub fn is_shore(&self) -> bool {
        matches!(self, HydroState::OceanShore | HydroState::LakeShore)
    }
}

/// Salinity classes, ordered from fresh to briny.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Salinity {
    #[default]
    Fresh,
    Brackish,
    Saline,
    Briny,
}

impl Salinity {
    /// The next class toward fresh water; fresh stays fresh.
    pub fn one_class_lower(&self) -> Salinity {
        match self {
            Salinity::Fresh | Salinity::Brackish => Salinity::Fresh,
            Salinity::Saline => Salinity::Brackish,
            Salinity::Briny => Salinity::Saline,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hydrology {
    pub state: HydroState,
    pub body: Option<BodyOfWaterId>,
    pub water_table: f32,
    pub salinity: Salinity,
    pub rivers: [Option<RiverId>; MAX_RIVERS_PER_REGION],
}

impl Hydrology {
    pub fn river_count(&self) -> usize {
        self.rivers.iter().filter(|r| r.is_some()).count()
    }

    pub fn has_river(&self, id: RiverId) -> bool {
        self.rivers.contains(&Some(id))
    }

    /// Register a river in the first free slot. Returns false when full.
    pub fn add_river(&mut self, id: RiverId) -> bool {
        if self.has_river(id) {
            return true;
        }
        match self.rivers.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(id);
                true
            }
            None => false,
        }
    }

    pub fn remove_river(&mut self, id: RiverId) {
        for slot in self.rivers.iter_mut() {
            if *slot == Some(id) {
                *slot = None;
            }
        }
    }
}

// ===== TOPOGRAPHY =====

/// A height together with its local gradient (per region).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeightSample {
    pub z: f32,
    pub dx: f32,
    pub dy: f32,
}

impl HeightSample {
    pub fn slope(&self) -> f32 {
        (self.dx * self.dx + self.dy * self.dy).sqrt()
    }

    /// Direction of steepest ascent, in radians.
    pub fn uphill(&self) -> f32 {
        self.dy.atan2(self.dx)
    }

    /// Direction along the contour line (uphill rotated a quarter turn clockwise).
    pub fn contour(&self) -> f32 {
        self.uphill() - std::f32::consts::FRAC_PI_2
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Topography {
    /// Tectonic height and gradient at the region center
    pub gross_height: HeightSample,
    pub min_height: f32,
    pub max_height: f32,
    pub mean_height: f32,
    pub downhill: Option<RegionPos>,
    pub uphill: Option<RegionPos>,
}

// ===== WEATHER =====

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub wind_strength: f32,
    /// Radians, direction the wind blows toward
    pub wind_direction: f32,
    pub mean_temp: f32,
    pub cloud_potential: f32,
    pub next_cloud_potential: f32,
    pub precipitation_quotient: f32,
    pub total_precipitation: f32,
    pub next_total_precipitation: f32,
    /// mm/year per season
    pub rainfall: [f32; N_SEASONS],
    pub temp_low: [f32; N_SEASONS],
    pub temp_mean: [f32; N_SEASONS],
    pub temp_high: [f32; N_SEASONS],
}

// ===== SUMMARIES =====

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AltitudeCategory {
    OceanDepths,
    ContinentalShelf,
    #[default]
    CoastalPlains,
    InlandHills,
    Highlands,
    MountainSlopes,
    MountainPeaks,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrecipitationCategory {
    Desert,
    Arid,
    Dry,
    #[default]
    Normal,
    Seasonal,
    Wet,
    Soaking,
    Flooded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureCategory {
    Arctic,
    Tundra,
    ColdFrost,
    ColdRareFrost,
    MildFrost,
    #[default]
    MildRareFrost,
    WarmFrost,
    WarmNoFrost,
    Hot,
    Tropical,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSummary {
    pub altitude: AltitudeCategory,
    pub precipitation: PrecipitationCategory,
    pub temperature: TemperatureCategory,
}

// ===== REGION =====

/// One cell of the world map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldRegion {
    pub pos: RegionPos,
    pub seed: u64,
    pub topography: Topography,
    pub hydrology: Hydrology,
    pub weather: Weather,
    pub summary: RegionSummary,
}

impl WorldRegion {
    pub fn new(pos: RegionPos, seed: u64) -> Self {
        Self {
            pos,
            seed,
            ..Default::default()
        }
    }

    /// Center of the region in continuous map coordinates.
    pub fn center(&self) -> (f32, f32) {
        (self.pos.x as f32 + 0.5, self.pos.y as f32 + 0.5)
    }
}
