//! Hydrology generation: oceans, lakes and rivers.
//!
//! Oceans are filled first at sea level, lakes then flood a random subset of
//! the remaining local minima, and finally rivers are seeded on every shore
//! and grown uphill.

pub mod curve;
pub mod rivers;
pub mod water;

pub use curve::Curve;
pub use rivers::{generate_rivers, grow_river, grow_rivers, seed_rivers, GrowthOutcome, River};
pub use water::{fill_water, generate_lakes, generate_oceans, BodyOfWater, WaterFill, WaterKind};

use tracing::info;

use crate::world::WorldMap;

/// Run every hydrology phase in order.
pub fn generate_hydrology(world: &mut WorldMap) {
    let oceans = generate_oceans(world);
    let lakes = generate_lakes(world);
    generate_rivers(world);
    info!(oceans, lakes, rivers = world.rivers.len(), "hydrology complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::region::HydroState;

    #[test]
    fn test_flat_sea_floor_has_one_body_and_no_rivers() {
        let mut world = WorldMap::new(9, 4, 4, GenerationConfig::default());
        for (_, region) in world.regions.iter_mut() {
            region.topography.min_height = 8000.0;
            region.topography.max_height = 8000.0;
            region.topography.mean_height = 8000.0;
        }
        generate_hydrology(&mut world);
        assert_eq!(world.bodies.len(), 1);
        assert_eq!(world.bodies[0].area + world.bodies[0].shore_area, 16);
        assert!(world.rivers.is_empty());
        assert!(world
            .regions
            .iter()
            .all(|(_, r)| r.hydrology.state == HydroState::Ocean));
    }
}
