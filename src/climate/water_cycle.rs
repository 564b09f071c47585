//! Water-cycle simulation.
//!
//! Each step hands every region's cloud potential out to itself and its eight
//! neighbors, weighted toward the wind, then rains a fraction of it out and
//! recharges regions that have dropped below their evaporation floor.

use tracing::{debug, info, warn};

use super::{evaporation, evaporation_noise};
use crate::grid::{Grid, GridBounds, RegionPos};
use crate::world::WorldMap;

/// Cloud potential floors for every region.
pub fn evaporation_floors(world: &WorldMap) -> Grid<f32> {
    let noise = evaporation_noise(world);
    Grid::from_fn(world.width(), world.height(), |x, y| {
        evaporation(world, &noise, RegionPos::new(x, y))
    })
}

/// Share weights for the 3x3 neighborhood, indexed `(dy + 1) * 3 + (dx + 1)`.
fn share_weights(wind_strength: f32, wind_direction: f32, world: &WorldMap) -> [f32; 9] {
    let params = &world.config.climate;
    let ws = (wind_strength / params.upper_wind_strength).clamp(0.0, 1.0);
    let mut weights = [0.0; 9];
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            let i = ((dy + 1) * 3 + (dx + 1)) as usize;
            weights[i] = if dx == 0 && dy == 0 {
                (1.0 - ws) * (1.0 - ws)
            } else {
                let dir = (dy as f32).atan2(dx as f32);
                let along = ((1.0 + (wind_direction - dir).cos()) / 2.0).powf(params.wind_focus_exp);
                ws * params.wind_focus * along + (1.0 - ws) * params.calm_diffusion
            };
        }
    }
    weights
}

/// Move cloud potential one step along the winds.
///
/// Shares aimed off the map stay with the sending region, so the total cloud
/// potential is unchanged by a step.
pub fn water_cycle_step(world: &mut WorldMap) {
    for idx in 0..world.area() {
        let pos = world.regions.pos_of(idx);
        let weather = &world.region(pos).weather;
        let potential = weather.cloud_potential;
        let weights = share_weights(weather.wind_strength, weather.wind_direction, world);
        let total: f32 = weights.iter().sum();
        if total <= 0.0 {
            world.region_mut(pos).weather.next_cloud_potential += potential;
            continue;
        }
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let w = weights[((dy + 1) * 3 + (dx + 1)) as usize];
                let target = world.neighbor(pos, dx, dy).unwrap_or(pos);
                world.region_mut(target).weather.next_cloud_potential += potential * (w / total);
            }
        }
    }
    for (_, region) in world.regions.iter_mut() {
        let weather = &mut region.weather;
        weather.cloud_potential = weather.next_cloud_potential;
        weather.next_cloud_potential = 0.0;
    }
}

/// Rain out each region's share of cloud potential and recharge from the
/// evaporation floors.
pub fn water_cycle_rain(world: &mut WorldMap, floors: &Grid<f32>) {
    let recharge = world.config.climate.recharge_rate;
    for (pos, region) in world.regions.iter_mut() {
        let weather = &mut region.weather;
        let mut pq = weather.precipitation_quotient;
        if !(0.0..=1.0).contains(&pq) {
            warn!(x = pos.x, y = pos.y, pq, "precipitation quotient out of range; clamping");
            pq = pq.clamp(0.0, 1.0);
        }
        let rain = weather.cloud_potential * pq;
        weather.cloud_potential -= rain;
        weather.total_precipitation += rain;

        let evap = *floors.get(pos);
        if weather.cloud_potential < evap {
            weather.cloud_potential = recharge * evap + (1.0 - recharge) * weather.cloud_potential;
        }
    }
}

/// One smoothing pass: average cloud potential and total precipitation over
/// each region's in-bounds 3x3 neighborhood.
pub fn water_cycle_smooth(world: &mut WorldMap) {
    for pos in world.regions.positions().collect::<Vec<_>>() {
        let mut cloud = 0.0;
        let mut precip = 0.0;
        let mut count = 0.0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(n) = world.neighbor(pos, dx, dy) {
                    let w = &world.region(n).weather;
                    cloud += w.cloud_potential;
                    precip += w.total_precipitation;
                    count += 1.0;
                }
            }
        }
        let weather = &mut world.region_mut(pos).weather;
        weather.next_cloud_potential = cloud / count;
        weather.next_total_precipitation = precip / count;
    }
    for (_, region) in world.regions.iter_mut() {
        let w = &mut region.weather;
        w.cloud_potential = w.next_cloud_potential;
        w.next_cloud_potential = 0.0;
        w.total_precipitation = w.next_total_precipitation;
        w.next_total_precipitation = 0.0;
    }
}

/// Run the water cycle and turn accumulated rain into annual precipitation.
pub fn simulate_water_cycle(world: &mut WorldMap) {
    let params = world.config.climate.clone();
    let floors = evaporation_floors(world);
    for step in 0..params.water_cycle_steps {
        water_cycle_step(world);
        water_cycle_rain(world, &floors);
        debug!(step, steps = params.water_cycle_steps, "water cycle step");
    }

    let scale = params.precipitation_factor / params.water_cycle_steps as f32;
    for (_, region) in world.regions.iter_mut() {
        region.weather.total_precipitation *= scale;
    }
    for _ in 0..params.finish_steps {
        water_cycle_smooth(world);
    }
    info!(steps = params.water_cycle_steps, "water cycle simulated");
}
