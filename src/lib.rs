//! World map generation library
//!
//! Builds a coarse world map in phases: a relaxed tectonic sheet, sampled
//! region topography, oceans/lakes/rivers, and a wind-driven water cycle with
//! seasonal climate. Re-exports modules for use by the CLI.

pub mod climate;
pub mod config;
pub mod export;
pub mod grid;
pub mod hydrology;
pub mod math;
pub mod region;
pub mod search;
pub mod seeds;
pub mod tectonics;
pub mod topography;
pub mod world;

pub use config::{ConfigError, GenerationConfig};
pub use world::{generate_world_map, WorldGenError, WorldMap, WorldStats};
