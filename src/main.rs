use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use worldmap_gen::export;
use worldmap_gen::{generate_world_map, GenerationConfig};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Default,
    Small,
    Detailed,
}

#[derive(Parser, Debug)]
#[command(name = "worldmap_gen")]
#[command(about = "Generate world maps with tectonics, rivers and climate")]
struct Args {
    /// Width of the map in regions
    #[arg(short = 'W', long, default_value = "128")]
    width: usize,

    /// Height of the map in regions
    #[arg(short = 'H', long, default_value = "64")]
    height: usize,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Built-in parameter preset, used when no config file is given
    #[arg(long, value_enum, default_value = "default")]
    preset: Preset,

    /// JSON generation config; missing fields take default values
    #[arg(short, long)]
    config: Option<String>,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Write PNG maps as <prefix>_<map>.png
    #[arg(short, long)]
    output: Option<String>,

    /// Pixels per region in exported maps
    #[arg(long, default_value = "4")]
    scale: u32,
}

fn load_config(args: &Args) -> Result<GenerationConfig, worldmap_gen::ConfigError> {
    match &args.config {
        Some(path) => GenerationConfig::from_json_file(path),
        None => Ok(match args.preset {
            Preset::Default => GenerationConfig::default(),
            Preset::Small => GenerationConfig::small_test(),
            Preset::Detailed => GenerationConfig::detailed(),
        }),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if args.dump_config {
        return match config.to_json_pretty() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let world = match generate_world_map(seed, args.width, args.height, config) {
        Ok(world) => world,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let stats = world.stats();
    let area = (args.width * args.height) as f32;
    info!(
        seed,
        land_pct = format!("{:.1}", 100.0 * stats.land as f32 / area),
        ocean_pct = format!("{:.1}", 100.0 * stats.ocean as f32 / area),
        lakes = stats.lake,
        shore = stats.shore,
        bodies = stats.bodies,
        rivers = stats.rivers,
        "map statistics"
    );
    info!(
        mean_precipitation = format!("{:.0} mm", stats.mean_precipitation),
        mean_temperature = format!("{:.1} C", stats.mean_temperature),
        "climate statistics"
    );

    if let Some(prefix) = &args.output {
        if let Err(e) = export::export_all(&world, prefix, args.scale) {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
