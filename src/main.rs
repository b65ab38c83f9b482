//! COEVA - CLI Entry Point
//!
//! Predator-prey coevolution simulator.

use clap::{Parser, Subcommand};
use coeva::{benchmark, Config, Rgb, SimulationDriver, SimulationHandle, World};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "coeva")]
#[command(version)]
#[command(about = "Predator-prey coevolution simulator: camouflaged bacteria versus hunting phagocytes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a new simulation
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of generations to simulate
        #[arg(short, long, default_value = "1000")]
        steps: u64,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Quiet mode (minimal output)
        #[arg(short, long)]
        quiet: bool,

        /// Step on a background thread at this rate instead of flat out
        #[arg(long)]
        fps: Option<u32>,

        /// Override the background colour (`r,g,b` or `#rrggbb`)
        #[arg(long)]
        background: Option<Rgb>,

        /// Write the final statistics report as JSON
        #[arg(long)]
        stats_json: Option<PathBuf>,

        /// Write the final world snapshot as JSON
        #[arg(long)]
        snapshot_json: Option<PathBuf>,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of steps
        #[arg(short, long, default_value = "500")]
        steps: u64,

        /// Initial bacteria (phagocytes start at half)
        #[arg(short, long, default_value = "100")]
        bacteria: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            steps,
            seed,
            quiet,
            fps,
            background,
            stats_json,
            snapshot_json,
        } => run_simulation(RunArgs {
            config_path: config,
            steps,
            seed,
            quiet,
            fps,
            background,
            stats_json,
            snapshot_json,
        }),

        Commands::Benchmark { steps, bacteria, seed } => {
            init_logging("info");
            run_benchmark(steps, bacteria, seed)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }
    }
}

/// RUST_LOG wins over the configured level
fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

struct RunArgs {
    config_path: PathBuf,
    steps: u64,
    seed: Option<u64>,
    quiet: bool,
    fps: Option<u32>,
    background: Option<Rgb>,
    stats_json: Option<PathBuf>,
    snapshot_json: Option<PathBuf>,
}

fn run_simulation(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let (mut config, source) = if args.config_path.exists() {
        (Config::from_file(&args.config_path)?, format!("{:?}", args.config_path))
    } else {
        (Config::default(), "defaults".to_string())
    };
    init_logging(&config.logging.log_level);
    log::info!("Configuration loaded from {}", source);

    if let Some(fps) = args.fps {
        config.world.fps = fps;
    }
    if let Some(background) = args.background {
        config.world.background_color = background;
    }

    // Create world
    let world = match args.seed {
        Some(s) => World::new_with_seed(config.clone(), s),
        None => World::new(config.clone()),
    };

    println!("Starting simulation");
    println!("  Seed: {}", world.seed());
    println!(
        "  Bacteria: {}, phagocytes: {}, glucose: {}",
        world.bacteria.len(),
        world.phagocytes.len(),
        world.glucose.len()
    );
    println!("  Canvas: {}x{}", config.world.canvas_width, config.world.canvas_height);
    println!("  Steps: {}", args.steps);
    println!();

    let start = Instant::now();
    let handle = match args.fps {
        Some(_) => run_in_background(world, args.steps),
        None => run_in_foreground(world, args.steps, args.quiet),
    };
    let elapsed = start.elapsed();

    let report = handle.get_statistics();
    let summary = &report.summary;
    println!();
    println!("=== Simulation Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Generations: {}", summary.generation);
    println!("Speed: {:.1} steps/s", summary.generation as f64 / elapsed.as_secs_f64());
    println!("Bacteria: {}, phagocytes: {}", summary.bacteria, summary.phagocytes);
    println!("Best fitness: {:.3}", summary.best_fitness);
    println!("Captures: {}", summary.counters.total_captures);
    println!("Epochs: {}", summary.counters.epochs);
    if summary.counters.failed_steps > 0 {
        println!("Failed steps: {}", summary.counters.failed_steps);
    }

    if let Some(path) = args.stats_json {
        write_json(&path, &serde_json::to_string_pretty(&report)?)?;
        println!("Statistics: {:?}", path);
    }
    if let Some(path) = args.snapshot_json {
        write_json(&path, &serde_json::to_string_pretty(&handle.get_state())?)?;
        println!("Snapshot: {:?}", path);
    }

    Ok(())
}

fn run_in_foreground(mut world: World, steps: u64, quiet: bool) -> SimulationHandle {
    let stats_interval = world.config().logging.stats_interval.max(1);

    for _ in 0..steps {
        world.step();

        // Stats output
        if !quiet && world.generation % stats_interval == 0 {
            println!("{}", world.stats.current.summary());
        }

        // Check for extinction
        if world.is_extinct() {
            println!("\nBoth species extinct at generation {}", world.generation);
            break;
        }
    }
    SimulationHandle::from_world(world)
}

fn run_in_background(mut world: World, steps: u64) -> SimulationHandle {
    let limit = world.generation + steps;
    world.update_parameters(&coeva::ParameterUpdate {
        max_generations: Some(limit),
        ..Default::default()
    });
    let handle = SimulationHandle::from_world(world);
    let mut driver = SimulationDriver::spawn(handle.clone());
    driver.wait();
    handle
}

fn write_json(path: &Path, json: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    Ok(())
}

fn run_benchmark(steps: u64, bacteria: usize, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== COEVA Benchmark ===");
    println!("Steps: {}", steps);
    println!("Bacteria: {}", bacteria);
    println!();

    let result = benchmark(steps, bacteria, seed);
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
