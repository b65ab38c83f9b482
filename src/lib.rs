//! # COEVA
//!
//! Predator-prey coevolution simulator. Bacteria evolve colours that blend
//! into the background; phagocytes evolve the sensitivity and aggression to
//! find and eat them anyway.
//!
//! ## Features
//!
//! - **Arms race**: coupled fitness functions drive both species at once
//! - **Two kinds of inheritance**: asexual budding every tick, a genetic
//!   algorithm epoch every N ticks
//! - **Configurable**: YAML configuration files, runtime parameter updates
//! - **Reproducible**: Seeded random number generation
//! - **Thread-safe**: a shared handle and a background driver
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coeva::{World, Config};
//!
//! // Create world with default config
//! let config = Config::default();
//! let mut world = World::new(config);
//!
//! // Run simulation
//! world.run(1000);
//!
//! // Check results
//! println!("Population: {}", world.population());
//! println!("Best bacterium: {:.3}", world.best_fitness().bacteria);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use coeva::Config;
//!
//! let mut config = Config::default();
//! config.population.initial_bacteria = 200;
//! config.evolution.mutation_rate = 0.05;
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Background driver
//!
//! ```rust,no_run
//! use coeva::{Config, SimulationDriver, SimulationHandle};
//!
//! let handle = SimulationHandle::new(Config::default());
//! let mut driver = SimulationDriver::spawn(handle.clone());
//!
//! let snapshot = handle.get_state();
//! println!("{}", snapshot.to_json().unwrap());
//!
//! driver.shutdown();
//! ```

pub mod agents;
pub mod color;
pub mod config;
pub mod ecology;
pub mod evolution;
pub mod fitness;
pub mod genetics;
pub mod population;
pub mod ranking;
pub mod shared;
pub mod snapshot;
pub mod stats;
pub mod world;

// Re-export main types
pub use agents::{Bacteria, Glucose, Phagocyte, Species};
pub use color::Rgb;
pub use config::{Config, ParameterUpdate};
pub use genetics::Genome;
pub use shared::{SimCommand, SimState, SimulationDriver, SimulationHandle};
pub use snapshot::WorldSnapshot;
pub use world::{SimError, StepReport, World};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark
pub fn benchmark(steps: u64, bacteria: usize, seed: u64) -> BenchmarkResult {
    use std::time::Instant;

    let mut config = Config::default();
    config.population.initial_bacteria = bacteria;
    config.population.initial_phagocytes = bacteria / 2;
    config.population.max_population = config.population.max_population.max(bacteria);

    let mut world = World::new_with_seed(config, seed);

    let start = Instant::now();
    world.run(steps);
    let elapsed = start.elapsed();

    BenchmarkResult {
        steps,
        initial_bacteria: bacteria,
        final_bacteria: world.bacteria.len(),
        final_phagocytes: world.phagocytes.len(),
        elapsed_secs: elapsed.as_secs_f64(),
        steps_per_second: steps as f64 / elapsed.as_secs_f64(),
        total_captures: world.stats.counters.total_captures,
    }
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub steps: u64,
    pub initial_bacteria: usize,
    pub final_bacteria: usize,
    pub final_phagocytes: usize,
    pub elapsed_secs: f64,
    pub steps_per_second: f64,
    pub total_captures: u64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Steps: {}", self.steps)?;
        writeln!(f, "Bacteria: {} -> {}", self.initial_bacteria, self.final_bacteria)?;
        writeln!(f, "Phagocytes at end: {}", self.final_phagocytes)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} steps/s", self.steps_per_second)?;
        writeln!(f, "Captures: {}", self.total_captures)?;
        Ok(())
    }
}
