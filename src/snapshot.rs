//! Snapshot structures for external consumers.
//!
//! These are serializable copies of simulation state, taken under the world
//! lock and handed to transports or the CLI. Large populations are sampled
//! down so a snapshot stays cheap to encode.

use crate::agents::{Bacteria, Glucose, Phagocyte};
use crate::color::Rgb;
use crate::config::SpawnMode;
use crate::fitness::FitnessSummary;
use crate::genetics::Genome;
use crate::shared::SimState;
use crate::World;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

pub const MAX_BACTERIA_IN_SNAPSHOT: usize = 200;
pub const MAX_PHAGOCYTES_IN_SNAPSHOT: usize = 50;
pub const MAX_GLUCOSE_IN_SNAPSHOT: usize = 200;

/// A value per species
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PerSpecies<T> {
    pub bacteria: T,
    pub phagocytes: T,
}

#[derive(Clone, Debug, Serialize)]
pub struct BacteriumView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: Rgb,
    pub fitness: f32,
    pub energy: f32,
    pub age: u32,
    pub direction: f32,
    pub length_gene: f32,
    pub width_gene: f32,
    pub vulnerability: f32,
    pub genome: Genome,
}

#[derive(Clone, Debug, Serialize)]
pub struct PhagocyteView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub color: Rgb,
    pub fitness: f32,
    pub energy: f32,
    pub age: u32,
    pub aggression_gene: f32,
    pub captures: u32,
    pub target_id: Option<String>,
    pub genome: Genome,
}

#[derive(Clone, Debug, Serialize)]
pub struct GlucoseView {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub energy: f32,
}

/// Runtime-tunable parameters and the counts they apply to
#[derive(Clone, Debug, Serialize)]
pub struct Parameters {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background_color: Rgb,
    pub max_generations: u64,
    pub mutation_rate: f32,
    pub crossover_rate: f32,
    pub mutation_strength: f32,
    pub ranking_update_frequency: u64,
    pub phagocyte_spawn_mode: SpawnMode,
    pub phagocyte_spawn_point: (f32, f32),
    pub phagocyte_spawn_radius: f32,
    pub current_generation: u64,
    pub bacteria_count: usize,
    pub phagocyte_count: usize,
}

/// Short run status
#[derive(Clone, Debug, Serialize)]
pub struct Status {
    pub state: SimState,
    pub generation: u64,
    pub population: PerSpecies<usize>,
    pub glucose: usize,
    pub run_time_secs: f64,
    pub seed: u64,
    pub timestamp: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnvironmentView {
    pub width: u32,
    pub height: u32,
    pub background_color: Rgb,
}

#[derive(Clone, Debug, Serialize)]
pub struct CounterView {
    pub total_captures: u64,
    pub total_reproductions: u64,
    pub glucose_consumed: u64,
}

/// Complete world snapshot
#[derive(Clone, Debug, Serialize)]
pub struct WorldSnapshot {
    pub generation: u64,
    pub timestamp: String,
    pub state: SimState,
    pub bacteria: Vec<BacteriumView>,
    pub phagocytes: Vec<PhagocyteView>,
    pub glucose: Vec<GlucoseView>,
    /// Full population sizes, before sampling
    pub population: PerSpecies<usize>,
    pub glucose_count: usize,
    pub fitness: PerSpecies<FitnessSummary>,
    pub counters: CounterView,
    pub parameters: Parameters,
    pub environment: EnvironmentView,
}

impl WorldSnapshot {
    /// Create a snapshot from the current world state
    pub fn from_world(world: &World) -> Self {
        let config = world.config();
        let bg = config.world.background_color;
        // Sampling draws from its own stream so snapshots never perturb the run
        let mut rng = ChaCha8Rng::seed_from_u64(world.seed() ^ world.generation.rotate_left(32));

        let bacteria = sample(&world.bacteria, MAX_BACTERIA_IN_SNAPSHOT, &mut rng)
            .map(|b| BacteriumView::new(b, bg, config))
            .collect();
        let phagocytes = sample(&world.phagocytes, MAX_PHAGOCYTES_IN_SNAPSHOT, &mut rng)
            .map(PhagocyteView::new)
            .collect();
        let glucose = sample(&world.glucose, MAX_GLUCOSE_IN_SNAPSHOT, &mut rng)
            .map(GlucoseView::new)
            .collect();

        let counters = &world.stats.counters;
        Self {
            generation: world.generation,
            timestamp: timestamp(Utc::now()),
            state: world.state(),
            bacteria,
            phagocytes,
            glucose,
            population: PerSpecies {
                bacteria: world.bacteria.len(),
                phagocytes: world.phagocytes.len(),
            },
            glucose_count: world.glucose.len(),
            fitness: PerSpecies {
                bacteria: FitnessSummary::of(&world.bacteria),
                phagocytes: FitnessSummary::of(&world.phagocytes),
            },
            counters: CounterView {
                total_captures: counters.total_captures,
                total_reproductions: counters.total_reproductions,
                glucose_consumed: counters.glucose_consumed,
            },
            parameters: Parameters::from_world(world),
            environment: EnvironmentView {
                width: config.world.canvas_width,
                height: config.world.canvas_height,
                background_color: bg,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl BacteriumView {
    fn new(b: &Bacteria, background: Rgb, config: &crate::Config) -> Self {
        Self {
            id: b.body.id.clone(),
            x: b.body.x,
            y: b.body.y,
            vx: b.body.vx,
            vy: b.body.vy,
            color: b.body.color,
            fitness: b.body.fitness,
            energy: b.body.energy,
            age: b.body.age,
            direction: b.direction,
            length_gene: b.body.genome.gene("length_gene"),
            width_gene: b.body.genome.gene("width_gene"),
            vulnerability: b.vulnerability_score(background, config),
            genome: b.body.genome.clone(),
        }
    }
}

impl PhagocyteView {
    fn new(p: &Phagocyte) -> Self {
        Self {
            id: p.body.id.clone(),
            x: p.body.x,
            y: p.body.y,
            vx: p.body.vx,
            vy: p.body.vy,
            color: p.body.color,
            fitness: p.body.fitness,
            energy: p.body.energy,
            age: p.body.age,
            aggression_gene: p.aggression(),
            captures: p.captures,
            target_id: p.target_id.clone(),
            genome: p.body.genome.clone(),
        }
    }
}

impl GlucoseView {
    fn new(g: &Glucose) -> Self {
        Self {
            id: g.id.clone(),
            x: g.x,
            y: g.y,
            size: g.size,
            energy: g.energy,
        }
    }
}

impl Parameters {
    pub fn from_world(world: &World) -> Self {
        let config = world.config();
        Self {
            canvas_width: config.world.canvas_width,
            canvas_height: config.world.canvas_height,
            background_color: config.world.background_color,
            max_generations: config.world.max_generations,
            mutation_rate: world.evolution_engine.mutation_rate,
            crossover_rate: world.evolution_engine.crossover_rate,
            mutation_strength: world.evolution_engine.mutation_strength,
            ranking_update_frequency: config.ranking.update_frequency,
            phagocyte_spawn_mode: config.spawn.mode,
            phagocyte_spawn_point: config.spawn.point,
            phagocyte_spawn_radius: config.spawn.radius,
            current_generation: world.generation,
            bacteria_count: world.bacteria.len(),
            phagocyte_count: world.phagocytes.len(),
        }
    }
}

impl Status {
    pub fn from_world(world: &World) -> Self {
        Self {
            state: world.state(),
            generation: world.generation,
            population: PerSpecies {
                bacteria: world.bacteria.len(),
                phagocytes: world.phagocytes.len(),
            },
            glucose: world.glucose.len(),
            run_time_secs: world.run_time().as_secs_f64(),
            seed: world.seed(),
            timestamp: timestamp(Utc::now()),
        }
    }
}

/// RFC 3339 with millisecond precision
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Everything when under `cap`, otherwise a random subset in population order.
fn sample<'a, T>(items: &'a [T], cap: usize, rng: &mut ChaCha8Rng) -> impl Iterator<Item = &'a T> + 'a {
    let picked: Vec<usize> = if items.len() <= cap {
        (0..items.len()).collect()
    } else {
        let mut idx = index::sample(rng, items.len(), cap).into_vec();
        idx.sort_unstable();
        idx
    };
    picked.into_iter().map(move |i| &items[i])
}
