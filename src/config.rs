//! Configuration system for the coevolution simulation.
//!
//! Supports YAML configuration files with sensible defaults. A `Config` is an
//! immutable snapshot: runtime parameter changes go through [`ParameterUpdate`],
//! which produces a new snapshot instead of mutating shared state.

use crate::color::Rgb;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub world: WorldConfig,
    pub population: PopulationConfig,
    pub movement: MovementConfig,
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub glucose: GlucoseConfig,
    pub reproduction: ReproductionConfig,
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub spawn: SpawnConfig,
    pub logging: LoggingConfig,
}

/// Arena configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Arena width in pixels
    pub canvas_width: u32,
    /// Arena height in pixels
    pub canvas_height: u32,
    /// Background colour bacteria camouflage against
    pub background_color: Rgb,
    /// Generation limit for the background driver (0 = unlimited)
    pub max_generations: u64,
    /// Target steps per second for the background driver
    pub fps: u32,
}

/// Population sizes and lifespans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Bacteria at start and after reset
    pub initial_bacteria: usize,
    /// Phagocytes at start and after reset
    pub initial_phagocytes: usize,
    /// Bacteria cap; phagocytes are capped at half of this
    pub max_population: usize,
    /// Age at which an agent dies
    pub max_age: u32,
}

/// Agent movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Distance travelled per tick by a wandering agent
    pub max_speed: f32,
    /// Maximum random velocity jitter per component
    pub turn_rate: f32,
    /// Bacteria radius used for wall collisions
    pub agent_size: f32,
    /// Phagocyte radius used for wall collisions
    pub phagocyte_size: f32,
    /// Velocity multiplier applied after a wall bounce
    pub collision_damping: f32,
}

/// Predation and metabolism
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// How far a phagocyte looks for prey
    pub detection_radius: f32,
    /// Distance under which a phagocyte engulfs its prey
    pub capture_radius: f32,
    /// Energy gained per capture before the aggression bonus
    pub energy_gain: f32,
    /// Energy lost per tick by every agent
    pub energy_loss: f32,
}

/// Glucose field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlucoseConfig {
    /// Particles seeded at start and after reset
    pub initial_count: usize,
    /// Upper bound the field is topped up to
    pub max_count: usize,
    /// Chance per tick of spawning one particle while below `max_count`
    pub spawn_probability: f32,
    pub min_size: f32,
    pub max_size: f32,
    /// Energy stored per unit of size
    pub energy_per_size: f32,
    /// Energy a bacterium takes from a particle in one tick
    pub bite: f32,
}

/// Per-tick reproduction for both species
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproductionConfig {
    /// Minimum energy for a bacterium to bud
    pub bacteria_threshold: f32,
    /// Energy paid by a budding bacterium
    pub bacteria_cost: f32,
    /// Ticks a bacterium waits between buds
    pub bacteria_cooldown: u32,
    /// Per-gene probability of a Gaussian mutation in the bud
    pub mutation_probability: f32,
    /// Scales `evolution.mutation_strength` into the budding sigma
    pub strength_factor: f32,
    /// Extra chance of nudging the colour gene
    pub color_micro_mutation_chance: f32,
    pub color_micro_strength: f32,
    /// Chance of the bud inventing a brand new gene
    pub novel_gene_chance: f32,
    pub min_offset: f32,
    pub max_offset: f32,
    /// Phagocytes divide only above this energy
    pub phagocyte_threshold: f32,
    pub phagocyte_cost: f32,
    /// Child is placed within this distance of the parent on each axis
    pub phagocyte_offset: f32,
    /// Uniform step applied to a mutated phagocyte gene
    pub phagocyte_mutation_step: f32,
}

/// Genetic algorithm run at every coevolution epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Probability of mutating a gene
    pub mutation_rate: f32,
    /// Probability of crossing over a pair of offspring
    pub crossover_rate: f32,
    /// Standard deviation of Gaussian mutations
    pub mutation_strength: f32,
    /// Per-gene swap probability of uniform crossover
    pub gene_swap_probability: f32,
    /// Ticks between coevolution epochs
    pub generations_per_epoch: u64,
    /// Non-empty populations are padded up to this size before an epoch
    pub min_population: usize,
    /// Best individuals carried over unchanged
    pub elitism: usize,
    pub bacteria_tournament_size: usize,
    pub phagocyte_tournament_size: usize,
    /// Phagocytes mutate more often than bacteria
    pub phagocyte_rate_multiplier: f32,
    /// Phagocytes mutate harder than bacteria
    pub phagocyte_strength_multiplier: f32,
    /// Energy given to every agent created by an epoch
    pub baseline_energy: f32,
}

/// Vulnerability ranking used for targeting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Generations a ranking stays valid
    pub update_frequency: u64,
    pub color_weight: f32,
    pub energy_weight: f32,
    pub age_weight: f32,
    /// Age at which the age term saturates
    pub age_horizon: u32,
}

/// Where phagocytes appear on init and reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpawnMode {
    #[default]
    Random,
    FixedPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub mode: SpawnMode,
    /// Centre used by `FixedPoint`
    pub point: (f32, f32),
    /// Scatter radius around `point`
    pub radius: f32,
}

/// Logging and statistics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Length of every statistics history
    pub history_length: usize,
    /// Steps between stats log lines
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            population: PopulationConfig::default(),
            movement: MovementConfig::default(),
            interaction: InteractionConfig::default(),
            glucose: GlucoseConfig::default(),
            reproduction: ReproductionConfig::default(),
            evolution: EvolutionConfig::default(),
            ranking: RankingConfig::default(),
            spawn: SpawnConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800,
            canvas_height: 600,
            background_color: Rgb(240, 240, 240),
            max_generations: 1000,
            fps: 30,
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            initial_bacteria: 100,
            initial_phagocytes: 50,
            max_population: 200,
            max_age: 1000,
        }
    }
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            max_speed: 2.0,
            turn_rate: 0.1,
            agent_size: 5.0,
            phagocyte_size: 8.0,
            collision_damping: 0.9,
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            detection_radius: 50.0,
            capture_radius: 10.0,
            energy_gain: 10.0,
            energy_loss: 1.0,
        }
    }
}

impl Default for GlucoseConfig {
    fn default() -> Self {
        Self {
            initial_count: 30,
            max_count: 60,
            spawn_probability: 0.2,
            min_size: 4.0,
            max_size: 10.0,
            energy_per_size: 5.0,
            bite: 10.0,
        }
    }
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            bacteria_threshold: 150.0,
            bacteria_cost: 50.0,
            bacteria_cooldown: 30,
            mutation_probability: 0.1,
            strength_factor: 0.5,
            color_micro_mutation_chance: 0.05,
            color_micro_strength: 0.02,
            novel_gene_chance: 0.01,
            min_offset: 10.0,
            max_offset: 20.0,
            phagocyte_threshold: 180.0,
            phagocyte_cost: 80.0,
            phagocyte_offset: 30.0,
            phagocyte_mutation_step: 0.1,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.01,
            crossover_rate: 0.8,
            mutation_strength: 0.1,
            gene_swap_probability: 0.5,
            generations_per_epoch: 50,
            min_population: 10,
            elitism: 2,
            bacteria_tournament_size: 3,
            phagocyte_tournament_size: 5,
            phagocyte_rate_multiplier: 1.5,
            phagocyte_strength_multiplier: 1.5,
            baseline_energy: 100.0,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            update_frequency: 5,
            color_weight: 0.6,
            energy_weight: 0.25,
            age_weight: 0.15,
            age_horizon: 500,
        }
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            mode: SpawnMode::Random,
            point: (400.0, 300.0),
            radius: 50.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            history_length: 100,
            stats_interval: 50,
            log_level: "info".to_string(),
        }
    }
}

/// Reasons a configuration is rejected
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("canvas must be at least 1x1, got {width}x{height}")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("{field} must be in [0, 1], got {value}")]
    OutOfUnitRange { field: &'static str, value: f32 },
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("max_population must be > 0")]
    ZeroPopulationCap,
    #[error("initial_bacteria ({initial}) cannot exceed max_population ({max})")]
    InitialExceedsCap { initial: usize, max: usize },
    #[error("generations_per_epoch must be > 0")]
    ZeroEpochLength,
    #[error("reproduction offsets are inverted: min {min} > max {max}")]
    InvertedOffsets { min: f32, max: f32 },
    #[error("glucose sizes are inverted: min {min} > max {max}")]
    InvertedGlucoseSizes { min: f32, max: f32 },
    #[error("{species} reproduction cost {cost} exceeds its threshold {threshold}")]
    CostExceedsThreshold { species: &'static str, cost: f32, threshold: f32 },
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.canvas_width == 0 || self.world.canvas_height == 0 {
            return Err(ConfigError::EmptyCanvas {
                width: self.world.canvas_width,
                height: self.world.canvas_height,
            });
        }
        if self.population.max_population == 0 {
            return Err(ConfigError::ZeroPopulationCap);
        }
        if self.population.initial_bacteria > self.population.max_population {
            return Err(ConfigError::InitialExceedsCap {
                initial: self.population.initial_bacteria,
                max: self.population.max_population,
            });
        }
        if self.evolution.generations_per_epoch == 0 {
            return Err(ConfigError::ZeroEpochLength);
        }

        let unit_fields = [
            ("mutation_rate", self.evolution.mutation_rate),
            ("crossover_rate", self.evolution.crossover_rate),
            ("gene_swap_probability", self.evolution.gene_swap_probability),
            ("mutation_probability", self.reproduction.mutation_probability),
            ("novel_gene_chance", self.reproduction.novel_gene_chance),
            ("spawn_probability", self.glucose.spawn_probability),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { field, value });
            }
        }

        let positive_fields = [
            ("max_speed", self.movement.max_speed),
            ("agent_size", self.movement.agent_size),
            ("phagocyte_size", self.movement.phagocyte_size),
            ("capture_radius", self.interaction.capture_radius),
            ("detection_radius", self.interaction.detection_radius),
            ("glucose.min_size", self.glucose.min_size),
        ];
        for (field, value) in positive_fields {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        if self.reproduction.min_offset > self.reproduction.max_offset {
            return Err(ConfigError::InvertedOffsets {
                min: self.reproduction.min_offset,
                max: self.reproduction.max_offset,
            });
        }
        if self.glucose.min_size > self.glucose.max_size {
            return Err(ConfigError::InvertedGlucoseSizes {
                min: self.glucose.min_size,
                max: self.glucose.max_size,
            });
        }

        // A parent that pays more than it must hold would drop below zero
        let r = &self.reproduction;
        for (species, cost, threshold) in [
            ("bacteria", r.bacteria_cost, r.bacteria_threshold),
            ("phagocyte", r.phagocyte_cost, r.phagocyte_threshold),
        ] {
            if !(cost >= 0.0 && cost <= threshold) {
                return Err(ConfigError::CostExceedsThreshold { species, cost, threshold });
            }
        }
        Ok(())
    }

    /// Phagocyte cap derived from the bacteria cap
    pub fn max_phagocytes(&self) -> usize {
        self.population.max_population / 2
    }
}

/// A partial set of runtime-tunable parameters.
///
/// Only the recognised keys are deserialized; anything else in an incoming
/// JSON object is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterUpdate {
    pub canvas_width: Option<u32>,
    pub canvas_height: Option<u32>,
    pub background_color: Option<Rgb>,
    pub max_generations: Option<u64>,
    pub phagocyte_spawn_mode: Option<SpawnMode>,
    pub phagocyte_spawn_point: Option<(f32, f32)>,
    pub phagocyte_spawn_radius: Option<f32>,
    pub ranking_update_frequency: Option<u64>,
    pub mutation_rate: Option<f32>,
    pub crossover_rate: Option<f32>,
    pub mutation_strength: Option<f32>,
}

impl ParameterUpdate {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    pub fn is_empty(&self) -> bool {
        *self == ParameterUpdate::default()
    }

    /// Build a new config snapshot with these values applied on top of `base`.
    pub fn apply(&self, base: &Config) -> Config {
        let mut config = base.clone();
        if let Some(v) = self.canvas_width {
            config.world.canvas_width = v.max(1);
        }
        if let Some(v) = self.canvas_height {
            config.world.canvas_height = v.max(1);
        }
        if let Some(v) = self.background_color {
            config.world.background_color = v;
        }
        if let Some(v) = self.max_generations {
            config.world.max_generations = v;
        }
        if let Some(v) = self.phagocyte_spawn_mode {
            config.spawn.mode = v;
        }
        if let Some(v) = self.phagocyte_spawn_point {
            config.spawn.point = v;
        }
        if let Some(v) = self.phagocyte_spawn_radius {
            config.spawn.radius = v.max(0.0);
        }
        if let Some(v) = self.ranking_update_frequency {
            config.ranking.update_frequency = v;
        }
        // GA parameters are clamped to the ranges the engine accepts
        if let Some(v) = self.mutation_rate {
            config.evolution.mutation_rate = v.clamp(0.0, 1.0);
        }
        if let Some(v) = self.crossover_rate {
            config.evolution.crossover_rate = v.clamp(0.0, 1.0);
        }
        if let Some(v) = self.mutation_strength {
            config.evolution.mutation_strength = v.clamp(0.01, 1.0);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coeva.yaml");
        let mut config = Config::default();
        config.population.initial_bacteria = 42;
        config.spawn.mode = SpawnMode::FixedPoint;
        config.save(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.population.initial_bacteria, 42);
        assert_eq!(loaded.spawn.mode, SpawnMode::FixedPoint);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.evolution.crossover_rate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange { field: "crossover_rate", .. })
        ));

        let mut config = Config::default();
        config.population.initial_bacteria = 500;
        assert!(matches!(config.validate(), Err(ConfigError::InitialExceedsCap { .. })));

        let mut config = Config::default();
        config.world.canvas_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_cost_above_threshold() {
        let mut config = Config::default();
        config.reproduction.bacteria_cost = 160.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CostExceedsThreshold { species: "bacteria", .. })
        ));

        let mut config = Config::default();
        config.reproduction.phagocyte_cost = 200.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CostExceedsThreshold { species: "phagocyte", .. })
        ));

        let mut config = Config::default();
        config.reproduction.phagocyte_cost = config.reproduction.phagocyte_threshold;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parameter_update_ignores_unknown_keys() {
        let json = serde_json::json!({
            "mutation_rate": 0.2,
            "background_color": [10, 20, 30],
            "warp_drive": true,
        });
        let update = ParameterUpdate::from_json(&json).unwrap();
        let config = update.apply(&Config::default());
        assert_eq!(config.evolution.mutation_rate, 0.2);
        assert_eq!(config.world.background_color, Rgb(10, 20, 30));
        assert_eq!(config.world.canvas_width, 800);
    }

    #[test]
    fn test_parameter_update_clamps_ga_values() {
        let update = ParameterUpdate {
            mutation_rate: Some(3.0),
            mutation_strength: Some(0.0),
            ..Default::default()
        };
        let config = update.apply(&Config::default());
        assert_eq!(config.evolution.mutation_rate, 1.0);
        assert_eq!(config.evolution.mutation_strength, 0.01);
    }

    #[test]
    fn test_spawn_mode_serde() {
        let json = serde_json::json!({ "phagocyte_spawn_mode": "fixed_point" });
        let update = ParameterUpdate::from_json(&json).unwrap();
        assert_eq!(update.phagocyte_spawn_mode, Some(SpawnMode::FixedPoint));
    }
}
