//! Phagocytes: predators that spot, chase and engulf bacteria.

use super::bacteria::Bacteria;
use super::body::{Body, Bounds, Kinematics};
use super::{Agent, Species};
use crate::color::{color_distance, phagocyte_color, Rgb};
use crate::config::{Config, SpawnMode};
use crate::ecology::predation::capture_energy_gain;
use crate::fitness::{self, FitnessError};
use crate::genetics::{budding, Genome};
use crate::ranking::TargetingView;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Phagocyte {
    pub body: Body,

    // Statistics
    pub offspring_count: u32,
    pub captures: u32,

    /// Bacterium chased during the last move
    pub target_id: Option<String>,
}

impl Phagocyte {
    pub fn new<R: Rng + ?Sized>(
        id: String,
        x: f32,
        y: f32,
        genome: Genome,
        energy: f32,
        config: &Config,
        rng: &mut R,
    ) -> Self {
        let color = phagocyte_color(genome.gene("aggression_gene"), genome.gene("sensitivity_gene"));
        let body = Body::new(
            id,
            Species::Phagocyte,
            x,
            y,
            genome,
            color,
            energy,
            config.population.max_age,
            rng,
        );
        Self {
            body,
            offspring_count: 0,
            captures: 0,
            target_id: None,
        }
    }

    /// Random genome placed according to the spawn settings.
    pub fn random<R: Rng + ?Sized>(id: String, energy: f32, config: &Config, rng: &mut R) -> Self {
        let (x, y) = spawn_position(config, rng);
        let genome = Genome::random(Species::Phagocyte, rng);
        Self::new(id, x, y, genome, energy, config, rng)
    }

    #[inline]
    pub fn sensitivity(&self) -> f32 {
        self.body.genome.gene("sensitivity_gene")
    }

    #[inline]
    pub fn aggression(&self) -> f32 {
        self.body.genome.gene("aggression_gene")
    }

    #[inline]
    pub fn speed_gene(&self) -> f32 {
        self.body.genome.gene("speed_gene")
    }

    /// Whether this phagocyte can tell `bacterium` apart from the background.
    ///
    /// Sensitive, aggressive hunters have a low threshold; well camouflaged
    /// prey raise it.
    pub fn detect_bacteria(&self, bacterium: &Bacteria, background: Rgb) -> bool {
        let base = 1.0 - self.sensitivity() * (0.7 + 0.3 * self.aggression());
        let threshold = base * (0.5 + 0.5 * bacterium.body.fitness);
        color_distance(bacterium.body.color, background) > threshold
    }

    /// Nearest ranked, detectable bacterium within detection range.
    pub fn find_target_bacteria(&self, view: &TargetingView<'_>, config: &Config) -> Option<usize> {
        view.ranked_bacteria_in_range(self, config.interaction.detection_radius)
            .first()
            .copied()
    }

    pub fn chase_speed(&self, config: &Config) -> f32 {
        config.movement.max_speed * (1.0 + 0.5 * (self.speed_gene() + self.aggression()))
    }

    /// Steer towards `target` and advance at chase speed.
    pub fn chase_bacteria(&mut self, target: &Bacteria, bounds: Bounds, config: &Config) {
        let kin = Kinematics::for_species(config, Species::Phagocyte);
        let turn = kin.turn_rate * (1.0 + self.speed_gene());
        self.body.steer_towards(target.body.x, target.body.y, turn);
        let speed = self.chase_speed(config);
        self.body.advance(speed, bounds, &kin);
    }

    /// Chase a target when one is visible, otherwise wander.
    pub fn move_with<R: Rng + ?Sized>(
        &mut self,
        bounds: Bounds,
        config: &Config,
        view: &TargetingView<'_>,
        rng: &mut R,
    ) {
        match self.find_target_bacteria(view, config).and_then(|i| view.bacterium(i)) {
            Some(target) => {
                self.target_id = Some(target.body.id.clone());
                self.chase_bacteria(target, bounds, config);
            }
            None => {
                self.target_id = None;
                let kin = Kinematics::for_species(config, Species::Phagocyte);
                self.body.wander(bounds, &kin, rng);
            }
        }
    }

    /// Engulf `bacterium` if it is within capture range.
    pub fn capture_bacteria(&mut self, bacterium: &Bacteria, config: &Config) -> bool {
        let d = self.body.distance_to(bacterium.body.x, bacterium.body.y);
        if d < config.interaction.capture_radius {
            self.body
                .gain_energy(capture_energy_gain(self.aggression(), &config.interaction));
            self.captures += 1;
            true
        } else {
            false
        }
    }

    /// Recompute and store fitness. On error the stored value is left unchanged.
    pub fn calculate_fitness(&mut self, avg_bacteria_fitness: Option<f32>) -> Result<f32, FitnessError> {
        let f = fitness::phagocyte_fitness(&self.body, avg_bacteria_fitness)?;
        self.body.fitness = f;
        Ok(f)
    }

    pub fn can_reproduce(&self, config: &Config) -> bool {
        self.body.energy > config.reproduction.phagocyte_threshold && self.body.is_alive()
    }

    /// Divide in two. The child starts at the baseline energy, not the cost paid.
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        child_id: String,
        config: &Config,
        rng: &mut R,
    ) -> Option<Phagocyte> {
        if !self.can_reproduce(config) {
            return None;
        }
        let r = &config.reproduction;
        self.body.energy -= r.phagocyte_cost;
        self.offspring_count += 1;

        let genome = budding::divide_genome(
            &self.body.genome,
            config.evolution.mutation_rate,
            r.phagocyte_mutation_step,
            rng,
        );
        let (x, y) = budding::box_offset(
            self.body.x,
            self.body.y,
            r.phagocyte_offset,
            Bounds::from_config(config),
            rng,
        );
        Some(Phagocyte::new(
            child_id,
            x,
            y,
            genome,
            config.evolution.baseline_energy,
            config,
            rng,
        ))
    }
}

impl Agent for Phagocyte {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn expected_species() -> Species {
        Species::Phagocyte
    }
}

/// Placement for a new phagocyte: anywhere, or scattered around the spawn point.
pub fn spawn_position<R: Rng + ?Sized>(config: &Config, rng: &mut R) -> (f32, f32) {
    let bounds = Bounds::from_config(config);
    match config.spawn.mode {
        SpawnMode::Random => bounds.random_point(rng),
        SpawnMode::FixedPoint => {
            let (cx, cy) = config.spawn.point;
            let radius = config.spawn.radius.max(0.0);
            let angle = rng.gen_range(0.0..TAU);
            // sqrt keeps the scatter uniform over the disc
            let distance = radius * rng.gen::<f32>().sqrt();
            bounds.clamp_point(cx + angle.cos() * distance, cy + angle.sin() * distance)
        }
    }
}
