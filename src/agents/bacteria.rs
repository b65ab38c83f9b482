//! Bacteria: prey that survive by matching the background colour.

use super::body::{Body, Bounds, Kinematics};
use super::{Agent, Species};
use crate::color::{bacteria_color, Rgb};
use crate::config::Config;
use crate::fitness::{self, FitnessError};
use crate::genetics::{budding, BuddingParams, Genome};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bacteria {
    pub body: Body,

    // Reproduction
    pub reproduction_cooldown: u32,
    pub offspring_count: u32,
    pub parent_id: Option<String>,

    /// Heading in radians, refreshed after every move
    pub direction: f32,
}

impl Bacteria {
    pub fn new<R: Rng + ?Sized>(
        id: String,
        x: f32,
        y: f32,
        genome: Genome,
        energy: f32,
        config: &Config,
        rng: &mut R,
    ) -> Self {
        let color = bacteria_color(genome.gene("color_gene"));
        let body = Body::new(
            id,
            Species::Bacteria,
            x,
            y,
            genome,
            color,
            energy,
            config.population.max_age,
            rng,
        );
        let direction = body.heading();
        Self {
            body,
            reproduction_cooldown: 0,
            offspring_count: 0,
            parent_id: None,
            direction,
        }
    }

    /// Random genome at a uniformly random position.
    pub fn random<R: Rng + ?Sized>(id: String, energy: f32, config: &Config, rng: &mut R) -> Self {
        let (x, y) = Bounds::from_config(config).random_point(rng);
        let genome = Genome::random(Species::Bacteria, rng);
        Self::new(id, x, y, genome, energy, config, rng)
    }

    pub fn move_in<R: Rng + ?Sized>(&mut self, bounds: Bounds, config: &Config, rng: &mut R) {
        let kin = Kinematics::for_species(config, Species::Bacteria);
        self.body.wander(bounds, &kin, rng);
        self.direction = self.body.heading();
    }

    pub fn tick_cooldown(&mut self) {
        self.reproduction_cooldown = self.reproduction_cooldown.saturating_sub(1);
    }

    /// Recompute and store camouflage fitness. On error the stored value is
    /// left unchanged.
    pub fn calculate_fitness(&mut self, background: Rgb) -> Result<f32, FitnessError> {
        let f = fitness::bacteria_fitness(&self.body, background)?;
        self.body.fitness = f;
        Ok(f)
    }

    pub fn vulnerability_score(&self, background: Rgb, config: &Config) -> f32 {
        fitness::vulnerability_score(
            self.body.color,
            self.body.energy,
            self.body.age,
            background,
            &config.ranking,
        )
    }

    pub fn can_reproduce_asexually(&self, config: &Config) -> bool {
        self.body.energy >= config.reproduction.bacteria_threshold
            && self.reproduction_cooldown == 0
            && self.body.is_alive()
    }

    /// Bud off a daughter cell. Returns `None` and leaves the parent untouched
    /// when it cannot reproduce.
    pub fn reproduce_asexually<R: Rng + ?Sized>(
        &mut self,
        child_id: String,
        config: &Config,
        rng: &mut R,
    ) -> Option<Bacteria> {
        if !self.can_reproduce_asexually(config) {
            return None;
        }
        let r = &config.reproduction;
        self.body.energy -= r.bacteria_cost;
        self.reproduction_cooldown = r.bacteria_cooldown;
        self.offspring_count += 1;

        let params = BuddingParams::from_config(config);
        let genome = budding::bud_genome(&self.body.genome, &params, rng);
        let (x, y) = budding::ring_offset(
            self.body.x,
            self.body.y,
            r.min_offset,
            r.max_offset,
            Bounds::from_config(config),
            rng,
        );

        let mut child = Bacteria::new(child_id, x, y, genome, r.bacteria_cost / 2.0, config, rng);
        child.parent_id = Some(self.body.id.clone());
        Some(child)
    }
}

impl Agent for Bacteria {
    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    fn expected_species() -> Species {
        Species::Bacteria
    }
}
