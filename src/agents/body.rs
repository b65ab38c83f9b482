//! Physical state and movement shared by every mobile agent.

use super::Species;
use crate::color::Rgb;
use crate::config::Config;
use crate::genetics::Genome;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Hard ceiling on stored energy.
pub const MAX_ENERGY: f32 = 200.0;

/// Rectangular arena `[0, width] x [0, height]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.world.canvas_width as f32,
            config.world.canvas_height as f32,
        )
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }

    #[inline]
    pub fn clamp_point(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }

    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> (f32, f32) {
        (
            rng.gen::<f32>() * self.width,
            rng.gen::<f32>() * self.height,
        )
    }
}

/// Movement parameters for one species, resolved from the config
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Kinematics {
    pub max_speed: f32,
    pub turn_rate: f32,
    pub radius: f32,
    pub damping: f32,
    pub energy_loss: f32,
}

impl Kinematics {
    pub fn for_species(config: &Config, species: Species) -> Self {
        let radius = match species {
            Species::Phagocyte => config.movement.phagocyte_size,
            _ => config.movement.agent_size,
        };
        Self {
            max_speed: config.movement.max_speed,
            turn_rate: config.movement.turn_rate,
            radius,
            damping: config.movement.collision_damping,
            energy_loss: config.interaction.energy_loss,
        }
    }
}

/// State common to bacteria and phagocytes
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Body {
    // Identity
    pub id: String,
    pub species: Species,

    // Physical state
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub energy: f32,
    pub age: u32,
    pub max_age: u32,

    // Heredity
    pub genome: Genome,
    pub color: Rgb,
    pub fitness: f32,
}

impl Body {
    /// New body with a random unit heading.
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: Rng + ?Sized>(
        id: String,
        species: Species,
        x: f32,
        y: f32,
        genome: Genome,
        color: Rgb,
        energy: f32,
        max_age: u32,
        rng: &mut R,
    ) -> Self {
        let angle = rng.gen_range(0.0..std::f32::consts::TAU);
        Self {
            id,
            species,
            x,
            y,
            vx: angle.cos(),
            vy: angle.sin(),
            energy: energy.clamp(0.0, MAX_ENERGY),
            age: 0,
            max_age,
            genome,
            color,
            fitness: 0.0,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.energy > 0.0 && self.age < self.max_age
    }

    #[inline]
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }

    /// Heading angle in radians
    pub fn heading(&self) -> f32 {
        self.vy.atan2(self.vx)
    }

    pub fn speed(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Rescale velocity to unit length.
    pub fn normalize_velocity(&mut self) {
        let mag = self.speed();
        if mag > f32::EPSILON && mag.is_finite() {
            self.vx /= mag;
            self.vy /= mag;
        } else {
            self.vx = 1.0;
            self.vy = 0.0;
        }
    }

    /// Random walk: jitter the heading, then advance at full speed.
    pub fn wander<R: Rng + ?Sized>(&mut self, bounds: Bounds, kin: &Kinematics, rng: &mut R) {
        if kin.turn_rate > 0.0 {
            self.vx += rng.gen_range(-kin.turn_rate..=kin.turn_rate);
            self.vy += rng.gen_range(-kin.turn_rate..=kin.turn_rate);
        }
        self.normalize_velocity();
        self.advance(kin.max_speed, bounds, kin);
    }

    /// Turn towards a point by `strength` and renormalise.
    pub fn steer_towards(&mut self, x: f32, y: f32, strength: f32) {
        let dx = x - self.x;
        let dy = y - self.y;
        let dist = (dx * dx + dy * dy).sqrt();
        if dist > 0.0 {
            self.vx += dx / dist * strength;
            self.vy += dy / dist * strength;
        }
        self.normalize_velocity();
    }

    /// Move by `speed` along the current heading, bounce off the walls, then
    /// pay the metabolic cost of the tick. Returns whether a wall was hit.
    pub fn advance(&mut self, speed: f32, bounds: Bounds, kin: &Kinematics) -> bool {
        let r = kin.radius;
        let mut nx = self.x + self.vx * speed;
        let mut ny = self.y + self.vy * speed;
        let mut collided = false;

        if nx - r < 0.0 {
            self.vx = self.vx.abs();
            nx = r;
            collided = true;
        } else if nx + r > bounds.width {
            self.vx = -self.vx.abs();
            nx = bounds.width - r;
            collided = true;
        }

        if ny - r < 0.0 {
            self.vy = self.vy.abs();
            ny = r;
            collided = true;
        } else if ny + r > bounds.height {
            self.vy = -self.vy.abs();
            ny = bounds.height - r;
            collided = true;
        }

        if collided {
            self.vx *= kin.damping;
            self.vy *= kin.damping;
            self.normalize_velocity();
        }

        // Arenas narrower than the agent still keep it inside
        let (cx, cy) = bounds.clamp_point(nx, ny);
        self.x = cx;
        self.y = cy;

        self.metabolize(kin.energy_loss);
        collided
    }

    /// One tick of ageing and energy burn.
    pub fn metabolize(&mut self, energy_loss: f32) {
        self.age = self.age.saturating_add(1);
        self.energy = (self.energy - energy_loss).clamp(0.0, MAX_ENERGY);
    }

    pub fn gain_energy(&mut self, amount: f32) {
        self.energy = (self.energy + amount).clamp(0.0, MAX_ENERGY);
    }

    /// Position, velocity and energy are all finite.
    pub fn has_finite_state(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.vx.is_finite()
            && self.vy.is_finite()
            && self.energy.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_body(x: f32, y: f32, rng: &mut ChaCha8Rng) -> Body {
        Body::new(
            "bacteria_0".to_string(),
            Species::Bacteria,
            x,
            y,
            Genome::new(),
            Rgb(0, 0, 0),
            100.0,
            1000,
            rng,
        )
    }

    #[test]
    fn test_new_body_has_unit_velocity() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let body = test_body(10.0, 10.0, &mut rng);
        assert!((body.speed() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_is_alive() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut body = test_body(10.0, 10.0, &mut rng);
        assert!(body.is_alive());
        body.age = 1000;
        assert!(!body.is_alive());
        body.age = 0;
        body.energy = 0.0;
        assert!(!body.is_alive());
    }

    #[test]
    fn test_wall_bounce_reflects() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let config = Config::default();
        let kin = Kinematics::for_species(&config, Species::Bacteria);
        let mut body = test_body(3.0, 300.0, &mut rng);
        body.vx = -1.0;
        body.vy = 0.0;

        let hit = body.advance(2.0, Bounds::from_config(&config), &kin);
        assert!(hit);
        assert_eq!(body.x, kin.radius);
        assert!(body.vx > 0.0);
    }

    #[test]
    fn test_metabolism() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut body = test_body(400.0, 300.0, &mut rng);
        body.metabolize(1.0);
        assert_eq!(body.energy, 99.0);
        assert_eq!(body.age, 1);

        body.energy = 0.5;
        body.metabolize(1.0);
        assert_eq!(body.energy, 0.0);
    }

    #[test]
    fn test_gain_energy_clamped() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut body = test_body(400.0, 300.0, &mut rng);
        body.gain_energy(500.0);
        assert_eq!(body.energy, MAX_ENERGY);
    }

    proptest! {
        #[test]
        fn prop_wander_stays_in_arena(
            seed in any::<u64>(),
            x in 0.0f32..=800.0,
            y in 0.0f32..=600.0,
            steps in 1usize..200,
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let config = Config::default();
            let bounds = Bounds::from_config(&config);
            let kin = Kinematics::for_species(&config, Species::Phagocyte);
            let mut body = test_body(x, y, &mut rng);
            body.energy = MAX_ENERGY;
            for _ in 0..steps {
                let before = body.energy;
                body.wander(bounds, &kin, &mut rng);
                prop_assert!(bounds.contains(body.x, body.y));
                prop_assert!((body.speed() - 1.0).abs() < 1e-3);
                prop_assert!(body.energy <= before);
                prop_assert!((0.0..=MAX_ENERGY).contains(&body.energy));
            }
        }
    }
}
