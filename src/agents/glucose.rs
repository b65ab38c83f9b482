//! Glucose particles: static food that shrinks as it is eaten.

use super::body::Bounds;
use super::Species;
use crate::config::Config;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Glucose {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub initial_size: f32,
    pub energy: f32,
    pub initial_energy: f32,
    pub consumed: bool,
}

impl Glucose {
    pub fn new(id: String, x: f32, y: f32, size: f32, energy_per_size: f32) -> Self {
        let size = size.max(f32::MIN_POSITIVE);
        let energy = size * energy_per_size;
        Self {
            id,
            x,
            y,
            size,
            initial_size: size,
            energy,
            initial_energy: energy,
            consumed: energy <= 0.0,
        }
    }

    /// Random size at a random position.
    pub fn random<R: Rng + ?Sized>(id: String, config: &Config, rng: &mut R) -> Self {
        let g = &config.glucose;
        let (x, y) = Bounds::from_config(config).random_point(rng);
        let size = if g.max_size > g.min_size {
            rng.gen_range(g.min_size..=g.max_size)
        } else {
            g.min_size
        };
        Self::new(id, x, y, size, g.energy_per_size)
    }

    pub fn species(&self) -> Species {
        Species::Glucose
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        !self.consumed && self.energy > 0.0
    }

    /// Take up to `amount` energy. The particle shrinks in proportion and is
    /// marked consumed once empty. Returns the energy actually taken.
    pub fn consume(&mut self, amount: f32) -> f32 {
        if !self.is_active() || !(amount > 0.0) {
            return 0.0;
        }
        let taken = amount.min(self.energy);
        self.energy -= taken;
        if self.energy <= 0.0 {
            self.energy = 0.0;
            self.size = 0.0;
            self.consumed = true;
        } else {
            self.size = self.initial_size * (self.energy / self.initial_energy);
        }
        taken
    }

    /// Reach of the particle for a feeder of the given radius
    pub fn reach(&self, feeder_radius: f32) -> f32 {
        feeder_radius + self.size / 2.0
    }

    #[inline]
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_partial() {
        let mut g = Glucose::new("glucose_0".into(), 0.0, 0.0, 10.0, 5.0);
        assert_eq!(g.energy, 50.0);
        assert_eq!(g.consume(10.0), 10.0);
        assert_eq!(g.energy, 40.0);
        assert!((g.size - 8.0).abs() < 1e-5);
        assert!(g.is_active());
    }

    #[test]
    fn test_consume_to_empty() {
        let mut g = Glucose::new("glucose_0".into(), 0.0, 0.0, 2.0, 5.0);
        assert_eq!(g.consume(25.0), 10.0);
        assert!(g.consumed);
        assert_eq!(g.size, 0.0);
        assert!(!g.is_active());
        assert_eq!(g.consume(5.0), 0.0);
    }

    #[test]
    fn test_consumed_iff_empty() {
        let mut g = Glucose::new("glucose_0".into(), 0.0, 0.0, 3.0, 5.0);
        for _ in 0..10 {
            g.consume(4.0);
            assert_eq!(g.consumed, g.energy <= 0.0);
        }
    }
}
