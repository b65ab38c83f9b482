//! Glucose feeding and supply.

use crate::agents::{Agent, Bacteria, Glucose, IdGenerator, Species};
use crate::config::Config;
use rand::Rng;

/// Outcome of one feeding pass
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FeedingOutcome {
    /// Bacteria that ate this tick
    pub meals: usize,
    /// Energy transferred from glucose to bacteria
    pub energy: f32,
}

/// Each live bacterium eats from at most one glucose particle per tick: the
/// first active one, in collection order, within its reach.
pub fn resolve_feeding(bacteria: &mut [Bacteria], glucose: &mut [Glucose], config: &Config) -> FeedingOutcome {
    let mut outcome = FeedingOutcome::default();
    if glucose.is_empty() {
        return outcome;
    }
    let radius = config.movement.agent_size;

    for bacterium in bacteria.iter_mut().filter(|b| b.is_alive()) {
        let (x, y) = bacterium.position();
        let Some(particle) = glucose
            .iter_mut()
            .find(|g| g.is_active() && g.distance_to(x, y) <= g.reach(radius))
        else {
            continue;
        };

        let taken = particle.consume(config.glucose.bite);
        if taken > 0.0 {
            bacterium.body.gain_energy(taken);
            outcome.meals += 1;
            outcome.energy += taken;
        }
    }
    outcome
}

/// Drop consumed particles. Returns how many were removed.
pub fn remove_consumed(glucose: &mut Vec<Glucose>) -> usize {
    let before = glucose.len();
    glucose.retain(Glucose::is_active);
    before - glucose.len()
}

/// Seed a fresh glucose field.
pub fn seed_glucose<R: Rng + ?Sized>(config: &Config, ids: &mut IdGenerator, rng: &mut R) -> Vec<Glucose> {
    (0..config.glucose.initial_count)
        .map(|_| Glucose::random(ids.next_id(Species::Glucose), config, rng))
        .collect()
}

/// Top the field up by at most one particle. Returns whether one spawned.
pub fn replenish_glucose<R: Rng + ?Sized>(
    glucose: &mut Vec<Glucose>,
    config: &Config,
    ids: &mut IdGenerator,
    rng: &mut R,
) -> bool {
    if glucose.len() >= config.glucose.max_count {
        return false;
    }
    if rng.gen::<f32>() >= config.glucose.spawn_probability {
        return false;
    }
    glucose.push(Glucose::random(ids.next_id(Species::Glucose), config, rng));
    true
}
