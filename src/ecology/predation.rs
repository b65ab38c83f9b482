//! Predation system - capture resolution.

use crate::agents::{Agent, Bacteria, Phagocyte};
use crate::config::{Config, InteractionConfig};

/// Outcome of one capture pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaptureOutcome {
    /// Ids of the bacteria engulfed this tick, in capture order
    pub captured: Vec<String>,
    /// Energy gained by all hunters together
    pub energy_gained: f32,
}

impl CaptureOutcome {
    pub fn count(&self) -> usize {
        self.captured.len()
    }
}

/// Energy a hunter gets from one capture
pub fn capture_energy_gain(aggression: f32, config: &InteractionConfig) -> f32 {
    config.energy_gain * (1.0 + 0.5 * aggression)
}

/// Let every live phagocyte engulf every live, huntable bacterium within
/// capture range.
///
/// Phagocytes act in collection order, so a bacterium in reach of two hunters
/// goes to the earlier one. Captured bacteria are removed from `bacteria`.
pub fn resolve_captures(
    phagocytes: &mut [Phagocyte],
    bacteria: &mut Vec<Bacteria>,
    config: &Config,
) -> CaptureOutcome {
    let mut outcome = CaptureOutcome::default();
    if bacteria.is_empty() {
        return outcome;
    }

    let mut taken = vec![false; bacteria.len()];
    for phagocyte in phagocytes.iter_mut().filter(|p| p.is_alive()) {
        for (i, bacterium) in bacteria.iter().enumerate() {
            if taken[i] || !bacterium.is_alive() || !bacterium.capabilities().huntable {
                continue;
            }
            let before = phagocyte.body.energy;
            if phagocyte.capture_bacteria(bacterium, config) {
                taken[i] = true;
                outcome.energy_gained += phagocyte.body.energy - before;
                outcome.captured.push(bacterium.body.id.clone());
                log::trace!("{} captured {}", phagocyte.body.id, bacterium.body.id);
            }
        }
    }

    if !outcome.captured.is_empty() {
        let mut flags = taken.into_iter();
        bacteria.retain(|_| !flags.next().unwrap_or(false));
    }
    outcome
}
