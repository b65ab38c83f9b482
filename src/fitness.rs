//! Fitness functions for both species.
//!
//! Bacteria are rewarded for blending into the background, phagocytes for
//! being able to see through that camouflage. The two scores are coupled:
//! a phagocyte's fitness drops as the prey population gets harder to spot.

use crate::agents::{Agent, Bacteria, Body, Phagocyte, MAX_ENERGY};
use crate::color::{bacteria_color, color_distance, Rgb};
use crate::config::RankingConfig;
use crate::genetics::Genome;
use serde::{Deserialize, Serialize};

/// Score substituted when an agent's fitness cannot be computed.
pub const DEFAULT_FITNESS: f32 = 0.5;

/// Per-agent fitness failure
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitnessError {
    #[error("{id}: non-finite {field}")]
    NonFinite { id: String, field: &'static str },
    #[error("{id}: missing gene {gene}")]
    MissingGene { id: String, gene: &'static str },
}

/// `0.7 * (1 - d) + 0.3 * energy / 200`, floored at zero.
pub fn camouflage_fitness(color: Rgb, energy: f32, background: Rgb) -> f32 {
    let camouflage = 1.0 - color_distance(color, background);
    (0.7 * camouflage + 0.3 * (energy / MAX_ENERGY)).max(0.0)
}

/// Camouflage fitness of a bare genome, as used by the epoch evaluator.
pub fn genome_camouflage_fitness(genome: &Genome, energy: f32, background: Rgb) -> f32 {
    camouflage_fitness(bacteria_color(genome.gene("color_gene")), energy, background)
}

pub fn bacteria_fitness(body: &Body, background: Rgb) -> Result<f32, FitnessError> {
    if !body.energy.is_finite() {
        return Err(FitnessError::NonFinite {
            id: body.id.clone(),
            field: "energy",
        });
    }
    if body.genome.get("color_gene").is_some_and(|g| !g.is_finite()) {
        return Err(FitnessError::NonFinite {
            id: body.id.clone(),
            field: "color_gene",
        });
    }
    Ok(camouflage_fitness(body.color, body.energy, background))
}

/// How attractive a bacterium is as prey, in [0, 1].
///
/// Conspicuous, weak and old bacteria score highest.
pub fn vulnerability_score(
    color: Rgb,
    energy: f32,
    age: u32,
    background: Rgb,
    weights: &RankingConfig,
) -> f32 {
    let exposure = color_distance(color, background);
    let weakness = 1.0 - (energy / MAX_ENERGY).clamp(0.0, 1.0);
    let senescence = if weights.age_horizon == 0 {
        1.0
    } else {
        (age as f32 / weights.age_horizon as f32).min(1.0)
    };
    let score = weights.color_weight * exposure
        + weights.energy_weight * weakness
        + weights.age_weight * senescence;
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Phagocyte fitness from its genes and energy.
///
/// With prey present the score is blended with a detection-success term that
/// shrinks as the average bacterium gets better camouflaged.
pub fn predation_fitness(genome: &Genome, energy: f32, avg_bacteria_fitness: Option<f32>) -> f32 {
    let sensitivity = genome.gene("sensitivity_gene");
    let aggression = genome.gene("aggression_gene");

    let base = 0.6 * sensitivity + 0.4 * aggression;
    let mut fitness = 0.6 * base + 0.4 * (energy / MAX_ENERGY);

    if let Some(avg) = avg_bacteria_fitness {
        let detection_success = (1.0 - avg * (1.0 - sensitivity * aggression)).max(0.0);
        fitness = 0.5 * fitness + 0.5 * detection_success;
    }
    fitness.max(0.0)
}

pub fn phagocyte_fitness(body: &Body, avg_bacteria_fitness: Option<f32>) -> Result<f32, FitnessError> {
    if !body.energy.is_finite() {
        return Err(FitnessError::NonFinite {
            id: body.id.clone(),
            field: "energy",
        });
    }
    for gene in ["sensitivity_gene", "aggression_gene"] {
        match body.genome.get(gene) {
            None => {
                return Err(FitnessError::MissingGene {
                    id: body.id.clone(),
                    gene,
                })
            }
            Some(v) if !v.is_finite() => {
                return Err(FitnessError::NonFinite {
                    id: body.id.clone(),
                    field: gene,
                })
            }
            Some(_) => {}
        }
    }
    Ok(predation_fitness(&body.genome, body.energy, avg_bacteria_fitness))
}

/// Mean of the finite values, `None` when there are none.
pub fn mean<I: IntoIterator<Item = f32>>(values: I) -> Option<f32> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0f32, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f32)
}

/// Max / mean / min of a population's fitness
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitnessSummary {
    pub max: f32,
    pub avg: f32,
    pub min: f32,
}

impl FitnessSummary {
    /// Summarise the finite values; all zeros when there are none.
    pub fn from_values<I: IntoIterator<Item = f32>>(values: I) -> Self {
        let finite: Vec<f32> = values.into_iter().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self::default();
        }
        let max = finite.iter().copied().fold(f32::MIN, f32::max);
        let min = finite.iter().copied().fold(f32::MAX, f32::min);
        let avg = finite.iter().sum::<f32>() / finite.len() as f32;
        Self { max, avg, min }
    }

    pub fn of<A: Agent>(agents: &[A]) -> Self {
        Self::from_values(agents.iter().map(|a| a.fitness()))
    }
}

/// How closely matched the two populations currently are
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CoevolutionBalance {
    pub bacteria: FitnessSummary,
    pub phagocytes: FitnessSummary,
    /// `1 - |avg_bacteria - avg_phagocytes|`; 1.0 is a perfect arms race
    pub coupling: f32,
}

pub fn coevolution_balance(bacteria: &[Bacteria], phagocytes: &[Phagocyte]) -> CoevolutionBalance {
    let b = FitnessSummary::of(bacteria);
    let p = FitnessSummary::of(phagocytes);
    CoevolutionBalance {
        bacteria: b,
        phagocytes: p,
        coupling: (1.0 - (b.avg - p.avg).abs()).clamp(0.0, 1.0),
    }
}
