//! Evolution mechanics and selection.
//!
//! Every coevolution epoch each species goes through one generation of a
//! plain genetic algorithm: elitism, selection, uniform crossover and
//! Gaussian mutation over named genes.

use crate::agents::Species;
use crate::config::{Config, EvolutionConfig};
use crate::genetics::Genome;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvolutionError {
    #[error("cannot evolve an empty population")]
    EmptyPopulation,
    #[error("gene `{gene}` holds a non-finite value")]
    InvalidGene { gene: String },
}

/// A genome with its (possibly stale) fitness
#[derive(Clone, Debug, PartialEq)]
pub struct Individual {
    pub genome: Genome,
    /// `None` until evaluated, and again after crossover or mutation
    pub fitness: Option<f32>,
}

impl Individual {
    pub fn new(genome: Genome) -> Self {
        Self { genome, fitness: None }
    }

    pub fn with_fitness(genome: Genome, fitness: f32) -> Self {
        Self {
            genome,
            fitness: fitness.is_finite().then_some(fitness),
        }
    }

    #[inline]
    fn score(&self) -> f32 {
        self.fitness.unwrap_or(0.0)
    }
}

/// Parent selection strategy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMethod {
    #[default]
    Tournament,
    Roulette,
    Rank,
}

/// Species-specific GA pressure
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeciesProfile {
    pub tournament_size: usize,
    pub rate_multiplier: f32,
    pub strength_multiplier: f32,
}

/// Result of evolving one species
#[derive(Clone, Debug, PartialEq)]
pub struct EpochOutcome {
    pub population: Vec<Individual>,
    /// Random individuals added to reach the minimum population
    pub padded: usize,
    /// Fitness evaluations performed
    pub evaluations: usize,
}

/// Evolution engine for managing population genetics
#[derive(Clone, Debug)]
pub struct EvolutionEngine {
    pub mutation_rate: f32,
    pub crossover_rate: f32,
    pub mutation_strength: f32,
    pub gene_swap_probability: f32,
    pub elitism: usize,
    pub min_population: usize,
    pub selection: SelectionMethod,
    bacteria: SpeciesProfile,
    phagocytes: SpeciesProfile,
}

impl EvolutionEngine {
    /// Create evolution engine from config
    pub fn from_config(config: &Config) -> Self {
        let e = &config.evolution;
        Self {
            mutation_rate: e.mutation_rate,
            crossover_rate: e.crossover_rate,
            mutation_strength: e.mutation_strength,
            gene_swap_probability: e.gene_swap_probability,
            elitism: e.elitism,
            min_population: e.min_population,
            selection: SelectionMethod::Tournament,
            bacteria: SpeciesProfile {
                tournament_size: e.bacteria_tournament_size,
                rate_multiplier: 1.0,
                strength_multiplier: 1.0,
            },
            phagocytes: SpeciesProfile {
                tournament_size: e.phagocyte_tournament_size,
                rate_multiplier: e.phagocyte_rate_multiplier,
                strength_multiplier: e.phagocyte_strength_multiplier,
            },
        }
    }

    /// Pick up new rates after a parameter update.
    pub fn update_parameters(&mut self, evolution: &EvolutionConfig) {
        self.mutation_rate = evolution.mutation_rate.clamp(0.0, 1.0);
        self.crossover_rate = evolution.crossover_rate.clamp(0.0, 1.0);
        self.mutation_strength = evolution.mutation_strength.clamp(0.01, 1.0);
    }

    pub fn profile(&self, species: Species) -> SpeciesProfile {
        match species {
            Species::Phagocyte => self.phagocytes,
            _ => self.bacteria,
        }
    }

    /// Reject populations carrying NaN or infinite genes.
    pub fn validate(population: &[Individual]) -> Result<(), EvolutionError> {
        match population.iter().find_map(|ind| ind.genome.first_invalid()) {
            Some(gene) => Err(EvolutionError::InvalidGene { gene: gene.to_string() }),
            None => Ok(()),
        }
    }

    /// Select `count` individuals (cloned) for reproduction.
    pub fn select<R: Rng + ?Sized>(
        &self,
        population: &[Individual],
        count: usize,
        tournament_size: usize,
        rng: &mut R,
    ) -> Vec<Individual> {
        if population.is_empty() {
            return Vec::new();
        }
        match self.selection {
            SelectionMethod::Tournament => (0..count)
                .filter_map(|_| {
                    population
                        .choose_multiple(rng, tournament_size.clamp(1, population.len()))
                        .max_by(|a, b| a.score().partial_cmp(&b.score()).unwrap_or(Ordering::Equal))
                        .cloned()
                })
                .collect(),
            SelectionMethod::Roulette => {
                let weights: Vec<f32> = population.iter().map(|i| i.score().max(0.0)).collect();
                Self::weighted_pick(population, &weights, count, rng)
            }
            SelectionMethod::Rank => {
                let mut order: Vec<usize> = (0..population.len()).collect();
                order.sort_by(|&a, &b| population[a].score().total_cmp(&population[b].score()));
                let mut weights = vec![0.0f32; population.len()];
                for (rank, &idx) in order.iter().enumerate() {
                    weights[idx] = (rank + 1) as f32;
                }
                Self::weighted_pick(population, &weights, count, rng)
            }
        }
    }

    fn weighted_pick<R: Rng + ?Sized>(
        population: &[Individual],
        weights: &[f32],
        count: usize,
        rng: &mut R,
    ) -> Vec<Individual> {
        match WeightedIndex::new(weights) {
            Ok(dist) => (0..count).map(|_| population[dist.sample(rng)].clone()).collect(),
            // All-zero fitness: fall back to uniform choice
            Err(_) => (0..count)
                .filter_map(|_| population.choose(rng).cloned())
                .collect(),
        }
    }

    /// Best `count` individuals, highest fitness first.
    pub fn get_elites(&self, population: &[Individual], count: usize) -> Vec<Individual> {
        let mut sorted: Vec<&Individual> = population.iter().collect();
        sorted.sort_by(|a, b| b.score().total_cmp(&a.score()));
        sorted.into_iter().take(count).cloned().collect()
    }

    /// Run one generation for `species`.
    ///
    /// Non-empty populations smaller than `min_population` are padded with
    /// random genomes first; an empty population is an error the caller
    /// treats as extinction.
    pub fn evolve<R, F>(
        &self,
        species: Species,
        mut population: Vec<Individual>,
        mut evaluate: F,
        rng: &mut R,
    ) -> Result<EpochOutcome, EvolutionError>
    where
        R: Rng + ?Sized,
        F: FnMut(&Genome) -> f32,
    {
        if population.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        Self::validate(&population)?;

        let padded = self.min_population.saturating_sub(population.len());
        population.extend((0..padded).map(|_| Individual::new(Genome::random(species, rng))));

        let mut evaluations = 0;
        let mut evaluate_invalid = |individuals: &mut [Individual]| {
            for ind in individuals.iter_mut().filter(|i| i.fitness.is_none()) {
                let f = evaluate(&ind.genome);
                ind.fitness = Some(if f.is_finite() { f } else { 0.0 });
                evaluations += 1;
            }
        };
        evaluate_invalid(&mut population);

        let profile = self.profile(species);
        let size = population.len();
        let elites = self.get_elites(&population, self.elitism.min(size));
        let mut offspring = self.select(&population, size - elites.len(), profile.tournament_size, rng);

        for pair in offspring.chunks_mut(2) {
            if pair.len() < 2 || rng.gen::<f32>() >= self.crossover_rate {
                continue;
            }
            let (left, right) = pair.split_at_mut(1);
            if Genome::uniform_crossover(
                &mut left[0].genome,
                &mut right[0].genome,
                self.gene_swap_probability,
                rng,
            ) {
                left[0].fitness = None;
                right[0].fitness = None;
            }
        }

        let rate = (self.mutation_rate * profile.rate_multiplier).min(1.0);
        let sigma = self.mutation_strength * profile.strength_multiplier;
        for ind in offspring.iter_mut() {
            if ind.genome.mutate_gaussian(rate, sigma, rng) {
                ind.fitness = None;
            }
        }

        evaluate_invalid(&mut offspring);

        let mut next = elites;
        next.extend(offspring);
        log::debug!(
            "{:?} epoch: {} individuals ({} padded), {} evaluations",
            species,
            next.len(),
            padded,
            evaluations
        );
        Ok(EpochOutcome {
            population: next,
            padded,
            evaluations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    fn test_engine() -> EvolutionEngine {
        EvolutionEngine::from_config(&Config::default())
    }

    fn scored(value: f32) -> Individual {
        Individual::with_fitness(Genome::from_genes([("color_gene", value)]), value)
    }

    #[test]
    fn test_empty_population_is_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = test_engine().evolve(Species::Bacteria, Vec::new(), |_| 0.5, &mut rng);
        assert_eq!(result, Err(EvolutionError::EmptyPopulation));
    }

    #[test]
    fn test_invalid_gene_aborts() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut genome = Genome::random(Species::Bacteria, &mut rng);
        genome.set("metabolism", f32::INFINITY);
        let result = test_engine().evolve(
            Species::Bacteria,
            vec![Individual::new(genome)],
            |_| 0.5,
            &mut rng,
        );
        assert_eq!(
            result,
            Err(EvolutionError::InvalidGene {
                gene: "metabolism".into()
            })
        );
    }

    #[test]
    fn test_small_population_is_padded() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let outcome = test_engine()
            .evolve(Species::Phagocyte, vec![scored(0.4)], |_| 0.3, &mut rng)
            .unwrap();
        assert_eq!(outcome.population.len(), 10);
        assert_eq!(outcome.padded, 9);
        assert!(outcome.population.iter().all(|i| i.fitness.is_some()));
    }

    #[test]
    fn test_uniform_zero_fitness_still_evolves() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let population: Vec<Individual> = (0..6)
            .map(|_| Individual::with_fitness(Genome::random(Species::Bacteria, &mut rng), 0.0))
            .collect();
        let outcome = test_engine()
            .evolve(Species::Bacteria, population, |_| 0.0, &mut rng)
            .unwrap();
        assert_eq!(outcome.population.len(), 10);
        for ind in &outcome.population {
            assert!(ind.fitness.is_some_and(|f| f.is_finite()));
            assert!(ind.genome.iter().all(|(_, v)| (0.0..=1.0).contains(&v)));
        }
    }

    #[test]
    fn test_elites_survive() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let population: Vec<Individual> = (0..20).map(|i| scored(i as f32 / 20.0)).collect();
        let best = population[19].clone();
        let outcome = test_engine()
            .evolve(Species::Bacteria, population, |g| g.gene("color_gene"), &mut rng)
            .unwrap();
        assert_eq!(outcome.population.len(), 20);
        assert_eq!(outcome.population[0], best);
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let population: Vec<Individual> = (0..10).map(|i| scored(i as f32 / 10.0)).collect();
        let picks = test_engine().select(&population, 200, 5, &mut rng);
        let mean = picks.iter().map(|i| i.score()).sum::<f32>() / picks.len() as f32;
        assert!(mean > 0.45);
    }

    #[test]
    fn test_roulette_and_rank_selection() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut engine = test_engine();
        let population = vec![scored(0.0), scored(0.0), scored(1.0)];

        engine.selection = SelectionMethod::Roulette;
        let picks = engine.select(&population, 20, 3, &mut rng);
        assert!(picks.iter().all(|i| i.score() == 1.0));

        engine.selection = SelectionMethod::Rank;
        assert_eq!(engine.select(&population, 20, 3, &mut rng).len(), 20);

        // All-zero fitness falls back to uniform choice
        engine.selection = SelectionMethod::Roulette;
        let flat = vec![scored(0.0), scored(0.0)];
        assert_eq!(engine.select(&flat, 5, 3, &mut rng).len(), 5);
    }

    #[test]
    fn test_update_parameters_clamps() {
        let mut engine = test_engine();
        let mut e = EvolutionConfig::default();
        e.mutation_rate = 2.0;
        e.mutation_strength = 0.0;
        engine.update_parameters(&e);
        assert_eq!(engine.mutation_rate, 1.0);
        assert_eq!(engine.mutation_strength, 0.01);
    }
}
