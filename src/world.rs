//! World simulation engine - main simulation loop.

use crate::agents::{Agent, Bacteria, Bounds, Glucose, IdGenerator, Phagocyte, Species};
use crate::config::{Config, ParameterUpdate};
use crate::ecology::{feeding, predation};
use crate::evolution::{EvolutionEngine, EvolutionError, Individual};
use crate::fitness::{self, FitnessSummary, DEFAULT_FITNESS};
use crate::population::{self, CullReport};
use crate::ranking::{RankingCache, TargetingView};
use crate::shared::SimState;
use crate::snapshot::{Parameters, PerSpecies, Status, WorldSnapshot};
use crate::stats::{RunSummary, StatisticsReport, Stats, StatsLedger};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

/// A pipeline stage failed and the step was rolled back
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimError {
    #[error("coevolution epoch failed: {0}")]
    Evolution(#[from] EvolutionError),
}

/// Population sizes around a coevolution epoch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EpochReport {
    pub bacteria_before: usize,
    pub bacteria_after: usize,
    pub phagocytes_before: usize,
    pub phagocytes_after: usize,
    /// Random individuals added to small populations
    pub padded: usize,
}

/// What happened during one step
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StepReport {
    pub generation: u64,
    /// False when the world was not running
    pub executed: bool,
    pub captures: usize,
    pub meals: usize,
    pub bacteria_births: usize,
    pub phagocyte_births: usize,
    pub fitness_failures: usize,
    pub epoch: Option<EpochReport>,
    pub dead_removed: usize,
    /// Agents dropped for inconsistent or non-finite state
    pub sanitized: usize,
    pub glucose_spawned: bool,
    pub culled: CullReport,
    /// Set when the step was rolled back
    pub error: Option<String>,
}

/// Populations and bookkeeping captured at step entry
struct Rollback {
    bacteria: Vec<Bacteria>,
    phagocytes: Vec<Phagocyte>,
    glucose: Vec<Glucose>,
    stats: StatsLedger,
    ranking: RankingCache,
    ids: IdGenerator,
}

/// The simulation world
pub struct World {
    // Population
    pub bacteria: Vec<Bacteria>,
    pub phagocytes: Vec<Phagocyte>,
    pub glucose: Vec<Glucose>,

    // State
    pub generation: u64,
    state: SimState,

    // Configuration
    config: Config,

    // Statistics
    pub stats: StatsLedger,
    last_report: StepReport,
    started_at: Instant,

    // Evolution
    pub evolution_engine: EvolutionEngine,
    ranking: RankingCache,

    // ID generation
    ids: IdGenerator,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl World {
    /// Create a new world with a random seed
    pub fn new(config: Config) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    /// Create a new world with a specific seed
    pub fn new_with_seed(config: Config, seed: u64) -> Self {
        let mut world = Self::from_populations(config, seed, Vec::new(), Vec::new(), Vec::new());
        world.populate();
        log::info!(
            "World created: seed={}, bacteria={}, phagocytes={}, glucose={}",
            seed,
            world.bacteria.len(),
            world.phagocytes.len(),
            world.glucose.len()
        );
        world
    }

    /// Build a world around hand-placed populations.
    ///
    /// Fresh ids continue after the highest numeric suffix already in use.
    pub fn from_populations(
        config: Config,
        seed: u64,
        bacteria: Vec<Bacteria>,
        phagocytes: Vec<Phagocyte>,
        glucose: Vec<Glucose>,
    ) -> Self {
        let ids = IdGenerator::after_existing(
            bacteria
                .iter()
                .map(|b| b.body.id.as_str())
                .chain(phagocytes.iter().map(|p| p.body.id.as_str()))
                .chain(glucose.iter().map(|g| g.id.as_str())),
        );
        Self {
            bacteria,
            phagocytes,
            glucose,
            generation: 0,
            state: SimState::Running,
            stats: StatsLedger::new(config.logging.history_length),
            last_report: StepReport::default(),
            started_at: Instant::now(),
            evolution_engine: EvolutionEngine::from_config(&config),
            ranking: RankingCache::new(config.ranking.update_frequency),
            ids,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            config,
        }
    }

    fn populate(&mut self) {
        let energy = self.config.evolution.baseline_energy;
        for _ in 0..self.config.population.initial_bacteria {
            let id = self.ids.next_id(Species::Bacteria);
            self.bacteria.push(Bacteria::random(id, energy, &self.config, &mut self.rng));
        }
        for _ in 0..self.config.population.initial_phagocytes {
            let id = self.ids.next_id(Species::Phagocyte);
            self.phagocytes.push(Phagocyte::random(id, energy, &self.config, &mut self.rng));
        }
        self.glucose = feeding::seed_glucose(&self.config, &mut self.ids, &mut self.rng);
    }

    /// Run a single simulation step.
    ///
    /// Failures are logged and rolled back; the world stays steppable.
    pub fn step(&mut self) {
        if let Err(e) = self.try_step() {
            log::error!("generation {}: {}; step rolled back", self.generation, e);
        }
    }

    /// Run a single simulation step, reporting stage failures.
    ///
    /// A no-op unless running. On error every population, the statistics and
    /// the ranking cache are restored to their state at step entry; only the
    /// generation counter keeps its increment.
    pub fn try_step(&mut self) -> Result<StepReport, SimError> {
        if self.state != SimState::Running {
            return Ok(StepReport {
                generation: self.generation,
                ..Default::default()
            });
        }

        let started = Instant::now();
        self.generation += 1;
        let rollback = self.checkpoint();
        let mut report = StepReport {
            generation: self.generation,
            executed: true,
            ..Default::default()
        };

        match self.run_pipeline(&mut report, started) {
            Ok(()) => {
                self.last_report = report.clone();
                Ok(report)
            }
            Err(e) => {
                self.restore(rollback);
                self.stats.counters.failed_steps += 1;
                report.error = Some(e.to_string());
                self.last_report = report;
                Err(e)
            }
        }
    }

    fn run_pipeline(&mut self, report: &mut StepReport, started: Instant) -> Result<(), SimError> {
        // Phase 1: Movement
        self.move_agents();

        // Phase 2: Reproduction cooldowns
        for b in self.bacteria.iter_mut() {
            b.tick_cooldown();
        }

        // Phase 3: Interactions
        let captures = predation::resolve_captures(&mut self.phagocytes, &mut self.bacteria, &self.config);
        let meals = feeding::resolve_feeding(&mut self.bacteria, &mut self.glucose, &self.config);
        report.captures = captures.count();
        report.meals = meals.meals;
        self.stats.counters.total_captures += captures.count() as u64;
        self.stats.counters.glucose_consumed += meals.meals as u64;
        self.stats.counters.glucose_energy += meals.energy as f64;

        // Phase 4: Fitness
        report.fitness_failures = self.update_fitness();

        // Phase 5: Asexual reproduction
        self.handle_reproduction(report);

        // Phase 6: Coevolution epoch
        let epoch_length = self.config.evolution.generations_per_epoch.max(1);
        if self.generation % epoch_length == 0 {
            report.epoch = Some(self.coevolution_step()?);
        }

        // Phase 7: Remove dead and top up glucose
        report.dead_removed = self.remove_dead();
        report.glucose_spawned =
            feeding::replenish_glucose(&mut self.glucose, &self.config, &mut self.ids, &mut self.rng);

        // Phase 8: Drop inconsistent agents
        report.sanitized = retain_consistent(&mut self.bacteria) + retain_consistent(&mut self.phagocytes);
        if report.sanitized > 0 {
            log::warn!("removed {} agents with invalid state", report.sanitized);
        }

        // Phase 9: Update statistics
        self.update_stats(report, started.elapsed());

        // Phase 10: Population caps
        report.culled = population::control_population_size(
            &mut self.bacteria,
            &mut self.phagocytes,
            self.config.population.max_population,
            &mut self.rng,
        );
        self.stats.counters.culled +=
            (report.culled.bacteria_culled + report.culled.phagocytes_culled) as u64;

        Ok(())
    }

    fn move_agents(&mut self) {
        let bounds = Bounds::from_config(&self.config);
        let background = self.config.world.background_color;

        for b in self.bacteria.iter_mut().filter(|b| b.is_alive() && b.capabilities().movable) {
            b.move_in(bounds, &self.config, &mut self.rng);
        }

        if !self.phagocytes.iter().any(|p| p.is_alive()) {
            return;
        }
        self.ranking
            .ensure_fresh(self.generation, &self.bacteria, background, &self.config);
        let view = TargetingView::new(&self.bacteria, &self.ranking, background);
        for p in self.phagocytes.iter_mut().filter(|p| p.is_alive() && p.capabilities().movable) {
            p.move_with(bounds, &self.config, &view, &mut self.rng);
        }
    }

    /// Recompute fitness for both species. Returns the number of agents that
    /// fell back to the default score.
    fn update_fitness(&mut self) -> usize {
        let background = self.config.world.background_color;
        let mut failures = 0;

        for b in self.bacteria.iter_mut() {
            if let Err(e) = b.calculate_fitness(background) {
                log::debug!("fitness fallback: {}", e);
                b.body.fitness = DEFAULT_FITNESS;
                failures += 1;
            }
        }

        let avg_bacteria = fitness::mean(
            self.bacteria
                .iter()
                .filter(|b| b.is_alive())
                .map(|b| b.body.fitness),
        );
        for p in self.phagocytes.iter_mut() {
            if let Err(e) = p.calculate_fitness(avg_bacteria) {
                log::debug!("fitness fallback: {}", e);
                p.body.fitness = DEFAULT_FITNESS;
                failures += 1;
            }
        }

        self.stats.counters.fitness_failures += failures as u64;
        failures
    }

    fn handle_reproduction(&mut self, report: &mut StepReport) {
        let background = self.config.world.background_color;

        let mut bacteria_children = Vec::new();
        for b in self.bacteria.iter_mut() {
            if !b.capabilities().reproducible || !b.can_reproduce_asexually(&self.config) {
                continue;
            }
            let id = self.ids.next_id(Species::Bacteria);
            if let Some(mut child) = b.reproduce_asexually(id, &self.config, &mut self.rng) {
                if child.calculate_fitness(background).is_err() {
                    child.body.fitness = DEFAULT_FITNESS;
                }
                bacteria_children.push(child);
            }
        }

        let avg_bacteria = fitness::mean(self.bacteria.iter().map(|b| b.body.fitness));
        let mut phagocyte_children = Vec::new();
        for p in self.phagocytes.iter_mut() {
            if !p.capabilities().reproducible || !p.can_reproduce(&self.config) {
                continue;
            }
            let id = self.ids.next_id(Species::Phagocyte);
            if let Some(mut child) = p.reproduce(id, &self.config, &mut self.rng) {
                if child.calculate_fitness(avg_bacteria).is_err() {
                    child.body.fitness = DEFAULT_FITNESS;
                }
                phagocyte_children.push(child);
            }
        }

        report.bacteria_births = bacteria_children.len();
        report.phagocyte_births = phagocyte_children.len();
        let births = (report.bacteria_births + report.phagocyte_births) as u64;
        self.stats.counters.bacteria_births += report.bacteria_births as u64;
        self.stats.counters.phagocyte_births += report.phagocyte_births as u64;
        self.stats.counters.total_reproductions += births;

        self.bacteria.extend(bacteria_children);
        self.phagocytes.extend(phagocyte_children);
    }

    /// Replace both populations with the next GA generation.
    ///
    /// Phagocytes are scored against the bacteria as they were before the
    /// epoch. Nothing is replaced unless both species evolve successfully.
    fn coevolution_step(&mut self) -> Result<EpochReport, SimError> {
        let background = self.config.world.background_color;
        let baseline = self.config.evolution.baseline_energy;

        let bacteria_pop: Vec<Individual> = self
            .bacteria
            .iter()
            .filter(|b| b.is_alive())
            .map(|b| Individual::with_fitness(b.body.genome.clone(), b.body.fitness))
            .collect();
        let phagocyte_pop: Vec<Individual> = self
            .phagocytes
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| Individual::with_fitness(p.body.genome.clone(), p.body.fitness))
            .collect();
        let pre_epoch_avg = fitness::mean(bacteria_pop.iter().filter_map(|i| i.fitness));

        let mut report = EpochReport {
            bacteria_before: self.bacteria.len(),
            phagocytes_before: self.phagocytes.len(),
            ..Default::default()
        };

        let (next_bacteria, padded_b) = self.evolve_species(Species::Bacteria, bacteria_pop, |g| {
            fitness::genome_camouflage_fitness(g, baseline, background)
        })?;
        let (next_phagocytes, padded_p) = self.evolve_species(Species::Phagocyte, phagocyte_pop, |g| {
            fitness::predation_fitness(g, baseline, pre_epoch_avg)
        })?;

        let bounds = Bounds::from_config(&self.config);
        let mut bacteria = Vec::with_capacity(next_bacteria.len());
        for ind in next_bacteria {
            let id = self.ids.next_id(Species::Bacteria);
            let (x, y) = bounds.random_point(&mut self.rng);
            let mut b = Bacteria::new(id, x, y, ind.genome, baseline, &self.config, &mut self.rng);
            b.body.fitness = ind.fitness.unwrap_or(DEFAULT_FITNESS);
            bacteria.push(b);
        }
        let mut phagocytes = Vec::with_capacity(next_phagocytes.len());
        for ind in next_phagocytes {
            let id = self.ids.next_id(Species::Phagocyte);
            let (x, y) = bounds.random_point(&mut self.rng);
            let mut p = Phagocyte::new(id, x, y, ind.genome, baseline, &self.config, &mut self.rng);
            p.body.fitness = ind.fitness.unwrap_or(DEFAULT_FITNESS);
            phagocytes.push(p);
        }

        self.bacteria = bacteria;
        self.phagocytes = phagocytes;
        // Every id changed
        self.ranking.clear();
        self.stats.counters.epochs += 1;

        report.bacteria_after = self.bacteria.len();
        report.phagocytes_after = self.phagocytes.len();
        report.padded = padded_b + padded_p;
        log::info!(
            "Epoch at generation {}: bacteria {} -> {}, phagocytes {} -> {}",
            self.generation,
            report.bacteria_before,
            report.bacteria_after,
            report.phagocytes_before,
            report.phagocytes_after
        );
        Ok(report)
    }

    fn evolve_species<F>(
        &mut self,
        species: Species,
        population: Vec<Individual>,
        evaluate: F,
    ) -> Result<(Vec<Individual>, usize), SimError>
    where
        F: FnMut(&crate::genetics::Genome) -> f32,
    {
        match self
            .evolution_engine
            .evolve(species, population, evaluate, &mut self.rng)
        {
            Ok(outcome) => Ok((outcome.population, outcome.padded)),
            Err(EvolutionError::EmptyPopulation) => {
                log::debug!("{:?} extinct, nothing to evolve", species);
                Ok((Vec::new(), 0))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove dead agents and consumed glucose
    fn remove_dead(&mut self) -> usize {
        let before = self.bacteria.len() + self.phagocytes.len();
        self.bacteria.retain(|b| b.is_alive());
        self.phagocytes.retain(|p| p.is_alive());
        let removed = before - self.bacteria.len() - self.phagocytes.len();
        removed + feeding::remove_consumed(&mut self.glucose)
    }

    fn update_stats(&mut self, report: &StepReport, elapsed: Duration) {
        let balance = fitness::coevolution_balance(&self.bacteria, &self.phagocytes);
        let mut stats = Stats {
            generation: self.generation,
            bacteria: self.bacteria.len(),
            phagocytes: self.phagocytes.len(),
            glucose: self.glucose.len(),
            avg_vulnerability: self.ranking.average_score().unwrap_or(0.0),
            ranking_size: self.ranking.len(),
            captures: report.captures,
            births: report.bacteria_births + report.phagocyte_births,
            meals: report.meals,
            generation_time_ms: elapsed.as_secs_f64() * 1000.0,
            ..Default::default()
        };
        stats.set_balance(&balance);

        let interval = self.config.logging.stats_interval;
        if interval > 0 && self.generation % interval == 0 {
            log::debug!("{}", stats.summary());
        }
        self.stats.record(stats);
    }

    fn checkpoint(&self) -> Rollback {
        Rollback {
            bacteria: self.bacteria.clone(),
            phagocytes: self.phagocytes.clone(),
            glucose: self.glucose.clone(),
            stats: self.stats.clone(),
            ranking: self.ranking.clone(),
            ids: self.ids.clone(),
        }
    }

    fn restore(&mut self, rollback: Rollback) {
        self.bacteria = rollback.bacteria;
        self.phagocytes = rollback.phagocytes;
        self.glucose = rollback.glucose;
        self.stats = rollback.stats;
        self.ranking = rollback.ranking;
        self.ids = rollback.ids;
    }

    /// Run for a given number of steps
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    // State machine

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SimState::Running
    }

    pub fn pause(&mut self) {
        if self.state == SimState::Running {
            self.state = SimState::Paused;
            log::info!("Simulation paused at generation {}", self.generation);
        }
    }

    pub fn resume(&mut self) {
        if self.state == SimState::Paused {
            self.state = SimState::Running;
            log::info!("Simulation resumed at generation {}", self.generation);
        }
    }

    pub fn stop(&mut self) {
        self.state = SimState::Stopped;
        log::info!("Simulation stopped at generation {}", self.generation);
    }

    /// Fresh populations and statistics under the current config.
    pub fn reset(&mut self) {
        self.bacteria.clear();
        self.phagocytes.clear();
        self.glucose.clear();
        self.populate();
        self.generation = 0;
        self.stats = StatsLedger::new(self.config.logging.history_length);
        self.ranking.clear();
        self.last_report = StepReport::default();
        self.started_at = Instant::now();
        self.state = SimState::Running;
        log::info!(
            "World reset: bacteria={}, phagocytes={}",
            self.bacteria.len(),
            self.phagocytes.len()
        );
    }

    // Queries

    pub fn get_state(&self) -> WorldSnapshot {
        WorldSnapshot::from_world(self)
    }

    pub fn get_statistics(&self) -> StatisticsReport {
        let best = self.best_fitness();
        let average = self.average_fitness();
        StatisticsReport {
            summary: RunSummary {
                generation: self.generation,
                state: self.state,
                run_time_secs: self.run_time().as_secs_f64(),
                bacteria: self.bacteria.len(),
                phagocytes: self.phagocytes.len(),
                glucose: self.glucose.len(),
                best_fitness: best.bacteria.max(best.phagocytes),
                average_fitness: fitness::mean([average.bacteria, average.phagocytes]).unwrap_or(0.0),
                counters: self.stats.counters.clone(),
            },
            latest: self.stats.current.clone(),
            history: self.stats.history.clone(),
            performance: self.stats.performance(),
        }
    }

    pub fn get_parameters(&self) -> Parameters {
        Parameters::from_world(self)
    }

    pub fn get_status(&self) -> Status {
        Status::from_world(self)
    }

    /// Highest fitness per species, 0 for an empty population
    pub fn best_fitness(&self) -> PerSpecies<f32> {
        PerSpecies {
            bacteria: FitnessSummary::of(&self.bacteria).max,
            phagocytes: FitnessSummary::of(&self.phagocytes).max,
        }
    }

    /// Mean fitness per species, 0 for an empty population
    pub fn average_fitness(&self) -> PerSpecies<f32> {
        PerSpecies {
            bacteria: fitness::mean(self.bacteria.iter().map(|b| b.body.fitness)).unwrap_or(0.0),
            phagocytes: fitness::mean(self.phagocytes.iter().map(|p| p.body.fitness)).unwrap_or(0.0),
        }
    }

    /// Targets for the phagocyte at `index`, nearest first.
    ///
    /// Refreshes the ranking first if it has gone stale.
    pub fn get_ranked_bacteria_in_range(&mut self, index: usize, radius: f32) -> Vec<&Bacteria> {
        let background = self.config.world.background_color;
        self.ranking
            .ensure_fresh(self.generation, &self.bacteria, background, &self.config);
        let Some(phagocyte) = self.phagocytes.get(index) else {
            return Vec::new();
        };
        let view = TargetingView::new(&self.bacteria, &self.ranking, background);
        view.ranked_bacteria_in_range(phagocyte, radius)
            .into_iter()
            .map(|i| &self.bacteria[i])
            .collect()
    }

    // Parameters

    /// Apply a parameter update, producing a new config snapshot.
    pub fn update_parameters(&mut self, update: &ParameterUpdate) {
        if update.is_empty() {
            return;
        }
        self.config = update.apply(&self.config);
        self.evolution_engine.update_parameters(&self.config.evolution);
        self.ranking
            .set_update_frequency(self.config.ranking.update_frequency);
        log::info!("Parameters updated: {:?}", update);
    }

    /// Apply a JSON parameter map; unrecognised keys are ignored.
    pub fn update_parameters_json(&mut self, value: &serde_json::Value) -> Result<(), serde_json::Error> {
        let update = ParameterUpdate::from_json(value)?;
        self.update_parameters(&update);
        Ok(())
    }

    // Accessors

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ranking(&self) -> &RankingCache {
        &self.ranking
    }

    pub fn last_report(&self) -> &StepReport {
        &self.last_report
    }

    pub fn run_time(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Live agents of both species
    pub fn population(&self) -> usize {
        self.bacteria.len() + self.phagocytes.len()
    }

    /// Check if both species are extinct
    pub fn is_extinct(&self) -> bool {
        self.bacteria.is_empty() && self.phagocytes.is_empty()
    }

    /// Get the seed used for this world
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// Keep agents whose species tag matches their collection and whose physical
/// state is finite. Returns how many were dropped.
fn retain_consistent<A: Agent>(agents: &mut Vec<A>) -> usize {
    let before = agents.len();
    agents.retain(|a| a.species() == A::expected_species() && a.body().has_finite_state());
    before - agents.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::Genome;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.population.initial_bacteria = 40;
        config.population.initial_phagocytes = 10;
        config
    }

    #[test]
    fn test_world_creation() {
        let config = test_config();
        let world = World::new(config.clone());

        assert_eq!(world.bacteria.len(), config.population.initial_bacteria);
        assert_eq!(world.phagocytes.len(), config.population.initial_phagocytes);
        assert_eq!(world.glucose.len(), config.glucose.initial_count);
        assert_eq!(world.generation, 0);
        assert_eq!(world.state(), SimState::Running);
    }

    #[test]
    fn test_world_step() {
        let mut world = World::new_with_seed(test_config(), 1);
        world.step();
        assert_eq!(world.generation, 1);
        assert!(world.last_report().executed);
        assert_eq!(world.stats.history.len(), 1);
    }

    #[test]
    fn test_world_run() {
        let mut world = World::new_with_seed(test_config(), 2);
        world.run(100);
        assert_eq!(world.generation, 100);
        assert!(world.bacteria.len() <= world.config().population.max_population);
        assert!(world.phagocytes.len() <= world.config().max_phagocytes());
    }

    #[test]
    fn test_ids_unique() {
        let mut world = World::new_with_seed(test_config(), 3);
        world.run(60);
        let mut ids: Vec<&str> = world
            .bacteria
            .iter()
            .map(|b| b.id())
            .chain(world.phagocytes.iter().map(|p| p.id()))
            .chain(world.glucose.iter().map(|g| g.id.as_str()))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_state_machine() {
        let mut world = World::new_with_seed(test_config(), 4);

        world.pause();
        assert_eq!(world.state(), SimState::Paused);
        world.step();
        assert_eq!(world.generation, 0);

        world.resume();
        world.step();
        assert_eq!(world.generation, 1);

        world.stop();
        world.resume();
        assert_eq!(world.state(), SimState::Stopped);
        world.step();
        assert_eq!(world.generation, 1);

        world.reset();
        assert_eq!(world.state(), SimState::Running);
        assert_eq!(world.generation, 0);
        assert!(world.stats.history.is_empty());
        assert!(world.ranking().computed_at().is_none());
    }

    #[test]
    fn test_pause_is_noop_when_stopped() {
        let mut world = World::new_with_seed(test_config(), 5);
        world.stop();
        world.pause();
        assert_eq!(world.state(), SimState::Stopped);
    }

    #[test]
    fn test_failed_epoch_rolls_back() {
        let mut config = test_config();
        config.evolution.generations_per_epoch = 3;
        let mut world = World::new_with_seed(config, 6);
        world.run(2);

        for b in world.bacteria.iter_mut() {
            b.body.genome.set("metabolism", f32::NAN);
        }
        let ids_before: Vec<String> = world.bacteria.iter().map(|b| b.body.id.clone()).collect();
        let history_before = world.stats.history.len();

        let result = world.try_step();
        assert!(matches!(
            result,
            Err(SimError::Evolution(EvolutionError::InvalidGene { .. }))
        ));
        assert_eq!(world.generation, 3);
        let ids_after: Vec<String> = world.bacteria.iter().map(|b| b.body.id.clone()).collect();
        assert_eq!(ids_before, ids_after);
        assert_eq!(world.stats.history.len(), history_before);
        assert_eq!(world.stats.counters.failed_steps, 1);
        assert!(world.last_report().error.is_some());

        // Still steppable once the bad gene is gone
        for b in world.bacteria.iter_mut() {
            b.body.genome.set("metabolism", 0.5);
        }
        world.step();
        assert_eq!(world.generation, 4);
        assert!(world.last_report().error.is_none());
    }

    #[test]
    fn test_fitness_failure_uses_default() {
        let mut world = World::new_with_seed(test_config(), 7);
        world.phagocytes[0].body.genome.remove("sensitivity_gene");
        let report = world.try_step().unwrap();
        assert!(report.fitness_failures >= 1);
        assert_eq!(world.stats.counters.fitness_failures as usize, report.fitness_failures);
    }

    #[test]
    fn test_sanitize_drops_non_finite_agents() {
        let mut world = World::new_with_seed(test_config(), 8);
        world.bacteria[0].body.x = f32::NAN;
        let report = world.try_step().unwrap();
        assert!(report.sanitized >= 1);
        assert!(world.bacteria.iter().all(|b| b.body.x.is_finite()));
    }

    #[test]
    fn test_update_parameters() {
        let mut world = World::new_with_seed(test_config(), 9);
        let json = serde_json::json!({
            "mutation_rate": 0.3,
            "ranking_update_frequency": 2,
            "flux_capacitor": 88,
        });
        world.update_parameters_json(&json).unwrap();
        assert_eq!(world.config().evolution.mutation_rate, 0.3);
        assert_eq!(world.evolution_engine.mutation_rate, 0.3);
        assert_eq!(world.ranking().update_frequency(), 2);
        assert_eq!(world.get_parameters().mutation_rate, 0.3);
    }

    #[test]
    fn test_ranked_bacteria_in_range() {
        let config = test_config();
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let hunter_genome = Genome::from_genes([("sensitivity_gene", 1.0), ("aggression_gene", 1.0)]);
        let phagocytes = vec![Phagocyte::new(
            "phagocyte_0".into(),
            100.0,
            100.0,
            hunter_genome,
            100.0,
            &config,
            &mut rng,
        )];
        let bacteria = vec![
            Bacteria::new("bacteria_1".into(), 140.0, 100.0, Genome::new(), 100.0, &config, &mut rng),
            Bacteria::new("bacteria_2".into(), 120.0, 100.0, Genome::new(), 100.0, &config, &mut rng),
            Bacteria::new("bacteria_3".into(), 500.0, 100.0, Genome::new(), 100.0, &config, &mut rng),
        ];
        let mut world = World::from_populations(config, 10, bacteria, phagocytes, Vec::new());

        let hits: Vec<&str> = world
            .get_ranked_bacteria_in_range(0, 50.0)
            .into_iter()
            .map(|b| b.id())
            .collect();
        assert_eq!(hits, vec!["bacteria_2", "bacteria_1"]);
        assert!(world.get_ranked_bacteria_in_range(5, 50.0).is_empty());
    }

    #[test]
    fn test_from_populations_continues_ids() {
        let config = test_config();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let bacteria = vec![Bacteria::random("bacteria_41".into(), 190.0, &config, &mut rng)];
        let mut world = World::from_populations(config, 11, bacteria, Vec::new(), Vec::new());
        world.step();
        let fresh: Vec<&str> = world.bacteria.iter().map(|b| b.id()).filter(|id| *id != "bacteria_41").collect();
        for id in fresh {
            let n: u64 = id.trim_start_matches("bacteria_").parse().unwrap();
            assert!(n > 41);
        }
    }
}
