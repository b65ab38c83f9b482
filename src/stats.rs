//! Statistics tracking for the simulation.

use crate::fitness::{CoevolutionBalance, FitnessSummary};
use crate::shared::SimState;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Statistics snapshot for a simulation step
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Generation the snapshot was taken at
    pub generation: u64,
    pub bacteria: usize,
    pub phagocytes: usize,
    pub glucose: usize,
    pub bacteria_fitness: FitnessSummary,
    pub phagocyte_fitness: FitnessSummary,
    /// `1 - |avg_bacteria - avg_phagocytes|`
    pub coupling: f32,
    /// Mean vulnerability over the cached ranking
    pub avg_vulnerability: f32,
    pub ranking_size: usize,
    /// Captures this step
    pub captures: usize,
    /// Births of both species this step
    pub births: usize,
    /// Glucose meals this step
    pub meals: usize,
    /// Wall time of the step (performance)
    pub generation_time_ms: f64,
}

impl Stats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, balance: &CoevolutionBalance) {
        self.bacteria_fitness = balance.bacteria;
        self.phagocyte_fitness = balance.phagocytes;
        self.coupling = balance.coupling;
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "G:{:6} | Bac:{:4} | Pha:{:4} | Glu:{:3} | Fit B:{:.3}/{:.3} P:{:.3}/{:.3} | Bal:{:.2} | Cap:{:2}",
            self.generation,
            self.bacteria,
            self.phagocytes,
            self.glucose,
            self.bacteria_fitness.avg,
            self.bacteria_fitness.max,
            self.phagocyte_fitness.avg,
            self.phagocyte_fitness.max,
            self.coupling,
            self.captures,
        )
    }
}

/// Cumulative counters since the last reset
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub total_captures: u64,
    pub total_reproductions: u64,
    pub bacteria_births: u64,
    pub phagocyte_births: u64,
    /// Glucose meals eaten
    pub glucose_consumed: u64,
    pub glucose_energy: f64,
    pub epochs: u64,
    /// Steps rolled back after a stage failure
    pub failed_steps: u64,
    /// Agents whose fitness fell back to the default
    pub fitness_failures: u64,
    /// Agents removed by the population cap
    pub culled: u64,
}

/// Fixed-capacity series, oldest values evicted first
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History<T> {
    values: VecDeque<T>,
    #[serde(skip)]
    capacity: usize,
}

impl<T: Clone> History<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        while self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.values.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.values.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.values.iter().cloned().collect()
    }

    /// The newest `n` values, oldest first
    pub fn tail(&self, n: usize) -> Vec<T> {
        let skip = self.values.len().saturating_sub(n);
        self.values.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Bounded histories of every tracked metric
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StatsHistory {
    pub max_fitness_bacteria: History<f32>,
    pub avg_fitness_bacteria: History<f32>,
    pub max_fitness_phagocytes: History<f32>,
    pub avg_fitness_phagocytes: History<f32>,
    pub population_bacteria: History<usize>,
    pub population_phagocytes: History<usize>,
    pub generation_times: History<f64>,
    pub avg_vulnerability: History<f32>,
    pub ranking_size: History<usize>,
    pub coevolution_balance: History<f32>,
}

impl StatsHistory {
    /// Create new history holding at most `capacity` points per series
    pub fn new(capacity: usize) -> Self {
        Self {
            max_fitness_bacteria: History::new(capacity),
            avg_fitness_bacteria: History::new(capacity),
            max_fitness_phagocytes: History::new(capacity),
            avg_fitness_phagocytes: History::new(capacity),
            population_bacteria: History::new(capacity),
            population_phagocytes: History::new(capacity),
            generation_times: History::new(capacity),
            avg_vulnerability: History::new(capacity),
            ranking_size: History::new(capacity),
            coevolution_balance: History::new(capacity),
        }
    }

    /// Record a stats snapshot
    pub fn record(&mut self, stats: &Stats) {
        self.max_fitness_bacteria.push(stats.bacteria_fitness.max);
        self.avg_fitness_bacteria.push(stats.bacteria_fitness.avg);
        self.max_fitness_phagocytes.push(stats.phagocyte_fitness.max);
        self.avg_fitness_phagocytes.push(stats.phagocyte_fitness.avg);
        self.population_bacteria.push(stats.bacteria);
        self.population_phagocytes.push(stats.phagocytes);
        self.generation_times.push(stats.generation_time_ms);
        self.avg_vulnerability.push(stats.avg_vulnerability);
        self.ranking_size.push(stats.ranking_size);
        self.coevolution_balance.push(stats.coupling);
    }

    /// Get (bacteria, phagocytes) population over time
    pub fn population_series(&self) -> Vec<(usize, usize)> {
        self.population_bacteria
            .iter()
            .copied()
            .zip(self.population_phagocytes.iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.population_bacteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.population_bacteria.is_empty()
    }
}

/// Running statistics owned by the world
#[derive(Clone, Debug, Default)]
pub struct StatsLedger {
    pub current: Stats,
    pub counters: Counters,
    pub history: StatsHistory,
}

impl StatsLedger {
    pub fn new(history_length: usize) -> Self {
        Self {
            current: Stats::new(),
            counters: Counters::default(),
            history: StatsHistory::new(history_length),
        }
    }

    pub fn record(&mut self, stats: Stats) {
        self.history.record(&stats);
        self.current = stats;
    }

    pub fn performance(&self) -> Performance {
        Performance::from_times(&self.history.generation_times)
    }
}

/// Step timing derived from the generation-time history
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Performance {
    pub avg_generation_ms: f64,
    pub steps_per_second: f64,
    /// The last 10 generation times, oldest first
    pub recent_generation_ms: Vec<f64>,
}

impl Performance {
    pub fn from_times(times: &History<f64>) -> Self {
        if times.is_empty() {
            return Self::default();
        }
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        Self {
            avg_generation_ms: avg,
            steps_per_second: if avg > 0.0 { 1000.0 / avg } else { 0.0 },
            recent_generation_ms: times.tail(10),
        }
    }
}

/// Headline numbers of a run
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub generation: u64,
    pub state: SimState,
    pub run_time_secs: f64,
    pub bacteria: usize,
    pub phagocytes: usize,
    pub glucose: usize,
    pub best_fitness: f32,
    pub average_fitness: f32,
    pub counters: Counters,
}

/// Full statistics report, serializable to JSON
#[derive(Clone, Debug, Serialize)]
pub struct StatisticsReport {
    pub summary: RunSummary,
    pub latest: Stats,
    pub history: StatsHistory,
    pub performance: Performance,
}
