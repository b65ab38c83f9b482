//! Vulnerability ranking and range targeting.
//!
//! Ranking every bacterium on every tick is wasteful, so the order is cached
//! and only recomputed once it is `update_frequency` generations old. Between
//! refreshes phagocytes target from the cached order, filtered against the
//! live population.

use crate::agents::{Agent, Bacteria, Phagocyte};
use crate::color::Rgb;
use crate::config::Config;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedBacterium {
    pub id: String,
    pub score: f32,
}

/// Lazily refreshed vulnerability order, most vulnerable first
#[derive(Debug, Clone, Default)]
pub struct RankingCache {
    entries: Vec<RankedBacterium>,
    computed_at: Option<u64>,
    update_frequency: u64,
    refreshes: u64,
}

impl RankingCache {
    pub fn new(update_frequency: u64) -> Self {
        Self {
            update_frequency,
            ..Default::default()
        }
    }

    pub fn set_update_frequency(&mut self, update_frequency: u64) {
        self.update_frequency = update_frequency;
    }

    pub fn update_frequency(&self) -> u64 {
        self.update_frequency
    }

    /// Never computed, or at least `update_frequency` generations old.
    /// A frequency of 0 behaves like 1.
    pub fn is_stale(&self, generation: u64) -> bool {
        match self.computed_at {
            None => true,
            Some(at) => generation.saturating_sub(at) >= self.update_frequency.max(1),
        }
    }

    /// Rank the live bacteria. Ties keep population order.
    pub fn refresh(&mut self, generation: u64, bacteria: &[Bacteria], background: Rgb, config: &Config) {
        let mut entries: Vec<RankedBacterium> = bacteria
            .iter()
            .filter(|b| b.is_alive() && b.capabilities().detectable)
            .map(|b| RankedBacterium {
                id: b.body.id.clone(),
                score: b.vulnerability_score(background, config),
            })
            .collect();
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));

        log::trace!(
            "ranking refreshed at generation {}: {} bacteria",
            generation,
            entries.len()
        );
        self.entries = entries;
        self.computed_at = Some(generation);
        self.refreshes += 1;
    }

    /// Refresh if stale. Returns whether a refresh happened.
    pub fn ensure_fresh(
        &mut self,
        generation: u64,
        bacteria: &[Bacteria],
        background: Rgb,
        config: &Config,
    ) -> bool {
        if self.is_stale(generation) {
            self.refresh(generation, bacteria, background, config);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.computed_at = None;
    }

    pub fn entries(&self) -> &[RankedBacterium] {
        &self.entries
    }

    pub fn computed_at(&self) -> Option<u64> {
        self.computed_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of refreshes since creation
    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    pub fn average_score(&self) -> Option<f32> {
        crate::fitness::mean(self.entries.iter().map(|e| e.score))
    }
}

/// Read-only view handed to phagocytes while they move.
pub struct TargetingView<'a> {
    bacteria: &'a [Bacteria],
    ranking: &'a RankingCache,
    background: Rgb,
    positions: HashMap<&'a str, usize>,
}

impl<'a> TargetingView<'a> {
    pub fn new(bacteria: &'a [Bacteria], ranking: &'a RankingCache, background: Rgb) -> Self {
        let positions = bacteria
            .iter()
            .enumerate()
            .map(|(i, b)| (b.body.id.as_str(), i))
            .collect();
        Self {
            bacteria,
            ranking,
            background,
            positions,
        }
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn bacterium(&self, index: usize) -> Option<&'a Bacteria> {
        self.bacteria.get(index)
    }

    /// Indices of ranked bacteria that are alive, within `radius` and
    /// detectable by `phagocyte`, nearest first. Equal distances keep the
    /// ranking order.
    pub fn ranked_bacteria_in_range(&self, phagocyte: &Phagocyte, radius: f32) -> Vec<usize> {
        let mut hits: Vec<(usize, f32)> = self
            .ranking
            .entries()
            .iter()
            .filter_map(|entry| self.positions.get(entry.id.as_str()).copied())
            .filter_map(|i| {
                let b = &self.bacteria[i];
                if !b.is_alive() {
                    return None;
                }
                let d = phagocyte.body.distance_to(b.body.x, b.body.y);
                (d <= radius && phagocyte.detect_bacteria(b, self.background)).then_some((i, d))
            })
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits.into_iter().map(|(i, _)| i).collect()
    }
}
