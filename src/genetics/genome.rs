//! Named-gene genomes shared by both species.

use crate::agents::Species;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value a missing gene reads as when driving behaviour.
pub const NEUTRAL_GENE: f32 = 0.5;

/// Clamp a gene into [0, 1]. Non-finite values pass through untouched so the
/// epoch validator can still see them.
#[inline]
pub fn clamp_gene(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        value
    }
}

/// Ordered map of gene name to value.
///
/// Iteration order is the key order, which keeps mutation and crossover
/// reproducible under a seeded RNG.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome {
    genes: BTreeMap<String, f32>,
}

impl Genome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random genome with every gene the species expresses.
    pub fn random<R: Rng + ?Sized>(species: Species, rng: &mut R) -> Self {
        let genes = species
            .gene_names()
            .iter()
            .map(|name| (name.to_string(), rng.gen::<f32>()))
            .collect();
        Self { genes }
    }

    pub fn from_genes<I, S>(genes: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        let genes = genes
            .into_iter()
            .map(|(name, value)| (name.into(), clamp_gene(value)))
            .collect();
        Self { genes }
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.genes.get(name).copied()
    }

    /// Gene value for behaviour, falling back to [`NEUTRAL_GENE`].
    #[inline]
    pub fn gene(&self, name: &str) -> f32 {
        self.get(name).unwrap_or(NEUTRAL_GENE)
    }

    pub fn set(&mut self, name: impl Into<String>, value: f32) {
        self.genes.insert(name.into(), clamp_gene(value));
    }

    pub fn remove(&mut self, name: &str) -> Option<f32> {
        self.genes.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.genes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.genes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// First gene holding NaN or infinity, if any.
    pub fn first_invalid(&self) -> Option<&str> {
        self.genes
            .iter()
            .find(|(_, v)| !v.is_finite())
            .map(|(k, _)| k.as_str())
    }

    /// Gaussian mutation: each gene is perturbed with probability `rate` by
    /// `N(0, sigma)` and clamped. Returns whether any gene changed.
    pub fn mutate_gaussian<R: Rng + ?Sized>(&mut self, rate: f32, sigma: f32, rng: &mut R) -> bool {
        if !(sigma > 0.0) || rate <= 0.0 {
            return false;
        }
        let Ok(normal) = Normal::new(0.0f32, sigma) else {
            return false;
        };
        let mut touched = false;
        for value in self.genes.values_mut() {
            if rng.gen::<f32>() < rate {
                *value = clamp_gene(*value + normal.sample(rng));
                touched = true;
            }
        }
        touched
    }

    /// Uniform step mutation in `[-step, step]`, used by dividing phagocytes.
    pub fn mutate_uniform<R: Rng + ?Sized>(&mut self, rate: f32, step: f32, rng: &mut R) -> bool {
        if step <= 0.0 {
            return false;
        }
        let mut touched = false;
        for value in self.genes.values_mut() {
            if rng.gen::<f32>() < rate {
                *value = clamp_gene(*value + rng.gen_range(-step..=step));
                touched = true;
            }
        }
        touched
    }

    /// Uniform crossover in place: each gene present in both genomes is
    /// swapped with probability `swap_probability`. Genes unique to one
    /// parent stay where they are. Returns whether anything was swapped.
    pub fn uniform_crossover<R: Rng + ?Sized>(
        a: &mut Genome,
        b: &mut Genome,
        swap_probability: f32,
        rng: &mut R,
    ) -> bool {
        let mut swapped = false;
        for (name, value_a) in a.genes.iter_mut() {
            if let Some(value_b) = b.genes.get_mut(name) {
                if rng.gen::<f32>() < swap_probability {
                    std::mem::swap(value_a, value_b);
                    swapped = true;
                }
            }
        }
        swapped
    }
}
