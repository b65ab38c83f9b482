//! Offspring construction for asexual reproduction.
//!
//! Bacteria bud: a near copy of the parent with small Gaussian noise, an
//! occasional nudge on the colour gene and, rarely, a brand new gene.
//! Phagocytes divide: each gene may shift by a small uniform step.

use super::genome::Genome;
use crate::agents::Bounds;
use crate::config::Config;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::f32::consts::TAU;

/// Mutation knobs for a budding bacterium
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuddingParams {
    pub mutation_probability: f32,
    pub sigma: f32,
    pub color_micro_chance: f32,
    pub color_micro_strength: f32,
    pub novel_gene_chance: f32,
}

impl BuddingParams {
    pub fn from_config(config: &Config) -> Self {
        let r = &config.reproduction;
        Self {
            mutation_probability: r.mutation_probability,
            sigma: config.evolution.mutation_strength * r.strength_factor,
            color_micro_chance: r.color_micro_mutation_chance,
            color_micro_strength: r.color_micro_strength,
            novel_gene_chance: r.novel_gene_chance,
        }
    }
}

/// Build a bud's genome from its parent.
pub fn bud_genome<R: Rng + ?Sized>(parent: &Genome, params: &BuddingParams, rng: &mut R) -> Genome {
    let mut child = parent.clone();
    child.mutate_gaussian(params.mutation_probability, params.sigma, rng);

    if child.contains("color_gene") && rng.gen::<f32>() < params.color_micro_chance {
        if let Ok(normal) = Normal::new(0.0f32, params.color_micro_strength.max(0.0)) {
            let nudged = child.gene("color_gene") + normal.sample(rng);
            child.set("color_gene", nudged);
        }
    }

    if rng.gen::<f32>() < params.novel_gene_chance {
        let mut k = child.len();
        while child.contains(&format!("novel_gene_{}", k)) {
            k += 1;
        }
        let value = rng.gen::<f32>();
        log::trace!("bud invented novel_gene_{} = {:.3}", k, value);
        child.set(format!("novel_gene_{}", k), value);
    }

    child
}

/// Build a dividing phagocyte's genome from its parent.
pub fn divide_genome<R: Rng + ?Sized>(parent: &Genome, rate: f32, step: f32, rng: &mut R) -> Genome {
    let mut child = parent.clone();
    child.mutate_uniform(rate, step, rng);
    child
}

/// Random point at a distance in `[min, max]` from `(x, y)`, clamped into the arena.
pub fn ring_offset<R: Rng + ?Sized>(
    x: f32,
    y: f32,
    min: f32,
    max: f32,
    bounds: Bounds,
    rng: &mut R,
) -> (f32, f32) {
    let angle = rng.gen_range(0.0..TAU);
    let distance = if max > min { rng.gen_range(min..=max) } else { min };
    bounds.clamp_point(x + angle.cos() * distance, y + angle.sin() * distance)
}

/// Random point within `offset` of `(x, y)` on each axis, clamped into the arena.
pub fn box_offset<R: Rng + ?Sized>(x: f32, y: f32, offset: f32, bounds: Bounds, rng: &mut R) -> (f32, f32) {
    let offset = offset.abs();
    let (dx, dy) = if offset > 0.0 {
        (rng.gen_range(-offset..=offset), rng.gen_range(-offset..=offset))
    } else {
        (0.0, 0.0)
    };
    bounds.clamp_point(x + dx, y + dy)
}
