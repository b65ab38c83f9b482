//! Population caps.

use crate::agents::{Agent, Bacteria, Phagocyte};
use rand::seq::index;
use rand::Rng;
use serde::Serialize;

/// What the cap pass removed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CullReport {
    pub bacteria_culled: usize,
    pub phagocytes_culled: usize,
    /// A non-finite fitness forced a random sample instead of a ranking
    pub fallback_used: bool,
}

/// Keep at most `cap` agents: the fittest when fitness can be ordered,
/// otherwise a uniform random sample. Returns `(culled, fell_back)`.
pub fn cap_population<A: Agent, R: Rng + ?Sized>(agents: &mut Vec<A>, cap: usize, rng: &mut R) -> (usize, bool) {
    let len = agents.len();
    if len <= cap {
        return (0, false);
    }

    if agents.iter().all(|a| a.fitness().is_finite()) {
        agents.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        agents.truncate(cap);
        return (len - cap, false);
    }

    log::warn!("non-finite fitness while capping population, keeping a random sample");
    let mut keep = vec![false; len];
    for i in index::sample(rng, len, cap) {
        keep[i] = true;
    }
    let mut flags = keep.into_iter();
    agents.retain(|_| flags.next().unwrap_or(false));
    (len - cap, true)
}

/// Bacteria are capped at `max_population`, phagocytes at half of it.
pub fn control_population_size<R: Rng + ?Sized>(
    bacteria: &mut Vec<Bacteria>,
    phagocytes: &mut Vec<Phagocyte>,
    max_population: usize,
    rng: &mut R,
) -> CullReport {
    let (bacteria_culled, b_fallback) = cap_population(bacteria, max_population, rng);
    let (phagocytes_culled, p_fallback) = cap_population(phagocytes, max_population / 2, rng);
    if bacteria_culled + phagocytes_culled > 0 {
        log::debug!(
            "population cap: culled {} bacteria, {} phagocytes",
            bacteria_culled,
            phagocytes_culled
        );
    }
    CullReport {
        bacteria_culled,
        phagocytes_culled,
        fallback_used: b_fallback || p_fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bacteria_with_fitness(values: &[f32], rng: &mut ChaCha8Rng) -> Vec<Bacteria> {
        let config = Config::default();
        values
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut b = Bacteria::random(format!("bacteria_{}", i), 100.0, &config, rng);
                b.body.fitness = f;
                b
            })
            .collect()
    }

    #[test]
    fn test_keeps_fittest() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut bacteria = bacteria_with_fitness(&[0.1, 0.9, 0.5, 0.7], &mut rng);
        let (culled, fallback) = cap_population(&mut bacteria, 2, &mut rng);
        assert_eq!(culled, 2);
        assert!(!fallback);
        let kept: Vec<f32> = bacteria.iter().map(|b| b.body.fitness).collect();
        assert_eq!(kept, vec![0.9, 0.7]);
    }

    #[test]
    fn test_under_cap_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut bacteria = bacteria_with_fitness(&[0.1, 0.2], &mut rng);
        assert_eq!(cap_population(&mut bacteria, 5, &mut rng), (0, false));
        assert_eq!(bacteria.len(), 2);
    }

    #[test]
    fn test_nan_falls_back_to_sample() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut bacteria = bacteria_with_fitness(&[0.1, f32::NAN, 0.5, 0.7, 0.2], &mut rng);
        let (culled, fallback) = cap_population(&mut bacteria, 3, &mut rng);
        assert_eq!(culled, 2);
        assert!(fallback);
        assert_eq!(bacteria.len(), 3);
    }

    #[test]
    fn test_phagocyte_cap_is_half() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let config = Config::default();
        let mut bacteria = bacteria_with_fitness(&[0.5; 12], &mut rng);
        let mut phagocytes: Vec<Phagocyte> = (0..12)
            .map(|i| Phagocyte::random(format!("phagocyte_{}", i), 100.0, &config, &mut rng))
            .collect();
        let report = control_population_size(&mut bacteria, &mut phagocytes, 10, &mut rng);
        assert_eq!(bacteria.len(), 10);
        assert_eq!(phagocytes.len(), 5);
        assert_eq!(report.phagocytes_culled, 7);
    }
}
