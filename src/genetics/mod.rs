//! Genetics module - genomes and asexual offspring construction.

pub mod budding;
pub mod genome;

pub use budding::BuddingParams;
pub use genome::{clamp_gene, Genome, NEUTRAL_GENE};
