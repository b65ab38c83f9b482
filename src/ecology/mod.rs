//! Ecological interactions between agents.
//!
//! This module contains:
//! - Predation (phagocytes engulfing bacteria)
//! - Feeding (bacteria eating glucose) and glucose supply

pub mod feeding;
pub mod predation;

pub use feeding::FeedingOutcome;
pub use predation::CaptureOutcome;
