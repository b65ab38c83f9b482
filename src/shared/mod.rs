//! Shared types for controlling the simulation from other threads.
//!
//! The handle serialises access to one world; the driver steps it in the
//! background until it is stopped or reaches its generation limit.

pub mod commands;
pub mod driver;
pub mod handle;

pub use commands::{SimCommand, SimState};
pub use driver::SimulationDriver;
pub use handle::SimulationHandle;
