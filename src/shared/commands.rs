//! Commands for controlling the simulation from outside the step loop.

use crate::config::ParameterUpdate;
use serde::{Deserialize, Serialize};

/// Commands accepted by the simulation handle and driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimCommand {
    /// Pause the simulation
    Pause,
    /// Resume the simulation
    Resume,
    /// Execute a single step
    Step,
    /// Reinitialise populations and statistics
    Reset,
    /// Stop until the next reset
    Stop,
    /// Apply new runtime parameters
    UpdateParameters(ParameterUpdate),
    /// Shutdown the driver thread
    Shutdown,
}

/// Current simulation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimState {
    /// Simulation is running
    Running,
    /// Simulation is paused
    Paused,
    /// Simulation has stopped; only a reset leaves this state
    Stopped,
}

impl Default for SimState {
    fn default() -> Self {
        Self::Running
    }
}

impl std::fmt::Display for SimState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SimState::Running => "running",
            SimState::Paused => "paused",
            SimState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
