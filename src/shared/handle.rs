//! Thread-safe handle around a world.
//!
//! Every entry point takes the same lock, so a step is never observed half
//! done by a snapshot or a parameter update.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{Config, ParameterUpdate};
use crate::snapshot::WorldSnapshot;
use crate::stats::StatisticsReport;
use crate::World;

use super::commands::{SimCommand, SimState};

/// Cloneable handle for controlling a shared simulation
#[derive(Clone)]
pub struct SimulationHandle {
    world: Arc<Mutex<World>>,
}

impl SimulationHandle {
    /// Create a world with a random seed
    pub fn new(config: Config) -> Self {
        Self::from_world(World::new(config))
    }

    /// Create a world with a specific seed
    pub fn with_seed(config: Config, seed: u64) -> Self {
        Self::from_world(World::new_with_seed(config, seed))
    }

    pub fn from_world(world: World) -> Self {
        Self {
            world: Arc::new(Mutex::new(world)),
        }
    }

    // A panic while holding the lock leaves the world in its last committed
    // state, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn step(&self) {
        self.lock().step();
    }

    pub fn get_state(&self) -> WorldSnapshot {
        self.lock().get_state()
    }

    pub fn get_statistics(&self) -> StatisticsReport {
        self.lock().get_statistics()
    }

    pub fn update_parameters(&self, update: &ParameterUpdate) {
        self.lock().update_parameters(update);
    }

    pub fn update_parameters_json(&self, value: &serde_json::Value) -> Result<(), serde_json::Error> {
        self.lock().update_parameters_json(value)
    }

    pub fn pause(&self) {
        self.lock().pause();
    }

    pub fn resume(&self) {
        self.lock().resume();
    }

    pub fn reset(&self) {
        self.lock().reset();
    }

    pub fn stop(&self) {
        self.lock().stop();
    }

    pub fn state(&self) -> SimState {
        self.lock().state()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Apply a command. `Shutdown` only concerns a driver and is ignored here.
    pub fn execute(&self, command: SimCommand) {
        let mut world = self.lock();
        match command {
            SimCommand::Pause => world.pause(),
            SimCommand::Resume => world.resume(),
            SimCommand::Step => world.step(),
            SimCommand::Reset => world.reset(),
            SimCommand::Stop => world.stop(),
            SimCommand::UpdateParameters(update) => world.update_parameters(&update),
            SimCommand::Shutdown => {}
        }
    }

    /// Run `f` with exclusive access to the world
    pub fn with_world<T>(&self, f: impl FnOnce(&mut World) -> T) -> T {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.population.initial_bacteria = 20;
        config.population.initial_phagocytes = 5;
        config
    }

    #[test]
    fn test_handle_shares_world() {
        let handle = SimulationHandle::with_seed(small_config(), 1);
        let other = handle.clone();
        other.step();
        assert_eq!(handle.generation(), 1);
    }

    #[test]
    fn test_concurrent_steps_are_serialised() {
        let handle = SimulationHandle::with_seed(small_config(), 2);
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let h = handle.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        h.step();
                        let _ = h.get_state();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(handle.generation(), 40);
    }

    #[test]
    fn test_execute_commands() {
        let handle = SimulationHandle::with_seed(small_config(), 3);
        handle.execute(SimCommand::Pause);
        assert_eq!(handle.state(), SimState::Paused);
        handle.execute(SimCommand::Step);
        assert_eq!(handle.generation(), 0);
        handle.execute(SimCommand::Resume);
        handle.execute(SimCommand::Step);
        assert_eq!(handle.generation(), 1);

        let update = ParameterUpdate {
            crossover_rate: Some(0.25),
            ..Default::default()
        };
        handle.execute(SimCommand::UpdateParameters(update));
        assert_eq!(handle.with_world(|w| w.config().evolution.crossover_rate), 0.25);

        handle.execute(SimCommand::Stop);
        handle.execute(SimCommand::Reset);
        assert_eq!(handle.state(), SimState::Running);
        assert_eq!(handle.generation(), 0);
    }
}
