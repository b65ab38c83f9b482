//! Background thread that steps a shared world at a fixed cadence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::commands::{SimCommand, SimState};
use super::handle::SimulationHandle;

/// Owns the stepping thread for a [`SimulationHandle`]
pub struct SimulationDriver {
    handle: SimulationHandle,
    /// Thread handle
    thread: Option<JoinHandle<()>>,
    /// Channel to send commands to the loop
    command_tx: Sender<SimCommand>,
    running: Arc<AtomicBool>,
}

impl SimulationDriver {
    /// Spawn the stepping thread. `fps` of 0 steps as fast as possible.
    pub fn spawn(handle: SimulationHandle) -> Self {
        let fps = handle.with_world(|w| w.config().world.fps);
        Self::spawn_with_fps(handle, fps)
    }

    pub fn spawn_with_fps(handle: SimulationHandle, fps: u32) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let handle = handle.clone();
            let running = Arc::clone(&running);
            thread::spawn(move || run_loop(handle, command_rx, running, fps))
        };
        log::info!("Simulation driver started at {} fps", fps);

        Self {
            handle,
            thread: Some(thread),
            command_tx,
            running,
        }
    }

    /// Queue a command for the stepping thread
    pub fn send(&self, command: SimCommand) {
        if self.command_tx.send(command).is_err() {
            log::debug!("driver loop already exited, command dropped");
        }
    }

    pub fn handle(&self) -> &SimulationHandle {
        &self.handle
    }

    /// Whether the stepping thread is still alive
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Block until the loop exits on its own (stop or generation limit)
    pub fn wait(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("simulation driver thread panicked");
            }
        }
    }

    /// Stop the loop and join the thread
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Err(e) = self.command_tx.send(SimCommand::Shutdown) {
            // Receiver is gone once the loop has returned
            log::debug!("simulation driver already exited: {}", e);
        }
        self.wait();
    }
}

impl Drop for SimulationDriver {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(handle: SimulationHandle, command_rx: Receiver<SimCommand>, running: Arc<AtomicBool>, fps: u32) {
    let frame = if fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(1.0 / fps as f64)
    };
    let mut last_step: Option<Instant> = None;

    while running.load(Ordering::Acquire) {
        // Process commands (non-blocking)
        loop {
            match command_rx.try_recv() {
                Ok(SimCommand::Shutdown) | Err(TryRecvError::Disconnected) => {
                    running.store(false, Ordering::Release);
                    break;
                }
                Ok(cmd) => handle.execute(cmd),
                Err(TryRecvError::Empty) => break,
            }
        }
        if !running.load(Ordering::Acquire) {
            break;
        }

        let (state, generation, max_generations) =
            handle.with_world(|w| (w.state(), w.generation, w.config().world.max_generations));

        match state {
            SimState::Stopped => {
                log::info!("World stopped at generation {}, driver exiting", generation);
                break;
            }
            SimState::Running if max_generations > 0 && generation >= max_generations => {
                handle.pause();
                log::info!("Reached max generations ({}), pausing", max_generations);
                break;
            }
            SimState::Running if last_step.map_or(true, |t| t.elapsed() >= frame) => {
                last_step = Some(Instant::now());
                handle.step();
                if generation % 100 == 0 {
                    log::debug!("driver at generation {}", generation + 1);
                }
            }
            SimState::Running => {
                let elapsed = last_step.map_or(frame, |t| t.elapsed());
                thread::sleep(frame.saturating_sub(elapsed));
            }
            // Small sleep to avoid busy-waiting when paused
            SimState::Paused => thread::sleep(Duration::from_millis(16)),
        }
    }

    running.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;

    fn limited_config(max_generations: u64) -> Config {
        let mut config = Config::default();
        config.population.initial_bacteria = 20;
        config.population.initial_phagocytes = 5;
        config.world.max_generations = max_generations;
        config
    }

    #[test]
    fn test_driver_pauses_at_max_generations() {
        let handle = SimulationHandle::with_seed(limited_config(15), 1);
        let mut driver = SimulationDriver::spawn_with_fps(handle.clone(), 0);
        driver.wait();
        assert!(!driver.is_active());
        assert_eq!(handle.generation(), 15);
        assert_eq!(handle.state(), SimState::Paused);
    }

    #[test]
    fn test_driver_exits_when_stopped() {
        let handle = SimulationHandle::with_seed(limited_config(0), 2);
        let mut driver = SimulationDriver::spawn_with_fps(handle.clone(), 200);
        driver.send(SimCommand::Stop);
        driver.wait();
        assert_eq!(handle.state(), SimState::Stopped);
    }

    #[test]
    fn test_driver_shutdown_joins() {
        let handle = SimulationHandle::with_seed(limited_config(0), 3);
        let mut driver = SimulationDriver::spawn_with_fps(handle.clone(), 60);
        driver.send(SimCommand::Pause);
        driver.shutdown();
        assert!(!driver.is_active());
        let generation = handle.generation();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(handle.generation(), generation);
    }

    #[test]
    fn test_shutdown_after_loop_exited() {
        let handle = SimulationHandle::with_seed(limited_config(5), 4);
        let mut driver = SimulationDriver::spawn_with_fps(handle.clone(), 0);
        driver.wait();
        driver.shutdown();
        driver.shutdown();
        assert!(!driver.is_active());
        assert_eq!(handle.generation(), 5);
    }
}
