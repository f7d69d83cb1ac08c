use std::sync::{Arc, Mutex};

use super::VehicleState;

/// Copy of the vehicle state taken right after a step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    pub step: u64,
    pub landed: bool,
    pub state: VehicleState,
}

pub trait StepObserver {
    fn on_step_completed(&mut self, snapshot: &Snapshot);
}

impl<F> StepObserver for F
where
    F: FnMut(&Snapshot),
{
    fn on_step_completed(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// Publishes the most recent snapshot to readers on other threads.
#[derive(Clone, Default)]
pub struct LatestSnapshot {
    latest: Arc<Mutex<Option<Snapshot>>>,
}

impl LatestSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Snapshot> {
        // a poisoned lock still holds a whole snapshot
        match self.latest.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl StepObserver for LatestSnapshot {
    fn on_step_completed(&mut self, snapshot: &Snapshot) {
        match self.latest.lock() {
            Ok(mut guard) => *guard = Some(*snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(*snapshot),
        }
    }
}
