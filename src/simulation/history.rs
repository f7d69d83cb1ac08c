use std::sync::{Arc, Mutex};

use super::{Snapshot, StepObserver, VehicleState};

/// Column-wise record of a flight, one entry per observed step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlightHistory {
    height: Vec<f64>,
    vertical_speed: Vec<f64>,
    lateral_position: Vec<f64>,
    lateral_speed: Vec<f64>,
    rotation: Vec<f64>,
    rotation_rate: Vec<f64>,
    fuel: Vec<f64>,
    left_thrust: Vec<f64>,
    right_thrust: Vec<f64>,
}

impl FlightHistory {
    pub fn with_initial_state(state: &VehicleState) -> Self {
        let mut history = Self::default();
        history.append_state(state);
        history
    }

    pub fn len(&self) -> usize {
        self.height.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height.is_empty()
    }

    pub fn append_state(&mut self, state: &VehicleState) {
        self.height.push(state.height);
        self.vertical_speed.push(state.vertical_speed);
        self.lateral_position.push(state.lateral_position);
        self.lateral_speed.push(state.lateral_speed);
        self.rotation.push(state.rotation);
        self.rotation_rate.push(state.rotation_rate);
        self.fuel.push(state.fuel);
        self.left_thrust.push(state.left_thrust);
        self.right_thrust.push(state.right_thrust);
    }

    pub fn iter_history(&self) -> impl Iterator<Item = VehicleState> + '_ {
        (0..self.len()).map(|i| VehicleState {
            height: self.height[i],
            vertical_speed: self.vertical_speed[i],
            lateral_position: self.lateral_position[i],
            lateral_speed: self.lateral_speed[i],
            rotation: self.rotation[i],
            rotation_rate: self.rotation_rate[i],
            fuel: self.fuel[i],
            left_thrust: self.left_thrust[i],
            right_thrust: self.right_thrust[i],
        })
    }

    pub fn last(&self) -> Option<VehicleState> {
        self.iter_history().last()
    }

    pub fn pretty_to_string(&self) -> String {
        self.iter_history().fold(
            format!(
                "{:>9} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>9} {:>9}",
                "HEIGHT", "VSPEED", "X", "HSPEED", "ANGLE", "SPIN", "FUEL", "LEFT", "RIGHT"
            ),
            |out, s| {
                out + &format!(
                    "\n{:9.2} {:8.2} {:8.2} {:8.2} {:8.2} {:8.2} {:8.2} {:9.0} {:9.0}",
                    s.height,
                    s.vertical_speed,
                    s.lateral_position,
                    s.lateral_speed,
                    s.rotation.to_degrees(),
                    s.rotation_rate.to_degrees(),
                    s.fuel,
                    s.left_thrust,
                    s.right_thrust
                )
            },
        )
    }
}

/// Observer filling a shared [`FlightHistory`].
#[derive(Clone, Default)]
pub struct HistoryRecorder {
    history: Arc<Mutex<FlightHistory>>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_from(state: &VehicleState) -> Self {
        Self {
            history: Arc::new(Mutex::new(FlightHistory::with_initial_state(state))),
        }
    }

    pub fn history(&self) -> FlightHistory {
        match self.history.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl StepObserver for HistoryRecorder {
    fn on_step_completed(&mut self, snapshot: &Snapshot) {
        match self.history.lock() {
            Ok(mut guard) => guard.append_state(&snapshot.state),
            Err(poisoned) => poisoned.into_inner().append_state(&snapshot.state),
        }
    }
}
