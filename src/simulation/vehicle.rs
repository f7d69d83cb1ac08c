use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use super::physics::validate_thrust;
use super::{
    fitness, terminal_velocity, ControlPolicy, Environment, Observation, Physics, Snapshot,
    StepObserver, ThrustCommand, VehicleSpecification, VehicleState,
};
use crate::error::{require, Error};

mod defaults {
    use std::time::Duration;

    pub const START_SPEED_SHARE: f64 = 0.9;
    pub const PAUSE_POLL: Duration = Duration::from_millis(10);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Landed { steps: u64, fitness: f64 },
    Stopped { steps: u64 },
}

impl RunOutcome {
    pub fn steps(&self) -> u64 {
        match self {
            RunOutcome::Landed { steps, .. } | RunOutcome::Stopped { steps } => *steps,
        }
    }

    pub fn fitness(&self) -> Option<f64> {
        match self {
            RunOutcome::Landed { fitness, .. } => Some(*fitness),
            RunOutcome::Stopped { .. } => None,
        }
    }
}

#[derive(Default)]
struct Flags {
    running: AtomicBool,
    paused: AtomicBool,
}

/// Cooperative run/pause/stop switches, checked once per loop iteration.
#[derive(Clone, Default)]
pub struct RunControl {
    flags: Arc<Flags>,
}

impl RunControl {
    pub fn pause(&self) {
        self.flags.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.flags.running.store(false, Ordering::SeqCst);
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.flags.running.load(Ordering::SeqCst)
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    fn start(&self) {
        self.flags.running.store(true, Ordering::SeqCst);
    }
}

/// Overrides for the state a vehicle is created in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitialConditions {
    pub height: f64,
    pub vertical_speed: f64,
    pub fuel: f64,
    pub thrust: ThrustCommand,
}

pub struct Vehicle {
    spec: Arc<VehicleSpecification>,
    env: Environment,
    physics: Physics,
    state: VehicleState,
    max_descent_speed: f64,
    delay: Duration,
    step_limit: Option<u64>,
    observers: Vec<Box<dyn StepObserver + Send>>,
    control: RunControl,
}

impl Vehicle {
    pub fn new(env: Environment, spec: Arc<VehicleSpecification>) -> Self {
        let max_descent_speed = terminal_velocity(&env, &spec);
        let mut vehicle = Self {
            spec,
            env,
            physics: Physics::default(),
            state: VehicleState::default(),
            max_descent_speed,
            delay: Duration::ZERO,
            step_limit: None,
            observers: Vec::new(),
            control: RunControl::default(),
        };
        vehicle.state = vehicle.initial_state();
        vehicle
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Runs longer than `step_limit` steps are stopped like an external abort.
    pub fn with_step_limit(self, step_limit: u64) -> Self {
        Self {
            step_limit: Some(step_limit),
            ..self
        }
    }

    pub fn with_physics(self, physics: Physics) -> Self {
        Self { physics, ..self }
    }

    pub fn with_initial_conditions(mut self, initial: InitialConditions) -> Result<Self, Error> {
        let height = require("height", initial.height, initial.height >= 0.)?;
        let capacity = self.spec.fuel_capacity();
        let fuel = require("fuel", initial.fuel, (0f64..=capacity).contains(&initial.fuel))?;
        self.state = VehicleState {
            height,
            vertical_speed: require("vertical_speed", initial.vertical_speed, true)?,
            fuel,
            ..self.initial_state()
        };
        if !self.request_thrust(initial.thrust) {
            return Err(Error::InvalidParameter {
                name: "thrust",
                value: initial.thrust.left.max(initial.thrust.right),
            });
        }
        Ok(self)
    }

    pub fn add_observer(&mut self, observer: impl StepObserver + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn state(&self) -> VehicleState {
        self.state
    }

    pub fn observation(&self) -> Observation {
        Observation::from(&self.state)
    }

    pub fn specification(&self) -> &VehicleSpecification {
        &self.spec
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn max_descent_speed(&self) -> f64 {
        self.max_descent_speed
    }

    pub fn has_landed(&self) -> bool {
        self.state.has_landed()
    }

    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn is_running(&self) -> bool {
        self.control.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn pause(&self) {
        self.control.pause()
    }

    pub fn resume(&self) {
        self.control.resume()
    }

    pub fn stop(&self) {
        self.control.stop()
    }

    /// Score of the current state; only meaningful once landed.
    pub fn fitness(&self) -> f64 {
        fitness(&self.state, &self.spec)
    }

    /// Back to the starting conditions of the specification, with calm weather.
    pub fn reset(&mut self) {
        self.state = self.initial_state();
        self.env.reset();
    }

    /// Returns whether the command was accepted. Rejected commands leave the
    /// state untouched.
    pub fn request_thrust(&mut self, cmd: ThrustCommand) -> bool {
        if !validate_thrust(&self.state, cmd, self.spec.max_thrust()) {
            return false;
        }
        self.state.left_thrust = cmd.left;
        self.state.right_thrust = cmd.right;
        true
    }

    /// One physics update of `physics.dt()` seconds. Returns whether the
    /// vehicle is still descending.
    pub fn step(&mut self) -> bool {
        self.state = self.physics.iterate(self.state, &self.spec, &mut self.env);
        !self.state.has_landed()
    }

    /// Runs the control loop on the calling thread until the vehicle lands or
    /// the run is stopped.
    pub fn run<P: ControlPolicy + ?Sized>(&mut self, policy: &mut P) -> Result<RunOutcome, Error> {
        if self.has_landed() {
            return Err(Error::AlreadyLanded);
        }
        self.control.start();
        Ok(self.run_loop(policy))
    }

    /// Moves the vehicle and the policy onto a dedicated thread. When the
    /// run cannot be started both are handed back inside the error.
    pub fn spawn<P>(self, policy: P) -> Result<RunHandle<P>, SpawnError<P>>
    where
        P: ControlPolicy + Send + 'static,
    {
        if self.has_landed() {
            return Err(SpawnError {
                vehicle: self,
                policy,
                error: Error::AlreadyLanded,
            });
        }
        let control = self.control();
        control.start();

        // the thread takes both out; if it never starts they stay here
        let slot = Arc::new(Mutex::new(Some((self, policy))));
        let thread_slot = Arc::clone(&slot);
        let spawned = thread::Builder::new()
            .name("vehicle".to_owned())
            .spawn(move || {
                let (mut vehicle, mut policy) = take_slot(&*thread_slot)?;
                let outcome = vehicle.run_loop(&mut policy);
                Some((vehicle, policy, outcome))
            });
        match spawned {
            Ok(join) => Ok(RunHandle { control, join }),
            Err(e) => {
                control.stop();
                match take_slot(&*slot) {
                    Some((vehicle, policy)) => Err(SpawnError {
                        vehicle,
                        policy,
                        error: Error::Io(e),
                    }),
                    None => unreachable!("vehicle thread never started"),
                }
            }
        }
    }

    fn run_loop<P: ControlPolicy + ?Sized>(&mut self, policy: &mut P) -> RunOutcome {
        let mut steps = 0;
        let outcome = loop {
            if !self.control.is_running() {
                break RunOutcome::Stopped { steps };
            }
            if self.control.is_paused() {
                thread::sleep(self.delay.max(defaults::PAUSE_POLL));
                continue;
            }

            self.apply_policy(policy);
            let descending = self.step();
            steps += 1;
            self.notify(steps, !descending);

            if !descending {
                break RunOutcome::Landed {
                    steps,
                    fitness: self.fitness(),
                };
            }
            if self.step_limit.is_some_and(|limit| steps >= limit) {
                warn!("Run stopped after reaching the limit of {steps} steps");
                break RunOutcome::Stopped { steps };
            }
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        };
        self.control.stop();
        debug!("Run finished: {outcome:?}");
        outcome
    }

    fn apply_policy<P: ControlPolicy + ?Sized>(&mut self, policy: &mut P) {
        match policy.decide(&self.observation()) {
            Ok(cmd) => {
                if !self.request_thrust(cmd) {
                    warn!("{} requested rejected thrust {cmd:?}", policy.name());
                }
            }
            Err(e) => warn!("{}: {e}, keeping previous thrust", policy.name()),
        }
    }

    fn notify(&mut self, step: u64, landed: bool) {
        let snapshot = Snapshot {
            step,
            landed,
            state: self.state,
        };
        for observer in self.observers.iter_mut() {
            observer.on_step_completed(&snapshot);
        }
    }

    fn initial_state(&self) -> VehicleState {
        VehicleState::default()
            .with_height(self.spec.start_height())
            .with_vertical_speed(defaults::START_SPEED_SHARE * self.max_descent_speed)
            .with_fuel(self.spec.fuel_capacity())
    }
}

fn take_slot<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

/// A run that could not be started, with everything that was moved into it.
pub struct SpawnError<P> {
    pub vehicle: Vehicle,
    pub policy: P,
    pub error: Error,
}

impl<P> fmt::Debug for SpawnError<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<P> From<SpawnError<P>> for Error {
    fn from(e: SpawnError<P>) -> Self {
        e.error
    }
}

/// A run in progress on its own thread.
pub struct RunHandle<P> {
    control: RunControl,
    join: JoinHandle<Option<(Vehicle, P, RunOutcome)>>,
}

impl<P> RunHandle<P> {
    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn pause(&self) {
        self.control.pause()
    }

    pub fn resume(&self) {
        self.control.resume()
    }

    pub fn stop(&self) {
        self.control.stop()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the run to end and hands the vehicle and policy back.
    pub fn join(self) -> Result<(Vehicle, P, RunOutcome), Error> {
        self.join.join().ok().flatten().ok_or(Error::RunPanicked)
    }
}
