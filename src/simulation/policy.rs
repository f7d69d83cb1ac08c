use thiserror::Error;

use super::{
    terminal_velocity, Environment, Physics, ThrustCommand, VehicleSpecification, VehicleState,
};

mod defaults {
    pub const DESCENT_GAIN: f64 = 2.;
    pub const DESCENT_SLOPE: f64 = 0.15;
    pub const POSITION_GAIN: f64 = 0.01;
    pub const VELOCITY_GAIN: f64 = 0.1;
    pub const MAX_TILT: f64 = 0.3;
    pub const TILT_FLOOR: f64 = 0.05;
    pub const TILT_PER_METRE: f64 = 0.002;
    pub const ATTITUDE_STIFFNESS: f64 = 4.;
    pub const ATTITUDE_DAMPING: f64 = 4.;
    pub const MIN_THRUST_COSINE: f64 = 0.5;
}

/// A policy could not come up with a decision for this step.
#[derive(Debug, Error)]
#[error("policy failure: {0}")]
pub struct PolicyError(pub String);

/// What a policy gets to see each step. Angles are in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub height: f64,
    pub vertical_speed: f64,
    pub lateral_position: f64,
    pub lateral_speed: f64,
    pub rotation: f64,
    pub rotation_rate: f64,
    pub fuel: f64,
}

impl From<&VehicleState> for Observation {
    fn from(state: &VehicleState) -> Self {
        Self {
            height: state.height,
            vertical_speed: state.vertical_speed,
            lateral_position: state.lateral_position,
            lateral_speed: state.lateral_speed,
            rotation: state.rotation.to_degrees(),
            rotation_rate: state.rotation_rate.to_degrees(),
            fuel: state.fuel,
        }
    }
}

/// Decides the thrust pair for the next step.
pub trait ControlPolicy {
    fn decide(&mut self, observation: &Observation) -> Result<ThrustCommand, PolicyError>;

    /// Called before every trial.
    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "unnamed"
    }
}

impl<F> ControlPolicy for F
where
    F: FnMut(&Observation) -> Result<ThrustCommand, PolicyError>,
{
    fn decide(&mut self, observation: &Observation) -> Result<ThrustCommand, PolicyError> {
        self(observation)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Same thrust pair every step.
#[derive(Clone, Copy, Debug)]
pub struct ConstantThrust(pub ThrustCommand);

impl ControlPolicy for ConstantThrust {
    fn decide(&mut self, _: &Observation) -> Result<ThrustCommand, PolicyError> {
        Ok(self.0)
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Shuts the engines off while the vehicle moves away from the surface.
pub struct RetrogradeCutoff<P>(pub P);

impl<P: ControlPolicy> ControlPolicy for RetrogradeCutoff<P> {
    fn decide(&mut self, observation: &Observation) -> Result<ThrustCommand, PolicyError> {
        if observation.vertical_speed < 0. {
            Ok(ThrustCommand::zero())
        } else {
            self.0.decide(observation)
        }
    }

    fn reset(&mut self) {
        self.0.reset()
    }

    fn name(&self) -> &str {
        self.0.name()
    }
}

/// Tracks a descent speed that shrinks linearly with height. Laterally it
/// tilts towards the landing site with differential thrust, allowing less
/// tilt the closer it gets to the ground.
#[derive(Clone, Debug)]
pub struct ProportionalDescent {
    gravity: f64,
    empty_mass: f64,
    max_thrust: f64,
    max_descent_speed: f64,
    touchdown_speed: f64,
    moment_of_inertia: f64,
    gain: f64,
    slope: f64,
}

impl ProportionalDescent {
    pub fn new(env: &Environment, spec: &VehicleSpecification) -> Self {
        Self {
            gravity: env.gravity(),
            empty_mass: spec.empty_mass(),
            max_thrust: spec.max_thrust(),
            max_descent_speed: terminal_velocity(env, spec),
            touchdown_speed: 0.5 * spec.safe_landing_speed(),
            moment_of_inertia: Physics::default().rotation_radius().powi(2),
            gain: defaults::DESCENT_GAIN,
            slope: defaults::DESCENT_SLOPE,
        }
    }

    pub fn with_gain(self, gain: f64) -> Self {
        Self { gain, ..self }
    }

    pub fn with_slope(self, slope: f64) -> Self {
        Self { slope, ..self }
    }

    fn target_speed(&self, height: f64) -> f64 {
        (self.touchdown_speed + self.slope * height).min(self.max_descent_speed)
    }

    /// Rotation in radians that pushes the vehicle back over the site.
    fn target_tilt(observation: &Observation) -> f64 {
        let limit = (defaults::TILT_FLOOR + defaults::TILT_PER_METRE * observation.height)
            .min(defaults::MAX_TILT);
        (defaults::POSITION_GAIN * observation.lateral_position
            + defaults::VELOCITY_GAIN * observation.lateral_speed)
            .clamp(-limit, limit)
    }
}

impl ControlPolicy for ProportionalDescent {
    fn decide(&mut self, observation: &Observation) -> Result<ThrustCommand, PolicyError> {
        if observation.vertical_speed < 0. {
            return Ok(ThrustCommand::zero());
        }
        if !observation.vertical_speed.is_finite() || !observation.height.is_finite() {
            return Err(PolicyError(format!("non-finite observation {observation:?}")));
        }
        let mass = self.empty_mass + observation.fuel;
        let rotation = observation.rotation.to_radians();
        let rotation_rate = observation.rotation_rate.to_radians();

        let error = observation.vertical_speed - self.target_speed(observation.height);
        let deceleration = self.gain * error + self.gravity;
        let thrust = (mass * deceleration / rotation.cos().max(defaults::MIN_THRUST_COSINE))
            .clamp(0., 2. * self.max_thrust);

        let angular = defaults::ATTITUDE_STIFFNESS * (Self::target_tilt(observation) - rotation)
            - defaults::ATTITUDE_DAMPING * rotation_rate;
        let differential = angular * mass * self.moment_of_inertia;

        Ok(ThrustCommand::new(
            (0.5 * (thrust - differential)).clamp(0., self.max_thrust),
            (0.5 * (thrust + differential)).clamp(0., self.max_thrust),
        ))
    }

    fn name(&self) -> &str {
        "proportional"
    }
}

/// The policies shipped with the crate, plus an escape hatch for anything else.
pub enum Policy {
    FreeFall,
    Constant(ConstantThrust),
    Proportional(ProportionalDescent),
    Custom(Box<dyn ControlPolicy + Send>),
}

impl ControlPolicy for Policy {
    fn decide(&mut self, observation: &Observation) -> Result<ThrustCommand, PolicyError> {
        match self {
            Policy::FreeFall => Ok(ThrustCommand::zero()),
            Policy::Constant(p) => p.decide(observation),
            Policy::Proportional(p) => p.decide(observation),
            Policy::Custom(p) => p.decide(observation),
        }
    }

    fn reset(&mut self) {
        match self {
            Policy::FreeFall | Policy::Constant(_) => {}
            Policy::Proportional(p) => p.reset(),
            Policy::Custom(p) => p.reset(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Policy::FreeFall => "free fall",
            Policy::Constant(p) => p.name(),
            Policy::Proportional(p) => p.name(),
            Policy::Custom(p) => p.name(),
        }
    }
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    fn observe(height: f64, vertical_speed: f64, lateral_position: f64) -> Observation {
        Observation {
            height,
            vertical_speed,
            lateral_position,
            lateral_speed: 0.,
            rotation: 0.,
            rotation_rate: 0.,
            fuel: 190.,
        }
    }

    fn proportional() -> ProportionalDescent {
        ProportionalDescent::new(&Environment::mars(), &VehicleSpecification::mars_lander())
    }

    #[test]
    fn observation_reports_degrees() {
        let state = VehicleState::default()
            .with_rotation(std::f64::consts::PI)
            .with_rotation_rate(std::f64::consts::FRAC_PI_2);
        let observation = Observation::from(&state);
        assert!((observation.rotation - 180.).abs() < 1e-9);
        assert!((observation.rotation_rate - 90.).abs() < 1e-9);
    }

    #[test]
    fn retrograde_cutoff() {
        let mut policy = RetrogradeCutoff(ConstantThrust(ThrustCommand::new(5., 5.)));
        assert_eq!(policy.decide(&observe(100., -1., 0.)).unwrap(), ThrustCommand::zero());
        assert_eq!(
            policy.decide(&observe(100., 1., 0.)).unwrap(),
            ThrustCommand::new(5., 5.)
        );
    }

    #[test]
    fn closures_are_policies() {
        let mut calls = 0;
        let mut policy = |_: &Observation| -> Result<ThrustCommand, PolicyError> {
            calls += 1;
            Err(PolicyError("no rules fired".to_owned()))
        };
        assert!(policy.decide(&observe(1., 1., 0.)).is_err());
        assert_eq!(policy.name(), "closure");
        assert_eq!(calls, 1);
    }

    #[test]
    fn proportional_stays_within_limits() {
        let mut policy = proportional();
        for height in [0., 10., 500., 1500.] {
            for speed in [0., 5., 100., 400., 10000.] {
                let cmd = policy.decide(&observe(height, speed, 0.)).unwrap();
                assert!((0f64..=400000.).contains(&cmd.left));
                assert!((0f64..=400000.).contains(&cmd.right));
            }
        }
    }

    #[test]
    fn proportional_brakes_harder_when_faster() {
        let mut policy = proportional();
        let slow = policy.decide(&observe(500., 80., 0.)).unwrap();
        let fast = policy.decide(&observe(500., 120., 0.)).unwrap();
        assert!(fast.left > slow.left);
        assert_eq!(fast.left, fast.right);
    }

    #[test]
    fn proportional_steers_back_to_site() {
        let mut policy = proportional();
        let right_of_site = policy.decide(&observe(500., 100., 20.)).unwrap();
        assert!(right_of_site.left < right_of_site.right);
        let left_of_site = policy.decide(&observe(500., 100., -20.)).unwrap();
        assert!(left_of_site.left > left_of_site.right);
    }

    #[test]
    fn tagged_policies() {
        let mut free_fall = Policy::FreeFall;
        assert_eq!(free_fall.decide(&observe(10., 10., 0.)).unwrap(), ThrustCommand::zero());
        let mut custom = Policy::Custom(Box::new(ConstantThrust(ThrustCommand::new(1., 2.))));
        assert_eq!(custom.decide(&observe(10., 10., 0.)).unwrap(), ThrustCommand::new(1., 2.));
        assert_eq!(custom.name(), "constant");
    }
}
