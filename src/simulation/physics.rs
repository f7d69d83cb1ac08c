use log::trace;

use super::{Environment, VehicleSpecification};
use crate::error::{require, Error};

mod defaults {
    pub const DT: f64 = 0.02;
    pub const ROTATION_RADIUS: f64 = 10.;
}

/// Thrust pair in Newtons, one value per nozzle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ThrustCommand {
    pub left: f64,
    pub right: f64,
}

impl ThrustCommand {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.left == 0. && self.right == 0.
    }

    fn total(&self) -> f64 {
        self.left + self.right
    }
}

/// Kinematic and consumable state of one vehicle.
///
/// Speeds are positive towards the surface (vertical) and to the right
/// (lateral), rotation is in radians anti-clockwise.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VehicleState {
    pub height: f64,
    pub vertical_speed: f64,
    pub lateral_position: f64,
    pub lateral_speed: f64,
    pub rotation: f64,
    pub rotation_rate: f64,
    pub fuel: f64,
    pub left_thrust: f64,
    pub right_thrust: f64,
}

impl VehicleState {
    pub fn with_height(self, height: f64) -> Self {
        Self { height, ..self }
    }

    pub fn with_vertical_speed(self, vertical_speed: f64) -> Self {
        Self {
            vertical_speed,
            ..self
        }
    }

    pub fn with_lateral_position(self, lateral_position: f64) -> Self {
        Self {
            lateral_position,
            ..self
        }
    }

    pub fn with_lateral_speed(self, lateral_speed: f64) -> Self {
        Self {
            lateral_speed,
            ..self
        }
    }

    pub fn with_rotation(self, rotation: f64) -> Self {
        Self { rotation, ..self }
    }

    pub fn with_rotation_rate(self, rotation_rate: f64) -> Self {
        Self {
            rotation_rate,
            ..self
        }
    }

    pub fn with_fuel(self, fuel: f64) -> Self {
        Self { fuel, ..self }
    }

    pub fn with_thrust(self, thrust: ThrustCommand) -> Self {
        Self {
            left_thrust: thrust.left,
            right_thrust: thrust.right,
            ..self
        }
    }

    pub fn thrust(&self) -> ThrustCommand {
        ThrustCommand::new(self.left_thrust, self.right_thrust)
    }

    pub fn speed(&self) -> f64 {
        self.lateral_speed.hypot(self.vertical_speed)
    }

    pub fn has_landed(&self) -> bool {
        self.height <= 0.
    }

    fn cut_engines(&mut self) {
        self.left_thrust = 0.;
        self.right_thrust = 0.;
    }
}

pub struct Physics {
    dt: f64,
    rotation_radius: f64,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            dt: defaults::DT,
            rotation_radius: defaults::ROTATION_RADIUS,
        }
    }
}

impl Physics {
    pub fn with_dt(self, dt: f64) -> Result<Self, Error> {
        Ok(Self {
            dt: require("dt", dt, dt > 0.)?,
            ..self
        })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Moment arm of the nozzles, in m.
    pub fn rotation_radius(&self) -> f64 {
        self.rotation_radius
    }

    /// Advances the state by one timestep with explicit Euler. A landed
    /// vehicle is returned untouched.
    pub fn iterate(
        &self,
        mut state: VehicleState,
        spec: &VehicleSpecification,
        env: &mut Environment,
    ) -> VehicleState {
        if state.has_landed() {
            return state;
        }
        let dt = self.dt;

        // fuel for this step, engines throttle down together when it runs short
        let commanded = state.thrust();
        let fuel_used = (commanded.total() * dt * spec.burn_rate()).min(state.fuel);
        let effective = effective_thrust(commanded, fuel_used / (dt * spec.burn_rate()));

        // position
        state.height -= state.vertical_speed * dt;
        if state.height <= 0. {
            state.height = 0.;
            state.cut_engines();
        }
        state.lateral_position += state.lateral_speed * dt;
        state.rotation += state.rotation_rate * dt;

        // fuel burned during this step is neglected
        let mass = spec.empty_mass() + state.fuel;

        // gravity, Stokes drag and turbulence
        state.vertical_speed += dt * env.gravity();
        let drag = spec.drag_coefficient(env) / mass;
        state.lateral_speed -= dt * drag * state.lateral_speed;
        state.vertical_speed -= dt * drag * state.vertical_speed;
        let (impulse_x, impulse_y) = env.sample_turbulent_impulse();
        state.lateral_speed += dt * impulse_x / mass;
        state.vertical_speed += dt * impulse_y / mass;

        // differential thrust spins, the common part pushes
        let rr2 = self.rotation_radius.powi(2);
        state.rotation_rate += dt * (effective.right - effective.left) / (mass * rr2);
        let thrust = 2. * effective.left.min(effective.right);
        let (sin, cos) = state.rotation.sin_cos();
        state.vertical_speed -= dt * thrust * cos / mass;
        state.lateral_speed -= dt * thrust * sin / mass;

        state.fuel -= fuel_used;
        if state.fuel == 0. {
            state.cut_engines();
        }

        trace!(
            "height: {:.2} vertical speed: {:.2} location: {:.2} horizontal speed: {:.2} \
             angle: {:.2} rotational speed: {:.2} fuel: {:.2} thrust: {:.2}/{:.2} turbulence: {:.2}/{:.2}",
            state.height,
            state.vertical_speed,
            state.lateral_position,
            state.lateral_speed,
            state.rotation.to_degrees(),
            state.rotation_rate.to_degrees(),
            state.fuel,
            state.left_thrust,
            state.right_thrust,
            impulse_x,
            impulse_y,
        );
        state
    }
}

fn effective_thrust(commanded: ThrustCommand, effective_total: f64) -> ThrustCommand {
    let total = commanded.total();
    if total > 0. {
        let ratio = effective_total / total;
        ThrustCommand::new(ratio * commanded.left, ratio * commanded.right)
    } else {
        ThrustCommand::zero()
    }
}

/// Whether `cmd` may replace the current thrust setting.
pub(crate) fn validate_thrust(state: &VehicleState, cmd: ThrustCommand, max_thrust: f64) -> bool {
    if state.fuel == 0. || state.has_landed() {
        cmd.is_zero()
    } else {
        let range = 0f64..=max_thrust;
        range.contains(&cmd.left) && range.contains(&cmd.right)
    }
}
