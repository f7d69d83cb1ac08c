use std::f64::consts::PI;

use super::Environment;
use crate::error::{require, Error};

mod defaults {
    pub const MARS_LANDER_EMPTY_MASS: f64 = 570.;
    pub const MARS_LANDER_FUEL_CAPACITY: f64 = 190.;
    // 1 / exhaust gas velocity
    pub const MARS_LANDER_BURN_RATE: f64 = 1. / 2600.;
    pub const MARS_LANDER_MAX_THRUST: f64 = 400000.;
    pub const MARS_LANDER_RADIUS: f64 = 2.;
    pub const MARS_LANDER_START_HEIGHT: f64 = 1500.;
    pub const MARS_LANDER_SAFE_LANDING_SPEED: f64 = 10.;
}

/// Static parameters of a vehicle, shared read-only between runs.
#[derive(Clone, Debug, PartialEq)]
pub struct VehicleSpecification {
    empty_mass: f64,
    fuel_capacity: f64,
    burn_rate: f64,
    max_thrust: f64,
    radius: f64,
    start_height: f64,
    safe_landing_speed: f64,
}

impl VehicleSpecification {
    /// Masses in kg, burn rate in kg/Ns, thrust per nozzle in N, lengths in m
    /// and the safe landing speed in m/s. Every value has to be positive.
    #[allow(clippy::too_many_arguments)]
    pub fn try_new(
        empty_mass: f64,
        fuel_capacity: f64,
        burn_rate: f64,
        max_thrust: f64,
        radius: f64,
        start_height: f64,
        safe_landing_speed: f64,
    ) -> Result<Self, Error> {
        let positive = |name, value: f64| require(name, value, value > 0.);
        Ok(Self {
            empty_mass: positive("empty_mass", empty_mass)?,
            fuel_capacity: positive("fuel_capacity", fuel_capacity)?,
            burn_rate: positive("burn_rate", burn_rate)?,
            max_thrust: positive("max_thrust", max_thrust)?,
            radius: positive("radius", radius)?,
            start_height: positive("start_height", start_height)?,
            safe_landing_speed: positive("safe_landing_speed", safe_landing_speed)?,
        })
    }

    pub fn mars_lander() -> Self {
        Self {
            empty_mass: defaults::MARS_LANDER_EMPTY_MASS,
            fuel_capacity: defaults::MARS_LANDER_FUEL_CAPACITY,
            burn_rate: defaults::MARS_LANDER_BURN_RATE,
            max_thrust: defaults::MARS_LANDER_MAX_THRUST,
            radius: defaults::MARS_LANDER_RADIUS,
            start_height: defaults::MARS_LANDER_START_HEIGHT,
            safe_landing_speed: defaults::MARS_LANDER_SAFE_LANDING_SPEED,
        }
    }

    pub fn empty_mass(&self) -> f64 {
        self.empty_mass
    }

    pub fn fuel_capacity(&self) -> f64 {
        self.fuel_capacity
    }

    pub fn burn_rate(&self) -> f64 {
        self.burn_rate
    }

    pub fn max_thrust(&self) -> f64 {
        self.max_thrust
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn start_height(&self) -> f64 {
        self.start_height
    }

    pub fn safe_landing_speed(&self) -> f64 {
        self.safe_landing_speed
    }

    /// Stokes drag coefficient of the body, before dividing by mass.
    pub(crate) fn drag_coefficient(&self, env: &Environment) -> f64 {
        6. * PI * self.radius * env.viscosity()
    }
}

impl Default for VehicleSpecification {
    fn default() -> Self {
        Self::mars_lander()
    }
}

/// Descent speed the vehicle starts from, derived from the balance of
/// gravity and Stokes drag of a fully fuelled vehicle.
pub fn terminal_velocity(env: &Environment, spec: &VehicleSpecification) -> f64 {
    0.5 * (spec.empty_mass + spec.fuel_capacity) * env.gravity() / spec.drag_coefficient(env)
}
