use std::f64::consts::PI;

use super::{VehicleSpecification, VehicleState};

mod defaults {
    pub const BASELINE: f64 = 80.;
    pub const DISTANCE_PENALTY: f64 = 50.;
    pub const DISTANCE_SCALE: f64 = 100.;
    pub const SPEED_PENALTY: f64 = 20.;
    pub const ROTATION_PENALTY: f64 = 40.;
    pub const ROTATION_LIMIT: f64 = 0.1;
    pub const FUEL_WEIGHT: f64 = 20.;
}

/// Wraps an angle in radians into (-pi, pi]. Non-finite angles give NaN.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2. * PI) - PI;
    if wrapped == -PI {
        PI
    } else {
        wrapped
    }
}

/// How a touchdown went, before it is turned into a score.
#[derive(Clone, Debug, PartialEq)]
pub enum Landing {
    Correct,
    Crashed { too_fast: bool, not_vertical: bool },
    Destroyed,
}

impl Landing {
    pub fn assess(state: &VehicleState, spec: &VehicleSpecification) -> Self {
        let speed = state.speed();
        let safe = spec.safe_landing_speed();
        if speed >= 2. * safe {
            return Landing::Destroyed;
        }
        let too_fast = speed > safe;
        let not_vertical = wrap_angle(state.rotation).abs() > defaults::ROTATION_LIMIT;
        if too_fast || not_vertical {
            Landing::Crashed {
                too_fast,
                not_vertical,
            }
        } else {
            Landing::Correct
        }
    }
}

/// Score of a finished run, floored at zero.
pub fn fitness(state: &VehicleState, spec: &VehicleSpecification) -> f64 {
    let (too_fast, not_vertical) = match Landing::assess(state, spec) {
        Landing::Destroyed => return 0.,
        Landing::Correct => (false, false),
        Landing::Crashed {
            too_fast,
            not_vertical,
        } => (too_fast, not_vertical),
    };
    let speed = state.speed();
    let safe = spec.safe_landing_speed();
    let rotation = wrap_angle(state.rotation).abs();
    let capacity = spec.fuel_capacity();

    let mut fitness = defaults::BASELINE;
    fitness -= defaults::DISTANCE_PENALTY * state.lateral_position.abs() / defaults::DISTANCE_SCALE;
    if too_fast {
        fitness -= defaults::SPEED_PENALTY * (speed - safe) / safe;
    }
    if not_vertical {
        fitness -= defaults::ROTATION_PENALTY * rotation / PI;
    }
    if too_fast || not_vertical {
        // spending fuel on a crash is still wasteful
        fitness -= defaults::FUEL_WEIGHT * (capacity - state.fuel) / capacity;
    } else {
        fitness += defaults::FUEL_WEIGHT * state.fuel / capacity;
    }
    fitness.max(0.)
}
