use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{require, Error};

mod defaults {
    pub const MARS_GRAVITY: f64 = 3.69;
    pub const MARS_VISCOSITY: f64 = 0.14;
    pub const MARS_TURBULENCE: f64 = 50.;
    pub const VERTICAL_TURBULENCE_SHARE: f64 = 0.1;
}

/// Physical constants of the body being landed on together with the
/// turbulent impulse that persists from one step to the next.
#[derive(Clone, Debug)]
pub struct Environment {
    gravity: f64,
    viscosity: f64,
    turbulence: f64,
    impulse: (f64, f64),
    rng: StdRng,
}

impl Environment {
    pub fn try_new(gravity: f64, viscosity: f64, turbulence: f64) -> Result<Self, Error> {
        Ok(Self {
            gravity: require("gravity", gravity, gravity > 0.)?,
            viscosity: require("viscosity", viscosity, viscosity > 0.)?,
            turbulence: require("turbulence", turbulence, turbulence >= 0.)?,
            impulse: (0., 0.),
            rng: StdRng::from_entropy(),
        })
    }

    pub fn mars() -> Self {
        Self {
            gravity: defaults::MARS_GRAVITY,
            viscosity: defaults::MARS_VISCOSITY,
            turbulence: defaults::MARS_TURBULENCE,
            impulse: (0., 0.),
            rng: StdRng::from_entropy(),
        }
    }

    /// Makes the turbulence sequence reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..self
        }
    }

    pub fn with_turbulence(self, turbulence: f64) -> Result<Self, Error> {
        Ok(Self {
            turbulence: require("turbulence", turbulence, turbulence >= 0.)?,
            ..self
        })
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn viscosity(&self) -> f64 {
        self.viscosity
    }

    pub fn turbulence(&self) -> f64 {
        self.turbulence
    }

    pub fn current_impulse(&self) -> (f64, f64) {
        self.impulse
    }

    /// Zeroes the turbulence memory. The random stream itself keeps going so
    /// consecutive runs see different weather.
    pub fn reset(&mut self) {
        self.impulse = (0., 0.);
    }

    /// Random walk step of the persistent impulse, in Newtons.
    pub fn sample_turbulent_impulse(&mut self) -> (f64, f64) {
        if self.turbulence == 0. {
            return self.impulse;
        }
        let dx = self.turbulence * 2. * (self.rng.gen::<f64>() - 0.5);
        let dy = defaults::VERTICAL_TURBULENCE_SHARE
            * self.turbulence
            * 2.
            * (self.rng.gen::<f64>() - 0.5);
        self.impulse = (self.impulse.0 + dx, self.impulse.1 + dy);
        self.impulse
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::mars()
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn rejects_negative_turbulence() {
        assert!(Environment::try_new(3.69, 0.14, -1.).is_err());
        assert!(Environment::try_new(3.69, 0., 1.).is_err());
        assert!(Environment::try_new(f64::NAN, 0.14, 1.).is_err());
        assert!(Environment::try_new(3.69, 0.14, 0.).is_ok());
    }

    #[test]
    fn impulse_walk_is_bounded_per_step() {
        let mut env = Environment::mars().with_seed(7);
        let mut previous = env.current_impulse();
        for _ in 0..1000 {
            let next = env.sample_turbulent_impulse();
            assert!((next.0 - previous.0).abs() <= 50.);
            assert!((next.1 - previous.1).abs() <= 5.);
            previous = next;
        }
    }

    #[test]
    fn impulse_persists_between_samples() {
        let mut env = Environment::mars().with_seed(3);
        let first = env.sample_turbulent_impulse();
        assert_eq!(env.current_impulse(), first);
        env.reset();
        assert_eq!(env.current_impulse(), (0., 0.));
    }

    #[test]
    fn calm_environment_has_no_impulse() {
        let mut env = Environment::mars().with_turbulence(0.).unwrap();
        for _ in 0..10 {
            assert_eq!(env.sample_turbulent_impulse(), (0., 0.));
        }
    }

    #[test]
    fn seeded_environments_agree() {
        let mut a = Environment::mars().with_seed(11);
        let mut b = Environment::mars().with_seed(11);
        for _ in 0..100 {
            assert_eq!(a.sample_turbulent_impulse(), b.sample_turbulent_impulse());
        }
    }
}
