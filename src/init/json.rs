use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use json::{self, JsonValue};

use crate::error::Error;
use crate::simulation::*;

mod defaults {
    pub const TRIALS: usize = 100;
}

macro_rules! get_json {
    ($json:ident,$($key:literal),+, $func:ident) => {
        $json$([$key])+
            .$func()
            .ok_or_else(|| Error::Config(concat!("Couldn't find ", $("/", $key),+).to_owned()))?
    };
}

macro_rules! get_json_opt {
    ($json:ident,$($key:literal),+, $func:ident) => {{
        let value = &$json$([$key])+;
        if value.is_null() {
            None
        } else {
            Some(value.$func().ok_or_else(|| {
                Error::Config(concat!("Invalid value of ", $("/", $key),+).to_owned())
            })?)
        }
    }};
}

/// How a scenario wants its vehicle driven.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSettings {
    pub trials: usize,
    pub delay: Duration,
    pub step_limit: Option<u64>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            trials: defaults::TRIALS,
            delay: Duration::ZERO,
            step_limit: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Scenario {
    pub environment: Environment,
    pub specification: VehicleSpecification,
    pub settings: RunSettings,
}

impl Scenario {
    pub fn mars() -> Self {
        Self {
            environment: Environment::mars(),
            specification: VehicleSpecification::mars_lander(),
            settings: RunSettings::default(),
        }
    }

    /// Fresh vehicle at the start of the scenario.
    pub fn vehicle(&self) -> Vehicle {
        let vehicle = Vehicle::new(
            self.environment.clone(),
            Arc::new(self.specification.clone()),
        )
        .with_delay(self.settings.delay);
        match self.settings.step_limit {
            Some(limit) => vehicle.with_step_limit(limit),
            None => vehicle,
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::mars()
    }
}

pub fn parse_scenario(scenario_file_path: impl AsRef<Path>) -> Result<Scenario, Error> {
    let content = std::fs::read_to_string(scenario_file_path)?;
    parse_from_string(&content)
}

pub fn parse_from_string(content: &str) -> Result<Scenario, Error> {
    let scenario_json = json::parse(content)?;
    Ok(Scenario {
        environment: parse_environment(&scenario_json)?,
        specification: parse_specification(&scenario_json)?,
        settings: parse_settings(&scenario_json)?,
    })
}

fn parse_environment(json: &JsonValue) -> Result<Environment, Error> {
    let environment = Environment::try_new(
        get_json!(json, "Environment", "Gravity", as_f64),
        get_json!(json, "Environment", "Viscosity", as_f64),
        get_json!(json, "Environment", "Turbulence", as_f64),
    )?;
    Ok(match get_json_opt!(json, "Environment", "Seed", as_u64) {
        Some(seed) => environment.with_seed(seed),
        None => environment,
    })
}

fn parse_specification(json: &JsonValue) -> Result<VehicleSpecification, Error> {
    VehicleSpecification::try_new(
        get_json!(json, "Vehicle", "EmptyMass", as_f64),
        get_json!(json, "Vehicle", "FuelCapacity", as_f64),
        get_json!(json, "Vehicle", "BurnRate", as_f64),
        get_json!(json, "Vehicle", "MaxThrust", as_f64),
        get_json!(json, "Vehicle", "Radius", as_f64),
        get_json!(json, "Vehicle", "StartHeight", as_f64),
        get_json!(json, "Vehicle", "SafeLandingSpeed", as_f64),
    )
}

fn parse_settings(json: &JsonValue) -> Result<RunSettings, Error> {
    let delay_ms = get_json_opt!(json, "Run", "DelayMs", as_u64).unwrap_or(0);
    Ok(RunSettings {
        trials: get_json_opt!(json, "Run", "Trials", as_usize).unwrap_or(defaults::TRIALS),
        delay: Duration::from_millis(delay_ms),
        step_limit: get_json_opt!(json, "Run", "StepLimit", as_u64),
    })
}
