use log::{debug, info, warn};

use crate::error::Error;
use crate::simulation::*;

/// Result of a batch of trials.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub trials: usize,
    pub completed: usize,
    pub average_fitness: f64,
    /// Per trial fitness, `None` for runs that were stopped before landing.
    pub fitness: Vec<Option<f64>>,
}

pub struct Evaluator {
    trials: usize,
}

impl Evaluator {
    pub fn new(trials: usize) -> Self {
        Self { trials }
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Runs the trials one after another on the same vehicle. Aborted runs
    /// add nothing to the sum but still count towards the average.
    pub fn evaluate<P: ControlPolicy + ?Sized>(
        &self,
        policy: &mut P,
        vehicle: &mut Vehicle,
    ) -> Result<Evaluation, Error> {
        if self.trials == 0 {
            return Err(Error::NoTrials);
        }
        let fitness = (0..self.trials)
            .map(|trial| {
                vehicle.reset();
                policy.reset();
                let outcome = vehicle.run(policy)?;
                match outcome.fitness() {
                    Some(fitness) => debug!("Fitness for run {trial} = {fitness:.2}"),
                    None => warn!("Run {trial} stopped after {} steps", outcome.steps()),
                }
                Ok(outcome.fitness())
            })
            .collect::<Result<Vec<_>, Error>>()?;

        let completed = fitness.iter().flatten().count();
        let average_fitness = fitness.iter().flatten().sum::<f64>() / self.trials as f64;
        info!(
            "{}: average fitness {average_fitness:.2} over {} trials ({completed} landed)",
            policy.name(),
            self.trials
        );
        Ok(Evaluation {
            trials: self.trials,
            completed,
            average_fitness,
            fitness,
        })
    }
}

/// Average fitness of `policy` over `trials` runs of `vehicle`.
pub fn evaluate<P: ControlPolicy + ?Sized>(
    policy: &mut P,
    vehicle: &mut Vehicle,
    trials: usize,
) -> Result<f64, Error> {
    Evaluator::new(trials)
        .evaluate(policy, vehicle)
        .map(|evaluation| evaluation.average_fitness)
}
