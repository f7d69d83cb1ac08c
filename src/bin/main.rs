use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use simulation::init::json::{parse_scenario, Scenario};
use simulation::{
    ConstantThrust, Evaluator, HistoryRecorder, Policy, ProportionalDescent, ThrustCommand,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyKind {
    FreeFall,
    /// Both nozzles hold the thrust that balances gravity at full tank
    Constant,
    Proportional,
}

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Scenario json file path, Mars defaults when absent
    #[arg(long, value_name = "FILE")]
    scenario: Option<PathBuf>,

    #[arg(long, short, value_enum, default_value = "proportional")]
    policy: PolicyKind,

    /// Number of trials, overrides the scenario
    #[arg(long, short)]
    trials: Option<usize>,

    /// Seed for the turbulence
    #[arg(long)]
    seed: Option<u64>,

    /// Stop runs that take more steps than this
    #[arg(long)]
    step_limit: Option<u64>,

    /// Fly a single paced run and print its telemetry
    #[arg(long, short)]
    watch: bool,

    /// Log every trial
    #[arg(long, short)]
    debug: bool,
}

fn make_policy(kind: PolicyKind, scenario: &Scenario) -> Policy {
    let env = &scenario.environment;
    let spec = &scenario.specification;
    match kind {
        PolicyKind::FreeFall => Policy::FreeFall,
        PolicyKind::Constant => {
            let hover = 0.5 * (spec.empty_mass() + spec.fuel_capacity()) * env.gravity();
            Policy::Constant(ConstantThrust(ThrustCommand::new(hover, hover)))
        }
        PolicyKind::Proportional => Policy::Proportional(ProportionalDescent::new(env, spec)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut scenario = match &cli.scenario {
        Some(path) => parse_scenario(path)?,
        None => Scenario::mars(),
    };
    if let Some(seed) = cli.seed {
        scenario.environment = scenario.environment.with_seed(seed);
    }
    if let Some(trials) = cli.trials {
        scenario.settings.trials = trials;
    }
    if cli.step_limit.is_some() {
        scenario.settings.step_limit = cli.step_limit;
    }

    let mut policy = make_policy(cli.policy, &scenario);

    if cli.watch {
        if scenario.settings.delay.is_zero() {
            scenario.settings.delay = Duration::from_millis(1);
        }
        let mut vehicle = scenario.vehicle();
        let recorder = HistoryRecorder::starting_from(&vehicle.state());
        vehicle.add_observer(recorder.clone());

        let now = std::time::Instant::now();
        let outcome = vehicle.run(&mut policy)?;
        let elapsed = now.elapsed();

        println!("{}", recorder.history().pretty_to_string());
        println!("Run ended with result: {outcome:?} time: {elapsed:?}");
        return Ok(());
    }

    let mut vehicle = scenario.vehicle();
    let evaluation = Evaluator::new(scenario.settings.trials).evaluate(&mut policy, &mut vehicle)?;
    println!(
        "Average fitness: {:.2} ({} of {} runs landed)",
        evaluation.average_fitness, evaluation.completed, evaluation.trials
    );
    Ok(())
}
