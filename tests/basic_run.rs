use std::sync::mpsc;
use std::sync::Arc;

use simulation::{
    evaluate, ConstantThrust, Environment, Evaluator, InitialConditions, Policy,
    ProportionalDescent, Snapshot, ThrustCommand, Vehicle, VehicleSpecification, VehicleState,
};

fn assert_close(left: f64, right: f64, range: f64) {
    if (left - right).abs() > range {
        panic!("Assertion failed {left} not close to {right} within a range {range}");
    }
}

fn mars_vehicle(turbulence: f64, seed: u64) -> Vehicle {
    Vehicle::new(
        Environment::mars()
            .with_seed(seed)
            .with_turbulence(turbulence)
            .unwrap(),
        Arc::new(VehicleSpecification::mars_lander()),
    )
}

fn record(vehicle: &mut Vehicle) -> mpsc::Receiver<Snapshot> {
    let (tx, rx) = mpsc::channel();
    vehicle.add_observer(move |snapshot: &Snapshot| {
        let _ = tx.send(*snapshot);
    });
    rx
}

#[test]
fn free_fall_lands_destroyed() {
    let mut vehicle = mars_vehicle(50., 1);
    let outcome = vehicle.run(&mut Policy::FreeFall).unwrap();
    assert!(outcome.steps() > 0);
    assert_eq!(outcome.fitness(), Some(0.));
    assert_eq!(vehicle.state().height, 0.);
}

#[test]
fn free_fall_follows_stokes_solution() {
    let spec = VehicleSpecification::mars_lander();
    let env = Environment::mars().with_turbulence(0.).unwrap();
    let mass = spec.empty_mass() + spec.fuel_capacity();
    let k = 6. * std::f64::consts::PI * spec.radius() * env.viscosity() / mass;
    let v_inf = env.gravity() / k;

    let mut vehicle = Vehicle::new(env, Arc::new(spec));
    let v0 = vehicle.state().vertical_speed;
    for _ in 0..100 {
        assert!(vehicle.step());
    }
    let t = 100. * 0.02;
    let expected_speed = v_inf + (v0 - v_inf) * (-k * t).exp();
    let expected_height = 1500. - (v_inf * t + (v0 - v_inf) * (1. - (-k * t).exp()) / k);
    let state = vehicle.state();
    assert_close(state.vertical_speed, expected_speed, 1e-3 * expected_speed);
    assert_close(state.height, expected_height, 1e-3 * expected_height);
    assert_eq!(state.fuel, 190.);
}

#[test]
fn hover_thrust_holds_altitude() {
    let hover = 0.5 * (570. + 190.) * 3.69;
    let mut vehicle = mars_vehicle(0., 0)
        .with_initial_conditions(InitialConditions {
            height: 10000.,
            vertical_speed: 0.,
            fuel: 190.,
            thrust: ThrustCommand::new(hover, hover),
        })
        .unwrap();
    for _ in 0..500 {
        assert!(vehicle.step());
    }
    let state = vehicle.state();
    assert!(state.vertical_speed.abs() < 1.);
    assert_close(state.height, 10000., 10.);
    assert_close(state.fuel, 190. - 500. * 2. * hover * 0.02 / 2600., 1e-6);
}

#[test]
fn balancing_thrust_damps_descent() {
    // both nozzles together carry the full-tank weight
    let hover = 0.5 * (570. + 190.) * 3.69;
    let mut vehicle = mars_vehicle(0., 0);
    assert!(vehicle.request_thrust(ThrustCommand::new(hover, hover)));
    let mut previous = vehicle.state().vertical_speed;
    assert_close(previous, 0.9 * vehicle.max_descent_speed(), 1e-9);
    for _ in 0..5 {
        for _ in 0..50 {
            assert!(vehicle.step());
        }
        let speed = vehicle.state().vertical_speed;
        assert!(speed > 0.);
        assert!(speed < previous, "{speed} did not drop below {previous}");
        previous = speed;
    }
}

#[test]
fn seeded_runs_are_identical() {
    let fly = || {
        let mut vehicle = mars_vehicle(50., 1234);
        let rx = record(&mut vehicle);
        let spec = VehicleSpecification::mars_lander();
        let mut policy = ProportionalDescent::new(vehicle.environment(), &spec);
        let outcome = vehicle.run(&mut policy).unwrap();
        let states: Vec<VehicleState> = rx.try_iter().map(|s| s.state).collect();
        (outcome, states)
    };
    let (first_outcome, first) = fly();
    let (second_outcome, second) = fly();
    assert_eq!(first_outcome, second_outcome);
    assert_eq!(first, second);
}

#[test]
fn calm_runs_repeat_after_reset() {
    let mut vehicle = mars_vehicle(0., 0);
    let rx = record(&mut vehicle);
    let spec = VehicleSpecification::mars_lander();
    let mut policy = ProportionalDescent::new(vehicle.environment(), &spec);

    let first_outcome = vehicle.run(&mut policy).unwrap();
    let first: Vec<VehicleState> = rx.try_iter().map(|s| s.state).collect();
    vehicle.reset();
    let second_outcome = vehicle.run(&mut policy).unwrap();
    let second: Vec<VehicleState> = rx.try_iter().map(|s| s.state).collect();

    assert_eq!(first_outcome, second_outcome);
    assert_eq!(first.len() as u64, first_outcome.steps());
    assert_eq!(first, second);
}

#[test]
fn consumables_never_go_negative() {
    let mut vehicle = mars_vehicle(50., 99);
    let rx = record(&mut vehicle);
    let spec = VehicleSpecification::mars_lander();
    let mut policy = ProportionalDescent::new(vehicle.environment(), &spec);
    vehicle.run(&mut policy).unwrap();
    let snapshots: Vec<Snapshot> = rx.try_iter().collect();
    assert!(!snapshots.is_empty());
    for (i, snapshot) in snapshots.iter().enumerate() {
        assert_eq!(snapshot.step, i as u64 + 1);
        assert!(snapshot.state.height >= 0.);
        assert!(snapshot.state.fuel >= 0.);
    }
}

#[test]
fn empty_tank_accepts_only_zero_thrust() {
    let mut vehicle = mars_vehicle(0., 0)
        .with_initial_conditions(InitialConditions {
            height: 1000.,
            vertical_speed: 10.,
            fuel: 0.001,
            thrust: ThrustCommand::new(400000., 400000.),
        })
        .unwrap();
    assert!(vehicle.step());
    assert_eq!(vehicle.state().fuel, 0.);
    assert_eq!(vehicle.state().thrust(), ThrustCommand::zero());
    assert!(!vehicle.request_thrust(ThrustCommand::new(1., 0.)));
    assert!(vehicle.request_thrust(ThrustCommand::zero()));
}

#[test]
fn proportional_beats_free_fall() {
    let mut vehicle = mars_vehicle(50., 2024);
    let spec = VehicleSpecification::mars_lander();
    let mut policy = ProportionalDescent::new(vehicle.environment(), &spec);
    let evaluation = Evaluator::new(5).evaluate(&mut policy, &mut vehicle).unwrap();
    assert_eq!(evaluation.completed, 5);
    assert!(evaluation.average_fitness > 0.);
    assert!(evaluation.average_fitness <= 100.);

    let free_fall = evaluate(&mut Policy::FreeFall, &mut vehicle, 5).unwrap();
    assert_eq!(free_fall, 0.);
}

#[test]
fn constant_policy_in_spawned_run() {
    let vehicle = mars_vehicle(0., 0);
    let handle = vehicle.spawn(ConstantThrust(ThrustCommand::zero())).unwrap();
    let (vehicle, _, outcome) = handle.join().unwrap();
    assert!(vehicle.has_landed());
    assert_eq!(outcome.fitness(), Some(0.));
}
