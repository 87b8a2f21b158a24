//! Fixed-step accumulator properties under irregular frame times.

use locomotor::game::FixedStepper;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const STEP: f32 = 1.0 / 60.0;

#[test]
fn test_accumulated_time_is_conserved() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut stepper = FixedStepper::new();
    let mut fed = 0.0_f64;

    for _ in 0..2_000 {
        // Below the per-frame cap, so nothing is ever dropped.
        let dt: f32 = rng.gen_range(0.0..0.1);
        fed += f64::from(dt);
        let outcome = stepper.advance(dt, |_| {});

        assert!(!outcome.capped);
        assert!(outcome.alpha >= 0.0 && outcome.alpha < 1.0, "alpha={}", outcome.alpha);
        assert!(stepper.accumulator() < STEP + 1e-5);
    }

    let simulated = stepper.total_steps() as f64 * f64::from(STEP) + f64::from(stepper.accumulator());
    println!("fed {:.4}s, simulated {:.4}s", fed, simulated);
    assert!((fed - simulated).abs() < 0.01);
}

#[test]
fn test_step_callback_runs_once_per_step() {
    let mut stepper = FixedStepper::new();
    let mut calls = Vec::new();
    let outcome = stepper.advance(0.07, |i| calls.push(i));
    assert_eq!(outcome.steps, 4);
    assert_eq!(calls, vec![0, 1, 2, 3]);
}

#[test]
fn test_long_stall_is_capped() {
    let mut stepper = FixedStepper::with_limits(STEP, 1.0, 10);
    let outcome = stepper.advance(0.5, |_| {});
    assert_eq!(outcome.steps, 10);
    assert!(outcome.capped);
    assert_eq!(stepper.accumulator(), 0.0);
    assert_eq!(outcome.alpha, 0.0);

    // Next normal frame carries no backlog.
    let outcome = stepper.advance(STEP * 1.5, |_| {});
    assert_eq!(outcome.steps, 1);
    assert!(!outcome.capped);
}

#[test]
fn test_bad_deltas_are_ignored() {
    let mut stepper = FixedStepper::new();
    for dt in [f32::NAN, f32::INFINITY, -1.0] {
        let outcome = stepper.advance(dt, |_| panic!("no step expected"));
        assert_eq!(outcome.steps, 0);
    }
    assert_eq!(stepper.total_steps(), 0);
}
