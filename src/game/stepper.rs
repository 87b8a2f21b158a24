//! Fixed-timestep accumulator driving [`PhysicsWorld`] from variable frame deltas.

use super::constants::physics as consts;
use super::physics::PhysicsWorld;

/// What one `step` call did, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepOutcome {
    /// Fixed steps actually run
    pub steps: u32,
    /// Interpolation fraction in [0, 1)
    pub alpha: f32,
    /// True when the per-frame cap was hit and the backlog was dropped
    pub capped: bool,
}

#[derive(Debug, Clone)]
pub struct FixedStepper {
    fixed_step: f32,
    max_delta: f32,
    max_steps: u32,
    accumulator: f32,
    total_steps: u64,
}

impl FixedStepper {
    pub fn new() -> Self {
        Self::with_limits(consts::TIMESTEP, consts::MAX_FRAME_DELTA, consts::MAX_STEPS_PER_FRAME)
    }

    pub fn with_limits(fixed_step: f32, max_delta: f32, max_steps: u32) -> Self {
        Self {
            fixed_step,
            max_delta,
            max_steps: max_steps.max(1),
            accumulator: 0.0,
            total_steps: 0,
        }
    }

    pub fn fixed_step(&self) -> f32 {
        self.fixed_step
    }

    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Fixed steps run since construction
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Advances the world by as many fixed steps as `delta_seconds` pays for and
    /// returns the interpolation alpha. A missing world is a no-op returning 0.
    pub fn step(&mut self, world: Option<&mut PhysicsWorld>, delta_seconds: f32) -> f32 {
        match world {
            Some(world) => self.advance(delta_seconds, |_| world.step()).alpha,
            None => 0.0,
        }
    }

    /// Accumulator core, generic over the step action so it can be driven
    /// without a physics world.
    pub fn advance<F>(&mut self, delta_seconds: f32, mut step_once: F) -> StepOutcome
    where
        F: FnMut(u32),
    {
        let delta = if delta_seconds.is_finite() {
            delta_seconds.clamp(0.0, self.max_delta)
        } else {
            0.0
        };
        self.accumulator += delta;

        let mut steps = 0;
        while self.accumulator >= self.fixed_step && steps < self.max_steps {
            step_once(steps);
            self.accumulator -= self.fixed_step;
            steps += 1;
        }
        self.total_steps += u64::from(steps);

        let mut capped = false;
        if self.accumulator >= self.fixed_step {
            log::warn!(
                "[Stepper] Hit {} steps in one frame, dropping {:.3}s of backlog",
                self.max_steps,
                self.accumulator
            );
            self.accumulator = 0.0;
            capped = true;
        }

        let alpha = (self.accumulator / self.fixed_step).clamp(0.0, 1.0);
        // Guard against the accumulator landing a hair under fixed_step.
        let alpha = if alpha >= 1.0 { 0.0 } else { alpha };

        StepOutcome {
            steps,
            alpha,
            capped,
        }
    }
}

impl Default for FixedStepper {
    fn default() -> Self {
        Self::new()
    }
}
