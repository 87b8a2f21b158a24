use crate::game::constants::locomotion::TIMER_EPSILON;

/// One-shot countdown advanced from the frame update.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Countdown {
    remaining: Option<f32>,
}

impl Countdown {
    pub fn arm(&mut self, seconds: f32) {
        self.remaining = Some(seconds.max(0.0));
    }

    pub fn clear(&mut self) {
        self.remaining = None;
    }

    pub fn is_armed(&self) -> bool {
        self.remaining.is_some()
    }

    /// Advances by `dt`. Returns true on the tick the countdown runs out,
    /// after which it is disarmed.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.remaining else {
            return false;
        };
        let left = remaining - dt;
        if left <= TIMER_EPSILON {
            self.remaining = None;
            true
        } else {
            self.remaining = Some(left);
            false
        }
    }
}
