//! Independent interval timers for attack, skill, and pickup pulses.
//!
//! Each action fires when the time since it last fired (or since the
//! scheduler started) exceeds a freshly sampled interval. Due actions fire in declaration order within the same
//! tick; each pulse blocks the loop for its width.
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::Clock;
use crate::error::Result;
use crate::input::{InputDevice, Key, pulse};

/// How long to wait between firings (or how long to hold a pulse).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalSpec {
    Fixed(Duration),
    /// Uniform over `[min, max]`.
    Uniform { min: Duration, max: Duration },
}

impl IntervalSpec {
    /// Uniform interval; the bounds are swapped if given in reverse.
    pub fn uniform(min: Duration, max: Duration) -> Self {
        if min <= max {
            IntervalSpec::Uniform { min, max }
        } else {
            IntervalSpec::Uniform { min: max, max: min }
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        match *self {
            IntervalSpec::Fixed(interval) => interval,
            IntervalSpec::Uniform { min, max } if min == max => min,
            IntervalSpec::Uniform { min, max } => rng.gen_range(min..=max),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Attack,
    Skill,
    Pickup,
}

/// Per-action timer state.
#[derive(Debug, Clone)]
pub struct ScheduledAction {
    kind: ActionKind,
    label: String,
    key: Key,
    interval: IntervalSpec,
    last_fired: Option<Duration>,
    fired: u64,
}

impl ScheduledAction {
    pub fn new(kind: ActionKind, label: impl Into<String>, key: Key, interval: IntervalSpec) -> Self {
        Self {
            kind,
            label: label.into(),
            key,
            interval,
            last_fired: None,
            fired: 0,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn key(&self) -> Key {
        self.key
    }

    /// Loop time of the last successful pulse. Unset until the first one.
    pub fn last_fired(&self) -> Option<Duration> {
        self.last_fired
    }

    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Timers count from the last pulse, else from `started`. An action with
    /// neither is due immediately.
    fn is_due(&self, now: Duration, threshold: Duration, started: Option<Duration>) -> bool {
        match self.last_fired.or(started) {
            None => true,
            Some(last) => now.saturating_sub(last) > threshold,
        }
    }
}

pub struct ActionScheduler {
    actions: Vec<ScheduledAction>,
    pulse_width: IntervalSpec,
    rng: StdRng,
    started: Option<Duration>,
}

impl ActionScheduler {
    pub fn new(pulse_width: IntervalSpec, rng: StdRng) -> Self {
        Self {
            actions: Vec::new(),
            pulse_width,
            rng,
            started: None,
        }
    }

    /// Scheduler with a deterministic random stream.
    pub fn seeded(pulse_width: IntervalSpec, seed: u64) -> Self {
        Self::new(pulse_width, StdRng::seed_from_u64(seed))
    }

    pub fn push(&mut self, action: ScheduledAction) {
        self.actions.push(action);
    }

    pub fn with_action(mut self, action: ScheduledAction) -> Self {
        self.push(action);
        self
    }

    pub fn actions(&self) -> &[ScheduledAction] {
        &self.actions
    }

    /// Start every timer at `now`, so the first pulse of each action waits
    /// one interval.
    pub fn start(&mut self, now: Duration) {
        self.started = Some(now);
    }

    /// Fire every action that is due at `now`. Returns how many fired.
    ///
    /// `last_fired` is recorded only after the pulse completes; an input
    /// failure aborts the tick with the action's timer untouched.
    pub fn run_due(
        &mut self,
        now: Duration,
        device: &mut dyn InputDevice,
        clock: &dyn Clock,
    ) -> Result<usize> {
        let mut fired = 0;
        for action in self.actions.iter_mut() {
            let threshold = action.interval.sample(&mut self.rng);
            if !action.is_due(now, threshold, self.started) {
                continue;
            }

            let width = self.pulse_width.sample(&mut self.rng);
            pulse(device, clock, action.key, width)?;
            action.last_fired = Some(now);
            action.fired += 1;
            fired += 1;

            tracing::debug!(
                "{} '{}' fired on {} (held {}ms)",
                action.kind,
                action.label,
                action.key,
                width.as_millis()
            );
        }
        Ok(fired)
    }
}
