//! Start delay before the loop takes over the keyboard.
use std::time::Duration;

use bot_core::Clock;

/// Wait `delay`, logging the remaining whole seconds once per second.
pub fn countdown(delay: Duration, clock: &dyn Clock) {
    if delay.is_zero() {
        return;
    }
    tracing::info!("Starting in {:.1}s, focus the game window", delay.as_secs_f64());

    let mut remaining = delay;
    while !remaining.is_zero() {
        let step = remaining.min(Duration::from_secs(1));
        tracing::info!("{}...", remaining.as_secs_f64().ceil() as u64);
        clock.sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_core::ManualClock;

    #[test]
    fn test_countdown_sleeps_full_delay() {
        let clock = ManualClock::new();
        countdown(Duration::from_millis(2500), &clock);
        assert_eq!(clock.now(), Duration::from_millis(2500));
    }

    #[test]
    fn test_zero_delay_returns_immediately() {
        let clock = ManualClock::new();
        countdown(Duration::ZERO, &clock);
        assert_eq!(clock.now(), Duration::ZERO);
    }
}
