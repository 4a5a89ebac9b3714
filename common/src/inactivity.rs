use log::debug;

use crate::config::BacklightConfig;

pub trait Backlight {
    fn set_level(&mut self, level: u8);
}

/// Monotonic time of the last observed touch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityTimestamp {
    last_ms: u64,
}

impl ActivityTimestamp {
    pub fn new(now_ms: u64) -> Self {
        Self { last_ms: now_ms }
    }

    pub fn last_ms(&self) -> u64 {
        self.last_ms
    }

    pub fn record(&mut self, now_ms: u64) {
        self.last_ms = now_ms;
    }

    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ms)
    }
}

pub struct InactivityMonitor<B> {
    backlight: B,
    activity: ActivityTimestamp,
    config: BacklightConfig,
}

impl<B: Backlight> InactivityMonitor<B> {
    pub fn new(backlight: B, config: BacklightConfig) -> Self {
        Self {
            backlight,
            activity: ActivityTimestamp::default(),
            config,
        }
    }

    pub fn activity(&self) -> ActivityTimestamp {
        self.activity
    }

    pub fn backlight(&self) -> &B {
        &self.backlight
    }

    /// Records a touch and restores full brightness.
    pub fn wake(&mut self, now_ms: u64) {
        self.activity.record(now_ms);
        self.backlight.set_level(self.config.active_level);
    }

    /// Dims the backlight once the idle timeout has passed. The dim level is
    /// rewritten on every call past the threshold.
    pub fn check(&mut self, now_ms: u64) -> bool {
        let idle_ms = self.activity.idle_ms(now_ms);
        if idle_ms <= self.config.idle_timeout_ms {
            return false;
        }
        debug!("idle for {idle_ms}ms, dimming backlight");
        self.backlight.set_level(self.config.dim_level);
        true
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fakes::RecordingBacklight;

    fn monitor() -> InactivityMonitor<RecordingBacklight> {
        InactivityMonitor::new(RecordingBacklight::default(), BacklightConfig::default())
    }

    #[test]
    fn dims_only_after_timeout_is_exceeded() {
        let mut monitor = monitor();

        assert!(!monitor.check(10_000));
        assert!(monitor.backlight().levels.is_empty());

        assert!(monitor.check(10_001));
        assert_eq!(monitor.backlight().levels, vec![5]);
    }

    #[test]
    fn dim_write_repeats_every_check() {
        let mut monitor = monitor();

        monitor.check(20_000);
        monitor.check(20_050);
        monitor.check(20_100);

        assert_eq!(monitor.backlight().levels, vec![5, 5, 5]);
    }

    #[test]
    fn wake_restores_brightness_and_resets_idle_clock() {
        let mut monitor = monitor();
        monitor.check(15_000);

        monitor.wake(15_000);
        assert_eq!(monitor.activity().last_ms(), 15_000);
        assert!(!monitor.check(24_000));

        assert!(monitor.check(25_001));
        assert_eq!(monitor.backlight().levels, vec![5, 255, 5]);
    }

    #[test]
    fn clock_going_backwards_counts_as_active() {
        let mut monitor = monitor();
        monitor.wake(50_000);

        assert!(!monitor.check(1_000));
    }
}
