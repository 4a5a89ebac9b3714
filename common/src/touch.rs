use log::info;

use crate::{
    config::ScreenConfig,
    error::SyncError,
    inactivity::{Backlight, InactivityMonitor},
    render::Display,
    sync::{CommandOutcome, Delay, PollOutcome, SyncController},
    transport::Transport,
    types::{Command, TouchPoint, TouchZone},
};

pub const CST816_ADDR_7BIT: u8 = 0x15;
pub const CST816_REG_GESTURE: u8 = 0x01;
pub const CST816_REPORT_LEN: usize = 6;

/// Decodes a CST816 burst read starting at register 0x01:
/// `[GESTURE, FINGERS, XH, XL, YH, YL]`. No fingers means no touch.
pub fn parse_cst816_report(raw: &[u8; CST816_REPORT_LEN]) -> Option<TouchPoint> {
    if raw[1] & 0x0f == 0 {
        return None;
    }
    let x = (u16::from(raw[2] & 0x0f) << 8) | u16::from(raw[3]);
    let y = (u16::from(raw[4] & 0x0f) << 8) | u16::from(raw[5]);
    Some(TouchPoint {
        x,
        y,
        gesture: raw[0],
    })
}

/// Top quarter is Increase, bottom quarter is Decrease; both edges inclusive.
pub fn classify(y: u16, screen_height: u16) -> TouchZone {
    let y = u32::from(y);
    let zone_height = u32::from(screen_height) / 4;
    let lower_start = 3 * zone_height;

    if y <= zone_height {
        TouchZone::Increase
    } else if (lower_start..=lower_start + zone_height).contains(&y) {
        TouchZone::Decrease
    } else {
        TouchZone::Idle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchOutcome {
    pub zone: TouchZone,
    pub refresh: PollOutcome,
    pub command: Option<CommandOutcome>,
}

#[derive(Debug, Clone, Copy)]
pub struct TouchDispatcher {
    screen: ScreenConfig,
}

impl TouchDispatcher {
    pub fn new(screen: ScreenConfig) -> Self {
        Self { screen }
    }

    pub fn zone_for(&self, point: TouchPoint) -> TouchZone {
        classify(point.y, self.screen.height)
    }

    /// Handles one detected touch. Every touch refreshes the setpoint first,
    /// then wakes the backlight, then acts on the zone.
    pub fn dispatch<T, D, W, B>(
        &self,
        point: TouchPoint,
        now_ms: u64,
        sync: &mut SyncController<T, D, W>,
        monitor: &mut InactivityMonitor<B>,
    ) -> Result<TouchOutcome, SyncError>
    where
        T: Transport,
        D: Display,
        W: Delay,
        B: Backlight,
    {
        let refresh = sync.poll()?;
        monitor.wake(now_ms);

        let zone = self.zone_for(point);
        info!("touch at ({}, {}) -> {zone:?}", point.x, point.y);

        let command = match zone.command() {
            Some(command) => {
                sync.display_mut().show_button(command, true);
                Some(sync.send_command(command)?)
            }
            None => {
                let display = sync.display_mut();
                display.show_button(Command::Increase, false);
                display.show_button(Command::Decrease, false);
                None
            }
        };

        Ok(TouchOutcome {
            zone,
            refresh,
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::{BacklightConfig, PollConfig},
        fakes::{page, FakeTransport, RecordingBacklight, RecordingDelay, RecordingDisplay, Screen},
    };

    type TestSync = SyncController<FakeTransport, RecordingDisplay, RecordingDelay>;

    fn rig(transport: FakeTransport) -> (TestSync, InactivityMonitor<RecordingBacklight>) {
        let sync = SyncController::new(
            transport,
            RecordingDisplay::default(),
            RecordingDelay::default(),
            PollConfig::default(),
        );
        let monitor =
            InactivityMonitor::new(RecordingBacklight::default(), BacklightConfig::default());
        (sync, monitor)
    }

    fn touch_at(y: u16) -> TouchPoint {
        TouchPoint {
            x: 120,
            y,
            gesture: 0,
        }
    }

    #[test]
    fn classifies_zones_on_240px_screen() {
        assert_eq!(classify(10, 240), TouchZone::Increase);
        assert_eq!(classify(230, 240), TouchZone::Decrease);
        assert_eq!(classify(120, 240), TouchZone::Idle);
    }

    #[test]
    fn zone_edges_are_inclusive() {
        assert_eq!(classify(0, 240), TouchZone::Increase);
        assert_eq!(classify(60, 240), TouchZone::Increase);
        assert_eq!(classify(61, 240), TouchZone::Idle);
        assert_eq!(classify(179, 240), TouchZone::Idle);
        assert_eq!(classify(180, 240), TouchZone::Decrease);
        assert_eq!(classify(240, 240), TouchZone::Decrease);
        assert_eq!(classify(241, 240), TouchZone::Idle);
    }

    #[test]
    fn decodes_cst816_report() {
        let raw = [0x05, 0x01, 0x00, 0x78, 0x40, 0xe6];
        assert_eq!(
            parse_cst816_report(&raw),
            Some(TouchPoint {
                x: 120,
                y: 230,
                gesture: 0x05
            })
        );
        assert_eq!(parse_cst816_report(&[0, 0, 0, 10, 0, 10]), None);
    }

    #[test]
    fn idle_touch_refreshes_and_resets_buttons() {
        let (mut sync, mut monitor) = rig(FakeTransport::serving(page("72")));

        let outcome = TouchDispatcher::new(ScreenConfig::default())
            .dispatch(touch_at(120), 4_000, &mut sync, &mut monitor)
            .unwrap();

        assert_eq!(outcome.zone, TouchZone::Idle);
        assert_eq!(outcome.command, None);
        assert_eq!(sync.transport().requests, vec!["/"]);
        assert_eq!(
            sync.display().screens,
            vec![
                Screen::Setpoint("72".to_string()),
                Screen::Button(Command::Increase, false),
                Screen::Button(Command::Decrease, false),
            ]
        );
        assert_eq!(monitor.backlight().levels, vec![255]);
        assert_eq!(monitor.activity().last_ms(), 4_000);
    }

    #[test]
    fn increase_touch_polls_before_and_after_command() {
        let (mut sync, mut monitor) = rig(FakeTransport::serving(page("72")));

        let outcome = TouchDispatcher::new(ScreenConfig::default())
            .dispatch(touch_at(10), 1_000, &mut sync, &mut monitor)
            .unwrap();

        assert_eq!(
            outcome.command,
            Some(CommandOutcome::Refreshed(PollOutcome::Unchanged))
        );
        assert_eq!(sync.transport().requests, vec!["/", "/increase", "/"]);
        assert_eq!(
            sync.display().screens,
            vec![
                Screen::Setpoint("72".to_string()),
                Screen::Button(Command::Increase, true),
            ]
        );
    }

    #[test]
    fn rejected_decrease_skips_follow_up_poll() {
        let mut transport = FakeTransport::default();
        transport.push_ok(page("72"));
        transport.push_status(500);
        let (mut sync, mut monitor) = rig(transport);

        let outcome = TouchDispatcher::new(ScreenConfig::default())
            .dispatch(touch_at(230), 1_000, &mut sync, &mut monitor)
            .unwrap();

        assert_eq!(outcome.command, Some(CommandOutcome::Rejected(500)));
        assert_eq!(sync.transport().status_polls(), 1);
        assert_eq!(sync.display().screens.last(), Some(&Screen::Status(500)));
    }

    #[test]
    fn exhausted_refresh_aborts_before_waking_backlight() {
        let (mut sync, mut monitor) = rig(FakeTransport::failing_with(502));

        let result = TouchDispatcher::new(ScreenConfig::default()).dispatch(
            touch_at(10),
            1_000,
            &mut sync,
            &mut monitor,
        );

        assert_eq!(result, Err(SyncError::RetriesExhausted { attempts: 5 }));
        assert!(monitor.backlight().levels.is_empty());
        assert!(!sync.transport().requests.contains(&"/increase".to_string()));
    }
}
