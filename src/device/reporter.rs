use std::time::Duration;

use tokio::time::Instant;

use super::DeviceState;

pub const REPORT_PERIOD: Duration = Duration::from_secs(2);

/// What a due cadence step should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportStep {
    /// Drive the relay active again. There is no matching "drive inactive":
    /// only an explicit `off` command releases the relay.
    pub reassert_relay: bool,
    pub publish: bool,
}

/// Fixed-period cadence measured from the last fire, so late ticks do not
/// accumulate drift into a burst.
pub struct StateReporter {
    period: Duration,
    last_fire: Instant,
}

impl StateReporter {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            last_fire: now,
        }
    }

    pub fn poll(&mut self, now: Instant, state: &DeviceState) -> Option<ReportStep> {
        if now.duration_since(self.last_fire) < self.period {
            return None;
        }
        self.last_fire = now;
        Some(ReportStep {
            reassert_relay: state.relay_enabled,
            publish: state.reporting_enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ON: DeviceState = DeviceState {
        relay_enabled: true,
        reporting_enabled: true,
    };

    #[test]
    fn fires_once_per_period() {
        let start = Instant::now();
        let mut reporter = StateReporter::new(REPORT_PERIOD, start);

        let early = start + Duration::from_millis(1999);
        assert_eq!(reporter.poll(early, &ON), None);
        let step = reporter.poll(start + Duration::from_secs(2), &ON).unwrap();
        assert!(step.reassert_relay && step.publish);
        assert_eq!(reporter.poll(start + Duration::from_secs(3), &ON), None);
        assert!(reporter.poll(start + Duration::from_secs(4), &ON).is_some());
    }

    #[test]
    fn late_fire_resets_from_fire_time() {
        let start = Instant::now();
        let mut reporter = StateReporter::new(REPORT_PERIOD, start);

        assert!(reporter.poll(start + Duration::from_secs(7), &ON).is_some());
        // One fire for the whole gap, next one a full period later.
        assert_eq!(reporter.poll(start + Duration::from_secs(8), &ON), None);
        assert!(reporter.poll(start + Duration::from_secs(9), &ON).is_some());
    }

    #[test]
    fn step_follows_flags_independently() {
        let start = Instant::now();
        let mut reporter = StateReporter::new(REPORT_PERIOD, start);
        let relay_only = DeviceState {
            relay_enabled: true,
            reporting_enabled: false,
        };
        let step = reporter.poll(start + REPORT_PERIOD, &relay_only).unwrap();
        assert_eq!(
            step,
            ReportStep {
                reassert_relay: true,
                publish: false
            }
        );

        let step = reporter
            .poll(start + REPORT_PERIOD * 2, &DeviceState::default())
            .unwrap();
        assert!(!step.reassert_relay && !step.publish);
    }
}
