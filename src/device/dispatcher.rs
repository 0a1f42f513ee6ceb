//! Decoding of command-topic payloads into state changes.
//!
//! Matching is exact and case-sensitive. Anything unrecognized, on any
//! topic, is a no-op rather than an error.

use super::{ACTION_TOPIC, DeviceState, RelayStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
    GetStatus,
    PublishOn,
    PublishOff,
    PublishVersion,
}

impl Command {
    pub fn parse(topic: &str, payload: &[u8]) -> Option<Self> {
        if topic != ACTION_TOPIC {
            return None;
        }
        match payload {
            b"on" => Some(Command::On),
            b"off" => Some(Command::Off),
            b"get_status" => Some(Command::GetStatus),
            b"pub_on" => Some(Command::PublishOn),
            b"pub_off" => Some(Command::PublishOff),
            b"pub_version" => Some(Command::PublishVersion),
            _ => None,
        }
    }
}

/// What to publish on the status topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// Whatever the relay pin is currently driving.
    CurrentStatus,
    Status(RelayStatus),
    Version,
}

/// Side effects of one command, applied by the supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Effect {
    /// `Some(true)` drives the relay active, `Some(false)` inactive.
    pub relay: Option<bool>,
    pub report: Option<Report>,
}

impl Command {
    pub fn apply(self, state: &mut DeviceState) -> Effect {
        match self {
            Command::On => {
                state.relay_enabled = true;
                state.reporting_enabled = true;
                Effect {
                    relay: Some(true),
                    report: None,
                }
            }
            Command::Off => {
                state.relay_enabled = false;
                state.reporting_enabled = false;
                Effect {
                    relay: Some(false),
                    report: Some(Report::Status(RelayStatus::Off)),
                }
            }
            Command::GetStatus => Effect {
                relay: None,
                report: Some(Report::CurrentStatus),
            },
            Command::PublishOn => {
                state.reporting_enabled = true;
                Effect::default()
            }
            Command::PublishOff => {
                state.reporting_enabled = false;
                Effect::default()
            }
            Command::PublishVersion => Effect {
                relay: None,
                report: Some(Report::Version),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Command; 6] = [
        Command::On,
        Command::Off,
        Command::GetStatus,
        Command::PublishOn,
        Command::PublishOff,
        Command::PublishVersion,
    ];

    fn all_states() -> Vec<DeviceState> {
        [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .map(|(relay_enabled, reporting_enabled)| DeviceState {
                relay_enabled,
                reporting_enabled,
            })
            .collect()
    }

    #[test]
    fn parses_exact_payloads_on_action_topic() {
        assert_eq!(Command::parse(ACTION_TOPIC, b"on"), Some(Command::On));
        assert_eq!(Command::parse(ACTION_TOPIC, b"off"), Some(Command::Off));
        let action = |payload: &[u8]| Command::parse(ACTION_TOPIC, payload);
        assert_eq!(action(b"get_status"), Some(Command::GetStatus));
        assert_eq!(action(b"pub_on"), Some(Command::PublishOn));
        assert_eq!(action(b"pub_off"), Some(Command::PublishOff));
        assert_eq!(action(b"pub_version"), Some(Command::PublishVersion));
    }

    #[test]
    fn ignores_near_misses_and_other_topics() {
        let near_misses: [&[u8]; 7] = [
            b"ON", b"On", b" on", b"on\n", b"", b"toggle", b"\xff\xfe",
        ];
        for payload in near_misses {
            assert_eq!(Command::parse(ACTION_TOPIC, payload), None);
        }
        assert_eq!(Command::parse("vmc_board/status", b"on"), None);
        assert_eq!(Command::parse("vmc_board/action/extra", b"off"), None);
    }

    #[test]
    fn outcomes_from_every_prior_state() {
        for prior in all_states() {
            let mut s = prior;
            assert_eq!(Command::On.apply(&mut s).relay, Some(true));
            assert_eq!((s.relay_enabled, s.reporting_enabled), (true, true));

            let mut s = prior;
            let effect = Command::Off.apply(&mut s);
            assert_eq!(effect.relay, Some(false));
            assert_eq!(effect.report, Some(Report::Status(RelayStatus::Off)));
            assert_eq!((s.relay_enabled, s.reporting_enabled), (false, false));

            let mut s = prior;
            let effect = Command::GetStatus.apply(&mut s);
            assert_eq!(effect.relay, None);
            assert_eq!(effect.report, Some(Report::CurrentStatus));
            assert_eq!(s, prior);

            let mut s = prior;
            assert_eq!(Command::PublishOn.apply(&mut s), Effect::default());
            assert_eq!(s.relay_enabled, prior.relay_enabled);
            assert!(s.reporting_enabled);

            let mut s = prior;
            assert_eq!(Command::PublishOff.apply(&mut s), Effect::default());
            assert_eq!(s.relay_enabled, prior.relay_enabled);
            assert!(!s.reporting_enabled);

            let mut s = prior;
            let effect = Command::PublishVersion.apply(&mut s);
            assert_eq!(effect.relay, None);
            assert_eq!(effect.report, Some(Report::Version));
            assert_eq!(s, prior);
        }
    }

    #[test]
    fn applying_twice_matches_applying_once() {
        for prior in all_states() {
            for command in ALL {
                let mut once = prior;
                let first = command.apply(&mut once);
                let mut twice = once;
                let second = command.apply(&mut twice);
                assert_eq!(once, twice, "{command:?} from {prior:?}");
                assert_eq!(first, second, "{command:?} from {prior:?}");
            }
        }
    }
}
