//! Firmware-update agent collaborator.

use thiserror::Error;

mod marker;
pub use marker::MarkerFileAgent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpdateError {
    #[error("Auth Failed")]
    Auth,
    #[error("Begin Failed")]
    Begin,
    #[error("Connect Failed")]
    Connect,
    #[error("Receive Failed")]
    Receive,
    #[error("End Failed")]
    End,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    Started,
    Progress {
        done: u64,
        total: u64,
    },
    /// The new image is in place; the device must restart to run it.
    Completed,
    Failed(UpdateError),
}

impl UpdateEvent {
    /// Percentage for `Progress` events.
    pub fn percent(&self) -> Option<u64> {
        match self {
            UpdateEvent::Progress { done, total } => Some(done * 100 / (*total).max(1)),
            _ => None,
        }
    }
}

/// Must be serviced every tick to stay reachable.
pub trait UpdateAgent {
    fn begin(&mut self);
    fn service(&mut self) -> Option<UpdateEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_percent_handles_small_totals() {
        let progress = |done, total| UpdateEvent::Progress { done, total };
        assert_eq!(progress(50, 200).percent(), Some(25));
        assert_eq!(progress(0, 0).percent(), Some(0));
        assert_eq!(UpdateEvent::Started.percent(), None);
    }
}
