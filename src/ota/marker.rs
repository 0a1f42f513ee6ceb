use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::{info, warn};

use super::{UpdateAgent, UpdateError, UpdateEvent};

enum Stage {
    Idle,
    Listening,
    Applying,
    /// The marker could not be consumed; reading it again would only
    /// repeat the same failed update.
    Halted,
}

/// Update agent for hosted deployments: the deployment tool installs the new
/// binary, then drops a marker file holding its version. The agent consumes
/// the marker and reports completion so the controller restarts into it.
pub struct MarkerFileAgent {
    marker: PathBuf,
    stage: Stage,
}

impl MarkerFileAgent {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
            stage: Stage::Idle,
        }
    }
}

impl UpdateAgent for MarkerFileAgent {
    fn begin(&mut self) {
        info!("Update agent watching {}", self.marker.display());
        self.stage = Stage::Listening;
    }

    fn service(&mut self) -> Option<UpdateEvent> {
        match self.stage {
            Stage::Idle | Stage::Halted => None,
            Stage::Listening => {
                let version = match std::fs::read_to_string(&self.marker) {
                    Ok(version) => version,
                    Err(e) if e.kind() == ErrorKind::NotFound => return None,
                    Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                        return Some(UpdateEvent::Failed(UpdateError::Auth));
                    }
                    Err(_) => return Some(UpdateEvent::Failed(UpdateError::Receive)),
                };
                let version = version.trim();
                if version.is_empty() {
                    return Some(UpdateEvent::Failed(UpdateError::Begin));
                }
                info!("Staged update {} found", version);
                self.stage = Stage::Applying;
                Some(UpdateEvent::Started)
            }
            Stage::Applying => match std::fs::remove_file(&self.marker) {
                Ok(()) => {
                    self.stage = Stage::Listening;
                    Some(UpdateEvent::Completed)
                }
                Err(e) => {
                    warn!("Cannot remove {}: {}", self.marker.display(), e);
                    self.stage = Stage::Halted;
                    Some(UpdateEvent::Failed(UpdateError::End))
                }
            },
        }
    }
}
