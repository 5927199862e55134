use thermosync_api::models::Id;

use super::{HvacError, ModeError, SettingError, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("Zone {0} not found")]
    NotFound(Id),

    #[error("Zone {0} is already running")]
    AlreadyRunning(Id),

    #[error("Zone {0} has stopped")]
    Stopped(Id),

    #[error("Zone {0} has no active setting yet")]
    NoActiveSetting(Id),

    #[error("Setting {setting_id} references missing mode {mode_id}")]
    ModeNotFound { setting_id: Id, mode_id: Id },

    #[error("Override hold of {0}s is out of range")]
    HoldOutOfRange(u64),

    #[error("Control loop panicked: {0}")]
    Panicked(String),

    #[error("Zone {zone_id} faulted twice within an hour: {last}")]
    Escalated { zone_id: Id, last: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error(transparent)]
    Setting(#[from] SettingError),

    #[error(transparent)]
    Hvac(#[from] HvacError),
}
