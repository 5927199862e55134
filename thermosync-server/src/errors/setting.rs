use thermosync_api::models::Id;
use thermosync_api::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum SettingError {
    #[error("Setting {0} not found")]
    NotFound(Id),

    #[error("Zone {0} not found")]
    ZoneNotFound(Id),

    #[error("Mode {0} not found")]
    ModeNotFound(Id),

    #[error("Mode {mode_id} does not belong to zone {zone_id}")]
    ModeZoneMismatch { mode_id: Id, zone_id: Id },

    #[error("Zone {0} has no custom mode")]
    CustomModeMissing(Id),

    #[error("Cannot delete the default schedule")]
    DefaultUndeletable,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
