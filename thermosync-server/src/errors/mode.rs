use thermosync_api::models::Id;
use thermosync_api::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum ModeError {
    #[error("Mode {0} not found")]
    NotFound(Id),

    #[error("Zone {0} not found")]
    ZoneNotFound(Id),

    #[error("Mode is used by setting {setting_id}")]
    InUse { setting_id: Id },

    #[error("Mode \"{0}\" is managed by the system")]
    Reserved(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
