use thermosync_api::models::Id;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Zone {0} not found")]
    ZoneNotFound(Id),

    #[error("Zone name \"{0}\" already exists")]
    ZoneNameExists(String),

    #[error("Zone name must be at least 2 characters long")]
    ZoneNameTooShort,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
