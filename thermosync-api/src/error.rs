use crate::models::Id;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must be at least 2 characters long")]
    NameTooShort,

    #[error("\"{0}\" is a reserved mode name")]
    ReservedName(String),

    #[error("max temperature must be at least 2 degrees higher than the min temperature")]
    TemperatureRange,

    #[error("correction must be >= 0.5")]
    CorrectionTooSmall,

    #[error("correction cannot be more than half the difference in temperature range")]
    CorrectionTooLarge,

    #[error("setting must have a priority, got {0}")]
    InvalidPriority(u8),

    #[error("setting start must be before setting end")]
    DateRange,

    #[error("setting end time must be after start time")]
    TimeRange,

    #[error("setting times must fall within one day (0..=86400 seconds)")]
    TimeOutOfDay,

    #[error("setting must be active on at least one day of the week")]
    NoWeekdays,

    #[error("new setting overlaps with setting {id}")]
    Overlap { id: Id },
}
