use core::fmt;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, Weekday};

use super::Id;
use crate::error::ValidationError;

pub const SECONDS_PER_DAY: u32 = 86_400;

/// Weekday mask with every day of the week set.
pub const ALL_DAYS: u8 = 0b1111_1110;

/// Mask bit for one weekday: Sunday is `2`, Saturday is `128`.
pub fn weekday_mask(day: Weekday) -> u8 {
    2 << day.number_days_from_sunday()
}

/// Schedule tiers, lowest first. A higher tier wins whenever several
/// settings apply at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Priority {
    /// Used when the user does nothing
    Default = 1,
    /// Regularly scheduled changes
    Scheduled = 2,
    /// Unusual periods such as a vacation
    Override = 3,
    /// Manual override
    Custom = 4,
}

impl TryFrom<u8> for Priority {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Default),
            2 => Ok(Priority::Scheduled),
            3 => Ok(Priority::Override),
            4 => Ok(Priority::Custom),
            other => Err(ValidationError::InvalidPriority(other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value as u8
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Default => write!(f, "default"),
            Priority::Scheduled => write!(f, "scheduled"),
            Priority::Override => write!(f, "override"),
            Priority::Custom => write!(f, "custom"),
        }
    }
}

/// One time-windowed assignment of a mode to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    /// Setting identifier
    pub id: Id,
    /// Owning zone identifier
    pub zone_id: Id,
    /// Applied mode identifier
    pub mode_id: Id,
    /// Schedule tier
    pub priority: Priority,
    /// Weekday mask, see [`weekday_mask`]
    pub day_of_week: u8,
    /// First instant the setting applies
    #[serde(with = "time::serde::rfc3339")]
    pub start_day: OffsetDateTime,
    /// Last instant the setting applies
    #[serde(with = "time::serde::rfc3339")]
    pub end_day: OffsetDateTime,
    /// Daily window start, seconds since local midnight
    pub start_time: u32,
    /// Daily window end, seconds since local midnight
    pub end_time: u32,
}

impl Setting {
    pub fn runs_on(&self, day: Weekday) -> bool {
        self.day_of_week & weekday_mask(day) != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSettingRequest {
    /// Owning zone identifier
    pub zone_id: Id,
    /// Applied mode identifier
    pub mode_id: Id,
    /// Schedule tier
    pub priority: Priority,
    /// Weekday mask
    pub day_of_week: u8,
    /// First instant the setting applies
    #[serde(with = "time::serde::rfc3339")]
    pub start_day: OffsetDateTime,
    /// Last instant the setting applies
    #[serde(with = "time::serde::rfc3339")]
    pub end_day: OffsetDateTime,
    /// Daily window start
    pub start_time: u32,
    /// Daily window end
    pub end_time: u32,
}

impl CreateSettingRequest {
    /// Checks the invariants a setting carries on its own. Overlaps with
    /// existing settings are checked by whoever owns the collection.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.start_day >= self.end_day {
            return Err(ValidationError::DateRange);
        }
        if self.end_time <= self.start_time {
            return Err(ValidationError::TimeRange);
        }
        if self.end_time > SECONDS_PER_DAY {
            return Err(ValidationError::TimeOutOfDay);
        }
        if self.day_of_week == 0 {
            return Err(ValidationError::NoWeekdays);
        }

        Ok(())
    }

    pub fn into_setting(self, id: Id) -> Setting {
        Setting {
            id,
            zone_id: self.zone_id,
            mode_id: self.mode_id,
            priority: self.priority,
            day_of_week: self.day_of_week,
            start_day: self.start_day,
            end_day: self.end_day,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}
