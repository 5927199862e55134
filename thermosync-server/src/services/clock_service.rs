use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, Offset, Utc};
use chrono_tz::Tz;
use time::{OffsetDateTime, UtcOffset};

use crate::configs::Control;
use crate::errors::ConfigError;

/// Wall clock in the controller's local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Where the local offset comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalZone {
    /// Never adjusted for daylight saving
    Fixed(UtcOffset),
    /// IANA zone
    Named(Tz),
    /// Whatever zone the host is configured for
    Host,
}

impl LocalZone {
    /// Offset in effect at `instant`. Named and host zones are looked up at
    /// every call so daylight saving transitions are followed.
    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        let seconds = match self {
            LocalZone::Fixed(offset) => return *offset,
            LocalZone::Named(tz) => utc(instant).with_timezone(tz).offset().fix().local_minus_utc(),
            LocalZone::Host => utc(instant).with_timezone(&Local).offset().local_minus_utc(),
        };

        UtcOffset::from_whole_seconds(seconds).unwrap_or_else(|_| {
            tracing::warn!("offset of {}s is out of range, using UTC", seconds);
            UtcOffset::UTC
        })
    }
}

fn utc(instant: OffsetDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp(instant.unix_timestamp(), instant.nanosecond()).unwrap_or_default()
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    zone: LocalZone,
}

impl SystemClock {
    pub fn new(zone: LocalZone) -> Self {
        Self { zone }
    }

    /// A configured `utc_offset` wins over a configured `timezone`; with
    /// neither the host zone is used.
    pub fn from_control(control: &Control) -> Result<Self, ConfigError> {
        let zone = match (control.utc_offset()?, control.timezone()?) {
            (Some(offset), _) => LocalZone::Fixed(offset),
            (None, Some(tz)) => LocalZone::Named(tz),
            (None, None) => LocalZone::Host,
        };
        tracing::debug!("local time from {:?}", zone);

        Ok(Self::new(zone))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();

        now.to_offset(self.zone.offset_at(now))
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: time::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
