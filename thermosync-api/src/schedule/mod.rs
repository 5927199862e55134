//! Pure schedule resolution over a zone's settings.
//!
//! Every function takes `now` as an [`OffsetDateTime`] already expressed in
//! the controller's local offset: weekdays and seconds of day are read from
//! it directly.

use time::OffsetDateTime;

use crate::models::Setting;

mod occurrence;
mod overlap;

pub use occurrence::{DEFAULT_OVERRIDE_HOLD, next_change, next_occurrence, override_until};
pub use overlap::{find_overlap, overlaps};

pub fn seconds_of_day(now: OffsetDateTime) -> u32 {
    let (hour, minute, second) = now.to_hms();
    hour as u32 * 3600 + minute as u32 * 60 + second as u32
}

/// Whether `setting` applies at `now`, ignoring every other setting.
pub fn is_active(setting: &Setting, now: OffsetDateTime) -> bool {
    let seconds = seconds_of_day(now);

    setting.runs_on(now.weekday())
        && setting.start_day <= now
        && now <= setting.end_day
        && setting.start_time <= seconds
        && seconds <= setting.end_time
}

/// Picks the setting in effect at `now`: the active one with the highest
/// priority. Among equal priorities the last one in `settings` wins.
pub fn resolve(settings: &[Setting], now: OffsetDateTime) -> Option<&Setting> {
    settings
        .iter()
        .filter(|setting| is_active(setting, now))
        .fold(None, |best: Option<&Setting>, setting| match best {
            Some(current) if current.priority > setting.priority => Some(current),
            _ => Some(setting),
        })
}
