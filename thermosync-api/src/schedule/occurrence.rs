use time::{Duration, OffsetDateTime, Time};

use super::seconds_of_day;
use crate::models::{Priority, Setting};

/// How long a temporary override lasts when no scheduled change follows it.
pub const DEFAULT_OVERRIDE_HOLD: Duration = Duration::hours(12);

/// Next instant at which `setting` would take effect if it were the highest
/// priority at that time. Returns `now` for a setting that is already active
/// and `None` once the setting has expired.
pub fn next_occurrence(setting: &Setting, now: OffsetDateTime) -> Option<OffsetDateTime> {
    if now > setting.end_day {
        return None;
    }
    if now < setting.start_day {
        return Some(setting.start_day);
    }

    let seconds = seconds_of_day(now);
    if setting.runs_on(now.weekday()) && seconds < setting.end_time {
        if seconds < setting.start_time {
            return Some(now + Duration::seconds((setting.start_time - seconds) as i64));
        }
        return Some(now);
    }

    let midnight = now.replace_time(Time::MIDNIGHT);
    (1..=7)
        .map(|days| midnight + Duration::days(days))
        .find(|day| setting.runs_on(day.weekday()))
        .map(|day| day + Duration::seconds(setting.start_time as i64))
}

/// Earliest upcoming start of a `Scheduled` setting, strictly after `now`.
pub fn next_change(settings: &[Setting], now: OffsetDateTime) -> Option<OffsetDateTime> {
    settings
        .iter()
        .filter(|setting| setting.priority == Priority::Scheduled)
        .filter_map(|setting| next_occurrence(setting, now))
        .filter(|at| *at > now)
        .min()
}

/// End of a temporary override placed at `now`: the next scheduled change,
/// or `now + hold` when nothing is scheduled. `None` when `now + hold` is
/// not a representable date.
pub fn override_until(
    settings: &[Setting],
    now: OffsetDateTime,
    hold: Duration,
) -> Option<OffsetDateTime> {
    next_change(settings, now).or_else(|| now.checked_add(hold))
}
