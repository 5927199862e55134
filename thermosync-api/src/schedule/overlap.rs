use crate::models::{Id, Setting};

/// Two settings overlap when they compete for the same zone at the same
/// priority on at least one shared instant. All bounds are inclusive.
pub fn overlaps(a: &Setting, b: &Setting) -> bool {
    a.zone_id == b.zone_id
        && a.priority == b.priority
        && a.end_day >= b.start_day
        && b.end_day >= a.start_day
        && a.day_of_week & b.day_of_week != 0
        && a.end_time >= b.start_time
        && b.end_time >= a.start_time
}

pub fn find_overlap(candidate: &Setting, existing: &[Setting]) -> Option<Id> {
    existing
        .iter()
        .find(|setting| overlaps(candidate, setting))
        .map(|setting| setting.id)
}
