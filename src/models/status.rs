use chrono::{DateTime, Utc};

use crate::models::members::parse_date;

const MS_PER_DAY: i64 = 86_400_000;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MembershipStatus {
    Active,
    Expired,
    /// The end date did not parse as a calendar date. Surfaced as its own
    /// state instead of being silently folded into Expired.
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusSummary {
    pub status: MembershipStatus,
    pub days_remaining: i64,
}

impl StatusSummary {
    /// Remaining days as shown to the user, floored at zero. The signed
    /// `days_remaining` is what drives the Active/Expired branch.
    pub fn display_days(&self) -> i64 {
        self.days_remaining.max(0)
    }
}

/// Classifies a subscription end date against a reference instant.
///
/// The end date counts as midnight UTC of that day. Remaining days are the
/// ceiling of the millisecond difference over one day, so a fractional day
/// left still counts as a whole day; `Expired` only once the instant is
/// strictly past the end date.
pub fn classify(end_date: &str, now: DateTime<Utc>) -> StatusSummary {
    let Some(end) = parse_date(end_date) else {
        return StatusSummary {
            status: MembershipStatus::Unknown,
            days_remaining: 0,
        };
    };

    let end = end.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let ms = (end - now).num_milliseconds();
    let status = if end < now {
        MembershipStatus::Expired
    } else {
        MembershipStatus::Active
    };

    StatusSummary {
        status,
        days_remaining: ceil_days(ms),
    }
}

pub fn classify_now(end_date: &str) -> StatusSummary {
    classify(end_date, Utc::now())
}

fn ceil_days(ms: i64) -> i64 {
    // ceil(a / b) == -floor(-a / b) for positive b
    -(-ms).div_euclid(MS_PER_DAY)
}
