use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A member record as the backend returns it. Dates stay raw strings because
/// upstream data may be malformed or absent; parsing happens at the point of
/// status derivation.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub mobile_number: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub trainer_name: Option<String>,
    #[serde(default)]
    pub joining_date: String,
    #[serde(default)]
    pub subscription_start_date: Option<String>,
    #[serde(default)]
    pub subscription_end_date: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub is_paid: bool,
}

/// Creation payload sent to the backend. Dates are already serialized to
/// `YYYY-MM-DD` and `is_paid` is always true at intake.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewMemberRecord {
    pub name: String,
    pub mobile_number: String,
    pub location: String,
    pub trainer_name: String,
    pub joining_date: String,
    pub subscription_start_date: String,
    pub subscription_end_date: String,
    pub is_paid: bool,
}

/// What the intake form collects before validation. Calendar fields are unset
/// until the operator picks a date.
#[derive(Clone, Debug, Default)]
pub struct MemberDraft {
    pub name: String,
    pub mobile_number: String,
    pub location: String,
    pub trainer_name: String,
    pub joining_date: Option<NaiveDate>,
    pub subscription_start_date: Option<NaiveDate>,
    pub subscription_end_date: Option<NaiveDate>,
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}
