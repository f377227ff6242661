use chrono::{Local, NaiveDate};

/// Day keys scope daily statistics and completion records. The key is
/// derived from the device-local calendar date at the moment of the call,
/// not from session start time; callers pass the date in so tests can pin
/// "now".
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}
