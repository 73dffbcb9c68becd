//! Conversions between day numbers and calendar dates.
//!
//! Every date inside the engine is a day number counted from 1970-01-01,
//! which is also the epoch Arrow uses for `Date32`.

use chrono::{Datelike, NaiveDate};

/// The calendar date of day number zero
pub const EPOCH: NaiveDate = match NaiveDate::from_ymd_opt(1970, 1, 1) {
    Some(date) => date,
    None => panic!("invalid epoch"),
};

/// Convert a day number to a calendar date
#[must_use]
pub fn day_to_date(day: i32) -> Option<NaiveDate> {
    chrono::Duration::try_days(i64::from(day)).and_then(|offset| EPOCH.checked_add_signed(offset))
}

/// Convert a calendar date to a day number
#[must_use]
pub fn date_to_day(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - EPOCH.num_days_from_ce()
}

/// Calendar year and month (1-12) of a day number, `None` outside the calendar range
#[must_use]
pub fn year_month(day: i32) -> Option<(i32, u32)> {
    day_to_date(day).map(|date| (date.year(), date.month()))
}

/// Age in completed years at `on_day` for someone born on `birth_day`
#[must_use]
pub fn age_in_years(birth_day: i32, on_day: i32) -> Option<i32> {
    let birth = day_to_date(birth_day)?;
    let on = day_to_date(on_day)?;
    let mut age = on.year() - birth.year();
    if (on.month(), on.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    Some(age)
}
