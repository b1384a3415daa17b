//! # Date Units
//!
//! Unit-aware arithmetic over `chrono::NaiveDateTime` for segmented date editors.
//!
//! ## Philosophy
//!
//! - **Total**: Every function returns a valid date; calendar edge cases clamp
//! - **Pure**: No clocks, no time zones, no global state
//! - **Editor-shaped**: Units match the segments a user edits, including the meridiem
//!
//! Month values are zero-based (0 = January) everywhere a unit value is read
//! or written as a number, mirroring `Datelike::month0`.

mod unit;

pub use unit::{DateUnit, DigitWidth, Meridiem};

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

/// Earliest year `set` accepts
pub const MIN_YEAR: i64 = -262_143;
/// Latest year `set` accepts
pub const MAX_YEAR: i64 = 262_142;

/// Gregorian leap year rule
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in a month (`month` is 1-based)
pub fn month_length(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

/// Number of days in the month containing `date`
pub fn days_in_month(date: NaiveDateTime) -> u32 {
    month_length(date.year(), date.month())
}

/// Whole-second equality of two millisecond timestamps
pub fn is_same_seconds(a: i64, b: i64) -> bool {
    a.div_euclid(1000) == b.div_euclid(1000)
}

/// Milliseconds since the epoch, reading the naive value as UTC
pub fn timestamp_millis(date: NaiveDateTime) -> i64 {
    date.and_utc().timestamp_millis()
}

/// Adds `amount` of `unit` to `date`.
///
/// Month arithmetic clamps the day to the destination month, and moving a
/// Feb 29 by whole years lands on Feb 28 in common years. A meridiem step is
/// twelve hours. Results beyond chrono's range saturate.
pub fn add(date: NaiveDateTime, unit: DateUnit, amount: i64) -> NaiveDateTime {
    let result = match unit {
        DateUnit::Years => add_years(date, amount),
        DateUnit::Months => add_months(date, amount),
        DateUnit::Days => TimeDelta::try_days(amount).and_then(|d| date.checked_add_signed(d)),
        DateUnit::Hours => TimeDelta::try_hours(amount).and_then(|d| date.checked_add_signed(d)),
        DateUnit::Minutes => {
            TimeDelta::try_minutes(amount).and_then(|d| date.checked_add_signed(d))
        }
        DateUnit::Seconds => {
            TimeDelta::try_seconds(amount).and_then(|d| date.checked_add_signed(d))
        }
        DateUnit::Milliseconds => {
            TimeDelta::try_milliseconds(amount).and_then(|d| date.checked_add_signed(d))
        }
        DateUnit::Meridiem => amount
            .checked_mul(12)
            .and_then(TimeDelta::try_hours)
            .and_then(|d| date.checked_add_signed(d)),
    };

    result.unwrap_or(if amount >= 0 {
        NaiveDateTime::MAX
    } else {
        NaiveDateTime::MIN
    })
}

/// Sets `unit` of `date` to `value`, clamped into the unit's domain.
///
/// Days clamp to `[1, days_in_month]`, months to `[0, 11]`, hours to
/// `[0, 23]`, minutes and seconds to `[0, 59]`, milliseconds to `[0, 999]`.
/// Changing the month or year clamps the day to the new month's length.
/// Setting the meridiem sets the hour.
pub fn set(date: NaiveDateTime, unit: DateUnit, value: i64) -> NaiveDateTime {
    let result = match unit {
        DateUnit::Years => with_year_clamped(date, value.clamp(MIN_YEAR, MAX_YEAR) as i32),
        DateUnit::Months => with_month_clamped(date, value.clamp(0, 11) as u32 + 1),
        DateUnit::Days => date.with_day(value.clamp(1, days_in_month(date) as i64) as u32),
        DateUnit::Hours | DateUnit::Meridiem => date.with_hour(value.clamp(0, 23) as u32),
        DateUnit::Minutes => date.with_minute(value.clamp(0, 59) as u32),
        DateUnit::Seconds => date.with_second(value.clamp(0, 59) as u32),
        DateUnit::Milliseconds => {
            date.with_nanosecond(value.clamp(0, 999) as u32 * 1_000_000)
        }
    };

    result.unwrap_or(date)
}

/// Reads the numeric value of `unit` (months zero-based, meridiem as the hour)
pub fn get(date: NaiveDateTime, unit: DateUnit) -> i64 {
    match unit {
        DateUnit::Years => date.year() as i64,
        DateUnit::Months => date.month0() as i64,
        DateUnit::Days => date.day() as i64,
        DateUnit::Hours | DateUnit::Meridiem => date.hour() as i64,
        DateUnit::Minutes => date.minute() as i64,
        DateUnit::Seconds => date.second() as i64,
        // Leap-second representations carry nanoseconds above one second
        DateUnit::Milliseconds => (date.nanosecond() / 1_000_000).min(999) as i64,
    }
}

/// Formats `unit` of `date` for display in its segment.
///
/// Years pad to four digits (negative years are left as is), milliseconds to
/// three, minutes and seconds always to two. Months, days and hours follow
/// `digits`. In 12-hour mode midnight and noon display as `12`.
pub fn format(date: NaiveDateTime, unit: DateUnit, hour12: bool, digits: DigitWidth) -> String {
    let width = digits.width();

    match unit {
        DateUnit::Years => {
            let year = date.year();
            if year < 0 {
                year.to_string()
            } else {
                pad(year as u32, 4)
            }
        }
        DateUnit::Months => pad(date.month(), width),
        DateUnit::Days => pad(date.day(), width),
        DateUnit::Hours => {
            let hours = if hour12 {
                match date.hour() % 12 {
                    0 => 12,
                    h => h,
                }
            } else {
                date.hour()
            };
            pad(hours, width)
        }
        DateUnit::Minutes => pad(date.minute(), 2),
        DateUnit::Seconds => pad(date.second(), 2),
        DateUnit::Milliseconds => pad(get(date, DateUnit::Milliseconds) as u32, 3),
        DateUnit::Meridiem => Meridiem::of(date).as_str().to_string(),
    }
}

/// Left-pads `value` with zeros up to `width` digits
pub fn pad(value: u32, width: usize) -> String {
    format!("{:0>width$}", value, width = width)
}

/// Flips the half-day, or forces it when `force` is given.
///
/// The hour only moves (by twelve) when the date is not already in the
/// requested half.
pub fn toggle_meridiem(date: NaiveDateTime, force: Option<Meridiem>) -> NaiveDateTime {
    let current = Meridiem::of(date);

    match force {
        None => match current {
            Meridiem::Am => add(date, DateUnit::Hours, 12),
            Meridiem::Pm => add(date, DateUnit::Hours, -12),
        },
        Some(Meridiem::Am) if current == Meridiem::Pm => add(date, DateUnit::Hours, -12),
        Some(Meridiem::Pm) if current == Meridiem::Am => add(date, DateUnit::Hours, 12),
        Some(_) => date,
    }
}

fn add_years(date: NaiveDateTime, amount: i64) -> Option<NaiveDateTime> {
    let year = (date.year() as i64).checked_add(amount)?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return None;
    }
    with_year_clamped(date, year as i32)
}

fn add_months(date: NaiveDateTime, amount: i64) -> Option<NaiveDateTime> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

fn with_year_clamped(date: NaiveDateTime, year: i32) -> Option<NaiveDateTime> {
    let day = date.day().min(month_length(year, date.month()));
    NaiveDate::from_ymd_opt(year, date.month(), day).map(|d| d.and_time(date.time()))
}

fn with_month_clamped(date: NaiveDateTime, month: u32) -> Option<NaiveDateTime> {
    let day = date.day().min(month_length(date.year(), month));
    NaiveDate::from_ymd_opt(date.year(), month, day).map(|d| d.and_time(date.time()))
}
