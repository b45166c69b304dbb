//! Lenient date and time parsing.
//!
//! Users type dates in all kinds of formats. The parsers here try the
//! system format first and then a list of common alternatives. All
//! datetimes are naive and in UTC; a [`FixedOffset`] describes the user's
//! timezone where one is known.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use thiserror::Error;

/// Date formats tried after the ISO format, in order.
pub const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y", "%d/%m/%Y", "%Y%m%d", "%d. %m. %Y", "%m/%d/%y", "%d/%m/%y", "%d%m%y", "%m%d%y",
    "%y%m%d",
];

/// Time formats tried on their own and in combination with a date.
pub const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p"];

/// The format produced by [`format_system_datetime`].
pub const SYSTEM_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// The format produced by [`format_system_date`].
pub const SYSTEM_DATE_FORMAT: &str = "%Y-%m-%d";

/// Returned when no known format matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid date format")]
pub struct DateParseError;

/// Parses a datetime with the default formats. See [`parse_datetime_with`].
pub fn parse_datetime(
    input: &str,
    tz: Option<&FixedOffset>,
) -> Result<NaiveDateTime, DateParseError> {
    parse_datetime_with(input, tz, DATE_FORMATS, TIME_FORMATS)
}

/// Parses a string into a naive UTC datetime.
///
/// `now` yields the current time. Otherwise the system format is tried,
/// then a bare time (on the current day), then every combination of a time
/// and a date format in both orders. If `tz` is given the input is read as
/// local time in that zone and converted to UTC.
///
/// ```
/// use chrono::{FixedOffset, NaiveDate};
/// use fungiform_core::dates::parse_datetime;
///
/// let dt = parse_datetime("2009-12-31 23:15", None).unwrap();
/// assert_eq!(dt, NaiveDate::from_ymd_opt(2009, 12, 31).unwrap().and_hms_opt(23, 15, 0).unwrap());
///
/// let cet = FixedOffset::east_opt(3600).unwrap();
/// let dt = parse_datetime("12/31/2009 01:30", Some(&cet)).unwrap();
/// assert_eq!(dt.to_string(), "2009-12-31 00:30:00");
/// ```
pub fn parse_datetime_with<D, T>(
    input: &str,
    tz: Option<&FixedOffset>,
    date_formats: &[D],
    time_formats: &[T],
) -> Result<NaiveDateTime, DateParseError>
where
    D: AsRef<str>,
    T: AsRef<str>,
{
    let input = input.trim();
    if input.eq_ignore_ascii_case("now") {
        return Ok(truncate_seconds(Utc::now().naive_utc()));
    }

    let to_utc = |local: NaiveDateTime| tz.map_or(local, |tz| local_to_utc(local, tz));

    if let Ok(dt) = NaiveDateTime::parse_from_str(input, SYSTEM_DATETIME_FORMAT) {
        return Ok(to_utc(dt));
    }

    for fmt in time_formats {
        if let Ok(time) = NaiveTime::parse_from_str(input, fmt.as_ref()) {
            let today = Utc::now().date_naive();
            return Ok(to_utc(truncate_seconds(today.and_time(time))));
        }
    }

    for t_fmt in time_formats {
        for d_fmt in date_formats {
            let (t_fmt, d_fmt) = (t_fmt.as_ref(), d_fmt.as_ref());
            for fmt in [format!("{t_fmt} {d_fmt}"), format!("{d_fmt} {t_fmt}")] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(input, &fmt) {
                    return Ok(to_utc(truncate_seconds(dt)));
                }
            }
        }
    }

    Err(DateParseError)
}

/// Parses a date with the default formats. See [`parse_date_with`].
pub fn parse_date(input: &str) -> Result<NaiveDate, DateParseError> {
    parse_date_with(input, DATE_FORMATS)
}

/// Parses a string into a date: `today`, the ISO format, then `formats`.
pub fn parse_date_with<D: AsRef<str>>(
    input: &str,
    formats: &[D],
) -> Result<NaiveDate, DateParseError> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("today") {
        return Ok(Utc::now().date_naive());
    }
    std::iter::once(SYSTEM_DATE_FORMAT)
        .chain(formats.iter().map(AsRef::as_ref))
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .ok_or(DateParseError)
}

/// Formats a UTC datetime as `YYYY-MM-DD HH:MM`, in `tz` if given.
pub fn format_system_datetime(dt: &NaiveDateTime, tz: Option<&FixedOffset>) -> String {
    let local = tz.map_or(*dt, |tz| tz.from_utc_datetime(dt).naive_local());
    local.format(SYSTEM_DATETIME_FORMAT).to_string()
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_system_date(date: &NaiveDate) -> String {
    date.format(SYSTEM_DATE_FORMAT).to_string()
}

/// Parses a timezone setting: `UTC`, `Z` or an offset like `+05:30`,
/// `-0800` or `+02`.
pub fn parse_offset(input: &str) -> Result<FixedOffset, DateParseError> {
    let input = input.trim();
    if input.is_empty() || input.eq_ignore_ascii_case("utc") || input.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or(DateParseError);
    }

    let (sign, rest) = match input.as_bytes().first() {
        Some(b'+') => (1, &input[1..]),
        Some(b'-') => (-1, &input[1..]),
        _ => return Err(DateParseError),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DateParseError);
    }
    let (hours, minutes) = match digits.len() {
        2 => (&digits[..2], "0"),
        4 => (&digits[..2], &digits[2..]),
        _ => return Err(DateParseError),
    };
    let hours: i32 = hours.parse().map_err(|_| DateParseError)?;
    let minutes: i32 = minutes.parse().map_err(|_| DateParseError)?;
    if hours > 23 || minutes > 59 {
        return Err(DateParseError);
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or(DateParseError)
}

fn local_to_utc(local: NaiveDateTime, tz: &FixedOffset) -> NaiveDateTime {
    tz.from_local_datetime(&local)
        .single()
        .map_or(local, |dt| dt.naive_utc())
}

fn truncate_seconds(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}
