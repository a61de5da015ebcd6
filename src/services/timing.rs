use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})(?:\s*([AaPp][Mm]))?$").expect("time pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// Converts a 12-hour clock hour to its 24-hour value.
pub fn to_24_hour(hour: u32, meridiem: Meridiem) -> u32 {
    match meridiem {
        Meridiem::Pm if hour < 12 => hour + 12,
        Meridiem::Am if hour == 12 => 0,
        _ => hour,
    }
}

/// Parses `HH:MM` (24-hour) or `H:MM AM/PM` (12-hour) into a time of day.
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let caps = TIME_RE.captures(s.trim())?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;

    let hour = match caps.get(3) {
        Some(m) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            let meridiem = if m.as_str().eq_ignore_ascii_case("pm") {
                Meridiem::Pm
            } else {
                Meridiem::Am
            };
            to_24_hour(hour, meridiem)
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Parses a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let shaped = s.len() == 10
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn parse_timezone(s: &str) -> Option<Tz> {
    s.trim().parse::<Tz>().ok()
}

/// Interprets a wall-clock date and time in `tz` and returns the UTC
/// instant. Times skipped by a DST transition have no instant and yield
/// `None`; repeated times resolve to the earlier one.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Time of day `minutes` after `start`, wrapping past midnight.
pub fn session_end(start: NaiveTime, minutes: i64) -> NaiveTime {
    let (end, _) = start.overflowing_add_signed(Duration::minutes(minutes));
    end
}

pub fn format_hm(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}
