//! ISO-8601 parsing and formatting for the `date`, `time` and `datetime`
//! types. Two surface grammars are accepted: the hyphenated form
//! (`2020-04-12T08:43:46.619Z`) and the compact form
//! (`20200412T084346.619Z`). Parsing is regex-gated so that malformed text
//! is rejected before any field arithmetic happens.

use lazy_static::lazy_static;
use regex::Regex;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

lazy_static! {
    static ref DATETIME_HYPHEN_RE: Regex = Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})(?:T(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,3}))?)?([Zz]|[+-]\d{2}(?::?\d{2})?)?)?$"
    )
    .expect("is a valid regex");
    static ref DATETIME_COMPACT_RE: Regex = Regex::new(
        r"^(\d{4})(\d{2})(\d{2})(?:T(\d{2})(\d{2})(?:(\d{2})(?:\.(\d{1,3}))?)?([Zz]|[+-]\d{2}(?:\d{2})?)?)?$"
    )
    .expect("is a valid regex");
    static ref TIME_HYPHEN_RE: Regex =
        Regex::new(r"^(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,3}))?)?([Zz]|[+-]\d{2}(?::?\d{2})?)?$")
            .expect("is a valid regex");
    static ref TIME_COMPACT_RE: Regex =
        Regex::new(r"^(\d{2})(\d{2})(?:(\d{2})(?:\.(\d{1,3}))?)?([Zz]|[+-]\d{2}(?:\d{2})?)?$")
            .expect("is a valid regex");
}

fn parse_offset(text: &str) -> Option<UtcOffset> {
    if text.eq_ignore_ascii_case("z") {
        return Some(UtcOffset::UTC);
    }
    let negative = text.starts_with('-');
    let digits: String = text[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    let hours: i8 = digits.get(0..2)?.parse().ok()?;
    let minutes: i8 = match digits.get(2..4) {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    let (hours, minutes) = if negative {
        (-hours, -minutes)
    } else {
        (hours, minutes)
    };
    UtcOffset::from_hms(hours, minutes, 0).ok()
}

fn make_date(year: &str, month: &str, day: &str) -> Option<Date> {
    let year: i32 = year.parse().ok()?;
    let month = Month::try_from(month.parse::<u8>().ok()?).ok()?;
    let day: u8 = day.parse().ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

fn make_time(hour: &str, minute: &str, second: Option<&str>, millis: Option<&str>) -> Option<Time> {
    let hour: u8 = hour.parse().ok()?;
    let minute: u8 = minute.parse().ok()?;
    let second: u8 = match second {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    let millis: u16 = match millis {
        // ".6" means 600ms, so right-pad to three digits.
        Some(m) => format!("{m:0<3}").parse().ok()?,
        None => 0,
    };
    Time::from_hms_milli(hour, minute, second, millis).ok()
}

fn capture<'t>(captures: &regex::Captures<'t>, index: usize) -> Option<&'t str> {
    captures.get(index).map(|m| m.as_str())
}

/// Parses a full or date-only ISO-8601 datetime in either surface form.
/// A missing time part means midnight UTC; a missing timezone means UTC.
pub fn parse_date_time(text: &str) -> Option<OffsetDateTime> {
    let captures = DATETIME_HYPHEN_RE
        .captures(text)
        .or_else(|| DATETIME_COMPACT_RE.captures(text))?;
    let date = make_date(&captures[1], &captures[2], &captures[3])?;
    let time = match capture(&captures, 4) {
        Some(hour) => make_time(
            hour,
            capture(&captures, 5)?,
            capture(&captures, 6),
            capture(&captures, 7),
        )?,
        None => Time::MIDNIGHT,
    };
    let offset = match capture(&captures, 8) {
        Some(tz) => parse_offset(tz)?,
        None => UtcOffset::UTC,
    };
    Some(PrimitiveDateTime::new(date, time).assume_offset(offset))
}

/// Parses a date-only value (`2020-04-12` or `20200412`) as midnight UTC.
pub fn parse_date(text: &str) -> Option<OffsetDateTime> {
    let captures = DATETIME_HYPHEN_RE
        .captures(text)
        .or_else(|| DATETIME_COMPACT_RE.captures(text))?;
    if captures.get(4).is_some() || captures.get(8).is_some() {
        return None;
    }
    let date = make_date(&captures[1], &captures[2], &captures[3])?;
    Some(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc())
}

/// Parses a time-only value (`08:43:46.619Z` or `084346.619Z`), anchored to
/// `1900-01-01`.
pub fn parse_time(text: &str) -> Option<OffsetDateTime> {
    let captures = TIME_HYPHEN_RE
        .captures(text)
        .or_else(|| TIME_COMPACT_RE.captures(text))?;
    let time = make_time(
        &captures[1],
        &captures[2],
        capture(&captures, 3),
        capture(&captures, 4),
    )?;
    let offset = match capture(&captures, 5) {
        Some(tz) => parse_offset(tz)?,
        None => UtcOffset::UTC,
    };
    let anchor = Date::from_calendar_date(1900, Month::January, 1).expect("is a valid date");
    Some(PrimitiveDateTime::new(anchor, time).assume_offset(offset))
}

fn format_offset(offset: UtcOffset, separators: bool) -> String {
    if offset.is_utc() {
        return "Z".into();
    }
    let total = offset.whole_minutes();
    let sign = if total < 0 { '-' } else { '+' };
    let hours = (total / 60).abs();
    let minutes = (total % 60).abs();
    if separators {
        format!("{sign}{hours:02}:{minutes:02}")
    } else {
        format!("{sign}{hours:02}{minutes:02}")
    }
}

/// Formats a full datetime; `separators` selects the hyphenated form and
/// `zulu` normalises to UTC with a trailing `Z`.
pub fn date_to_datetime_string(when: &OffsetDateTime, separators: bool, zulu: bool) -> String {
    let when = if zulu {
        when.to_offset(UtcOffset::UTC)
    } else {
        *when
    };
    format!(
        "{}T{}",
        date_body(&when, separators),
        time_body(&when, separators),
    ) + &format_offset(when.offset(), separators)
}

/// Formats the date part only.
pub fn date_to_date_string(when: &OffsetDateTime, separators: bool) -> String {
    date_body(when, separators)
}

/// Formats the time part only, with the same timezone handling as
/// [`date_to_datetime_string`].
pub fn date_to_time_string(when: &OffsetDateTime, separators: bool, zulu: bool) -> String {
    let when = if zulu {
        when.to_offset(UtcOffset::UTC)
    } else {
        *when
    };
    time_body(&when, separators) + &format_offset(when.offset(), separators)
}

fn date_body(when: &OffsetDateTime, separators: bool) -> String {
    let (year, month, day) = (when.year(), u8::from(when.month()), when.day());
    if separators {
        format!("{year:04}-{month:02}-{day:02}")
    } else {
        format!("{year:04}{month:02}{day:02}")
    }
}

fn time_body(when: &OffsetDateTime, separators: bool) -> String {
    let (hour, minute, second, millis) = (
        when.hour(),
        when.minute(),
        when.second(),
        when.millisecond(),
    );
    if separators {
        format!("{hour:02}:{minute:02}:{second:02}.{millis:03}")
    } else {
        format!("{hour:02}{minute:02}{second:02}.{millis:03}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_datetime_round_trips_to_hyphenated() {
        let when = parse_date_time("20200412T084346.619Z").unwrap();
        assert_eq!(
            date_to_datetime_string(&when, true, true),
            "2020-04-12T08:43:46.619Z"
        );
    }

    #[test]
    fn hyphenated_with_offset() {
        let when = parse_date_time("2020-04-12T08:43:46.619+05:30").unwrap();
        assert_eq!(when.offset(), UtcOffset::from_hms(5, 30, 0).unwrap());
        assert_eq!(
            date_to_datetime_string(&when, true, false),
            "2020-04-12T08:43:46.619+05:30"
        );
        assert_eq!(
            date_to_datetime_string(&when, false, false),
            "20200412T084346.619+0530"
        );
    }

    #[test]
    fn date_only_means_utc_midnight() {
        let when = parse_date_time("2020-04-12").unwrap();
        assert_eq!(when.hour(), 0);
        assert_eq!(when.offset(), UtcOffset::UTC);
        assert_eq!(parse_date("20200412").unwrap(), when);
        assert!(parse_date("2020-04-12T00:00").is_none());
    }

    #[test]
    fn time_anchors_to_1900() {
        let when = parse_time("08:43:46.619").unwrap();
        assert_eq!(when.year(), 1900);
        assert_eq!(when.offset(), UtcOffset::UTC);
        assert_eq!(date_to_time_string(&when, true, false), "08:43:46.619Z");
        assert_eq!(parse_time("0843").unwrap().minute(), 43);
    }

    #[test]
    fn short_millisecond_runs_are_padded_right() {
        let when = parse_time("10:00:00.6").unwrap();
        assert_eq!(when.millisecond(), 600);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(parse_date_time("2020-13-01").is_none());
        assert!(parse_date_time("2020-02-30").is_none());
        assert!(parse_date_time("not a date").is_none());
        assert!(parse_time("25:00").is_none());
        assert!(parse_date("2020-1-2").is_none());
    }

    #[test]
    fn negative_offsets() {
        let when = parse_date_time("2020-04-12T00:30:00-04:00").unwrap();
        assert_eq!(when.offset(), UtcOffset::from_hms(-4, 0, 0).unwrap());
        assert_eq!(
            date_to_datetime_string(&when, true, true),
            "2020-04-12T04:30:00.000Z"
        );
    }
}
