//! Date/time recognition
//!
//! Resolves English date/time expressions against a reference instant and
//! returns every plausible reading, most likely first. Callers pick the
//! candidate that satisfies their own constraint (e.g. "at least an hour out").
//!
//! Supported forms:
//! - Relative offsets: `in 2 hours`, `in thirty minutes`, `in a week`
//! - Relative days: `today`, `tonight`, `tomorrow`, `day after tomorrow`, `yesterday`
//! - Weekdays: `friday`, `next monday`, `this sunday`
//! - Absolute dates: `2018-11-14`, `11/14/2018`, `11/14`, `November 14th, 2018`, `14 nov`
//! - Times: `9pm`, `9:30 p.m.`, `21:00`, `noon`, `midnight`, `at 9`, `9 o'clock`
//!
//! A time without a date resolves to the reference day; a date without a
//! time resolves to midnight. Ambiguous hours (`at 9`) yield both the morning
//! and evening reading.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::numbers;

static OFFSET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bin\s+(\d+|an?|[a-z]+(?:[\s-][a-z]+)?)\s+(minutes?|mins?|hours?|hrs?|days?|weeks?)\b",
    )
    .unwrap()
});

static ISO_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").unwrap());

static SLASH_DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").unwrap());

static MONTH_FIRST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?\b(?:,?\s+(\d{4})\b)?",
    )
    .unwrap()
});

static DAY_FIRST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?(?:,?\s+(\d{4})\b)?",
    )
    .unwrap()
});

static RELATIVE_DAY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(day after tomorrow|tomorrow|tonight|today|yesterday)\b").unwrap()
});

static WEEKDAY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:(next|this)\s+)?(mon|tues?|wed|thu|thurs|fri|sat|sun)(?:day|nesday|urday|sday)?\b",
    )
    .unwrap()
});

static MERIDIEM_TIME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?m\b\.?").unwrap()
});

static CLOCK_TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap());

static NAMED_TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(noon|midday|midnight)\b").unwrap());

static BARE_HOUR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:at\s+(\d{1,2})(?:\s*o'?clock)?(?:[^/:\-.\w]|$)|(\d{1,2})\s*o'?clock\b)",
    )
    .unwrap()
});

/// Default hour for "tonight" when no time is given
const TONIGHT_HOUR: u32 = 20;

/// Upper bound on relative offsets, in minutes (about 10 years)
const MAX_OFFSET_MINUTES: i64 = 10 * 366 * 24 * 60;

/// Dates found in text plus an implied time of day
struct DateMatch {
    dates: Vec<NaiveDate>,
    default_time: Option<NaiveTime>,
}

/// Recognize date/time expressions relative to `now`
///
/// Returns candidates in preference order; empty when nothing resolvable was
/// found.
pub fn recognize_datetimes(text: &str, now: NaiveDateTime) -> Vec<NaiveDateTime> {
    let lowered = text.to_lowercase();
    let mut candidates = offsets(&lowered, now);

    let date_match = dates(&lowered, now.date());
    let times = times(&lowered);

    match (date_match, times.is_empty()) {
        (None, true) => {},
        (None, false) => {
            candidates.extend(times.iter().map(|t| now.date().and_time(*t)));
        },
        (Some(found), true) => {
            let time = found
                .default_time
                .or_else(|| NaiveTime::from_hms_opt(0, 0, 0));
            if let Some(time) = time {
                candidates.extend(found.dates.iter().map(|d| d.and_time(time)));
            }
        },
        (Some(found), false) => {
            for date in &found.dates {
                candidates.extend(times.iter().map(|t| date.and_time(*t)));
            }
        },
    }

    candidates
}

fn offsets(text: &str, now: NaiveDateTime) -> Vec<NaiveDateTime> {
    OFFSET_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let quantity = &caps[1];
            let amount = match quantity {
                "a" | "an" => 1,
                other => numbers::first_integer(other)?,
            };
            let minutes_per_unit = match &caps[2] {
                u if u.starts_with("min") => 1,
                u if u.starts_with('h') => 60,
                u if u.starts_with('d') => 24 * 60,
                _ => 7 * 24 * 60,
            };
            let minutes = amount.checked_mul(minutes_per_unit)?;
            if !(0..=MAX_OFFSET_MINUTES).contains(&minutes) {
                return None;
            }
            now.checked_add_signed(Duration::minutes(minutes))
        })
        .collect()
}

fn month_number(prefix: &str) -> Option<u32> {
    let month = match prefix {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn full_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(if raw.len() == 2 { 2000 + year } else { year })
}

/// Dates for a month/day with an optional year
///
/// Without a year, the date this year comes first; next year is added when
/// this year's date has already passed.
fn month_day(month: u32, day: u32, year: Option<i32>, today: NaiveDate) -> Vec<NaiveDate> {
    match year {
        Some(year) => NaiveDate::from_ymd_opt(year, month, day).into_iter().collect(),
        None => {
            let mut dates = Vec::new();
            if let Some(this_year) = NaiveDate::from_ymd_opt(today.year(), month, day) {
                dates.push(this_year);
                if this_year >= today {
                    return dates;
                }
            }
            if let Some(next_year) = NaiveDate::from_ymd_opt(today.year() + 1, month, day) {
                dates.push(next_year);
            }
            dates
        },
    }
}

fn weekday_from_prefix(prefix: &str) -> Option<Weekday> {
    match prefix {
        "mon" => Some(Weekday::Mon),
        "tue" | "tues" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" | "thurs" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn dates(text: &str, today: NaiveDate) -> Option<DateMatch> {
    let plain = |dates: Vec<NaiveDate>| {
        if dates.is_empty() {
            None
        } else {
            Some(DateMatch {
                dates,
                default_time: None,
            })
        }
    };

    if let Some(caps) = ISO_DATE_PATTERN.captures(text) {
        let date = (|| {
            let year = caps[1].parse().ok()?;
            let month = caps[2].parse().ok()?;
            let day = caps[3].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        })();
        if let Some(found) = plain(date.into_iter().collect()) {
            return Some(found);
        }
    }

    if let Some(caps) = SLASH_DATE_PATTERN.captures(text) {
        let month: Option<u32> = caps[1].parse().ok();
        let day: Option<u32> = caps[2].parse().ok();
        let year = caps.get(3).and_then(|y| full_year(y.as_str()));
        if let (Some(month), Some(day)) = (month, day) {
            if let Some(found) = plain(month_day(month, day, year, today)) {
                return Some(found);
            }
        }
    }

    if let Some(caps) = MONTH_FIRST_PATTERN.captures(text) {
        let month = month_number(&caps[1]);
        let day: Option<u32> = caps[2].parse().ok();
        let year = caps.get(3).and_then(|y| full_year(y.as_str()));
        if let (Some(month), Some(day)) = (month, day) {
            if let Some(found) = plain(month_day(month, day, year, today)) {
                return Some(found);
            }
        }
    }

    if let Some(caps) = DAY_FIRST_PATTERN.captures(text) {
        let day: Option<u32> = caps[1].parse().ok();
        let month = month_number(&caps[2]);
        let year = caps.get(3).and_then(|y| full_year(y.as_str()));
        if let (Some(month), Some(day)) = (month, day) {
            if let Some(found) = plain(month_day(month, day, year, today)) {
                return Some(found);
            }
        }
    }

    if let Some(caps) = RELATIVE_DAY_PATTERN.captures(text) {
        let (offset, default_time) = match &caps[1] {
            "day after tomorrow" => (2, None),
            "tomorrow" => (1, None),
            "tonight" => (0, NaiveTime::from_hms_opt(TONIGHT_HOUR, 0, 0)),
            "yesterday" => (-1, None),
            _ => (0, None),
        };
        if let Some(date) = today.checked_add_signed(Duration::days(offset)) {
            return Some(DateMatch {
                dates: vec![date],
                default_time,
            });
        }
    }

    if let Some(caps) = WEEKDAY_PATTERN.captures(text) {
        if let Some(target) = weekday_from_prefix(&caps[2]) {
            let ahead = (target.num_days_from_monday() + 7
                - today.weekday().num_days_from_monday())
                % 7;
            let offsets: Vec<i64> = match (ahead, caps.get(1).map(|m| m.as_str())) {
                (0, Some("next")) => vec![7],
                (0, _) => vec![0, 7],
                (n, _) => vec![i64::from(n)],
            };
            let dates = offsets
                .into_iter()
                .filter_map(|days| today.checked_add_signed(Duration::days(days)))
                .collect();
            if let Some(found) = plain(dates) {
                return Some(found);
            }
        }
    }

    None
}

fn times(text: &str) -> Vec<NaiveTime> {
    if let Some(caps) = MERIDIEM_TIME_PATTERN.captures(text) {
        let hour: u32 = caps[1].parse().unwrap_or(0);
        let minute: u32 = caps.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        if (1..=12).contains(&hour) {
            let hour = if &caps[3] == "p" { hour % 12 + 12 } else { hour % 12 };
            if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
                return vec![time];
            }
        }
    }

    if let Some(caps) = CLOCK_TIME_PATTERN.captures(text) {
        let hour: Option<u32> = caps[1].parse().ok();
        let minute: Option<u32> = caps[2].parse().ok();
        if let Some(time) = hour
            .zip(minute)
            .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
        {
            return vec![time];
        }
    }

    if let Some(caps) = NAMED_TIME_PATTERN.captures(text) {
        let hour = if &caps[1] == "midnight" { 0 } else { 12 };
        return NaiveTime::from_hms_opt(hour, 0, 0).into_iter().collect();
    }

    if let Some(caps) = BARE_HOUR_PATTERN.captures(text) {
        let hour: Option<u32> = caps
            .get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse().ok());
        return match hour {
            Some(h @ 1..=11) => [h, h + 12]
                .into_iter()
                .filter_map(|h| NaiveTime::from_hms_opt(h, 0, 0))
                .collect(),
            Some(h @ 12..=23) => NaiveTime::from_hms_opt(h, 0, 0).into_iter().collect(),
            _ => Vec::new(),
        };
    }

    Vec::new()
}
