//! Natural-language date/time parsing
//!
//! Converts phrases like "tomorrow at 2pm" or "in 3 days" into naive local
//! `YYYY-MM-DD` / `HH:MM:SS` strings. No timezone is attached anywhere; the
//! interpretation service and the client both treat these as wall-clock values.
//!
//! Every function has an `*_on` variant that takes "today" explicitly.

use std::sync::LazyLock;

use chrono::{DateTime, Days, Local, Months, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";
const MIDNIGHT: &str = "00:00:00";

static IN_DAYS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"in (\d+) days?").expect("valid in-days regex"));

static TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2})(?::(\d{2}))?\s*(am|pm)?").expect("valid time regex")
});

static TRAILING_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d{1,2}(am|pm)").expect("valid trailing time regex"));

/// Explicit date layouts tried after the relative phrases
const DATE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%A, %B %d, %Y",
];

const DATETIME_LAYOUTS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// A parsed date with its time of day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeParts {
    pub date: String,
    pub time: String,
}

impl DateTimeParts {
    pub fn to_iso8601(&self) -> String {
        to_iso8601(&self.date, Some(&self.time))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// "today", "tomorrow", "next week", "in 3 days", "2025-03-14", "March 14, 2025"
pub fn parse_relative_date(input: &str) -> Option<String> {
    parse_relative_date_on(input, today())
}

pub fn parse_relative_date_on(input: &str, today: NaiveDate) -> Option<String> {
    let lower = input.trim().to_lowercase();

    let relative = match lower.as_str() {
        "today" => Some(today),
        "tomorrow" => today.checked_add_days(Days::new(1)),
        "yesterday" => today.checked_sub_days(Days::new(1)),
        _ if lower.contains("next week") => today.checked_add_days(Days::new(7)),
        // chrono clamps Jan 31 + 1 month to the last day of February
        _ if lower.contains("next month") => today.checked_add_months(Months::new(1)),
        _ => IN_DAYS_RE
            .captures(&lower)
            .and_then(|caps| caps[1].parse::<u64>().ok())
            .and_then(|days| today.checked_add_days(Days::new(days))),
    };

    relative
        .or_else(|| parse_explicit_date(input.trim()))
        .map(format_date)
}

fn parse_explicit_date(input: &str) -> Option<NaiveDate> {
    if input.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.date_naive());
    }
    if let Some(dt) = DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(input, layout).ok())
    {
        return Some(dt.date());
    }
    DATE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDate::parse_from_str(input, layout).ok())
}

/// "2pm", "2:30 pm", "14:00", "12am" → `HH:MM:SS`
pub fn parse_time(input: &str) -> Option<String> {
    let lower = input.trim().to_lowercase();
    let caps = TIME_RE.captures(&lower)?;

    let mut hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    match caps.get(3).map(|m| m.as_str()) {
        Some("pm") if hours != 12 => hours += 12,
        Some("am") if hours == 12 => hours = 0,
        _ => {}
    }

    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(format!("{:02}:{:02}:00", hours, minutes))
}

/// "tomorrow at 2pm", "next week 9am", "3pm". Date defaults to today,
/// time to midnight.
pub fn parse_date_time(input: &str) -> DateTimeParts {
    parse_date_time_on(input, today())
}

pub fn parse_date_time_on(input: &str, today: NaiveDate) -> DateTimeParts {
    let lower = input.trim().to_lowercase();

    let (date_part, time_part) = if let Some((date, time)) = lower.split_once(" at ") {
        (date.to_string(), Some(time.to_string()))
    } else if let Some(m) = TRAILING_TIME_RE.find(&lower) {
        let date = lower.replacen(m.as_str(), "", 1).trim().to_string();
        (date, Some(m.as_str().to_string()))
    } else {
        (lower.clone(), None)
    };

    let date = parse_relative_date_on(&date_part, today).unwrap_or_else(|| format_date(today));
    let time = time_part
        .as_deref()
        .and_then(parse_time)
        .unwrap_or_else(|| MIDNIGHT.to_string());

    DateTimeParts { date, time }
}

/// `<date>T<time>`, naive local. Missing time means midnight.
pub fn to_iso8601(date: &str, time: Option<&str>) -> String {
    format!("{}T{}", date, time.unwrap_or(MIDNIGHT))
}
