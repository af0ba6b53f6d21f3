//! Localized text and output formatting for published results.
//!
//! Supports notice blocks, localized timestamps and JSON.

use std::fmt::Display;

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use tracing::info;

use crate::aggregate::AlertRecord;
use crate::config::Language;
use crate::feed::Description;

pub const ATTRIBUTION: &str = "Information provided by SMHI";
const LOCAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Overall state text.
pub fn state_label(lang: Language, active: bool) -> &'static str {
    match (lang, active) {
        (Language::En, true) => "Alert",
        (Language::En, false) => "No Alerts",
        (Language::Sv, true) => "Varning",
        (Language::Sv, false) => "Inga varningar",
    }
}

pub fn unknown_time(lang: Language) -> &'static str {
    match lang {
        Language::En => "Unknown",
        Language::Sv => "Okänt",
    }
}

/// Renders an upstream RFC 3339 timestamp in `tz`. Unparseable input is
/// returned as-is.
pub fn format_local<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.with_timezone(tz).format(LOCAL_TIME_FORMAT).to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Formats any `DateTime` in `tz`.
pub fn format_instant<Tz, Src>(instant: &DateTime<Src>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
    Src: TimeZone,
{
    instant.with_timezone(tz).format(LOCAL_TIME_FORMAT).to_string()
}

/// Joins description blocks as `title: text` lines.
pub fn format_details(descriptions: &[Description], lang: Language) -> String {
    descriptions
        .iter()
        .map(|d| format!("{}: {}\n", d.title.text(lang), d.text.text(lang)))
        .collect()
}

/// One newline-terminated notice block for a record.
pub fn format_notice(record: &AlertRecord, lang: Language) -> String {
    match lang {
        Language::En => format!(
            "[{}] ({})\nDistrict: {}\nLevel: {}\nType: {}\nStart: {}\nEnd: {}\n{}\n",
            record.severity,
            record.published_local,
            record.area,
            record.level,
            record.event,
            record.start_local,
            record.end_local,
            record.details
        ),
        Language::Sv => format!(
            "[{}] ({})\nOmråde: {}\nNivå: {}\nTyp: {}\nStart: {}\nSlut: {}\nBeskrivning:\n{}\n",
            record.severity,
            record.published_local,
            record.area,
            record.level,
            record.event,
            record.start_local,
            record.end_local,
            record.details
        ),
    }
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
