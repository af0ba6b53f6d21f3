//! Per-refresh records, counters and the published snapshot.

use std::fmt::Display;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;

use crate::config::{FilterConfig, Language};
use crate::feed::{AlertBulletin, WarningArea};
use crate::filter::{ActiveFilter, Decision, evaluate};
use crate::output::{
    ATTRIBUTION, format_details, format_instant, format_local, format_notice, state_label,
    unknown_time,
};
use crate::severity::Severity;

/// One retained warning area, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub event: String,
    pub event_code: Option<String>,
    pub start: String,
    pub end: Option<String>,
    pub published: String,
    pub start_local: String,
    pub end_local: String,
    pub published_local: String,
    pub code: Severity,
    /// Upstream level code as received, including codes with no known rank.
    pub level_code: String,
    pub severity: String,
    pub level: String,
    pub descr: String,
    pub details: String,
    pub areas: Vec<String>,
    pub area: String,
    pub event_color: String,
}

impl AlertRecord {
    pub fn new<Tz>(
        bulletin: &AlertBulletin,
        area: &WarningArea,
        labels: Vec<String>,
        lang: Language,
        tz: &Tz,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let level_code = area.severity_code();
        let code = Severity::from_code(&level_code);
        let start = area.approximate_start.clone().unwrap_or_default();
        let end = area.approximate_end.clone().filter(|e| !e.is_empty());
        let published = area.published.clone().unwrap_or_default();
        let severity = area.warning_level.text(lang).to_string();

        AlertRecord {
            event: bulletin.event.label(lang).to_string(),
            event_code: bulletin.event.code.clone(),
            start_local: format_local(&start, tz),
            end_local: end
                .as_deref()
                .map(|e| format_local(e, tz))
                .unwrap_or_else(|| unknown_time(lang).to_string()),
            published_local: format_local(&published, tz),
            start,
            end,
            published,
            code,
            level_code,
            level: severity.clone(),
            severity,
            descr: area.event_description.text(lang).to_string(),
            details: format_details(&area.descriptions, lang),
            area: labels.join(", "),
            areas: labels,
            event_color: code.color().to_string(),
        }
    }
}

/// Counters derived from a set of retained records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub warnings_count: usize,
    pub messages_count: usize,
    pub alerts_count: usize,
    pub highest_severity: Severity,
}

impl Counts {
    pub fn from_records(records: &[AlertRecord], include_messages: bool) -> Self {
        let warnings_count = records.iter().filter(|r| r.code.is_warning()).count();
        let messages_count = records.iter().filter(|r| r.code.is_message()).count();
        let alerts_count = warnings_count + if include_messages { messages_count } else { 0 };
        let highest_severity = records
            .iter()
            .map(|r| r.code)
            .max()
            .unwrap_or(Severity::None);

        Counts {
            warnings_count,
            messages_count,
            alerts_count,
            highest_severity,
        }
    }
}

/// Everything a refresh cycle publishes. Replaced wholesale on each
/// successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedSnapshot {
    pub state: String,
    pub messages: Vec<AlertRecord>,
    pub notice: String,
    #[serde(flatten)]
    pub counts: Counts,
    pub last_update: Option<DateTime<Utc>>,
    pub last_update_local: Option<String>,
    pub filter: FilterConfig,
    pub attribution: &'static str,
}

impl PublishedSnapshot {
    /// Snapshot shown before the first successful refresh.
    pub fn empty(config: &FilterConfig) -> Self {
        Self {
            state: state_label(config.language, false).to_string(),
            messages: Vec::new(),
            notice: String::new(),
            counts: Counts::default(),
            last_update: None,
            last_update_local: None,
            filter: config.clone(),
            attribution: ATTRIBUTION,
        }
    }

    pub fn summary(&self) -> AlertSummary {
        AlertSummary {
            active: self.counts.alerts_count > 0,
            warnings_count: self.counts.warnings_count,
            messages_count: self.counts.messages_count,
            alerts_count: self.counts.alerts_count,
            highest_severity: self.counts.highest_severity,
            last_update: self.last_update,
            attribution: self.attribution,
        }
    }
}

/// Compact on/off view of a snapshot without the message payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertSummary {
    pub active: bool,
    pub warnings_count: usize,
    pub messages_count: usize,
    pub alerts_count: usize,
    pub highest_severity: Severity,
    pub last_update: Option<DateTime<Utc>>,
    pub attribution: &'static str,
}

/// Filters every area of every bulletin and aggregates the survivors.
///
/// Records are ordered by severity, most severe first; equal severities keep
/// feed order.
pub fn build_snapshot<Tz>(
    feed: &[AlertBulletin],
    filter: &ActiveFilter,
    updated_at: DateTime<Utc>,
    tz: &Tz,
) -> PublishedSnapshot
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let config = filter.config();
    let lang = config.language;

    let mut records: Vec<AlertRecord> = Vec::new();
    for bulletin in feed {
        for area in &bulletin.warning_areas {
            if let Decision::Keep { labels } = evaluate(bulletin, area, filter) {
                records.push(AlertRecord::new(bulletin, area, labels, lang, tz));
            }
        }
    }

    records.sort_by(|a, b| b.code.cmp(&a.code));

    let counts = Counts::from_records(&records, config.include_messages);
    let notice: String = records.iter().map(|r| format_notice(r, lang)).collect();

    PublishedSnapshot {
        state: state_label(lang, counts.alerts_count > 0).to_string(),
        messages: records,
        notice,
        counts,
        last_update: Some(updated_at),
        last_update_local: Some(format_instant(&updated_at, tz)),
        filter: config.clone(),
        attribution: ATTRIBUTION,
    }
}
