//! Per-area inclusion decisions.
//!
//! A warning area is kept when it matches the configured geography (district
//! code or coordinate circle) and, for message-tier items, when messages are
//! enabled and the event is in the category allow-list.

use tracing::debug;

use crate::categories::AllowList;
use crate::config::{ALL_DISTRICTS, FilterConfig, FilterMode, Language};
use crate::districts::is_marine_area_id;
use crate::feed::{AlertBulletin, WarningArea};
use crate::geometry::{LonLat, geometry_matches};
use crate::severity::Severity;

/// Classification codes of oceanographic events.
pub static MARINE_CLASSIFICATION_CODES: &[&str] = &["OCEANOGRAPHIC", "OCEAN"];

/// Event codes that only occur over water.
pub static MARINE_EVENT_CODES: &[&str] = &[
    "HIGH_SEA_LEVEL",
    "LOW_SEA_LEVEL",
    "ICE_ACCRETION",
    "SEA_ICE",
    "HIGH_WAVES",
];

pub const MARINE_EVENT_SUFFIX: &str = "_SEA";

/// A filter configuration together with the allow-list derived from it.
#[derive(Debug, Clone)]
pub struct ActiveFilter {
    config: FilterConfig,
    allow: AllowList,
}

impl ActiveFilter {
    pub fn new(config: FilterConfig) -> Self {
        let allow = AllowList::from_selection(&config.message_types);
        Self { config, allow }
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow
    }

    fn center(&self) -> LonLat {
        LonLat::new(self.config.longitude, self.config.latitude)
    }
}

impl Default for ActiveFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

/// Outcome of evaluating one warning area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Keep { labels: Vec<String> },
    Drop,
}

/// Decides whether `area` of `bulletin` belongs in the published result.
pub fn evaluate(bulletin: &AlertBulletin, area: &WarningArea, filter: &ActiveFilter) -> Decision {
    let labels = match filter.config.mode {
        FilterMode::District => match_district(bulletin, area, &filter.config),
        FilterMode::Coordinate => match_coordinate(bulletin, area, filter),
    };
    let Some(labels) = labels else {
        return Decision::Drop;
    };

    if Severity::from_code(&area.severity_code()).is_message() && !message_allowed(bulletin, filter) {
        debug!(event = ?bulletin.event.code, "Message suppressed by category filter");
        return Decision::Drop;
    }

    Decision::Keep { labels }
}

fn message_allowed(bulletin: &AlertBulletin, filter: &ActiveFilter) -> bool {
    filter.config.include_messages && filter.allow.is_allowed(&bulletin.event)
}

fn match_district(
    bulletin: &AlertBulletin,
    area: &WarningArea,
    config: &FilterConfig,
) -> Option<Vec<String>> {
    if config.exclude_sea && is_marine_event(bulletin) {
        debug!(area_id = ?area.id, "Marine event excluded");
        return None;
    }

    let lang = config.language;
    let labels: Vec<String> = area
        .affected_areas
        .iter()
        .filter(|entry| !(config.exclude_sea && is_marine_area_id(&entry.id)))
        .filter(|entry| config.district == ALL_DISTRICTS || entry.id == config.district)
        .map(|entry| {
            entry
                .name(lang)
                .or_else(|| entry.name(lang.other()))
                .unwrap_or(entry.id.as_str())
                .to_string()
        })
        .collect();

    (!labels.is_empty()).then_some(labels)
}

fn match_coordinate(
    bulletin: &AlertBulletin,
    area: &WarningArea,
    filter: &ActiveFilter,
) -> Option<Vec<String>> {
    let config = &filter.config;
    if config.exclude_sea && is_marine(bulletin, area) {
        debug!(area_id = ?area.id, "Marine area excluded");
        return None;
    }

    let geometry = area.area.as_ref()?;
    if !geometry_matches(geometry, filter.center(), config.radius_meters()) {
        return None;
    }

    let label = area
        .area_name
        .get_or_other(config.language)
        .map(str::to_string)
        .unwrap_or_else(|| unknown_area(config.language).to_string());
    Some(vec![label])
}

/// Any one signal is enough to classify an area as marine.
pub fn is_marine(bulletin: &AlertBulletin, area: &WarningArea) -> bool {
    is_marine_event(bulletin)
        || area
            .affected_areas
            .iter()
            .any(|entry| is_marine_area_id(&entry.id))
}

/// Bulletin-level marine signals: the event classification or the event code.
pub fn is_marine_event(bulletin: &AlertBulletin) -> bool {
    let by_classification = bulletin
        .event
        .classification_code()
        .map(|code| {
            MARINE_CLASSIFICATION_CODES
                .iter()
                .any(|m| m.eq_ignore_ascii_case(code))
        })
        .unwrap_or(false);

    let by_event = bulletin
        .event
        .code
        .as_deref()
        .map(|code| {
            let code = code.to_uppercase();
            MARINE_EVENT_CODES.contains(&code.as_str()) || code.ends_with(MARINE_EVENT_SUFFIX)
        })
        .unwrap_or(false);

    by_classification || by_event
}

fn unknown_area(lang: Language) -> &'static str {
    match lang {
        Language::Sv => "Okänt område",
        Language::En => "Unknown area",
    }
}
