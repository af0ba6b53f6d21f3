//! Filter configuration and coordinator settings.

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::categories::default_message_types;
use crate::districts::district_name;
use crate::error::ConfigError;

pub const WARNINGS_URL: &str =
    "https://opendata-download-warnings.smhi.se/ibww/api/version/1/warning.json";
pub const AREAS_URL: &str =
    "https://opendata-download-warnings.smhi.se/ibww/api/version/1/metadata/area.json";

pub const ALL_DISTRICTS: &str = "all";
pub const DEFAULT_RADIUS_KM: f64 = 50.0;
pub const MIN_RADIUS_KM: f64 = 1.0;
pub const MAX_RADIUS_KM: f64 = 250.0;

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(300);
pub const MAX_SCAN_INTERVAL: Duration = Duration::from_secs(3600);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Display language for labels, notices and state text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Sv,
    En,
}

impl Language {
    pub fn other(self) -> Self {
        match self {
            Language::Sv => Language::En,
            Language::En => Language::Sv,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::Sv => "sv",
            Language::En => "en",
        }
    }
}

/// How warning areas are matched against the user's geography.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    District,
    Coordinate,
}

/// User-facing filter settings. Read as a consistent snapshot per refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub mode: FilterMode,
    pub district: String,
    pub language: Language,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub exclude_sea: bool,
    pub include_messages: bool,
    pub message_types: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            mode: FilterMode::District,
            district: ALL_DISTRICTS.to_string(),
            language: Language::Sv,
            latitude: 0.0,
            longitude: 0.0,
            radius_km: DEFAULT_RADIUS_KM,
            exclude_sea: false,
            include_messages: false,
            message_types: default_message_types(),
        }
    }
}

impl FilterConfig {
    /// Checks the ranges the configuration form enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.mode {
            FilterMode::District => {
                if self.district.trim().is_empty() {
                    return Err(ConfigError::EmptyDistrict);
                }
            }
            FilterMode::Coordinate => {
                if !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&self.radius_km) {
                    return Err(ConfigError::RadiusOutOfRange(self.radius_km));
                }
                if !(-90.0..=90.0).contains(&self.latitude) {
                    return Err(ConfigError::LatitudeOutOfRange(self.latitude));
                }
                if !(-180.0..=180.0).contains(&self.longitude) {
                    return Err(ConfigError::LongitudeOutOfRange(self.longitude));
                }
            }
        }
        Ok(())
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_km * 1000.0
    }

    /// Stable identity of a configuration, used as the registry key.
    pub fn unique_id(&self) -> String {
        match self.mode {
            FilterMode::District => {
                format!("district:{}:{}", self.district, self.language.code())
            }
            FilterMode::Coordinate => format!(
                "coord:{},{}:{}:{}",
                round4(self.latitude),
                round4(self.longitude),
                self.radius_km,
                self.language.code()
            ),
        }
    }

    pub fn title(&self) -> String {
        match self.mode {
            FilterMode::District => {
                let name = district_name(&self.district).unwrap_or(&self.district);
                format!("SMHI Alert ({name})")
            }
            FilterMode::Coordinate => format!(
                "SMHI Alert ({},{} @ {}km)",
                round4(self.latitude),
                round4(self.longitude),
                self.radius_km
            ),
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Picks the effective message-type selection.
///
/// An explicit inclusion list wins. Without one, a legacy exclusion list is
/// subtracted from the defaults. If that leaves nothing, the defaults apply.
pub fn resolve_message_types(included: &[String], excluded: &[String]) -> Vec<String> {
    if !included.is_empty() {
        return included.to_vec();
    }

    let defaults = default_message_types();
    if !excluded.is_empty() {
        let remaining: Vec<String> = defaults
            .iter()
            .filter(|code| !excluded.contains(code))
            .cloned()
            .collect();
        if !remaining.is_empty() {
            return remaining;
        }
    }
    defaults
}

/// Transport and scheduling settings of a coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub url: String,
    pub base_interval: Duration,
    pub max_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            url: WARNINGS_URL.to_string(),
            base_interval: DEFAULT_SCAN_INTERVAL,
            max_interval: MAX_SCAN_INTERVAL,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}
