//! Data model of the upstream warning feed.
//!
//! The feed is a JSON array of bulletins. Decoding is deliberately lenient:
//! missing fields default, unknown fields are ignored, ids may be numbers or
//! strings, and list elements that fail to decode are skipped one by one so a
//! single bad entry never costs the whole refresh.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::config::Language;

/// Text available in both supported languages, optionally with a code.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub sv: Option<String>,
    #[serde(default)]
    pub en: Option<String>,
}

impl LocalizedText {
    /// The text in `lang`, if present and non-empty.
    pub fn get(&self, lang: Language) -> Option<&str> {
        let text = match lang {
            Language::Sv => self.sv.as_deref(),
            Language::En => self.en.as_deref(),
        };
        text.filter(|t| !t.is_empty())
    }

    /// The text in `lang`, falling back to the other language.
    pub fn get_or_other(&self, lang: Language) -> Option<&str> {
        self.get(lang).or_else(|| self.get(lang.other()))
    }

    /// The text in `lang`, or an empty string.
    pub fn text(&self, lang: Language) -> &str {
        self.get(lang).unwrap_or("")
    }
}

/// What kind of event a bulletin describes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub sv: Option<String>,
    #[serde(default)]
    pub en: Option<String>,
    #[serde(default)]
    pub mho_classification: Option<LocalizedText>,
}

impl EventDescriptor {
    pub fn label(&self, lang: Language) -> &str {
        let label = match lang {
            Language::Sv => self.sv.as_deref(),
            Language::En => self.en.as_deref(),
        };
        label.unwrap_or("")
    }

    pub fn classification_code(&self) -> Option<&str> {
        self.mho_classification
            .as_ref()
            .and_then(|c| c.code.as_deref())
    }
}

/// One upstream alert record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertBulletin {
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub event: EventDescriptor,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub warning_areas: Vec<WarningArea>,
}

/// A district or sea area affected by a warning area.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AffectedArea {
    #[serde(default, deserialize_with = "required_id")]
    pub id: String,
    #[serde(default)]
    pub sv: Option<String>,
    #[serde(default)]
    pub en: Option<String>,
}

impl AffectedArea {
    pub fn name(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::Sv => self.sv.as_deref(),
            Language::En => self.en.as_deref(),
        }
    }
}

/// A titled block of descriptive text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub text: LocalizedText,
}

/// A geographic sub-record of a bulletin with its own severity and timing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningArea {
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub approximate_start: Option<String>,
    #[serde(default)]
    pub approximate_end: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub warning_level: LocalizedText,
    #[serde(default)]
    pub event_description: LocalizedText,
    #[serde(default)]
    pub area_name: LocalizedText,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub affected_areas: Vec<AffectedArea>,
    /// GeoJSON geometry container, evaluated lazily by the geometry engine.
    #[serde(default)]
    pub area: Option<Value>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub descriptions: Vec<Description>,
}

impl WarningArea {
    /// Upper-cased severity code, empty when absent.
    pub fn severity_code(&self) -> String {
        self.warning_level
            .code
            .as_deref()
            .unwrap_or("")
            .to_uppercase()
    }
}

fn id_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_to_string(Value::deserialize(deserializer)?))
}

fn required_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(id_to_string(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Decodes a JSON array element by element, dropping elements that do not fit `T`.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            warn!(kind = json_kind(&other), "Expected a list, ignoring field");
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable feed element");
                None
            }
        })
        .collect())
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
