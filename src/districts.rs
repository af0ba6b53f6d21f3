//! Warning district catalogue.
//!
//! Land districts are Swedish counties (1..=25). Codes 41..=57 are sea
//! areas and 58 is lake Vänern; warnings for those are treated as marine.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AREAS_URL;
use crate::fetch::HttpClient;

pub static DISTRICTS: &[(&str, &str)] = &[
    ("1", "Stockholms län"),
    ("3", "Uppsala län"),
    ("4", "Södermanlands län"),
    ("5", "Östergötlands län"),
    ("6", "Jönköpings län"),
    ("7", "Kronobergs län"),
    ("8", "Kalmar län"),
    ("9", "Gotlands län"),
    ("10", "Blekinge län"),
    ("12", "Skåne län"),
    ("13", "Hallands län"),
    ("14", "Västra Götalands län"),
    ("17", "Värmlands län"),
    ("18", "Örebro län"),
    ("19", "Västmanlands län"),
    ("20", "Dalarnas län"),
    ("21", "Gävleborgs län"),
    ("22", "Västernorrlands län"),
    ("23", "Jämtlands län"),
    ("24", "Västerbottens län"),
    ("25", "Norrbottens län"),
    ("41", "Bottenviken"),
    ("42", "Norra Kvarken"),
    ("43", "Norra Bottenhavet"),
    ("44", "Södra Bottenhavet"),
    ("45", "Ålands hav"),
    ("46", "Skärgårdshavet"),
    ("47", "Finska viken"),
    ("48", "Norra Östersjön"),
    ("49", "Mellersta Östersjön"),
    ("50", "Rigabukten"),
    ("51", "Sydöstra Östersjön"),
    ("52", "Södra Östersjön"),
    ("53", "Sydvästra Östersjön"),
    ("54", "Bälten"),
    ("55", "Öresund"),
    ("56", "Kattegatt"),
    ("57", "Skagerrak"),
    ("58", "Vänern"),
    ("all", "Alla distrikt (Ej rekommenderat)"),
];

/// Ids of affected areas that lie over water.
pub static MARINE_AREA_IDS: &[&str] = &[
    "41", "42", "43", "44", "45", "46", "47", "48", "49", "50", "51", "52", "53", "54", "55",
    "56", "57", "58",
];

pub fn district_name(code: &str) -> Option<&'static str> {
    DISTRICTS
        .iter()
        .find(|(id, _)| *id == code)
        .map(|(_, name)| *name)
}

pub fn is_marine_area_id(id: &str) -> bool {
    MARINE_AREA_IDS.contains(&id)
}

/// A selectable district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct District {
    pub id: String,
    pub label: String,
}

#[derive(Deserialize)]
struct AreaEntry {
    id: serde_json::Value,
    #[serde(default)]
    sv: Option<String>,
    #[serde(default)]
    en: Option<String>,
}

impl From<AreaEntry> for District {
    fn from(entry: AreaEntry) -> Self {
        let id = match entry.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        let label = entry
            .sv
            .filter(|s| !s.is_empty())
            .or(entry.en.filter(|s| !s.is_empty()))
            .unwrap_or_else(|| id.clone());
        District { id, label }
    }
}

/// The static district table.
pub fn static_districts() -> Vec<District> {
    DISTRICTS
        .iter()
        .map(|(id, name)| District {
            id: id.to_string(),
            label: name.to_string(),
        })
        .collect()
}

/// Lists districts from the upstream area metadata, falling back to the
/// static table on any failure or an empty answer.
#[tracing::instrument(skip(client))]
pub async fn fetch_districts<C: HttpClient>(client: &C) -> Vec<District> {
    match fetch_area_metadata(client).await {
        Ok(districts) if !districts.is_empty() => {
            debug!(count = districts.len(), "District list fetched");
            districts
        }
        Ok(_) => {
            warn!("Upstream district list was empty, using static table");
            static_districts()
        }
        Err(e) => {
            warn!(error = %e, "District list fetch failed, using static table");
            static_districts()
        }
    }
}

async fn fetch_area_metadata<C: HttpClient>(client: &C) -> Result<Vec<District>> {
    let req = reqwest::Request::new(reqwest::Method::GET, AREAS_URL.parse()?);

    let resp = tokio::time::timeout(Duration::from_secs(10), client.execute(req)).await??;
    if !resp.status().is_success() {
        anyhow::bail!("area metadata returned status {}", resp.status());
    }

    let entries: Vec<AreaEntry> = serde_json::from_slice(&resp.bytes().await?)?;
    Ok(entries.into_iter().map(District::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{Reply, ScriptedClient};

    #[test]
    fn test_district_name_lookup() {
        assert_eq!(district_name("12"), Some("Skåne län"));
        assert_eq!(district_name("all"), Some("Alla distrikt (Ej rekommenderat)"));
        assert_eq!(district_name("99"), None);
    }

    #[test]
    fn test_marine_ids() {
        assert!(is_marine_area_id("41"));
        assert!(is_marine_area_id("58"));
        assert!(!is_marine_area_id("25"));
        assert!(!is_marine_area_id("all"));
    }

    #[test]
    fn test_area_entry_label_fallback() {
        let entry: AreaEntry = serde_json::from_str(r#"{"id": 3, "en": "Uppsala County"}"#).unwrap();
        let district = District::from(entry);
        assert_eq!(district.id, "3");
        assert_eq!(district.label, "Uppsala County");

        let entry: AreaEntry = serde_json::from_str(r#"{"id": "9"}"#).unwrap();
        assert_eq!(District::from(entry).label, "9");
    }

    #[test]
    fn test_static_districts_cover_table() {
        assert_eq!(static_districts().len(), DISTRICTS.len());
    }

    #[tokio::test]
    async fn test_fetch_districts_uses_upstream_list() {
        let client = ScriptedClient::new(vec![Reply::json(
            r#"[{"id": 1, "sv": "Stockholms län"}, {"id": "12", "sv": "Skåne län"}]"#,
        )]);
        let districts = fetch_districts(&client).await;
        assert_eq!(districts.len(), 2);
        assert_eq!(districts[1].id, "12");
        assert_eq!(districts[1].label, "Skåne län");
    }

    #[tokio::test]
    async fn test_fetch_districts_falls_back_to_static_table() {
        for reply in [Reply::status(503), Reply::json("[]"), Reply::json("not json")] {
            let client = ScriptedClient::new(vec![reply]);
            assert_eq!(fetch_districts(&client).await, static_districts());
        }
    }
}
