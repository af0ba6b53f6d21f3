//! Message category catalogue and allow-list matching.
//!
//! Message-tier items are only kept when their event matches one of the
//! selected categories. Matching happens on normalized tokens: Unicode
//! compatibility decomposition, combining marks dropped, upper-cased, and
//! everything but letters and digits removed. `"Åska"` and `"ASKA"` are the
//! same token.

use std::collections::HashSet;

use serde::Serialize;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::feed::EventDescriptor;

/// A selectable message category.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MessageCategory {
    pub value: &'static str,
    pub label_sv: &'static str,
    pub label_en: &'static str,
    pub aliases: &'static [&'static str],
}

pub static MESSAGE_EVENT_CATEGORIES: &[MessageCategory] = &[
    MessageCategory {
        value: "FIRE_RISK",
        label_sv: "Brandrisk",
        label_en: "Fire risk",
        aliases: &["FIRE", "GRASS_FIRE_RISK", "Risk för gräsbrand", "Grass fire risk"],
    },
    MessageCategory {
        value: "HIGH_TEMPERATURE",
        label_sv: "Höga temperaturer",
        label_en: "High temperatures",
        aliases: &["HEAT", "Värmebölja", "Heat wave"],
    },
    MessageCategory {
        value: "THUNDERSTORM",
        label_sv: "Åska",
        label_en: "Thunderstorm",
        aliases: &["THUNDER", "Kraftiga åskskurar", "Severe thunderstorms"],
    },
    MessageCategory {
        value: "RAIN",
        label_sv: "Regn",
        label_en: "Rain",
        aliases: &["HEAVY_RAIN", "Skyfall", "Cloudburst"],
    },
    MessageCategory {
        value: "SNOW",
        label_sv: "Snö",
        label_en: "Snow",
        aliases: &["SNOWFALL", "SNOWDRIFT", "Snödrev", "Snow drift"],
    },
    MessageCategory {
        value: "WIND",
        label_sv: "Vind",
        label_en: "Wind",
        aliases: &["STORM", "GALE", "Storm", "Kuling"],
    },
    MessageCategory {
        value: "HIGH_FLOW",
        label_sv: "Höga flöden",
        label_en: "High flows",
        aliases: &["FLOOD", "Översvämning", "Flooding"],
    },
    MessageCategory {
        value: "WATER_SHORTAGE",
        label_sv: "Risk för vattenbrist",
        label_en: "Risk of water shortage",
        aliases: &["LOW_FLOW", "DROUGHT", "Torka", "Drought"],
    },
    MessageCategory {
        value: "SEA_LEVEL",
        label_sv: "Havsvattenstånd",
        label_en: "Sea level",
        aliases: &["HIGH_SEA_LEVEL", "LOW_SEA_LEVEL", "Högt vattenstånd", "Lågt vattenstånd"],
    },
    MessageCategory {
        value: "ICE_ACCRETION",
        label_sv: "Isbildning",
        label_en: "Ice accretion",
        aliases: &["ICING", "Nedisning", "Icing"],
    },
];

pub fn default_message_types() -> Vec<String> {
    MESSAGE_EVENT_CATEGORIES
        .iter()
        .map(|c| c.value.to_string())
        .collect()
}

pub fn find_category(code: &str) -> Option<&'static MessageCategory> {
    let wanted = normalize(code);
    MESSAGE_EVENT_CATEGORIES
        .iter()
        .find(|c| normalize(c.value) == wanted)
}

/// Reduces `raw` to its comparable token form.
pub fn normalize(raw: &str) -> String {
    raw.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_uppercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Normalized tokens of the selected categories.
///
/// Rebuilt from scratch whenever the selection changes. An empty allow-list
/// matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    tokens: HashSet<String>,
}

impl AllowList {
    pub fn from_selection<S: AsRef<str>>(selection: &[S]) -> Self {
        let mut tokens = HashSet::new();

        for code in selection {
            let code = code.as_ref();
            match find_category(code) {
                Some(category) => {
                    tokens.insert(normalize(category.value));
                    tokens.insert(normalize(category.label_sv));
                    tokens.insert(normalize(category.label_en));
                    tokens.extend(category.aliases.iter().map(|a| normalize(a)));
                }
                None => {
                    tokens.insert(normalize(code));
                }
            }
        }

        tokens.remove("");
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True iff any candidate token of `event` is in the allow-list.
    pub fn is_allowed(&self, event: &EventDescriptor) -> bool {
        if self.tokens.is_empty() {
            return false;
        }
        candidate_tokens(event).any(|token| self.tokens.contains(&token))
    }
}

fn candidate_tokens(event: &EventDescriptor) -> impl Iterator<Item = String> + '_ {
    [
        event.code.as_deref(),
        event.sv.as_deref(),
        event.en.as_deref(),
        event.classification_code(),
    ]
    .into_iter()
    .flatten()
    .map(normalize)
    .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(code: &str, sv: &str, en: &str) -> EventDescriptor {
        EventDescriptor {
            code: Some(code.to_string()),
            sv: Some(sv.to_string()),
            en: Some(en.to_string()),
            mho_classification: None,
        }
    }

    #[test]
    fn test_normalize_strips_diacritics_and_punctuation() {
        assert_eq!(normalize("Åska"), "ASKA");
        assert_eq!(normalize("ASKA"), "ASKA");
        assert_eq!(normalize("fire_risk"), "FIRERISK");
        assert_eq!(normalize("Höga flöden!"), "HOGAFLODEN");
        assert_eq!(normalize("  "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["Åska", "Risk för gräsbrand", "HIGH_SEA_LEVEL", "ﬁre", "Ölands södra udde", ""] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_empty_allow_list_matches_nothing() {
        let allow = AllowList::from_selection::<String>(&[]);
        assert!(allow.is_empty());
        assert!(!allow.is_allowed(&event("FIRE_RISK", "Brandrisk", "Fire risk")));
    }

    #[test]
    fn test_matches_by_code_label_or_alias() {
        let allow = AllowList::from_selection(&["THUNDERSTORM"]);

        assert!(allow.is_allowed(&event("THUNDERSTORM", "", "")));
        assert!(allow.is_allowed(&event("X", "åska", "")));
        assert!(allow.is_allowed(&event("X", "", "Severe thunderstorms")));
        assert!(!allow.is_allowed(&event("FIRE_RISK", "Brandrisk", "Fire risk")));
    }

    #[test]
    fn test_matches_classification_code() {
        let allow = AllowList::from_selection(&["HYDROLOGICAL"]);
        let hydro = EventDescriptor {
            code: Some("SOMETHING".to_string()),
            sv: None,
            en: None,
            mho_classification: Some(crate::feed::LocalizedText {
                code: Some("hydrological".to_string()),
                sv: None,
                en: None,
            }),
        };
        assert!(allow.is_allowed(&hydro));
    }

    #[test]
    fn test_unknown_selection_code_is_kept_verbatim() {
        let allow = AllowList::from_selection(&["Pollen"]);
        assert_eq!(allow.len(), 1);
        assert!(allow.is_allowed(&event("POLLEN", "", "")));
    }

    #[test]
    fn test_every_default_category_resolves() {
        for code in default_message_types() {
            assert!(find_category(&code).is_some(), "{code} not found");
        }
    }
}
