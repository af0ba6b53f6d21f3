//! JSON parser for the warning feed.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::feed::{AlertBulletin, json_kind};

/// Decodes the raw feed body into bulletins.
///
/// Bulletins that do not fit the model are skipped individually.
///
/// # Errors
///
/// Returns [`FetchError::InvalidResponse`] if the bytes are not JSON or the
/// top-level value is not an array (`null` is read as an empty feed).
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<AlertBulletin>, FetchError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| FetchError::InvalidResponse(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(FetchError::InvalidResponse(format!(
                "expected a JSON array, got {}",
                json_kind(&other)
            )));
        }
    };

    let total = items.len();
    let bulletins: Vec<AlertBulletin> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(bulletin) => Some(bulletin),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable bulletin");
                None
            }
        })
        .collect();

    debug!(total, decoded = bulletins.len(), "Feed decoded");
    Ok(bulletins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_array() {
        let feed = parse_feed(b"[]").unwrap();
        assert!(feed.is_empty());
    }

    #[test]
    fn test_parse_null_is_empty_feed() {
        let feed = parse_feed(b"null").unwrap();
        assert!(feed.is_empty());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        let result = parse_feed(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(FetchError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_object_is_rejected() {
        let result = parse_feed(br#"{"warnings": []}"#);
        assert!(matches!(result, Err(FetchError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_minimal_bulletin() {
        let body = r#"[{
            "id": 7,
            "event": {"code": "THUNDERSTORM", "sv": "Åska", "en": "Thunderstorm"},
            "warningAreas": [{
                "warningLevel": {"code": "YELLOW", "sv": "Gul varning", "en": "Yellow warning"},
                "affectedAreas": [{"id": 12, "sv": "Skåne län", "en": "Skåne County"}]
            }]
        }]"#;

        let feed = parse_feed(body.as_bytes()).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id.as_deref(), Some("7"));
        assert_eq!(feed[0].event.sv.as_deref(), Some("Åska"));
        assert_eq!(feed[0].event.code.as_deref(), Some("THUNDERSTORM"));
        assert_eq!(feed[0].warning_areas[0].affected_areas[0].id, "12");
    }

    #[test]
    fn test_parse_skips_non_object_bulletin() {
        let feed = parse_feed(br#"[42, {"event": {"code": "WIND"}}]"#).unwrap();
        assert_eq!(feed.len(), 1);
    }
}
