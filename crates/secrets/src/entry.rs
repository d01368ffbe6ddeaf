/// Fetched secret data
///
/// One KV v2 path's key/value pairs, immutable once fetched. The store's
/// encoding only distinguishes strings and numbers; anything else is
/// dropped at decode time.
use std::collections::BTreeMap;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum SecretValue {
    Text(String),
    Number(f64),
}

impl SecretValue {
    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => n.as_f64().map(Self::Number),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Number(_) => None,
        }
    }

    /// Numeric values may arrive as floats from the KV encoding.
    /// Truncate, never round: 5001.9 is port 5001.
    pub fn as_port(&self) -> Option<u16> {
        match self {
            Self::Number(n) if n.is_finite() && *n >= 1.0 && *n < 65_536.0 => {
                Some(n.trunc() as u16)
            }
            Self::Number(_) => None,
            Self::Text(s) => s.parse::<u16>().ok().filter(|p| *p > 0),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecretEntry {
    path: String,
    data: BTreeMap<String, SecretValue>,
}

impl SecretEntry {
    pub fn from_pairs(
        path: impl Into<String>,
        pairs: impl IntoIterator<Item = (String, SecretValue)>,
    ) -> Self {
        Self {
            path: path.into(),
            data: pairs.into_iter().collect(),
        }
    }

    pub(crate) fn from_kv_data(path: &str, raw: &serde_json::Map<String, Value>) -> Self {
        let data = raw
            .iter()
            .filter_map(|(k, v)| SecretValue::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        Self {
            path: path.to_string(),
            data,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn get(&self, key: &str) -> Option<&SecretValue> {
        self.data.get(key)
    }

    /// String value under `key`, with empty strings treated as absent.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(SecretValue::as_text)
            .filter(|s| !s.trim().is_empty())
    }

    /// Port value under `key`, truncated from the KV float encoding.
    pub fn port(&self, key: &str) -> Option<u16> {
        self.data.get(key).and_then(SecretValue::as_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn float_ports_truncate_instead_of_rounding() {
        assert_eq!(SecretValue::Number(5001.0).as_port(), Some(5001));
        assert_eq!(SecretValue::Number(5001.9).as_port(), Some(5001));
        assert_eq!(SecretValue::Number(0.5).as_port(), None);
    }

    #[test]
    fn out_of_range_ports_are_rejected() {
        assert_eq!(SecretValue::Number(0.0).as_port(), None);
        assert_eq!(SecretValue::Number(-1.0).as_port(), None);
        assert_eq!(SecretValue::Number(70_000.0).as_port(), None);
        assert_eq!(SecretValue::Number(f64::NAN).as_port(), None);
    }

    #[test]
    fn textual_ports_parse() {
        assert_eq!(SecretValue::Text("5002".into()).as_port(), Some(5002));
        assert_eq!(SecretValue::Text("0".into()).as_port(), None);
        assert_eq!(SecretValue::Text("not-a-port".into()).as_port(), None);
    }

    #[test]
    fn kv_decode_keeps_scalars_and_drops_the_rest() {
        let raw = json!({
            "uri": "mongodb://db:27017",
            "student": 5001.0,
            "nested": { "ignored": true },
            "flag": true,
        });
        let entry = SecretEntry::from_kv_data("mongodb", raw.as_object().unwrap());
        assert_eq!(entry.len(), 2);
        assert_eq!(entry.text("uri"), Some("mongodb://db:27017"));
        assert_eq!(entry.port("student"), Some(5001));
        assert!(entry.get("nested").is_none());
    }

    #[test]
    fn empty_text_is_treated_as_absent() {
        let entry = SecretEntry::from_pairs(
            "mongodb",
            [("uri".to_string(), SecretValue::Text("  ".into()))],
        );
        assert_eq!(entry.text("uri"), None);
    }
}
