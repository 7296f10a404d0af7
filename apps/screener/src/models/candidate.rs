use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable per-run identifier for one ingested document.
///
/// Assigned exactly once at ingestion and used as the join key by every later stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(Uuid);

impl CandidateId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for CandidateId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An input document as handed over by ingestion. Immutable after creation.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub id: CandidateId,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            id: CandidateId::new(),
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Plain text recovered from a `RawDocument`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub id: CandidateId,
    pub file_name: String,
    pub text: String,
}

/// Structured candidate fields extracted from CV text.
///
/// Every field is optional: `None` means the extractor did not find it. Empty strings
/// coming back from the model are normalised to `None` so they never pass for real data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub languages: Option<Vec<String>>,
    pub programming_languages: Option<Vec<String>>,
    pub frameworks: Option<Vec<String>>,
    pub years_experience: Option<u32>,
    pub education: Option<String>,
    pub summary: Option<String>,
}

impl StructuredProfile {
    /// Builds a profile from loosely-typed extraction output.
    ///
    /// Lists may arrive as arrays, as a single string, or as an object keyed by item;
    /// years of experience may arrive as a number or as text such as "5+ years".
    pub fn from_extraction(value: &Value) -> Self {
        Self {
            name: text_field(value, "name"),
            email: text_field(value, "email"),
            phone: text_field(value, "phone"),
            languages: list_field(value, "languages"),
            programming_languages: list_field(value, "programming_languages"),
            frameworks: list_field(value, "frameworks"),
            years_experience: years_field(value, "years_experience"),
            education: text_field(value, "education"),
            summary: text_field(value, "summary"),
        }
    }

    /// True when extraction produced no usable field at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Display name, or a marker when the name was not extracted.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(name unknown)")
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => {
            let joined: Vec<String> = items.iter().filter_map(scalar_text).collect();
            non_blank(&joined.join(", "))
        }
        _ => None,
    }
}

fn list_field(value: &Value, key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = match value.get(key)? {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        Value::Object(map) => map.keys().filter_map(|k| non_blank(k)).collect(),
        Value::String(s) => s.split(',').filter_map(non_blank).collect(),
        _ => return None,
    };
    Some(items)
}

fn years_field(value: &Value, key: &str) -> Option<u32> {
    match value.get(key)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.floor() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => first_integer(s),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map
            .get("name")
            .and_then(|v| v.as_str())
            .and_then(non_blank),
        _ => None,
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// First run of ASCII digits in `s`, e.g. "about 7 years" -> 7.
fn first_integer(s: &str) -> Option<u32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
