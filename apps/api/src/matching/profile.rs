//! Profile Normalizer: flattens a candidate-authored profile blob into a `CandidateProfile`.
//!
//! The blob is untrusted JSON. Every array element is read as either a plain string or a
//! loose record (a JSON object); anything else is skipped. Extraction never fails.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat candidate attributes used for scoring and tag matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub skills: Vec<String>,
    pub education: Vec<String>,
    pub experience_years: f64,
}

/// One element of a profile array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProfileEntry {
    Text(String),
    Record(EntryRecord),
    Other(IgnoredAny),
}

/// Every field is kept as raw JSON so that a wrongly-typed field never rejects the record.
#[derive(Debug, Default, Deserialize)]
struct EntryRecord {
    title: Option<Value>,
    degree: Option<Value>,
    name: Option<Value>,
    years: Option<Value>,
    duration_months: Option<Value>,
}

impl EntryRecord {
    /// First non-empty string among the given fields, in order.
    fn label(&self, fields: &[Option<&Value>]) -> Option<String> {
        fields
            .iter()
            .flatten()
            .find_map(|v| v.as_str().and_then(clean))
    }

    fn years(&self) -> f64 {
        if let Some(months) = self.duration_months.as_ref().and_then(Value::as_f64) {
            return months / 12.0;
        }
        self.years.as_ref().and_then(Value::as_f64).unwrap_or(0.0)
    }
}

fn clean(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn entries(blob: &Value, field: &str) -> Vec<ProfileEntry> {
    match blob.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            // serde would also fill a record positionally from an array
            .filter(|item| item.is_string() || item.is_object())
            .filter_map(|item| ProfileEntry::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Builds a `CandidateProfile` from a raw profile blob. `None` yields the empty profile.
pub fn normalize_profile(blob: Option<&Value>) -> CandidateProfile {
    let Some(blob) = blob else {
        return CandidateProfile::default();
    };

    let skill_entries = entries(blob, "skills");
    let skills = skill_entries
        .iter()
        .filter_map(|entry| match entry {
            ProfileEntry::Text(s) => clean(s),
            ProfileEntry::Record(r) => r.label(&[r.title.as_ref()]),
            ProfileEntry::Other(_) => None,
        })
        .collect();

    let education = entries(blob, "education")
        .iter()
        .filter_map(|entry| match entry {
            ProfileEntry::Text(s) => clean(s),
            ProfileEntry::Record(r) => {
                r.label(&[r.degree.as_ref(), r.title.as_ref(), r.name.as_ref()])
            }
            ProfileEntry::Other(_) => None,
        })
        .collect();

    // Skills and experience both carry durations and both count.
    let experience_years: f64 = skill_entries
        .iter()
        .chain(entries(blob, "experience").iter())
        .map(|entry| match entry {
            ProfileEntry::Record(r) => r.years(),
            _ => 0.0,
        })
        .sum();

    CandidateProfile {
        skills,
        education,
        experience_years: experience_years.max(0.0),
    }
}

/// Reads the deprecated `preferred_titles` field some older profiles still carry.
pub fn legacy_preferred_titles(blob: Option<&Value>) -> Vec<String> {
    let Some(blob) = blob else {
        return Vec::new();
    };
    entries(blob, "preferred_titles")
        .iter()
        .filter_map(|entry| match entry {
            ProfileEntry::Text(s) => clean(s),
            ProfileEntry::Record(r) => r.label(&[r.title.as_ref(), r.name.as_ref()]),
            ProfileEntry::Other(_) => None,
        })
        .collect()
}
