//! Requirement Extractor: reads the free-form tag fields of a posting.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::posting::JobPostingRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRequirement {
    pub min_years: Option<f64>,
    pub max_years: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequirements {
    pub skills: Vec<String>,
    pub education_requirements: Vec<String>,
    /// `None` unless at least one numeric bound is present.
    pub experience_requirements: Option<ExperienceRequirement>,
}

pub fn extract_requirements(posting: &JobPostingRow) -> JobRequirements {
    JobRequirements {
        skills: string_list(posting.skills.as_ref()),
        education_requirements: string_list(posting.education_requirements.as_ref()),
        experience_requirements: experience_bounds(posting.experience_requirements.as_ref()),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

fn experience_bounds(value: Option<&Value>) -> Option<ExperienceRequirement> {
    let obj = value?.as_object()?;
    let bounds = ExperienceRequirement {
        min_years: obj.get("min_years").and_then(Value::as_f64),
        max_years: obj.get("max_years").and_then(Value::as_f64),
    };
    (bounds.min_years.is_some() || bounds.max_years.is_some()).then_some(bounds)
}
