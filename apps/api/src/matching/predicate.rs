//! Backend-neutral relevance predicate.
//!
//! The relevance builder produces a `Predicate` tree; posting stores compile it to whatever
//! their backend speaks. Constructors fold identity elements so the tree stays minimal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// How hard filters combine with the base relevance match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl std::str::FromStr for Combinator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Combinator::And),
            "OR" => Ok(Combinator::Or),
            other => Err(AppError::InvalidInput(format!(
                "combine_with must be AND or OR, got '{other}'"
            ))),
        }
    }
}

/// Which salary figure a salary filter is checked against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalarySource {
    /// The posting's own amount column.
    #[default]
    Base,
    /// The per-currency converted amounts.
    Converted,
}

impl std::str::FromStr for SalarySource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(SalarySource::Base),
            "converted" => Ok(SalarySource::Converted),
            other => Err(AppError::InvalidInput(format!(
                "salary source must be 'base' or 'converted', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub source: SalarySource,
}

impl SalaryFilter {
    /// Rejects negative, non-finite or inverted bounds, and bounded converted lookups without
    /// a currency. A filter with no bounds filters nothing, so its source is not checked.
    pub fn validate(&self) -> Result<(), AppError> {
        for (label, bound) in [("min", self.min), ("max", self.max)] {
            if let Some(v) = bound {
                if !v.is_finite() || v < 0.0 {
                    return Err(AppError::InvalidInput(format!(
                        "salary {label} must be a non-negative number, got {v}"
                    )));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(AppError::InvalidInput(format!(
                    "salary min ({min}) must not exceed salary max ({max})"
                )));
            }
        }
        if self.has_bounds()
            && self.source == SalarySource::Converted
            && self.currency().is_none()
        {
            return Err(AppError::InvalidInput(
                "salary source 'converted' requires a currency".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_bounds(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Upper-cased currency code, if one was given.
    pub fn currency(&self) -> Option<String> {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_ascii_uppercase)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    Never,
    /// Posting has a canonical-title association in the set.
    TitleIdsAny(Vec<Uuid>),
    /// Posting skills share at least one lower-cased tag with the set.
    SkillsOverlap(Vec<String>),
    EducationOverlap(Vec<String>),
    /// Posting country contains any needle, case-insensitively.
    CountryContains(Vec<String>),
    Salary(SalaryFilter),
    Any(Vec<Predicate>),
    All(Vec<Predicate>),
}

impl Predicate {
    pub fn any(children: Vec<Predicate>) -> Predicate {
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Predicate::Always => return Predicate::Always,
                Predicate::Never => {}
                Predicate::Any(inner) => kept.extend(inner),
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Predicate::Never,
            1 => kept.remove(0),
            _ => Predicate::Any(kept),
        }
    }

    pub fn all(children: Vec<Predicate>) -> Predicate {
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Predicate::Never => return Predicate::Never,
                Predicate::Always => {}
                Predicate::All(inner) => kept.extend(inner),
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Predicate::Always,
            1 => kept.remove(0),
            _ => Predicate::All(kept),
        }
    }

    pub fn combine(self, other: Predicate, with: Combinator) -> Predicate {
        match with {
            Combinator::And => Predicate::all(vec![self, other]),
            Combinator::Or => Predicate::any(vec![self, other]),
        }
    }
}
