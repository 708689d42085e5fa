//! Fitness Scoring: measures a normalized candidate profile against a posting's requirements.
//!
//! Pure and deterministic. Each requirement dimension the posting actually declares
//! (skills, education, experience) contributes a coverage percentage; the final score is the
//! unweighted mean over the declared dimensions only.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::matching::profile::CandidateProfile;
use crate::matching::requirements::JobRequirements;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// Per-dimension percentages (0 – 100). Undeclared dimensions stay at 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skills_match: u32,
    pub education_match: u32,
    pub experience_match: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessScoreResult {
    pub score: u32, // 0 – 100
    pub breakdown: ScoreBreakdown,
    /// Posting-side spellings of the covered skills, in posting order.
    pub matched_skills: Vec<String>,
    pub matched_education: Vec<String>,
    pub experience_ok: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Core algorithm
// ────────────────────────────────────────────────────────────────────────────

/// Computes the fitness score of `candidate` for a posting with requirements `job`.
///
/// Algorithm:
/// 1. skills: |job skills covered by candidate| / |job skills| (case-insensitive)
/// 2. education: same rule over education requirements
/// 3. experience: 1.0 if the candidate's years fall inside the declared bounds, else 0.0
/// 4. score = round(mean of the declared dimensions × 100), 0 when nothing is declared
pub fn calculate_score(candidate: &CandidateProfile, job: &JobRequirements) -> FitnessScoreResult {
    let mut parts = 0u32;
    let mut sum_pct = 0.0_f64;
    let mut breakdown = ScoreBreakdown::default();

    let mut matched_skills = Vec::new();
    if !job.skills.is_empty() {
        matched_skills = covered(&candidate.skills, &job.skills);
        let pct = matched_skills.len() as f64 / job.skills.len() as f64;
        breakdown.skills_match = to_percent(pct);
        sum_pct += pct;
        parts += 1;
    }

    let mut matched_education = Vec::new();
    if !job.education_requirements.is_empty() {
        matched_education = covered(&candidate.education, &job.education_requirements);
        let pct = matched_education.len() as f64 / job.education_requirements.len() as f64;
        breakdown.education_match = to_percent(pct);
        sum_pct += pct;
        parts += 1;
    }

    let mut experience_ok = true;
    if let Some(bounds) = job.experience_requirements {
        if bounds.min_years.is_some() || bounds.max_years.is_some() {
            let years = candidate.experience_years;
            experience_ok = bounds.min_years.map_or(true, |min| years >= min)
                && bounds.max_years.map_or(true, |max| years <= max);
            let pct = if experience_ok { 1.0 } else { 0.0 };
            breakdown.experience_match = to_percent(pct);
            sum_pct += pct;
            parts += 1;
        }
    }

    let score = if parts > 0 {
        to_percent(sum_pct / parts as f64)
    } else {
        0
    };

    FitnessScoreResult {
        score,
        breakdown,
        matched_skills,
        matched_education,
        experience_ok,
    }
}

/// Requirement entries the candidate covers, compared lower-cased.
fn covered(candidate: &[String], required: &[String]) -> Vec<String> {
    let have: HashSet<String> = candidate.iter().map(|s| s.to_lowercase()).collect();
    required
        .iter()
        .filter(|r| have.contains(&r.to_lowercase()))
        .cloned()
        .collect()
}

/// Round-half-up of `fraction × 100`, clamped to 0 – 100.
fn to_percent(fraction: f64) -> u32 {
    (fraction * 100.0).round().clamp(0.0, 100.0) as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
