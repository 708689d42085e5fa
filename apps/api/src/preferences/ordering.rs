//! Priority bookkeeping for a candidate's preference set.
//!
//! Every mutation ends with `normalize`, which re-derives dense 1..N priorities from
//! `(priority ASC, updated_at DESC)`. Running it on an unchanged set repairs any drift.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::preference::CandidatePreferenceRow;
use crate::models::title::JobTitleRow;

/// Comparison key for preference titles.
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

pub fn normalize(rows: &mut [CandidatePreferenceRow]) {
    rows.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.priority = idx as i32 + 1;
    }
}

/// Moves an existing preference for `title` to the top, or appends a new one after the
/// current lowest priority.
pub fn upsert(
    rows: &mut Vec<CandidatePreferenceRow>,
    candidate_id: Uuid,
    title: &JobTitleRow,
    now: DateTime<Utc>,
) {
    let key = title_key(&title.title);
    if let Some(existing) = rows.iter_mut().find(|r| title_key(&r.title) == key) {
        // 0 sorts ahead of the current head; normalize turns it into 1
        existing.priority = 0;
        existing.job_title_id = Some(title.id);
        existing.updated_at = now;
    } else {
        let next = rows.iter().map(|r| r.priority).max().unwrap_or(0) + 1;
        rows.push(CandidatePreferenceRow {
            id: Uuid::new_v4(),
            candidate_id,
            title: title.title.clone(),
            priority: next,
            job_title_id: Some(title.id),
            created_at: now,
            updated_at: now,
        });
    }
    normalize(rows);
}

/// Drops the preference for `title` if present. Returns whether anything was removed.
pub fn remove(rows: &mut Vec<CandidatePreferenceRow>, title: &str) -> bool {
    let key = title_key(title);
    let before = rows.len();
    rows.retain(|r| title_key(&r.title) != key);
    normalize(rows);
    rows.len() != before
}

pub fn reorder_by_ids(rows: &mut [CandidatePreferenceRow], ordered: &[Uuid]) -> Result<(), AppError> {
    let current: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    check_permutation("preference ids", &current, ordered)?;
    let position: HashMap<Uuid, usize> = ordered.iter().enumerate().map(|(i, id)| (*id, i)).collect();
    apply_positions(rows, |r| position[&r.id]);
    Ok(())
}

pub fn reorder_by_titles(
    rows: &mut [CandidatePreferenceRow],
    ordered: &[String],
) -> Result<(), AppError> {
    let current: Vec<String> = rows.iter().map(|r| title_key(&r.title)).collect();
    let supplied: Vec<String> = ordered.iter().map(|t| title_key(t)).collect();
    check_permutation("preference titles", &current, &supplied)?;
    let position: HashMap<String, usize> =
        supplied.into_iter().enumerate().map(|(i, t)| (t, i)).collect();
    apply_positions(rows, |r| position[&title_key(&r.title)]);
    Ok(())
}

fn apply_positions<F>(rows: &mut [CandidatePreferenceRow], position: F)
where
    F: Fn(&CandidatePreferenceRow) -> usize,
{
    for row in rows.iter_mut() {
        row.priority = position(row) as i32 + 1;
    }
    rows.sort_by_key(|r| r.priority);
}

/// Fills missing `job_title_id`s from a lookup keyed by `title_key`. Returns how many were set.
pub fn assign_title_ids(
    rows: &mut [CandidatePreferenceRow],
    resolved: &HashMap<String, Uuid>,
    now: DateTime<Utc>,
) -> usize {
    let mut assigned = 0;
    for row in rows.iter_mut().filter(|r| r.job_title_id.is_none()) {
        if let Some(id) = resolved.get(&title_key(&row.title)) {
            row.job_title_id = Some(*id);
            row.updated_at = now;
            assigned += 1;
        }
    }
    assigned
}

/// `supplied` must contain every element of `current` exactly once and nothing else.
fn check_permutation<K>(what: &str, current: &[K], supplied: &[K]) -> Result<(), AppError>
where
    K: Eq + Hash + Clone + Display,
{
    let known: HashSet<&K> = current.iter().collect();
    let mut seen = HashSet::new();
    let mut duplicated = Vec::new();
    let mut unknown = Vec::new();
    for item in supplied {
        if !known.contains(item) {
            unknown.push(item.to_string());
        } else if !seen.insert(item) {
            duplicated.push(item.to_string());
        }
    }
    let missing: Vec<String> = current
        .iter()
        .filter(|k| !seen.contains(k))
        .map(|k| k.to_string())
        .collect();

    if missing.is_empty() && unknown.is_empty() && duplicated.is_empty() {
        return Ok(());
    }

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing [{}]", missing.join(", ")));
    }
    if !unknown.is_empty() {
        problems.push(format!("unknown [{}]", unknown.join(", ")));
    }
    if !duplicated.is_empty() {
        problems.push(format!("duplicated [{}]", duplicated.join(", ")));
    }
    Err(AppError::InvalidInput(format!(
        "{what} must be a permutation of the current set: {}",
        problems.join("; ")
    )))
}
