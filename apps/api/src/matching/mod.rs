// Candidate–Job Matching Engine
// Implements: profile normalization, requirement extraction, fitness scoring,
// relevance predicate construction, and grouped relevance.

pub mod fitness;
pub mod grouped;
pub mod handlers;
pub mod predicate;
pub mod profile;
pub mod relevance;
pub mod requirements;
