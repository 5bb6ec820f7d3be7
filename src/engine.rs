//! # Filter/Aggregation Engine
//! Pure, testable logic that maps `(collection, criteria)` → filtered rows
//! and summary statistics. No I/O, suitable for unit tests and reuse by
//! every endpoint.
//!
//! Policy: summary numbers always describe the FULL collection; filtering
//! produces a pure projection that preserves input order. Rendering
//! placeholders ("N/A") are a presentation concern and stay out of here.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::lead::{Lead, Level};

/// Chart ceiling for the score axis. Clamping applies to the axis value
/// only, never to the underlying record.
pub const SCORE_AXIS_MAX: f64 = 6.0;

/// Chart labels keep at most this many name chars before the `...` suffix.
const LABEL_MAX_CHARS: usize = 15;

/// Filter criteria. Every field is optional; an absent criterion matches
/// everything, and present criteria combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    /// Exact tier match.
    pub level: Option<Level>,
    /// Inclusive minimum score.
    pub min_score: Option<f64>,
    /// Exact provenance tag match.
    pub source: Option<String>,
    /// Case-insensitive substring over name OR phone OR address.
    pub query: Option<String>,
}

impl Criteria {
    /// Build criteria from raw request input. Empty or whitespace-only
    /// strings mean "no restriction", same as the absent case.
    pub fn from_raw(
        level: Option<String>,
        min_score: Option<f64>,
        source: Option<String>,
        query: Option<String>,
    ) -> Self {
        Self {
            level: non_empty(level).map(|s| Level::parse(&s)),
            min_score,
            source: non_empty(source),
            query: non_empty(query),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.level.is_none()
            && self.min_score.is_none()
            && self.source.is_none()
            && self.query.is_none()
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// True when `lead` satisfies every present criterion.
pub fn matches(lead: &Lead, criteria: &Criteria) -> bool {
    // 1) Tier equality
    if let Some(level) = criteria.level {
        if lead.level != level {
            return false;
        }
    }

    // 2) Inclusive minimum score
    if let Some(min) = criteria.min_score {
        if lead.score < min {
            return false;
        }
    }

    // 3) Exact source match
    if let Some(source) = &criteria.source {
        if lead.source != *source {
            return false;
        }
    }

    // 4) Substring over name OR phone OR address, case-insensitive
    if let Some(query) = &criteria.query {
        let q = query.to_lowercase();
        let hit = lead.name.to_lowercase().contains(&q)
            || lead.phone.to_lowercase().contains(&q)
            || lead.address.to_lowercase().contains(&q);
        if !hit {
            return false;
        }
    }

    true
}

/// Project the filtered rows, preserving the collection's relative order.
/// Applying the same criteria twice yields the same rows as once.
pub fn apply(leads: &[Lead], criteria: &Criteria) -> Vec<Lead> {
    leads
        .iter()
        .filter(|lead| matches(lead, criteria))
        .cloned()
        .collect()
}

/// Count per tier over the full collection; tiers nobody holds stay 0.
/// Field order is the display order: highest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Summary statistics over the FULL collection. Filtering never changes
/// these numbers; the dashboard cards always describe everything loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub qualified_count: usize,
    /// Arithmetic mean of `score`, one decimal, 0 when empty.
    pub average_score: f64,
    /// `qualified_count / total * 100`, one decimal, 0 when empty.
    pub qualification_rate: f64,
    pub level_distribution: LevelDistribution,
    /// Count per raw provenance tag. Keys are not normalized.
    pub source_distribution: BTreeMap<String, usize>,
}

impl Summary {
    pub fn compute(leads: &[Lead]) -> Self {
        let total = leads.len();
        let qualified_count = leads.iter().filter(|l| l.qualified).count();

        // Empty collection: averages and rates are defined as exactly 0.
        let (average_score, qualification_rate) = if total == 0 {
            (0.0, 0.0)
        } else {
            let sum: f64 = leads.iter().map(|l| l.score).sum();
            (
                round1(sum / total as f64),
                round1(qualified_count as f64 / total as f64 * 100.0),
            )
        };

        let mut level_distribution = LevelDistribution::default();
        let mut source_distribution = BTreeMap::new();
        for lead in leads {
            match lead.level {
                Level::High => level_distribution.high += 1,
                Level::Medium => level_distribution.medium += 1,
                Level::Low => level_distribution.low += 1,
            }
            *source_distribution.entry(lead.source.clone()).or_insert(0) += 1;
        }

        Self {
            total,
            qualified_count,
            average_score,
            qualification_rate,
            level_distribution,
            source_distribution,
        }
    }
}

/// One point of the top-N chart projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorePoint {
    /// Lead name cut to 15 chars, always suffixed with `...`.
    pub label: String,
    /// Raw score, unclamped.
    pub score: f64,
    /// Score clamped into `[0, SCORE_AXIS_MAX]` for axis scaling.
    pub axis_score: f64,
}

/// The `n` highest-scoring leads in descending score order. The sort is
/// stable: equal scores keep their original relative order.
pub fn top_by_score(leads: &[Lead], n: usize) -> Vec<ScorePoint> {
    let mut ranked: Vec<&Lead> = leads.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
        .into_iter()
        .take(n)
        .map(|lead| ScorePoint {
            label: truncate_label(&lead.name),
            score: lead.score,
            axis_score: lead.score.clamp(0.0, SCORE_AXIS_MAX),
        })
        .collect()
}

/// Char-based cut so multibyte names don't split. The `...` suffix is
/// unconditional, short names included.
fn truncate_label(name: &str) -> String {
    let mut out: String = name.chars().take(LABEL_MAX_CHARS).collect();
    out.push_str("...");
    out
}

/// Round half away from zero to one decimal place.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
