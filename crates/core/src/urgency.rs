//! Urgency classification.
//!
//! Staff pick the urgency level directly from a fixed four-level scale. Classification
//! therefore validates the supplied level and derives its target response time and worklist
//! priority by lookup. It has no side effects and holds no state.

use crate::{TriageError, TriageResult};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Four ordered urgency levels. `Critical` is the most urgent and sorts first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Critical,
    Urgent,
    LessUrgent,
    NotUrgent,
}

impl UrgencyLevel {
    pub const ALL: [UrgencyLevel; 4] = [
        UrgencyLevel::Critical,
        UrgencyLevel::Urgent,
        UrgencyLevel::LessUrgent,
        UrgencyLevel::NotUrgent,
    ];

    /// Maximum time before the patient must be seen. `Critical` is zero (immediate).
    pub fn target_response(self) -> Duration {
        match self {
            UrgencyLevel::Critical => Duration::zero(),
            UrgencyLevel::Urgent => Duration::minutes(10),
            UrgencyLevel::LessUrgent => Duration::minutes(60),
            UrgencyLevel::NotUrgent => Duration::hours(3),
        }
    }

    /// Worklist ordering key; lower values are shown first.
    pub fn display_priority(self) -> u8 {
        match self {
            UrgencyLevel::Critical => 1,
            UrgencyLevel::Urgent => 2,
            UrgencyLevel::LessUrgent => 3,
            UrgencyLevel::NotUrgent => 4,
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            UrgencyLevel::Critical => "critical",
            UrgencyLevel::Urgent => "urgent",
            UrgencyLevel::LessUrgent => "less_urgent",
            UrgencyLevel::NotUrgent => "not_urgent",
        }
    }

    /// Label shown to clinical staff.
    pub fn label(self) -> &'static str {
        match self {
            UrgencyLevel::Critical => "Crítico",
            UrgencyLevel::Urgent => "Urgente",
            UrgencyLevel::LessUrgent => "Menos Urgente",
            UrgencyLevel::NotUrgent => "No Urgente",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for UrgencyLevel {
    type Err = TriageError;

    /// Accepts slugs, staff labels and numeric levels 1-4, ignoring case and surrounding
    /// whitespace.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalised = raw.trim().to_lowercase().replace(['-', ' '], "_");
        let level = match normalised.as_str() {
            "critical" | "crítico" | "critico" | "1" => UrgencyLevel::Critical,
            "urgent" | "urgente" | "2" => UrgencyLevel::Urgent,
            "less_urgent" | "menos_urgente" | "3" => UrgencyLevel::LessUrgent,
            "not_urgent" | "no_urgente" | "4" => UrgencyLevel::NotUrgent,
            _ => return Err(TriageError::InvalidUrgencyLevel(raw.to_string())),
        };
        Ok(level)
    }
}

/// Outcome of classifying an admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub level: UrgencyLevel,
    pub target_response: Duration,
    pub display_priority: u8,
}

impl From<UrgencyLevel> for Classification {
    fn from(level: UrgencyLevel) -> Self {
        Self {
            level,
            target_response: level.target_response(),
            display_priority: level.display_priority(),
        }
    }
}

/// Validates staff-selected urgency levels.
#[derive(Clone, Copy, Debug, Default)]
pub struct UrgencyClassifier;

impl UrgencyClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Validate `raw` against the four-level scale and derive its targets.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidUrgencyLevel`] if `raw` is not a recognised level.
    pub fn classify(&self, raw: &str) -> TriageResult<Classification> {
        raw.parse::<UrgencyLevel>().map(Classification::from)
    }
}
