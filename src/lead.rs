//! # Lead Record
//!
//! Canonical lead schema shared by the loader, the engine and the API.
//!
//! - One `Level` vocabulary: `High`, `Medium`, `Low`. Input also accepts the
//!   legacy short codes `A`/`B`/`C` (case-insensitive); unknown or absent
//!   values collapse to the lowest tier. Output always serializes full words.
//! - Every other field tolerates absence and explicit `null` alike: strings
//!   deserialize empty, `score` deserializes to 0. One null field never
//!   rejects the record, let alone the payload around it.
//! - Includes the built-in `sample_leads()` used as the loader's terminal
//!   fallback.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Qualification tier. Legacy short codes map on input:
/// A → High, B → Medium, C → Low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Level {
    High,
    Medium,
    #[default]
    Low,
}

impl Level {
    /// Tolerant parse: full words and legacy short codes, any case.
    /// Anything else is the lowest tier.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" | "A" => Level::High,
            "MEDIUM" | "B" => Level::Medium,
            "LOW" | "C" => Level::Low,
            _ => Level::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::High => "High",
            Level::Medium => "Medium",
            Level::Low => "Low",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // null behaves like an unknown string: lowest tier.
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Level::parse).unwrap_or_default())
    }
}

/// `null` behaves like an absent field: take the column's default.
fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A prospected business and its qualification outcome. Read-only once
/// loaded; a reload replaces the whole collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lead {
    #[serde(deserialize_with = "null_to_default")]
    pub name: String,
    #[serde(deserialize_with = "null_to_default")]
    pub phone: String,
    #[serde(deserialize_with = "null_to_default")]
    pub website: String,
    #[serde(deserialize_with = "null_to_default")]
    pub address: String,
    #[serde(deserialize_with = "null_to_default")]
    pub score: f64,
    #[serde(deserialize_with = "null_to_default")]
    pub qualified: bool,
    pub level: Level,
    #[serde(deserialize_with = "null_to_default")]
    pub criteria_met: Vec<String>,
    #[serde(deserialize_with = "null_to_default")]
    pub source: String,
    #[serde(deserialize_with = "null_to_default")]
    pub collected_at: String,
}

/// Built-in records used when every other source fails. Fixed at 3 entries
/// so the dashboard always has something to render.
pub fn sample_leads() -> Vec<Lead> {
    vec![
        Lead {
            name: "Sunrise Market".to_string(),
            phone: "(11) 99999-9999".to_string(),
            website: "https://sunrisemarket.example.com".to_string(),
            address: "123 Main Street, Springfield".to_string(),
            score: 5.5,
            qualified: true,
            level: Level::High,
            source: "Google Places".to_string(),
            ..Lead::default()
        },
        Lead {
            name: "Golden Crust Bakery".to_string(),
            phone: "(11) 88888-8888".to_string(),
            website: "https://goldencrust.example.com".to_string(),
            address: "456 Central Avenue, Springfield".to_string(),
            score: 4.2,
            qualified: true,
            level: Level::Medium,
            source: "Instagram".to_string(),
            ..Lead::default()
        },
        Lead {
            name: "Peak Fitness Studio".to_string(),
            phone: "(11) 77777-7777".to_string(),
            website: "https://peakfitness.example.com".to_string(),
            address: "789 Health Road, Springfield".to_string(),
            score: 3.8,
            qualified: false,
            level: Level::Low,
            source: "Google Places".to_string(),
            ..Lead::default()
        },
    ]
}
