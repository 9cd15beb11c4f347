#![deny(warnings)]

//! Heuristic plausibility checks for business plans.
//!
//! Nothing here is learned: every check is a deterministic lookup against
//! static regional tables (prices, salaries, rents) scaled by the resolved
//! location, the business type and the size category. The pieces are:
//! - [`location`]: free-text location to zone and price multiplier
//! - [`tables`]: reference price bands and multipliers
//! - [`dishes`]: dish recipes for suggestion and ingredient consistency rules
//! - [`heuristics`]: per-step findings with suggested replacement values
//! - [`autofill`]: context-scaled default values for whole steps
//! - [`advisories`]: plan-level alerts for the analysis step

pub mod advisories;
pub mod autofill;
pub mod dishes;
pub mod heuristics;
pub mod location;
pub mod tables;

pub use dishes::{check_consistency, suggest, Consistency, DishSuggestion, SuggestionConfidence};
pub use heuristics::{analyze_step, BusinessContext, Finding, HeuristicReport, IssueKind};
pub use location::{resolve, Confidence, LocationMatch};

/// Lower-case, trim and fold Spanish diacritics so that "Cumbayá" and
/// "cumbaya" compare equal.
///
/// Example:
/// assert_eq!(normalize("  Limón ÑAME "), "limon name");
pub fn normalize(text: &str) -> String {
    text.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
