//! Literature reference data for pediatric cohorts and drug price inflation

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Representative patient and cohort size for one age group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeGroupReference {
    pub age_group: String,
    /// Expected number of enrolled patients in this age group
    pub patients: u32,
    pub weight_kg: f64,
    pub bsa_m2: f64,
}

impl AgeGroupReference {
    pub fn new(age_group: impl Into<String>, patients: u32, weight_kg: f64, bsa_m2: f64) -> Self {
        Self {
            age_group: age_group.into(),
            patients,
            weight_kg,
            bsa_m2,
        }
    }
}

/// Table of [`AgeGroupReference`]s, matched on age-group label
///
/// Matching ignores letter case and collapses runs of whitespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CohortReference {
    groups: Vec<AgeGroupReference>,
}

impl CohortReference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rhabdomyosarcoma enrollment reference
    ///
    /// Holds two alternative partitions of the same 135-patient enrollment:
    /// split at 6 months (5 + 130) and split at 1 and 3 years (11 + 30 + 94).
    pub fn pediatric() -> Self {
        Self::new()
            .with_group(AgeGroupReference::new("Less than 6 months", 5, 6.0, 0.32))
            .with_group(AgeGroupReference::new("6 months or greater", 130, 28.0, 0.98))
            .with_group(AgeGroupReference::new("Less than 1 year", 11, 8.0, 0.40))
            .with_group(AgeGroupReference::new(
                "1 year to Less than 3 years",
                30,
                12.5,
                0.55,
            ))
            .with_group(AgeGroupReference::new("3 years or greater", 94, 35.0, 1.15))
    }

    /// Add a group; a later entry for the same label replaces the earlier one
    pub fn with_group(mut self, group: AgeGroupReference) -> Self {
        let key = age_key(&group.age_group);
        self.groups.retain(|g| age_key(&g.age_group) != key);
        self.groups.push(group);
        self
    }

    pub fn lookup(&self, age_group: &str) -> Option<&AgeGroupReference> {
        let key = age_key(age_group);
        if key.is_empty() {
            return None;
        }
        self.groups.iter().find(|g| age_key(&g.age_group) == key)
    }

    pub fn groups(&self) -> &[AgeGroupReference] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

fn age_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Annual price inflation for common rhabdomyosarcoma agents
///
/// Suitable for [`crate::budget::TrialParameters::with_drug_rates`].
pub fn default_drug_inflation() -> HashMap<String, f64> {
    [
        ("Vincristine", 0.04),
        ("Dactinomycin", 0.065),
        ("Cyclophosphamide", 0.03),
        ("Irinotecan", 0.035),
    ]
    .into_iter()
    .map(|(drug, rate)| (drug.to_string(), rate))
    .collect()
}
