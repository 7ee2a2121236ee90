//! Budget types: trial parameters, calculation options and results
//!
//! This module defines the public types of the budget calculator:
//! - [`TrialParameters`]: inflation assumptions and projection horizons
//! - [`BudgetOptions`]: rounding, cost lookup and normalization behaviour
//! - [`CostBreakdown`]: the cost of one protocol row
//! - [`RowResult`] and [`BatchResult`]: batch output with per-row outcomes

use crate::budget::error::BudgetError;
use crate::budget::summary::{by_drug, DrugSummary};
use crate::data::structs::drug_key;
use crate::data::{CohortReference, CohortSizeSource, DrugCategory, DrugCostProfile};
use crate::data::{DrugProtocolRow, NormalizeOptions};
use crate::PharmBudgetError;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

// ============================================================================
// Configuration Types
// ============================================================================

/// Global assumptions for one budget run
///
/// The inflation rate applied to a drug is resolved in order: per-drug
/// override, per-category override, global `inflation_rate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialParameters {
    /// Annual compound inflation rate, in `[0, 1)` (default: 0.04)
    pub inflation_rate: f64,
    /// Projection horizons in years, each ≥ 1 (default: `[10, 5]`)
    ///
    /// The fixed 10-year figure plus the default 5-year trial run time.
    pub horizons: Vec<u32>,
    /// Per-drug inflation overrides, keyed by drug name
    ///
    /// Keys are trimmed and lowercased when deserialized; if two keys collide,
    /// the later one in the document wins.
    #[serde(deserialize_with = "deserialize_drug_rates")]
    pub drug_rates: HashMap<String, f64>,
    /// Per-category inflation overrides
    pub category_rates: HashMap<DrugCategory, f64>,
}

impl Default for TrialParameters {
    fn default() -> Self {
        Self {
            inflation_rate: 0.04,
            horizons: vec![10, 5],
            drug_rates: HashMap::new(),
            category_rates: HashMap::new(),
        }
    }
}

impl TrialParameters {
    pub fn new(inflation_rate: f64, horizons: Vec<u32>) -> Self {
        Self {
            inflation_rate,
            horizons,
            ..Default::default()
        }
    }

    /// Load parameters from JSON; missing keys take their defaults
    ///
    /// The loaded rates and horizons are validated.
    pub fn from_json(json: &str) -> Result<Self, PharmBudgetError> {
        let params: TrialParameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Set the trial run time, keeping the fixed 10-year horizon
    pub fn with_trial_years(mut self, years: u32) -> Self {
        self.horizons = vec![10, years];
        self.horizons.dedup();
        self
    }

    pub fn with_horizons(mut self, horizons: Vec<u32>) -> Self {
        self.horizons = horizons;
        self
    }

    pub fn with_drug_rate(mut self, drug_name: impl AsRef<str>, rate: f64) -> Self {
        self.drug_rates.insert(drug_key(drug_name.as_ref()), rate);
        self
    }

    pub fn with_drug_rates(mut self, rates: HashMap<String, f64>) -> Self {
        for (drug, rate) in rates {
            self.drug_rates.insert(drug_key(&drug), rate);
        }
        self
    }

    pub fn with_category_rate(mut self, category: DrugCategory, rate: f64) -> Self {
        self.category_rates.insert(category, rate);
        self
    }

    /// The inflation rate for a drug priced by `cost`
    ///
    /// Keys inserted into `drug_rates` by hand are matched case-insensitively
    /// as well; among several such keys the lexicographically smallest wins.
    pub fn rate_for(&self, drug_name: &str, cost: &DrugCostProfile) -> f64 {
        let key = drug_key(drug_name);
        self.drug_rates
            .get(&key)
            .copied()
            .or_else(|| {
                self.drug_rates
                    .iter()
                    .filter(|(drug, _)| drug_key(drug) == key)
                    .min_by(|(a, _), (b, _)| a.cmp(b))
                    .map(|(_, rate)| *rate)
            })
            .or_else(|| {
                cost.category
                    .and_then(|category| self.category_rates.get(&category).copied())
            })
            .unwrap_or(self.inflation_rate)
    }

    /// Check every rate and horizon
    pub fn validate(&self) -> Result<(), BudgetError> {
        validate_rate(self.inflation_rate)?;
        for rate in self.drug_rates.values().chain(self.category_rates.values()) {
            validate_rate(*rate)?;
        }
        validate_horizons(&self.horizons)
    }
}

/// Read per-drug rates in document order, keyed by normalized drug name
fn deserialize_drug_rates<'de, D>(deserializer: D) -> Result<HashMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    struct DrugRatesVisitor;

    impl<'de> Visitor<'de> for DrugRatesVisitor {
        type Value = HashMap<String, f64>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of drug names to inflation rates")
        }

        fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
        where
            M: MapAccess<'de>,
        {
            let mut rates = HashMap::new();
            while let Some((drug, rate)) = map.next_entry::<String, f64>()? {
                rates.insert(drug_key(&drug), rate);
            }
            Ok(rates)
        }
    }

    deserializer.deserialize_map(DrugRatesVisitor)
}

/// A rate must be finite and in `[0, 1)`
pub(crate) fn validate_rate(rate: f64) -> Result<(), BudgetError> {
    if rate.is_finite() && (0.0..1.0).contains(&rate) {
        Ok(())
    } else {
        Err(BudgetError::invalid("inflation_rate", rate))
    }
}

pub(crate) fn validate_horizons(horizons: &[u32]) -> Result<(), BudgetError> {
    match horizons.iter().find(|&&years| years == 0) {
        Some(years) => Err(BudgetError::invalid("horizon", years)),
        None => Ok(()),
    }
}

/// How the calculated dose is rounded before the vial ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DoseRounding {
    /// Round half away from zero (`0.0625 → 0.063` at 3 decimals)
    #[default]
    HalfAwayFromZero,
    /// Round half to even (`0.0625 → 0.062` at 3 decimals)
    HalfEven,
    /// Use the raw product of dose and body metric
    Unrounded,
}

/// Where each row's vial price and size come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum CostLookup {
    /// Per-drug profiles; a row without a matching profile fails
    #[default]
    PerDrug,
    /// One profile applied to every row regardless of drug
    Global(DrugCostProfile),
}

/// Budget calculation options
///
/// The defaults reproduce the current calculator: 3-decimal half-away-from-zero
/// dose rounding, per-drug cost lookup, and cohort sizes from the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetOptions {
    /// Dose rounding policy (default: HalfAwayFromZero)
    pub rounding: DoseRounding,
    /// Decimal places kept by dose rounding (default: 3)
    pub dose_decimals: u32,
    /// Cost lookup mode (default: PerDrug)
    pub cost_lookup: CostLookup,
    /// Options for normalizing raw rows
    pub normalize: NormalizeOptions,
}

impl Default for BudgetOptions {
    fn default() -> Self {
        Self {
            rounding: DoseRounding::HalfAwayFromZero,
            dose_decimals: 3,
            cost_lookup: CostLookup::PerDrug,
            normalize: NormalizeOptions::default(),
        }
    }
}

impl BudgetOptions {
    /// Load options from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, PharmBudgetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_rounding(mut self, rounding: DoseRounding) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_dose_decimals(mut self, decimals: u32) -> Self {
        self.dose_decimals = decimals;
        self
    }

    /// Price every row with the same profile
    pub fn with_global_cost(mut self, profile: DrugCostProfile) -> Self {
        self.cost_lookup = CostLookup::Global(profile);
        self
    }

    pub fn with_normalize(mut self, normalize: NormalizeOptions) -> Self {
        self.normalize = normalize;
        self
    }

    /// Fill body metrics (and optionally cohort sizes) from an age-group table
    pub fn with_reference(
        mut self,
        reference: CohortReference,
        cohort_size: CohortSizeSource,
    ) -> Self {
        self.normalize = self
            .normalize
            .with_reference(reference)
            .with_cohort_size(cohort_size);
        self
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Cost of one protocol row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Dose per administration after rounding (mg)
    pub calculated_dose_mg: f64,
    /// Whole vials opened per administration
    pub vials_per_admin: u64,
    /// Vials per administration times vial price
    pub cost_per_admin: f64,
    /// Cost per administration times doses per patient times patients
    pub cohort_total_cost: f64,
    /// The inflation rate the projection used
    pub inflation_rate: f64,
    /// Inflation-adjusted total per horizon (years)
    pub projected_total_cost: BTreeMap<u32, f64>,
}

impl CostBreakdown {
    /// Projected total for a horizon, if it was requested
    pub fn projected(&self, years: u32) -> Option<f64> {
        self.projected_total_cost.get(&years).copied()
    }
}

/// Outcome of one input row of a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowResult {
    /// Position of the row in the input batch
    pub index: usize,
    /// The normalized row; `None` when normalization failed
    pub row: Option<DrugProtocolRow>,
    /// The breakdown, or why this row was excluded
    pub outcome: Result<CostBreakdown, BudgetError>,
}

impl RowResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn breakdown(&self) -> Option<&CostBreakdown> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&BudgetError> {
        self.outcome.as_ref().err()
    }

    pub fn drug_name(&self) -> Option<&str> {
        self.row.as_ref().map(|row| row.drug_name())
    }
}

/// Output of a batch computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    /// One entry per input row, in input order
    pub rows: Vec<RowResult>,
    /// Sum of projected totals over successful rows, per horizon
    pub grand_total: BTreeMap<u32, f64>,
    /// Number of rows excluded from the grand total
    pub excluded: usize,
}

impl BatchResult {
    /// Successful rows with their breakdowns
    pub fn successes(&self) -> impl Iterator<Item = (&DrugProtocolRow, &CostBreakdown)> {
        self.rows.iter().filter_map(|r| match (&r.row, &r.outcome) {
            (Some(row), Ok(breakdown)) => Some((row, breakdown)),
            _ => None,
        })
    }

    /// Failed rows as `(index, error)` pairs
    pub fn failures(&self) -> impl Iterator<Item = (usize, &BudgetError)> {
        self.rows
            .iter()
            .filter_map(|r| r.error().map(|err| (r.index, err)))
    }

    pub fn succeeded(&self) -> usize {
        self.rows.len() - self.excluded
    }

    /// Sum of current-year cohort totals over successful rows
    pub fn cohort_total(&self) -> f64 {
        self.successes().map(|(_, b)| b.cohort_total_cost).sum()
    }

    /// Grand total for a horizon
    pub fn grand_total_for(&self, years: u32) -> Option<f64> {
        self.grand_total.get(&years).copied()
    }

    /// Successful rows aggregated per drug, in order of first appearance
    pub fn by_drug(&self) -> Vec<DrugSummary> {
        by_drug(&self.rows)
    }
}
