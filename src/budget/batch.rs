//! Batch budget computation
//!
//! Rows are costed independently and in parallel; results come back in input
//! order. A row that fails (normalization, missing cost profile, bad input)
//! is recorded with its error and excluded from the grand total, and the rest
//! of the batch is still computed.

use crate::budget::calc::compute_row_cost;
use crate::budget::error::BudgetError;
use crate::budget::summary::grand_total;
use crate::budget::types::{
    BatchResult, BudgetOptions, CostBreakdown, CostLookup, RowResult, TrialParameters,
};
use crate::data::parser::parse_extraction_reply;
use crate::data::{normalize_row, CostProfiles, DrugCostProfile, DrugProtocolRow, RawRow};
use crate::PharmBudgetError;
use rayon::prelude::*;

/// Cost a batch of normalized rows
///
/// # Example
///
/// ```rust
/// use pharmbudget::budget::{compute_batch, BudgetOptions, TrialParameters};
/// use pharmbudget::data::{CalcFactor, CostProfiles, DrugCostProfile, DrugProtocolRow};
///
/// let rows = vec![
///     DrugProtocolRow::builder("Vincristine")
///         .dose(0.05, CalcFactor::Weight)
///         .total_doses(18)
///         .patients(130)
///         .weight_kg(28.0)
///         .build(),
///     DrugProtocolRow::builder("Unlisted")
///         .dose(1.0, CalcFactor::BSA)
///         .total_doses(1)
///         .patients(5)
///         .build(),
/// ];
/// let profiles = CostProfiles::new().with_profile(DrugCostProfile::new("Vincristine", 15.58, 1.0));
///
/// let batch = compute_batch(&rows, &profiles, &TrialParameters::default(), &BudgetOptions::default());
/// assert_eq!(batch.rows.len(), 2);
/// assert_eq!(batch.excluded, 1);
/// assert!(batch.rows[0].is_ok());
/// ```
pub fn compute_batch(
    rows: &[DrugProtocolRow],
    profiles: &CostProfiles,
    params: &TrialParameters,
    options: &BudgetOptions,
) -> BatchResult {
    let results: Vec<RowResult> = rows
        .par_iter()
        .enumerate()
        .map(|(index, row)| RowResult {
            index,
            row: Some(row.clone()),
            outcome: cost_row(row, profiles, params, options),
        })
        .collect();
    assemble(results, params)
}

/// Normalize and cost a batch of raw rows
///
/// Rows that fail normalization are reported with a
/// [`BudgetError::Validation`] error and no normalized row.
pub fn compute_raw_batch(
    rows: &[RawRow],
    profiles: &CostProfiles,
    params: &TrialParameters,
    options: &BudgetOptions,
) -> BatchResult {
    let results: Vec<RowResult> = rows
        .par_iter()
        .enumerate()
        .map(|(index, raw)| match normalize_row(raw, &options.normalize) {
            Ok(row) => {
                let outcome = cost_row(&row, profiles, params, options);
                RowResult {
                    index,
                    row: Some(row),
                    outcome,
                }
            }
            Err(err) => RowResult {
                index,
                row: None,
                outcome: Err(err.into()),
            },
        })
        .collect();
    assemble(results, params)
}

/// A configured budget run: cost profiles, trial parameters and options
///
/// # Example
///
/// ```rust
/// use pharmbudget::budget::{Budget, TrialParameters};
/// use pharmbudget::data::{CostProfiles, DrugCostProfile};
///
/// let profiles = CostProfiles::new().with_profile(DrugCostProfile::new("Vincristine", 100.0, 1.0));
/// let budget = Budget::new(profiles, TrialParameters::new(0.04, vec![10]));
///
/// let reply = r#"[{"Drug Name": "Vincristine", "Dose per Admin": 1.5, "Calc Factor": "Weight",
///                 "Total Doses": 1, "Est. Patients (N)": 130, "Est. Weight (kg)": 28.0}]"#;
/// let batch = budget.compute_extraction(reply).unwrap();
/// assert_eq!(batch.rows[0].breakdown().unwrap().cost_per_admin, 4200.0);
/// ```
#[derive(Debug, Clone)]
pub struct Budget {
    profiles: CostProfiles,
    params: TrialParameters,
    options: BudgetOptions,
}

impl Budget {
    pub fn new(profiles: CostProfiles, params: TrialParameters) -> Self {
        Self {
            profiles,
            params,
            options: BudgetOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BudgetOptions) -> Self {
        self.options = options;
        self
    }

    pub fn profiles(&self) -> &CostProfiles {
        &self.profiles
    }

    pub fn params(&self) -> &TrialParameters {
        &self.params
    }

    pub fn options(&self) -> &BudgetOptions {
        &self.options
    }

    /// Cost a single normalized row
    pub fn compute_row(&self, row: &DrugProtocolRow) -> Result<CostBreakdown, BudgetError> {
        cost_row(row, &self.profiles, &self.params, &self.options)
    }

    /// Cost a batch of normalized rows
    pub fn compute(&self, rows: &[DrugProtocolRow]) -> BatchResult {
        compute_batch(rows, &self.profiles, &self.params, &self.options)
    }

    /// Normalize and cost a batch of raw rows
    pub fn compute_raw(&self, rows: &[RawRow]) -> BatchResult {
        compute_raw_batch(rows, &self.profiles, &self.params, &self.options)
    }

    /// Parse an extraction reply, then normalize and cost its rows
    ///
    /// Fails only if no rows can be recovered from the reply at all.
    pub fn compute_extraction(&self, reply: &str) -> Result<BatchResult, PharmBudgetError> {
        let rows = parse_extraction_reply(reply)?;
        Ok(self.compute_raw(&rows))
    }
}

/// Resolve the row's cost profile and inflation rate, then cost it
fn cost_row(
    row: &DrugProtocolRow,
    profiles: &CostProfiles,
    params: &TrialParameters,
    options: &BudgetOptions,
) -> Result<CostBreakdown, BudgetError> {
    let cost = resolve_cost(row, profiles, &options.cost_lookup)?;
    let rate = params.rate_for(row.drug_name(), cost);
    compute_row_cost(row, cost, rate, &params.horizons, options)
}

fn resolve_cost<'a>(
    row: &DrugProtocolRow,
    profiles: &'a CostProfiles,
    lookup: &'a CostLookup,
) -> Result<&'a DrugCostProfile, BudgetError> {
    match lookup {
        CostLookup::Global(profile) => Ok(profile),
        CostLookup::PerDrug => {
            profiles
                .get(row.drug_name())
                .ok_or_else(|| BudgetError::MissingCostProfile {
                    drug: row.drug_name().to_string(),
                })
        }
    }
}

fn assemble(results: Vec<RowResult>, params: &TrialParameters) -> BatchResult {
    let excluded = results.iter().filter(|r| !r.is_ok()).count();
    for result in results.iter().filter(|r| !r.is_ok()) {
        if let Some(err) = result.error() {
            tracing::debug!(
                index = result.index,
                drug = result.drug_name().unwrap_or("<unnormalized>"),
                error = %err,
                "Row excluded from budget"
            );
        }
    }
    let grand_total = grand_total(&results, &params.horizons);
    tracing::info!(
        rows = results.len(),
        succeeded = results.len() - excluded,
        excluded,
        "Computed budget batch"
    );
    BatchResult {
        rows: results,
        grand_total,
        excluded,
    }
}
