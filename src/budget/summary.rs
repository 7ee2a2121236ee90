//! Batch totals
//!
//! Grand totals per horizon and per-drug aggregates over the successful rows
//! of a batch. Failed rows never contribute.

use super::types::RowResult;
use crate::data::structs::drug_key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate of the successful rows for one drug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugSummary {
    /// Drug name as spelled in its first row
    pub drug_name: String,
    /// Number of successful rows for this drug
    pub rows: usize,
    /// Patients across those rows
    pub patients: u64,
    /// Sum of current-year cohort totals
    pub cohort_total_cost: f64,
    /// Sum of projected totals per horizon
    pub projected_total_cost: BTreeMap<u32, f64>,
}

/// Sum projected totals per horizon over successful rows
///
/// Every requested horizon appears in the result, at `0.0` when no row succeeded.
pub fn grand_total(results: &[RowResult], horizons: &[u32]) -> BTreeMap<u32, f64> {
    let mut totals: BTreeMap<u32, f64> = horizons.iter().map(|&years| (years, 0.0)).collect();
    for breakdown in results.iter().filter_map(RowResult::breakdown) {
        for (years, value) in &breakdown.projected_total_cost {
            *totals.entry(*years).or_insert(0.0) += value;
        }
    }
    totals
}

/// Aggregate successful rows per drug, in order of first appearance
///
/// Drug names are grouped case-insensitively.
pub fn by_drug(results: &[RowResult]) -> Vec<DrugSummary> {
    let mut summaries: Vec<DrugSummary> = Vec::new();
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();

    for result in results {
        let (row, breakdown) = match (&result.row, &result.outcome) {
            (Some(row), Ok(breakdown)) => (row, breakdown),
            _ => continue,
        };
        let position = *positions
            .entry(drug_key(row.drug_name()))
            .or_insert_with(|| {
                summaries.push(DrugSummary {
                    drug_name: row.drug_name().to_string(),
                    rows: 0,
                    patients: 0,
                    cohort_total_cost: 0.0,
                    projected_total_cost: BTreeMap::new(),
                });
                summaries.len() - 1
            });

        let summary = &mut summaries[position];
        summary.rows += 1;
        summary.patients += u64::from(row.estimated_patient_count());
        summary.cohort_total_cost += breakdown.cohort_total_cost;
        for (years, value) in &breakdown.projected_total_cost {
            *summary.projected_total_cost.entry(*years).or_insert(0.0) += value;
        }
    }

    summaries
}
