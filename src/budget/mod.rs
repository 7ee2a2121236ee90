//! Drug budget calculation for pediatric trial protocols
//!
//! This module turns normalized protocol rows ([`crate::data::DrugProtocolRow`])
//! into per-row costs and batch totals, projected over one or more horizons
//! under compound annual inflation.
//!
//! # Calculation
//!
//! | Step | Formula |
//! |------|---------|
//! | Dose per admin | dose amount × (BSA or weight), rounded to 3 decimals |
//! | Vials per admin | ⌈dose ÷ vial size⌉, exact multiples stay exact |
//! | Cost per admin | vials × cost per vial |
//! | Cohort total | cost per admin × doses per patient × patients |
//! | Projected total | cohort total × ((1 + r)^y − 1) / r, or × y when r = 0 |
//!
//! # Usage
//!
//! ```rust
//! use pharmbudget::budget::{Budget, TrialParameters};
//! use pharmbudget::data::{CalcFactor, CostProfiles, DrugCostProfile, DrugProtocolRow};
//!
//! let profiles = CostProfiles::new()
//!     .with_profile(DrugCostProfile::new("Vincristine", 100.0, 1.0));
//! let budget = Budget::new(profiles, TrialParameters::new(0.0, vec![10]));
//!
//! let row = DrugProtocolRow::builder("Vincristine")
//!     .dose(1.5, CalcFactor::Weight)
//!     .weight_kg(28.0)
//!     .total_doses(1)
//!     .patients(130)
//!     .build();
//!
//! let batch = budget.compute(&[row]);
//! assert_eq!(batch.excluded, 0);
//! assert_eq!(batch.grand_total_for(10), Some(5_460_000.0));
//! ```
//!
//! A row that cannot be costed does not stop the batch: its error is kept in
//! its [`RowResult`] and it is left out of [`BatchResult::grand_total`].

mod batch;
mod calc;
mod error;
mod summary;
mod types;

pub use batch::{compute_batch, compute_raw_batch, Budget};
pub use calc::{annuity_factor, compute_row_cost, compute_vials, project_total, round_dose};
pub use error::BudgetError;
pub use summary::{by_drug, grand_total, DrugSummary};
pub use types::{
    BatchResult, BudgetOptions, CostBreakdown, CostLookup, DoseRounding, RowResult,
    TrialParameters,
};
