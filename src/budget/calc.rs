//! Pure budget calculations
//!
//! Every function here is deterministic and free of I/O. The row-level entry
//! point is [`compute_row_cost`]; the remaining functions are its steps,
//! exposed for reuse and testing.

use crate::budget::error::BudgetError;
use crate::budget::types::{
    validate_horizons, validate_rate, BudgetOptions, CostBreakdown, DoseRounding,
};
use crate::data::{DrugCostProfile, DrugProtocolRow};
use std::collections::BTreeMap;

/// Relative distance within which a vial quotient snaps to the nearest integer
const VIAL_MULTIPLE_TOLERANCE: f64 = 1e-9;

/// Round a dose to `decimals` places under the given policy
///
/// ```rust
/// use pharmbudget::budget::{round_dose, DoseRounding};
///
/// assert_eq!(round_dose(0.0625, 3, DoseRounding::HalfAwayFromZero), 0.063);
/// assert_eq!(round_dose(0.0625, 3, DoseRounding::HalfEven), 0.062);
/// assert_eq!(round_dose(0.0625, 3, DoseRounding::Unrounded), 0.0625);
/// ```
pub fn round_dose(value: f64, decimals: u32, rounding: DoseRounding) -> f64 {
    let scale = 10f64.powi(decimals.min(15) as i32);
    match rounding {
        DoseRounding::HalfAwayFromZero => (value * scale).round() / scale,
        DoseRounding::HalfEven => (value * scale).round_ties_even() / scale,
        DoseRounding::Unrounded => value,
    }
}

/// Whole vials needed to supply `dose_mg` from vials of `vial_size_mg`
///
/// Exact multiples are exact: a quotient within a relative `1e-9` of an
/// integer snaps to that integer instead of being pushed up by floating-point
/// noise (`2.1 / 0.7` gives 3 vials, not 4). A positive dose never snaps
/// down to zero vials, however small it is next to the vial.
///
/// # Errors
///
/// [`BudgetError::Division`] if the vial size is not positive and finite,
/// [`BudgetError::InvalidInput`] if the dose is negative or not finite.
pub fn compute_vials(dose_mg: f64, vial_size_mg: f64) -> Result<u64, BudgetError> {
    if !(vial_size_mg.is_finite() && vial_size_mg > 0.0) {
        return Err(BudgetError::Division {
            vial_size: vial_size_mg,
        });
    }
    if !(dose_mg.is_finite() && dose_mg >= 0.0) {
        return Err(BudgetError::invalid("calculated_dose_mg", dose_mg));
    }

    let quotient = dose_mg / vial_size_mg;
    if !quotient.is_finite() || quotient >= u64::MAX as f64 {
        return Err(BudgetError::invalid("vials_per_admin", quotient));
    }
    // Only snap onto a whole vial count of at least one
    let nearest = quotient.round();
    let on_multiple =
        nearest >= 1.0 && (quotient - nearest).abs() <= VIAL_MULTIPLE_TOLERANCE * nearest;
    let vials = if on_multiple { nearest } else { quotient.ceil() };
    Ok(vials as u64)
}

/// Future-value-of-annuity factor: `((1 + rate)^years - 1) / rate`
///
/// Evaluated as `expm1(years · ln1p(rate)) / rate`, which stays accurate as
/// the rate approaches zero. A zero rate gives `years`.
pub fn annuity_factor(rate: f64, years: u32) -> f64 {
    if rate == 0.0 {
        return years as f64;
    }
    (years as f64 * rate.ln_1p()).exp_m1() / rate
}

/// Project a recurring annual cost over `years` at compound `rate`
pub fn project_total(annual_cost: f64, rate: f64, years: u32) -> f64 {
    annual_cost * annuity_factor(rate, years)
}

/// Cost one protocol row
///
/// Steps, in order:
/// 1. pick the body metric (BSA or weight) from the calculation factor
/// 2. dose = dose per admin × metric, rounded per [`BudgetOptions::rounding`]
/// 3. vials = vial ceiling of dose over vial size
/// 4. cost per admin = vials × cost per vial
/// 5. cohort total = cost per admin × doses per patient × patients
/// 6. projected total per horizon, compounding at `inflation_rate`
///
/// # Example
///
/// ```rust
/// use pharmbudget::budget::{compute_row_cost, BudgetOptions};
/// use pharmbudget::data::{CalcFactor, DrugCostProfile, DrugProtocolRow};
///
/// let row = DrugProtocolRow::builder("Vincristine")
///     .dose(1.5, CalcFactor::Weight)
///     .weight_kg(28.0)
///     .total_doses(1)
///     .patients(130)
///     .build();
/// let cost = DrugCostProfile::new("Vincristine", 100.0, 1.0);
///
/// let breakdown = compute_row_cost(&row, &cost, 0.04, &[10], &BudgetOptions::default()).unwrap();
/// assert_eq!(breakdown.calculated_dose_mg, 42.0);
/// assert_eq!(breakdown.vials_per_admin, 42);
/// assert_eq!(breakdown.cost_per_admin, 4200.0);
/// assert_eq!(breakdown.cohort_total_cost, 546_000.0);
/// ```
pub fn compute_row_cost(
    row: &DrugProtocolRow,
    cost: &DrugCostProfile,
    inflation_rate: f64,
    horizons: &[u32],
    options: &BudgetOptions,
) -> Result<CostBreakdown, BudgetError> {
    validate_rate(inflation_rate)?;
    validate_horizons(horizons)?;
    check_non_negative("dose_amount_per_admin", row.dose_amount_per_admin())?;
    check_non_negative("cohort_weight_kg", row.cohort_weight_kg())?;
    check_non_negative("cohort_bsa_m2", row.cohort_bsa_m2())?;
    if !(cost.cost_per_vial.is_finite() && cost.cost_per_vial > 0.0) {
        return Err(BudgetError::invalid("cost_per_vial", cost.cost_per_vial));
    }

    let metric = row.body_metric();
    let dose = round_dose(
        row.dose_amount_per_admin() * metric,
        options.dose_decimals,
        options.rounding,
    );
    let vials = compute_vials(dose, cost.vial_size_mg)?;
    let cost_per_admin = vials as f64 * cost.cost_per_vial;
    let cohort_total = cost_per_admin
        * row.total_doses_per_patient() as f64
        * row.estimated_patient_count() as f64;

    let projected_total_cost: BTreeMap<u32, f64> = horizons
        .iter()
        .map(|&years| (years, project_total(cohort_total, inflation_rate, years)))
        .collect();

    Ok(CostBreakdown {
        calculated_dose_mg: dose,
        vials_per_admin: vials,
        cost_per_admin,
        cohort_total_cost: cohort_total,
        inflation_rate,
        projected_total_cost,
    })
}

fn check_non_negative(param: &str, value: f64) -> Result<(), BudgetError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(BudgetError::invalid(param, value))
    }
}
