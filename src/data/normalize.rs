//! Protocol record normalization
//!
//! Turns a loosely typed [`RawRow`] into a validated [`DrugProtocolRow`].
//!
//! Required fields are `drugName`, `doseAmountPerAdmin`, `calcFactor` and
//! `totalDosesPerPatient`, plus `estimatedPatientCount` unless cohort sizes come
//! from the reference table. Body metrics are taken from the row when present
//! and parseable, then from the reference table by age group, and finally from
//! the global fallbacks in [`NormalizeOptions`].

use crate::data::reference::CohortReference;
use crate::data::row::{Field, RawRow, ValidationError};
use crate::data::structs::{CalcFactor, DoseUnit, DrugProtocolRow};
use serde::{Deserialize, Serialize};

/// Where the cohort size `N` of a row comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CohortSizeSource {
    /// The row's own `estimatedPatientCount` (manual entry or an extraction estimate)
    #[default]
    Row,
    /// The reference table entry for the row's age group, falling back to the row
    ReferenceTable,
}

/// Normalization options
///
/// Missing keys take their default when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeOptions {
    /// Weight used when neither the row nor the reference table provides one (default: 30.0 kg)
    pub default_weight_kg: f64,
    /// BSA used when neither the row nor the reference table provides one (default: 1.0 m²)
    pub default_bsa_m2: f64,
    /// Age-group reference data (default: empty)
    pub reference: CohortReference,
    /// Source of cohort sizes (default: [`CohortSizeSource::Row`])
    pub cohort_size: CohortSizeSource,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            default_weight_kg: 30.0,
            default_bsa_m2: 1.0,
            reference: CohortReference::default(),
            cohort_size: CohortSizeSource::Row,
        }
    }
}

impl NormalizeOptions {
    /// Set the global body-metric fallbacks
    pub fn with_fallback_metrics(mut self, weight_kg: f64, bsa_m2: f64) -> Self {
        self.default_weight_kg = weight_kg;
        self.default_bsa_m2 = bsa_m2;
        self
    }

    pub fn with_reference(mut self, reference: CohortReference) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_cohort_size(mut self, source: CohortSizeSource) -> Self {
        self.cohort_size = source;
        self
    }
}

/// Normalize a single raw row
///
/// # Example
///
/// ```rust
/// use pharmbudget::data::{normalize_row, CalcFactor, NormalizeOptions, RawRow};
///
/// let raw = RawRow::builder()
///     .field("Drug Name", "Dactinomycin")
///     .field("Dose per Admin", 0.045)
///     .field("Units", "mg/m2")
///     .field("Calc Factor", "m2/bsa-based")
///     .field("Total Doses", 9)
///     .field("Est. Patients (N)", 30)
///     .build();
///
/// let row = normalize_row(&raw, &NormalizeOptions::default()).unwrap();
/// assert_eq!(row.calc_factor(), CalcFactor::BSA);
/// assert_eq!(row.cohort_bsa_m2(), 1.0); // global fallback
/// ```
pub fn normalize_row(
    raw: &RawRow,
    options: &NormalizeOptions,
) -> Result<DrugProtocolRow, ValidationError> {
    if raw.as_object().is_none() {
        return Err(ValidationError::NotAnObject);
    }

    let drug_name = raw
        .text(Field::DrugName)
        .ok_or_else(|| ValidationError::missing(Field::DrugName))?;
    let dose = raw
        .non_negative(Field::DoseAmountPerAdmin)?
        .ok_or_else(|| ValidationError::missing(Field::DoseAmountPerAdmin))?;
    let factor_label = raw
        .text(Field::CalcFactor)
        .ok_or_else(|| ValidationError::missing(Field::CalcFactor))?;
    let calc_factor = CalcFactor::from_label(&factor_label);
    check_unit(raw, calc_factor, &drug_name)?;
    let total_doses = raw
        .count(Field::TotalDosesPerPatient)?
        .ok_or_else(|| ValidationError::missing(Field::TotalDosesPerPatient))?;

    let age_group = raw.text(Field::AgeGroup).unwrap_or_default();
    let risk_group = raw.text(Field::RiskGroup).unwrap_or_default();
    let reference = options.reference.lookup(&age_group);

    let row_patients = raw.count(Field::EstimatedPatientCount)?;
    let patients = match options.cohort_size {
        CohortSizeSource::Row => row_patients,
        CohortSizeSource::ReferenceTable => reference.map(|r| r.patients).or_else(|| {
            tracing::debug!(
                drug = %drug_name,
                age_group = %age_group,
                "Age group not in reference table, using the row's patient count"
            );
            row_patients
        }),
    }
    .ok_or_else(|| ValidationError::missing(Field::EstimatedPatientCount))?;

    let weight_kg = body_metric(
        raw,
        Field::CohortWeightKg,
        reference.map(|r| r.weight_kg),
        options.default_weight_kg,
        &drug_name,
    )?;
    let bsa_m2 = body_metric(
        raw,
        Field::CohortBsaM2,
        reference.map(|r| r.bsa_m2),
        options.default_bsa_m2,
        &drug_name,
    )?;

    Ok(DrugProtocolRow::builder(drug_name)
        .risk_group(risk_group)
        .age_group(age_group)
        .dose(dose, calc_factor)
        .total_doses(total_doses)
        .patients(patients)
        .weight_kg(weight_kg)
        .bsa_m2(bsa_m2)
        .build())
}

/// Normalize a batch of raw rows, one result per input row, in input order
pub fn normalize_rows(
    rows: &[RawRow],
    options: &NormalizeOptions,
) -> Vec<Result<DrugProtocolRow, ValidationError>> {
    rows.iter().map(|row| normalize_row(row, options)).collect()
}

/// A stated dose unit must agree with the calculation factor
///
/// Unrecognised unit labels are ignored and the unit follows the factor.
fn check_unit(raw: &RawRow, factor: CalcFactor, drug: &str) -> Result<(), ValidationError> {
    let label = match raw.text(Field::DoseUnit) {
        Some(label) => label,
        None => return Ok(()),
    };
    match DoseUnit::parse(&label) {
        Some(unit) if unit.calc_factor() != factor => Err(ValidationError::UnitMismatch {
            unit: label,
            factor: factor.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            tracing::warn!(
                drug = %drug,
                unit = %label,
                factor = %factor,
                "Unrecognised dose unit, inferring it from the calculation factor"
            );
            Ok(())
        }
    }
}

/// Resolve an optional body metric: row value, then reference, then fallback
///
/// Unparseable row values fall through; negative values are rejected.
fn body_metric(
    raw: &RawRow,
    field: Field,
    reference: Option<f64>,
    fallback: f64,
    drug: &str,
) -> Result<f64, ValidationError> {
    match raw.non_negative(field) {
        Ok(Some(value)) => return Ok(value),
        Ok(None) => {}
        Err(err @ ValidationError::Negative { .. }) => return Err(err),
        Err(err) => {
            tracing::debug!(
                drug = %drug,
                field = %field,
                error = %err,
                "Ignoring unparseable body metric"
            );
        }
    }
    let value = reference.unwrap_or(fallback);
    tracing::debug!(drug = %drug, field = %field, value, "Using default body metric");
    Ok(value)
}
