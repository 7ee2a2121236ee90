//! Loosely typed protocol rows, as produced by manual entry or an extraction step
//!
//! A [`RawRow`] is any JSON value. Field names are matched tolerantly (case,
//! spacing and punctuation are ignored, and several aliases are accepted per
//! field), and numeric values may arrive as numbers or as strings such as
//! `"1.5 mg/kg"` or `"$1,250"`.
//!
//! # Example
//!
//! ```rust
//! use pharmbudget::data::{Field, RawRow};
//!
//! let row = RawRow::builder()
//!     .field("Drug Name", "Vincristine")
//!     .field("Dose per Admin", "1.5 mg/kg")
//!     .field("Total Doses", 18)
//!     .build();
//!
//! assert_eq!(row.text(Field::DrugName).as_deref(), Some("Vincristine"));
//! assert_eq!(row.number(Field::DoseAmountPerAdmin).unwrap(), Some(1.5));
//! assert_eq!(row.count(Field::TotalDosesPerPatient).unwrap(), Some(18));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Tolerance when deciding whether a float is a whole number
const WHOLE_NUMBER_TOLERANCE: f64 = 1e-9;

/// The fields the normalizer knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    RiskGroup,
    DrugName,
    AgeGroup,
    EstimatedPatientCount,
    DoseAmountPerAdmin,
    DoseUnit,
    CalcFactor,
    TotalDosesPerPatient,
    CohortWeightKg,
    CohortBsaM2,
}

impl Field {
    /// Canonical field name, used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Field::RiskGroup => "riskGroup",
            Field::DrugName => "drugName",
            Field::AgeGroup => "ageGroup",
            Field::EstimatedPatientCount => "estimatedPatientCount",
            Field::DoseAmountPerAdmin => "doseAmountPerAdmin",
            Field::DoseUnit => "doseUnit",
            Field::CalcFactor => "calcFactor",
            Field::TotalDosesPerPatient => "totalDosesPerPatient",
            Field::CohortWeightKg => "cohortWeightKg",
            Field::CohortBsaM2 => "cohortBSA_m2",
        }
    }

    /// Accepted spellings, after [`field_key`] compaction
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::RiskGroup => &["riskgroup", "risk", "riskarm", "arm"],
            Field::DrugName => &["drugname", "drug", "agent", "medication"],
            Field::AgeGroup => &["agegroup", "age", "agecohort", "cohort"],
            Field::EstimatedPatientCount => &[
                "estimatedpatientcount",
                "estpatientsn",
                "estpatients",
                "estimatedpatients",
                "patients",
                "patientcount",
                "numberofpatients",
                "n",
            ],
            Field::DoseAmountPerAdmin => &[
                "doseamountperadmin",
                "doseperadmin",
                "doseperadministration",
                "doseamount",
                "dose",
            ],
            Field::DoseUnit => &["doseunit", "doseunits", "units", "unit"],
            Field::CalcFactor => &["calcfactor", "calculationfactor", "factor", "basis"],
            Field::TotalDosesPerPatient => &[
                "totaldosesperpatient",
                "totaldoses",
                "dosesperpatient",
                "numberofdoses",
                "doses",
            ],
            Field::CohortWeightKg => &[
                "cohortweightkg",
                "estweightkg",
                "avgweightkg",
                "weightkg",
                "weight",
            ],
            Field::CohortBsaM2 => &["cohortbsam2", "estbsam2", "avgbsam2", "bsam2", "bsa"],
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compact a field name: lowercase ASCII alphanumerics only
///
/// `"Est. Patients (N)"` becomes `"estpatientsn"`, `"cohortBSA_m2"` becomes `"cohortbsam2"`.
/// A superscript two counts as `2`, so `"Est. BSA (m²)"` becomes `"estbsam2"`.
pub fn field_key(name: &str) -> String {
    name.chars()
        .map(|c| if c == '²' { '2' } else { c })
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A single loosely typed input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow {
    value: Value,
}

impl RawRow {
    /// Start an empty object row
    pub fn builder() -> RawRowBuilder {
        RawRowBuilder::default()
    }

    /// Wrap any JSON value; non-objects fail normalization with [`ValidationError::NotAnObject`]
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.value.as_object()
    }

    /// Look up a field by any of its aliases
    ///
    /// Exact canonical names win over aliases; `null` counts as absent.
    pub fn get(&self, field: Field) -> Option<&Value> {
        let object = self.value.as_object()?;
        let aliases = field.aliases();
        let mut found: Option<(usize, &Value)> = None;
        for (key, value) in object {
            if value.is_null() {
                continue;
            }
            let compact = field_key(key);
            if let Some(rank) = aliases.iter().position(|alias| *alias == compact) {
                if found.map_or(true, |(best, _)| rank < best) {
                    found = Some((rank, value));
                }
            }
        }
        found.map(|(_, value)| value)
    }

    /// Read a field as trimmed text; empty strings count as absent
    pub fn text(&self, field: Field) -> Option<String> {
        let text = match self.get(field)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Read a field as a finite number
    ///
    /// Returns `Ok(None)` when the field is absent, `null`, or an empty string.
    pub fn number(&self, field: Field) -> Result<Option<f64>, ValidationError> {
        let value = match self.get(field) {
            Some(value) => value,
            None => return Ok(None),
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => parse_number(s),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(ValidationError::not_a_number(field, value)),
        }
    }

    /// Read a field as a finite, non-negative number
    pub fn non_negative(&self, field: Field) -> Result<Option<f64>, ValidationError> {
        match self.number(field)? {
            Some(v) if v < 0.0 => Err(ValidationError::Negative {
                field: field.name().to_string(),
                value: v,
            }),
            other => Ok(other),
        }
    }

    /// Read a field as a non-negative whole number
    pub fn count(&self, field: Field) -> Result<Option<u32>, ValidationError> {
        let value = match self.non_negative(field)? {
            Some(v) => v,
            None => return Ok(None),
        };
        let rounded = value.round();
        if (value - rounded).abs() > WHOLE_NUMBER_TOLERANCE || rounded > u32::MAX as f64 {
            return Err(ValidationError::NotAWholeNumber {
                field: field.name().to_string(),
                value,
            });
        }
        Ok(Some(rounded as u32))
    }
}

impl From<Value> for RawRow {
    fn from(value: Value) -> Self {
        RawRow::from_value(value)
    }
}

/// Builder for object-shaped [`RawRow`]s
#[derive(Debug, Clone, Default)]
pub struct RawRowBuilder {
    fields: Map<String, Value>,
}

impl RawRowBuilder {
    /// Set a field; the name is kept verbatim and matched tolerantly later
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> RawRow {
        RawRow::from_value(Value::Object(self.fields))
    }
}

/// Parse a human-entered number
///
/// Accepts surrounding whitespace, a leading currency sign, thousands
/// separators, and a trailing unit (`"1.5 mg/kg"`, `"18 doses"`, `"1.5mg"`).
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches('$')
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let token = cleaned.split_whitespace().next()?;
    if let Ok(v) = token.parse::<f64>() {
        return Some(v);
    }
    let prefix: String = token
        .chars()
        .enumerate()
        .take_while(|(i, c)| {
            c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '-' || *c == '+'))
        })
        .map(|(_, c)| c)
        .collect();
    prefix.parse::<f64>().ok()
}

/// Errors raised while coercing a raw row into a [`crate::data::DrugProtocolRow`]
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ValidationError {
    /// The row is not a JSON object
    #[error("Row is not an object of named fields")]
    NotAnObject,
    /// A required field is absent or empty
    #[error("Required field '{field}' is missing")]
    MissingField { field: String },
    /// A numeric field could not be parsed
    #[error("Field '{field}' is not a number: {value}")]
    NotANumber { field: String, value: String },
    /// A numeric field is negative
    #[error("Field '{field}' must be non-negative, got {value}")]
    Negative { field: String, value: f64 },
    /// A count field has a fractional part
    #[error("Field '{field}' must be a whole number, got {value}")]
    NotAWholeNumber { field: String, value: f64 },
    /// The stated dose unit contradicts the calculation factor
    #[error("Dose unit '{unit}' does not agree with calculation factor '{factor}'")]
    UnitMismatch { unit: String, factor: String },
}

impl ValidationError {
    pub fn missing(field: Field) -> Self {
        Self::MissingField {
            field: field.name().to_string(),
        }
    }

    fn not_a_number(field: Field, value: &Value) -> Self {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self::NotANumber {
            field: field.name().to_string(),
            value,
        }
    }

    /// The canonical name of the field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::NotAnObject => None,
            ValidationError::MissingField { field }
            | ValidationError::NotANumber { field, .. }
            | ValidationError::Negative { field, .. }
            | ValidationError::NotAWholeNumber { field, .. } => Some(field.as_str()),
            ValidationError::UnitMismatch { .. } => Some(Field::DoseUnit.name()),
        }
    }
}
