//! Budget error types

use serde::Serialize;
use thiserror::Error;

use crate::data::ValidationError;

/// Errors that can occur while costing a protocol row
///
/// All of them are scoped to a single row: a batch records them next to the
/// row and carries on with the others.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum BudgetError {
    /// The raw row could not be normalized
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A numeric input is outside its domain (negative, non-finite, ...)
    #[error("Invalid input: {param} = {value}")]
    InvalidInput { param: String, value: String },

    /// No cost profile exists for the row's drug
    #[error("No cost profile for drug '{drug}'")]
    MissingCostProfile { drug: String },

    /// The vial size cannot divide a dose
    #[error("Vial size must be positive, got {vial_size}")]
    Division { vial_size: f64 },
}

impl BudgetError {
    pub(crate) fn invalid(param: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidInput {
            param: param.into(),
            value: value.to_string(),
        }
    }
}
