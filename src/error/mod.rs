use thiserror::Error;

use crate::budget::BudgetError;

#[derive(Error, Debug)]
pub enum PharmBudgetError {
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not read extracted rows: {0}")]
    Extraction(String),
    #[error("Budget error: {0}")]
    Budget(#[from] BudgetError),
}
