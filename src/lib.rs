pub mod budget;
pub mod data;
pub mod error;

pub use crate::budget::{
    compute_batch, compute_row_cost, BatchResult, Budget, BudgetError, BudgetOptions,
    CostBreakdown, TrialParameters,
};
pub use crate::data::{
    normalize_row, CalcFactor, CostProfiles, DrugCostProfile, DrugProtocolRow, RawRow,
    ValidationError,
};
pub use error::PharmBudgetError;

pub mod prelude {
    pub mod data {
        pub use crate::data::{
            parser::parse_extraction_reply, CohortReference, NormalizeOptions, RawRow,
        };
    }
    pub mod budget {
        pub use crate::budget::{
            by_drug, grand_total, CostLookup, DoseRounding, DrugSummary, RowResult,
        };
    }

    pub use crate::budget::{
        compute_batch, compute_row_cost, BatchResult, Budget, BudgetError, BudgetOptions,
        CostBreakdown, TrialParameters,
    };
    pub use crate::data::{
        normalize_row, normalize_rows, CalcFactor, CostProfiles, DoseUnit, DrugCategory,
        DrugCostProfile, DrugProtocolRow, ValidationError,
    };
    pub use crate::PharmBudgetError;
}
