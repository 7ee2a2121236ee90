pub mod normalize;
pub mod parser;
pub mod reference;
pub mod row;
pub mod structs;
pub use normalize::{normalize_row, normalize_rows, CohortSizeSource, NormalizeOptions};
pub use reference::{default_drug_inflation, AgeGroupReference, CohortReference};
pub use row::{field_key, Field, RawRow, RawRowBuilder, ValidationError};
pub use structs::{
    CalcFactor, CostProfiles, DoseUnit, DrugCategory, DrugCostProfile, DrugProtocolRow,
    DrugProtocolRowBuilder,
};
