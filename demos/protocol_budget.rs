//! Protocol budget example
//!
//! Costs a low-risk rhabdomyosarcoma protocol, first from hand-built rows and
//! then from an extraction reply, and prints per-row and per-drug totals.
//!
//! Run with: `RUST_LOG=debug cargo run --example protocol_budget`

use pharmbudget::data::{default_drug_inflation, CohortReference, CohortSizeSource};
use pharmbudget::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), PharmBudgetError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== pharmbudget protocol example ===\n");

    let profiles: CostProfiles = vec![
        DrugCostProfile::new("Vincristine", 15.58, 1.0),
        DrugCostProfile::new("Dactinomycin", 480.0, 0.5).with_category(DrugCategory::Specialty),
        DrugCostProfile::new("Cyclophosphamide", 42.0, 500.0),
    ]
    .into_iter()
    .collect();
    let params = TrialParameters::default()
        .with_trial_years(5)
        .with_drug_rates(default_drug_inflation());
    params.validate()?;

    manual_rows(&profiles, &params);
    extracted_rows(&profiles, &params)?;
    Ok(())
}

/// Rows entered by hand
fn manual_rows(profiles: &CostProfiles, params: &TrialParameters) {
    println!("--- Manual entry ---\n");

    let rows = vec![
        DrugProtocolRow::builder("Vincristine")
            .risk_group("Low Risk")
            .age_group("6 months or greater")
            .dose(0.05, CalcFactor::Weight)
            .weight_kg(28.0)
            .total_doses(18)
            .patients(130)
            .build(),
        DrugProtocolRow::builder("Dactinomycin")
            .risk_group("Low Risk")
            .age_group("6 months or greater")
            .dose(0.045, CalcFactor::Weight)
            .weight_kg(28.0)
            .total_doses(8)
            .patients(130)
            .build(),
        DrugProtocolRow::builder("Temsirolimus")
            .risk_group("High Risk")
            .age_group("3 years or greater")
            .dose(15.0, CalcFactor::BSA)
            .bsa_m2(1.15)
            .total_doses(12)
            .patients(94)
            .build(),
    ];

    let batch = compute_batch(&rows, profiles, params, &BudgetOptions::default());
    print_batch(&batch);
}

/// Rows read from an extraction reply, with cohorts from the reference table
fn extracted_rows(
    profiles: &CostProfiles,
    params: &TrialParameters,
) -> Result<(), PharmBudgetError> {
    println!("--- Extraction reply ---\n");

    let reply = r#"```json
[
  {"Risk Group": "Low Risk", "Drug Name": "Vincristine", "Age Group": "Less than 6 months",
   "Dose per Admin": "0.025", "Units": "mg/kg", "Calc Factor": "Weight", "Total Doses": 18},
  {"Risk Group": "Low Risk", "Drug Name": "Cyclophosphamide", "Age Group": "6 months or greater",
   "Dose per Admin": 1200, "Units": "mg/m2", "Calc Factor": "BSA", "Total Doses": 4},
  {"Risk Group": "Low Risk", "Drug Name": "Dactinomycin", "Age Group": "6 months or greater",
   "Dose per Admin": "see note", "Calc Factor": "Weight", "Total Doses": 8}
]
```"#;

    let options = BudgetOptions::default()
        .with_reference(CohortReference::pediatric(), CohortSizeSource::ReferenceTable);
    let budget = Budget::new(profiles.clone(), params.clone()).with_options(options);
    let batch = budget.compute_extraction(reply)?;
    print_batch(&batch);
    Ok(())
}

fn print_batch(batch: &BatchResult) {
    for result in &batch.rows {
        match (&result.row, &result.outcome) {
            (Some(row), Ok(b)) => println!(
                "#{} {:<18} {:>9.3} mg  {:>4} vials  ${:>10.2}/admin  ${:>14.2} cohort",
                result.index,
                row.drug_name(),
                b.calculated_dose_mg,
                b.vials_per_admin,
                b.cost_per_admin,
                b.cohort_total_cost
            ),
            (_, Err(err)) => println!("#{} excluded: {}", result.index, err),
            (None, Ok(_)) => {}
        }
    }

    println!("\nPer drug:");
    for summary in batch.by_drug() {
        println!(
            "  {:<18} {:>4} patients  ${:>14.2}",
            summary.drug_name, summary.patients, summary.cohort_total_cost
        );
    }

    println!("\nGrand total ({} rows excluded):", batch.excluded);
    for (years, total) in &batch.grand_total {
        println!("  {:>2} years: ${:.2}", years, total);
    }
    println!();
}
