use pharmbudget::data::{
    normalize_row, normalize_rows, CalcFactor, CohortReference, CohortSizeSource, DoseUnit,
    NormalizeOptions, RawRow, ValidationError,
};
use serde_json::json;

#[test]
fn manual_entry_row() {
    let raw = RawRow::builder()
        .field("Risk Group", "Intermediate Risk")
        .field("Drug Name", "Irinotecan")
        .field("Age Group", "3 years or greater")
        .field("Dose per Admin", "50 mg/m2")
        .field("Units", "mg/m²")
        .field("Calc Factor", "BSA")
        .field("Total Doses", 10)
        .field("Est. Patients (N)", "94")
        .field("Est. BSA (m2)", 1.15)
        .build();

    let row = normalize_row(&raw, &NormalizeOptions::default()).unwrap();
    assert_eq!(row.drug_name(), "Irinotecan");
    assert_eq!(row.dose_amount_per_admin(), 50.0);
    assert_eq!(row.dose_unit(), DoseUnit::MgPerM2);
    assert_eq!(row.calc_factor(), CalcFactor::BSA);
    assert_eq!(row.total_doses_per_patient(), 10);
    assert_eq!(row.estimated_patient_count(), 94);
    assert_eq!(row.cohort_bsa_m2(), 1.15);
    assert_eq!(row.cohort_weight_kg(), 30.0);
}

#[test]
fn calc_factor_labels() {
    for label in [
        "BSA",
        "m2/bsa-based",
        "Body Surface Area",
        "mg/m²",
        "mg/m^2",
        "mg/sqm",
        "per M2",
    ] {
        assert_eq!(CalcFactor::from_label(label), CalcFactor::BSA, "{label}");
    }
    for label in ["Weight", "kg", "weight-based", "per kilogram", ""] {
        assert_eq!(CalcFactor::from_label(label), CalcFactor::Weight, "{label}");
    }
}

#[test]
fn caret_squared_unit_and_factor() {
    let raw = RawRow::builder()
        .field("Drug Name", "Cyclophosphamide")
        .field("Dose per Admin", 1200)
        .field("Units", "mg/m^2")
        .field("Calc Factor", "mg/m^2")
        .field("Total Doses", 4)
        .field("Est. Patients (N)", 130)
        .field("Est. BSA (m2)", 0.98)
        .field("Est. Weight (kg)", 28.0)
        .build();

    let row = normalize_row(&raw, &NormalizeOptions::default()).unwrap();
    assert_eq!(row.calc_factor(), CalcFactor::BSA);
    assert_eq!(row.dose_unit(), DoseUnit::MgPerM2);
    assert_eq!(row.body_metric(), 0.98);
}

#[test]
fn superscript_bsa_heading_is_read() {
    let raw = RawRow::builder()
        .field("Drug Name", "Irinotecan")
        .field("Dose per Admin", 50)
        .field("Calc Factor", "BSA")
        .field("Total Doses", 10)
        .field("Est. Patients (N)", 30)
        .field("Est. BSA (m²)", 0.55)
        .build();

    let row = normalize_row(&raw, &NormalizeOptions::default()).unwrap();
    assert_eq!(row.cohort_bsa_m2(), 0.55);
}

#[test]
fn each_row_gets_its_own_outcome() {
    let raws: Vec<RawRow> = vec![
        json!({"drugName": "Vincristine", "doseAmountPerAdmin": 0.05, "calcFactor": "Weight",
               "totalDosesPerPatient": 18, "estimatedPatientCount": 130}),
        json!({"drugName": "Vincristine", "doseAmountPerAdmin": 0.05, "calcFactor": "Weight",
               "totalDosesPerPatient": 18.5, "estimatedPatientCount": 130}),
        json!({"drugName": "Vincristine", "doseAmountPerAdmin": "a lot", "calcFactor": "Weight",
               "totalDosesPerPatient": 18, "estimatedPatientCount": 130}),
        json!({"drugName": "Vincristine", "doseAmountPerAdmin": 0.05, "doseUnit": "mg/m2",
               "calcFactor": "Weight", "totalDosesPerPatient": 18, "estimatedPatientCount": 130}),
        json!(["not", "a", "row"]),
    ]
    .into_iter()
    .map(RawRow::from)
    .collect();

    let results = normalize_rows(&raws, &NormalizeOptions::default());
    assert_eq!(results.len(), 5);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(ValidationError::NotAWholeNumber { .. })));
    assert!(matches!(results[2], Err(ValidationError::NotANumber { .. })));
    assert!(matches!(results[3], Err(ValidationError::UnitMismatch { .. })));
    assert_eq!(results[4], Err(ValidationError::NotAnObject));
}

#[test]
fn reference_table_fills_cohort() {
    let options = NormalizeOptions::default()
        .with_reference(CohortReference::pediatric())
        .with_cohort_size(CohortSizeSource::ReferenceTable);
    let raw = RawRow::from(json!({
        "Drug Name": "Dactinomycin",
        "Age Group": "  less than 1 YEAR ",
        "Dose per Admin": 0.025,
        "Calc Factor": "Weight",
        "Total Doses": 8,
    }));

    let row = normalize_row(&raw, &options).unwrap();
    assert_eq!(row.estimated_patient_count(), 11);
    assert_eq!(row.cohort_weight_kg(), 8.0);
    assert_eq!(row.cohort_bsa_m2(), 0.40);
}

#[test]
fn missing_patient_count_without_reference() {
    let raw = RawRow::from(json!({
        "Drug Name": "Dactinomycin",
        "Dose per Admin": 0.025,
        "Calc Factor": "Weight",
        "Total Doses": 8,
    }));

    let err = normalize_row(&raw, &NormalizeOptions::default()).unwrap_err();
    assert_eq!(err.field(), Some("estimatedPatientCount"));
}
