use approx::assert_relative_eq;
use pharmbudget::budget::{
    annuity_factor, compute_row_cost, compute_vials, BudgetOptions, DoseRounding,
};
use pharmbudget::data::{CalcFactor, DrugCostProfile, DrugProtocolRow};

fn vincristine_row(dose: f64, factor: CalcFactor) -> DrugProtocolRow {
    DrugProtocolRow::builder("Vincristine")
        .risk_group("Low Risk")
        .age_group("6 months or greater")
        .dose(dose, factor)
        .weight_kg(28.0)
        .bsa_m2(0.98)
        .total_doses(1)
        .patients(130)
        .build()
}

#[test]
fn weight_based_dose_costs_whole_vials() {
    let row = vincristine_row(1.5, CalcFactor::Weight);
    let cost = DrugCostProfile::new("Vincristine", 100.0, 1.0);
    let b = compute_row_cost(&row, &cost, 0.04, &[10], &BudgetOptions::default()).unwrap();

    assert_eq!(b.calculated_dose_mg, 42.0);
    assert_eq!(b.vials_per_admin, 42);
    assert_eq!(b.cost_per_admin, 4200.0);
    assert_eq!(b.cohort_total_cost, 546_000.0);
}

#[test]
fn ten_year_projection_at_four_percent() {
    let row = vincristine_row(1.5, CalcFactor::Weight);
    let cost = DrugCostProfile::new("Vincristine", 100.0, 1.0);
    let b = compute_row_cost(&row, &cost, 0.04, &[10], &BudgetOptions::default()).unwrap();

    let expected = 546_000.0 * (1.04f64.powi(10) - 1.0) / 0.04;
    assert_relative_eq!(b.projected(10).unwrap(), expected, max_relative = 1e-12);
    assert_relative_eq!(b.projected(10).unwrap(), 6_555_334.49, epsilon = 0.01);
    assert_eq!(b.inflation_rate, 0.04);
}

#[test]
fn one_year_projection_equals_cohort_total() {
    let row = vincristine_row(1.5, CalcFactor::Weight);
    let cost = DrugCostProfile::new("Vincristine", 100.0, 1.0);
    for rate in [0.0, 0.01, 0.04, 0.5] {
        let b = compute_row_cost(&row, &cost, rate, &[1], &BudgetOptions::default()).unwrap();
        assert_relative_eq!(b.projected(1).unwrap(), b.cohort_total_cost, max_relative = 1e-12);
    }
}

#[test]
fn vial_count_is_the_smallest_sufficient_count() {
    let vial_sizes = [0.1, 0.5, 0.7, 1.0, 2.0, 20.0, 100.0];
    for &vial in &vial_sizes {
        for step in 0..400 {
            let dose = step as f64 * 0.137;
            let vials = compute_vials(dose, vial).unwrap() as f64;
            let tolerance = 1e-9 * dose.max(vial);
            assert!(vials * vial >= dose - tolerance, "dose {dose} vial {vial}");
            assert!(
                vials == 0.0 || (vials - 1.0) * vial < dose + tolerance,
                "dose {dose} vial {vial} vials {vials}"
            );
        }
    }
}

#[test]
fn exact_multiples_do_not_round_up() {
    for k in 1..50u32 {
        for &vial in &[0.1, 0.3, 0.7, 1.0, 2.5] {
            let dose = k as f64 * vial;
            assert_eq!(compute_vials(dose, vial).unwrap(), k as u64, "{k} x {vial}");
        }
    }
}

#[test]
fn small_rate_approaches_linear_projection() {
    for years in [1, 5, 10, 30] {
        assert_relative_eq!(
            annuity_factor(1e-9, years),
            annuity_factor(0.0, years),
            max_relative = 1e-6
        );
    }
}

#[test]
fn projection_grows_with_rate_and_horizon() {
    let row = vincristine_row(1.5, CalcFactor::Weight);
    let cost = DrugCostProfile::new("Vincristine", 100.0, 1.0);
    let options = BudgetOptions::default();
    let horizons = [1, 2, 5, 10, 20];

    let mut previous_by_horizon: Option<Vec<f64>> = None;
    for rate in [0.0, 0.01, 0.04, 0.1, 0.3] {
        let b = compute_row_cost(&row, &cost, rate, &horizons, &options).unwrap();
        let totals: Vec<f64> = horizons.iter().map(|&y| b.projected(y).unwrap()).collect();
        for pair in totals.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        if let Some(previous) = previous_by_horizon {
            for (now, before) in totals.iter().zip(previous.iter()) {
                assert!(now >= before);
            }
        }
        previous_by_horizon = Some(totals);
    }
}

#[test]
fn bsa_label_dispatches_to_body_surface_area() {
    let factor = CalcFactor::from_label("m2/bsa-based");
    assert_eq!(factor, CalcFactor::BSA);

    let row = vincristine_row(1.5, factor);
    let cost = DrugCostProfile::new("Vincristine", 100.0, 1.0);
    let b = compute_row_cost(&row, &cost, 0.04, &[10], &BudgetOptions::default()).unwrap();
    assert_eq!(b.calculated_dose_mg, 1.47);
    assert_eq!(b.vials_per_admin, 2);
}

#[test]
fn rounding_policy_changes_ties_only() {
    let row = DrugProtocolRow::builder("Vincristine")
        .dose(0.0625, CalcFactor::BSA)
        .bsa_m2(1.0)
        .total_doses(1)
        .patients(1)
        .build();
    let cost = DrugCostProfile::new("Vincristine", 10.0, 0.001);

    let away = compute_row_cost(&row, &cost, 0.0, &[1], &BudgetOptions::default()).unwrap();
    let even = compute_row_cost(
        &row,
        &cost,
        0.0,
        &[1],
        &BudgetOptions::default().with_rounding(DoseRounding::HalfEven),
    )
    .unwrap();

    assert_eq!(away.calculated_dose_mg, 0.063);
    assert_eq!(even.calculated_dose_mg, 0.062);
    assert_eq!(away.vials_per_admin, 63);
    assert_eq!(even.vials_per_admin, 62);
}

#[test]
fn repeated_calculation_is_bit_identical() {
    let row = vincristine_row(0.05, CalcFactor::Weight);
    let cost = DrugCostProfile::new("Vincristine", 15.58, 1.0);
    let options = BudgetOptions::default();

    let first = compute_row_cost(&row, &cost, 0.04, &[10, 5], &options).unwrap();
    let second = compute_row_cost(&row, &cost, 0.04, &[10, 5], &options).unwrap();
    assert_eq!(first, second);
    for (a, b) in first
        .projected_total_cost
        .values()
        .zip(second.projected_total_cost.values())
    {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn cohort_total_grows_with_each_factor() {
    let options = BudgetOptions::default();
    let cost_of = |patients: u32, doses: u32, cost_per_vial: f64| {
        let row = DrugProtocolRow::builder("Vincristine")
            .dose(0.05, CalcFactor::Weight)
            .weight_kg(28.0)
            .total_doses(doses)
            .patients(patients)
            .build();
        let cost = DrugCostProfile::new("Vincristine", cost_per_vial, 1.0);
        compute_row_cost(&row, &cost, 0.04, &[10], &options)
            .unwrap()
            .cohort_total_cost
    };

    let base = cost_of(130, 18, 15.58);
    assert!(cost_of(131, 18, 15.58) > base);
    assert!(cost_of(130, 19, 15.58) > base);
    assert!(cost_of(130, 18, 15.59) > base);
    assert_eq!(cost_of(0, 18, 15.58), 0.0);
}

#[test]
fn positive_dose_from_huge_vial_needs_one_vial() {
    for &vial in &[1e3, 2e6, 1e9, 1e12] {
        for &dose in &[1e-6, 0.001, 0.5, 1.0] {
            let vials = compute_vials(dose, vial).unwrap();
            assert_eq!(vials, 1, "dose {dose} vial {vial}");
            assert!(dose <= vials as f64 * vial);
        }
    }

    let row = DrugProtocolRow::builder("Vincristine")
        .dose(0.001, CalcFactor::BSA)
        .bsa_m2(1.0)
        .total_doses(1)
        .patients(1)
        .build();
    let cost = DrugCostProfile::new("Vincristine", 10.0, 2_000_000.0);
    let b = compute_row_cost(&row, &cost, 0.04, &[1], &BudgetOptions::default()).unwrap();
    assert_eq!(b.calculated_dose_mg, 0.001);
    assert_eq!(b.vials_per_admin, 1);
    assert_eq!(b.cost_per_admin, 10.0);
}
