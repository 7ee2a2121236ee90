use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Unit in which a protocol states the dose magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoseUnit {
    /// Milligrams per kilogram of body weight
    #[serde(rename = "mg/kg")]
    MgPerKg,
    /// Milligrams per square metre of body surface area
    #[serde(rename = "mg/m2")]
    MgPerM2,
}

impl DoseUnit {
    /// Parse a unit label such as `"mg/kg"`, `"MG/KG"` or `"mg/m²"`
    ///
    /// Returns `None` for labels that are neither a weight- nor a BSA-based unit.
    pub fn parse(label: &str) -> Option<Self> {
        let compact: String = label
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match compact.as_str() {
            "mg/kg" | "mgkg" | "mg/kg/dose" => Some(DoseUnit::MgPerKg),
            "mg/m2" | "mg/m²" | "mgm2" | "mg/m^2" | "mg/m2/dose" => Some(DoseUnit::MgPerM2),
            _ => None,
        }
    }

    /// The body metric this unit multiplies
    pub fn calc_factor(self) -> CalcFactor {
        match self {
            DoseUnit::MgPerKg => CalcFactor::Weight,
            DoseUnit::MgPerM2 => CalcFactor::BSA,
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoseUnit::MgPerKg => write!(f, "mg/kg"),
            DoseUnit::MgPerM2 => write!(f, "mg/m2"),
        }
    }
}

/// Body metric used to scale a per-administration dose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalcFactor {
    /// Scale by cohort weight (kg)
    Weight,
    /// Scale by cohort body surface area (m²)
    #[allow(clippy::upper_case_acronyms)]
    BSA,
}

impl CalcFactor {
    /// Tolerant dispatch on a free-text calculation factor
    ///
    /// Any label containing `bsa`, `m2`, `m²`, `m^2`, `sqm` or `surface`
    /// (case-insensitive) selects [`CalcFactor::BSA`]; everything else is
    /// [`CalcFactor::Weight`]. Every BSA unit accepted by [`DoseUnit::parse`]
    /// selects BSA here too.
    ///
    /// ```rust
    /// use pharmbudget::data::CalcFactor;
    ///
    /// assert_eq!(CalcFactor::from_label("m2/bsa-based"), CalcFactor::BSA);
    /// assert_eq!(CalcFactor::from_label("Body Surface Area"), CalcFactor::BSA);
    /// assert_eq!(CalcFactor::from_label("weight"), CalcFactor::Weight);
    /// ```
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if ["bsa", "m2", "m²", "m^2", "sqm", "surface"]
            .iter()
            .any(|marker| lower.contains(marker))
        {
            CalcFactor::BSA
        } else {
            CalcFactor::Weight
        }
    }

    /// The dose unit that agrees with this factor
    pub fn dose_unit(self) -> DoseUnit {
        match self {
            CalcFactor::Weight => DoseUnit::MgPerKg,
            CalcFactor::BSA => DoseUnit::MgPerM2,
        }
    }
}

impl fmt::Display for CalcFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcFactor::Weight => write!(f, "Weight"),
            CalcFactor::BSA => write!(f, "BSA"),
        }
    }
}

/// One drug / age-cohort / risk-group combination within a trial protocol
///
/// Rows are immutable once built. Construct them with [`DrugProtocolRow::builder`]
/// for manual entry, or through [`crate::data::normalize_row`] for loosely typed input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrugProtocolRow {
    risk_group: String,
    drug_name: String,
    age_group: String,
    estimated_patient_count: u32,
    dose_amount_per_admin: f64,
    dose_unit: DoseUnit,
    calc_factor: CalcFactor,
    total_doses_per_patient: u32,
    cohort_weight_kg: f64,
    cohort_bsa_m2: f64,
}

impl DrugProtocolRow {
    /// Create a new builder for the given drug
    ///
    /// # Example
    ///
    /// ```rust
    /// use pharmbudget::data::{CalcFactor, DrugProtocolRow};
    ///
    /// let row = DrugProtocolRow::builder("Vincristine")
    ///     .age_group("6 months or greater")
    ///     .dose(1.5, CalcFactor::Weight)
    ///     .total_doses(1)
    ///     .patients(130)
    ///     .weight_kg(28.0)
    ///     .build();
    ///
    /// assert_eq!(row.drug_name(), "Vincristine");
    /// assert_eq!(row.body_metric(), 28.0);
    /// ```
    pub fn builder(drug_name: impl Into<String>) -> DrugProtocolRowBuilder {
        DrugProtocolRowBuilder::new(drug_name)
    }

    pub fn risk_group(&self) -> &str {
        &self.risk_group
    }

    pub fn drug_name(&self) -> &str {
        &self.drug_name
    }

    pub fn age_group(&self) -> &str {
        &self.age_group
    }

    pub fn estimated_patient_count(&self) -> u32 {
        self.estimated_patient_count
    }

    pub fn dose_amount_per_admin(&self) -> f64 {
        self.dose_amount_per_admin
    }

    pub fn dose_unit(&self) -> DoseUnit {
        self.dose_unit
    }

    pub fn calc_factor(&self) -> CalcFactor {
        self.calc_factor
    }

    pub fn total_doses_per_patient(&self) -> u32 {
        self.total_doses_per_patient
    }

    pub fn cohort_weight_kg(&self) -> f64 {
        self.cohort_weight_kg
    }

    pub fn cohort_bsa_m2(&self) -> f64 {
        self.cohort_bsa_m2
    }

    /// The body metric selected by the calculation factor
    pub fn body_metric(&self) -> f64 {
        match self.calc_factor {
            CalcFactor::BSA => self.cohort_bsa_m2,
            CalcFactor::Weight => self.cohort_weight_kg,
        }
    }
}

/// Builder for [`DrugProtocolRow`] with a fluent API
///
/// Unset body metrics default to 30.0 kg and 1.0 m².
#[derive(Debug, Clone)]
pub struct DrugProtocolRowBuilder {
    row: DrugProtocolRow,
}

impl DrugProtocolRowBuilder {
    pub fn new(drug_name: impl Into<String>) -> Self {
        Self {
            row: DrugProtocolRow {
                risk_group: String::new(),
                drug_name: drug_name.into(),
                age_group: String::new(),
                estimated_patient_count: 0,
                dose_amount_per_admin: 0.0,
                dose_unit: DoseUnit::MgPerKg,
                calc_factor: CalcFactor::Weight,
                total_doses_per_patient: 0,
                cohort_weight_kg: 30.0,
                cohort_bsa_m2: 1.0,
            },
        }
    }

    pub fn risk_group(mut self, risk_group: impl Into<String>) -> Self {
        self.row.risk_group = risk_group.into();
        self
    }

    pub fn age_group(mut self, age_group: impl Into<String>) -> Self {
        self.row.age_group = age_group.into();
        self
    }

    /// Set the dose per administration and the factor it scales with
    ///
    /// The dose unit is derived from the factor so the two always agree.
    pub fn dose(mut self, amount: f64, factor: CalcFactor) -> Self {
        self.row.dose_amount_per_admin = amount;
        self.row.calc_factor = factor;
        self.row.dose_unit = factor.dose_unit();
        self
    }

    pub fn total_doses(mut self, total_doses: u32) -> Self {
        self.row.total_doses_per_patient = total_doses;
        self
    }

    pub fn patients(mut self, patients: u32) -> Self {
        self.row.estimated_patient_count = patients;
        self
    }

    pub fn weight_kg(mut self, weight_kg: f64) -> Self {
        self.row.cohort_weight_kg = weight_kg;
        self
    }

    pub fn bsa_m2(mut self, bsa_m2: f64) -> Self {
        self.row.cohort_bsa_m2 = bsa_m2;
        self
    }

    pub fn build(self) -> DrugProtocolRow {
        self.row
    }
}

/// Pricing category, used for category-level inflation overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrugCategory {
    Specialty,
    Traditional,
}

/// Per-drug pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugCostProfile {
    /// Drug identifier, joined case-insensitively against protocol rows
    pub drug_name: String,
    /// Price of one vial, in currency units
    pub cost_per_vial: f64,
    /// Drug content of one vial (mg)
    pub vial_size_mg: f64,
    /// Optional pricing category
    #[serde(default)]
    pub category: Option<DrugCategory>,
}

impl DrugCostProfile {
    pub fn new(drug_name: impl Into<String>, cost_per_vial: f64, vial_size_mg: f64) -> Self {
        Self {
            drug_name: drug_name.into(),
            cost_per_vial,
            vial_size_mg,
            category: None,
        }
    }

    /// Single price applied to every drug: $15.58 per 1 mg vial
    pub fn global_default() -> Self {
        Self::new("*", 15.58, 1.0)
    }

    pub fn with_category(mut self, category: DrugCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// Lookup key for drug names: trimmed and lowercased
pub(crate) fn drug_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Cost profiles keyed by drug name
///
/// Lookups ignore surrounding whitespace and letter case, since extracted drug
/// names rarely match the cost sheet's casing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostProfiles {
    profiles: HashMap<String, DrugCostProfile>,
}

impl CostProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a profile, replacing any existing profile for the same drug
    pub fn insert(&mut self, profile: DrugCostProfile) -> Option<DrugCostProfile> {
        self.profiles.insert(drug_key(&profile.drug_name), profile)
    }

    pub fn with_profile(mut self, profile: DrugCostProfile) -> Self {
        self.insert(profile);
        self
    }

    pub fn get(&self, drug_name: &str) -> Option<&DrugCostProfile> {
        self.profiles.get(&drug_key(drug_name))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrugCostProfile> {
        self.profiles.values()
    }
}

impl FromIterator<DrugCostProfile> for CostProfiles {
    fn from_iter<I: IntoIterator<Item = DrugCostProfile>>(iter: I) -> Self {
        let mut profiles = CostProfiles::new();
        for profile in iter {
            profiles.insert(profile);
        }
        profiles
    }
}
