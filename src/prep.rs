//! Data preparation pipeline.
//!
//! Transforms one raw employee CSV into the analytic data model: cleaned
//! employee records, department and demographics dimensions, separations and
//! headcount fact tables, and a denormalized merged view. Stages run in a
//! fixed order (load, clean, anonymize, dimensions, facts, merge); a failure
//! in any stage aborts the run and leaves no partial model.

use std::hash::Hasher;
use std::path::PathBuf;

use chrono::{Duration, NaiveDate, Utc};
use fnv::FnvHasher;
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::data_utils::{distinct_strings, numeric_at, require, str_at, trailing_months};
use crate::error::{HrError, Result};
use crate::noise::Noise;

/// Columns coerced to Float64 during cleaning.
const NUMERIC_COLUMNS: [&str; 4] = [
    "Age",
    "MonthlyIncome",
    "YearsAtCompany",
    "TotalWorkingYears",
];

/// Demographic columns projected into the demographics dimension when present.
const DEMOGRAPHIC_COLUMNS: [&str; 4] = ["Gender", "MaritalStatus", "EducationField", "Age"];

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PrepOptions {
    /// Fixed reference date separation dates are derived from (reference
    /// date minus tenure in years, at 365 days per year).
    pub reference_date: NaiveDate,
    /// Rows scanned for CSV schema inference.
    pub infer_schema_length: usize,
}

impl Default for PrepOptions {
    fn default() -> Self {
        Self {
            reference_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            infer_schema_length: 1000,
        }
    }
}

/// The prepared tables. Immutable once built; the metrics engine reads them
/// for the lifetime of a session and no update or delete path exists.
#[derive(Debug, Clone)]
pub struct HrDataModel {
    /// Cleaned, anonymized employee records.
    pub employee: DataFrame,
    /// Department dimension: `DepartmentID` (1..N) x `DepartmentName`.
    pub department: DataFrame,
    /// Demographics dimension keyed by `EmployeeID`, with the derived
    /// `AgeGroup` band when `Age` is available.
    pub demographics: DataFrame,
    /// Simulated trailing-12-month headcount snapshots. Illustrative only,
    /// not measured history.
    pub headcount: DataFrame,
    /// One row per departed employee with the inferred separation reason.
    pub separations: DataFrame,
    /// Employee records left-joined with the department dimension; primary
    /// input to the metrics engine.
    pub merged: DataFrame,
}

impl HrDataModel {
    /// Distinct department names, for populating filter choices.
    pub fn department_names(&self) -> Result<Vec<String>> {
        distinct_strings(require(&self.merged, "Department")?)
    }

    /// Distinct job roles, for populating filter choices.
    pub fn job_roles(&self) -> Result<Vec<String>> {
        distinct_strings(require(&self.merged, "JobRole")?)
    }
}

/// Runs the preparation stages against one CSV file.
pub struct HrPipeline {
    data_path: PathBuf,
    options: PrepOptions,
    noise: Noise,
}

impl HrPipeline {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            options: PrepOptions::default(),
            noise: Noise::from_entropy(),
        }
    }

    pub fn with_options(mut self, options: PrepOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the noise source, e.g. with a seeded one for reproducible
    /// headcount snapshots.
    pub fn with_noise(mut self, noise: Noise) -> Self {
        self.noise = noise;
        self
    }

    /// Run the complete pipeline in fixed stage order.
    pub fn prepare(&mut self) -> Result<HrDataModel> {
        let raw = self.load()?;
        let cleaned = Self::clean(raw)?;
        let employee = Self::anonymize(cleaned)?;

        let department = Self::build_department(&employee)?;
        let demographics = Self::build_demographics(&employee)?;

        let headcount = self.build_headcount(&employee)?;
        let separations = self.build_separations(&employee)?;

        let merged = Self::merge(&employee, &department)?;

        info!(
            employees = employee.height(),
            departments = department.height(),
            separations = separations.height(),
            "data model preparation complete"
        );

        Ok(HrDataModel {
            employee,
            department,
            demographics,
            headcount,
            separations,
            merged,
        })
    }

    /// Load the raw employee CSV.
    pub fn load(&self) -> Result<DataFrame> {
        if !self.data_path.exists() {
            return Err(HrError::Load(format!(
                "data file not found: {}",
                self.data_path.display()
            )));
        }

        let df = LazyCsvReader::new(&self.data_path)
            .with_infer_schema_length(Some(self.options.infer_schema_length))
            .finish()
            .map_err(|e| {
                HrError::Load(format!("failed to scan {}: {e}", self.data_path.display()))
            })?
            .collect()
            .map_err(|e| {
                HrError::Load(format!("failed to read {}: {e}", self.data_path.display()))
            })?;

        info!(rows = df.height(), "loaded employee records");
        Ok(df)
    }

    /// Drop constant columns and coerce the declared numeric columns to
    /// Float64, substituting null for unparseable values.
    pub fn clean(mut df: DataFrame) -> Result<DataFrame> {
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        for name in &names {
            if df.column(name)?.n_unique()? <= 1 {
                debug!(column = %name, "dropping constant column");
                df = df.drop(name)?;
            }
        }

        for name in NUMERIC_COLUMNS {
            let Ok(series) = df.column(name) else {
                continue;
            };
            let coerced = match series.dtype() {
                DataType::String => {
                    let values: Vec<Option<f64>> = series
                        .str()?
                        .into_iter()
                        .map(|opt| opt.and_then(|s| s.trim().parse::<f64>().ok()))
                        .collect();
                    Series::new(name, values)
                }
                DataType::Float64 => continue,
                _ => series.cast(&DataType::Float64)?,
            };
            df.with_column(coerced)?;
        }

        Ok(df)
    }

    /// Replace the raw `EmployeeNumber` identifier with a pseudonymous
    /// `EmployeeID`.
    ///
    /// The id is an FNV-1a hash of the stringified value reduced mod
    /// 100 000: deterministic across runs, but with only 100 000 buckets it
    /// is not collision-free and carries no cryptographic guarantee.
    pub fn anonymize(mut df: DataFrame) -> Result<DataFrame> {
        let Ok(source) = df.column("EmployeeNumber") else {
            warn!("no EmployeeNumber column, skipping anonymization");
            return Ok(df);
        };

        let mut ids = Vec::with_capacity(df.height());
        for idx in 0..source.len() {
            let text = match source.get(idx) {
                Ok(AnyValue::String(s)) => s.to_string(),
                Ok(AnyValue::Null) | Err(_) => String::new(),
                Ok(other) => other.to_string(),
            };
            ids.push(pseudonymous_id(&text));
        }

        df.with_column(Series::new("EmployeeID", ids))?;
        Ok(df.drop("EmployeeNumber")?)
    }

    /// Department dimension with ids 1..N in first-encounter order.
    pub fn build_department(df: &DataFrame) -> Result<DataFrame> {
        let names = distinct_strings(require(df, "Department")?)?;
        let ids: Vec<i64> = (1..=names.len() as i64).collect();
        Ok(df![
            "DepartmentID" => ids,
            "DepartmentName" => names,
        ]?)
    }

    /// Demographics dimension: identity plus whichever demographic columns
    /// exist, with the derived age band. If `Age` is absent the `AgeGroup`
    /// column is omitted entirely, never defaulted.
    pub fn build_demographics(df: &DataFrame) -> Result<DataFrame> {
        let mut columns = vec![require(df, "EmployeeID")?.clone()];
        for name in DEMOGRAPHIC_COLUMNS {
            if let Ok(series) = df.column(name) {
                columns.push(series.clone());
            }
        }
        let mut demographics = DataFrame::new(columns)?;

        if let Ok(age) = demographics.column("Age").cloned() {
            let bands: Vec<Option<String>> = (0..age.len())
                .map(|idx| numeric_at(&age, idx).and_then(age_band).map(str::to_string))
                .collect();
            demographics.with_column(Series::new("AgeGroup", bands))?;
        }

        Ok(demographics)
    }

    /// Separations fact: one row per departed employee with an estimated
    /// separation date and a single inferred reason.
    pub fn build_separations(&self, df: &DataFrame) -> Result<DataFrame> {
        require(df, "Attrition")?;
        let departed = df
            .clone()
            .lazy()
            .filter(col("Attrition").eq(lit("Yes")))
            .collect()?;

        // Dataset-wide median, not the departed subset's.
        let median_income = require(df, "MonthlyIncome")?.median().unwrap_or(f64::NAN);

        let ids = require(&departed, "EmployeeID")?;
        let department = require(&departed, "Department")?;
        let job_role = require(&departed, "JobRole")?;
        let tenure = require(&departed, "YearsAtCompany")?;
        let income = require(&departed, "MonthlyIncome")?;
        let job_sat = require(&departed, "JobSatisfaction")?;
        let env_sat = require(&departed, "EnvironmentSatisfaction")?;
        let work_life = require(&departed, "WorkLifeBalance")?;
        let overtime = require(&departed, "OverTime")?;
        let promotion_gap = require(&departed, "YearsSinceLastPromotion")?;

        let mut dates: Vec<Option<String>> = Vec::with_capacity(departed.height());
        let mut reasons: Vec<&'static str> = Vec::with_capacity(departed.height());
        for idx in 0..departed.height() {
            dates.push(numeric_at(tenure, idx).map(|years| {
                let days = (years * 365.0).round() as i64;
                (self.options.reference_date - Duration::days(days))
                    .format("%Y-%m-%d")
                    .to_string()
            }));
            reasons.push(infer_reason(
                numeric_at(job_sat, idx),
                numeric_at(env_sat, idx),
                numeric_at(work_life, idx),
                numeric_at(income, idx),
                median_income,
                str_at(overtime, idx),
                numeric_at(promotion_gap, idx),
            ));
        }

        Ok(DataFrame::new(vec![
            ids.clone(),
            department.clone(),
            job_role.clone(),
            Series::new("SeparationDate", dates),
            Series::new("SeparationReason", reasons),
            income.clone(),
            tenure.clone(),
        ])?)
    }

    /// Simulated monthly headcount snapshots for the trailing 12 months:
    /// the current row count perturbed by bounded noise and floored at 90%
    /// of the base. A placeholder for HRIS history, not a measurement.
    pub fn build_headcount(&mut self, df: &DataFrame) -> Result<DataFrame> {
        let base = df.height() as i64;
        let floor = base as f64 * 0.9;
        let months = trailing_months(Utc::now().date_naive(), 12);
        let counts: Vec<f64> = months
            .iter()
            .map(|_| ((base + self.noise.int_range(-20, 20)) as f64).max(floor))
            .collect();

        Ok(df![
            "Month" => months,
            "Headcount" => counts,
        ]?)
    }

    /// Left-join employee records with the department dimension. Rows with
    /// no matching department keep null `DepartmentID` instead of being
    /// dropped.
    pub fn merge(df: &DataFrame, department: &DataFrame) -> Result<DataFrame> {
        require(df, "Department")?;
        Ok(df
            .clone()
            .lazy()
            .join(
                department.clone().lazy(),
                [col("Department")],
                [col("DepartmentName")],
                JoinArgs::new(JoinType::Left),
            )
            .collect()?)
    }
}

/// Deterministic pseudonymous id: FNV-1a of the stringified identifier,
/// reduced mod 100 000.
fn pseudonymous_id(text: &str) -> i64 {
    let mut hasher = FnvHasher::default();
    hasher.write(text.as_bytes());
    (hasher.finish() % 100_000) as i64
}

/// Age band by range membership over bins (0,25], (25,35], (35,45],
/// (45,55], (55,100]. Ages outside (0,100] fall in no band.
fn age_band(age: f64) -> Option<&'static str> {
    if age <= 0.0 || age > 100.0 {
        None
    } else if age <= 25.0 {
        Some("18-25")
    } else if age <= 35.0 {
        Some("26-35")
    } else if age <= 45.0 {
        Some("36-45")
    } else if age <= 55.0 {
        Some("46-55")
    } else {
        Some("55+")
    }
}

/// Single-label separation reason, first matching predicate wins. A
/// deliberate simplification: a row satisfying several predicates records
/// only the highest-priority one.
fn infer_reason(
    job_sat: Option<f64>,
    env_sat: Option<f64>,
    work_life: Option<f64>,
    income: Option<f64>,
    median_income: f64,
    overtime: Option<&str>,
    promotion_gap: Option<f64>,
) -> &'static str {
    if job_sat.is_some_and(|v| v <= 2.0) {
        "Low Job Satisfaction"
    } else if env_sat.is_some_and(|v| v <= 2.0) {
        "Poor Work Environment"
    } else if work_life.is_some_and(|v| v <= 2.0) {
        "Work-Life Balance"
    } else if income.is_some_and(|v| v < median_income) {
        "Compensation"
    } else if overtime == Some("Yes") {
        "Overtime Concerns"
    } else if promotion_gap.is_some_and(|v| v > 5.0) {
        "Limited Growth"
    } else {
        "Other"
    }
}

/// The seven possible separation reason labels.
pub const SEPARATION_REASONS: [&str; 7] = [
    "Low Job Satisfaction",
    "Poor Work Environment",
    "Work-Life Balance",
    "Compensation",
    "Overtime Concerns",
    "Limited Growth",
    "Other",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_band_boundaries() {
        assert_eq!(age_band(25.0), Some("18-25"));
        assert_eq!(age_band(26.0), Some("26-35"));
        assert_eq!(age_band(55.0), Some("46-55"));
        assert_eq!(age_band(56.0), Some("55+"));
        assert_eq!(age_band(0.0), None);
        assert_eq!(age_band(101.0), None);
    }

    #[test]
    fn reason_priority_order_is_respected() {
        // Low job satisfaction outranks every later predicate.
        assert_eq!(
            infer_reason(
                Some(1.0),
                Some(1.0),
                Some(1.0),
                Some(100.0),
                5000.0,
                Some("Yes"),
                Some(10.0)
            ),
            "Low Job Satisfaction"
        );
        assert_eq!(
            infer_reason(Some(4.0), Some(1.0), Some(1.0), None, f64::NAN, None, None),
            "Poor Work Environment"
        );
        assert_eq!(
            infer_reason(Some(4.0), Some(4.0), Some(2.0), None, f64::NAN, None, None),
            "Work-Life Balance"
        );
        assert_eq!(
            infer_reason(
                Some(4.0),
                Some(4.0),
                Some(4.0),
                Some(1000.0),
                5000.0,
                Some("Yes"),
                None
            ),
            "Compensation"
        );
        assert_eq!(
            infer_reason(
                Some(4.0),
                Some(4.0),
                Some(4.0),
                Some(9000.0),
                5000.0,
                Some("Yes"),
                Some(10.0)
            ),
            "Overtime Concerns"
        );
        assert_eq!(
            infer_reason(
                Some(4.0),
                Some(4.0),
                Some(4.0),
                Some(9000.0),
                5000.0,
                Some("No"),
                Some(6.0)
            ),
            "Limited Growth"
        );
        assert_eq!(
            infer_reason(None, None, None, None, f64::NAN, None, None),
            "Other"
        );
    }

    #[test]
    fn missing_values_never_match_a_predicate() {
        // Null satisfaction scores and a NaN median skip their predicates.
        assert_eq!(
            infer_reason(None, None, None, Some(1000.0), f64::NAN, None, None),
            "Other"
        );
    }

    #[test]
    fn pseudonymous_ids_are_stable_and_bounded() {
        let a = pseudonymous_id("1042");
        let b = pseudonymous_id("1042");
        assert_eq!(a, b);
        assert!((0..100_000).contains(&a));
        assert_ne!(pseudonymous_id("1042"), pseudonymous_id("1043"));
    }

    #[test]
    fn clean_drops_constant_columns_and_coerces_numerics() {
        let df = df![
            "Over18" => ["Y", "Y", "Y"],
            "Age" => ["34", "not-a-number", "41"],
            "Department" => ["Sales", "R&D", "Sales"],
        ]
        .unwrap();

        let cleaned = HrPipeline::clean(df).unwrap();
        assert!(cleaned.column("Over18").is_err());

        let age = cleaned.column("Age").unwrap();
        assert_eq!(age.dtype(), &DataType::Float64);
        assert_eq!(numeric_at(age, 0), Some(34.0));
        assert_eq!(numeric_at(age, 1), None);
        assert_eq!(numeric_at(age, 2), Some(41.0));
    }

    #[test]
    fn anonymize_replaces_the_raw_identifier() {
        let df = df![
            "EmployeeNumber" => [1001i64, 1002, 1003],
            "Department" => ["Sales", "Sales", "R&D"],
        ]
        .unwrap();

        let out = HrPipeline::anonymize(df).unwrap();
        assert!(out.column("EmployeeNumber").is_err());
        let ids = out.column("EmployeeID").unwrap();
        assert_eq!(ids.len(), 3);
        for idx in 0..3 {
            let id = numeric_at(ids, idx).unwrap();
            assert!((0.0..100_000.0).contains(&id));
        }
    }

    #[test]
    fn department_ids_are_contiguous_from_one() {
        let df = df![
            "Department" => ["Sales", "R&D", "Sales", "HR", "R&D"],
        ]
        .unwrap();

        let dim = HrPipeline::build_department(&df).unwrap();
        assert_eq!(dim.height(), 3);
        let ids = dim.column("DepartmentID").unwrap();
        let collected: Vec<f64> = (0..3).filter_map(|i| numeric_at(ids, i)).collect();
        assert_eq!(collected, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn demographics_omits_age_group_without_age() {
        let df = df![
            "EmployeeID" => [1i64, 2],
            "Gender" => ["Male", "Female"],
        ]
        .unwrap();

        let demo = HrPipeline::build_demographics(&df).unwrap();
        assert!(demo.column("AgeGroup").is_err());
        assert!(demo.column("Gender").is_ok());
    }
}
