//! Metric catalog.
//!
//! A fixed set of descriptive measures computed over the prepared data
//! model. Every function is a pure read over the immutable tables, scoped by
//! a `MetricFilter`; the simulated measures additionally draw from the
//! engine's noise source.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use itertools::Itertools;
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::data_utils::{
    distinct_strings, numeric_at, require, round1, round2, str_at, trailing_months, value_counts,
};
use crate::error::Result;
use crate::filter::MetricFilter;
use crate::noise::Noise;
use crate::prep::HrDataModel;

/// Numeric attributes screened for correlation with attrition.
const INFLUENCER_COLUMNS: [&str; 10] = [
    "Age",
    "MonthlyIncome",
    "YearsAtCompany",
    "TotalWorkingYears",
    "JobSatisfaction",
    "EnvironmentSatisfaction",
    "WorkLifeBalance",
    "YearsSinceLastPromotion",
    "DistanceFromHome",
    "PercentSalaryHike",
];

/// Demographic breakdown selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemographicCategory {
    Gender,
    AgeGroup,
    MaritalStatus,
}

impl DemographicCategory {
    fn column(self) -> &'static str {
        match self {
            DemographicCategory::Gender => "Gender",
            DemographicCategory::AgeGroup => "AgeGroup",
            DemographicCategory::MaritalStatus => "MaritalStatus",
        }
    }
}

/// Whether an attribute's correlation raises or lowers attrition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InfluenceDirection {
    Increases,
    Decreases,
}

/// One ranked attrition influencer.
#[derive(Debug, Clone, Serialize)]
pub struct KeyInfluencer {
    pub factor: String,
    /// Absolute Pearson correlation scaled to 0..100, 2 decimals.
    pub impact: f64,
    pub direction: InfluenceDirection,
}

/// One point of the simulated monthly attrition trend.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyAttrition {
    pub month: String,
    pub rate: f64,
}

/// Synthetic time-to-hire summary, in days. Placeholder for ATS data.
#[derive(Debug, Clone, Serialize)]
pub struct TimeToHire {
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Synthetic hiring funnel. Placeholder for ATS data.
#[derive(Debug, Clone, Serialize)]
pub struct HiringPipeline {
    pub applied: u64,
    pub screened: u64,
    pub interviewed: u64,
    pub offered: u64,
    pub hired: u64,
}

/// Computes the metric catalog against one prepared data model.
///
/// Holds a read-only reference to the tables for the lifetime of a session;
/// nothing here mutates them.
pub struct MetricsEngine<'a> {
    model: &'a HrDataModel,
    noise: Noise,
    today: NaiveDate,
}

impl<'a> MetricsEngine<'a> {
    pub fn new(model: &'a HrDataModel) -> Self {
        Self::with_noise(model, Noise::from_entropy())
    }

    /// Engine with an injected noise source for the simulated measures.
    pub fn with_noise(model: &'a HrDataModel, noise: Noise) -> Self {
        Self {
            model,
            noise,
            today: Utc::now().date_naive(),
        }
    }

    /// Pin "now" for trailing-window queries and month labels.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Count of active employees in the filtered view.
    pub fn headcount(&self, filter: &MetricFilter) -> Result<usize> {
        Ok(self.active_view(filter)?.height())
    }

    /// Employees with under a year of tenure. A proxy for hires, not an
    /// actual hire-date measurement.
    pub fn new_hires(&self, filter: &MetricFilter) -> Result<usize> {
        let view = filter.apply(&self.model.merged)?;
        Ok(view
            .lazy()
            .filter(col("YearsAtCompany").lt(lit(1.0)))
            .collect()?
            .height())
    }

    /// Count of separations in the filtered fact table. A window narrower
    /// than 12 months restricts to separation dates within
    /// `today - period_months * 30 days`; a month is treated as exactly 30
    /// days, not calendar-accurate.
    pub fn separations(&self, filter: &MetricFilter, period_months: u32) -> Result<usize> {
        let mut separations = filter.apply(&self.model.separations)?;
        if period_months < 12 {
            let cutoff = (self.today - Duration::days(i64::from(period_months) * 30))
                .format("%Y-%m-%d")
                .to_string();
            separations = separations
                .lazy()
                .filter(col("SeparationDate").gt_eq(lit(cutoff)))
                .collect()?;
        }
        Ok(separations.height())
    }

    /// `100 * separations / headcount` for the same filter and window;
    /// 0 when headcount is 0.
    pub fn attrition_rate(&self, filter: &MetricFilter, period_months: u32) -> Result<f64> {
        let separations = self.separations(filter, period_months)?;
        let headcount = self.headcount(filter)?;
        if headcount == 0 {
            return Ok(0.0);
        }
        Ok(round2(separations as f64 / headcount as f64 * 100.0))
    }

    /// Mean tenure in years across active filtered employees; 0 when none.
    pub fn avg_tenure(&self, filter: &MetricFilter) -> Result<f64> {
        let active = self.active_view(filter)?;
        if active.height() == 0 {
            return Ok(0.0);
        }
        let mean = require(&active, "YearsAtCompany")?.mean().unwrap_or(0.0);
        Ok(round2(mean))
    }

    /// Active headcount grouped by department.
    pub fn headcount_by_department(&self, filter: &MetricFilter) -> Result<HashMap<String, usize>> {
        let active = self.active_view(filter)?;
        let grouped = active
            .lazy()
            .group_by([col("Department")])
            .agg([len().cast(DataType::Int64).alias("Headcount")])
            .collect()?;

        let departments = require(&grouped, "Department")?;
        let counts = require(&grouped, "Headcount")?;
        let mut result = HashMap::new();
        for idx in 0..grouped.height() {
            if let (Some(name), Some(count)) = (str_at(departments, idx), numeric_at(counts, idx)) {
                result.insert(name.to_string(), count as usize);
            }
        }
        Ok(result)
    }

    /// Attrition rate per department observed in the filtered view, with
    /// the department constraint merged into the caller's filter.
    pub fn attrition_by_department(&self, filter: &MetricFilter) -> Result<HashMap<String, f64>> {
        let view = filter.apply(&self.model.merged)?;
        let departments = distinct_strings(require(&view, "Department")?)?;

        let mut result = HashMap::new();
        for department in departments {
            let scoped = filter.merge(&MetricFilter::new().with_department(department.clone()));
            let rate = self.attrition_rate(&scoped, 12)?;
            result.insert(department, rate);
        }
        Ok(result)
    }

    /// Simulated monthly attrition trend: the base filtered rate perturbed
    /// by uniform noise in [-2, 2), floored at 0. Not historical fact.
    pub fn attrition_by_month(&mut self, filter: &MetricFilter) -> Result<Vec<MonthlyAttrition>> {
        let base = self.attrition_rate(filter, 12)?;
        Ok(trailing_months(self.today, 12)
            .into_iter()
            .map(|month| MonthlyAttrition {
                month,
                rate: round2((base + self.noise.uniform(-2.0, 2.0)).max(0.0)),
            })
            .collect())
    }

    /// Separation counts grouped by the single recorded reason label.
    pub fn separations_by_reason(&self, filter: &MetricFilter) -> Result<HashMap<String, usize>> {
        let separations = filter.apply(&self.model.separations)?;
        value_counts(require(&separations, "SeparationReason")?)
    }

    /// Active headcount grouped by a demographic category. Returns an empty
    /// mapping when the category's source column is unavailable.
    pub fn demographics(
        &self,
        filter: &MetricFilter,
        category: DemographicCategory,
    ) -> Result<HashMap<String, usize>> {
        let active = self.active_view(filter)?;

        if category == DemographicCategory::AgeGroup {
            let bands_available = self.model.demographics.column("AgeGroup").is_ok()
                && self.model.demographics.column("EmployeeID").is_ok()
                && active.column("EmployeeID").is_ok();
            if !bands_available {
                debug!("age bands unavailable, returning empty demographics");
                return Ok(HashMap::new());
            }

            let bands = self
                .model
                .demographics
                .clone()
                .lazy()
                .select([col("EmployeeID"), col("AgeGroup")]);
            let joined = active
                .lazy()
                .join(
                    bands,
                    [col("EmployeeID")],
                    [col("EmployeeID")],
                    JoinArgs::new(JoinType::Left),
                )
                .collect()?;
            return value_counts(require(&joined, "AgeGroup")?);
        }

        match active.column(category.column()) {
            Ok(series) => value_counts(series),
            Err(_) => Ok(HashMap::new()),
        }
    }

    /// Synthetic time-to-hire figures; ignores the filter entirely.
    pub fn time_to_hire(&mut self) -> TimeToHire {
        let average = self.noise.uniform(25.0, 45.0);
        TimeToHire {
            average: round1(average),
            median: round1(average - 5.0),
            min: round1(average - 15.0),
            max: round1(average + 15.0),
        }
    }

    /// Synthetic fixed-ratio hiring funnel; ignores the filter entirely.
    pub fn hiring_pipeline(&self) -> HiringPipeline {
        let base = 1000u64;
        HiringPipeline {
            applied: base,
            screened: (base as f64 * 0.6) as u64,
            interviewed: (base as f64 * 0.3) as u64,
            offered: (base as f64 * 0.15) as u64,
            hired: (base as f64 * 0.1) as u64,
        }
    }

    /// Attributes ranked by the magnitude of their Pearson correlation with
    /// the departed/active indicator over the filtered view. Attributes with
    /// an undefined correlation (zero variance, too few paired observations)
    /// are silently excluded.
    pub fn key_influencers(
        &self,
        filter: &MetricFilter,
        top_n: usize,
    ) -> Result<Vec<KeyInfluencer>> {
        let view = filter.apply(&self.model.merged)?;
        let attrition = require(&view, "Attrition")?;
        let indicator: Vec<f64> = (0..view.height())
            .map(|idx| {
                if str_at(attrition, idx) == Some("Yes") {
                    1.0
                } else {
                    0.0
                }
            })
            .collect();

        let mut correlations: Vec<(&str, f64)> = Vec::new();
        for name in INFLUENCER_COLUMNS {
            let Ok(series) = view.column(name) else {
                continue;
            };
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for idx in 0..view.height() {
                if let Some(value) = numeric_at(series, idx) {
                    xs.push(value);
                    ys.push(indicator[idx]);
                }
            }
            if let Some(r) = pearson(&xs, &ys) {
                correlations.push((name, r));
            }
        }

        Ok(correlations
            .into_iter()
            .sorted_by(|a, b| {
                b.1.abs()
                    .partial_cmp(&a.1.abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .take(top_n)
            .map(|(factor, r)| KeyInfluencer {
                factor: factor.to_string(),
                impact: round2(r.abs() * 100.0),
                direction: if r > 0.0 {
                    InfluenceDirection::Increases
                } else {
                    InfluenceDirection::Decreases
                },
            })
            .collect())
    }

    /// Active (non-departed) rows of the filtered merged view.
    fn active_view(&self, filter: &MetricFilter) -> Result<DataFrame> {
        let view = filter.apply(&self.model.merged)?;
        Ok(view
            .lazy()
            .filter(col("Attrition").eq(lit("No")))
            .collect()?)
    }
}

/// Pearson correlation; `None` when undefined (fewer than two pairs or zero
/// variance on either side).
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r)
}
