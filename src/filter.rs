//! Metric filters.
//!
//! Every catalog function accepts a `MetricFilter` restricting the view it
//! computes over. The accepted constraints are named fields rather than a
//! loose column-name map, so a typo in a filter key is a compile error and
//! the supported keys are discoverable from the type.

use polars::prelude::*;

use crate::error::Result;

/// A single value or a set of values for an equality/membership constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    One(String),
    Many(Vec<String>),
}

impl Selection {
    fn expr(&self, column: &str) -> Expr {
        match self {
            Selection::One(value) => col(column).eq(lit(value.clone())),
            Selection::Many(values) => values
                .iter()
                .map(|v| col(column).eq(lit(v.clone())))
                .reduce(|a, b| a.or(b))
                // An empty set admits no rows.
                .unwrap_or_else(|| lit(false)),
        }
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        Selection::One(value.to_string())
    }
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        Selection::One(value)
    }
}

impl From<Vec<String>> for Selection {
    fn from(values: Vec<String>) -> Self {
        Selection::Many(values)
    }
}

/// Tenure ranges offered by the dashboard's tenure filter.
///
/// Bands are keyed off `YearsAtCompany`: `[0,3)`, `[3,6)`, `[6,10]`, `(10,∞)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenureBand {
    ZeroToTwo,
    ThreeToFive,
    SixToTen,
    OverTen,
}

impl TenureBand {
    pub fn label(self) -> &'static str {
        match self {
            TenureBand::ZeroToTwo => "0-2 years",
            TenureBand::ThreeToFive => "3-5 years",
            TenureBand::SixToTen => "6-10 years",
            TenureBand::OverTen => "10+ years",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "0-2 years" => Some(TenureBand::ZeroToTwo),
            "3-5 years" => Some(TenureBand::ThreeToFive),
            "6-10 years" => Some(TenureBand::SixToTen),
            "10+ years" => Some(TenureBand::OverTen),
            _ => None,
        }
    }

    fn expr(self) -> Expr {
        let tenure = col("YearsAtCompany");
        match self {
            TenureBand::ZeroToTwo => tenure.lt(lit(3.0)),
            TenureBand::ThreeToFive => tenure.clone().gt_eq(lit(3.0)).and(tenure.lt(lit(6.0))),
            TenureBand::SixToTen => tenure.clone().gt_eq(lit(6.0)).and(tenure.lt_eq(lit(10.0))),
            TenureBand::OverTen => tenure.gt(lit(10.0)),
        }
    }
}

impl std::fmt::Display for TenureBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional constraints applied to the merged view and the separations fact.
///
/// Absent fields impose no constraint. Applying a filter never mutates the
/// underlying table; it produces a restricted copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFilter {
    pub department: Option<Selection>,
    pub job_role: Option<Selection>,
    pub tenure_band: Option<TenureBand>,
}

impl MetricFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_department(mut self, department: impl Into<Selection>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_job_role(mut self, job_role: impl Into<Selection>) -> Self {
        self.job_role = Some(job_role.into());
        self
    }

    pub fn with_tenure_band(mut self, band: TenureBand) -> Self {
        self.tenure_band = Some(band);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.department.is_none() && self.job_role.is_none() && self.tenure_band.is_none()
    }

    /// Compose two filters field-wise; set fields of `other` win.
    pub fn merge(&self, other: &MetricFilter) -> MetricFilter {
        MetricFilter {
            department: other.department.clone().or_else(|| self.department.clone()),
            job_role: other.job_role.clone().or_else(|| self.job_role.clone()),
            tenure_band: other.tenure_band.or(self.tenure_band),
        }
    }

    /// Restrict `df` to rows matching every set constraint.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut exprs = Vec::new();
        if let Some(department) = &self.department {
            exprs.push(department.expr("Department"));
        }
        if let Some(job_role) = &self.job_role {
            exprs.push(job_role.expr("JobRole"));
        }
        if let Some(band) = self.tenure_band {
            exprs.push(band.expr());
        }

        let Some(predicate) = exprs.into_iter().reduce(|a, b| a.and(b)) else {
            return Ok(df.clone());
        };

        Ok(df.clone().lazy().filter(predicate).collect()?)
    }
}
