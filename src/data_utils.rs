//! Small DataFrame access helpers shared by the pipeline and the metrics
//! catalog.

use std::collections::HashMap;

use chrono::{Months, NaiveDate};
use polars::prelude::*;

use crate::error::{HrError, Result};

/// Look up a column, mapping the miss to a schema error naming the column.
///
/// Schema problems surface at the point of first use rather than through an
/// upfront validation pass.
pub(crate) fn require<'a>(df: &'a DataFrame, column: &str) -> Result<&'a Series> {
    df.column(column)
        .map_err(|_| HrError::Schema(format!("required column '{column}' is missing")))
}

/// Numeric value at `idx`, or `None` for nulls and non-numeric cells.
pub(crate) fn numeric_at(series: &Series, idx: usize) -> Option<f64> {
    match series.get(idx) {
        Ok(AnyValue::Float64(v)) => Some(v),
        Ok(AnyValue::Float32(v)) => Some(f64::from(v)),
        Ok(AnyValue::Int64(v)) => Some(v as f64),
        Ok(AnyValue::Int32(v)) => Some(f64::from(v)),
        Ok(AnyValue::UInt64(v)) => Some(v as f64),
        Ok(AnyValue::UInt32(v)) => Some(f64::from(v)),
        _ => None,
    }
}

/// String value at `idx`, or `None` for nulls and non-string columns.
pub(crate) fn str_at<'a>(series: &'a Series, idx: usize) -> Option<&'a str> {
    series.str().ok().and_then(|ca| ca.get(idx))
}

/// Distinct non-null values of a string column, in first-encounter order.
pub(crate) fn distinct_strings(series: &Series) -> Result<Vec<String>> {
    let ca = series.str()?;
    let mut seen = std::collections::HashSet::new();
    let mut values = Vec::new();
    for value in ca.into_iter().flatten() {
        if seen.insert(value) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

/// Occurrence counts of the non-null values of a string column.
pub(crate) fn value_counts(series: &Series) -> Result<HashMap<String, usize>> {
    let ca = series.str()?;
    let mut counts = HashMap::new();
    for value in ca.into_iter().flatten() {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    Ok(counts)
}

/// The trailing `n` calendar months ending at `end`, oldest first, as
/// `YYYY-MM` labels.
pub(crate) fn trailing_months(end: NaiveDate, n: u32) -> Vec<String> {
    (0..n)
        .rev()
        .filter_map(|back| end.checked_sub_months(Months::new(back)))
        .map(|date| date.format("%Y-%m").to_string())
        .collect()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
