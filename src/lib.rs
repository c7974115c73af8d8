//! Workforce analytics over a single HR dataset.
//!
//! Two layers: a data preparation pipeline (`prep`) that turns a raw
//! employee CSV into dimension and fact tables plus a denormalized merged
//! view, and a metrics engine (`metrics`) computing a fixed catalog of
//! descriptive measures (headcount, attrition rate, tenure, demographic
//! breakdowns, correlation-based key influencers) over those tables, each
//! scoped by an optional filter.
//!
//! Everything is single-threaded and in-memory: tables are immutable once
//! prepared and every metric is a pure read, so one prepared model can back
//! a whole interactive session.

pub mod error;
pub mod filter;
pub mod metrics;
pub mod noise;
pub mod prep;

mod data_utils;

pub use error::{HrError, Result};
pub use filter::{MetricFilter, Selection, TenureBand};
pub use metrics::{
    DemographicCategory, HiringPipeline, InfluenceDirection, KeyInfluencer, MetricsEngine,
    MonthlyAttrition, TimeToHire,
};
pub use noise::Noise;
pub use prep::{HrDataModel, HrPipeline, PrepOptions, SEPARATION_REASONS};
