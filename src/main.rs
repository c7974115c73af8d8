//! Command-line front end: prepare the data model from a CSV and print the
//! metric catalog as JSON, the same entry points an interactive dashboard
//! would call.

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use workforce_insight::{
    DemographicCategory, HrPipeline, MetricFilter, MetricsEngine, Noise, TenureBand,
};

#[derive(Parser, Debug)]
#[command(name = "workforce-insight")]
#[command(about = "HR attrition and workforce analytics over an employee CSV")]
struct Args {
    /// Path to the employee CSV file
    data: std::path::PathBuf,

    /// Restrict metrics to one department
    #[arg(long)]
    department: Option<String>,

    /// Restrict metrics to one job role
    #[arg(long)]
    job_role: Option<String>,

    /// Restrict metrics to a tenure band: "0-2 years", "3-5 years",
    /// "6-10 years" or "10+ years"
    #[arg(long)]
    tenure: Option<String>,

    /// Trailing window in months for separation counts
    #[arg(long, default_value_t = 12)]
    period_months: u32,

    /// Number of key influencers to report
    #[arg(long, default_value_t = 5)]
    top_n: usize,

    /// Seed for the simulated measures (omit for entropy)
    #[arg(long)]
    seed: Option<u64>,
}

fn build_filter(args: &Args) -> anyhow::Result<MetricFilter> {
    let mut filter = MetricFilter::new();
    if let Some(department) = &args.department {
        filter = filter.with_department(department.as_str());
    }
    if let Some(job_role) = &args.job_role {
        filter = filter.with_job_role(job_role.as_str());
    }
    if let Some(label) = &args.tenure {
        let Some(band) = TenureBand::from_label(label) else {
            bail!("unknown tenure band '{label}'");
        };
        filter = filter.with_tenure_band(band);
    }
    Ok(filter)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let filter = build_filter(&args)?;

    let noise = match args.seed {
        Some(seed) => Noise::from_seed(seed),
        None => Noise::from_entropy(),
    };
    let mut pipeline = HrPipeline::new(&args.data).with_noise(noise);
    let model = pipeline
        .prepare()
        .with_context(|| format!("preparing data model from {}", args.data.display()))?;

    let engine_noise = match args.seed {
        Some(seed) => Noise::from_seed(seed),
        None => Noise::from_entropy(),
    };
    let mut engine = MetricsEngine::with_noise(&model, engine_noise);

    let report = json!({
        "filter": {
            "department": args.department,
            "job_role": args.job_role,
            "tenure": args.tenure,
        },
        "headcount": engine.headcount(&filter)?,
        "new_hires": engine.new_hires(&filter)?,
        "separations": engine.separations(&filter, args.period_months)?,
        "attrition_rate": engine.attrition_rate(&filter, args.period_months)?,
        "avg_tenure": engine.avg_tenure(&filter)?,
        "headcount_by_department": engine.headcount_by_department(&filter)?,
        "attrition_by_department": engine.attrition_by_department(&filter)?,
        "attrition_by_month": engine.attrition_by_month(&filter)?,
        "separations_by_reason": engine.separations_by_reason(&filter)?,
        "demographics": {
            "gender": engine.demographics(&filter, DemographicCategory::Gender)?,
            "age_group": engine.demographics(&filter, DemographicCategory::AgeGroup)?,
            "marital_status": engine.demographics(&filter, DemographicCategory::MaritalStatus)?,
        },
        "key_influencers": engine.key_influencers(&filter, args.top_n)?,
        "time_to_hire": engine.time_to_hire(),
        "hiring_pipeline": engine.hiring_pipeline(),
        "filter_choices": {
            "departments": model.department_names()?,
            "job_roles": model.job_roles()?,
        },
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
