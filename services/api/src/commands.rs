use crate::infra::{build_service, evaluation_context, read_profile};
use benefit_engine::catalogue::{Catalogue, ProgramCategory, ProgramId};
use benefit_engine::config::{AppConfig, EngineConfig};
use benefit_engine::error::AppError;
use benefit_engine::profile::format_number;
use benefit_engine::telemetry::NoopTelemetry;
use benefit_engine::{AutofillResult, BenefitService, EligibilityResult, ResultFilter};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// Raw profile JSON file (`-` reads stdin)
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Only show programs of this category
    #[arg(long, value_parser = parse_category)]
    pub(crate) category: Option<ProgramCategory>,
    /// Case-insensitive search over program name and description
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Hide programs that are not conclusively eligible
    #[arg(long)]
    pub(crate) eligible_only: bool,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Catalogue JSON file overriding the configured catalogue
    #[arg(long)]
    pub(crate) catalogue: Option<PathBuf>,
    /// Print machine-readable JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct AutofillArgs {
    /// Raw profile JSON file (`-` reads stdin)
    #[arg(long)]
    pub(crate) profile: PathBuf,
    /// Catalogue id of the program whose form is filled
    #[arg(long)]
    pub(crate) program: String,
    /// Catalogue JSON file overriding the configured catalogue
    #[arg(long)]
    pub(crate) catalogue: Option<PathBuf>,
    /// Print machine-readable JSON instead of a summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CatalogueValidateArgs {
    /// Catalogue JSON file; the embedded standard catalogue when omitted
    pub(crate) path: Option<PathBuf>,
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let service = cli_service(args.catalogue)?;
    let raw = read_profile(&args.profile)?;
    let context = evaluation_context(args.as_of);
    let filter = ResultFilter {
        category: args.category,
        search: args.search,
        eligible_only: args.eligible_only,
    };

    let results = service.list_eligible_programs(&raw, &filter, &context);
    if args.json {
        return print_json(&results);
    }

    println!(
        "Eligibility as of {} ({} programs)",
        context.today(),
        results.len()
    );
    for result in &results {
        render_result(result);
    }
    Ok(())
}

pub(crate) fn run_autofill(args: AutofillArgs) -> Result<(), AppError> {
    let service = cli_service(args.catalogue)?;
    let raw = read_profile(&args.profile)?;

    let result = service.autofill_program(&raw, &ProgramId(args.program))?;
    if args.json {
        return print_json(&result);
    }

    render_autofill(&result);
    Ok(())
}

pub(crate) fn run_catalogue_validate(args: CatalogueValidateArgs) -> Result<(), AppError> {
    let catalogue = match &args.path {
        Some(path) => Catalogue::from_path(path)?,
        None => Catalogue::standard()?,
    };

    let source = args
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "standard catalogue".to_string());
    println!("{source}: {} programs valid", catalogue.len());
    for summary in catalogue.summaries() {
        println!(
            "- {} ({}) [{}] {} criteria, {} form fields",
            summary.name,
            summary.id,
            summary.category.as_str(),
            summary.criteria,
            summary.form_fields
        );
    }
    Ok(())
}

fn cli_service(catalogue: Option<PathBuf>) -> Result<BenefitService, AppError> {
    let mut engine: EngineConfig = AppConfig::load()?.engine;
    if let Some(path) = catalogue {
        engine.catalogue_path = Some(path);
    }
    build_service(&engine, Arc::new(NoopTelemetry))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| AppError::Io(err.into()))?;
    println!("{rendered}");
    Ok(())
}

fn render_result(result: &EligibilityResult) {
    println!(
        "\n{} [{}] score {}/{} -> {}",
        result.name,
        result.category.as_str(),
        result.score,
        result.threshold,
        result.status.label()
    );
    if let Some(amount) = result.monthly_amount {
        println!("  typical payment: {} EUR per month", format_number(amount));
    }
    for line in &result.reasoning {
        println!("  - {line}");
    }
    if !result.missing_data.is_empty() {
        let missing: Vec<&str> = result.missing_data.iter().map(|key| key.as_str()).collect();
        println!("  missing: {}", missing.join(", "));
    }
}

fn render_autofill(result: &AutofillResult) {
    println!(
        "Autofill for {}: {}% complete",
        result.program_id, result.completeness_percent
    );
    for (field, value) in &result.filled_values {
        println!("  {field}: {value}");
    }
    if !result.missing_required_fields.is_empty() {
        println!("Still required:");
        for label in &result.missing_required_fields {
            println!("  - {label}");
        }
    }
}

fn parse_category(raw: &str) -> Result<ProgramCategory, String> {
    ProgramCategory::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ProgramCategory::ordered()
            .iter()
            .map(|category| category.as_str())
            .collect();
        format!("unknown category '{raw}' (expected one of {})", known.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_category_lists_known_values_on_error() {
        assert_eq!(parse_category("Family"), Ok(ProgramCategory::Family));
        let error = parse_category("pension").expect_err("unknown category");
        assert!(error.contains("basic-income"));
    }

    #[test]
    fn validate_accepts_the_standard_catalogue() {
        run_catalogue_validate(CatalogueValidateArgs { path: None }).expect("standard is valid");
    }

    #[test]
    fn validate_reports_missing_files() {
        let error = run_catalogue_validate(CatalogueValidateArgs {
            path: Some(PathBuf::from("/no/such/catalogue.json")),
        })
        .expect_err("missing file");
        assert!(matches!(error, AppError::Catalogue(_)));
    }
}
