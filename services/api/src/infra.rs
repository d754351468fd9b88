use benefit_engine::config::EngineConfig;
use benefit_engine::error::AppError;
use benefit_engine::telemetry::EngineTelemetry;
use benefit_engine::{BenefitService, EvaluationContext};
use chrono::{NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Loads the configured catalogue and wires it into a service.
pub(crate) fn build_service(
    engine: &EngineConfig,
    telemetry: Arc<dyn EngineTelemetry>,
) -> Result<BenefitService, AppError> {
    let catalogue = engine.load_catalogue()?;
    Ok(BenefitService::new(catalogue, engine.evaluation, telemetry))
}

/// Reads a raw profile from a JSON file, or from stdin when the path is `-`.
pub(crate) fn read_profile(path: &Path) -> Result<Value, AppError> {
    let mut raw = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin().read_to_string(&mut raw)?;
    } else {
        raw = std::fs::read_to_string(path)?;
    }
    serde_json::from_str(&raw).map_err(|err| AppError::Io(err.into()))
}

pub(crate) fn evaluation_context(as_of: Option<NaiveDate>) -> EvaluationContext {
    as_of
        .map(EvaluationContext::on_date)
        .unwrap_or_else(|| EvaluationContext::new(Utc::now()))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_reports_the_offending_value() {
        assert_eq!(
            parse_date(" 2024-06-15 "),
            Ok(NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date"))
        );
        let error = parse_date("15.06.2024").expect_err("german format is rejected");
        assert!(error.contains("15.06.2024"));
    }

    #[test]
    fn evaluation_context_prefers_the_given_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).expect("valid date");
        assert_eq!(evaluation_context(Some(date)).today(), date);
    }

    #[test]
    fn read_profile_rejects_missing_files() {
        let error = read_profile(Path::new("/no/such/profile.json")).expect_err("missing file");
        assert!(matches!(error, AppError::Io(_)));
    }
}
