use std::sync::Arc;

use serde_json::Value;

use crate::autofill::{autofill, missing_for_schema, AutofillResult};
use crate::catalogue::{Catalogue, CatalogueStore, ProgramId, ProgramSummary};
use crate::eligibility::{
    rank_programs, EligibilityResult, EvaluationConfig, EvaluationContext, EvaluatorSet,
    ResultFilter,
};
use crate::profile::{
    normalize_with_report, profile_completion, NormalizedProfile, ProfileCompletion,
    CORE_PROFILE_KEYS,
};
use crate::telemetry::{EngineEvent, EngineTelemetry};

/// Facade composing the normalizer, evaluators, aggregator and autofill mapper over a
/// swappable catalogue snapshot.
pub struct BenefitService {
    catalogue: CatalogueStore,
    evaluators: EvaluatorSet,
    telemetry: Arc<dyn EngineTelemetry>,
}

impl BenefitService {
    pub fn new(
        catalogue: Catalogue,
        config: EvaluationConfig,
        telemetry: Arc<dyn EngineTelemetry>,
    ) -> Self {
        Self {
            catalogue: CatalogueStore::new(catalogue),
            evaluators: EvaluatorSet::new(config),
            telemetry,
        }
    }

    pub fn catalogue(&self) -> Arc<Catalogue> {
        self.catalogue.snapshot()
    }

    pub fn program_summaries(&self) -> Vec<ProgramSummary> {
        self.catalogue.snapshot().summaries()
    }

    /// Evaluates every catalogue program for `raw`, ranked by score and then filtered.
    pub fn list_eligible_programs(
        &self,
        raw: &Value,
        filter: &ResultFilter,
        context: &EvaluationContext,
    ) -> Vec<EligibilityResult> {
        let catalogue = self.catalogue.snapshot();
        let profile = self.normalize(raw);

        let ranked = rank_programs(&profile, catalogue.programs(), &self.evaluators, context);
        for result in &ranked {
            self.telemetry.record(EngineEvent::ProgramEvaluated {
                program_id: result.program_id.to_string(),
                score: result.score,
                status: result.status.label(),
                missing: result.missing_data.len(),
            });
        }

        let evaluated = ranked.len();
        let results = filter.apply(ranked);
        self.telemetry.record(EngineEvent::ProgramsRanked {
            evaluated,
            returned: results.len(),
        });
        results
    }

    /// Prefills the form of `program_id` from `raw`.
    pub fn autofill_program(
        &self,
        raw: &Value,
        program_id: &ProgramId,
    ) -> Result<AutofillResult, ServiceError> {
        let catalogue = self.catalogue.snapshot();
        let program = catalogue
            .get(program_id)
            .ok_or_else(|| ServiceError::UnknownProgram(program_id.clone()))?;
        let profile = self.normalize(raw);

        let result = autofill(&profile, &program.id, &program.form);
        self.telemetry.record(EngineEvent::AutofillCompleted {
            program_id: result.program_id.to_string(),
            completeness_percent: result.completeness_percent,
            missing_required: result.missing_required_fields.len(),
        });
        Ok(result)
    }

    pub fn profile_completion(&self, raw: &Value) -> ProfileCompletion {
        profile_completion(&self.normalize(raw), CORE_PROFILE_KEYS)
    }

    /// Labels of required fields of `program_id` the profile cannot fill yet.
    pub fn missing_fields_for_program(
        &self,
        raw: &Value,
        program_id: &ProgramId,
    ) -> Result<Vec<String>, ServiceError> {
        let catalogue = self.catalogue.snapshot();
        let program = catalogue
            .get(program_id)
            .ok_or_else(|| ServiceError::UnknownProgram(program_id.clone()))?;
        Ok(missing_for_schema(&self.normalize(raw), &program.form))
    }

    /// Swaps in a new catalogue. Calls already running keep the snapshot they started with.
    pub fn replace_catalogue(&self, catalogue: Catalogue) {
        let current = catalogue.len();
        let previous = self.catalogue.replace(catalogue);
        self.telemetry.record(EngineEvent::CatalogueReplaced {
            previous: previous.len(),
            current,
        });
    }

    fn normalize(&self, raw: &Value) -> NormalizedProfile {
        let report = normalize_with_report(raw);
        self.telemetry.record(EngineEvent::ProfileNormalized {
            resolved: report.profile.len(),
            rejected: report.rejections.len(),
        });
        report.profile
    }
}

/// Error raised by the benefit service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("unknown program '{0}'")]
    UnknownProgram(ProgramId),
}
