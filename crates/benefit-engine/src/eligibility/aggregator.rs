use serde::Deserialize;

use super::{EligibilityResult, EligibilityStatus, EvaluationContext, EvaluatorSet};
use crate::catalogue::{Program, ProgramCategory};
use crate::profile::NormalizedProfile;

/// Evaluates every program with the evaluator its model selects and orders the results by
/// score, highest first. Equal scores keep catalogue order; `priority` is carried on each
/// result for display and never reorders ties.
pub fn rank_programs(
    profile: &NormalizedProfile,
    programs: &[Program],
    evaluators: &EvaluatorSet,
    context: &EvaluationContext,
) -> Vec<EligibilityResult> {
    let mut results: Vec<EligibilityResult> = programs
        .iter()
        .map(|program| evaluators.evaluate(profile, program, context))
        .collect();
    results.sort_by(|left, right| right.score.cmp(&left.score));
    results
}

/// Post-filter over ranked results; never re-evaluates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultFilter {
    #[serde(default)]
    pub category: Option<ProgramCategory>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub eligible_only: bool,
}

impl ResultFilter {
    pub fn matches(&self, result: &EligibilityResult) -> bool {
        if let Some(category) = self.category {
            if result.category != category {
                return false;
            }
        }
        if self.eligible_only && result.status != EligibilityStatus::Eligible {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                result.name.to_lowercase().contains(&term)
                    || result.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }

    pub fn apply(&self, results: Vec<EligibilityResult>) -> Vec<EligibilityResult> {
        results
            .into_iter()
            .filter(|result| self.matches(result))
            .collect()
    }
}
