use super::criteria::{apply_exclusion, check_criterion, CriterionCheck};
use super::{
    push_missing, result_for, EligibilityResult, EligibilityStatus, EvaluationContext, Evaluator,
};
use crate::catalogue::Program;
use crate::profile::NormalizedProfile;

/// Weighted flat rule evaluator. Unevaluable criteria stay out of both sides of the score,
/// and a holding exclusion makes the program ineligible whatever the score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleSetEvaluator {
    default_threshold: u8,
}

impl RuleSetEvaluator {
    pub fn new(default_threshold: u8) -> Self {
        Self {
            default_threshold: default_threshold.min(100),
        }
    }

    fn threshold_for(&self, program: &Program) -> u8 {
        program.threshold.unwrap_or(self.default_threshold)
    }
}

impl Default for RuleSetEvaluator {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Evaluator for RuleSetEvaluator {
    fn evaluate(
        &self,
        profile: &NormalizedProfile,
        program: &Program,
        context: &EvaluationContext,
    ) -> EligibilityResult {
        let today = context.today();
        let threshold = self.threshold_for(program);
        let mut numerator = 0.0_f64;
        let mut denominator = 0.0_f64;
        let mut reasoning = Vec::with_capacity(program.rule_set.criteria().len() + 1);
        let mut missing = Vec::new();

        for criterion in program.rule_set.criteria() {
            let check = check_criterion(criterion, profile, today);
            reasoning.push(check.reasoning(criterion));
            match check {
                CriterionCheck::Missing(key) => push_missing(&mut missing, key),
                CriterionCheck::Passed(_) => {
                    numerator += criterion.weight;
                    denominator += criterion.weight;
                }
                CriterionCheck::Failed(_) => denominator += criterion.weight,
            }
        }

        let mut excluded = false;
        for exclusion in &program.exclusions {
            excluded |= apply_exclusion(exclusion, profile, today, &mut reasoning, &mut missing);
        }

        if program.rule_set.is_empty() {
            reasoning.push("no criteria defined for this program".to_string());
        } else if denominator <= 0.0 {
            reasoning.push("no criterion could be evaluated".to_string());
        }

        let score = weighted_score(numerator, denominator);
        let eligible = !excluded && denominator > 0.0 && score >= threshold;
        let status = if excluded {
            EligibilityStatus::Ineligible
        } else if !missing.is_empty() || denominator <= 0.0 {
            EligibilityStatus::Unknown
        } else if score >= threshold {
            EligibilityStatus::Eligible
        } else {
            EligibilityStatus::Ineligible
        };

        result_for(program, score, threshold, eligible, status, reasoning, missing)
    }
}

/// `round(100 * numerator / denominator)`, 0 for an empty denominator.
fn weighted_score(numerator: f64, denominator: f64) -> u8 {
    if denominator <= 0.0 {
        return 0;
    }
    (100.0 * numerator / denominator).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{Catalogue, ProgramId};
    use crate::profile::{normalize, ProfileKey};
    use chrono::NaiveDate;
    use serde_json::{json, Value};

    fn context() -> EvaluationContext {
        EvaluationContext::on_date(NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date"))
    }

    fn program(criteria: Value) -> Program {
        let raw = json!({
            "programs": [{
                "id": "probe",
                "name": "Probe",
                "category": "basic-income",
                "criteria": criteria
            }]
        });
        let catalogue = Catalogue::from_json(&raw.to_string()).expect("catalogue");
        catalogue
            .get(&ProgramId("probe".to_string()))
            .cloned()
            .expect("probe program")
    }

    fn buergergeld_like() -> Program {
        program(json!([
            { "id": "income", "label": "Income", "kind": "income-ceiling", "comparisonValue": 1000, "profileKey": "monthlyNetIncome" },
            { "id": "status", "label": "Status", "kind": "employment-status-equals", "comparisonValue": "unemployed", "profileKey": "employmentStatus" }
        ]))
    }

    #[test]
    fn full_match_scores_one_hundred() {
        let profile =
            normalize(&json!({ "monthlyNetIncome": 900, "employmentStatus": "unemployed" }));
        let result =
            RuleSetEvaluator::default().evaluate(&profile, &buergergeld_like(), &context());

        assert_eq!(result.score, 100);
        assert!(result.eligible);
        assert_eq!(result.status, EligibilityStatus::Eligible);
        assert!(result.missing_data.is_empty());
        assert_eq!(result.reasoning.len(), 2);
    }

    #[test]
    fn unevaluable_criteria_are_excluded_from_the_score() {
        let profile = normalize(&json!({ "monthlyNetIncome": 900 }));
        let result =
            RuleSetEvaluator::default().evaluate(&profile, &buergergeld_like(), &context());

        assert_eq!(result.score, 100);
        assert_eq!(result.missing_data, vec![ProfileKey::EmploymentStatus]);
        assert_eq!(result.status, EligibilityStatus::Unknown);
        assert!(result.reasoning[1].contains("not evaluated"));
    }

    #[test]
    fn empty_rule_set_is_unknown_with_zero_score() {
        let result = RuleSetEvaluator::default().evaluate(
            &normalize(&json!({ "monthlyNetIncome": 900 })),
            &program(json!([])),
            &context(),
        );

        assert_eq!(result.score, 0);
        assert!(!result.eligible);
        assert_eq!(result.status, EligibilityStatus::Unknown);
        assert_eq!(result.reasoning, vec!["no criteria defined for this program"]);
    }

    #[test]
    fn weights_shape_the_score() {
        let weighted = program(json!([
            { "id": "income", "kind": "income-ceiling", "comparisonValue": 1000, "profileKey": "monthlyNetIncome", "weight": 3 },
            { "id": "status", "kind": "employment-status-equals", "comparisonValue": "unemployed", "profileKey": "employmentStatus" }
        ]));
        let profile =
            normalize(&json!({ "monthlyNetIncome": 900, "employmentStatus": "employed" }));

        let result = RuleSetEvaluator::default().evaluate(&profile, &weighted, &context());

        assert_eq!(result.score, 75);
        assert_eq!(result.status, EligibilityStatus::Eligible);
    }

    #[test]
    fn failing_below_threshold_is_ineligible() {
        let profile =
            normalize(&json!({ "monthlyNetIncome": 2400, "employmentStatus": "employed" }));
        let result = RuleSetEvaluator::new(50).evaluate(&profile, &buergergeld_like(), &context());

        assert_eq!(result.score, 0);
        assert!(!result.eligible);
        assert_eq!(result.status, EligibilityStatus::Ineligible);
    }

    #[test]
    fn missing_keys_are_deduplicated_in_order() {
        let repeated = program(json!([
            { "id": "adult", "kind": "age-floor", "comparisonValue": 18 },
            { "id": "income", "kind": "income-floor", "comparisonValue": 100, "profileKey": "monthlyNetIncome" },
            { "id": "young", "kind": "age-ceiling", "comparisonValue": 45 }
        ]));

        let result =
            RuleSetEvaluator::default().evaluate(&normalize(&json!({})), &repeated, &context());

        assert_eq!(
            result.missing_data,
            vec![ProfileKey::DateOfBirth, ProfileKey::MonthlyNetIncome]
        );
        assert_eq!(result.score, 0);
        assert_eq!(result.reasoning.len(), 4);
    }

    fn with_income_exclusion() -> Program {
        let raw = json!({
            "programs": [{
                "id": "familie",
                "name": "Familie",
                "category": "family",
                "criteria": [
                    { "id": "kids", "kind": "has-children", "profileKey": "numberOfChildren" }
                ],
                "exclusions": [
                    { "id": "high-income", "label": "High income", "kind": "income-floor", "comparisonValue": 5000, "profileKey": "monthlyNetIncome" }
                ]
            }]
        });
        Catalogue::from_json(&raw.to_string()).expect("catalogue").programs()[0].clone()
    }

    #[test]
    fn holding_exclusion_makes_the_program_ineligible() {
        let profile = normalize(&json!({ "numberOfChildren": 2, "monthlyNetIncome": 20000 }));
        let program = with_income_exclusion();
        let result = RuleSetEvaluator::default().evaluate(&profile, &program, &context());

        assert_eq!(result.score, 100);
        assert!(!result.eligible);
        assert_eq!(result.status, EligibilityStatus::Ineligible);
        assert_eq!(
            result.reasoning.last().map(String::as_str),
            Some("High income: income 20000 meets floor 5000 (excludes)")
        );
    }

    #[test]
    fn exclusions_that_do_not_hold_leave_the_verdict_alone() {
        let program = with_income_exclusion();

        let modest = normalize(&json!({ "numberOfChildren": 2, "monthlyNetIncome": 1800 }));
        let result = RuleSetEvaluator::default().evaluate(&modest, &program, &context());
        assert!(result.eligible);
        assert_eq!(result.status, EligibilityStatus::Eligible);

        let unknown_income = normalize(&json!({ "numberOfChildren": 2 }));
        let result = RuleSetEvaluator::default().evaluate(&unknown_income, &program, &context());
        assert!(result.eligible);
        assert_eq!(result.status, EligibilityStatus::Unknown);
        assert_eq!(result.missing_data, vec![ProfileKey::MonthlyNetIncome]);
    }
}
