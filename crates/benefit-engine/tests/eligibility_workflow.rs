use benefit_engine::catalogue::Catalogue;
use benefit_engine::eligibility::{
    rank_programs, EligibilityStatus, EvaluationContext, EvaluatorSet,
};
use benefit_engine::profile::{normalize, ProfileKey};
use benefit_engine::Program;
use chrono::NaiveDate;
use serde_json::{json, Value};

fn context() -> EvaluationContext {
    EvaluationContext::on_date(NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date"))
}

fn single_program(criteria: Value) -> Program {
    let raw = json!({
        "programs": [{
            "id": "probe",
            "name": "Probe",
            "description": "Probe program",
            "category": "basic-income",
            "criteria": criteria
        }]
    });
    Catalogue::from_json(&raw.to_string())
        .expect("catalogue loads")
        .programs()[0]
        .clone()
}

fn buergergeld_like() -> Program {
    single_program(json!([
        { "id": "income", "kind": "income-ceiling", "comparisonValue": 1000, "weight": 1, "profileKey": "monthlyNetIncome" },
        { "id": "status", "kind": "employment-status-equals", "comparisonValue": "unemployed", "weight": 1, "profileKey": "employmentStatus" }
    ]))
}

#[test]
fn complete_profile_is_fully_eligible() {
    let profile = normalize(&json!({ "monthlyNetIncome": 900, "employmentStatus": "unemployed" }));
    let result = EvaluatorSet::default().evaluate(&profile, &buergergeld_like(), &context());

    assert_eq!(result.score, 100);
    assert!(result.eligible);
    assert!(result.missing_data.is_empty());
}

#[test]
fn omitted_attribute_yields_unknown_status() {
    let profile = normalize(&json!({ "monthlyNetIncome": 900 }));
    let result = EvaluatorSet::default().evaluate(&profile, &buergergeld_like(), &context());

    assert_eq!(result.missing_data, vec![ProfileKey::EmploymentStatus]);
    assert_eq!(result.score, 100);
    assert_eq!(result.status, EligibilityStatus::Unknown);
}

#[test]
fn grouped_income_keeps_its_thousands() {
    let profile =
        normalize(&json!({ "monthlyNetIncome": "2.500", "employmentStatus": "unemployed" }));
    let result = EvaluatorSet::default().evaluate(&profile, &buergergeld_like(), &context());

    assert_eq!(result.score, 50);
    assert!(result
        .reasoning
        .iter()
        .any(|line| line.contains("income 2500 exceeds ceiling 1000 (failed)")));
}

#[test]
fn zero_children_fails_child_benefit() {
    let program = single_program(json!([
        { "id": "kids", "kind": "has-children", "profileKey": "numberOfChildren" }
    ]));
    let profile = normalize(&json!({ "numberOfChildren": 0 }));
    let result = EvaluatorSet::default().evaluate(&profile, &program, &context());

    assert_eq!(result.score, 0);
    assert!(!result.eligible);
    assert!(result
        .reasoning
        .iter()
        .any(|line| line.contains("no children present")));
}

#[test]
fn empty_rule_set_is_unknown() {
    let result = EvaluatorSet::default().evaluate(
        &normalize(&json!({ "monthlyNetIncome": 900 })),
        &single_program(json!([])),
        &context(),
    );

    assert_eq!(result.score, 0);
    assert_eq!(result.status, EligibilityStatus::Unknown);
    assert!(!result.eligible);
}

#[test]
fn evaluation_is_deterministic() {
    let catalogue = Catalogue::standard().expect("standard catalogue");
    let profile = normalize(&json!({
        "vorname": "Erika",
        "geburtsdatum": "14.09.1995",
        "lebenssituation": {
            "monatliches_nettoeinkommen": "1.250,00 €",
            "wohnart": "Miete",
            "monatliche_miete_kalt": 720,
            "kinder_anzahl": 1,
            "aufenthaltstitel": "ja"
        }
    }));
    let evaluators = EvaluatorSet::default();

    let first = rank_programs(&profile, catalogue.programs(), &evaluators, &context());
    let second = rank_programs(&profile, catalogue.programs(), &evaluators, &context());

    assert_eq!(first, second);
}

#[test]
fn removing_values_never_resolves_unknown_verdicts() {
    let catalogue = Catalogue::standard().expect("standard catalogue");
    let profile = normalize(&json!({
        "monthlyNetIncome": 1100,
        "employmentStatus": "student",
        "geburtsdatum": "2001-02-03",
        "numberOfChildren": 2,
        "wohnart": "miete",
        "coldRentAmount": 650,
        "residencePermit": true
    }));
    let evaluators = EvaluatorSet::default();

    for program in catalogue.programs() {
        let full = evaluators.evaluate(&profile, program, &context());
        for (key, _) in profile.iter() {
            let reduced = evaluators.evaluate(&profile.without(key), program, &context());
            assert!(
                reduced.missing_data.len() >= full.missing_data.len(),
                "{} lost missing data after removing {key}",
                program.id
            );
            if full.status == EligibilityStatus::Unknown {
                assert_eq!(reduced.status, EligibilityStatus::Unknown);
            }
        }
    }
}

#[test]
fn scores_stay_within_bounds() {
    let catalogue = Catalogue::standard().expect("standard catalogue");
    let evaluators = EvaluatorSet::default();
    let profiles = [
        json!({}),
        json!({ "monthlyNetIncome": -5 }),
        json!({ "monthlyNetIncome": 0, "numberOfChildren": 12, "residencePermit": false }),
        json!({ "geburtsdatum": "2099-01-01", "employmentStatus": "" }),
        json!("not an object"),
    ];

    for raw in &profiles {
        let profile = normalize(raw);
        for result in rank_programs(&profile, catalogue.programs(), &evaluators, &context()) {
            assert!(result.score <= 100);
            if result.reasoning.iter().any(|line| line.contains("no criteria")) {
                assert_eq!(result.score, 0);
            }
        }
    }
}

#[test]
fn ranking_keeps_catalogue_order_for_ties() {
    let catalogue = Catalogue::standard().expect("standard catalogue");
    let ranked = rank_programs(
        &normalize(&json!({})),
        catalogue.programs(),
        &EvaluatorSet::default(),
        &context(),
    );

    let ids: Vec<&str> = ranked.iter().map(|result| result.program_id.as_str()).collect();
    let catalogue_ids: Vec<&str> = catalogue
        .programs()
        .iter()
        .map(|program| program.id.as_str())
        .collect();
    assert_eq!(ids, catalogue_ids);
    assert!(ranked.iter().all(|result| result.score == 0));
}

#[test]
fn tenant_profile_ranks_wohngeld_first() {
    let catalogue = Catalogue::standard().expect("standard catalogue");
    let profile = normalize(&json!({
        "monatliches_nettoeinkommen": 1200,
        "lebenssituation": {
            "wohnart": "miete",
            "monatliche_miete_kalt": "640 €",
            "aufenthaltstitel": true
        },
        "beschaeftigungsstatus": "employed"
    }));

    let ranked = rank_programs(
        &profile,
        catalogue.programs(),
        &EvaluatorSet::default(),
        &context(),
    );

    assert_eq!(ranked[0].program_id.as_str(), "wohngeld");
    assert_eq!(ranked[0].status, EligibilityStatus::Eligible);
    assert_eq!(ranked[0].score, 100);
}
