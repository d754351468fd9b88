use chrono::{Datelike, NaiveDate};

use super::push_missing;
use crate::catalogue::{Criterion, NamedPredicate, Rule};
use crate::profile::{format_number, NormalizedProfile, ProfileKey};

/// Result of applying one criterion to a profile. Both evaluators share this check so the
/// criterion vocabulary behaves the same under either model.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CriterionCheck {
    Passed(String),
    Failed(String),
    /// The attribute the criterion reads is undefined or cannot be evaluated.
    Missing(ProfileKey),
}

impl CriterionCheck {
    pub(crate) fn passed(&self) -> bool {
        matches!(self, CriterionCheck::Passed(_))
    }

    /// Reasoning line for the trail shown to users.
    pub(crate) fn reasoning(&self, criterion: &Criterion) -> String {
        match self {
            CriterionCheck::Passed(detail) => format!("{}: {detail} (passed)", criterion.label),
            CriterionCheck::Failed(detail) => format!("{}: {detail} (failed)", criterion.label),
            CriterionCheck::Missing(key) => {
                format!("{}: not evaluated, {key} is missing", criterion.label)
            }
        }
    }
}

pub(crate) fn check_criterion(
    criterion: &Criterion,
    profile: &NormalizedProfile,
    today: NaiveDate,
) -> CriterionCheck {
    let key = criterion.profile_key;
    match &criterion.rule {
        Rule::IncomeCeiling(ceiling) => compare_number(profile, key, |income| {
            verdict(
                income <= *ceiling,
                format!(
                    "income {} within ceiling {}",
                    format_number(income),
                    format_number(*ceiling)
                ),
                format!(
                    "income {} exceeds ceiling {}",
                    format_number(income),
                    format_number(*ceiling)
                ),
            )
        }),
        Rule::IncomeFloor(floor) => compare_number(profile, key, |income| {
            verdict(
                income >= *floor,
                format!(
                    "income {} meets floor {}",
                    format_number(income),
                    format_number(*floor)
                ),
                format!(
                    "income {} below floor {}",
                    format_number(income),
                    format_number(*floor)
                ),
            )
        }),
        Rule::RentCeiling(ceiling) => compare_number(profile, key, |rent| {
            verdict(
                rent <= *ceiling,
                format!(
                    "cold rent {} within ceiling {}",
                    format_number(rent),
                    format_number(*ceiling)
                ),
                format!(
                    "cold rent {} exceeds ceiling {}",
                    format_number(rent),
                    format_number(*ceiling)
                ),
            )
        }),
        Rule::AgeFloor(minimum) => match age_from_profile(profile, key, today) {
            Some(age) => verdict(
                age >= *minimum,
                format!("age {age} meets minimum {minimum}"),
                format!("age {age} below minimum {minimum}"),
            ),
            None => CriterionCheck::Missing(key),
        },
        Rule::AgeCeiling(maximum) => match age_from_profile(profile, key, today) {
            Some(age) => verdict(
                age <= *maximum,
                format!("age {age} within maximum {maximum}"),
                format!("age {age} above maximum {maximum}"),
            ),
            None => CriterionCheck::Missing(key),
        },
        Rule::HasChildren => compare_number(profile, key, |count| {
            verdict(
                count > 0.0,
                format!("{} children present", format_number(count)),
                "no children present".to_string(),
            )
        }),
        Rule::ChildrenFloor(minimum) => compare_number(profile, key, |count| {
            verdict(
                count >= f64::from(*minimum),
                format!(
                    "{} children meet minimum {minimum}",
                    format_number(count)
                ),
                format!(
                    "{} children below minimum {minimum}",
                    format_number(count)
                ),
            )
        }),
        Rule::EmploymentStatusEquals(expected) => {
            compare_text(profile, key, expected, "employment status")
        }
        Rule::HousingTypeEquals(expected) => compare_text(profile, key, expected, "housing type"),
        Rule::ResidencyFlag(expected) => match profile.flag(key) {
            Some(actual) => verdict(
                actual == *expected,
                format!("{key} is {actual} as required"),
                format!("{key} is {actual}, expected {expected}"),
            ),
            None => CriterionCheck::Missing(key),
        },
        Rule::CustomPredicate(predicate) => apply_predicate(profile, *predicate),
    }
}

/// Applies an exclusion criterion and returns whether it rules the user out. An exclusion
/// whose attribute is undefined is recorded as missing and does not exclude.
pub(crate) fn apply_exclusion(
    criterion: &Criterion,
    profile: &NormalizedProfile,
    today: NaiveDate,
    reasoning: &mut Vec<String>,
    missing: &mut Vec<ProfileKey>,
) -> bool {
    let check = check_criterion(criterion, profile, today);
    match &check {
        CriterionCheck::Passed(detail) => {
            reasoning.push(format!("{}: {detail} (excludes)", criterion.label));
        }
        CriterionCheck::Failed(_) => {}
        CriterionCheck::Missing(key) => {
            reasoning.push(format!(
                "{}: exclusion not checked, {key} is missing",
                criterion.label
            ));
            push_missing(missing, *key);
        }
    }
    check.passed()
}

fn verdict(passed: bool, pass_detail: String, fail_detail: String) -> CriterionCheck {
    if passed {
        CriterionCheck::Passed(pass_detail)
    } else {
        CriterionCheck::Failed(fail_detail)
    }
}

fn compare_number(
    profile: &NormalizedProfile,
    key: ProfileKey,
    compare: impl FnOnce(f64) -> CriterionCheck,
) -> CriterionCheck {
    match profile.number(key) {
        Some(value) => compare(value),
        None => CriterionCheck::Missing(key),
    }
}

fn compare_text(
    profile: &NormalizedProfile,
    key: ProfileKey,
    expected: &str,
    subject: &str,
) -> CriterionCheck {
    match profile.text(key) {
        Some(actual) => verdict(
            actual.trim().eq_ignore_ascii_case(expected.trim()),
            format!("{subject} '{actual}' matches '{expected}'"),
            format!("{subject} '{actual}' does not match '{expected}'"),
        ),
        None => CriterionCheck::Missing(key),
    }
}

fn apply_predicate(profile: &NormalizedProfile, predicate: NamedPredicate) -> CriterionCheck {
    let key = predicate.profile_key();
    let Some(actual) = profile.text(key) else {
        return CriterionCheck::Missing(key);
    };

    let lowered = actual.trim().to_lowercase();
    let satisfied = predicate
        .accepted_values()
        .iter()
        .any(|accepted| *accepted == lowered);

    verdict(
        satisfied,
        format!("{key} '{actual}' satisfies {}", predicate.as_str()),
        format!("{key} '{actual}' does not satisfy {}", predicate.as_str()),
    )
}

fn age_from_profile(profile: &NormalizedProfile, key: ProfileKey, today: NaiveDate) -> Option<u32> {
    profile
        .date(key)
        .and_then(|birth| age_on(birth, today))
}

/// Completed years between `birth` and `today`; `None` for birth dates in the future.
pub(crate) fn age_on(birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth > today {
        return None;
    }
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::normalize;
    use serde_json::json;

    fn criterion(rule: Rule, key: ProfileKey) -> Criterion {
        Criterion {
            id: "c".to_string(),
            label: "Check".to_string(),
            rule,
            weight: 1.0,
            profile_key: key,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid date")
    }

    #[test]
    fn age_counts_completed_years() {
        let birth = NaiveDate::from_ymd_opt(2006, 6, 16).expect("valid date");
        assert_eq!(age_on(birth, today()), Some(17));
        let birthday = NaiveDate::from_ymd_opt(2006, 6, 15).expect("valid date");
        assert_eq!(age_on(birthday, today()), Some(18));
        let future = NaiveDate::from_ymd_opt(2030, 1, 1).expect("valid date");
        assert_eq!(age_on(future, today()), None);
    }

    #[test]
    fn future_birth_dates_are_unevaluable() {
        let profile = normalize(&json!({ "geburtsdatum": "2031-02-01" }));
        let check = check_criterion(
            &criterion(Rule::AgeFloor(18), ProfileKey::DateOfBirth),
            &profile,
            today(),
        );
        assert_eq!(check, CriterionCheck::Missing(ProfileKey::DateOfBirth));
    }

    #[test]
    fn has_children_failure_mentions_absence() {
        let profile = normalize(&json!({ "numberOfChildren": 0 }));
        let rule = criterion(Rule::HasChildren, ProfileKey::NumberOfChildren);
        let check = check_criterion(&rule, &profile, today());

        assert!(!check.passed());
        assert!(check.reasoning(&rule).contains("no children present"));
    }

    #[test]
    fn text_comparisons_ignore_case_and_padding() {
        let profile = normalize(&json!({ "employmentStatus": "  Unemployed " }));
        let check = check_criterion(
            &criterion(
                Rule::EmploymentStatusEquals("unemployed".to_string()),
                ProfileKey::EmploymentStatus,
            ),
            &profile,
            today(),
        );
        assert!(check.passed());
    }

    #[test]
    fn predicates_read_their_own_attribute() {
        let profile = normalize(&json!({ "lebenssituation": { "wohnart": "Miete" } }));
        let rule = criterion(
            Rule::CustomPredicate(NamedPredicate::IsTenant),
            ProfileKey::HousingType,
        );
        assert!(check_criterion(&rule, &profile, today()).passed());

        let owner = criterion(
            Rule::CustomPredicate(NamedPredicate::IsOwner),
            ProfileKey::HousingType,
        );
        assert!(!check_criterion(&owner, &profile, today()).passed());
    }

    #[test]
    fn exclusions_only_apply_when_they_hold() {
        let wealth = criterion(Rule::IncomeFloor(5000.0), ProfileKey::MonthlyNetIncome);
        let mut reasoning = Vec::new();
        let mut missing = Vec::new();

        let rich = normalize(&json!({ "monthlyNetIncome": 20000 }));
        assert!(apply_exclusion(&wealth, &rich, today(), &mut reasoning, &mut missing));
        assert_eq!(reasoning, vec!["Check: income 20000 meets floor 5000 (excludes)"]);

        let modest = normalize(&json!({ "monthlyNetIncome": 1200 }));
        assert!(!apply_exclusion(&wealth, &modest, today(), &mut reasoning, &mut missing));
        assert_eq!(reasoning.len(), 1);

        let unknown = normalize(&json!({}));
        assert!(!apply_exclusion(&wealth, &unknown, today(), &mut reasoning, &mut missing));
        assert_eq!(missing, vec![ProfileKey::MonthlyNetIncome]);
    }

    #[test]
    fn ceilings_include_the_boundary() {
        let profile = normalize(&json!({ "monthlyNetIncome": 1000 }));
        let rule = criterion(Rule::IncomeCeiling(1000.0), ProfileKey::MonthlyNetIncome);
        let check = check_criterion(&rule, &profile, today());
        assert_eq!(
            check.reasoning(&rule),
            "Check: income 1000 within ceiling 1000 (passed)"
        );
    }
}
