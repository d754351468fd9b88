use super::domain::{
    Criterion, CriterionKind, EvaluationModel, FieldSpec, FieldType, FormSchema, NamedPredicate,
    Program, ProgramCategory, ProgramId, Rule, RuleSet,
};
use crate::profile::{ProfileKey, ValueKind};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;

/// Configuration defects found while loading program definitions. These never surface at
/// evaluation time.
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    #[error("failed to read catalogue {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalogue JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("program id must not be empty")]
    EmptyProgramId,
    #[error("program '{0}' is defined more than once")]
    DuplicateProgram(String),
    #[error("program '{program}' has unknown category '{value}'")]
    UnknownCategory { program: String, value: String },
    #[error("program '{program}' has unknown evaluation model '{value}'")]
    UnknownModel { program: String, value: String },
    #[error("program '{program}' threshold {value} must lie within 0..=100")]
    InvalidThreshold { program: String, value: f64 },
    #[error("program '{program}' monthly amount {value} must be finite and non-negative")]
    InvalidMonthlyAmount { program: String, value: f64 },
    #[error("program '{program}' criterion '{criterion}' has unknown kind '{kind}'")]
    UnknownCriterionKind {
        program: String,
        criterion: String,
        kind: String,
    },
    #[error("program '{program}' criterion '{criterion}' uses unknown predicate '{predicate}'")]
    UnknownPredicate {
        program: String,
        criterion: String,
        predicate: String,
    },
    #[error("program '{program}' criterion '{criterion}' is defined more than once")]
    DuplicateCriterion { program: String, criterion: String },
    #[error("program '{program}' criterion '{criterion}' weight {weight} must be finite and non-negative")]
    InvalidWeight {
        program: String,
        criterion: String,
        weight: f64,
    },
    #[error("program '{program}' criterion '{criterion}' requires a comparison value")]
    MissingComparisonValue { program: String, criterion: String },
    #[error("program '{program}' criterion '{criterion}' has an unusable comparison value {value}")]
    InvalidComparisonValue {
        program: String,
        criterion: String,
        value: Value,
    },
    #[error("program '{program}' criterion '{criterion}' requires a profileKey")]
    MissingProfileKey { program: String, criterion: String },
    #[error("program '{program}' entry '{reference}' references unknown profile key '{alias}'")]
    UnknownProfileKey {
        program: String,
        reference: String,
        alias: String,
    },
    #[error("program '{program}' entry '{reference}' cannot read profile key '{key}'")]
    IncompatibleProfileKey {
        program: String,
        reference: String,
        key: ProfileKey,
    },
    #[error("program '{program}' field '{field}' has unknown type '{value}'")]
    UnknownFieldType {
        program: String,
        field: String,
        value: String,
    },
    #[error("program '{program}' field '{field}' is defined more than once")]
    DuplicateField { program: String, field: String },
    #[error("program '{program}' select field '{field}' declares no options")]
    MissingOptions { program: String, field: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogueDefinition {
    pub programs: Vec<ProgramDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub monthly_amount: Option<f64>,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub criteria: Vec<CriterionDefinition>,
    #[serde(default)]
    pub exclusions: Vec<CriterionDefinition>,
    #[serde(default)]
    pub form: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionDefinition {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub kind: String,
    #[serde(default)]
    pub comparison_value: Option<Value>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub profile_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub field_id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub profile_key: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

pub(crate) fn build_programs(
    definition: CatalogueDefinition,
) -> Result<Vec<Program>, CatalogueError> {
    let mut seen = HashSet::new();
    let mut programs = Vec::with_capacity(definition.programs.len());

    for program in definition.programs {
        let id = program.id.trim().to_string();
        if id.is_empty() {
            return Err(CatalogueError::EmptyProgramId);
        }
        if !seen.insert(id.clone()) {
            return Err(CatalogueError::DuplicateProgram(id));
        }
        programs.push(build_program(id, program)?);
    }

    Ok(programs)
}

fn build_program(id: String, definition: ProgramDefinition) -> Result<Program, CatalogueError> {
    let category = ProgramCategory::parse(&definition.category).ok_or_else(|| {
        CatalogueError::UnknownCategory {
            program: id.clone(),
            value: definition.category.clone(),
        }
    })?;

    let model = match definition.model.as_deref() {
        None => EvaluationModel::RuleSet,
        Some(raw) => EvaluationModel::parse(raw).ok_or_else(|| CatalogueError::UnknownModel {
            program: id.clone(),
            value: raw.to_string(),
        })?,
    };

    let threshold = definition
        .threshold
        .map(|value| {
            if value.is_finite() && (0.0..=100.0).contains(&value) {
                Ok(value.round() as u8)
            } else {
                Err(CatalogueError::InvalidThreshold {
                    program: id.clone(),
                    value,
                })
            }
        })
        .transpose()?;

    if let Some(value) = definition.monthly_amount {
        if !value.is_finite() || value < 0.0 {
            return Err(CatalogueError::InvalidMonthlyAmount {
                program: id.clone(),
                value,
            });
        }
    }

    let mut criterion_ids = HashSet::new();
    let mut criteria = Vec::with_capacity(definition.criteria.len());
    for criterion in definition.criteria.iter().chain(definition.exclusions.iter()) {
        if !criterion_ids.insert(criterion.id.as_str()) {
            return Err(CatalogueError::DuplicateCriterion {
                program: id.clone(),
                criterion: criterion.id.clone(),
            });
        }
    }
    for criterion in &definition.criteria {
        criteria.push(build_criterion(&id, criterion)?);
    }
    let exclusions = definition
        .exclusions
        .iter()
        .map(|criterion| build_criterion(&id, criterion))
        .collect::<Result<Vec<_>, _>>()?;

    let form = build_form(&id, &definition.form)?;

    Ok(Program {
        id: ProgramId(id),
        name: definition.name,
        description: definition.description,
        category,
        threshold,
        model,
        rule_set: RuleSet::new(criteria),
        exclusions,
        monthly_amount: definition.monthly_amount,
        priority: definition.priority,
        form,
    })
}

fn build_criterion(
    program: &str,
    definition: &CriterionDefinition,
) -> Result<Criterion, CatalogueError> {
    let kind = CriterionKind::parse(&definition.kind).ok_or_else(|| {
        CatalogueError::UnknownCriterionKind {
            program: program.to_string(),
            criterion: definition.id.clone(),
            kind: definition.kind.clone(),
        }
    })?;

    let weight = definition.weight.unwrap_or(1.0);
    if !weight.is_finite() || weight < 0.0 {
        return Err(CatalogueError::InvalidWeight {
            program: program.to_string(),
            criterion: definition.id.clone(),
            weight,
        });
    }

    let rule = build_rule(program, kind, definition)?;
    let profile_key = resolve_criterion_key(program, &rule, definition)?;

    Ok(Criterion {
        id: definition.id.clone(),
        label: definition
            .label
            .clone()
            .unwrap_or_else(|| definition.id.clone()),
        rule,
        weight,
        profile_key,
    })
}

fn build_rule(
    program: &str,
    kind: CriterionKind,
    definition: &CriterionDefinition,
) -> Result<Rule, CatalogueError> {
    let missing = || CatalogueError::MissingComparisonValue {
        program: program.to_string(),
        criterion: definition.id.clone(),
    };
    let invalid = |value: &Value| CatalogueError::InvalidComparisonValue {
        program: program.to_string(),
        criterion: definition.id.clone(),
        value: value.clone(),
    };

    let value = definition.comparison_value.as_ref();
    let amount = || -> Result<f64, CatalogueError> {
        let value = value.ok_or_else(missing)?;
        value
            .as_f64()
            .filter(|amount| amount.is_finite() && *amount >= 0.0)
            .ok_or_else(|| invalid(value))
    };
    let whole = || -> Result<u32, CatalogueError> {
        let value = value.ok_or_else(missing)?;
        value
            .as_u64()
            .and_then(|whole| u32::try_from(whole).ok())
            .ok_or_else(|| invalid(value))
    };
    let text = || -> Result<String, CatalogueError> {
        let value = value.ok_or_else(missing)?;
        value
            .as_str()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .ok_or_else(|| invalid(value))
    };

    let rule = match kind {
        CriterionKind::IncomeCeiling => Rule::IncomeCeiling(amount()?),
        CriterionKind::IncomeFloor => Rule::IncomeFloor(amount()?),
        CriterionKind::RentCeiling => Rule::RentCeiling(amount()?),
        CriterionKind::AgeFloor => Rule::AgeFloor(whole()?),
        CriterionKind::AgeCeiling => Rule::AgeCeiling(whole()?),
        CriterionKind::ChildrenFloor => Rule::ChildrenFloor(whole()?),
        CriterionKind::HasChildren => Rule::HasChildren,
        CriterionKind::EmploymentStatusEquals => Rule::EmploymentStatusEquals(text()?),
        CriterionKind::HousingTypeEquals => Rule::HousingTypeEquals(text()?),
        CriterionKind::ResidencyFlag => match value {
            None => Rule::ResidencyFlag(true),
            Some(raw) => Rule::ResidencyFlag(raw.as_bool().ok_or_else(|| invalid(raw))?),
        },
        CriterionKind::CustomPredicate => {
            let name = text()?;
            let predicate =
                NamedPredicate::parse(&name).ok_or_else(|| CatalogueError::UnknownPredicate {
                    program: program.to_string(),
                    criterion: definition.id.clone(),
                    predicate: name.clone(),
                })?;
            Rule::CustomPredicate(predicate)
        }
    };

    Ok(rule)
}

/// Key a rule reads when the definition leaves `profileKey` out.
fn implied_key(rule: &Rule) -> Option<ProfileKey> {
    match rule {
        Rule::AgeFloor(_) | Rule::AgeCeiling(_) => Some(ProfileKey::DateOfBirth),
        Rule::CustomPredicate(predicate) => Some(predicate.profile_key()),
        _ => None,
    }
}

fn key_fits_rule(rule: &Rule, key: ProfileKey) -> bool {
    let kind = key.value_kind();
    match rule {
        Rule::IncomeCeiling(_) | Rule::IncomeFloor(_) | Rule::RentCeiling(_) => {
            kind == ValueKind::Amount
        }
        Rule::AgeFloor(_) | Rule::AgeCeiling(_) => kind == ValueKind::Date,
        Rule::HasChildren | Rule::ChildrenFloor(_) => kind == ValueKind::Count,
        Rule::EmploymentStatusEquals(_) | Rule::HousingTypeEquals(_) => kind == ValueKind::Text,
        Rule::ResidencyFlag(_) => kind == ValueKind::Flag,
        Rule::CustomPredicate(predicate) => predicate.profile_key() == key,
    }
}

fn resolve_criterion_key(
    program: &str,
    rule: &Rule,
    definition: &CriterionDefinition,
) -> Result<ProfileKey, CatalogueError> {
    let key = match definition.profile_key.as_deref() {
        Some(alias) => resolve_alias(program, &definition.id, alias)?,
        None => implied_key(rule).ok_or_else(|| CatalogueError::MissingProfileKey {
            program: program.to_string(),
            criterion: definition.id.clone(),
        })?,
    };

    if !key_fits_rule(rule, key) {
        return Err(CatalogueError::IncompatibleProfileKey {
            program: program.to_string(),
            reference: definition.id.clone(),
            key,
        });
    }

    Ok(key)
}

fn resolve_alias(
    program: &str,
    reference: &str,
    alias: &str,
) -> Result<ProfileKey, CatalogueError> {
    ProfileKey::from_alias(alias).ok_or_else(|| CatalogueError::UnknownProfileKey {
        program: program.to_string(),
        reference: reference.to_string(),
        alias: alias.to_string(),
    })
}

fn key_fits_field(field_type: FieldType, key: ProfileKey) -> bool {
    let kind = key.value_kind();
    match field_type {
        FieldType::Text => true,
        FieldType::Number => kind.is_numeric(),
        FieldType::Date => kind == ValueKind::Date,
        FieldType::Boolean => kind == ValueKind::Flag,
        FieldType::Select => kind.is_textual(),
    }
}

fn build_form(program: &str, fields: &[FieldDefinition]) -> Result<FormSchema, CatalogueError> {
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(fields.len());

    for field in fields {
        if !seen.insert(field.field_id.as_str()) {
            return Err(CatalogueError::DuplicateField {
                program: program.to_string(),
                field: field.field_id.clone(),
            });
        }

        let field_type =
            FieldType::parse(&field.field_type).ok_or_else(|| CatalogueError::UnknownFieldType {
                program: program.to_string(),
                field: field.field_id.clone(),
                value: field.field_type.clone(),
            })?;

        let profile_key = field
            .profile_key
            .as_deref()
            .map(|alias| resolve_alias(program, &field.field_id, alias))
            .transpose()?;

        if let Some(key) = profile_key {
            if !key_fits_field(field_type, key) {
                return Err(CatalogueError::IncompatibleProfileKey {
                    program: program.to_string(),
                    reference: field.field_id.clone(),
                    key,
                });
            }
        }

        if field_type == FieldType::Select && field.options.is_empty() {
            return Err(CatalogueError::MissingOptions {
                program: program.to_string(),
                field: field.field_id.clone(),
            });
        }

        specs.push(FieldSpec {
            field_id: field.field_id.clone(),
            label: field.label.clone(),
            field_type,
            required: field.required,
            profile_key,
            options: field.options.clone(),
        });
    }

    Ok(FormSchema::new(specs))
}
