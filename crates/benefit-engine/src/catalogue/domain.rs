use crate::profile::{format_number, ProfileKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier wrapper for catalogue programs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramId(pub String);

impl ProgramId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramCategory {
    Housing,
    Family,
    BasicIncome,
    Education,
    Parental,
    Other,
}

impl ProgramCategory {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Housing,
            Self::Family,
            Self::BasicIncome,
            Self::Education,
            Self::Parental,
            Self::Other,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Housing => "housing",
            Self::Family => "family",
            Self::BasicIncome => "basic-income",
            Self::Education => "education",
            Self::Parental => "parental",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|category| category.as_str() == wanted)
    }
}

/// Which evaluator a program is scored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationModel {
    RuleSet,
    Graph,
}

impl EvaluationModel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rule-set" | "rules" | "flat" => Some(Self::RuleSet),
            "graph" | "knowledge-graph" => Some(Self::Graph),
            _ => None,
        }
    }
}

/// Criterion vocabulary shared by the rule-set and knowledge-graph evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CriterionKind {
    IncomeCeiling,
    IncomeFloor,
    AgeFloor,
    AgeCeiling,
    HasChildren,
    ChildrenFloor,
    EmploymentStatusEquals,
    HousingTypeEquals,
    ResidencyFlag,
    RentCeiling,
    CustomPredicate,
}

impl CriterionKind {
    pub const fn ordered() -> [Self; 11] {
        [
            Self::IncomeCeiling,
            Self::IncomeFloor,
            Self::AgeFloor,
            Self::AgeCeiling,
            Self::HasChildren,
            Self::ChildrenFloor,
            Self::EmploymentStatusEquals,
            Self::HousingTypeEquals,
            Self::ResidencyFlag,
            Self::RentCeiling,
            Self::CustomPredicate,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncomeCeiling => "income-ceiling",
            Self::IncomeFloor => "income-floor",
            Self::AgeFloor => "age-floor",
            Self::AgeCeiling => "age-ceiling",
            Self::HasChildren => "has-children",
            Self::ChildrenFloor => "children-floor",
            Self::EmploymentStatusEquals => "employment-status-equals",
            Self::HousingTypeEquals => "housing-type-equals",
            Self::ResidencyFlag => "residency-flag",
            Self::RentCeiling => "rent-ceiling",
            Self::CustomPredicate => "custom-predicate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let wanted = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ordered().into_iter().find(|kind| kind.as_str() == wanted)
    }
}

/// Named predicates usable through `custom-predicate` criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamedPredicate {
    IsTenant,
    IsOwner,
    IsStudent,
    IsSingleParent,
    IsMarried,
}

impl NamedPredicate {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::IsTenant,
            Self::IsOwner,
            Self::IsStudent,
            Self::IsSingleParent,
            Self::IsMarried,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IsTenant => "is-tenant",
            Self::IsOwner => "is-owner",
            Self::IsStudent => "is-student",
            Self::IsSingleParent => "is-single-parent",
            Self::IsMarried => "is-married",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|predicate| predicate.as_str() == wanted)
    }

    /// Attribute the predicate reads.
    pub const fn profile_key(self) -> ProfileKey {
        match self {
            Self::IsTenant | Self::IsOwner => ProfileKey::HousingType,
            Self::IsStudent => ProfileKey::EmploymentStatus,
            Self::IsSingleParent | Self::IsMarried => ProfileKey::MaritalStatus,
        }
    }

    /// Values (lower-cased) that satisfy the predicate.
    pub const fn accepted_values(self) -> &'static [&'static str] {
        match self {
            Self::IsTenant => &["miete", "mieter", "rent", "renter", "tenant"],
            Self::IsOwner => &["eigentum", "eigentuemer", "eigentümer", "owner"],
            Self::IsStudent => &["student", "studierend", "studentin", "auszubildend"],
            Self::IsSingleParent => &["alleinerziehend", "single-parent", "single parent"],
            Self::IsMarried => &["verheiratet", "married", "eingetragene partnerschaft"],
        }
    }
}

/// Validated comparison carried by a criterion. Built only by the catalogue loader, so the
/// operand always matches the kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "comparisonValue", rename_all = "kebab-case")]
pub enum Rule {
    IncomeCeiling(f64),
    IncomeFloor(f64),
    AgeFloor(u32),
    AgeCeiling(u32),
    HasChildren,
    ChildrenFloor(u32),
    EmploymentStatusEquals(String),
    HousingTypeEquals(String),
    ResidencyFlag(bool),
    RentCeiling(f64),
    CustomPredicate(NamedPredicate),
}

impl Rule {
    pub const fn kind(&self) -> CriterionKind {
        match self {
            Rule::IncomeCeiling(_) => CriterionKind::IncomeCeiling,
            Rule::IncomeFloor(_) => CriterionKind::IncomeFloor,
            Rule::AgeFloor(_) => CriterionKind::AgeFloor,
            Rule::AgeCeiling(_) => CriterionKind::AgeCeiling,
            Rule::HasChildren => CriterionKind::HasChildren,
            Rule::ChildrenFloor(_) => CriterionKind::ChildrenFloor,
            Rule::EmploymentStatusEquals(_) => CriterionKind::EmploymentStatusEquals,
            Rule::HousingTypeEquals(_) => CriterionKind::HousingTypeEquals,
            Rule::ResidencyFlag(_) => CriterionKind::ResidencyFlag,
            Rule::RentCeiling(_) => CriterionKind::RentCeiling,
            Rule::CustomPredicate(_) => CriterionKind::CustomPredicate,
        }
    }

    pub fn comparison_label(&self) -> Option<String> {
        match self {
            Rule::IncomeCeiling(value) | Rule::IncomeFloor(value) | Rule::RentCeiling(value) => {
                Some(format_number(*value))
            }
            Rule::AgeFloor(value) | Rule::AgeCeiling(value) | Rule::ChildrenFloor(value) => {
                Some(value.to_string())
            }
            Rule::EmploymentStatusEquals(value) | Rule::HousingTypeEquals(value) => {
                Some(value.clone())
            }
            Rule::ResidencyFlag(value) => Some(value.to_string()),
            Rule::CustomPredicate(predicate) => Some(predicate.as_str().to_string()),
            Rule::HasChildren => None,
        }
    }
}

/// One atomic eligibility test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub rule: Rule,
    pub weight: f64,
    pub profile_key: ProfileKey,
}

impl Criterion {
    pub fn kind(&self) -> CriterionKind {
        self.rule.kind()
    }
}

/// Ordered criteria; the weight sum is the scoring denominator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleSet {
    criteria: Vec<Criterion>,
}

impl RuleSet {
    pub(crate) fn new(criteria: Vec<Criterion>) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(|criterion| criterion.weight).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Select,
    Boolean,
}

impl FieldType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "string" => Some(Self::Text),
            "number" => Some(Self::Number),
            "date" => Some(Self::Date),
            "select" => Some(Self::Select),
            "boolean" | "checkbox" => Some(Self::Boolean),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub field_id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    pub profile_key: Option<ProfileKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormSchema {
    fields: Vec<FieldSpec>,
}

impl FormSchema {
    pub(crate) fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A benefit program as loaded from the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub description: String,
    pub category: ProgramCategory,
    /// Score (0-100) at or above which the program counts as eligible. `None` defers to the
    /// evaluator's configured default.
    pub threshold: Option<u8>,
    pub model: EvaluationModel,
    pub rule_set: RuleSet,
    /// Criteria that rule a user out when satisfied, under either model.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclusions: Vec<Criterion>,
    /// Typical monthly payment in euros, shown alongside the verdict.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_amount: Option<f64>,
    /// Editorial priority; higher is more prominent. Ranking does not read it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    pub form: FormSchema,
}

/// Lightweight view used by listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    pub id: ProgramId,
    pub name: String,
    pub category: ProgramCategory,
    pub model: EvaluationModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    pub criteria: usize,
    pub form_fields: usize,
}

impl Program {
    pub fn summary(&self) -> ProgramSummary {
        ProgramSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category,
            model: self.model,
            monthly_amount: self.monthly_amount,
            priority: self.priority,
            criteria: self.rule_set.criteria().len(),
            form_fields: self.form.len(),
        }
    }
}
