//! Eligibility evaluation: per-program verdicts with a reasoning trail, two interchangeable
//! scoring models, and the aggregator that ranks them.

mod aggregator;
mod config;
mod criteria;
mod graph;
mod rules;

pub use aggregator::{rank_programs, ResultFilter};
pub use config::EvaluationConfig;
pub use graph::{
    GraphEdge, GraphError, GraphEvaluator, GraphNode, GraphQueryResult, KnowledgeGraph,
    NodePayload, NodeType, Relation,
};
pub use rules::RuleSetEvaluator;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalogue::{EvaluationModel, Program, ProgramCategory, ProgramId};
use crate::profile::{NormalizedProfile, ProfileKey};

/// Instant an evaluation is performed at. Ages are computed against its calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationContext {
    pub as_of: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self { as_of }
    }

    /// Context at midnight UTC of `date`.
    pub fn on_date(date: NaiveDate) -> Self {
        Self {
            as_of: date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.as_of.date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EligibilityStatus {
    Eligible,
    Ineligible,
    Unknown,
}

impl EligibilityStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::Ineligible => "ineligible",
            Self::Unknown => "unknown",
        }
    }
}

/// Verdict for one program, including how it was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityResult {
    pub program_id: ProgramId,
    pub name: String,
    pub category: ProgramCategory,
    pub description: String,
    pub score: u8,
    pub threshold: u8,
    pub eligible: bool,
    pub status: EligibilityStatus,
    pub reasoning: Vec<String>,
    pub missing_data: Vec<ProfileKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
}

/// Scoring model applied to a single program.
pub trait Evaluator: Send + Sync {
    fn evaluate(
        &self,
        profile: &NormalizedProfile,
        program: &Program,
        context: &EvaluationContext,
    ) -> EligibilityResult;
}

/// One evaluator per [`EvaluationModel`], picked by each program's declared model.
#[derive(Debug, Clone)]
pub struct EvaluatorSet {
    rule_set: RuleSetEvaluator,
    graph: GraphEvaluator,
}

impl EvaluatorSet {
    pub fn new(config: EvaluationConfig) -> Self {
        Self {
            rule_set: RuleSetEvaluator::new(config.default_threshold),
            graph: GraphEvaluator::new(config.graph_threshold),
        }
    }

    pub fn for_model(&self, model: EvaluationModel) -> &dyn Evaluator {
        match model {
            EvaluationModel::RuleSet => &self.rule_set,
            EvaluationModel::Graph => &self.graph,
        }
    }

    pub fn evaluate(
        &self,
        profile: &NormalizedProfile,
        program: &Program,
        context: &EvaluationContext,
    ) -> EligibilityResult {
        self.for_model(program.model)
            .evaluate(profile, program, context)
    }
}

impl Default for EvaluatorSet {
    fn default() -> Self {
        Self::new(EvaluationConfig::default())
    }
}

/// Keys in first-appearance order without repeats.
pub(crate) fn push_missing(missing: &mut Vec<ProfileKey>, key: ProfileKey) {
    if !missing.contains(&key) {
        missing.push(key);
    }
}

pub(crate) fn result_for(
    program: &Program,
    score: u8,
    threshold: u8,
    eligible: bool,
    status: EligibilityStatus,
    reasoning: Vec<String>,
    missing_data: Vec<ProfileKey>,
) -> EligibilityResult {
    EligibilityResult {
        program_id: program.id.clone(),
        name: program.name.clone(),
        category: program.category,
        description: program.description.clone(),
        score,
        threshold,
        eligible,
        status,
        reasoning,
        missing_data,
        monthly_amount: program.monthly_amount,
        priority: program.priority,
    }
}
