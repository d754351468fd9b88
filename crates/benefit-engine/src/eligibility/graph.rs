use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::criteria::{apply_exclusion, check_criterion, CriterionCheck};
use super::{
    push_missing, result_for, EligibilityResult, EligibilityStatus, EvaluationContext, Evaluator,
};
use crate::catalogue::{Criterion, Program};
use crate::profile::{NormalizedProfile, ProfileKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    User,
    Program,
    Criterion,
    Document,
}

impl NodeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Program => "program",
            Self::Criterion => "criterion",
            Self::Document => "document",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Properties attached to a node; the variant determines the node type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "properties", rename_all = "lowercase")]
pub enum NodePayload {
    User(NormalizedProfile),
    Program { name: String },
    Criterion(Criterion),
    Document { title: String },
}

impl NodePayload {
    pub const fn node_type(&self) -> NodeType {
        match self {
            NodePayload::User(_) => NodeType::User,
            NodePayload::Program { .. } => NodeType::Program,
            NodePayload::Criterion(_) => NodeType::Criterion,
            NodePayload::Document { .. } => NodeType::Document,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    #[serde(flatten)]
    pub payload: NodePayload,
    pub created_at: DateTime<Utc>,
}

impl GraphNode {
    pub fn node_type(&self) -> NodeType {
        self.payload.node_type()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Program -> criterion the program demands.
    Requires,
    /// User -> criterion known to hold regardless of profile data.
    Satisfies,
    /// Program -> criterion that rules the user out when it holds.
    Excludes,
}

impl Relation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requires => "requires",
            Self::Satisfies => "satisfies",
            Self::Excludes => "excludes",
        }
    }

    const fn endpoints(self) -> (NodeType, NodeType) {
        match self {
            Self::Requires | Self::Excludes => (NodeType::Program, NodeType::Criterion),
            Self::Satisfies => (NodeType::User, NodeType::Criterion),
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub relation: Relation,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("graph node '{0}' does not exist")]
    UnknownNode(String),
    #[error("graph node '{id}' is a {actual} node, expected {expected}")]
    WrongNodeType {
        id: String,
        expected: NodeType,
        actual: NodeType,
    },
    #[error("edge weight {0} must be finite and non-negative")]
    InvalidWeight(f64),
}

/// Outcome of a graph eligibility query. `score` is the satisfied share in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQueryResult {
    pub eligible: bool,
    pub score: f64,
    pub weighted_score: f64,
    pub satisfied_count: usize,
    pub total_count: usize,
    pub failed_criteria_labels: Vec<String>,
    pub missing_data: Vec<ProfileKey>,
    pub excluded_by: Vec<String>,
    pub reasoning: Vec<String>,
}

/// Node/edge model of users, programs and criteria. Edges keep insertion order, and an edge
/// whose id is already present overwrites the stored one in place.
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    threshold: f64,
    nodes: HashMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
    edge_index: HashMap<String, usize>,
}

impl Default for KnowledgeGraph {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl KnowledgeGraph {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            nodes: HashMap::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        payload: NodePayload,
        created_at: DateTime<Utc>,
    ) -> &GraphNode {
        let id = id.into();
        self.nodes.insert(
            id.clone(),
            GraphNode {
                id: id.clone(),
                payload,
                created_at,
            },
        );
        &self.nodes[&id]
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.get(id)
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Adds an edge with the conventional id `{from}_{relation}_{to}` and returns that id.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        relation: Relation,
        weight: f64,
    ) -> Result<String, GraphError> {
        let id = format!("{from}_{relation}_{to}");
        self.insert_edge(GraphEdge {
            id: id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            relation,
            weight,
        })?;
        Ok(id)
    }

    /// Inserts `edge` as given. Both endpoints must exist and have the node types the
    /// relation connects.
    pub fn insert_edge(&mut self, edge: GraphEdge) -> Result<(), GraphError> {
        if !edge.weight.is_finite() || edge.weight < 0.0 {
            return Err(GraphError::InvalidWeight(edge.weight));
        }
        let (from_type, to_type) = edge.relation.endpoints();
        self.expect_node(&edge.from, from_type)?;
        self.expect_node(&edge.to, to_type)?;

        match self.edge_index.get(&edge.id) {
            Some(position) => self.edges[*position] = edge,
            None => {
                self.edge_index.insert(edge.id.clone(), self.edges.len());
                self.edges.push(edge);
            }
        }
        Ok(())
    }

    fn expect_node(&self, id: &str, expected: NodeType) -> Result<&GraphNode, GraphError> {
        let node = self
            .nodes
            .get(id)
            .ok_or_else(|| GraphError::UnknownNode(id.to_string()))?;
        let actual = node.node_type();
        if actual != expected {
            return Err(GraphError::WrongNodeType {
                id: id.to_string(),
                expected,
                actual,
            });
        }
        Ok(node)
    }

    fn criterion(&self, id: &str) -> Option<&Criterion> {
        match self.nodes.get(id).map(|node| &node.payload) {
            Some(NodePayload::Criterion(criterion)) => Some(criterion),
            _ => None,
        }
    }

    fn outgoing<'a>(
        &'a self,
        from: &'a str,
        relation: Relation,
    ) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.from == from && edge.relation == relation)
    }

    /// Scores `user` against the criteria `program` requires. Each `requires` edge counts
    /// once, so parallel edges to the same criterion add up.
    pub fn query_eligibility(
        &self,
        user: &str,
        program: &str,
        context: &EvaluationContext,
    ) -> Result<GraphQueryResult, GraphError> {
        let user_node = self.expect_node(user, NodeType::User)?;
        self.expect_node(program, NodeType::Program)?;
        let NodePayload::User(profile) = &user_node.payload else {
            return Err(GraphError::WrongNodeType {
                id: user.to_string(),
                expected: NodeType::User,
                actual: user_node.node_type(),
            });
        };

        let today = context.today();
        let vouched: Vec<&str> = self
            .outgoing(user, Relation::Satisfies)
            .map(|edge| edge.to.as_str())
            .collect();

        let mut satisfied_count = 0;
        let mut total_count = 0;
        let mut satisfied_weight = 0.0;
        let mut total_weight = 0.0;
        let mut failed_criteria_labels = Vec::new();
        let mut missing_data = Vec::new();
        let mut reasoning = Vec::new();

        for edge in self.outgoing(program, Relation::Requires) {
            let Some(criterion) = self.criterion(&edge.to) else {
                continue;
            };
            total_count += 1;
            total_weight += edge.weight;

            if vouched.contains(&edge.to.as_str()) {
                satisfied_count += 1;
                satisfied_weight += edge.weight;
                reasoning.push(format!("{}: confirmed for this user (passed)", criterion.label));
                continue;
            }

            let check = check_criterion(criterion, profile, today);
            reasoning.push(check.reasoning(criterion));
            match check {
                CriterionCheck::Passed(_) => {
                    satisfied_count += 1;
                    satisfied_weight += edge.weight;
                }
                CriterionCheck::Failed(_) => failed_criteria_labels.push(criterion.label.clone()),
                CriterionCheck::Missing(key) => {
                    push_missing(&mut missing_data, key);
                    failed_criteria_labels.push(criterion.label.clone());
                }
            }
        }

        let mut excluded_by = Vec::new();
        for edge in self.outgoing(program, Relation::Excludes) {
            let Some(criterion) = self.criterion(&edge.to) else {
                continue;
            };
            if apply_exclusion(criterion, profile, today, &mut reasoning, &mut missing_data) {
                excluded_by.push(criterion.label.clone());
            }
        }

        if total_count == 0 {
            reasoning.push("no criteria defined for this program".to_string());
        }

        let score = share(satisfied_count as f64, total_count as f64);
        let weighted_score = share(satisfied_weight, total_weight);
        let eligible = total_count > 0 && excluded_by.is_empty() && score >= self.threshold;

        Ok(GraphQueryResult {
            eligible,
            score,
            weighted_score,
            satisfied_count,
            total_count,
            failed_criteria_labels,
            missing_data,
            excluded_by,
            reasoning,
        })
    }
}

fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole
    } else {
        0.0
    }
}

/// Node ids are namespaced by type so catalogue ids can never collide with each other.
const USER_NODE: &str = "user:self";

fn program_node_id(program: &Program) -> String {
    format!("program:{}", program.id)
}

/// Evaluates programs by projecting them onto a fresh knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphEvaluator {
    default_threshold: f64,
}

impl GraphEvaluator {
    pub fn new(default_threshold: f64) -> Self {
        Self {
            default_threshold: default_threshold.clamp(0.0, 1.0),
        }
    }

    fn threshold_for(&self, program: &Program) -> f64 {
        program
            .threshold
            .map(|percent| f64::from(percent) / 100.0)
            .unwrap_or(self.default_threshold)
    }

    /// Graph holding the user, the program and one node per criterion and exclusion.
    pub fn build_graph(
        &self,
        profile: &NormalizedProfile,
        program: &Program,
        context: &EvaluationContext,
    ) -> Result<KnowledgeGraph, GraphError> {
        let created_at = context.as_of;
        let program_node = program_node_id(program);
        let mut graph = KnowledgeGraph::new(self.threshold_for(program));

        graph.add_node(USER_NODE, NodePayload::User(profile.clone()), created_at);
        graph.add_node(
            program_node.as_str(),
            NodePayload::Program {
                name: program.name.clone(),
            },
            created_at,
        );

        let linked = program
            .rule_set
            .criteria()
            .iter()
            .map(|criterion| (criterion, Relation::Requires))
            .chain(
                program
                    .exclusions
                    .iter()
                    .map(|criterion| (criterion, Relation::Excludes)),
            );
        for (criterion, relation) in linked {
            let node_id = format!("criterion:{}", criterion.id);
            graph.add_node(
                node_id.as_str(),
                NodePayload::Criterion(criterion.clone()),
                created_at,
            );
            graph.add_edge(&program_node, &node_id, relation, criterion.weight)?;
        }

        Ok(graph)
    }

    fn try_evaluate(
        &self,
        profile: &NormalizedProfile,
        program: &Program,
        context: &EvaluationContext,
    ) -> Result<EligibilityResult, GraphError> {
        let graph = self.build_graph(profile, program, context)?;
        let query = graph.query_eligibility(USER_NODE, &program_node_id(program), context)?;

        let score = (query.score * 100.0).round().clamp(0.0, 100.0) as u8;
        let threshold = (graph.threshold() * 100.0).round().clamp(0.0, 100.0) as u8;
        let status = if !query.excluded_by.is_empty() {
            EligibilityStatus::Ineligible
        } else if !query.missing_data.is_empty() || query.total_count == 0 {
            EligibilityStatus::Unknown
        } else if query.eligible {
            EligibilityStatus::Eligible
        } else {
            EligibilityStatus::Ineligible
        };

        Ok(result_for(
            program,
            score,
            threshold,
            query.eligible,
            status,
            query.reasoning,
            query.missing_data,
        ))
    }
}

impl Default for GraphEvaluator {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl Evaluator for GraphEvaluator {
    fn evaluate(
        &self,
        profile: &NormalizedProfile,
        program: &Program,
        context: &EvaluationContext,
    ) -> EligibilityResult {
        match self.try_evaluate(profile, program, context) {
            Ok(result) => result,
            Err(error) => {
                tracing::warn!(program = %program.id, %error, "knowledge graph evaluation failed");
                result_for(
                    program,
                    0,
                    (self.threshold_for(program) * 100.0).round() as u8,
                    false,
                    EligibilityStatus::Unknown,
                    vec![format!("knowledge graph could not be evaluated: {error}")],
                    Vec::new(),
                )
            }
        }
    }
}
