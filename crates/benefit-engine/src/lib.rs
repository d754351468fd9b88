//! Eligibility determination and application autofill for German state benefit programs.

pub mod autofill;
pub mod catalogue;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod profile;
pub mod router;
pub mod service;
pub mod telemetry;

pub use autofill::{autofill, missing_for_schema, AutofillResult};
pub use catalogue::{Catalogue, CatalogueError, CatalogueStore, Program, ProgramId};
pub use eligibility::{
    rank_programs, EligibilityResult, EligibilityStatus, EvaluationConfig, EvaluationContext,
    Evaluator, EvaluatorSet, ResultFilter,
};
pub use profile::{normalize, NormalizedProfile, ProfileKey, ProfileValue};
pub use router::benefit_router;
pub use service::{BenefitService, ServiceError};
