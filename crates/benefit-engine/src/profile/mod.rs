//! Canonical user profile and the normalizer that builds it from raw, partially nested
//! records.

mod completion;
mod domain;
mod normalizer;
mod sources;

pub use completion::{profile_completion, ProfileCompletion, CORE_PROFILE_KEYS};
pub(crate) use completion::rounded_percent;
pub use domain::{format_number, NormalizedProfile, ProfileKey, ProfileValue, ValueKind};
pub use normalizer::{normalize, normalize_with_report, FieldRejection, NormalizationReport};
