//! Maps a normalized profile onto a program's form schema.

mod format;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalogue::{FormSchema, ProgramId};
use crate::profile::{rounded_percent, NormalizedProfile};

/// Best-effort form prefill. `filled_values` is keyed by field id in sorted order so repeated
/// runs serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutofillResult {
    pub program_id: ProgramId,
    pub filled_values: BTreeMap<String, String>,
    pub missing_required_fields: Vec<String>,
    pub completeness_percent: u8,
}

impl AutofillResult {
    pub fn is_complete(&self) -> bool {
        self.missing_required_fields.is_empty()
    }
}

pub fn autofill(
    profile: &NormalizedProfile,
    program_id: &ProgramId,
    schema: &FormSchema,
) -> AutofillResult {
    let mut filled_values = BTreeMap::new();
    let mut missing_required_fields = Vec::new();

    for field in schema.fields() {
        let rendered = field
            .profile_key
            .and_then(|key| profile.get(key))
            .and_then(|value| format::render_value(field, value));

        match rendered {
            Some(value) => {
                filled_values.insert(field.field_id.clone(), value);
            }
            None if field.required => missing_required_fields.push(field.label.clone()),
            None => {}
        }
    }

    AutofillResult {
        program_id: program_id.clone(),
        completeness_percent: rounded_percent(filled_values.len(), schema.len()),
        filled_values,
        missing_required_fields,
    }
}

/// Labels of required, profile-backed fields whose attribute the profile lacks. These are the
/// gaps a user can close by completing their profile.
pub fn missing_for_schema(profile: &NormalizedProfile, schema: &FormSchema) -> Vec<String> {
    schema
        .fields()
        .iter()
        .filter(|field| field.required)
        .filter(|field| matches!(field.profile_key, Some(key) if !profile.contains(key)))
        .map(|field| field.label.clone())
        .collect()
}
