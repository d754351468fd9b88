use super::domain::{NormalizedProfile, ProfileKey};
use serde::Serialize;

/// Attributes a profile needs before most applications can be prepared.
pub const CORE_PROFILE_KEYS: &[ProfileKey] = &[
    ProfileKey::FirstName,
    ProfileKey::DateOfBirth,
    ProfileKey::PostalCode,
    ProfileKey::City,
    ProfileKey::HousingType,
    ProfileKey::MonthlyNetIncome,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompletion {
    pub percentage: u8,
    pub filled: Vec<ProfileKey>,
    pub missing: Vec<ProfileKey>,
    pub total: usize,
}

pub fn profile_completion(profile: &NormalizedProfile, keys: &[ProfileKey]) -> ProfileCompletion {
    let (filled, missing): (Vec<ProfileKey>, Vec<ProfileKey>) =
        keys.iter().copied().partition(|key| profile.contains(*key));

    ProfileCompletion {
        percentage: rounded_percent(filled.len(), keys.len()),
        filled,
        missing,
        total: keys.len(),
    }
}

/// `round(100 * part / whole)`, with an empty whole reported as 0.
pub(crate) fn rounded_percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let percent = (100.0 * part as f64 / whole as f64).round();
    percent.clamp(0.0, 100.0) as u8
}
