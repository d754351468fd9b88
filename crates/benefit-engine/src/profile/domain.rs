use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Canonical attribute names shared by the evaluators and the autofill mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileKey {
    FirstName,
    LastName,
    DateOfBirth,
    Email,
    Phone,
    Street,
    HouseNumber,
    PostalCode,
    City,
    MonthlyNetIncome,
    Assets,
    NumberOfChildren,
    HouseholdSize,
    MaritalStatus,
    EmploymentStatus,
    EmployerName,
    HousingType,
    ColdRentAmount,
    LivingArea,
    Iban,
    TaxId,
    ResidencePermit,
}

impl ProfileKey {
    pub const fn ordered() -> [Self; 22] {
        [
            Self::FirstName,
            Self::LastName,
            Self::DateOfBirth,
            Self::Email,
            Self::Phone,
            Self::Street,
            Self::HouseNumber,
            Self::PostalCode,
            Self::City,
            Self::MonthlyNetIncome,
            Self::Assets,
            Self::NumberOfChildren,
            Self::HouseholdSize,
            Self::MaritalStatus,
            Self::EmploymentStatus,
            Self::EmployerName,
            Self::HousingType,
            Self::ColdRentAmount,
            Self::LivingArea,
            Self::Iban,
            Self::TaxId,
            Self::ResidencePermit,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::DateOfBirth => "dateOfBirth",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Street => "street",
            Self::HouseNumber => "houseNumber",
            Self::PostalCode => "postalCode",
            Self::City => "city",
            Self::MonthlyNetIncome => "monthlyNetIncome",
            Self::Assets => "assets",
            Self::NumberOfChildren => "numberOfChildren",
            Self::HouseholdSize => "householdSize",
            Self::MaritalStatus => "maritalStatus",
            Self::EmploymentStatus => "employmentStatus",
            Self::EmployerName => "employerName",
            Self::HousingType => "housingType",
            Self::ColdRentAmount => "coldRentAmount",
            Self::LivingArea => "livingArea",
            Self::Iban => "iban",
            Self::TaxId => "taxId",
            Self::ResidencePermit => "residencePermit",
        }
    }

    /// Shape the normalizer coerces this attribute into.
    pub const fn value_kind(self) -> ValueKind {
        match self {
            Self::MonthlyNetIncome | Self::Assets | Self::ColdRentAmount | Self::LivingArea => {
                ValueKind::Amount
            }
            Self::NumberOfChildren | Self::HouseholdSize => ValueKind::Count,
            Self::DateOfBirth => ValueKind::Date,
            Self::ResidencePermit => ValueKind::Flag,
            Self::PostalCode => ValueKind::PostalCode,
            Self::Iban => ValueKind::Iban,
            Self::Email => ValueKind::Email,
            _ => ValueKind::Text,
        }
    }

    /// Resolve a catalogue reference, accepting canonical names and the legacy field names
    /// the normalizer reads from raw profiles.
    pub fn from_alias(alias: &str) -> Option<Self> {
        let trimmed = alias.trim();
        Self::ordered()
            .into_iter()
            .find(|key| key.as_str() == trimmed)
            .or_else(|| super::sources::key_for_legacy_name(trimmed))
    }
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coercion targets for raw profile fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Amount,
    Count,
    Flag,
    Date,
    PostalCode,
    Iban,
    Email,
}

impl ValueKind {
    pub const fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Amount | ValueKind::Count)
    }

    pub const fn is_textual(self) -> bool {
        matches!(
            self,
            ValueKind::Text | ValueKind::PostalCode | ValueKind::Iban | ValueKind::Email
        )
    }
}

/// Scalar held by a normalized attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProfileValue {
    Flag(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl ProfileValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ProfileValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ProfileValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ProfileValue::Flag(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ProfileValue::Date(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for ProfileValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileValue::Flag(value) => write!(f, "{value}"),
            ProfileValue::Number(value) => f.write_str(&format_number(*value)),
            ProfileValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            ProfileValue::Text(value) => f.write_str(value),
        }
    }
}

/// Renders a number without trailing zeros; integral values carry no decimal point.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let rendered = format!("{value:.4}");
        rendered
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Canonical, flat profile. Only the normalizer builds one from raw input, so a missing key
/// always means "not provided".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedProfile {
    values: BTreeMap<ProfileKey, ProfileValue>,
}

impl NormalizedProfile {
    pub(crate) fn from_values(values: BTreeMap<ProfileKey, ProfileValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: ProfileKey) -> Option<&ProfileValue> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: ProfileKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn number(&self, key: ProfileKey) -> Option<f64> {
        self.get(key).and_then(ProfileValue::as_number)
    }

    pub fn text(&self, key: ProfileKey) -> Option<&str> {
        self.get(key).and_then(ProfileValue::as_text)
    }

    pub fn flag(&self, key: ProfileKey) -> Option<bool> {
        self.get(key).and_then(ProfileValue::as_flag)
    }

    pub fn date(&self, key: ProfileKey) -> Option<NaiveDate> {
        self.get(key).and_then(ProfileValue::as_date)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileKey, &ProfileValue)> {
        self.values.iter().map(|(key, value)| (*key, value))
    }

    /// Copy of the profile with `key` left undefined.
    pub fn without(&self, key: ProfileKey) -> Self {
        let mut values = self.values.clone();
        values.remove(&key);
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip_through_aliases() {
        for key in ProfileKey::ordered() {
            assert_eq!(ProfileKey::from_alias(key.as_str()), Some(key));
        }
        assert_eq!(
            ProfileKey::from_alias("monatliches_nettoeinkommen"),
            Some(ProfileKey::MonthlyNetIncome)
        );
        assert_eq!(ProfileKey::from_alias("shoeSize"), None);
    }

    #[test]
    fn format_number_strips_trailing_zeros() {
        assert_eq!(format_number(900.0), "900");
        assert_eq!(format_number(1234.5), "1234.5");
        assert_eq!(format_number(0.125), "0.125");
    }

    #[test]
    fn without_returns_a_new_profile() {
        let mut values = BTreeMap::new();
        values.insert(ProfileKey::MonthlyNetIncome, ProfileValue::Number(900.0));
        values.insert(
            ProfileKey::EmploymentStatus,
            ProfileValue::Text("unemployed".to_string()),
        );
        let profile = NormalizedProfile::from_values(values);

        let reduced = profile.without(ProfileKey::EmploymentStatus);

        assert!(profile.contains(ProfileKey::EmploymentStatus));
        assert!(!reduced.contains(ProfileKey::EmploymentStatus));
        assert_eq!(reduced.number(ProfileKey::MonthlyNetIncome), Some(900.0));
    }
}
