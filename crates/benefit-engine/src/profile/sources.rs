use super::domain::ProfileKey;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Objects that historically duplicate top-level profile fields, in fallback order.
pub(crate) const NESTED_ROOTS: &[&str] = &["lebenssituation", "lifeSituation"];

/// Declared source names per canonical key: top-level names first, then the names used
/// inside each nested root.
const SOURCE_TABLE: &[(ProfileKey, &[&str], &[&str])] = &[
    (ProfileKey::FirstName, &["firstName", "vorname"], &[]),
    (ProfileKey::LastName, &["lastName", "nachname"], &[]),
    (
        ProfileKey::DateOfBirth,
        &["dateOfBirth", "geburtsdatum"],
        &["dateOfBirth", "geburtsdatum"],
    ),
    (ProfileKey::Email, &["email"], &[]),
    (ProfileKey::Phone, &["phone", "telefon"], &["telefon"]),
    (
        ProfileKey::Street,
        &["street", "strasse"],
        &["wohnadresse.strasse", "address.street"],
    ),
    (
        ProfileKey::HouseNumber,
        &["houseNumber", "hausnummer"],
        &["wohnadresse.hausnummer", "address.houseNumber"],
    ),
    (
        ProfileKey::PostalCode,
        &["postalCode", "plz"],
        &["wohnadresse.plz", "address.postalCode"],
    ),
    (
        ProfileKey::City,
        &["city", "stadt", "ort"],
        &["wohnadresse.ort", "address.city"],
    ),
    (
        ProfileKey::MonthlyNetIncome,
        &["monthlyNetIncome", "monatliches_nettoeinkommen"],
        &["monthlyNetIncome", "monatliches_nettoeinkommen"],
    ),
    (
        ProfileKey::Assets,
        &["assets", "vermoegen"],
        &["assets", "vermoegen"],
    ),
    (
        ProfileKey::NumberOfChildren,
        &["numberOfChildren", "kinder_anzahl", "anzahl_kinder"],
        &["numberOfChildren", "kinder_anzahl", "anzahl_kinder"],
    ),
    (
        ProfileKey::HouseholdSize,
        &["householdSize", "haushalt_groesse", "haushaltsmitglieder_anzahl"],
        &["householdSize", "haushalt_groesse", "haushaltsmitglieder_anzahl"],
    ),
    (
        ProfileKey::MaritalStatus,
        &["maritalStatus", "familienstand"],
        &["maritalStatus", "familienstand"],
    ),
    (
        ProfileKey::EmploymentStatus,
        &["employmentStatus", "beschaeftigungsstatus"],
        &["employmentStatus", "beschaeftigungsstatus"],
    ),
    (
        ProfileKey::EmployerName,
        &["employerName", "arbeitgeber"],
        &["employerName", "arbeitgeber"],
    ),
    (
        ProfileKey::HousingType,
        &["housingType", "wohnart"],
        &["housingType", "wohnart"],
    ),
    (
        ProfileKey::ColdRentAmount,
        &["coldRentAmount", "monatliche_miete_kalt"],
        &["coldRentAmount", "monatliche_miete_kalt"],
    ),
    (
        ProfileKey::LivingArea,
        &["livingArea", "wohnflaeche_qm", "wohnflaeche"],
        &["livingArea", "wohnflaeche_qm", "wohnflaeche"],
    ),
    (ProfileKey::Iban, &["iban"], &["iban", "bankverbindung.iban"]),
    (ProfileKey::TaxId, &["taxId", "steuer_id"], &[]),
    (
        ProfileKey::ResidencePermit,
        &["residencePermit", "aufenthaltstitel"],
        &["residencePermit", "aufenthaltstitel"],
    ),
];

static PRECEDENCE: OnceLock<HashMap<ProfileKey, Vec<String>>> = OnceLock::new();
static LEGACY_NAMES: OnceLock<HashMap<&'static str, ProfileKey>> = OnceLock::new();

/// Ordered dotted paths consulted when resolving `key`.
pub(crate) fn precedence(key: ProfileKey) -> &'static [String] {
    precedence_map()
        .get(&key)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn key_for_legacy_name(name: &str) -> Option<ProfileKey> {
    LEGACY_NAMES
        .get_or_init(|| {
            let mut map = HashMap::new();
            for (key, top_level, _) in SOURCE_TABLE {
                for name in top_level.iter() {
                    map.entry(*name).or_insert(*key);
                }
            }
            map
        })
        .get(name)
        .copied()
}

fn precedence_map() -> &'static HashMap<ProfileKey, Vec<String>> {
    PRECEDENCE.get_or_init(|| {
        let mut map = HashMap::with_capacity(SOURCE_TABLE.len());
        for (key, top_level, nested) in SOURCE_TABLE {
            let mut paths: Vec<String> = top_level.iter().map(|name| name.to_string()).collect();
            for root in NESTED_ROOTS {
                paths.extend(nested.iter().map(|name| format!("{root}.{name}")));
            }
            map.insert(*key, paths);
        }
        map
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_declares_sources() {
        for key in ProfileKey::ordered() {
            assert!(
                !precedence(key).is_empty(),
                "{key} has no declared source paths"
            );
        }
    }

    #[test]
    fn top_level_sources_precede_nested_ones() {
        let paths = precedence(ProfileKey::MonthlyNetIncome);
        assert_eq!(
            paths,
            [
                "monthlyNetIncome",
                "monatliches_nettoeinkommen",
                "lebenssituation.monthlyNetIncome",
                "lebenssituation.monatliches_nettoeinkommen",
                "lifeSituation.monthlyNetIncome",
                "lifeSituation.monatliches_nettoeinkommen",
            ]
        );
    }

    #[test]
    fn legacy_names_map_to_canonical_keys() {
        assert_eq!(
            key_for_legacy_name("kinder_anzahl"),
            Some(ProfileKey::NumberOfChildren)
        );
        assert_eq!(
            key_for_legacy_name("anzahl_kinder"),
            Some(ProfileKey::NumberOfChildren)
        );
        assert_eq!(key_for_legacy_name("wohnadresse.plz"), None);
    }
}
