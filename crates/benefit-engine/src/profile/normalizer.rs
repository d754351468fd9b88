use super::domain::{format_number, NormalizedProfile, ProfileKey, ProfileValue, ValueKind};
use super::sources::{self, NESTED_ROOTS};
use chrono::{DateTime, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

const ADDRESS_SOURCES: &[&str] = &["adresse", "address"];
const FULL_NAME_SOURCES: &[&str] = &["full_name", "fullName"];
const UNIT_SUFFIXES: &[&str] = &["eur", "€", "qm", "m²", "m2"];

/// A raw field that was present but could not be coerced into its canonical shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRejection {
    pub key: ProfileKey,
    pub source: String,
}

/// Normalized profile plus an audit of where each attribute came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizationReport {
    pub profile: NormalizedProfile,
    pub resolved_from: BTreeMap<ProfileKey, String>,
    pub rejections: Vec<FieldRejection>,
}

enum Coerced {
    Value(ProfileValue),
    Empty,
    Invalid,
}

/// Map an arbitrary raw profile onto the canonical schema. Never fails; malformed fields
/// are simply left undefined.
pub fn normalize(raw: &Value) -> NormalizedProfile {
    normalize_with_report(raw).profile
}

pub fn normalize_with_report(raw: &Value) -> NormalizationReport {
    let mut values = BTreeMap::new();
    let mut resolved_from = BTreeMap::new();
    let mut rejections = Vec::new();

    for key in ProfileKey::ordered() {
        for path in sources::precedence(key) {
            let Some(found) = lookup(raw, path) else {
                continue;
            };

            match coerce(key.value_kind(), found) {
                Coerced::Value(value) => {
                    values.insert(key, value);
                    resolved_from.insert(key, path.clone());
                    break;
                }
                Coerced::Empty => {}
                Coerced::Invalid => rejections.push(FieldRejection {
                    key,
                    source: path.clone(),
                }),
            }
        }
    }

    reconcile_address(raw, &mut values, &mut resolved_from);
    reconcile_full_name(raw, &mut values, &mut resolved_from);

    NormalizationReport {
        profile: NormalizedProfile::from_values(values),
        resolved_from,
        rejections,
    }
}

fn lookup<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(raw, |current, segment| current.as_object()?.get(segment))
}

fn coerce(kind: ValueKind, raw: &Value) -> Coerced {
    if raw.is_null() {
        return Coerced::Empty;
    }
    if let Value::String(text) = raw {
        if text.trim().is_empty() {
            return Coerced::Empty;
        }
    }

    let coerced = match kind {
        ValueKind::Text => coerce_text(raw),
        ValueKind::Amount => coerce_number(raw).map(ProfileValue::Number),
        ValueKind::Count => coerce_number(raw)
            .filter(|value| value.fract() == 0.0)
            .map(ProfileValue::Number),
        ValueKind::Flag => coerce_flag(raw).map(ProfileValue::Flag),
        ValueKind::Date => raw
            .as_str()
            .and_then(parse_date)
            .map(ProfileValue::Date),
        ValueKind::PostalCode => coerce_postal_code(raw).map(ProfileValue::Text),
        ValueKind::Iban => raw
            .as_str()
            .and_then(normalize_iban)
            .map(ProfileValue::Text),
        ValueKind::Email => raw
            .as_str()
            .and_then(normalize_email)
            .map(ProfileValue::Text),
    };

    match coerced {
        Some(value) => Coerced::Value(value),
        None => Coerced::Invalid,
    }
}

fn coerce_text(raw: &Value) -> Option<ProfileValue> {
    match raw {
        Value::String(text) => Some(ProfileValue::Text(text.trim().to_string())),
        Value::Number(number) => number
            .as_f64()
            .map(|value| ProfileValue::Text(format_number(value))),
        _ => None,
    }
}

fn coerce_number(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => parse_amount(text)?,
        _ => return None,
    };

    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Accepts `1200`, `1200.50`, `1.200`, `1.200,50`, `1,234.56`, `1200,50 €`, `65 m²` and
/// similar spellings. Separator shapes that are neither grouping nor a single decimal mark
/// yield `None`.
pub(crate) fn parse_amount(text: &str) -> Option<f64> {
    let mut cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect::<String>()
        .to_lowercase();

    for suffix in UNIT_SUFFIXES {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.to_string();
            break;
        }
    }
    if let Some(stripped) = cleaned.strip_prefix('€') {
        cleaned = stripped.to_string();
    }

    let (negative, body) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(cleaned.as_str())),
    };

    let value = canonical_decimal(body)?.parse::<f64>().ok()?;
    let value = if negative { -value } else { value };
    value.is_finite().then_some(value)
}

/// Rewrites a German or English spelling of a number into `1234.56` form.
fn canonical_decimal(body: &str) -> Option<String> {
    if body.is_empty()
        || !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    match (body.contains('.'), body.contains(',')) {
        (false, false) => Some(body.to_string()),
        (true, true) => {
            // The separator that comes last is the decimal mark.
            let (decimal, group) = if body.rfind(',') > body.rfind('.') {
                (',', '.')
            } else {
                ('.', ',')
            };
            let (whole, fraction) = body.rsplit_once(decimal)?;
            (is_grouped(whole, group) && all_digits(fraction))
                .then(|| format!("{}.{fraction}", whole.replace(group, "")))
        }
        (has_dot, _) => {
            let separator = if has_dot { '.' } else { ',' };
            if is_grouped(body, separator) {
                return Some(body.replace(separator, ""));
            }
            let (whole, fraction) = body.split_once(separator)?;
            (all_digits(whole) && all_digits(fraction)).then(|| format!("{whole}.{fraction}"))
        }
    }
}

/// `1.234.567` or `1,234`: a leading group of one to three digits, then groups of exactly three.
fn is_grouped(text: &str, separator: char) -> bool {
    let mut groups = text.split(separator);
    let Some(lead) = groups.next() else {
        return false;
    };
    if lead.is_empty() || lead.len() > 3 || lead.starts_with('0') || !all_digits(lead) {
        return false;
    }

    let mut rest = groups.peekable();
    rest.peek().is_some() && rest.all(|group| group.len() == 3 && all_digits(group))
}

fn all_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

fn coerce_flag(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "ja" | "yes" | "1" => Some(true),
            "false" | "nein" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    ["%d.%m.%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

fn coerce_postal_code(raw: &Value) -> Option<String> {
    let text = match raw {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.as_u64()?.to_string(),
        _ => return None,
    };

    if !text.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
        return None;
    }

    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        4 => Some(format!("0{digits}")),
        5 => Some(digits),
        _ => None,
    }
}

fn normalize_iban(value: &str) -> Option<String> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();

    let mut chars = compact.chars();
    let country_ok = chars.by_ref().take(2).all(|c| c.is_ascii_alphabetic());
    let check_ok = chars.by_ref().take(2).all(|c| c.is_ascii_digit());
    let body_ok = chars.all(|c| c.is_ascii_alphanumeric());

    ((15..=34).contains(&compact.len()) && country_ok && check_ok && body_ok).then_some(compact)
}

fn normalize_email(value: &str) -> Option<String> {
    let lowered = value.trim().to_lowercase();
    let (local, domain) = lowered.split_once('@')?;
    (!local.is_empty() && domain.contains('.') && !lowered.contains(char::is_whitespace))
        .then_some(lowered)
}

fn candidate_roots(raw: &Value) -> impl Iterator<Item = &Value> {
    std::iter::once(raw).chain(
        NESTED_ROOTS
            .iter()
            .filter_map(move |root| raw.as_object().and_then(|object| object.get(*root))),
    )
}

fn single_delimited_text<'a>(raw: &'a Value, names: &[&str]) -> Option<(&'a str, &'a str, String)> {
    for root in candidate_roots(raw) {
        for name in names {
            let Some(text) = root.get(*name).and_then(Value::as_str) else {
                continue;
            };
            let mut tokens = text.split_whitespace();
            if let (Some(first), Some(second), None) = (tokens.next(), tokens.next(), tokens.next())
            {
                return Some((first, second, name.to_string()));
            }
            return None;
        }
    }
    None
}

/// Splits `"Musterstraße 12"` into street and house number. Any other shape stays unresolved.
fn reconcile_address(
    raw: &Value,
    values: &mut BTreeMap<ProfileKey, ProfileValue>,
    resolved_from: &mut BTreeMap<ProfileKey, String>,
) {
    if values.contains_key(&ProfileKey::Street) || values.contains_key(&ProfileKey::HouseNumber) {
        return;
    }

    let Some((street, number, source)) = single_delimited_text(raw, ADDRESS_SOURCES) else {
        return;
    };
    if !number.starts_with(|c: char| c.is_ascii_digit()) {
        return;
    }

    values.insert(ProfileKey::Street, ProfileValue::Text(street.to_string()));
    values.insert(ProfileKey::HouseNumber, ProfileValue::Text(number.to_string()));
    resolved_from.insert(ProfileKey::Street, source.clone());
    resolved_from.insert(ProfileKey::HouseNumber, source);
}

fn reconcile_full_name(
    raw: &Value,
    values: &mut BTreeMap<ProfileKey, ProfileValue>,
    resolved_from: &mut BTreeMap<ProfileKey, String>,
) {
    if values.contains_key(&ProfileKey::FirstName) || values.contains_key(&ProfileKey::LastName) {
        return;
    }

    let Some((first, last, source)) = single_delimited_text(raw, FULL_NAME_SOURCES) else {
        return;
    };

    values.insert(ProfileKey::FirstName, ProfileValue::Text(first.to_string()));
    values.insert(ProfileKey::LastName, ProfileValue::Text(last.to_string()));
    resolved_from.insert(ProfileKey::FirstName, source.clone());
    resolved_from.insert(ProfileKey::LastName, source);
}
