use crate::catalogue::{FieldSpec, FieldType};
use crate::profile::{format_number, ProfileValue};

/// Presentation-safe string for `value` in `field`, or `None` when the value cannot be
/// placed without guessing.
pub(crate) fn render_value(field: &FieldSpec, value: &ProfileValue) -> Option<String> {
    match field.field_type {
        FieldType::Text => Some(value.to_string()),
        FieldType::Number => value.as_number().map(format_number),
        FieldType::Date => value
            .as_date()
            .map(|date| date.format("%Y-%m-%d").to_string()),
        FieldType::Boolean => value.as_flag().map(|flag| flag.to_string()),
        FieldType::Select => {
            let text = value.as_text()?.trim();
            field
                .options
                .iter()
                .find(|option| option.trim().to_lowercase() == text.to_lowercase())
                .cloned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileKey;
    use chrono::NaiveDate;

    fn field(field_type: FieldType, options: &[&str]) -> FieldSpec {
        FieldSpec {
            field_id: "f".to_string(),
            label: "F".to_string(),
            field_type,
            required: true,
            profile_key: Some(ProfileKey::MaritalStatus),
            options: options.iter().map(|option| option.to_string()).collect(),
        }
    }

    #[test]
    fn numbers_render_without_units_or_trailing_zeros() {
        let number = field(FieldType::Number, &[]);
        assert_eq!(
            render_value(&number, &ProfileValue::Number(850.0)),
            Some("850".to_string())
        );
        assert_eq!(
            render_value(&number, &ProfileValue::Number(62.5)),
            Some("62.5".to_string())
        );
    }

    #[test]
    fn dates_render_as_iso() {
        let date = NaiveDate::from_ymd_opt(1988, 4, 2).expect("valid date");
        assert_eq!(
            render_value(&field(FieldType::Date, &[]), &ProfileValue::Date(date)),
            Some("1988-04-02".to_string())
        );
        assert_eq!(
            render_value(&field(FieldType::Text, &[]), &ProfileValue::Date(date)),
            Some("1988-04-02".to_string())
        );
    }

    #[test]
    fn selects_use_the_option_spelling_or_stay_unresolved() {
        let select = field(FieldType::Select, &["ledig", "Verheiratet"]);
        assert_eq!(
            render_value(&select, &ProfileValue::Text("verheiratet".to_string())),
            Some("Verheiratet".to_string())
        );
        assert_eq!(
            render_value(&select, &ProfileValue::Text("kompliziert".to_string())),
            None
        );
    }

    #[test]
    fn booleans_render_as_literals() {
        assert_eq!(
            render_value(&field(FieldType::Boolean, &[]), &ProfileValue::Flag(false)),
            Some("false".to_string())
        );
    }
}
