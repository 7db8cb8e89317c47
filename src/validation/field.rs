// Field validators: required, type, constraint and enum checks over model metadata
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::str::FromStr;

use crate::model::{FieldMetadata, FieldType, Model};
use crate::observer::error::{codes, ValidationError};
use crate::types::Record;

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern compiles")
});

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles")
});

/// Run every field check over one record in a single pass
///
/// A field that fails its type check is not checked further, so one bad value
/// produces one `INVALID_TYPE` rather than a cascade.
pub fn validate_record(record: &Record, record_index: usize, model: &Model) -> Vec<ValidationError> {
    let mut errors = validate_required(record, record_index, model);

    for field in model.fields.values() {
        if model.is_required(&field.name) && present(record, &field.name).is_none() {
            continue;
        }

        let type_errors = validate_type(record, record_index, field);
        if !type_errors.is_empty() {
            errors.extend(type_errors);
            continue;
        }

        errors.extend(validate_constraints(record, record_index, field));
        errors.extend(validate_enums(record, record_index, field));
    }

    errors
}

/// Every required field must be present and non-null
pub fn validate_required(record: &Record, record_index: usize, model: &Model) -> Vec<ValidationError> {
    model
        .required_fields
        .iter()
        .filter(|name| present(record, name).is_none())
        .map(|name| {
            ValidationError::new(codes::REQUIRED_FIELD_MISSING, format!("Required field '{}' is missing", name))
                .with_field(name.as_str())
                .at_record(record_index)
        })
        .collect()
}

pub fn validate_type(record: &Record, record_index: usize, field: &FieldMetadata) -> Vec<ValidationError> {
    let Some(value) = present(record, &field.name) else {
        return Vec::new();
    };

    let failure = if field.is_array {
        match value.as_array() {
            Some(items) => items
                .iter()
                .position(|item| !matches_type(&field.field_type, item))
                .map(|index| json!({ "expected": field.field_type.as_str(), "index": index })),
            None => Some(json!({ "expected": field.type_label() })),
        }
    } else if matches_type(&field.field_type, value) {
        None
    } else {
        Some(json!({ "expected": field.type_label() }))
    };

    match failure {
        Some(details) => vec![ValidationError::new(
            codes::INVALID_TYPE,
            format!("Field '{}' must be of type {}", field.name, field.type_label()),
        )
        .with_field(field.name.as_str())
        .at_record(record_index)
        .with_details(details)],
        None => Vec::new(),
    }
}

/// Numeric minimum/maximum and string pattern
pub fn validate_constraints(record: &Record, record_index: usize, field: &FieldMetadata) -> Vec<ValidationError> {
    if field.minimum.is_none() && field.maximum.is_none() && field.pattern.is_none() {
        return Vec::new();
    }

    let Some(value) = present(record, &field.name) else {
        return Vec::new();
    };

    let mut errors = Vec::new();
    for (index, item) in elements(field, value) {
        let found = check_constraints(field, item);
        if !found.is_empty() {
            errors.extend(found.into_iter().map(|(code, message, mut details)| {
                if let (Some(index), Some(map)) = (index, details.as_object_mut()) {
                    map.insert("index".to_string(), json!(index));
                }
                ValidationError::new(code, message)
                    .with_field(field.name.as_str())
                    .at_record(record_index)
                    .with_details(details)
            }));
            break;
        }
    }
    errors
}

pub fn validate_enums(record: &Record, record_index: usize, field: &FieldMetadata) -> Vec<ValidationError> {
    let (Some(allowed), Some(value)) = (&field.enum_values, present(record, &field.name)) else {
        return Vec::new();
    };

    let failing = elements(field, value).find(|(_, item)| !allowed.contains(*item));

    match failing {
        Some((index, item)) => {
            let mut details = json!({ "allowed": allowed, "actual": item });
            if let (Some(index), Some(map)) = (index, details.as_object_mut()) {
                map.insert("index".to_string(), json!(index));
            }
            vec![ValidationError::new(
                codes::INVALID_ENUM_VALUE,
                format!("Field '{}' must be one of {}", field.name, Value::Array(allowed.clone())),
            )
            .with_field(field.name.as_str())
            .at_record(record_index)
            .with_details(details)]
        }
        None => Vec::new(),
    }
}

/// Non-null value for a field, if any
fn present<'a>(record: &'a Record, name: &str) -> Option<&'a Value> {
    record.get(name).filter(|value| !value.is_null())
}

/// Values to check: each element (with its index) for arrays, the value itself otherwise
fn elements<'a>(field: &FieldMetadata, value: &'a Value) -> Box<dyn Iterator<Item = (Option<usize>, &'a Value)> + 'a> {
    match (field.is_array, value.as_array()) {
        (true, Some(items)) => Box::new(items.iter().enumerate().map(|(i, item)| (Some(i), item))),
        _ => Box::new(std::iter::once((None, value))),
    }
}

fn matches_type(field_type: &FieldType, value: &Value) -> bool {
    if value.is_null() {
        return true;
    }

    match field_type {
        FieldType::Text => value.is_string(),
        FieldType::Integer => is_i32(value),
        FieldType::Numeric => numeric_value(value).is_some(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Object => value.is_object(),
        FieldType::Uuid => value.as_str().is_some_and(|s| UUID_PATTERN.is_match(s)),
        FieldType::Timestamp => value.as_str().is_some_and(is_timestamp),
        FieldType::Date => value.as_str().is_some_and(is_date),
        FieldType::Unknown(_) => true,
    }
}

fn is_i32(value: &Value) -> bool {
    let range = i32::MIN as f64..=i32::MAX as f64;
    if let Some(n) = value.as_i64() {
        return i32::try_from(n).is_ok();
    }
    match value.as_f64() {
        Some(n) => n.fract() == 0.0 && range.contains(&n),
        None => false,
    }
}

/// Finite numbers, or strings holding an arbitrary-precision decimal
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let decimal = BigDecimal::from_str(s.trim()).ok()?;
            decimal.to_string().parse::<f64>().ok()
        }
        _ => None,
    }
}

fn is_timestamp(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || is_date(s)
}

fn is_date(s: &str) -> bool {
    DATE_PATTERN.is_match(s) && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn check_constraints(field: &FieldMetadata, value: &Value) -> Vec<(&'static str, String, Value)> {
    let mut found = Vec::new();

    if let Some(number) = numeric_value(value).filter(|_| !value.is_string() || field.field_type == FieldType::Numeric) {
        if let Some(minimum) = field.minimum.filter(|min| number < *min) {
            found.push((
                codes::BELOW_MINIMUM,
                format!("Field '{}' must be at least {}", field.name, minimum),
                json!({ "minimum": minimum, "actual": value }),
            ));
        }
        if let Some(maximum) = field.maximum.filter(|max| number > *max) {
            found.push((
                codes::ABOVE_MAXIMUM,
                format!("Field '{}' must be at most {}", field.name, maximum),
                json!({ "maximum": maximum, "actual": value }),
            ));
        }
    }

    if let (Some(pattern), Some(text)) = (&field.pattern, value.as_str()) {
        if !pattern.is_match(text) {
            found.push((
                codes::PATTERN_MISMATCH,
                format!("Field '{}' does not match pattern {}", field.name, pattern.as_str()),
                json!({ "pattern": pattern.as_str(), "actual": value }),
            ));
        }
    }

    found
}
