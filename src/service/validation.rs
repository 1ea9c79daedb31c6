//! Record validation from tag rules. Collects every violation instead of stopping at the first.

use super::rules::RuleMap;
use crate::error::RecordError;
use crate::shape::{FieldType, Record};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    Required,
    Length,
}

/// Violations keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<Violation>>;

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub field_errors: FieldErrors,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.field_errors.is_empty()
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Check `record` against `rules`. Errors only when a rule names a field the record lacks.
    pub fn validate(record: &Record, rules: &RuleMap) -> Result<ValidationReport, RecordError> {
        let mut report = ValidationReport::default();
        for (name, rule) in rules {
            let field = record.shape().field(name).ok_or_else(|| RecordError::UnknownField {
                shape: record.shape().name().to_string(),
                field: name.clone(),
            })?;
            let value = record.get(name).unwrap_or(&Value::Null);
            let mut violations = Vec::new();
            match field.field_type {
                FieldType::String => {
                    let s = value.as_str().unwrap_or("");
                    if rule.required && s.is_empty() {
                        violations.push(Violation::Required);
                    }
                    if rule.has_length_bound() {
                        let len = s.chars().count();
                        let too_short = rule.min_length.map(|min| len < min).unwrap_or(false);
                        let too_long = rule.max_length.map(|max| len > max).unwrap_or(false);
                        if too_short || too_long {
                            violations.push(Violation::Length);
                        }
                    }
                }
                ty => {
                    if rule.required && *value == ty.zero_value() {
                        violations.push(Violation::Required);
                    }
                }
            }
            if !violations.is_empty() {
                report.field_errors.insert(name.clone(), violations);
            }
        }
        Ok(report)
    }
}
