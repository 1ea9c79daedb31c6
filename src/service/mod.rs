//! Request services: tag rules, validation and list-query translation.

mod query;
mod rules;
mod validation;

pub use query::{parse_params, translate, FilterValue, ListQuery, Order, DEFAULT_LIMIT, FILTER_PREFIX};
pub use rules::{extract_rules, fields_where, parse_tag, FieldRules, RuleMap};
pub use validation::{FieldErrors, RequestValidator, ValidationReport, Violation};
