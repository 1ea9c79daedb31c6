//! Field rules from tag metadata: `req`, `lenmin:N`, `lenmax:N`, `hidden`, `password`.

use crate::shape::{FieldType, Shape};
use std::collections::BTreeMap;

/// Constraints and visibility flags for one field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldRules {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Masked in read and list output.
    pub hidden: bool,
    /// Passed through the password transform on write.
    pub password: bool,
}

impl FieldRules {
    pub fn has_length_bound(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some()
    }
}

/// Rules keyed by field name. Fields without recognized tokens are absent.
pub type RuleMap = BTreeMap<String, FieldRules>;

/// Parse one metadata string. Unknown tokens are ignored; a malformed `lenmin`/`lenmax`
/// number leaves that bound unset. None when no token was recognized.
pub fn parse_tag(tag: &str) -> Option<FieldRules> {
    let mut rules = FieldRules::default();
    let mut recognized = false;
    for token in tag.split(' ') {
        match token {
            "req" => {
                rules.required = true;
                recognized = true;
            }
            "hidden" => {
                rules.hidden = true;
                recognized = true;
            }
            "password" => {
                rules.password = true;
                recognized = true;
            }
            _ => {
                if let Some(n) = token.strip_prefix("lenmin:") {
                    rules.min_length = n.parse().ok();
                    recognized = true;
                } else if let Some(n) = token.strip_prefix("lenmax:") {
                    rules.max_length = n.parse().ok();
                    recognized = true;
                }
            }
        }
    }
    recognized.then_some(rules)
}

/// Build the rule map for a shape from the metadata under `tag_name`.
///
/// Length, `hidden` and `password` only apply to string fields. Integer, bool and float
/// fields keep `req` alone, which the validator enforces as "not the zero value".
pub fn extract_rules(shape: &Shape, tag_name: &str) -> RuleMap {
    let mut out = RuleMap::new();
    for field in shape.fields() {
        let Some(tag) = field.tag_value(tag_name).filter(|t| !t.is_empty()) else {
            continue;
        };
        let Some(mut rules) = parse_tag(tag) else { continue };
        if field.field_type != FieldType::String {
            if !rules.required {
                continue;
            }
            rules = FieldRules {
                required: true,
                ..FieldRules::default()
            };
        }
        out.insert(field.name.clone(), rules);
    }
    out
}

/// Names of fields carrying `flag` in a rule map.
pub fn fields_where(rules: &RuleMap, flag: fn(&FieldRules) -> bool) -> Vec<String> {
    rules
        .iter()
        .filter(|(_, r)| flag(r))
        .map(|(name, _)| name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Field;

    #[test]
    fn parses_all_tokens() {
        let r = parse_tag("req lenmin:2 lenmax:50 hidden password").unwrap();
        assert!(r.required && r.hidden && r.password);
        assert_eq!(r.min_length, Some(2));
        assert_eq!(r.max_length, Some(50));
    }

    #[test]
    fn malformed_lengths_are_absent_not_fatal() {
        let r = parse_tag("lenmin:two lenmax:-1 req").unwrap();
        assert_eq!(r.min_length, None);
        assert_eq!(r.max_length, None);
        assert!(r.required);
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        assert_eq!(parse_tag("email uppercase"), None);
        let r = parse_tag("email  hidden").unwrap();
        assert!(r.hidden);
    }

    #[test]
    fn extracts_string_rules_and_required_numbers() {
        let shape = Shape::new(
            "User",
            vec![
                Field::id("id", FieldType::Int64),
                Field::new("name", FieldType::String).tag("crud", "req lenmin:2 lenmax:50"),
                Field::new("note", FieldType::String).tag("crud", "whatever"),
                Field::new("flags", FieldType::Int).tag("crud", "req hidden lenmax:3"),
                Field::new("age", FieldType::Int).tag("crud", "hidden"),
                Field::new("secret", FieldType::String).tag("other", "hidden"),
            ],
        )
        .unwrap();
        let rules = extract_rules(&shape, "crud");
        assert_eq!(rules.len(), 2);
        assert_eq!(rules["name"].max_length, Some(50));
        assert_eq!(
            rules["flags"],
            FieldRules {
                required: true,
                ..FieldRules::default()
            }
        );
        assert!(!rules.contains_key("secret"));
        assert!(extract_rules(&shape, "other").contains_key("secret"));
    }
}
