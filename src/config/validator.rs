//! Config validation: referential integrity and endpoint consistency.
//! Per-shape field checks happen when each shape is built.

use crate::config::FullConfig;
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    let mut shape_names = HashSet::new();
    for s in &config.shapes {
        if !shape_names.insert(s.name.as_str()) {
            return Err(ConfigError::Validation(format!("shape '{}' declared twice", s.name)));
        }
    }

    let mut prefixes = HashSet::new();
    for e in &config.endpoints {
        if !e.prefix.starts_with('/') || !e.prefix.ends_with('/') {
            return Err(ConfigError::Validation(format!(
                "endpoint prefix '{}' must start and end with '/'",
                e.prefix
            )));
        }
        if !prefixes.insert(e.prefix.as_str()) {
            return Err(ConfigError::DuplicatePrefix(e.prefix.clone()));
        }
        for name in std::iter::once(e.shape.as_str()).chain(e.view_names()) {
            if !shape_names.contains(name) {
                return Err(ConfigError::MissingReference {
                    kind: "shape",
                    id: name.to_string(),
                });
            }
        }
        if matches!(&e.operations, Some(ops) if ops.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "endpoint '{}' enables no operations",
                e.prefix
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> FullConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn accepts_well_formed_config() {
        let config = parse(
            r#"{"shapes":[{"name":"Item","fields":[{"name":"id","type":"int64","identity":true}]}],
                "endpoints":[{"prefix":"/items/","shape":"Item"}]}"#,
        );
        validate(&config).unwrap();
    }

    #[test]
    fn rejects_unknown_view_shape() {
        let config = parse(
            r#"{"shapes":[{"name":"Item","fields":[{"name":"id","type":"int64","identity":true}]}],
                "endpoints":[{"prefix":"/items/","shape":"Item","list":"ItemRow"}]}"#,
        );
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "shape", id }) if id == "ItemRow"
        ));
    }

    #[test]
    fn rejects_duplicate_prefix() {
        let config = parse(
            r#"{"shapes":[{"name":"Item","fields":[{"name":"id","type":"int64","identity":true}]}],
                "endpoints":[{"prefix":"/items/","shape":"Item"},{"prefix":"/items/","shape":"Item"}]}"#,
        );
        assert!(matches!(validate(&config), Err(ConfigError::DuplicatePrefix(_))));
    }

    #[test]
    fn rejects_empty_operation_list() {
        let config = parse(
            r#"{"shapes":[{"name":"Item","fields":[{"name":"id","type":"int64","identity":true}]}],
                "endpoints":[{"prefix":"/items/","shape":"Item","operations":[]}]}"#,
        );
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }
}
