//! Controller and endpoint registry: each route prefix maps to a base shape plus the shapes used
//! for create, read, update and list. Rules are extracted once here, at registration.

use crate::error::RegistrationError;
use crate::permissions::{Operation, Operations};
use crate::service::{extract_rules, fields_where, RuleMap};
use crate::shape::{Shape, ShapeFactory};
use crate::storage::Storage;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_TAG_NAME: &str = "crud";

/// One-argument transform applied to password-tagged values before they are stored.
pub type PasswordTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Clone)]
pub struct ControllerConfig {
    /// Tag whose metadata carries the field rules.
    pub tag_name: String,
    pub password_transform: Option<PasswordTransform>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            tag_name: DEFAULT_TAG_NAME.to_string(),
            password_transform: None,
        }
    }
}

impl ControllerConfig {
    pub fn tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    pub fn password_transform<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.password_transform = Some(Arc::new(f));
        self
    }
}

/// A registered shape with its name and precomputed rules.
#[derive(Clone)]
pub struct ShapeView {
    name: String,
    factory: Arc<dyn ShapeFactory>,
    rules: RuleMap,
}

impl ShapeView {
    /// Registered name; the permission gate matches against it.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> &Arc<dyn ShapeFactory> {
        &self.factory
    }

    pub fn shape(&self) -> &Arc<Shape> {
        self.factory.shape()
    }

    pub fn rules(&self) -> &RuleMap {
        &self.rules
    }

    pub fn hidden_fields(&self) -> Vec<String> {
        fields_where(&self.rules, |r| r.hidden)
    }

    pub fn password_fields(&self) -> Vec<String> {
        fields_where(&self.rules, |r| r.password)
    }
}

impl fmt::Debug for ShapeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeView")
            .field("name", &self.name)
            .field("rules", &self.rules)
            .finish()
    }
}

/// Per-endpoint shape substitution and enabled operations.
#[derive(Clone, Default)]
pub struct EndpointOptions {
    /// Input shape for create.
    pub create: Option<Arc<dyn ShapeFactory>>,
    /// Output shape for read.
    pub read: Option<Arc<dyn ShapeFactory>>,
    /// Input shape for update.
    pub update: Option<Arc<dyn ShapeFactory>>,
    /// Output shape for list items.
    pub list: Option<Arc<dyn ShapeFactory>>,
    /// Enabled operations; None means all.
    pub operations: Option<Operations>,
    /// Name to register the base shape under instead of its own.
    pub force_name: Option<String>,
}

impl EndpointOptions {
    pub fn new() -> Self {
        EndpointOptions::default()
    }

    pub fn create(mut self, f: Arc<dyn ShapeFactory>) -> Self {
        self.create = Some(f);
        self
    }

    pub fn read(mut self, f: Arc<dyn ShapeFactory>) -> Self {
        self.read = Some(f);
        self
    }

    pub fn update(mut self, f: Arc<dyn ShapeFactory>) -> Self {
        self.update = Some(f);
        self
    }

    pub fn list(mut self, f: Arc<dyn ShapeFactory>) -> Self {
        self.list = Some(f);
        self
    }

    pub fn operations(mut self, ops: impl Into<Operations>) -> Self {
        self.operations = Some(ops.into());
        self
    }

    pub fn force_name(mut self, name: impl Into<String>) -> Self {
        self.force_name = Some(name.into());
        self
    }
}

#[derive(Debug)]
pub struct Endpoint {
    prefix: String,
    operations: Operations,
    base: ShapeView,
    create: ShapeView,
    read: ShapeView,
    update: ShapeView,
    list: ShapeView,
}

impl Endpoint {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn operations(&self) -> Operations {
        self.operations
    }

    pub fn base(&self) -> &ShapeView {
        &self.base
    }

    /// Shape used for `op`. Delete always works on the base shape.
    pub fn view(&self, op: Operation) -> &ShapeView {
        match op {
            Operation::Create => &self.create,
            Operation::Read => &self.read,
            Operation::Update => &self.update,
            Operation::List => &self.list,
            Operation::Delete => &self.base,
        }
    }
}

pub struct Controller {
    storage: Arc<dyn Storage>,
    config: ControllerConfig,
    endpoints: Vec<Arc<Endpoint>>,
}

impl Controller {
    pub fn new(storage: Arc<dyn Storage>, config: ControllerConfig) -> Self {
        Controller {
            storage,
            config,
            endpoints: Vec::new(),
        }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn password_transform(&self) -> Option<&PasswordTransform> {
        self.config.password_transform.as_ref()
    }

    /// Register one shape with storage and extract its rules. `primary` is the base shape for
    /// secondary views; `force_name` replaces the shape's own name.
    pub fn register(
        &self,
        factory: Arc<dyn ShapeFactory>,
        primary: Option<&Arc<Shape>>,
        force_name: Option<&str>,
    ) -> Result<ShapeView, RegistrationError> {
        let shape = Arc::clone(factory.shape());
        self.storage
            .register_shape(&shape, primary, force_name)
            .map_err(|source| RegistrationError::Storage {
                shape: shape.name().to_string(),
                source,
            })?;
        let rules = extract_rules(&shape, &self.config.tag_name);
        Ok(ShapeView {
            name: force_name.unwrap_or(shape.name()).to_string(),
            factory,
            rules,
        })
    }

    /// Add an endpoint under `prefix` (must start and end with `/`). The base shape is
    /// registered first and backs storage; every optional shape is registered as a view of it.
    pub fn add_endpoint(
        &mut self,
        prefix: &str,
        base: Arc<dyn ShapeFactory>,
        options: EndpointOptions,
    ) -> Result<Arc<Endpoint>, RegistrationError> {
        if !prefix.starts_with('/') || !prefix.ends_with('/') {
            return Err(RegistrationError::InvalidPrefix(prefix.to_string()));
        }
        if self.endpoints.iter().any(|e| e.prefix == prefix) {
            return Err(RegistrationError::DuplicatePrefix(prefix.to_string()));
        }

        let base_view = self.register(base, None, options.force_name.as_deref())?;
        let primary = Arc::clone(base_view.shape());
        let view_or_base = |factory: Option<Arc<dyn ShapeFactory>>| -> Result<ShapeView, RegistrationError> {
            match factory {
                Some(f) => self.register(f, Some(&primary), None),
                None => Ok(base_view.clone()),
            }
        };
        let create = view_or_base(options.create)?;
        let read = view_or_base(options.read)?;
        let update = view_or_base(options.update)?;
        let list = view_or_base(options.list)?;

        let endpoint = Arc::new(Endpoint {
            prefix: prefix.to_string(),
            operations: options.operations.unwrap_or_default(),
            base: base_view,
            create,
            read,
            update,
            list,
        });
        tracing::info!(
            prefix = %endpoint.prefix,
            shape = endpoint.base.name(),
            create = endpoint.create.name(),
            read = endpoint.read.name(),
            update = endpoint.update.name(),
            list = endpoint.list.name(),
            "endpoint registered"
        );
        self.endpoints.push(Arc::clone(&endpoint));
        Ok(endpoint)
    }

    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Endpoint with the longest prefix matching `path`, and the path remainder after it.
    /// The prefix without its trailing slash also matches, with an empty remainder.
    pub fn resolve(&self, path: &str) -> Option<(Arc<Endpoint>, String)> {
        self.endpoints
            .iter()
            .filter_map(|e| {
                if let Some(rest) = path.strip_prefix(e.prefix.as_str()) {
                    Some((e, rest))
                } else if path == e.prefix.trim_end_matches('/') {
                    Some((e, ""))
                } else {
                    None
                }
            })
            .max_by_key(|(e, _)| e.prefix.len())
            .map(|(e, rest)| (Arc::clone(e), rest.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::shape::{Field, FieldType, StaticShape};
    use crate::storage::MemoryStorage;

    fn user() -> StaticShape {
        StaticShape::new(
            Shape::new(
                "User",
                vec![
                    Field::id("id", FieldType::Int64).json("user_id"),
                    Field::new("name", FieldType::String).tag("crud", "lenmax:50"),
                    Field::new("password", FieldType::String).tag("crud", "hidden password"),
                ],
            )
            .unwrap(),
        )
    }

    fn user_password() -> StaticShape {
        StaticShape::new(
            Shape::new(
                "User_UpdatePassword",
                vec![
                    Field::id("id", FieldType::Int64).json("user_id"),
                    Field::new("password", FieldType::String).tag("crud", "req password"),
                ],
            )
            .unwrap(),
        )
    }

    fn controller() -> Controller {
        Controller::new(Arc::new(MemoryStorage::new()), ControllerConfig::default())
    }

    #[test]
    fn unset_views_fall_back_to_base() {
        let mut c = controller();
        let ep = c
            .add_endpoint("/users/", user().shared(), EndpointOptions::new())
            .unwrap();
        assert_eq!(ep.view(Operation::Update).name(), "User");
        assert_eq!(ep.view(Operation::List).hidden_fields(), vec!["password".to_string()]);
        assert!(ep.operations().contains(Operation::Delete));
    }

    #[test]
    fn views_carry_their_own_rules() {
        let mut c = controller();
        let ep = c
            .add_endpoint(
                "/users/password/",
                user().shared(),
                EndpointOptions::new()
                    .update(user_password().shared())
                    .operations(Operation::Update),
            )
            .unwrap();
        let view = ep.view(Operation::Update);
        assert_eq!(view.name(), "User_UpdatePassword");
        assert!(view.rules()["password"].required);
        assert_eq!(view.password_fields(), vec!["password".to_string()]);
        assert!(!ep.operations().contains(Operation::Read));
    }

    #[test]
    fn force_name_renames_base_view() {
        let mut c = controller();
        let ep = c
            .add_endpoint("/accounts/", user().shared(), EndpointOptions::new().force_name("Account"))
            .unwrap();
        assert_eq!(ep.base().name(), "Account");
        assert_eq!(ep.view(Operation::Read).name(), "Account");
    }

    #[test]
    fn incompatible_view_fails_registration() {
        let mut c = controller();
        let stray = StaticShape::new(
            Shape::new(
                "Stray",
                vec![Field::id("id", FieldType::Int64), Field::new("nick", FieldType::String)],
            )
            .unwrap(),
        );
        let err = c
            .add_endpoint("/users/", user().shared(), EndpointOptions::new().create(stray.shared()))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::Storage {
                source: StorageError::IncompatibleShape { .. },
                ..
            }
        ));
    }

    #[test]
    fn resolves_longest_prefix() {
        let mut c = controller();
        c.add_endpoint("/users/", user().shared(), EndpointOptions::new()).unwrap();
        c.add_endpoint(
            "/users/password/",
            user().shared(),
            EndpointOptions::new().update(user_password().shared()),
        )
        .unwrap();
        let (ep, rest) = c.resolve("/users/password/7").unwrap();
        assert_eq!((ep.prefix(), rest.as_str()), ("/users/password/", "7"));
        let (ep, rest) = c.resolve("/users/12").unwrap();
        assert_eq!((ep.prefix(), rest.as_str()), ("/users/", "12"));
        let (_, rest) = c.resolve("/users").unwrap();
        assert_eq!(rest, "");
        assert!(c.resolve("/orders/1").is_none());
    }

    #[test]
    fn rejects_bad_and_duplicate_prefixes() {
        let mut c = controller();
        assert!(matches!(
            c.add_endpoint("users", user().shared(), EndpointOptions::new()),
            Err(RegistrationError::InvalidPrefix(_))
        ));
        c.add_endpoint("/users/", user().shared(), EndpointOptions::new()).unwrap();
        assert!(matches!(
            c.add_endpoint("/users/", user().shared(), EndpointOptions::new()),
            Err(RegistrationError::DuplicatePrefix(_))
        ));
    }
}
