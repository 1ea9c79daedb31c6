//! Load shape and endpoint descriptors from a JSON file and resolve them into shapes ready for
//! registration.

use crate::config::{validate, EndpointConfig, FullConfig};
use crate::error::{ConfigError, RegistrationError};
use crate::permissions::Operations;
use crate::registry::{Controller, Endpoint, EndpointOptions};
use crate::shape::{Shape, ShapeFactory, StaticShape};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Endpoint with every shape reference resolved.
#[derive(Clone, Debug)]
pub struct ResolvedEndpoint {
    pub prefix: String,
    pub base: Arc<Shape>,
    pub create: Option<Arc<Shape>>,
    pub read: Option<Arc<Shape>>,
    pub update: Option<Arc<Shape>>,
    pub list: Option<Arc<Shape>>,
    pub operations: Operations,
    pub force_name: Option<String>,
}

impl ResolvedEndpoint {
    fn options(&self) -> EndpointOptions {
        let factory = |s: &Option<Arc<Shape>>| {
            s.as_ref()
                .map(|s| Arc::new(StaticShape::from(Arc::clone(s))) as Arc<dyn ShapeFactory>)
        };
        EndpointOptions {
            create: factory(&self.create),
            read: factory(&self.read),
            update: factory(&self.update),
            list: factory(&self.list),
            operations: Some(self.operations),
            force_name: self.force_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub shapes: BTreeMap<String, Arc<Shape>>,
    pub endpoints: Vec<ResolvedEndpoint>,
}

impl ResolvedModel {
    pub fn shape(&self, name: &str) -> Option<&Arc<Shape>> {
        self.shapes.get(name)
    }

    /// Base shapes of all endpoints, each once, in endpoint order. These are the shapes that
    /// need a backing table.
    pub fn base_shapes(&self) -> Vec<&Shape> {
        let mut out: Vec<&Shape> = Vec::new();
        for e in &self.endpoints {
            if !out.iter().any(|s| s.name() == e.base.name()) {
                out.push(&e.base);
            }
        }
        out
    }

    /// Register every endpoint on the controller, in config order.
    pub fn register(&self, controller: &mut Controller) -> Result<Vec<Arc<Endpoint>>, RegistrationError> {
        self.endpoints
            .iter()
            .map(|e| {
                let base: Arc<dyn ShapeFactory> = Arc::new(StaticShape::from(Arc::clone(&e.base)));
                controller.add_endpoint(&e.prefix, base, e.options())
            })
            .collect()
    }
}

fn lookup(shapes: &BTreeMap<String, Arc<Shape>>, name: &str) -> Result<Arc<Shape>, ConfigError> {
    shapes
        .get(name)
        .cloned()
        .ok_or_else(|| ConfigError::MissingReference {
            kind: "shape",
            id: name.to_string(),
        })
}

fn resolve_endpoint(
    shapes: &BTreeMap<String, Arc<Shape>>,
    e: &EndpointConfig,
) -> Result<ResolvedEndpoint, ConfigError> {
    let view = |name: &Option<String>| name.as_deref().map(|n| lookup(shapes, n)).transpose();
    Ok(ResolvedEndpoint {
        prefix: e.prefix.clone(),
        base: lookup(shapes, &e.shape)?,
        create: view(&e.create)?,
        read: view(&e.read)?,
        update: view(&e.update)?,
        list: view(&e.list)?,
        operations: e
            .operations
            .as_ref()
            .map(|ops| ops.iter().copied().collect())
            .unwrap_or_default(),
        force_name: e.force_name.clone(),
    })
}

/// Validate the config and build every shape and endpoint it declares.
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;
    let mut shapes = BTreeMap::new();
    for s in &config.shapes {
        let fields = s.fields.iter().map(|f| f.to_field()).collect();
        let shape = Shape::new(&s.name, fields)?;
        shapes.insert(s.name.clone(), Arc::new(shape));
    }
    let endpoints = config
        .endpoints
        .iter()
        .map(|e| resolve_endpoint(&shapes, e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResolvedModel { shapes, endpoints })
}

/// Read a JSON descriptor file (`{"shapes": [...], "endpoints": [...]}`).
pub async fn load_shapes_from_path(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config: FullConfig =
        serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    tracing::info!(
        path = %path.display(),
        shapes = config.shapes.len(),
        endpoints = config.endpoints.len(),
        "config loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Operation;
    use crate::registry::ControllerConfig;
    use crate::storage::MemoryStorage;

    const CONFIG: &str = r#"{
        "shapes": [
            {"name": "Product", "fields": [
                {"name": "id", "type": "int64", "identity": true},
                {"name": "title", "type": "string", "tags": {"crud": "req lenmin:2"}},
                {"name": "price", "type": "float"},
                {"name": "secret", "type": "string", "json": "sku_secret", "tags": {"crud": "hidden"}}
            ]},
            {"name": "ProductRow", "fields": [
                {"name": "id", "type": "int64", "identity": true},
                {"name": "title", "type": "string"}
            ]}
        ],
        "endpoints": [
            {"prefix": "/products/", "shape": "Product", "list": "ProductRow"},
            {"prefix": "/catalog/", "shape": "Product", "operations": ["read", "list"], "force_name": "Catalog"}
        ]
    }"#;

    fn model() -> ResolvedModel {
        resolve(&serde_json::from_str(CONFIG).unwrap()).unwrap()
    }

    #[test]
    fn resolves_shapes_and_views() {
        let m = model();
        let product = m.shape("Product").unwrap();
        assert_eq!(product.field("secret").unwrap().json, "sku_secret");
        assert_eq!(m.endpoints[0].list.as_ref().unwrap().name(), "ProductRow");
        assert!(m.endpoints[0].operations.contains(Operation::Delete));
        assert!(!m.endpoints[1].operations.contains(Operation::Update));
        assert_eq!(m.base_shapes().len(), 1);
    }

    #[test]
    fn invalid_shape_is_reported() {
        let config: FullConfig = serde_json::from_str(
            r#"{"shapes":[{"name":"NoId","fields":[{"name":"title","type":"string"}]}]}"#,
        )
        .unwrap();
        assert!(resolve(&config).is_err());
    }

    #[test]
    fn registers_endpoints_on_controller() {
        let mut controller = Controller::new(Arc::new(MemoryStorage::new()), ControllerConfig::default());
        let endpoints = model().register(&mut controller).unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1].base().name(), "Catalog");
        assert_eq!(endpoints[0].view(Operation::List).name(), "ProductRow");
        assert!(controller.resolve("/catalog/3").is_some());
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_shapes_from_path("/nonexistent/shapes.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
