use super::{Record, Shape};
use std::sync::Arc;

/// Produces zero-valued instances of one shape. One implementation per shape replaces
/// the closures that would otherwise be passed across the registration boundary.
pub trait ShapeFactory: Send + Sync {
    fn shape(&self) -> &Arc<Shape>;

    fn new_instance(&self) -> Record {
        Record::zero(Arc::clone(self.shape()))
    }
}

/// Factory over a fixed shape descriptor.
#[derive(Clone, Debug)]
pub struct StaticShape(Arc<Shape>);

impl StaticShape {
    pub fn new(shape: Shape) -> Self {
        StaticShape(Arc::new(shape))
    }

    pub fn shared(self) -> Arc<dyn ShapeFactory> {
        Arc::new(self)
    }
}

impl From<Arc<Shape>> for StaticShape {
    fn from(shape: Arc<Shape>) -> Self {
        StaticShape(shape)
    }
}

impl ShapeFactory for StaticShape {
    fn shape(&self) -> &Arc<Shape> {
        &self.0
    }
}
