//! The top-level bundle an application works through.

use std::fmt;

use crate::annotation::TypeAnnotations;
use crate::config::ForestConfig;
use crate::forest::Forest;
use crate::forest::ListRef;
use crate::registry::ModuleRegistry;

/// One forest with its root list of loaded models, plus the module registry
/// and type annotations that go with it.
pub struct Context {
    forest: Forest,
    loaded_models: ListRef,
    modules: ModuleRegistry,
    type_annotations: TypeAnnotations,
}

impl Context {
    pub fn new() -> Context {
        return Context::with_config(ForestConfig::default());
    }

    pub fn with_config(config: ForestConfig) -> Context {
        let forest = Forest::with_config(config);
        let loaded_models = forest.make_list();
        return Context {
            forest,
            loaded_models,
            modules: ModuleRegistry::new(),
            type_annotations: TypeAnnotations::new(),
        };
    }

    pub fn forest(&self) -> &Forest {
        return &self.forest;
    }

    /// The root list every loaded document hangs from.
    pub fn loaded_models(&self) -> &ListRef {
        return &self.loaded_models;
    }

    pub fn modules(&self) -> &ModuleRegistry {
        return &self.modules;
    }

    pub fn type_annotations(&self) -> &TypeAnnotations {
        return &self.type_annotations;
    }
}

impl Default for Context {
    fn default() -> Context {
        return Context::new();
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Context")
            .field("forest", &self.forest)
            .field("loaded_models", &self.loaded_models.len())
            .field("modules", &self.modules)
            .finish();
    }
}
