// src/layers/registry.rs
use super::{components, config_files, hydration, patterns, router, testing};
use super::{descriptor, LayerDescriptor, LayerId, LayerPlugin};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Maps layer ids to their descriptor and plugin instance.
///
/// The descriptor table is fixed; plugins can be swapped per id (the CLI does
/// this for `[scripts]` entries, tests do it to inject failing layers).
#[derive(Clone)]
pub struct LayerRegistry {
    plugins: BTreeMap<LayerId, Arc<dyn LayerPlugin>>,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LayerRegistry {
    /// Registry wired with the six built-in fix rules.
    #[must_use]
    pub fn builtin() -> Self {
        let mut plugins: BTreeMap<LayerId, Arc<dyn LayerPlugin>> = BTreeMap::new();
        plugins.insert(1, Arc::new(config_files::ConfigLayer));
        plugins.insert(2, Arc::new(patterns::PatternLayer));
        plugins.insert(3, Arc::new(components::ComponentLayer));
        plugins.insert(4, Arc::new(hydration::HydrationLayer));
        plugins.insert(5, Arc::new(router::RouterLayer));
        plugins.insert(6, Arc::new(testing::TestingLayer));
        Self { plugins }
    }

    /// Replaces the plugin for `id`. Ids without a descriptor are ignored and
    /// `false` is returned.
    pub fn set_plugin(&mut self, id: LayerId, plugin: Arc<dyn LayerPlugin>) -> bool {
        if descriptor(id).is_none() {
            return false;
        }
        self.plugins.insert(id, plugin);
        true
    }

    #[must_use]
    pub fn with_plugin(mut self, id: LayerId, plugin: Arc<dyn LayerPlugin>) -> Self {
        self.set_plugin(id, plugin);
        self
    }

    #[must_use]
    pub fn descriptor(&self, id: LayerId) -> Option<&'static LayerDescriptor> {
        descriptor(id)
    }

    #[must_use]
    pub fn plugin(&self, id: LayerId) -> Option<&dyn LayerPlugin> {
        self.plugins.get(&id).map(AsRef::as_ref)
    }
}
