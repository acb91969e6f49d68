use std::collections::HashMap;

use crate::{
    config::RenderConfig,
    error::{BackendError, Result},
    render::{FfmpegRenderer, PremixRenderer, Renderer},
};

type RendererFactory = Box<dyn Fn(&RenderConfig) -> Box<dyn Renderer> + Send + Sync>;

/// Registry for managing available media backends
///
/// Renderers are registered by name and built from the render configuration
/// when a director is created.
pub struct RendererRegistry {
    renderers: HashMap<String, RendererFactory>,
}

impl RendererRegistry {
    /// Create a new registry with all built-in renderers
    pub fn new() -> Self {
        let mut registry = Self {
            renderers: HashMap::new(),
        };

        registry.register("ffmpeg", |config| Box::new(FfmpegRenderer::new(config)));
        registry.register("premix", |config| Box::new(PremixRenderer::new(config)));
        registry
    }

    /// Register a custom renderer, replacing any with the same name
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&RenderConfig) -> Box<dyn Renderer> + Send + Sync + 'static,
    {
        self.renderers.insert(name.to_string(), Box::new(factory));
    }

    /// Build the renderer registered under `name`
    pub fn create(&self, name: &str, config: &RenderConfig) -> Result<Box<dyn Renderer>> {
        self.renderers
            .get(name)
            .map(|factory| factory(config))
            .ok_or_else(|| {
                BackendError::Unavailable {
                    name: name.to_string(),
                    reason: format!("unknown renderer; available: {}", self.available().join(", ")),
                }
                .into()
            })
    }

    /// Registered renderer names, sorted
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self.renderers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has(&self, name: &str) -> bool {
        self.renderers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_renderers_available() {
        let registry = RendererRegistry::new();

        assert!(registry.has("ffmpeg"));
        assert!(registry.has("premix"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.available(), vec!["ffmpeg", "premix"]);
    }

    #[test]
    fn test_create_renderer() {
        let registry = RendererRegistry::new();
        let config = RenderConfig::default();

        let renderer = registry.create("premix", &config).unwrap();
        assert_eq!(renderer.name(), "premix");
        assert!(!renderer.description().is_empty());

        let err = registry.create("gstreamer", &config).err().unwrap();
        assert!(err.to_string().contains("gstreamer"));
    }

    #[test]
    fn test_register_custom_renderer() {
        let mut registry = RendererRegistry::new();
        registry.register("alias", |config| Box::new(FfmpegRenderer::new(config)));

        assert!(registry.has("alias"));
        assert_eq!(registry.len(), 3);
    }
}
