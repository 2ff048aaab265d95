//! # provdoc - Provider Documentation Rendering
//!
//! `provdoc` ties together the two halves of description handling for
//! provider documentation:
//!
//! - [`provdoc_meta`]: split a `:meta:k:v:description` blob into metadata
//!   and description
//! - [`provdoc_template`]: render templates with the text helper library
//!
//! The common entry points are re-exported here, and [`DocRenderer`] applies
//! a [`DocsConfig`] to both.
//!
//! ```rust
//! use provdoc::{DocRenderer, DocsConfig};
//!
//! let renderer = DocRenderer::new(DocsConfig::default()).unwrap();
//! let out = renderer
//!     .render_described(
//!         "resource",
//!         "{{ .subcategory }}: {{ plainmarkdown .Description }}",
//!         ":meta:subcategory:IPAM:Manages **prefixes**.",
//!     )
//!     .unwrap();
//! assert_eq!(out, "IPAM: Manages prefixes.");
//! ```

mod config;
mod error;

use serde::Serialize;
use serde_json::{Map, Value};

pub use config::{DocsConfig, EngineKind};
pub use error::{Error, Result};

pub use provdoc_meta::{
    extract_description, extract_metadata, split_document, Document, MetaSyntax, Metadata,
};
pub use provdoc_template::{
    render_template, render_template_with, FunctionRegistry, RenderError, Template,
    TemplateEngine,
};

pub use provdoc_meta;
pub use provdoc_template;

use provdoc_template::{DirectiveEngine, JinjaEngine};

/// Context key holding the description text.
pub const DESCRIPTION_KEY: &str = "Description";

/// Context key holding the metadata map.
pub const METADATA_KEY: &str = "Metadata";

/// Renders documentation templates according to a [`DocsConfig`].
pub struct DocRenderer {
    config: DocsConfig,
    engine: Box<dyn TemplateEngine>,
}

impl DocRenderer {
    /// Creates a renderer with the built-in helpers.
    pub fn new(config: DocsConfig) -> Result<Self> {
        Self::with_registry(config, FunctionRegistry::with_builtins())
    }

    /// Creates a renderer whose templates see the functions of `registry`.
    pub fn with_registry(config: DocsConfig, registry: FunctionRegistry) -> Result<Self> {
        config.validate()?;
        let engine: Box<dyn TemplateEngine> = match config.engine {
            EngineKind::Directive => Box::new(DirectiveEngine::with_registry(registry)),
            EngineKind::Jinja => Box::new(JinjaEngine::with_registry(registry)),
        };
        tracing::debug!(engine = ?config.engine, "created doc renderer");
        Ok(Self { config, engine })
    }

    /// Parses a YAML configuration and creates a renderer from it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::new(DocsConfig::from_yaml(yaml)?)
    }

    pub fn config(&self) -> &DocsConfig {
        &self.config
    }

    pub fn engine(&self) -> &dyn TemplateEngine {
        self.engine.as_ref()
    }

    /// Splits a description blob using the configured delimiter and marker.
    pub fn split(&self, full: &str) -> Document {
        split_document(full, &self.config.syntax())
    }

    /// Renders `text` against arbitrary data.
    pub fn render<T: Serialize + ?Sized>(&self, name: &str, text: &str, data: &T) -> Result<String> {
        Ok(provdoc_template::render_with_engine(
            self.engine.as_ref(),
            name,
            text,
            data,
        )?)
    }

    /// Renders `text` against a description blob.
    ///
    /// Every metadata key is a top-level field. `Description` holds the text
    /// after the metadata section and `Metadata` the whole map; these two
    /// names take precedence over metadata keys that collide with them.
    pub fn render_described(&self, name: &str, text: &str, full: &str) -> Result<String> {
        let document = self.split(full);
        self.render(name, text, &document_context(document))
    }
}

impl std::fmt::Debug for DocRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocRenderer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builds the template context for a split document.
pub fn document_context(document: Document) -> Value {
    let mut context: Map<String, Value> = document
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    let metadata = document
        .metadata
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();
    context.insert(METADATA_KEY.to_string(), Value::Object(metadata));
    context.insert(
        DESCRIPTION_KEY.to_string(),
        Value::String(document.description),
    );
    Value::Object(context)
}
