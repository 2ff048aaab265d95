//! # provdoc-template - Text Helpers for Documentation Templates
//!
//! `provdoc-template` renders small string templates used to generate
//! provider documentation. Templates call a fixed library of pure text
//! helpers (case conversion, trimming, splitting, line prefixing, markdown
//! stripping) on fields of a data value.
//!
//! ## Quick Start
//!
//! ```rust
//! use provdoc_template::render_template;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct Resource {
//!     name: String,
//!     description: String,
//! }
//!
//! let template = "# {{ title .Name }}\n\n{{ prefixlines \"> \" .Description }}";
//! let output = render_template(
//!     "resource",
//!     template,
//!     &Resource {
//!         name: "ip address".into(),
//!         description: "An IP address.\nAssigned to an interface.".into(),
//!     },
//! )
//! .unwrap();
//!
//! assert_eq!(output, "# Ip Address\n\n> An IP address.\n> Assigned to an interface.");
//! ```
//!
//! ## Core Concepts
//!
//! - [`render_template`]: parse and render in one call with the built-ins
//! - [`FunctionRegistry`]: name → typed function map, extensible by callers
//! - [`Template`]: a parsed directive template, reusable across renders
//! - [`TemplateEngine`]: directive syntax ([`DirectiveEngine`]) or MiniJinja
//!   ([`JinjaEngine`]) over the same helpers
//! - [`RenderError`]: every failure, labelled with the template name
//!
//! Data is any `Serialize` value. It is converted to a JSON-shaped record
//! before rendering; `.Field` looks up map keys, and a missing key is a
//! [`RenderError::UndefinedField`] rather than an empty string.
//!
//! Rendering never mutates the data or the registry, and a failed render
//! returns no partial output.

mod directive;
mod engine;
mod error;
mod functions;
mod markdown;

use serde::Serialize;

pub use directive::Template;
pub use engine::{register_functions, DirectiveEngine, JinjaEngine, TemplateEngine};
pub use error::{Position, RenderError, Result};
pub use functions::{
    index, prefix_lines, split, title, Arity, FunctionError, FunctionRegistry, TemplateFunction,
};
pub use markdown::plain_markdown;

/// Renders `text` with the built-in helpers.
///
/// `name` labels errors; it does not need to be unique.
pub fn render_template<T: Serialize + ?Sized>(name: &str, text: &str, data: &T) -> Result<String> {
    render_template_with(name, text, data, FunctionRegistry::builtin())
}

/// Renders `text` with a caller-supplied function registry.
pub fn render_template_with<T: Serialize + ?Sized>(
    name: &str,
    text: &str,
    data: &T,
    registry: &FunctionRegistry,
) -> Result<String> {
    let context = to_context(name, data)?;
    let output = Template::parse(name, text, registry)?.execute(&context)?;
    tracing::debug!(template = name, bytes = output.len(), "rendered template");
    Ok(output)
}

/// Renders `text` with any [`TemplateEngine`].
pub fn render_with_engine<T: Serialize + ?Sized>(
    engine: &dyn TemplateEngine,
    name: &str,
    text: &str,
    data: &T,
) -> Result<String> {
    let context = to_context(name, data)?;
    let output = engine.render_template(name, text, &context)?;
    tracing::debug!(template = name, bytes = output.len(), "rendered template");
    Ok(output)
}

/// Converts render data into the JSON-shaped record templates read from.
pub fn to_context<T: Serialize + ?Sized>(name: &str, data: &T) -> Result<serde_json::Value> {
    serde_json::to_value(data).map_err(|source| RenderError::Serialization {
        template: name.to_string(),
        source,
    })
}
