//! Template engine abstraction.
//!
//! This module defines the [`TemplateEngine`] trait so callers can pick the
//! template syntax without changing how they render. Two implementations
//! share the same [`FunctionRegistry`]:
//!
//! - [`DirectiveEngine`]: the `{{ fn .Field }}` directive language (default).
//! - [`JinjaEngine`]: MiniJinja, with every helper available as a global
//!   function and the one-argument helpers also usable as filters.
//!
//! The same helper gives the same result in both engines:
//!
//! ```rust
//! use provdoc_template::{DirectiveEngine, JinjaEngine, TemplateEngine};
//! use serde_json::json;
//!
//! let data = json!({"Text": "my Odly cAsed striNg"});
//!
//! let directive = DirectiveEngine::new();
//! let jinja = JinjaEngine::new();
//!
//! assert_eq!(
//!     directive.render_template("d", "{{ title .Text }}", &data).unwrap(),
//!     jinja.render_template("j", "{{ Text | title }}", &data).unwrap(),
//! );
//! ```

use minijinja::value::Rest;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, UndefinedBehavior};

use crate::directive::Template;
use crate::error::{RenderError, Result};
use crate::functions::{Arity, FunctionRegistry, TemplateFunction};

/// A template engine that renders a named template source against data.
pub trait TemplateEngine: Send + Sync {
    /// Parses and renders `source` in one step. `name` is only used to label
    /// errors.
    fn render_template(&self, name: &str, source: &str, data: &serde_json::Value)
        -> Result<String>;

    /// Functions available to templates rendered by this engine.
    fn registry(&self) -> &FunctionRegistry;
}

/// Engine for the `{{ ... }}` directive language.
#[derive(Debug, Clone)]
pub struct DirectiveEngine {
    registry: FunctionRegistry,
}

impl DirectiveEngine {
    /// Creates an engine with the built-in helpers.
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::with_builtins())
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        Self { registry }
    }
}

impl Default for DirectiveEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for DirectiveEngine {
    fn render_template(
        &self,
        name: &str,
        source: &str,
        data: &serde_json::Value,
    ) -> Result<String> {
        Template::parse(name, source, &self.registry)?.execute(data)
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

/// MiniJinja-based engine with the helper library registered.
///
/// Undefined variables are errors, trailing newlines are kept and nothing is
/// auto-escaped, so output matches the directive engine for equivalent
/// templates.
pub struct JinjaEngine {
    env: Environment<'static>,
    registry: FunctionRegistry,
}

impl JinjaEngine {
    /// Creates an engine with the built-in helpers.
    pub fn new() -> Self {
        Self::with_registry(FunctionRegistry::with_builtins())
    }

    pub fn with_registry(registry: FunctionRegistry) -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        register_functions(&mut env, &registry);
        Self { env, registry }
    }

    /// Returns a reference to the underlying MiniJinja environment.
    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Returns a mutable reference to the underlying MiniJinja environment.
    ///
    /// Functions added here directly are not visible through
    /// [`TemplateEngine::registry`].
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }
}

impl Default for JinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for JinjaEngine {
    fn render_template(
        &self,
        name: &str,
        source: &str,
        data: &serde_json::Value,
    ) -> Result<String> {
        let ctx = minijinja::Value::from_serialize(data);
        self.env
            .render_named_str(name, source, ctx)
            .map_err(|source| RenderError::Engine {
                template: name.to_string(),
                source,
            })
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

/// Registers every function of `registry` on a MiniJinja environment.
///
/// All functions become globals called with the same argument order as in
/// directive templates. Functions taking exactly one argument are also added
/// as filters (`{{ text | upper }}`), replacing MiniJinja's built-in filters
/// of the same name.
pub fn register_functions(env: &mut Environment<'static>, registry: &FunctionRegistry) {
    for (name, function) in registry.iter() {
        let global = function.clone();
        let global_name = name.to_string();
        env.add_function(
            name.to_string(),
            move |args: Rest<minijinja::Value>| -> std::result::Result<minijinja::Value, Error> {
                invoke(&global_name, &global, &args[..])
            },
        );

        if function.arity() == Arity::Exact(1) {
            let filter = function.clone();
            let filter_name = name.to_string();
            env.add_filter(
                name.to_string(),
                move |value: minijinja::Value| -> std::result::Result<minijinja::Value, Error> {
                    invoke(&filter_name, &filter, std::slice::from_ref(&value))
                },
            );
        }
    }
}

fn invoke(
    name: &str,
    function: &TemplateFunction,
    args: &[minijinja::Value],
) -> std::result::Result<minijinja::Value, Error> {
    if !function.arity().accepts(args.len()) {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!(
                "wrong number of args for {}: want {} got {}",
                name,
                function.arity(),
                args.len()
            ),
        ));
    }

    let args = args
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| Error::new(ErrorKind::BadSerialization, err.to_string()))?;

    let out = function.call(&args).map_err(|err| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("error calling {}: {}", name, err),
        )
    })?;

    Ok(minijinja::Value::from_serialize(&out))
}
