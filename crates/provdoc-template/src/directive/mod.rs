//! The `{{ ... }}` directive language.
//!
//! ## Syntax
//!
//! | Form | Meaning |
//! |------|---------|
//! | `{{ .Field }}` | field of the data value (`.A.B` walks nested maps, `.` is the value itself) |
//! | `{{ fn arg1 arg2 }}` | call a registered function |
//! | `{{ $x := expr }}` | declare a variable (prints nothing) |
//! | `{{ $x = expr }}` | re-assign a declared variable |
//! | `{{ $x }}`, `{{ $x.Field }}` | variable reference; `$` is the data value |
//! | `{{ expr \| fn arg }}` | pipeline: the left value becomes the last argument |
//! | `{{ fn (fn2 arg) }}` | parenthesised sub-expression |
//! | `"text"`, `` `raw` ``, `42`, `true` | literals |
//! | `{{- ... -}}` | trim whitespace before / after the action |
//! | `{{/* ... */}}` | comment |
//!
//! Control-flow actions (`if`, `range`, `with`, ...) are not part of this
//! language and are rejected as syntax errors.

mod exec;
mod lexer;
mod parser;

use serde_json::Value;

use crate::error::{Position, RenderError, Result};
use crate::functions::FunctionRegistry;

use parser::{Node, ParseError};

/// A parsed directive template bound to the registry it was checked against.
///
/// ```rust
/// use provdoc_template::{FunctionRegistry, Template};
/// use serde_json::json;
///
/// let template = Template::parse("greeting", "Hello, {{ title .name }}!", FunctionRegistry::builtin())
///     .unwrap();
/// assert_eq!(template.execute(&json!({"name": "ada lovelace"})).unwrap(), "Hello, Ada Lovelace!");
/// ```
#[derive(Debug, Clone)]
pub struct Template<'r> {
    name: String,
    source: String,
    nodes: Vec<Node>,
    registry: &'r FunctionRegistry,
}

impl<'r> Template<'r> {
    /// Parses `source`, resolving every function name against `registry`.
    pub fn parse(name: &str, source: &str, registry: &'r FunctionRegistry) -> Result<Self> {
        let nodes = parser::parse(source, registry).map_err(|err| {
            let template = name.to_string();
            match err {
                ParseError::Syntax(err) => RenderError::Syntax {
                    template,
                    position: Position::at(source, err.offset),
                    message: err.message,
                },
                ParseError::UndefinedFunction { name, offset } => RenderError::UndefinedFunction {
                    template,
                    position: Position::at(source, offset),
                    name,
                },
                ParseError::UndefinedVariable { name, offset } => RenderError::UndefinedVariable {
                    template,
                    position: Position::at(source, offset),
                    name,
                },
            }
        })?;

        Ok(Self {
            name: name.to_string(),
            source: source.to_string(),
            nodes,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the template against `data`.
    pub fn execute(&self, data: &Value) -> Result<String> {
        exec::Executor::new(&self.name, &self.source, self.registry, data).run(&self.nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn syntax_error_carries_position() {
        let err = Template::parse("doc", "line one\n  {{ upper .X ", FunctionRegistry::builtin())
            .unwrap_err();
        match err {
            RenderError::Syntax {
                template,
                position,
                message,
            } => {
                assert_eq!(template, "doc");
                assert_eq!(position, Position { line: 2, column: 3 });
                assert_eq!(message, "unclosed action");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn undefined_function_reported_at_parse() {
        let err = Template::parse("doc", "{{ nope .X }}", FunctionRegistry::builtin()).unwrap_err();
        assert!(matches!(err, RenderError::UndefinedFunction { ref name, .. } if name == "nope"));
        assert_eq!(err.to_string(), "template: doc:1:4: function \"nope\" not defined");
    }

    #[test]
    fn parsed_template_is_reusable() {
        let template =
            Template::parse("t", "{{ upper .V }}", FunctionRegistry::builtin()).unwrap();
        assert_eq!(template.name(), "t");
        assert_eq!(template.execute(&json!({"V": "a"})).unwrap(), "A");
        assert_eq!(template.execute(&json!({"V": "b"})).unwrap(), "B");
    }
}
