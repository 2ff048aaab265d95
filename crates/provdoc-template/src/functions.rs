//! Helper function library and the registry that resolves function names.
//!
//! Every function available to a template lives in a [`FunctionRegistry`]: a
//! static map from name to a typed [`TemplateFunction`]. Names are resolved
//! while the template is parsed, so an unknown name is reported before any
//! output is produced.
//!
//! ## Built-in Functions
//!
//! | Name | Arguments | Result |
//! |------|-----------|--------|
//! | `plainmarkdown` | `s` | `s` with markdown formatting removed |
//! | `split` | `s, sep` | list of substrings of `s` around `sep` |
//! | `index` | `seq, i...` | element `i` of `seq` (map keys also accepted) |
//! | `trimspace` | `s` | `s` without leading/trailing whitespace |
//! | `upper` | `s` | uppercase `s` |
//! | `lower` | `s` | lowercase `s` |
//! | `title` | `s` | first letter of each word capitalised, rest lowercase |
//! | `prefixlines` | `prefix, s` | `prefix` prepended to every line of `s` |

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;
use thiserror::Error;

use crate::markdown::plain_markdown;

/// Failure reported by a helper function.
///
/// The renderer attaches the template name and position before handing the
/// error to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FunctionError {
    #[error("index out of range: {index}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("map has no entry for key \"{0}\"")]
    MissingKey(String),

    #[error("wrong type for argument {position}: expected {expected}, got {found}")]
    ArgType {
        position: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Failed(String),
}

/// How many arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

type FunctionBody = dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync;

/// A named, typed function callable from templates.
#[derive(Clone)]
pub struct TemplateFunction {
    arity: Arity,
    body: Arc<FunctionBody>,
}

impl TemplateFunction {
    pub fn new<F>(arity: Arity, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        Self {
            arity,
            body: Arc::new(body),
        }
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Calls the function. The caller is responsible for checking the arity.
    pub fn call(&self, args: &[Value]) -> Result<Value, FunctionError> {
        (self.body)(args)
    }
}

impl fmt::Debug for TemplateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateFunction")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

static BUILTINS: Lazy<FunctionRegistry> = Lazy::new(|| {
    let mut registry = FunctionRegistry::new();
    registry
        .register_str("plainmarkdown", plain_markdown)
        .register_str("trimspace", |s| s.trim().to_string())
        .register_str("upper", str::to_uppercase)
        .register_str("lower", str::to_lowercase)
        .register_str("title", title)
        .register("split", Arity::Exact(2), |args| {
            let s = string_arg(args, 0)?;
            let sep = string_arg(args, 1)?;
            Ok(Value::Array(
                split(s, sep).into_iter().map(Value::String).collect(),
            ))
        })
        .register("prefixlines", Arity::Exact(2), |args| {
            let prefix = string_arg(args, 0)?;
            let s = string_arg(args, 1)?;
            Ok(Value::String(prefix_lines(prefix, s)))
        })
        .register("index", Arity::AtLeast(1), |args| {
            let (seq, indices) = args
                .split_first()
                .ok_or_else(|| FunctionError::Failed("missing argument 0".to_string()))?;
            index(seq, indices).cloned()
        });
    registry
});

/// Map from function name to [`TemplateFunction`].
///
/// Registries are cheap to clone: function bodies are shared.
///
/// ```rust
/// use provdoc_template::{render_template_with, FunctionRegistry};
/// use serde_json::json;
///
/// let mut registry = FunctionRegistry::with_builtins();
/// registry.register_str("shout", |s| format!("{}!", s.to_uppercase()));
///
/// let out = render_template_with("greet", "{{ shout .Name }}", &json!({"Name": "hi"}), &registry)
///     .unwrap();
/// assert_eq!(out, "HI!");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, TemplateFunction>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared registry of built-in functions.
    pub fn builtin() -> &'static FunctionRegistry {
        &BUILTINS
    }

    /// Returns an owned copy of the built-ins, ready to be extended.
    pub fn with_builtins() -> Self {
        BUILTINS.clone()
    }

    /// Registers a function, replacing any existing one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, arity: Arity, body: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::trace!(function = %name, %arity, "registering template function");
        self.functions
            .insert(name, TemplateFunction::new(arity, body));
        self
    }

    /// Registers a one-argument string transformation.
    pub fn register_str<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.register(name, Arity::Exact(1), move |args| {
            Ok(Value::String(f(string_arg(args, 0)?)))
        })
    }

    pub fn get(&self, name: &str) -> Option<&TemplateFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Function names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &TemplateFunction)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Short type name used in error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

fn string_arg(args: &[Value], position: usize) -> Result<&str, FunctionError> {
    match args.get(position) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(FunctionError::ArgType {
            position,
            expected: "string",
            found: type_name(other),
        }),
        None => Err(FunctionError::Failed(format!(
            "missing argument {}",
            position
        ))),
    }
}

/// Capitalises the first letter of every word and lowercases the rest.
///
/// A word is a run of alphanumeric characters; an apostrophe inside a word
/// does not start a new one.
pub fn title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;

    for c in s.chars() {
        if c.is_alphanumeric() || (in_word && c == '\'') {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    out
}

/// Splits `s` around every literal occurrence of `sep`.
///
/// An empty separator splits into single characters.
pub fn split(s: &str, sep: &str) -> Vec<String> {
    if sep.is_empty() {
        return s.chars().map(String::from).collect();
    }
    s.split(sep).map(String::from).collect()
}

/// Prepends `prefix` to every line of `s`, blank lines included.
pub fn prefix_lines(prefix: &str, s: &str) -> String {
    s.split('\n')
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Walks `indices` into `value`: integers index lists, strings index maps.
pub fn index<'a>(value: &'a Value, indices: &[Value]) -> Result<&'a Value, FunctionError> {
    let mut current = value;

    for (i, key) in indices.iter().enumerate() {
        current = match (current, key) {
            (Value::Array(items), Value::Number(n)) => {
                let index = n.as_i64().ok_or(FunctionError::ArgType {
                    position: i + 1,
                    expected: "integer",
                    found: "number",
                })?;
                usize::try_from(index)
                    .ok()
                    .and_then(|idx| items.get(idx))
                    .ok_or(FunctionError::IndexOutOfRange {
                        index,
                        len: items.len(),
                    })?
            }
            (Value::Object(map), Value::String(k)) => map
                .get(k)
                .ok_or_else(|| FunctionError::MissingKey(k.clone()))?,
            (Value::Array(_), other) => {
                return Err(FunctionError::ArgType {
                    position: i + 1,
                    expected: "integer",
                    found: type_name(other),
                })
            }
            (Value::Object(_), other) => {
                return Err(FunctionError::ArgType {
                    position: i + 1,
                    expected: "string",
                    found: type_name(other),
                })
            }
            (other, _) => {
                return Err(FunctionError::Failed(format!(
                    "can't index item of type {}",
                    type_name(other)
                )))
            }
        };
    }

    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
        FunctionRegistry::builtin()
            .get(name)
            .unwrap_or_else(|| panic!("missing builtin {}", name))
            .call(args)
    }

    mod builtins {
        use super::*;

        #[test]
        fn all_names_registered() {
            let names: Vec<_> = FunctionRegistry::builtin().names().collect();
            assert_eq!(
                names,
                vec![
                    "index",
                    "lower",
                    "plainmarkdown",
                    "prefixlines",
                    "split",
                    "title",
                    "trimspace",
                    "upper"
                ]
            );
        }

        #[test]
        fn case_folding() {
            assert_eq!(call("upper", &[json!("my cAsed")]).unwrap(), json!("MY CASED"));
            assert_eq!(call("lower", &[json!("my cAsed")]).unwrap(), json!("my cased"));
        }

        #[test]
        fn trimspace_strips_both_ends() {
            assert_eq!(call("trimspace", &[json!("\t a b \n")]).unwrap(), json!("a b"));
        }

        #[test]
        fn split_returns_list() {
            assert_eq!(
                call("split", &[json!("a b c"), json!(" ")]).unwrap(),
                json!(["a", "b", "c"])
            );
        }

        #[test]
        fn string_function_rejects_number() {
            let err = call("upper", &[json!(3)]).unwrap_err();
            assert_eq!(
                err,
                FunctionError::ArgType {
                    position: 0,
                    expected: "string",
                    found: "number"
                }
            );
        }
    }

    mod title_case {
        use super::*;

        #[test]
        fn capitalises_each_word() {
            assert_eq!(title("my Odly cAsed striNg"), "My Odly Cased String");
        }

        #[test]
        fn punctuation_separates_words() {
            assert_eq!(title("ip-address/prefix"), "Ip-Address/Prefix");
        }

        #[test]
        fn apostrophe_stays_in_word() {
            assert_eq!(title("don't stop"), "Don't Stop");
        }

        #[test]
        fn empty() {
            assert_eq!(title(""), "");
        }
    }

    mod splitting {
        use super::*;

        #[test]
        fn multi_char_separator_is_literal() {
            assert_eq!(split("a.*b.*c", ".*"), vec!["a", "b", "c"]);
        }

        #[test]
        fn empty_separator_splits_chars() {
            assert_eq!(split("abc", ""), vec!["a", "b", "c"]);
        }

        #[test]
        fn keeps_empty_fields() {
            assert_eq!(split(",a,", ","), vec!["", "a", ""]);
        }
    }

    mod prefixing {
        use super::*;

        #[test]
        fn every_line_prefixed() {
            assert_eq!(
                prefix_lines("  ", "This text used\nmultiple lines"),
                "  This text used\n  multiple lines"
            );
        }

        #[test]
        fn blank_lines_prefixed() {
            assert_eq!(prefix_lines("> ", "a\n\nb"), "> a\n> \n> b");
        }

        #[test]
        fn empty_input_is_one_line() {
            assert_eq!(prefix_lines("# ", ""), "# ");
        }
    }

    mod indexing {
        use super::*;

        #[test]
        fn list_by_position() {
            let list = json!(["a", "b", "c"]);
            assert_eq!(index(&list, &[json!(2)]).unwrap(), &json!("c"));
        }

        #[test]
        fn out_of_range() {
            let list = json!(["a"]);
            assert_eq!(
                index(&list, &[json!(3)]).unwrap_err(),
                FunctionError::IndexOutOfRange { index: 3, len: 1 }
            );
        }

        #[test]
        fn negative_is_out_of_range() {
            let list = json!(["a"]);
            assert!(matches!(
                index(&list, &[json!(-1)]),
                Err(FunctionError::IndexOutOfRange { index: -1, .. })
            ));
        }

        #[test]
        fn nested_map_and_list() {
            let value = json!({"tags": ["x", "y"]});
            assert_eq!(
                index(&value, &[json!("tags"), json!(1)]).unwrap(),
                &json!("y")
            );
        }

        #[test]
        fn missing_map_key() {
            let value = json!({});
            assert_eq!(
                index(&value, &[json!("nope")]).unwrap_err(),
                FunctionError::MissingKey("nope".to_string())
            );
        }

        #[test]
        fn no_indices_returns_value() {
            let value = json!("same");
            assert_eq!(index(&value, &[]).unwrap(), &json!("same"));
        }

        #[test]
        fn scalar_cannot_be_indexed() {
            assert!(matches!(
                index(&json!("abc"), &[json!(0)]),
                Err(FunctionError::Failed(_))
            ));
        }
    }

    mod registry {
        use super::*;

        #[test]
        fn custom_function_shadows_builtin() {
            let mut registry = FunctionRegistry::with_builtins();
            registry.register_str("upper", |s| format!("<{}>", s));
            let out = registry.get("upper").unwrap().call(&[json!("x")]).unwrap();
            assert_eq!(out, json!("<x>"));
            // the shared built-ins are untouched
            assert_eq!(call("upper", &[json!("x")]).unwrap(), json!("X"));
        }

        #[test]
        fn arity_accepts() {
            assert!(Arity::Exact(2).accepts(2));
            assert!(!Arity::Exact(2).accepts(1));
            assert!(Arity::AtLeast(1).accepts(4));
            assert!(!Arity::AtLeast(1).accepts(0));
        }

        #[test]
        fn empty_registry() {
            let registry = FunctionRegistry::new();
            assert!(!registry.contains("upper"));
            assert_eq!(registry.names().count(), 0);
        }
    }
}
