//! Execution of a parsed directive tree against a data value.

use std::collections::HashMap;

use serde_json::Value;

use super::parser::{Command, Node, Operand, Pipeline};
use crate::error::{Position, RenderError, Result};
use crate::functions::{type_name, FunctionError, FunctionRegistry};

pub(crate) struct Executor<'a> {
    template: &'a str,
    source: &'a str,
    registry: &'a FunctionRegistry,
    data: &'a Value,
    vars: HashMap<String, Value>,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(
        template: &'a str,
        source: &'a str,
        registry: &'a FunctionRegistry,
        data: &'a Value,
    ) -> Self {
        Self {
            template,
            source,
            registry,
            data,
            vars: HashMap::new(),
        }
    }

    /// Runs every node in order; the output is only returned if all succeed.
    pub(crate) fn run(mut self, nodes: &[Node]) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());

        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Print(pipeline) => {
                    let value = self.pipeline(pipeline)?;
                    out.push_str(&format_value(&value));
                }
                Node::Assign {
                    name,
                    declare,
                    pipeline,
                    offset,
                } => {
                    let value = self.pipeline(pipeline)?;
                    if !declare && !self.vars.contains_key(name) {
                        return Err(RenderError::UndefinedVariable {
                            template: self.template.to_string(),
                            position: self.position(*offset),
                            name: name.clone(),
                        });
                    }
                    self.vars.insert(name.clone(), value);
                }
            }
        }

        Ok(out)
    }

    fn position(&self, offset: usize) -> Position {
        Position::at(self.source, offset)
    }

    fn pipeline(&self, pipeline: &Pipeline) -> Result<Value> {
        let mut piped: Option<Value> = None;
        for command in &pipeline.commands {
            piped = Some(self.command(command, piped)?);
        }
        Ok(piped.unwrap_or(Value::Null))
    }

    fn command(&self, command: &Command, piped: Option<Value>) -> Result<Value> {
        match command {
            Command::Call { name, args, offset } => {
                let mut values = args
                    .iter()
                    .map(|arg| self.operand(arg))
                    .collect::<Result<Vec<_>>>()?;
                values.extend(piped);
                self.call(name, *offset, &values)
            }
            Command::Value(operand) => self.operand(operand),
        }
    }

    fn operand(&self, operand: &Operand) -> Result<Value> {
        match operand {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Field { path, offset } => self.walk(self.data, path, *offset),
            Operand::Variable { name, path, offset } => {
                let base = if name.is_empty() {
                    self.data
                } else {
                    self.vars
                        .get(name)
                        .ok_or_else(|| RenderError::UndefinedVariable {
                            template: self.template.to_string(),
                            position: self.position(*offset),
                            name: name.clone(),
                        })?
                };
                self.walk(base, path, *offset)
            }
            Operand::Call { name, offset } => self.call(name, *offset, &[]),
            Operand::Nested(pipeline) => self.pipeline(pipeline),
        }
    }

    fn walk(&self, base: &Value, path: &[String], offset: usize) -> Result<Value> {
        let mut current = base;
        for field in path {
            current = match current {
                Value::Object(map) => map.get(field),
                _ => None,
            }
            .ok_or_else(|| RenderError::UndefinedField {
                template: self.template.to_string(),
                position: self.position(offset),
                field: field.clone(),
                found: type_name(current),
            })?;
        }
        Ok(current.clone())
    }

    fn call(&self, name: &str, offset: usize, args: &[Value]) -> Result<Value> {
        let function = self
            .registry
            .get(name)
            .ok_or_else(|| RenderError::UndefinedFunction {
                template: self.template.to_string(),
                position: self.position(offset),
                name: name.to_string(),
            })?;

        if !function.arity().accepts(args.len()) {
            return Err(RenderError::WrongArgCount {
                template: self.template.to_string(),
                position: self.position(offset),
                function: name.to_string(),
                expected: function.arity().to_string(),
                actual: args.len(),
            });
        }

        function.call(args).map_err(|err| {
            let template = self.template.to_string();
            let position = self.position(offset);
            match err {
                FunctionError::IndexOutOfRange { index, len } => RenderError::IndexOutOfRange {
                    template,
                    position,
                    index,
                    len,
                },
                FunctionError::MissingKey(field) => RenderError::UndefinedField {
                    template,
                    position,
                    field,
                    found: "map",
                },
                other => RenderError::Function {
                    template,
                    position,
                    function: name.to_string(),
                    message: other.to_string(),
                },
            }
        })
    }
}

/// Renders a value the way it appears in template output.
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
