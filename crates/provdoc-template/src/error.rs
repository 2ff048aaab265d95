//! Error types for template rendering.
//!
//! This module provides [`RenderError`], the error type for every rendering
//! operation. Directive-engine errors carry the template name and the
//! `line:column` of the offending directive so callers can point at the
//! source; MiniJinja errors are wrapped as-is.

use std::fmt;

use thiserror::Error;

/// A 1-based line and column inside a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Computes the position of a byte offset within `source`.
    ///
    /// Offsets past the end clamp to the end of the source.
    pub fn at(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Error type for template rendering operations.
///
/// No variant is ever accompanied by partial output: a render either
/// produces the complete string or one of these.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed directive syntax.
    #[error("template: {template}:{position}: {message}")]
    Syntax {
        template: String,
        position: Position,
        message: String,
    },

    /// A directive calls a function that is not in the registry.
    #[error("template: {template}:{position}: function \"{name}\" not defined")]
    UndefinedFunction {
        template: String,
        position: Position,
        name: String,
    },

    /// A field access named a field the value does not have.
    #[error("template: {template}:{position}: can't evaluate field {field} in {found}")]
    UndefinedField {
        template: String,
        position: Position,
        field: String,
        found: &'static str,
    },

    /// A directive referenced a variable that was never declared.
    #[error("template: {template}:{position}: undefined variable \"${name}\"")]
    UndefinedVariable {
        template: String,
        position: Position,
        name: String,
    },

    /// `index` was given a position outside the sequence.
    #[error(
        "template: {template}:{position}: error calling index: index out of range: {index} (length {len})"
    )]
    IndexOutOfRange {
        template: String,
        position: Position,
        index: i64,
        len: usize,
    },

    /// A function was called with the wrong number of arguments.
    #[error(
        "template: {template}:{position}: wrong number of args for {function}: want {expected} got {actual}"
    )]
    WrongArgCount {
        template: String,
        position: Position,
        function: String,
        expected: String,
        actual: usize,
    },

    /// A function reported a failure of its own.
    #[error("template: {template}:{position}: error calling {function}: {message}")]
    Function {
        template: String,
        position: Position,
        function: String,
        message: String,
    },

    /// The render data could not be converted into a template context.
    #[error("template: {template}: cannot use render data: {source}")]
    Serialization {
        template: String,
        #[source]
        source: serde_json::Error,
    },

    /// Error raised by the MiniJinja engine.
    #[error("template: {template}: {source}")]
    Engine {
        template: String,
        #[source]
        source: minijinja::Error,
    },
}

impl RenderError {
    /// Name of the template the error belongs to.
    pub fn template(&self) -> &str {
        match self {
            RenderError::Syntax { template, .. }
            | RenderError::UndefinedFunction { template, .. }
            | RenderError::UndefinedField { template, .. }
            | RenderError::UndefinedVariable { template, .. }
            | RenderError::IndexOutOfRange { template, .. }
            | RenderError::WrongArgCount { template, .. }
            | RenderError::Function { template, .. }
            | RenderError::Serialization { template, .. }
            | RenderError::Engine { template, .. } => template,
        }
    }

    /// Source position of the error, when the engine reports one.
    pub fn position(&self) -> Option<Position> {
        match self {
            RenderError::Syntax { position, .. }
            | RenderError::UndefinedFunction { position, .. }
            | RenderError::UndefinedField { position, .. }
            | RenderError::UndefinedVariable { position, .. }
            | RenderError::IndexOutOfRange { position, .. }
            | RenderError::WrongArgCount { position, .. }
            | RenderError::Function { position, .. } => Some(*position),
            RenderError::Serialization { .. } | RenderError::Engine { .. } => None,
        }
    }
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
