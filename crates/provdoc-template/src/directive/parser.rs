//! Parser from tokens to the directive tree.
//!
//! Grammar of one action:
//!
//! ```text
//! action   := [ variable (":=" | "=") ] pipeline
//! pipeline := command ( "|" command )*
//! command  := ident operand*          -- function call
//!           | operand                 -- single value
//! operand  := field | variable | string | int | bool | ident | "(" pipeline ")"
//! ```
//!
//! Function names and variables are resolved here, so a template that
//! parses only fails at execution on data-dependent errors.

use std::collections::HashSet;

use serde_json::Value;

use super::lexer::{segments, tokenize, Segment, SyntaxError, Token, TokenKind};
use crate::functions::FunctionRegistry;

/// Control-flow actions of the full Go-style language that this core rejects.
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "if", "else", "end", "range", "with", "define", "template", "block", "break", "continue",
];

/// Deepest nesting of parenthesised sub-expressions accepted in one action.
const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Print(Pipeline),
    Assign {
        name: String,
        declare: bool,
        pipeline: Pipeline,
        offset: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Call {
        name: String,
        args: Vec<Operand>,
        offset: usize,
    },
    Value(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Literal(Value),
    Field {
        path: Vec<String>,
        offset: usize,
    },
    Variable {
        name: String,
        path: Vec<String>,
        offset: usize,
    },
    /// Bare function name in argument position: a call with no arguments.
    Call {
        name: String,
        offset: usize,
    },
    Nested(Box<Pipeline>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParseError {
    Syntax(SyntaxError),
    UndefinedFunction { name: String, offset: usize },
    UndefinedVariable { name: String, offset: usize },
}

impl From<SyntaxError> for ParseError {
    fn from(err: SyntaxError) -> Self {
        ParseError::Syntax(err)
    }
}

fn syntax(offset: usize, message: impl Into<String>) -> ParseError {
    ParseError::Syntax(SyntaxError {
        offset,
        message: message.into(),
    })
}

/// Parses a complete template source into nodes.
pub(crate) fn parse(source: &str, registry: &FunctionRegistry) -> Result<Vec<Node>, ParseError> {
    // `$` always refers to the data root.
    let mut declared: HashSet<String> = HashSet::from([String::new()]);
    let mut nodes = Vec::new();

    for segment in segments(source)? {
        match segment {
            Segment::Text(text) => nodes.push(Node::Text(text.to_string())),
            Segment::Action { body, offset } => {
                let tokens = tokenize(body, offset)?;
                let mut parser = ActionParser {
                    tokens: &tokens,
                    pos: 0,
                    depth: 0,
                    end_offset: offset + body.len(),
                    registry,
                    declared: &mut declared,
                };
                nodes.push(parser.action(offset)?);
            }
        }
    }

    Ok(nodes)
}

struct ActionParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    end_offset: usize,
    registry: &'a FunctionRegistry,
    declared: &'a mut HashSet<String>,
}

impl<'a> ActionParser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn current_offset(&self) -> usize {
        self.peek().map_or(self.end_offset, |t| t.offset)
    }

    fn action(&mut self, offset: usize) -> Result<Node, ParseError> {
        let Some(first) = self.peek() else {
            return Err(syntax(offset, "missing value for command"));
        };

        if let TokenKind::Ident(word) = &first.kind {
            if UNSUPPORTED_KEYWORDS.contains(&word.as_str()) {
                return Err(syntax(
                    first.offset,
                    format!("unsupported action \"{}\"", word),
                ));
            }
        }

        if let TokenKind::Variable { name, fields } = &first.kind {
            let declare = match self.tokens.get(self.pos + 1).map(|t| &t.kind) {
                Some(TokenKind::Declare) => Some(true),
                Some(TokenKind::Assign) => Some(false),
                _ => None,
            };
            if let Some(declare) = declare {
                if name.is_empty() || !fields.is_empty() {
                    return Err(syntax(first.offset, "cannot assign to this variable"));
                }
                self.pos += 2;
                let pipeline = self.pipeline()?;
                self.expect_end()?;
                if declare {
                    self.declared.insert(name.clone());
                } else if !self.declared.contains(name) {
                    return Err(ParseError::UndefinedVariable {
                        name: name.clone(),
                        offset: first.offset,
                    });
                }
                return Ok(Node::Assign {
                    name: name.clone(),
                    declare,
                    pipeline,
                    offset: first.offset,
                });
            }
        }

        let pipeline = self.pipeline()?;
        self.expect_end()?;
        Ok(Node::Print(pipeline))
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        match self.peek() {
            None => Ok(()),
            Some(Token {
                kind: TokenKind::RParen,
                offset,
            }) => Err(syntax(*offset, "unexpected right paren")),
            Some(token) => Err(syntax(token.offset, "unexpected token after command")),
        }
    }

    fn at_command_end(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.kind),
            None | Some(TokenKind::Pipe | TokenKind::RParen)
        )
    }

    fn pipeline(&mut self) -> Result<Pipeline, ParseError> {
        let mut commands = vec![self.command()?];

        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Pipe)) {
            let pipe_offset = self.current_offset();
            self.pos += 1;
            let command = self.command()?;
            if let Command::Value(_) = command {
                return Err(syntax(pipe_offset, "non-function in pipeline"));
            }
            commands.push(command);
        }

        Ok(Pipeline { commands })
    }

    fn command(&mut self) -> Result<Command, ParseError> {
        if self.at_command_end() {
            return Err(syntax(self.current_offset(), "missing value for command"));
        }

        if let Some(Token {
            kind: TokenKind::Ident(name),
            offset,
        }) = self.peek()
        {
            self.pos += 1;
            self.check_function(name, *offset)?;
            let mut args = Vec::new();
            while !self.at_command_end() {
                args.push(self.operand()?);
            }
            return Ok(Command::Call {
                name: name.clone(),
                args,
                offset: *offset,
            });
        }

        let operand = self.operand()?;
        if !self.at_command_end() {
            return Err(syntax(
                self.current_offset(),
                "can't give argument to non-function",
            ));
        }
        Ok(Command::Value(operand))
    }

    fn operand(&mut self) -> Result<Operand, ParseError> {
        let offset = self.current_offset();
        let Some(token) = self.next() else {
            return Err(syntax(offset, "missing value for command"));
        };

        let operand = match &token.kind {
            TokenKind::Str(s) => Operand::Literal(Value::String(s.clone())),
            TokenKind::Int(n) => Operand::Literal(Value::from(*n)),
            TokenKind::Bool(b) => Operand::Literal(Value::Bool(*b)),
            TokenKind::Field(path) => Operand::Field {
                path: path.clone(),
                offset,
            },
            TokenKind::Variable { name, fields } => {
                if !self.declared.contains(name) {
                    return Err(ParseError::UndefinedVariable {
                        name: name.clone(),
                        offset,
                    });
                }
                Operand::Variable {
                    name: name.clone(),
                    path: fields.clone(),
                    offset,
                }
            }
            TokenKind::Ident(name) => {
                self.check_function(name, offset)?;
                Operand::Call {
                    name: name.clone(),
                    offset,
                }
            }
            TokenKind::LParen => {
                if self.depth >= MAX_DEPTH {
                    return Err(syntax(offset, "max expression depth exceeded"));
                }
                self.depth += 1;
                let inner = self.pipeline()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Operand::Nested(Box::new(inner)),
                    _ => return Err(syntax(offset, "unclosed left paren")),
                }
            }
            TokenKind::RParen => return Err(syntax(offset, "unexpected right paren")),
            TokenKind::Pipe => return Err(syntax(offset, "unexpected \"|\"")),
            TokenKind::Declare => return Err(syntax(offset, "unexpected \":=\"")),
            TokenKind::Assign => return Err(syntax(offset, "unexpected \"=\"")),
        };

        Ok(operand)
    }

    fn check_function(&self, name: &str, offset: usize) -> Result<(), ParseError> {
        if self.registry.contains(name) {
            Ok(())
        } else {
            Err(ParseError::UndefinedFunction {
                name: name.to_string(),
                offset,
            })
        }
    }
}
