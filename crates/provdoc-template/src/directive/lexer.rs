//! Two-stage lexer for directive templates.
//!
//! [`segments`] splits a template into literal text and `{{ ... }}` action
//! bodies, applying trim markers and dropping comments. [`tokenize`] then
//! breaks a single action body into [`Token`]s.

/// A syntax error at a byte offset in the template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Top-level piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    /// Action body between the delimiters, with the byte offset where it starts.
    Action { body: &'a str, offset: usize },
}

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Splits `source` into text and action segments.
///
/// `{{- ` trims whitespace before the action, ` -}}` trims whitespace after
/// it. Comment actions (`{{/* ... */}}`) produce no segment.
pub(crate) fn segments(source: &str) -> Result<Vec<Segment<'_>>, SyntaxError> {
    let mut out = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;

    while let Some(rel) = source[pos..].find(OPEN) {
        let open = pos + rel;
        let mut text = &source[pos..open];
        if trim_next {
            text = text.trim_start();
        }

        let mut body_start = open + OPEN.len();
        if has_left_trim(&source[body_start..]) {
            text = text.trim_end();
            body_start += 1;
        }
        if !text.is_empty() {
            out.push(Segment::Text(text));
        }

        let close =
            find_close(source, body_start).ok_or_else(|| SyntaxError::new(open, "unclosed action"))?;
        let mut body = &source[body_start..close];
        trim_next = false;
        if let Some(stripped) = strip_right_trim(body) {
            body = stripped;
            trim_next = true;
        }

        let trimmed = body.trim();
        if trimmed.starts_with("/*") {
            if !trimmed.ends_with("*/") || trimmed.len() < 4 {
                return Err(SyntaxError::new(open, "unclosed comment"));
            }
        } else {
            out.push(Segment::Action {
                body,
                offset: body_start,
            });
        }

        pos = close + CLOSE.len();
    }

    let mut tail = &source[pos..];
    if trim_next {
        tail = tail.trim_start();
    }
    if !tail.is_empty() {
        out.push(Segment::Text(tail));
    }

    Ok(out)
}

/// `{{-` only trims when followed by whitespace, so `{{-3}}` stays a number.
fn has_left_trim(rest: &str) -> bool {
    rest.strip_prefix('-')
        .is_some_and(|after| after.starts_with(char::is_whitespace))
}

fn strip_right_trim(body: &str) -> Option<&str> {
    let without = body.strip_suffix('-')?;
    without
        .ends_with(char::is_whitespace)
        .then_some(without)
}

/// Finds the byte offset of the `}}` closing the action that starts at `start`.
///
/// Quoted strings and comments may contain `}}`.
fn find_close(source: &str, start: usize) -> Option<usize> {
    let body = &source[start..];
    let lead = body.len() - body.trim_start().len();

    if body[lead..].starts_with("/*") {
        let comment_start = start + lead + 2;
        let end = source[comment_start..].find("*/")? + comment_start + 2;
        return source[end..].find(CLOSE).map(|i| end + i);
    }

    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '`' => quote = Some(c),
            None if body[i..].starts_with(CLOSE) => return Some(start + i),
            None => {}
        }
    }
    None
}

/// Lexical token inside an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// `.` (empty path) or `.A.B`.
    Field(Vec<String>),
    /// `$name` with an optional field chain; `$` alone has an empty name.
    Variable { name: String, fields: Vec<String> },
    Ident(String),
    Str(String),
    Int(i64),
    Bool(bool),
    Declare,
    Assign,
    Pipe,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset in the full template source.
    pub offset: usize,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn ident_end(body: &str, from: usize) -> usize {
    body[from..]
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map_or(body.len(), |(i, _)| from + i)
}

/// Reads `.A.B...` starting at a `.`; returns the names and the end offset.
fn field_chain(body: &str, mut pos: usize) -> (Vec<String>, usize) {
    let mut fields = Vec::new();
    while body[pos..].starts_with('.') {
        let end = ident_end(body, pos + 1);
        if end == pos + 1 {
            break;
        }
        fields.push(body[pos + 1..end].to_string());
        pos = end;
    }
    (fields, pos)
}

/// Tokenizes one action body. `base` is the body's offset in the template.
pub(crate) fn tokenize(body: &str, base: usize) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(c) = body[pos..].chars().next() {
        let start = pos;
        let kind = match c {
            c if c.is_whitespace() => {
                pos += c.len_utf8();
                continue;
            }
            '|' => {
                pos += 1;
                TokenKind::Pipe
            }
            '(' => {
                pos += 1;
                TokenKind::LParen
            }
            ')' => {
                pos += 1;
                TokenKind::RParen
            }
            ':' if body[pos..].starts_with(":=") => {
                pos += 2;
                TokenKind::Declare
            }
            '=' => {
                pos += 1;
                TokenKind::Assign
            }
            '"' => {
                let (s, end) = quoted(body, pos, base)?;
                pos = end;
                TokenKind::Str(s)
            }
            '`' => {
                let end = body[pos + 1..]
                    .find('`')
                    .ok_or_else(|| SyntaxError::new(base + start, "unterminated raw quoted string"))?
                    + pos
                    + 1;
                let s = body[pos + 1..end].to_string();
                pos = end + 1;
                TokenKind::Str(s)
            }
            '.' => {
                let (fields, end) = field_chain(body, pos);
                pos = if fields.is_empty() { pos + 1 } else { end };
                TokenKind::Field(fields)
            }
            '$' => {
                let name_end = ident_end(body, pos + 1);
                let name = body[pos + 1..name_end].to_string();
                let (fields, end) = field_chain(body, name_end);
                pos = end;
                TokenKind::Variable { name, fields }
            }
            c if c.is_ascii_digit()
                || (c == '-' && body[pos + 1..].starts_with(|d: char| d.is_ascii_digit())) =>
            {
                let mut end = body[pos + 1..]
                    .char_indices()
                    .find(|&(_, d)| !d.is_ascii_digit())
                    .map_or(body.len(), |(i, _)| pos + 1 + i);
                if body[end..].starts_with(is_ident_char) {
                    end = ident_end(body, end);
                }
                let literal = &body[pos..end];
                let n = literal.parse::<i64>().map_err(|_| {
                    SyntaxError::new(base + start, format!("bad number syntax: {}", literal))
                })?;
                pos = end;
                TokenKind::Int(n)
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = ident_end(body, pos);
                let word = &body[pos..end];
                pos = end;
                match word {
                    "true" => TokenKind::Bool(true),
                    "false" => TokenKind::Bool(false),
                    _ => TokenKind::Ident(word.to_string()),
                }
            }
            other => {
                return Err(SyntaxError::new(
                    base + start,
                    format!("unexpected {:?} in command", other),
                ))
            }
        };
        tokens.push(Token {
            kind,
            offset: base + start,
        });
    }

    Ok(tokens)
}

/// Reads a double-quoted string starting at `start`; returns it unescaped
/// together with the offset just past the closing quote.
fn quoted(body: &str, start: usize, base: usize) -> Result<(String, usize), SyntaxError> {
    let mut out = String::new();
    let mut chars = body[start + 1..].char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, start + 1 + i + 1)),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((j, other)) => {
                    return Err(SyntaxError::new(
                        base + start + 1 + j,
                        format!("unknown escape sequence: \\{}", other),
                    ))
                }
                None => break,
            },
            '\n' => break,
            c => out.push(c),
        }
    }

    Err(SyntaxError::new(base + start, "unterminated quoted string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(body: &str) -> Vec<TokenKind> {
        tokenize(body, 0)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    mod segmenting {
        use super::*;

        #[test]
        fn plain_text() {
            assert_eq!(segments("hello").unwrap(), vec![Segment::Text("hello")]);
        }

        #[test]
        fn empty_source() {
            assert!(segments("").unwrap().is_empty());
        }

        #[test]
        fn text_and_action() {
            assert_eq!(
                segments("a {{ .X }} b").unwrap(),
                vec![
                    Segment::Text("a "),
                    Segment::Action {
                        body: " .X ",
                        offset: 4
                    },
                    Segment::Text(" b"),
                ]
            );
        }

        #[test]
        fn close_inside_string_ignored() {
            assert_eq!(
                segments(r#"{{ split .X "}}" }}"#).unwrap(),
                vec![Segment::Action {
                    body: r#" split .X "}}" "#,
                    offset: 2
                }]
            );
        }

        #[test]
        fn string_adjacent_to_close() {
            let segs = segments(r#"{{ $arr := split .Text " "}}x"#).unwrap();
            assert_eq!(segs.len(), 2);
            assert_eq!(segs[1], Segment::Text("x"));
        }

        #[test]
        fn trim_markers() {
            assert_eq!(
                segments("a  \n{{- .X -}}\n  b").unwrap(),
                vec![
                    Segment::Text("a"),
                    Segment::Action {
                        body: " .X ",
                        offset: 7
                    },
                    Segment::Text("b"),
                ]
            );
        }

        #[test]
        fn negative_number_is_not_trim() {
            assert_eq!(
                segments("x {{-3}}").unwrap(),
                vec![
                    Segment::Text("x "),
                    Segment::Action {
                        body: "-3",
                        offset: 4
                    }
                ]
            );
        }

        #[test]
        fn comments_dropped() {
            assert_eq!(
                segments("a{{/* }} \"note */}}b").unwrap(),
                vec![Segment::Text("a"), Segment::Text("b")]
            );
        }

        #[test]
        fn unclosed_action() {
            let err = segments("ok {{ .X").unwrap_err();
            assert_eq!(err.offset, 3);
            assert_eq!(err.message, "unclosed action");
        }

        #[test]
        fn unclosed_string_leaves_action_open() {
            assert!(segments(r#"{{ "abc }}"#).is_err());
        }
    }

    mod tokens {
        use super::*;

        #[test]
        fn function_call_with_field_and_string() {
            assert_eq!(
                kinds(r#"prefixlines "  " .MultiLineTest"#),
                vec![
                    TokenKind::Ident("prefixlines".into()),
                    TokenKind::Str("  ".into()),
                    TokenKind::Field(vec!["MultiLineTest".into()]),
                ]
            );
        }

        #[test]
        fn declaration() {
            assert_eq!(
                kinds("$arr := split .Text"),
                vec![
                    TokenKind::Variable {
                        name: "arr".into(),
                        fields: vec![]
                    },
                    TokenKind::Declare,
                    TokenKind::Ident("split".into()),
                    TokenKind::Field(vec!["Text".into()]),
                ]
            );
        }

        #[test]
        fn dot_and_chains() {
            assert_eq!(
                kinds(". .A.B $.C $v.D"),
                vec![
                    TokenKind::Field(vec![]),
                    TokenKind::Field(vec!["A".into(), "B".into()]),
                    TokenKind::Variable {
                        name: String::new(),
                        fields: vec!["C".into()]
                    },
                    TokenKind::Variable {
                        name: "v".into(),
                        fields: vec!["D".into()]
                    },
                ]
            );
        }

        #[test]
        fn literals() {
            assert_eq!(
                kinds(r#"3 -12 true false `raw\n` "a\tb\"""#),
                vec![
                    TokenKind::Int(3),
                    TokenKind::Int(-12),
                    TokenKind::Bool(true),
                    TokenKind::Bool(false),
                    TokenKind::Str("raw\\n".into()),
                    TokenKind::Str("a\tb\"".into()),
                ]
            );
        }

        #[test]
        fn number_glued_to_identifier() {
            let err = tokenize("upper 3abc", 10).unwrap_err();
            assert_eq!(err.offset, 16);
            assert_eq!(err.message, "bad number syntax: 3abc");
            assert!(tokenize("-1x", 0).is_err());
        }

        #[test]
        fn pipes_and_parens() {
            assert_eq!(
                kinds("(upper .X) | lower"),
                vec![
                    TokenKind::LParen,
                    TokenKind::Ident("upper".into()),
                    TokenKind::Field(vec!["X".into()]),
                    TokenKind::RParen,
                    TokenKind::Pipe,
                    TokenKind::Ident("lower".into()),
                ]
            );
        }

        #[test]
        fn offsets_are_absolute() {
            let tokens = tokenize(" upper .X", 10).unwrap();
            assert_eq!(tokens[0].offset, 11);
            assert_eq!(tokens[1].offset, 17);
        }

        #[test]
        fn unknown_escape_rejected() {
            assert!(tokenize(r#""\q""#, 0).is_err());
        }

        #[test]
        fn stray_character_rejected() {
            let err = tokenize("upper # .X", 5).unwrap_err();
            assert_eq!(err.offset, 11);
        }

        #[test]
        fn number_overflow_rejected() {
            assert!(tokenize("99999999999999999999", 0).is_err());
        }
    }
}
