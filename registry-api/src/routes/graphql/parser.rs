//! Lexer and recursive-descent parser for GraphQL query documents.
//!
//! Covers operations, variable definitions, fields with aliases and
//! arguments, and every literal kind. Fragments and directives are rejected
//! as parse errors.

use std::{fmt, iter::Peekable, str::Chars};

use serde::Serialize;

/// 1-based line and column of a token in the query source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub pos: Pos,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub name: Option<String>,
    pub variables: Vec<VariableDefinition>,
    pub selection_set: Vec<Field>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub name: String,
    pub var_type: TypeRef,
    pub default_value: Option<Value>,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn is_non_null(&self) -> bool {
        matches!(self, Self::NonNull(_))
    }

    /// The named type with list and non-null wrappers removed.
    pub fn base_name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::List(inner) | Self::NonNull(inner) => inner.base_name(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
    pub selection_set: Vec<Field>,
    pub pos: Pos,
}

impl Field {
    /// The key this field is written under in the response.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
    pub pos: Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(Vec<(String, Value)>),
}

/// Prints the value back as a GraphQL literal.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "${name}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n:?}"),
            Self::String(s) => {
                write!(f, "{}", serde_json::Value::String(s.clone()))
            }
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
            Self::Enum(name) => f.write_str(name),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Punct(char),
    Spread,
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),
    Eof,
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    /// Source text of the token, used in error messages
    text: String,
    pos: Pos,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

fn parse_error(text: &str, pos: Pos) -> ParseError {
    ParseError {
        message: format!(
            "Parse error on {:?} at [{}, {}]",
            text, pos.line, pos.column
        ),
        pos,
    }
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_ignored(&mut self) {
        while let Some(&c) = self.chars.peek() {
            match c {
                ' ' | '\t' | '\n' | '\r' | ',' | '\u{feff}' => {
                    self.bump();
                }
                '#' => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Spanned, ParseError> {
        self.skip_ignored();
        let pos = self.pos();
        let Some(&c) = self.chars.peek() else {
            return Ok(Spanned {
                token: Token::Eof,
                text: String::new(),
                pos,
            });
        };

        match c {
            '{' | '}' | '(' | ')' | ':' | '$' | '!' | '[' | ']' | '=' | '@' | '|' | '&' => {
                self.bump();
                Ok(Spanned {
                    token: Token::Punct(c),
                    text: c.to_string(),
                    pos,
                })
            }
            '.' => {
                let mut text = String::new();
                while text.len() < 3 && self.chars.peek() == Some(&'.') {
                    self.bump();
                    text.push('.');
                }
                if text.len() == 3 {
                    Ok(Spanned {
                        token: Token::Spread,
                        text,
                        pos,
                    })
                } else {
                    Err(parse_error(&text, pos))
                }
            }
            '"' => self.string(pos),
            '-' | '0'..='9' => self.number(pos),
            c if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        name.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                Ok(Spanned {
                    token: Token::Name(name.clone()),
                    text: name,
                    pos,
                })
            }
            other => Err(parse_error(&other.to_string(), pos)),
        }
    }

    fn number(&mut self, pos: Pos) -> Result<Spanned, ParseError> {
        let mut text = String::new();
        let mut is_float = false;
        if self.chars.peek() == Some(&'-') {
            text.push('-');
            self.bump();
        }
        self.digits(&mut text);
        if self.chars.peek() == Some(&'.') {
            is_float = true;
            text.push('.');
            self.bump();
            self.digits(&mut text);
        }
        if matches!(self.chars.peek(), Some('e' | 'E')) {
            is_float = true;
            text.push('e');
            self.bump();
            if let Some(&sign) = self.chars.peek() {
                if sign == '+' || sign == '-' {
                    text.push(sign);
                    self.bump();
                }
            }
            self.digits(&mut text);
        }

        let token = if is_float {
            text.parse().map(Token::Float).ok()
        } else {
            text.parse().map(Token::Int).ok()
        };
        match token {
            Some(token) => Ok(Spanned { token, text, pos }),
            None => Err(parse_error(&text, pos)),
        }
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
    }

    fn string(&mut self, pos: Pos) -> Result<Spanned, ParseError> {
        self.bump();
        let mut raw = String::from('"');

        if self.chars.peek() == Some(&'"') {
            self.bump();
            raw.push('"');
            if self.chars.peek() != Some(&'"') {
                return Ok(Spanned {
                    token: Token::Str(String::new()),
                    text: raw,
                    pos,
                });
            }
            self.bump();
            return self.block_string(pos);
        }

        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(parse_error(&raw, pos));
            };
            raw.push(c);
            match c {
                '"' => break,
                '\n' | '\r' => return Err(parse_error(&raw, pos)),
                '\\' => {
                    let Some(escaped) = self.bump() else {
                        return Err(parse_error(&raw, pos));
                    };
                    raw.push(escaped);
                    let decoded = match escaped {
                        '"' => '"',
                        '\\' => '\\',
                        '/' => '/',
                        'b' => '\u{8}',
                        'f' => '\u{c}',
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        'u' => {
                            let mut hex = String::new();
                            for _ in 0..4 {
                                match self.bump() {
                                    Some(h) => hex.push(h),
                                    None => return Err(parse_error(&raw, pos)),
                                }
                            }
                            raw.push_str(&hex);
                            u32::from_str_radix(&hex, 16)
                                .ok()
                                .and_then(char::from_u32)
                                .ok_or_else(|| parse_error(&raw, pos))?
                        }
                        _ => return Err(parse_error(&raw, pos)),
                    };
                    value.push(decoded);
                }
                c => value.push(c),
            }
        }

        Ok(Spanned {
            token: Token::Str(value),
            text: raw,
            pos,
        })
    }

    /// Reads a `"""` block string. Content is taken verbatim apart from the
    /// `\"""` escape; common indentation is not stripped.
    fn block_string(&mut self, pos: Pos) -> Result<Spanned, ParseError> {
        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(parse_error(&format!("\"\"\"{value}"), pos));
            };
            value.push(c);
            if value.ends_with("\\\"\"\"") {
                value.truncate(value.len() - 4);
                value.push_str("\"\"\"");
            } else if value.ends_with("\"\"\"") {
                value.truncate(value.len() - 3);
                break;
            }
        }

        Ok(Spanned {
            text: format!("\"\"\"{value}\"\"\""),
            token: Token::Str(value),
            pos,
        })
    }
}

/// Deepest nesting of selection sets, list/object values and list types.
const MAX_DEPTH: usize = 32;

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Spanned,
    depth: usize,
}

/// Parses a query document.
pub fn parse(source: &str) -> Result<Document, ParseError> {
    let mut lexer = Lexer::new(source);
    let current = lexer.next_token()?;
    let mut parser = Parser {
        lexer,
        current,
        depth: 0,
    };

    let mut operations = vec![];
    while parser.current.token != Token::Eof {
        operations.push(parser.operation()?);
    }
    if operations.is_empty() {
        return Err(parser.unexpected());
    }

    Ok(Document { operations })
}

impl<'a> Parser<'a> {
    fn advance(&mut self) -> Result<Spanned, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn unexpected(&self) -> ParseError {
        match self.current.token {
            Token::Eof => ParseError {
                message: "Unexpected end of document".to_string(),
                pos: self.current.pos,
            },
            _ => parse_error(&self.current.text, self.current.pos),
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError {
                message: format!(
                    "Query is nested too deeply (maximum depth is {MAX_DEPTH}) at [{}, {}]",
                    self.current.pos.line, self.current.pos.column
                ),
                pos: self.current.pos,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn is_punct(&self, c: char) -> bool {
        self.current.token == Token::Punct(c)
    }

    fn expect_punct(&mut self, c: char) -> Result<Pos, ParseError> {
        if self.is_punct(c) {
            Ok(self.advance()?.pos)
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_name(&mut self) -> Result<(String, Pos), ParseError> {
        match &self.current.token {
            Token::Name(_) => {
                let spanned = self.advance()?;
                Ok((spanned.text, spanned.pos))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn operation(&mut self) -> Result<Operation, ParseError> {
        let pos = self.current.pos;
        if self.is_punct('{') {
            return Ok(Operation {
                kind: OperationKind::Query,
                name: None,
                variables: vec![],
                selection_set: self.selection_set()?,
                pos,
            });
        }

        let kind = match &self.current.token {
            Token::Name(name) if name == "query" => OperationKind::Query,
            Token::Name(name) if name == "mutation" => OperationKind::Mutation,
            Token::Name(name) if name == "subscription" => OperationKind::Subscription,
            _ => return Err(self.unexpected()),
        };
        self.advance()?;

        let name = match self.current.token {
            Token::Name(_) => Some(self.expect_name()?.0),
            _ => None,
        };
        let variables = if self.is_punct('(') {
            self.variable_definitions()?
        } else {
            vec![]
        };

        Ok(Operation {
            kind,
            name,
            variables,
            selection_set: self.selection_set()?,
            pos,
        })
    }

    fn variable_definitions(&mut self) -> Result<Vec<VariableDefinition>, ParseError> {
        self.expect_punct('(')?;
        if self.is_punct(')') {
            return Err(self.unexpected());
        }
        let mut definitions = vec![];
        while !self.is_punct(')') {
            let pos = self.expect_punct('$')?;
            let (name, _) = self.expect_name()?;
            self.expect_punct(':')?;
            let var_type = self.type_ref()?;
            let default_value = if self.is_punct('=') {
                self.advance()?;
                Some(self.value(true)?)
            } else {
                None
            };
            definitions.push(VariableDefinition {
                name,
                var_type,
                default_value,
                pos,
            });
        }
        self.expect_punct(')')?;
        Ok(definitions)
    }

    fn type_ref(&mut self) -> Result<TypeRef, ParseError> {
        let inner = if self.is_punct('[') {
            self.enter()?;
            self.advance()?;
            let item = self.type_ref()?;
            self.expect_punct(']')?;
            self.leave();
            TypeRef::List(Box::new(item))
        } else {
            TypeRef::Named(self.expect_name()?.0)
        };

        if self.is_punct('!') {
            self.advance()?;
            Ok(TypeRef::NonNull(Box::new(inner)))
        } else {
            Ok(inner)
        }
    }

    fn selection_set(&mut self) -> Result<Vec<Field>, ParseError> {
        self.enter()?;
        self.expect_punct('{')?;
        let mut fields = vec![];
        loop {
            match self.current.token {
                Token::Punct('}') if !fields.is_empty() => break,
                Token::Name(_) => fields.push(self.field()?),
                _ => return Err(self.unexpected()),
            }
        }
        self.expect_punct('}')?;
        self.leave();
        Ok(fields)
    }

    fn field(&mut self) -> Result<Field, ParseError> {
        let (first, pos) = self.expect_name()?;
        let (alias, name) = if self.is_punct(':') {
            self.advance()?;
            (Some(first), self.expect_name()?.0)
        } else {
            (None, first)
        };

        let arguments = if self.is_punct('(') {
            self.arguments()?
        } else {
            vec![]
        };
        let selection_set = if self.is_punct('{') {
            self.selection_set()?
        } else {
            vec![]
        };

        Ok(Field {
            alias,
            name,
            arguments,
            selection_set,
            pos,
        })
    }

    /// Empty argument lists such as `search()` are accepted and mean no arguments.
    fn arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        self.expect_punct('(')?;
        let mut arguments = vec![];
        while !self.is_punct(')') {
            let (name, pos) = self.expect_name()?;
            self.expect_punct(':')?;
            let value = self.value(false)?;
            arguments.push(Argument { name, value, pos });
        }
        self.expect_punct(')')?;
        Ok(arguments)
    }

    fn value(&mut self, constant: bool) -> Result<Value, ParseError> {
        match &self.current.token {
            Token::Punct('$') if !constant => {
                self.advance()?;
                Ok(Value::Variable(self.expect_name()?.0))
            }
            Token::Punct('[') => {
                self.enter()?;
                self.advance()?;
                let mut items = vec![];
                while !self.is_punct(']') {
                    items.push(self.value(constant)?);
                }
                self.advance()?;
                self.leave();
                Ok(Value::List(items))
            }
            Token::Punct('{') => {
                self.enter()?;
                self.advance()?;
                let mut fields = vec![];
                while !self.is_punct('}') {
                    let (name, _) = self.expect_name()?;
                    self.expect_punct(':')?;
                    fields.push((name, self.value(constant)?));
                }
                self.advance()?;
                self.leave();
                Ok(Value::Object(fields))
            }
            token => {
                let literal = match token {
                    Token::Int(n) => Value::Int(*n),
                    Token::Float(n) => Value::Float(*n),
                    Token::Str(s) => Value::String(s.clone()),
                    Token::Name(name) => match name.as_str() {
                        "true" => Value::Boolean(true),
                        "false" => Value::Boolean(false),
                        "null" => Value::Null,
                        _ => Value::Enum(name.clone()),
                    },
                    _ => return Err(self.unexpected()),
                };
                self.advance()?;
                Ok(literal)
            }
        }
    }
}
