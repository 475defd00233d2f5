//! Line-oriented statement parser.
//!
//! # Responsibility
//! - Split one input line into a statement: blank, comment, property
//!   assignment or bare command.
//! - Tokenize respecting quoted strings and bracketed literals, which pass
//!   through as opaque value payloads.
//!
//! # Invariants
//! - Parsing one line never touches scene state.
//! - A malformed line yields a `ParseFault`; the caller reports it and
//!   continues with the next line.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// `key=value` or `target.key=value`, with the remainder of the line as the
/// raw value payload.
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)(?:\.([A-Za-z_][A-Za-z0-9_]*))?\s*=\s*(.*)$")
        .expect("static assignment pattern compiles")
});

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Blank,
    Comment,
    /// `target.key=value` (`target` absent for the implicit form).
    Assign {
        target: Option<String>,
        key: String,
        value: String,
    },
    /// Bare command keyword with positional arguments.
    Command { name: String, args: Vec<String> },
}

/// Syntax failure for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFault {
    message: String,
}

impl ParseFault {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ParseFault {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ParseFault {}

/// Parses one line of the command/property protocol.
pub fn parse_line(line: &str) -> Result<Statement, ParseFault> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Statement::Blank);
    }
    if trimmed.starts_with('#') || trimmed.starts_with("//") {
        return Ok(Statement::Comment);
    }

    if let Some(captures) = ASSIGNMENT.captures(trimmed) {
        let first = captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let second = captures.get(2).map(|m| m.as_str().to_string());
        let value = captures
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        if value.is_empty() {
            return Err(ParseFault::new(format!(
                "assignment to `{first}` is missing a value"
            )));
        }
        let (target, key) = match second {
            Some(key) => (Some(first), key),
            None => (None, first),
        };
        return Ok(Statement::Assign { target, key, value });
    }

    let tokens = tokenize(trimmed)?;
    let mut iter = tokens.into_iter();
    match iter.next() {
        Some(name) => Ok(Statement::Command {
            name,
            args: iter.collect(),
        }),
        None => Ok(Statement::Blank),
    }
}

/// Splits a line into tokens. Double-quoted strings keep their inner text
/// as one token; `[...]` and `{...}` structures nest and stay intact so
/// literal payloads reach the property store unreinterpreted.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseFault> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                if depth > 0 {
                    current.push(ch);
                }
            }
            '[' | '{' if !in_quotes => {
                depth += 1;
                current.push(ch);
            }
            ']' | '}' if !in_quotes => {
                if depth == 0 {
                    return Err(ParseFault::new(format!("unmatched `{ch}`")));
                }
                depth -= 1;
                current.push(ch);
            }
            ch if ch.is_whitespace() && !in_quotes && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ch => current.push(ch),
        }
    }

    if in_quotes {
        return Err(ParseFault::new("unterminated quoted string"));
    }
    if depth > 0 {
        return Err(ParseFault::new("unterminated bracketed literal"));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}
