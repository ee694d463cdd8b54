//! Statement grammar for configuration scripts.
//!
//! A script is an ordered sequence of statements:
//!
//! ```text
//! # comment to end of line
//! param1 10
//! name "web"                      # scalars: null, bools, ints, floats, strings
//! flags [1, 2, 3]                 # sequences
//! limits { "cpu": 2, "mem": 512 } # maps with quoted keys
//! load "common.conf", "site.conf" # nested include directive
//! database {                      # nested block for a sub-configuration
//!   host "localhost"
//! }
//! ```
//!
//! `load` is reserved and cannot be used as a parameter name in scripts.
//! A brace group whose first token is a quoted string is a map literal;
//! anything else (including `{}`) is a nested block.
//!
//! Every statement carries its 1-based line number so later evaluation
//! failures can point back at the offending line.

use std::collections::BTreeMap;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit1, one_of},
    combinator::{opt, recognize, value as keyword},
    multi::many0,
    sequence::{pair, tuple},
};

use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    /// `<name> <value>` — invoke a declared setter.
    Set { name: String, value: Value },
    /// `load "<path>"[, "<path>"...]` — nested include directive.
    Load { paths: Vec<String> },
    /// `<name> { ... }` — build a child configuration and assign it.
    Block { name: String, body: Vec<Statement> },
}

/// A malformed script, attributed to a 1-based line.
#[derive(Debug)]
pub struct ParseFailure {
    pub line: usize,
    pub message: String,
}

/// Parses a whole script into its statement list.
pub fn parse_script(input: &str) -> Result<Vec<Statement>, ParseFailure> {
    let (_, statements) = statement_list(input, input, false)?;
    Ok(statements)
}

fn statement_list<'a>(
    full: &str,
    mut rest: &'a str,
    nested: bool,
) -> Result<(&'a str, Vec<Statement>), ParseFailure> {
    let mut out = Vec::new();
    loop {
        rest = skip_trivia(rest);
        if rest.is_empty() {
            if nested {
                return Err(failure(full, rest, "unterminated block"));
            }
            return Ok((rest, out));
        }
        if rest.starts_with('}') {
            if nested {
                return Ok((rest, out));
            }
            return Err(failure(full, rest, "unexpected '}'"));
        }

        let line = line_at(full, rest);
        let (after_name, name) =
            identifier(rest).map_err(|_| failure(full, rest, "expected a parameter name"))?;
        let r = skip_trivia(after_name);

        if name == "load" {
            let (r, paths) = load_paths(full, r)?;
            out.push(Statement {
                line,
                kind: StatementKind::Load { paths },
            });
            rest = r;
        } else if r.starts_with('{') && !is_map_literal(r) {
            let body_start = &r[1..];
            let (r, body) = statement_list(full, body_start, true)?;
            let r = skip_trivia(r);
            let Some(r) = r.strip_prefix('}') else {
                return Err(failure(full, r, "unterminated block"));
            };
            out.push(Statement {
                line,
                kind: StatementKind::Block { name, body },
            });
            rest = r;
        } else {
            let (r, value) =
                value_literal(r).map_err(|_| failure(full, r, "expected a value"))?;
            out.push(Statement {
                line,
                kind: StatementKind::Set { name, value },
            });
            rest = r;
        }
    }
}

/// A brace group is a map literal when its first token is a quoted key.
fn is_map_literal(rest: &str) -> bool {
    skip_trivia(&rest[1..]).starts_with('"')
}

fn load_paths<'a>(full: &str, rest: &'a str) -> Result<(&'a str, Vec<String>), ParseFailure> {
    let (mut rest, first) =
        string_lit(rest).map_err(|_| failure(full, rest, "expected a quoted path after load"))?;
    let mut paths = vec![first];
    loop {
        let r = skip_trivia(rest);
        let Some(r) = r.strip_prefix(',') else {
            return Ok((rest, paths));
        };
        let r = skip_trivia(r);
        let (r, path) =
            string_lit(r).map_err(|_| failure(full, r, "expected a quoted path after ','"))?;
        paths.push(path);
        rest = r;
    }
}

// ── Value literals ──────────────────────────────────────────────────────────

fn value_literal(input: &str) -> IResult<&str, Value> {
    alt((
        string_value,
        number,
        boolean,
        null,
        seq_literal,
        map_literal,
    ))(input)
}

fn string_value(input: &str) -> IResult<&str, Value> {
    let (rest, s) = string_lit(input)?;
    Ok((rest, Value::Str(s)))
}

/// Double-quoted string with `\" \\ \n \t` escapes.
fn string_lit(input: &str) -> IResult<&str, String> {
    let (body, _) = char('"')(input)?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[i + 1..], out)),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                _ => return Err(fail_at(input, nom::error::ErrorKind::Escaped)),
            },
            _ => out.push(c),
        }
    }
    Err(fail_at(input, nom::error::ErrorKind::Char))
}

fn number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(tuple((
        opt(one_of("+-")),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    let parsed = if text.contains('.') {
        Value::Float(text.parse().unwrap_or(f64::NAN))
    } else {
        match text.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Float(text.parse().unwrap_or(f64::NAN)),
        }
    };
    Ok((rest, parsed))
}

fn boolean(input: &str) -> IResult<&str, Value> {
    alt((
        keyword(Value::Bool(true), tag("true")),
        keyword(Value::Bool(false), tag("false")),
    ))(input)
}

fn null(input: &str) -> IResult<&str, Value> {
    keyword(Value::Null, tag("null"))(input)
}

fn seq_literal(input: &str) -> IResult<&str, Value> {
    let (mut rest, _) = char('[')(input)?;
    let mut items = Vec::new();
    loop {
        rest = skip_trivia(rest);
        if let Some(r) = rest.strip_prefix(']') {
            return Ok((r, Value::Seq(items)));
        }
        let (r, item) = value_literal(rest)?;
        items.push(item);
        rest = skip_trivia(r);
        if let Some(r) = rest.strip_prefix(',') {
            rest = r;
        } else if let Some(r) = rest.strip_prefix(']') {
            return Ok((r, Value::Seq(items)));
        } else {
            return Err(fail_at(rest, nom::error::ErrorKind::Char));
        }
    }
}

fn map_literal(input: &str) -> IResult<&str, Value> {
    let (mut rest, _) = char('{')(input)?;
    let mut entries = BTreeMap::new();
    loop {
        rest = skip_trivia(rest);
        if let Some(r) = rest.strip_prefix('}') {
            return Ok((r, Value::Map(entries)));
        }
        let (r, key) = string_lit(rest)?;
        let r = skip_trivia(r);
        let (r, _) = char(':')(r)?;
        let r = skip_trivia(r);
        let (r, item) = value_literal(r)?;
        entries.insert(key, item);
        rest = skip_trivia(r);
        if let Some(r) = rest.strip_prefix(',') {
            rest = r;
        } else if let Some(r) = rest.strip_prefix('}') {
            return Ok((r, Value::Map(entries)));
        } else {
            return Err(fail_at(rest, nom::error::ErrorKind::Char));
        }
    }
}

fn identifier(input: &str) -> IResult<&str, String> {
    let (rest, name) = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)?;
    Ok((rest, name.to_string()))
}

// ── Position bookkeeping ────────────────────────────────────────────────────

/// Skips whitespace and `#` comments.
fn skip_trivia(mut s: &str) -> &str {
    loop {
        let t = s.trim_start();
        if let Some(r) = t.strip_prefix('#') {
            match r.split_once('\n') {
                Some((_, rest)) => s = rest,
                None => return "",
            }
        } else {
            return t;
        }
    }
}

/// 1-based line of the position where `rest` starts within `full`.
fn line_at(full: &str, rest: &str) -> usize {
    let consumed = full.len() - rest.len();
    full[..consumed].bytes().filter(|b| *b == b'\n').count() + 1
}

fn failure(full: &str, at: &str, message: &str) -> ParseFailure {
    ParseFailure {
        line: line_at(full, at),
        message: message.to_string(),
    }
}

fn fail_at(input: &str, kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&str>> {
    nom::Err::Failure(nom::error::Error::new(input, kind))
}
