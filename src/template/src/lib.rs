//! # Work Order Template Renderer
//!
//! `workorder-template` substitutes `{name}` placeholders in recipe-authored
//! strings against a [`Context`] (spec §4.B). It is the *only* path by which
//! external data reaches a rendered SQL string, so every mode here is
//! designed around one question: what does it take to make a value safe to
//! splice into SQL text?
//!
//! Three modes:
//!
//! * [`Mode::Raw`] — verbatim string form, for log/message payloads only.
//!   Never use this to build SQL.
//! * [`Mode::SqlLiteral`] — each substituted value becomes a SQL literal
//!   (quoted string with doubled `'`, decimal number, `TRUE`/`FALSE`,
//!   `NULL`). Used for `WHERE`/`SET`/`VALUES` templates.
//! * [`Mode::SqlIdentifier`] — the fully rendered result must match
//!   `[A-Za-z_][A-Za-z0-9_]*`; used for table and column names, which are
//!   never quoted and so must be restricted to a safe character set
//!   instead.
#![deny(clippy::all, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions)]

use std::{error, fmt};
use workorder_core::{Context, Scalar};

/// Rendering mode, controlling how a resolved [`Scalar`] is encoded into the
/// output string (spec §4.B).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Verbatim string form. Safe only for non-SQL output (log lines,
    /// `RETURN_ERROR`/`RETURN_SUCCESS` messages).
    Raw,
    /// SQL literal encoding: quoted and escaped strings, decimal numbers,
    /// `TRUE`/`FALSE`, `NULL`.
    SqlLiteral,
    /// The whole rendered result must be a bare SQL identifier.
    SqlIdentifier,
}

/// What to do when a `{name}` placeholder's key is absent from the context.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum MissingPolicy {
    /// Fail the render (the default, spec §4.B).
    Fail,
    /// Leave the literal placeholder text (`{name}`) in place. Used only
    /// when rendering a `RETURN_ERROR` message, so operators still receive
    /// a readable message even if a variable never got bound (spec §4.B).
    KeepPlaceholder,
}

/// Renders `template_text`, substituting each `{name}` with `context`'s
/// value for `name`, encoded per `mode`.
///
/// # Errors
///
/// Returns [`RenderError::MissingVariable`] if any `{name}` key is absent
/// from `context`. Returns [`RenderError::IllegalValue`] if `mode` is
/// [`Mode::SqlIdentifier`] and the rendered result does not match
/// `[A-Za-z_][A-Za-z0-9_]*`. Returns [`RenderError::IllegalCharacter`] if a
/// substituted string value contains a NUL, `\r`, or `\n` byte.
pub fn render(template_text: &str, context: &Context, mode: Mode) -> Result<String, RenderError> {
    render_with_policy(template_text, context, mode, MissingPolicy::Fail)
}

/// Renders a `RETURN_ERROR` message (spec §4.E, §4.B). Unlike [`render`],
/// missing variables render as their literal placeholder text rather than
/// failing — operators must still receive a message even when a recipe
/// references a variable that was never bound.
#[must_use]
pub fn render_error_message(template_text: &str, context: &Context) -> String {
    render_with_policy(template_text, context, Mode::Raw, MissingPolicy::KeepPlaceholder)
        .unwrap_or_else(|_| template_text.to_owned())
}

/// Renders `template_text` into its parameterized form: each `{name}`
/// occurrence becomes a `?` placeholder, and the bound values are returned
/// alongside it in left-to-right source order (spec §4.E, `GENERATE_DML`).
///
/// Unlike [`render`], no encoding is applied to the returned values — they
/// are bound positionally by a downstream executor rather than spliced into
/// SQL text, so there is nothing to escape.
///
/// # Errors
///
/// Returns [`RenderError::MissingVariable`] if any `{name}` key is absent
/// from `context`.
pub fn render_parameterized(template_text: &str, context: &Context) -> Result<(String, Vec<(String, Scalar)>), RenderError> {
    let mut output = String::with_capacity(template_text.len());
    let mut parameters = Vec::new();
    let chars: Vec<char> = template_text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '}') {
                let name: String = chars[i + 1..i + 1 + end].iter().collect();
                match context.get(&name) {
                    Some(value) => {
                        output.push('?');
                        parameters.push((name, value.clone()));
                    }
                    None => return Err(RenderError::MissingVariable(name)),
                }
                i += end + 2;
                continue;
            }
        }

        output.push(chars[i]);
        i += 1;
    }

    Ok((output, parameters))
}

fn render_with_policy(
    template_text: &str,
    context: &Context,
    mode: Mode,
    on_missing: MissingPolicy,
) -> Result<String, RenderError> {
    let mut output = String::with_capacity(template_text.len());
    let chars: Vec<char> = template_text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '}') {
                let name: String = chars[i + 1..i + 1 + end].iter().collect();
                match (context.get(&name), on_missing) {
                    (Some(value), _) => output.push_str(&encode(value, mode)?),
                    (None, MissingPolicy::KeepPlaceholder) => {
                        output.push('{');
                        output.push_str(&name);
                        output.push('}');
                    }
                    (None, MissingPolicy::Fail) => return Err(RenderError::MissingVariable(name)),
                }
                i += end + 2;
                continue;
            }
        }

        output.push(chars[i]);
        i += 1;
    }

    if mode == Mode::SqlIdentifier && !is_identifier(&output) {
        return Err(RenderError::IllegalValue(output));
    }

    Ok(output)
}

fn encode(value: &Scalar, mode: Mode) -> Result<String, RenderError> {
    match mode {
        Mode::Raw => Ok(value.raw_display()),
        Mode::SqlIdentifier => Ok(value.raw_display()),
        Mode::SqlLiteral => encode_sql_literal(value),
    }
}

fn encode_sql_literal(value: &Scalar) -> Result<String, RenderError> {
    match value {
        Scalar::String(s) => {
            if s.contains(['\0', '\r', '\n']) {
                return Err(RenderError::IllegalCharacter);
            }
            Ok(format!("'{}'", s.replace('\'', "''")))
        }
        Scalar::Int(i) => Ok(i.to_string()),
        Scalar::Float(f) => Ok(f.to_string()),
        Scalar::Bool(true) => Ok("TRUE".to_owned()),
        Scalar::Bool(false) => Ok("FALSE".to_owned()),
        Scalar::Null => Ok("NULL".to_owned()),
    }
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Ways rendering can fail (spec §4.B, §7).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RenderError {
    /// A `{name}` placeholder's key was absent from the context.
    MissingVariable(String),
    /// [`Mode::SqlIdentifier`] rejected the rendered value.
    IllegalValue(String),
    /// A substituted string contained a NUL, `\r`, or `\n` byte.
    IllegalCharacter,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MissingVariable(name) => write!(f, "missing variable: {}", name),
            RenderError::IllegalValue(value) => write!(f, "illegal identifier value: {}", value),
            RenderError::IllegalCharacter => write!(f, "value contains a disallowed control character"),
        }
    }
}

impl error::Error for RenderError {}
