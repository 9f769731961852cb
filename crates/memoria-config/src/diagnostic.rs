// SPDX-FileCopyrightText: 2026 Memoria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment reports parse failures as a flat error chain. This module turns
//! each link into a [`ConfigError`] that miette can render against the TOML
//! text it came from, with a label on the offending key and a spelling hint
//! for unknown keys.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::fmt::Write as _;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key needs before it is offered as a hint.
const HINT_MIN_SCORE: f64 = 0.75;

/// A TOML document that was fed to the loader: display name and contents.
pub type ConfigSource = (String, String);

/// One configuration problem.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(memoria::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Closest known key, if any is close enough.
        suggestion: Option<String>,
        /// Keys accepted in the table, comma separated.
        valid_keys: String,
        #[label("not a memoria setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}, expected {expected}")]
    #[diagnostic(code(memoria::config::invalid_type))]
    InvalidType {
        /// Dotted path of the setting, e.g. `memory.retrieval_k`.
        key: String,
        found: String,
        expected: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(memoria::config::missing_key),
        help("set `{key}` in memoria.toml or through a MEMORIA_ environment variable")
    )]
    MissingKey { key: String },

    /// The file parsed but a value is out of range or inconsistent.
    #[error("validation error: {message}")]
    #[diagnostic(code(memoria::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(memoria::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let known = format!("known keys here: {valid_keys}");
    match suggestion {
        Some(hint) => format!("perhaps `{hint}`? {known}"),
        None => known,
    }
}

/// Split a figment error chain into one [`ConfigError`] per failure.
///
/// `sources` are the TOML documents that went into the figment. They are
/// only used to attach source spans; an empty slice still yields errors.
pub fn figment_to_config_errors(err: figment::Error, sources: &[ConfigSource]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| ConfigError::from_figment(&error, sources))
        .collect()
}

impl ConfigError {
    fn from_figment(error: &figment::Error, sources: &[ConfigSource]) -> Self {
        match &error.kind {
            Kind::UnknownField(key, expected) => {
                let (span, src) = locate(error, &error.path, key, sources);
                Self::UnknownKey {
                    key: key.clone(),
                    suggestion: suggest_key(key, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::InvalidType(found, expected) => {
                // The path ends with the key itself; the rest names its table.
                let (span, src) = match error.path.split_last() {
                    Some((key, table)) => locate(error, table, key, sources),
                    None => (None, None),
                };
                Self::InvalidType {
                    key: error.path.join("."),
                    found: found.to_string(),
                    expected: expected.clone(),
                    span,
                    src,
                }
            }
            Kind::MissingField(key) => {
                let mut path = error.path.clone();
                path.push(key.to_string());
                Self::MissingKey {
                    key: path.join("."),
                }
            }
            _ => Self::Other(error.to_string()),
        }
    }
}

/// Pick the document an error came from.
///
/// Providers without file metadata (inline strings) match only when there
/// is a single candidate.
fn source_of<'a>(error: &figment::Error, sources: &'a [ConfigSource]) -> Option<&'a ConfigSource> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|meta| meta.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    match file {
        Some(file) => sources.iter().find(|(name, _)| *name == file),
        None if sources.len() == 1 => sources.first(),
        None => None,
    }
}

fn locate(
    error: &figment::Error,
    table: &[String],
    key: &str,
    sources: &[ConfigSource],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some((name, content)) = source_of(error, sources) else {
        return (None, None);
    };
    match find_key_offset(content, table, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of the line assigning `key` inside the TOML table `table`.
///
/// An empty `table` means the top level, before the first header. Nested
/// tables are matched by their dotted header, e.g. `[memory.audit]`.
pub fn find_key_offset(content: &str, table: &[String], key: &str) -> Option<usize> {
    let header = (!table.is_empty()).then(|| format!("[{}]", table.join(".")));
    let mut inside = header.is_none();
    let mut line_start = 0;

    for line in content.split_inclusive('\n') {
        let body = line.trim_start();
        if body.starts_with('[') {
            let bare = body.split('#').next().unwrap_or_default().trim();
            inside = header.as_deref() == Some(bare);
        } else if inside && assigns(body, key) {
            return Some(line_start + line.len() - body.len());
        }
        line_start += line.len();
    }
    None
}

fn assigns(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// The known key closest to `unknown`, if it scores at least
/// [`HINT_MIN_SCORE`].
pub fn suggest_key(unknown: &str, known: &[&str]) -> Option<String> {
    let mut best: Option<(&str, f64)> = None;
    for &candidate in known {
        let score = strsim::jaro_winkler(unknown, candidate);
        if score >= HINT_MIN_SCORE && best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.map(|(key, _)| key.to_string())
}

/// Render every error with miette's graphical handler.
pub fn render_to_string(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        let before = out.len();
        if handler.render_report(&mut out, error).is_err() {
            out.truncate(before);
            let _ = writeln!(out, "Error: {error}");
        }
    }
    out
}

/// Print every error to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_to_string(errors));
}
