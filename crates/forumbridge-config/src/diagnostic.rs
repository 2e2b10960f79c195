// SPDX-FileCopyrightText: 2026 Forumbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration errors rendered as miette diagnostics.
//!
//! Figment reports an unknown key together with the fields its table accepts.
//! Those become [`ConfigError::UnknownKey`] with a "did you mean" hint and a
//! span into the TOML source, including keys inside `[[mappings]]` entries.
//! Missing credentials name the `FORUMBRIDGE_*` variable that can supply them.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::collections::HashMap;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {table}")]
    #[diagnostic(
        code(forumbridge::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Where the key was found, e.g. `[discourse]` or `[[mappings]] entry 2`.
        table: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a setting here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(forumbridge::config::wrong_type), help("expected {expected}"))]
    WrongType {
        key: String,
        found: String,
        expected: String,
        #[label("this value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required setting is absent. `key` is dotted, e.g. `discourse.api_key`.
    #[error("`{key}` is not set")]
    #[diagnostic(
        code(forumbridge::config::missing_key),
        help("set `{key}` in forumbridge.toml or export {}", env_var_for(key))
    )]
    MissingKey { key: String },

    #[error("validation error: {message}")]
    #[diagnostic(code(forumbridge::config::validation))]
    Validation { message: String },

    /// The file could not be parsed at all (bad TOML syntax, unreadable value).
    #[error("cannot read configuration: {message}")]
    #[diagnostic(
        code(forumbridge::config::unreadable),
        help("check the TOML syntax of your forumbridge.toml")
    )]
    Unreadable { message: String },
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// The environment variable that overrides a dotted setting.
///
/// `discourse.api_key` becomes `FORUMBRIDGE_DISCOURSE_API_KEY`, the inverse of
/// the loader's env key mapping.
pub fn env_var_for(key: &str) -> String {
    format!("FORUMBRIDGE_{}", key.replace('.', "_").to_ascii_uppercase())
}

/// Human name of the table a figment error path points into.
fn table_name(path: &[String]) -> String {
    match path {
        [] => "the top level".to_string(),
        [table] => format!("[{table}]"),
        [table, index, ..] => match index.parse::<usize>() {
            Ok(i) => format!("[[{table}]] entry {}", i + 1),
            Err(_) => format!("[{}]", path.join(".")),
        },
    }
}

/// Convert a `figment::Error` into diagnostics, one per contained error.
///
/// `sources` holds `(name, content)` pairs for the TOML inputs so spans can
/// be attached.
pub fn from_figment(err: figment::Error, sources: &[(String, String)]) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let suggestion = suggest_key(field, expected);
                let (span, src) = locate(&error, &error.path, field, sources);
                ConfigError::UnknownKey {
                    key: field.clone(),
                    table: table_name(&error.path),
                    suggestion,
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => {
                let mut key = error.path.clone();
                key.push(field.to_string());
                ConfigError::MissingKey {
                    key: key.join("."),
                }
            }
            Kind::InvalidType(found, expected) => {
                let (span, src) = match error.path.split_last() {
                    Some((field, table)) => locate(&error, table, field, sources),
                    None => (None, None),
                };
                ConfigError::WrongType {
                    key: error.path.join("."),
                    found: found.to_string(),
                    expected: expected.clone(),
                    span,
                    src,
                }
            }
            _ => ConfigError::Unreadable {
                message: error.to_string(),
            },
        })
        .collect()
}

/// Span and source for `field` inside the table at `path`.
///
/// Errors from a file are matched to that file's content. Errors from an
/// inline string fall back to the only source given, if there is exactly one.
fn locate(
    error: &figment::Error,
    path: &[String],
    field: &str,
    sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let source = match file {
        Some(file) => sources.iter().find(|(name, _)| *name == file),
        None if sources.len() == 1 => sources.first(),
        None => None,
    };

    let Some((name, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, path, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Parses a `[table]` or `[[table]]` header line into its name and whether
/// it is an array-of-tables entry.
fn table_header(line: &str) -> Option<(&str, bool)> {
    if let Some(inner) = line.strip_prefix("[[").and_then(|l| l.strip_suffix("]]")) {
        return Some((inner.trim(), true));
    }
    line.strip_prefix('[')
        .and_then(|l| l.strip_suffix(']'))
        .map(|inner| (inner.trim(), false))
}

/// Byte offset of `field` in the table addressed by `path`.
///
/// `path` is a figment error path: empty for top-level keys, `["discourse"]`
/// for a table, `["mappings", "1"]` for the second `[[mappings]]` entry. A
/// table name without an index matches any entry of that name.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let want_table = path.first().map(String::as_str);
    let want_index = path.get(1).and_then(|i| i.parse::<usize>().ok());

    let mut current: Option<&str> = None;
    let mut index = 0;
    let mut entries: HashMap<&str, usize> = HashMap::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let body = line.trim_start();
        if let Some((name, is_array)) = table_header(body.trim_end()) {
            index = if is_array {
                let seen = entries.entry(name).or_default();
                *seen += 1;
                *seen - 1
            } else {
                0
            };
            current = Some(name);
        } else if current == want_table
            && want_index.is_none_or(|i| i == index)
            && body
                .strip_prefix(field)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        {
            return Some(offset + line.len() - body.len());
        }
        offset += line.len();
    }
    None
}

/// The valid key closest to `unknown`, if any is similar enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render errors to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}
