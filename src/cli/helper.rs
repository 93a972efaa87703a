//! REPL line editing: completion and highlighting

use crate::sql::tokenize;
use crate::storage::Catalog;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use sqlparser::tokenizer::Token;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Keywords of the accepted dialect
const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "ORDER", "BY", "ASC", "DESC", "AS", "JOIN", "INNER", "ON", "AND",
    "OR", "NOT", "IN", "BETWEEN", "LIKE", "IS", "NULL", "TRUE", "FALSE", "UNKNOWN", "DATE",
    "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "BEGIN", "START", "TRANSACTION",
    "COMMIT", "ROLLBACK", "SHOW", "TABLES", "DESCRIBE",
];

/// Dot commands understood by the shell
const COMMANDS: &[&str] = &[
    ".cartesian", ".exit", ".help", ".mode", ".plan", ".quit", ".schema", ".tables", ".timing",
];

const KEYWORD_STYLE: &str = "1;34";
const STRING_STYLE: &str = "32";
const PLACEHOLDER_STYLE: &str = "33";
const NUMBER_STYLE: &str = "35";
const COMMAND_STYLE: &str = "36";

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

fn paint(out: &mut String, style: &str, text: &str) {
    out.push_str("\x1b[");
    out.push_str(style);
    out.push('m');
    out.push_str(text);
    out.push_str("\x1b[0m");
}

/// Whether the word being typed is in a table position
///
/// True right after FROM, JOIN, INTO, UPDATE or DESCRIBE, and after a
/// comma of a FROM list.
fn expects_table(before: &str) -> bool {
    let spaced = before.to_ascii_lowercase().replace(',', " , ");
    let mut in_from = false;
    let mut expects = false;
    for word in spaced.split_whitespace() {
        expects = match word {
            "from" => {
                in_from = true;
                true
            }
            "join" | "into" | "update" | "describe" => true,
            "," => in_from,
            "where" | "on" | "set" | "values" | "order" => {
                in_from = false;
                false
            }
            _ => false,
        };
    }
    expects
}

/// Completion and highlighting for the interactive shell
///
/// Clones share the catalog snapshot, so the copy handed to the editor
/// sees every [`ReplHelper::refresh`].
#[derive(Clone, Default)]
pub struct ReplHelper {
    /// Column names keyed by lowercased table name
    catalog: Arc<RwLock<BTreeMap<String, Vec<String>>>>,
    plain: bool,
}

impl ReplHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave lines uncoloured
    pub fn without_highlighting(mut self) -> Self {
        self.plain = true;
        self
    }

    /// Snapshot the catalog's tables and columns
    pub fn refresh(&self, catalog: &dyn Catalog) {
        let snapshot = catalog
            .table_names()
            .into_iter()
            .map(|name| {
                let columns = catalog
                    .metadata(&name)
                    .map(|m| m.column_names())
                    .unwrap_or_default();
                (name.to_lowercase(), columns)
            })
            .collect();
        if let Ok(mut current) = self.catalog.write() {
            *current = snapshot;
        }
    }

    /// Replacements for `word`, given the text before it
    fn candidates(&self, word: &str, before: &str) -> Vec<String> {
        let prefix = word.to_lowercase();
        if before.trim_start().starts_with('.') || word.starts_with('.') {
            return COMMANDS
                .iter()
                .filter(|c| c.starts_with(&prefix))
                .map(|c| c.to_string())
                .collect();
        }

        let upper = word.chars().next().map_or(true, char::is_uppercase);
        let mut found: Vec<String> = KEYWORDS
            .iter()
            .filter(|k| k.to_lowercase().starts_with(&prefix))
            .map(|k| if upper { k.to_string() } else { k.to_lowercase() })
            .collect();

        let Ok(catalog) = self.catalog.read() else {
            return found;
        };
        if expects_table(before) {
            found.extend(catalog.keys().filter(|t| t.starts_with(&prefix)).cloned());
            return found;
        }
        if prefix.is_empty() {
            return found;
        }
        let mentioned = before
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter_map(|w| catalog.get(w))
            .flatten()
            .filter(|c| c.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect::<Vec<_>>();
        for column in mentioned {
            if !found.contains(&column) {
                found.push(column);
            }
        }
        found
    }

    /// Colour SQL tokens; `None` when the line does not tokenize yet, such
    /// as inside an unterminated string
    fn colour(line: &str) -> Option<String> {
        let tokens = tokenize(line).ok()?;
        let mut out = String::with_capacity(line.len() * 2);
        for (i, (token, start)) in tokens.iter().enumerate() {
            let next = tokens.get(i + 1);
            let after_colon = i > 0 && tokens[i - 1].0 == Token::Colon;
            let end = next.map_or(line.len(), |(_, offset)| *offset);
            let text = &line[*start..end];
            let style = match token {
                Token::Word(w) if w.quote_style.is_none() && is_keyword(&w.value) => {
                    Some(KEYWORD_STYLE)
                }
                Token::SingleQuotedString(_) => Some(STRING_STYLE),
                Token::Number(..) => Some(NUMBER_STYLE),
                Token::Placeholder(_) => Some(PLACEHOLDER_STYLE),
                // `:name` is a colon token followed by a word
                Token::Colon if matches!(next, Some((Token::Word(_), _))) => {
                    Some(PLACEHOLDER_STYLE)
                }
                Token::Word(_) if after_colon => Some(PLACEHOLDER_STYLE),
                _ => None,
            };
            match style {
                Some(style) => paint(&mut out, style, text),
                None => out.push_str(text),
            }
        }
        Some(out)
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_ascii_whitespace() || matches!(c, ',' | '(' | ')'))
            .map_or(0, |i| i + 1);
        let pairs = self
            .candidates(&line[start..pos], &line[..start])
            .into_iter()
            .map(|replacement| Pair {
                display: replacement.clone(),
                replacement,
            })
            .collect();
        Ok((start, pairs))
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if self.plain || line.trim().is_empty() {
            return Cow::Borrowed(line);
        }
        if line.trim_start().starts_with('.') {
            let mut out = String::new();
            paint(&mut out, COMMAND_STYLE, line);
            return Cow::Owned(out);
        }
        match Self::colour(line) {
            Some(coloured) => Cow::Owned(coloured),
            None => Cow::Borrowed(line),
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        !self.plain
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}
