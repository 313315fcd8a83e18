//! Line editor helper: completion and hints.

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;

const WORDS: &[&str] = &[
    // dot-commands
    ".help",
    ".quit",
    ".tables",
    ".schema",
    ".insert",
    ".param",
    ".params",
    // statements
    "SELECT",
    "DISTINCT",
    "FROM",
    "WHERE",
    "GROUP BY",
    "ORDER BY",
    "LIMIT",
    "OFFSET",
    "DELETE FROM",
    "UPDATE",
    "SET",
    "DEFAULT",
    "CREATE TABLE",
    "CREATE INDEX",
    "ALTER TABLE",
    "DROP TABLE",
    "DROP INDEX",
    "PRIMARY KEY",
    "NOT NULL",
    // functions
    "COUNT",
    "SUM",
    "AVG",
    "MIN",
    "MAX",
    "ARRAY_AGG",
    "ANY_VALUE",
    "STARTS_WITH",
    "LOWER",
    "UPPER",
    "CHAR_LENGTH",
    "CONCAT",
];

pub struct SqlHelper {
    completions: Vec<String>,
}

impl SqlHelper {
    pub fn new() -> Self {
        Self {
            completions: WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }

    /// Refresh the table names offered alongside the fixed words.
    pub fn set_tables(&mut self, tables: &[String]) {
        self.completions = WORDS
            .iter()
            .map(|w| w.to_string())
            .chain(tables.iter().cloned())
            .collect();
    }

    fn matches<'a>(&'a self, word: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        let upper = word.to_ascii_uppercase();
        self.completions
            .iter()
            .filter(move |c| c.starts_with(word) || c.starts_with(&upper))
    }
}

impl Default for SqlHelper {
    fn default() -> Self {
        Self::new()
    }
}

fn word_start(line: &str) -> usize {
    line.rfind(|c: char| c.is_whitespace() || c == '(' || c == ',')
        .map(|i| i + 1)
        .unwrap_or(0)
}

impl Completer for SqlHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let start = word_start(&line[..pos]);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((start, Vec::new()));
        }

        let matches = self
            .matches(word)
            .map(|c| Pair {
                display: c.clone(),
                replacement: c.clone(),
            })
            .collect();
        Ok((start, matches))
    }
}

impl Hinter for SqlHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let word = &line[word_start(line)..];
        if word.is_empty() {
            return None;
        }
        self.matches(word)
            .find(|c| c.len() > word.len())
            .map(|c| c[word.len()..].to_string())
    }
}

impl Highlighter for SqlHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(hint.truecolor(100, 100, 100).to_string())
    }
}

impl Validator for SqlHelper {}

impl Helper for SqlHelper {}
