//! Interactive shell over an in-memory database.
//!
//! A [`Session`] owns the database and the bound query parameters; the
//! binary feeds it lines from the editor and prints the [`Outcome`]s.

pub mod helper;
pub mod output;

use colored::Colorize;
use serde_json::Value as JsonValue;
use spansql_core::quote_identifier;

use crate::query::{collect_rows, Params};
use crate::storage::{ColumnInfo, Database};
use crate::value::{Row, Value};

/// What a statement or command produced.
#[derive(Debug)]
pub enum Outcome {
    Rows { cols: Vec<ColumnInfo>, rows: Vec<Row> },
    /// Rows changed by DML or a `.insert`.
    Count(usize),
    /// Statements applied from a DDL batch.
    Ddl(usize),
    Text(String),
    Quit,
}

pub struct Session {
    db: Database,
    params: Params,
}

impl Session {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            params: Params::new(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Run one SQL statement, routed by its leading keyword.
    pub fn run_statement(&mut self, sql: &str) -> anyhow::Result<Outcome> {
        let keyword = sql
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match keyword.as_str() {
            "SELECT" => {
                let mut iter = self.db.query_sql(sql, &self.params)?;
                let cols = iter.cols().to_vec();
                let rows = collect_rows(iter.as_mut())?;
                Ok(Outcome::Rows { cols, rows })
            }
            "DELETE" | "UPDATE" => {
                let mut tx = self.db.new_transaction();
                tx.start()?;
                let n = self.db.execute_sql(&tx, sql, &self.params)?;
                tx.commit()?;
                Ok(Outcome::Count(n))
            }
            "CREATE" | "ALTER" | "DROP" => Ok(Outcome::Ddl(self.db.apply_ddl_text(sql)?)),
            "" => Ok(Outcome::Text(String::new())),
            _ => anyhow::bail!("unrecognized statement starting with {}", keyword),
        }
    }

    /// Run a dot-command such as `.tables`.
    pub fn run_command(&mut self, line: &str) -> anyhow::Result<Outcome> {
        let line = line.trim();
        let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match cmd {
            ".quit" | ".exit" => Ok(Outcome::Quit),
            ".help" => Ok(Outcome::Text(help_text())),
            ".tables" => Ok(Outcome::Text(self.db.table_names().join("\n"))),
            ".schema" => {
                let ddl: Vec<String> = self
                    .db
                    .get_ddl()
                    .iter()
                    .map(|stmt| format!("{};", stmt))
                    .collect();
                Ok(Outcome::Text(ddl.join("\n")))
            }
            ".insert" => {
                let (table, json) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow::anyhow!("usage: .insert <table> <json-object>"))?;
                let JsonValue::Object(obj) = serde_json::from_str::<JsonValue>(json.trim())? else {
                    anyhow::bail!("row must be a JSON object");
                };
                let cols: Vec<&String> = obj.keys().collect();
                let row: Vec<JsonValue> = obj.values().cloned().collect();

                let mut tx = self.db.new_transaction();
                tx.start()?;
                self.db.insert_or_update(&tx, table, &cols, &[row])?;
                tx.commit()?;
                Ok(Outcome::Count(1))
            }
            ".param" => {
                let (name, json) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| anyhow::anyhow!("usage: .param <name> <json>"))?;
                let v: JsonValue = serde_json::from_str(json.trim())?;
                let name = name.trim_start_matches('@').to_string();
                self.params.insert(name, Value::from_json(&v));
                Ok(Outcome::Text(String::new()))
            }
            ".params" => {
                let lines: Vec<String> = self
                    .params
                    .iter()
                    .map(|(k, v)| format!("@{} = {}", k, v.to_json()))
                    .collect();
                Ok(Outcome::Text(lines.join("\n")))
            }
            _ => anyhow::bail!("unknown command {}, try .help", cmd),
        }
    }

    /// Run a line of input: a dot-command, or one or more `;`-separated statements.
    pub fn run_input(&mut self, input: &str) -> Vec<anyhow::Result<Outcome>> {
        if input.trim_start().starts_with('.') {
            return vec![self.run_command(input)];
        }
        split_statements(input)
            .iter()
            .map(|stmt| self.run_statement(stmt))
            .collect()
    }
}

/// Whether `input` ends a statement: a dot-command, or SQL ending in `;`.
pub fn is_complete(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.starts_with('.') || trimmed.ends_with(';')
}

/// Split on `;` outside of quoted strings and identifiers.
///
/// DDL batches are kept whole so the parser sees comments in context.
pub fn split_statements(input: &str) -> Vec<String> {
    let first = input
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if matches!(first.as_str(), "CREATE" | "ALTER" | "DROP") {
        let stmt = input.trim().trim_end_matches(';').trim();
        return if stmt.is_empty() {
            Vec::new()
        } else {
            vec![stmt.to_string()]
        };
    }

    let mut stmts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in input.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            ';' => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    stmts.push(stmt.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    let stmt = current.trim();
    if !stmt.is_empty() {
        stmts.push(stmt.to_string());
    }
    stmts
}

pub fn help_text() -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Commands:".white().bold()));
    for (cmd, what) in [
        (".help", "Show this help"),
        (".quit", "Exit the shell"),
        (".tables", "List tables"),
        (".schema", "Print the schema as DDL"),
        (".insert <table> <json>", "Insert or update one row"),
        (".param <name> <json>", "Bind a query parameter"),
        (".params", "List bound parameters"),
    ] {
        out.push_str(&format!("  {:<24} {}\n", cmd.yellow(), what));
    }
    out.push_str(&format!("\n{}\n", "Statements:".white().bold()));
    out.push_str("  SELECT ...;                query\n");
    out.push_str("  DELETE ... / UPDATE ...;   DML in its own transaction\n");
    out.push_str("  CREATE / ALTER / DROP ...; DDL\n");
    out.push_str(&format!(
        "\n  {} {}",
        "--".dimmed(),
        format!("SELECT * FROM {} WHERE ID = @id;", quote_identifier("Table")).green()
    ));
    out
}
