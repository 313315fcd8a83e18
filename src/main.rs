//! spanmem interactive shell
//!
//! Usage: spanmem [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>    Configuration file (default: ./spanmem.toml if present)
//!   -s, --schema <FILE>    DDL file to apply at start-up (repeatable)
//!   -e, --execute <SQL>    Run statements and exit
//!   -o, --output <FORMAT>  table or json

use clap::Parser;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use spanmem::config::{Config, OutputFormat};
use spanmem::shell::helper::SqlHelper;
use spanmem::shell::{is_complete, output, Outcome, Session};
use spanmem::Database;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "spanmem")]
#[command(about = "In-memory Spanner-dialect SQL database shell", long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// DDL file applied at start-up, after those named in the configuration
    #[arg(short, long = "schema")]
    schema: Vec<PathBuf>,

    /// Statements to run instead of starting the shell
    #[arg(short, long)]
    execute: Option<String>,

    /// Result format
    #[arg(short, long)]
    output: Option<OutputFormat>,
}

fn load_schema(db: &Database, path: &Path) -> anyhow::Result<usize> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("can't read {}: {}", path.display(), e))?;
    let ddl = spansql_core::parse_ddl(&path.display().to_string(), &text)?;
    for stmt in &ddl.list {
        db.apply_ddl(stmt)?;
    }
    Ok(ddl.list.len())
}

fn print_banner() {
    println!(
        "  {} {}",
        "spanmem".white().bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    println!(
        "  Type {} for help, {} to quit\n",
        ".help".yellow(),
        ".quit".yellow()
    );
}

/// Print one result. Returns false when the session should end.
fn print_outcome(result: anyhow::Result<Outcome>, format: OutputFormat) -> bool {
    match result {
        Ok(Outcome::Rows { cols, rows }) => {
            let text = output::render(format, &cols, &rows);
            if !text.is_empty() {
                println!("{}", text);
            }
        }
        Ok(Outcome::Count(n)) => {
            println!("{}", format!("{} row(s) affected", n).dimmed());
        }
        Ok(Outcome::Ddl(n)) => {
            println!("{}", format!("OK, {} statement(s) applied", n).dimmed());
        }
        Ok(Outcome::Text(text)) => {
            if !text.is_empty() {
                println!("{}", text);
            }
        }
        Ok(Outcome::Quit) => return false,
        Err(e) => {
            tracing::warn!("Statement failed: {}", e);
            eprintln!("{} {}", "Error:".red().bold(), e);
        }
    }
    true
}

fn run_shell(session: &mut Session, config: &Config) -> anyhow::Result<()> {
    print_banner();

    let mut helper = SqlHelper::new();
    helper.set_tables(&session.database().table_names());
    let mut rl: Editor<SqlHelper, rustyline::history::DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(helper));
    let _ = rl.load_history(&config.history_file);

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() {
            format!("{} ", "spanmem>".cyan())
        } else {
            format!("{} ", "     ...".dimmed())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                if buffer.is_empty() && line.trim().is_empty() {
                    continue;
                }
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);
                if !is_complete(&buffer) {
                    continue;
                }

                let input = std::mem::take(&mut buffer);
                let _ = rl.add_history_entry(input.as_str());
                let mut keep_going = true;
                for result in session.run_input(&input) {
                    keep_going &= print_outcome(result, config.output);
                }
                if let Some(h) = rl.helper_mut() {
                    h.set_tables(&session.database().table_names());
                }
                if !keep_going {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    if let Err(e) = rl.save_history(&config.history_file) {
        tracing::warn!("Failed to save history to {}: {}", config.history_file.display(), e);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::discover(Path::new("."))?,
    };
    config.schema.extend(args.schema.iter().cloned());
    if let Some(format) = args.output {
        config.output = format;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db = Database::new();
    for path in &config.schema {
        let n = load_schema(&db, path)?;
        tracing::info!("Loaded {} DDL statement(s) from {}", n, path.display());
    }
    let mut session = Session::new(db);

    if let Some(sql) = &args.execute {
        let mut failed = false;
        for result in session.run_input(sql) {
            failed |= result.is_err();
            print_outcome(result, config.output);
        }
        if failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    tracing::info!("Starting shell with {} table(s)", session.database().table_names().len());
    run_shell(&mut session, &config)
}
