use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use stmtwrap_core::{ConnectionConfig, Param, Value};
use stmtwrap_sqlite::{Connection, Cursor};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format for result rows.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Table,
}

#[derive(Debug, Parser)]
#[command(name = "stmtwrap")]
#[command(about = "Run SQL against a SQLite database through prepared statements")]
#[command(version)]
struct Cli {
    /// YAML connection configuration (busy retry, builder capacity, read-only).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one or more `;`-separated statements.
    Exec(ExecArgs),
    /// Prepare a single statement, bind parameters, and print its rows.
    Query(QueryArgs),
    /// Select rows from a table with a generated statement.
    Select(SelectArgs),
    /// Delete rows from a table with a generated statement.
    Delete(DeleteArgs),
}

#[derive(Debug, Args)]
struct ExecArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// SQL text.
    sql: String,
    /// Print every row produced as `name = value` lines.
    #[arg(long)]
    show_rows: bool,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// SQL text of a single statement.
    sql: String,
    /// Positional parameter values, in order. `null` binds NULL.
    #[arg(long = "param")]
    params: Vec<String>,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct SelectArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table name.
    #[arg(long)]
    table: String,
    /// Comma-separated column list (default: all columns).
    #[arg(long)]
    columns: Option<String>,
    /// Body of the WHERE clause.
    #[arg(long = "where")]
    filter: Option<String>,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    /// Database file path.
    #[arg(long)]
    db: PathBuf,
    /// Table name.
    #[arg(long)]
    table: String,
    /// Body of the WHERE clause.
    #[arg(long = "where")]
    filter: String,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Command::Exec(args) => run_exec(args, config),
        Command::Query(args) => run_query(args, config),
        Command::Select(args) => run_select(args, config),
        Command::Delete(args) => run_delete(args, config),
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ConnectionConfig, String> {
    match path {
        Some(path) => ConnectionConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => Ok(ConnectionConfig::default()),
    }
}

fn open(db: &Path, config: ConnectionConfig) -> Result<Connection, String> {
    Connection::open_with_config(db, config)
        .map_err(|e| format!("Failed to open database '{}': {e}", db.display()))
}

fn run_exec(args: ExecArgs, config: ConnectionConfig) -> Result<(), String> {
    let conn = open(&args.db, config)?;

    if !args.show_rows {
        return conn
            .execute(&args.sql)
            .map_err(|e| format!("Execution failed: {e}"));
    }

    let mut rows = 0_usize;
    conn.execute_with(&args.sql, |row| {
        if rows > 0 {
            println!();
        }
        for (name, value) in row.iter() {
            println!("{name} = {}", value.unwrap_or("NULL"));
        }
        rows += 1;
        ControlFlow::Continue(())
    })
    .map_err(|e| format!("Execution failed: {e}"))?;
    debug!(rows, "exec finished");
    Ok(())
}

fn run_query(args: QueryArgs, config: ConnectionConfig) -> Result<(), String> {
    let conn = open(&args.db, config)?;
    let mut stmt = conn
        .prepare(&args.sql)
        .map_err(|e| format!("Failed to prepare statement: {e}"))?;

    let values: Vec<Value> = args.params.iter().map(|p| parse_param(p)).collect();
    let params: Vec<Param<'_>> = values.iter().map(Param::from).collect();
    let names = column_names(stmt.column_count(), |i| stmt.column_name(i));

    let cursor = stmt
        .query(&params)
        .map_err(|e| format!("Query failed: {e}"))?;
    print_rows(&names, cursor, args.format)
}

fn run_select(args: SelectArgs, config: ConnectionConfig) -> Result<(), String> {
    let conn = open(&args.db, config)?;
    let mut stmt = conn
        .make_select(&args.table, args.columns.as_deref(), args.filter.as_deref())
        .map_err(|e| format!("Failed to build select: {e}"))?;
    let names = column_names(stmt.column_count(), |i| stmt.column_name(i));

    let cursor = stmt
        .query(&[])
        .map_err(|e| format!("Select failed: {e}"))?;
    print_rows(&names, cursor, args.format)
}

fn run_delete(args: DeleteArgs, config: ConnectionConfig) -> Result<(), String> {
    let conn = open(&args.db, config)?;
    let mut stmt = conn
        .make_delete(&args.table, &args.filter)
        .map_err(|e| format!("Failed to build delete: {e}"))?;
    stmt.execute(&[])
        .map_err(|e| format!("Delete failed: {e}"))?;

    let mut changes = conn
        .prepare("SELECT changes()")
        .map_err(|e| format!("Failed to read change count: {e}"))?;
    let deleted = changes
        .query(&[])
        .map_err(|e| format!("Failed to read change count: {e}"))?
        .current_row()
        .read_integer(0);
    println!("Deleted {deleted} row(s) from '{}'.", args.table);
    Ok(())
}

/// Interprets a command-line parameter as an integer, then a float, else text.
fn parse_param(raw: &str) -> Value {
    if raw == "null" {
        Value::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Float(f)
    } else {
        Value::Text(raw.to_string())
    }
}

fn column_names(count: usize, name: impl Fn(usize) -> Option<String>) -> Vec<String> {
    (0..count)
        .map(|i| name(i).unwrap_or_else(|| format!("column{i}")))
        .collect()
}

fn print_rows(names: &[String], cursor: Cursor<'_, '_>, format: CliOutputFormat) -> Result<(), String> {
    let rows = cursor
        .map_rows(|row| row.values())
        .map_err(|e| format!("Failed to read rows: {e}"))?;
    debug!(rows = rows.len(), "query finished");

    match format {
        CliOutputFormat::Json => {
            let objects: Vec<serde_json::Map<String, serde_json::Value>> = rows
                .iter()
                .map(|row| {
                    names
                        .iter()
                        .cloned()
                        .zip(row.iter().map(|v| serde_json::to_value(v).unwrap_or_default()))
                        .collect()
                })
                .collect();
            let json = serde_json::to_string_pretty(&objects)
                .map_err(|e| format!("Failed to serialize rows: {e}"))?;
            println!("{json}");
        }
        CliOutputFormat::Table => print_table(names, &rows),
    }
    Ok(())
}

fn print_table(names: &[String], rows: &[Vec<Value>]) {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let widths: Vec<usize> = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(String::len)
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |fields: &[String]| {
        fields
            .iter()
            .zip(&widths)
            .map(|(field, &width)| format!("{field:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(names));
    println!(
        "{}",
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ")
    );
    for row in &cells {
        println!("{}", line(row.as_slice()));
    }
    println!("({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param_precedence() {
        assert_eq!(parse_param("12"), Value::Integer(12));
        assert_eq!(parse_param("-3"), Value::Integer(-3));
        assert_eq!(parse_param("2.5"), Value::Float(2.5));
        assert_eq!(parse_param("null"), Value::Null);
        assert_eq!(parse_param("NULL"), Value::Text("NULL".into()));
        assert_eq!(parse_param("ada"), Value::Text("ada".into()));
    }

    #[test]
    fn test_column_names_fall_back_to_position() {
        let names = column_names(3, |i| (i != 1).then(|| format!("c{i}")));
        assert_eq!(names, vec!["c0", "column1", "c2"]);
    }
}
