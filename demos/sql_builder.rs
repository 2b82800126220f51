//! SQL builder example.
//!
//! Shows the statement text produced by each builder method, how the
//! capacity limit surfaces, and how a connection's `make_*` helpers
//! prepare that text directly.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p stmtwrap-demos --example sql_builder
//! ```

use stmtwrap_core::{CoreError, SqlBuilder};
use stmtwrap_sqlite::{Connection, ConnectionConfig, SqliteError, params};

fn main() {
    // === Step 1: Plain text generation ===
    println!("=== Generated SQL ===");
    let builder = SqlBuilder::default();
    let samples = [
        builder.insert("Person", "name,age", "?,?"),
        builder.insert_positional("Person", "'ada', 36"),
        builder.select("Person", None, None),
        builder.select("Person", Some("name"), Some("age > ?")),
        builder.update("Person", &[("name", "?"), ("age", "age + 1")], "rowid=?"),
        builder.delete("Person", "age IS NULL"),
    ];
    for sql in samples {
        println!("  {}", sql.unwrap());
    }

    // === Step 2: Capacity limit ===
    println!("\n=== Capacity ===");
    let tiny = SqlBuilder::new(24);
    match tiny.select("Person", None, Some("name = 'a rather long name'")) {
        Ok(sql) => println!("  fits: {sql}"),
        Err(CoreError::BuilderOverflow { length, capacity }) => {
            println!("  rejected: {length} bytes > capacity {capacity}");
        }
        Err(err) => println!("  unexpected: {err}"),
    }

    // === Step 3: Builders on a connection ===
    println!("\n=== Connection helpers ===");
    let config = ConnectionConfig::default().with_builder_capacity(64);
    let conn = Connection::open_with_config(stmtwrap_sqlite::IN_MEMORY, config).unwrap();
    conn.execute("CREATE TABLE Person(name TEXT, age INTEGER);").unwrap();

    let mut insert = conn.make_insert("Person", "name,age", "?,?").unwrap();
    for (name, age) in [("ada", 36), ("alan", 41), ("grace", 85)] {
        insert.execute(params![name, age]).unwrap();
    }

    let mut birthday = conn
        .make_update("Person", &[("age", "age + 1")], "name=?")
        .unwrap();
    birthday.execute(params!["ada"]).unwrap();

    let mut adults = conn
        .make_select("Person", Some("name, age"), Some("age > ?"))
        .unwrap();
    println!("  {}", adults.sql());
    let people = adults
        .query(params![40])
        .unwrap()
        .map_rows(|row| format!("{} ({})", row.read_text(0), row.read_integer(1)))
        .unwrap();
    for person in people {
        println!("    {person}");
    }

    let long_filter = format!("name IN ({})", vec!["?"; 40].join(","));
    match conn.make_select("Person", None, Some(&long_filter)) {
        Err(SqliteError::Core(err)) => println!("  make_select refused: {err}"),
        Err(err) => println!("  unexpected: {err}"),
        Ok(stmt) => println!("  prepared: {}", stmt.sql()),
    }
}
