use std::fs;
use std::path::PathBuf;
use std::process::Output;

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("stmtwrap_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn stmtwrap(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_stmtwrap"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run stmtwrap")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Creates a small lookup table database and returns its path.
fn seeded_db(dir: &TempDir) -> PathBuf {
    let db = dir.join("lut.db");
    let output = stmtwrap(&[
        "exec",
        "--db",
        db.to_str().unwrap(),
        "CREATE TABLE Arith_LUT(X INTEGER, Y INTEGER, Sum INTEGER); \
         INSERT INTO Arith_LUT VALUES (1,1,2),(1,2,3),(2,1,3),(2,2,4);",
    ]);
    assert!(output.status.success(), "seed failed: {}", stderr(&output));
    db
}

// ---------------------------------------------------------------------------
// exec
// ---------------------------------------------------------------------------

#[test]
fn exec_creates_database_file() {
    let dir = TempDir::new("exec_create");
    let db = seeded_db(&dir);
    assert!(db.exists());
}

#[test]
fn exec_show_rows_prints_name_value_lines() {
    let dir = TempDir::new("exec_show_rows");
    let db = seeded_db(&dir);

    let output = stmtwrap(&[
        "exec",
        "--db",
        db.to_str().unwrap(),
        "--show-rows",
        "SELECT X, NULL AS Missing FROM Arith_LUT WHERE Y=1 ORDER BY X;",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "X = 1\nMissing = NULL\n\nX = 2\nMissing = NULL\n"
    );
}

#[test]
fn exec_reports_engine_error() {
    let dir = TempDir::new("exec_error");
    let db = dir.join("empty.db");

    let output = stmtwrap(&["exec", "--db", db.to_str().unwrap(), "DROP TABLE missing;"]);
    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.starts_with("error: Execution failed"), "{err}");
    assert!(err.contains("no such table"), "{err}");
}

// ---------------------------------------------------------------------------
// query
// ---------------------------------------------------------------------------

#[test]
fn query_binds_params_and_prints_json() {
    let dir = TempDir::new("query_json");
    let db = seeded_db(&dir);

    let output = stmtwrap(&[
        "query",
        "--db",
        db.to_str().unwrap(),
        "SELECT X, Sum FROM Arith_LUT WHERE X=? AND Y=?",
        "--param",
        "2",
        "--param",
        "1",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));

    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows, serde_json::json!([{ "X": 2, "Sum": 3 }]));
}

#[test]
fn query_null_param_matches_nothing() {
    let dir = TempDir::new("query_null");
    let db = seeded_db(&dir);

    let output = stmtwrap(&[
        "query",
        "--db",
        db.to_str().unwrap(),
        "SELECT X FROM Arith_LUT WHERE X=?",
        "--param",
        "null",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows, serde_json::json!([]));
}

#[test]
fn query_table_output_has_header_and_count() {
    let dir = TempDir::new("query_table");
    let db = seeded_db(&dir);

    let output = stmtwrap(&[
        "query",
        "--db",
        db.to_str().unwrap(),
        "SELECT X, Y FROM Arith_LUT ORDER BY X, Y",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "X  Y");
    assert_eq!(lines[1], "-  -");
    assert_eq!(lines[2], "1  1");
    assert_eq!(lines.last().copied(), Some("(4 rows)"));
}

#[test]
fn query_invalid_sql_fails() {
    let dir = TempDir::new("query_invalid");
    let db = seeded_db(&dir);

    let output = stmtwrap(&["query", "--db", db.to_str().unwrap(), "SELEC 1"]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("Failed to prepare statement"),
        "{}",
        stderr(&output)
    );
}

// ---------------------------------------------------------------------------
// select / delete
// ---------------------------------------------------------------------------

#[test]
fn select_with_columns_and_where() {
    let dir = TempDir::new("select");
    let db = seeded_db(&dir);

    let output = stmtwrap(&[
        "select",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "Arith_LUT",
        "--columns",
        "Y,Sum",
        "--where",
        "X=1",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        rows,
        serde_json::json!([{ "Y": 1, "Sum": 2 }, { "Y": 2, "Sum": 3 }])
    );
}

#[test]
fn delete_reports_change_count() {
    let dir = TempDir::new("delete");
    let db = seeded_db(&dir);
    let db_arg = db.to_str().unwrap();

    let output = stmtwrap(&[
        "delete", "--db", db_arg, "--table", "Arith_LUT", "--where", "Sum=3",
    ]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "Deleted 2 row(s) from 'Arith_LUT'.\n");

    let output = stmtwrap(&[
        "query",
        "--db",
        db_arg,
        "SELECT count(*) AS n FROM Arith_LUT",
        "--format",
        "json",
    ]);
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows, serde_json::json!([{ "n": 2 }]));
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

#[test]
fn config_capacity_limits_generated_sql() {
    let dir = TempDir::new("config_capacity");
    let db = seeded_db(&dir);
    let config = dir.join("stmtwrap.yml");
    fs::write(&config, "builder_capacity: 20\n").unwrap();

    let output = stmtwrap(&[
        "select",
        "--config",
        config.to_str().unwrap(),
        "--db",
        db.to_str().unwrap(),
        "--table",
        "Arith_LUT",
    ]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("Failed to build select"),
        "{}",
        stderr(&output)
    );
}

#[test]
fn config_read_only_rejects_writes() {
    let dir = TempDir::new("config_read_only");
    let db = seeded_db(&dir);
    let config = dir.join("ro.yml");
    fs::write(&config, "read_only: true\n").unwrap();

    let output = stmtwrap(&[
        "--config",
        config.to_str().unwrap(),
        "delete",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "Arith_LUT",
        "--where",
        "1",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Delete failed"), "{}", stderr(&output));
}

#[test]
fn config_invalid_file_is_reported() {
    let dir = TempDir::new("config_invalid");
    let db = seeded_db(&dir);
    let config = dir.join("bad.yml");
    fs::write(&config, "busy_retry:\n  max_attempts: 0\n").unwrap();

    let output = stmtwrap(&[
        "--config",
        config.to_str().unwrap(),
        "exec",
        "--db",
        db.to_str().unwrap(),
        "SELECT 1;",
    ]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("Failed to load config"),
        "{}",
        stderr(&output)
    );
}
