use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    work: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let work = base.join("work");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&work).expect("failed to create work dir");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            work,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self, name: &str) -> PathBuf {
        self.work.join(name)
    }
}

/// Create a reporting database shaped like the production ones.
fn seed_reports_db(path: &Path) {
    let conn = rusqlite::Connection::open(path).expect("failed to create fixture db");
    conn.execute_batch(
        "CREATE TABLE daily_reports (
            date         TEXT,
            account_name TEXT,
            equity       REAL,
            deposit      REAL
        );
        INSERT INTO daily_reports VALUES ('2024-01-01', 'giacomo', 1500.0, 1500.0);",
    )
    .expect("failed to seed fixture db");
}

fn run_cli(env: &CliTestEnv, args: &[&str]) -> Output {
    let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("sqlkeeper"));

    Command::new(bin_path)
        .args(args)
        .env("HOME", &env.home)
        .env("XDG_CONFIG_HOME", &env.xdg_config)
        .env("XDG_STATE_HOME", &env.xdg_state)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute sqlkeeper: {e}"))
}

fn assert_success(args: &[&str], output: &Output) {
    if output.status.success() {
        return;
    }

    let rendered_args = args
        .iter()
        .map(|arg| OsString::from(arg).to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    panic!(
        "sqlkeeper {rendered_args} failed\nstatus: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
    );
}

#[test]
fn schema_commands_list_and_drop() {
    let env = CliTestEnv::new();
    let db = env.db_path("reports.db");
    seed_reports_db(&db);
    let db_arg = db.to_str().unwrap();

    let args = ["schema", "list-tables", "--db", db_arg];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("- daily_reports"));

    let args = [
        "schema",
        "drop-column",
        "--db",
        db_arg,
        "--table",
        "daily_reports",
        "--column",
        "deposit",
    ];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let args = [
        "schema",
        "list-columns",
        "--db",
        db_arg,
        "--table",
        "daily_reports",
    ];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("- equity (REAL)"));
    assert!(!stdout.contains("deposit"));

    // Verify through a direct connection as well
    let conn = rusqlite::Connection::open(&db).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM daily_reports", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn drop_column_missing_column_fails_cleanly() {
    let env = CliTestEnv::new();
    let db = env.db_path("reports.db");
    seed_reports_db(&db);

    let args = [
        "schema",
        "drop-column",
        "--db",
        db.to_str().unwrap(),
        "--table",
        "daily_reports",
        "--column",
        "margin",
    ];
    let output = run_cli(&env, &args);
    assert!(!output.status.success(), "missing column must exit non-zero");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "stderr was: {stderr}");

    // The table is untouched
    let conn = rusqlite::Connection::open(&db).unwrap();
    let columns: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('daily_reports')",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(columns, 4);
}

#[test]
fn inspect_shows_tables_and_counts() {
    let env = CliTestEnv::new();
    let db = env.db_path("reports.db");
    seed_reports_db(&db);

    let args = ["inspect", "--db", db.to_str().unwrap()];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Number of tables: 1"));
    assert!(stdout.contains("Table: daily_reports"));
    assert!(stdout.contains("Number of rows: 1"));
}

#[test]
fn fleet_checkpoint_sweeps_tree_and_exits_zero() {
    let env = CliTestEnv::new();
    seed_reports_db(&env.db_path("a.sqlite"));
    seed_reports_db(&env.db_path("b.db"));
    fs::write(env.db_path("notes.txt"), "not a database").unwrap();

    let root = env.work.to_str().unwrap().to_string();
    let args = ["fleet", "checkpoint", "--root", root.as_str()];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Succeeded: 2"), "stdout was: {stdout}");
    assert!(stdout.contains("Failed:    0"));
    assert!(stdout.contains("Skipped:   1"));
}

#[test]
fn fleet_checkpoint_reports_json() {
    let env = CliTestEnv::new();
    seed_reports_db(&env.db_path("a.db"));
    fs::write(env.db_path("broken.db"), "garbage").unwrap();

    let root = env.work.to_str().unwrap().to_string();
    let args = [
        "fleet",
        "checkpoint",
        "--root",
        root.as_str(),
        "--format",
        "json",
    ];
    let output = run_cli(&env, &args);
    // Individual file failures still mean the sweep completed
    assert_success(&args, &output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let summary: serde_json::Value =
        serde_json::from_str(&stdout).expect("summary should be valid JSON");
    assert_eq!(summary["succeeded"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["results"].as_array().unwrap().len(), 2);
}

#[test]
fn fleet_checkpoint_missing_root_fails() {
    let env = CliTestEnv::new();
    let missing = env.work.join("nowhere");

    let args = [
        "fleet",
        "checkpoint",
        "--root",
        missing.to_str().unwrap(),
    ];
    let output = run_cli(&env, &args);
    assert!(
        !output.status.success(),
        "an unreadable root must exit non-zero"
    );
}

#[test]
fn row_add_and_update() {
    let env = CliTestEnv::new();
    let db = env.db_path("reports.db");
    seed_reports_db(&db);
    let db_arg = db.to_str().unwrap();

    let args = [
        "row", "add", "--db", db_arg, "--table", "daily_reports", "--date", "2024-12-09",
        "--account", "simonegrup", "--set", "equity=1595.0",
    ];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("New row created successfully!"));
    assert!(stdout.contains("equity: 1595"));
    assert!(stdout.contains("deposit: 0"));

    let args = [
        "row", "update", "--db", db_arg, "--table", "daily_reports", "--date", "2024-12-09",
        "--account", "simonegrup", "--set", "equity=1600.5",
    ];
    let output = run_cli(&env, &args);
    assert_success(&args, &output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Before Update:"));
    assert!(stdout.contains("After Update:"));
    assert!(stdout.contains("equity: 1600.5"));

    // Adding the same key twice is refused
    let args = [
        "row", "add", "--db", db_arg, "--table", "daily_reports", "--date", "2024-12-09",
        "--account", "simonegrup",
    ];
    let output = run_cli(&env, &args);
    assert!(!output.status.success(), "duplicate key must exit non-zero");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("already exists"), "stderr was: {stderr}");
}
