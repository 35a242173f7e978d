//! sqlkeeper - SQLite maintenance CLI for trading report databases
//!
//! Subcommands cover transactional column removal, catalog listing, fleet-wide
//! WAL checkpointing, and row edits keyed by (date, account_name).
//!
//! Uses XDG Base Directory specification for file locations:
//! - Logs: $XDG_STATE_HOME/sqlkeeper/sqlkeeper.log (~/.local/state/sqlkeeper/sqlkeeper.log)
//! - Config: $XDG_CONFIG_HOME/sqlkeeper/config.toml (~/.config/sqlkeeper/config.toml)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use sqlkeeper_core::db::{catalog, open_connection, rows, schema, RowValues};
use sqlkeeper_core::fleet::{Checkpointer, MaintenanceOutcome, SweepSummary};
use sqlkeeper_core::Config;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

#[derive(Parser)]
#[command(name = "sqlkeeper")]
#[command(about = "Maintenance toolkit for trading report databases")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Schema operations on one database file
    Schema {
        #[command(subcommand)]
        command: SchemaCommand,
    },
    /// Fleet-wide maintenance across a directory tree
    Fleet {
        #[command(subcommand)]
        command: FleetCommand,
    },
    /// Row edits keyed by (date, account_name)
    Row {
        #[command(subcommand)]
        command: RowCommand,
    },
    /// Show every table with its columns and row count
    Inspect {
        /// Path to the database file
        #[arg(long)]
        db: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum SchemaCommand {
    /// Remove a column from a table (transactional table rebuild)
    DropColumn {
        /// Path to the database file
        #[arg(long)]
        db: PathBuf,

        /// Table name
        #[arg(long)]
        table: String,

        /// Column to remove
        #[arg(long)]
        column: String,
    },
    /// List all tables in the database
    ListTables {
        /// Path to the database file
        #[arg(long)]
        db: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List all columns in the specified table
    ListColumns {
        /// Path to the database file
        #[arg(long)]
        db: PathBuf,

        /// Table name
        #[arg(long)]
        table: String,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum FleetCommand {
    /// Checkpoint the write-ahead log of every database file under a root
    Checkpoint {
        /// Root directory to sweep
        #[arg(long)]
        root: PathBuf,

        /// Recognized database file extension, repeatable (overrides config)
        #[arg(long = "ext")]
        extensions: Vec<String>,

        /// Number of parallel workers (overrides config)
        #[arg(long)]
        jobs: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Subcommand)]
enum RowCommand {
    /// Insert a new row, defaulting unspecified numeric columns to 0.0
    Add {
        /// Path to the database file
        #[arg(long)]
        db: PathBuf,

        /// Table name
        #[arg(long)]
        table: String,

        /// Date key (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Account name key
        #[arg(long)]
        account: String,

        /// Column value as column=number, repeatable
        #[arg(long = "set", value_parser = parse_assignment)]
        set: Vec<(String, f64)>,
    },
    /// Update columns of an existing row
    Update {
        /// Path to the database file
        #[arg(long)]
        db: PathBuf,

        /// Table name
        #[arg(long)]
        table: String,

        /// Date key (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Account name key
        #[arg(long)]
        account: String,

        /// Column value as column=number, repeatable
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        set: Vec<(String, f64)>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Parse a `column=value` assignment for --set.
fn parse_assignment(s: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected column=value, got '{}'", s))?;
    if name.is_empty() {
        return Err(format!("missing column name in '{}'", s));
    }
    let value: f64 = value
        .parse()
        .map_err(|e| format!("invalid number in '{}': {}", s, e))?;
    Ok((name.to_string(), value))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("failed to load configuration")?;
    let _log_guard = sqlkeeper_core::logging::init(&config.logging).ok();

    match cli.command {
        Command::Schema { command } => match command {
            SchemaCommand::DropColumn { db, table, column } => {
                cmd_drop_column(&db, &table, &column)
            }
            SchemaCommand::ListTables { db, format } => cmd_list_tables(&db, format),
            SchemaCommand::ListColumns { db, table, format } => {
                cmd_list_columns(&db, &table, format)
            }
        },
        Command::Fleet { command } => match command {
            FleetCommand::Checkpoint {
                root,
                extensions,
                jobs,
                format,
            } => cmd_fleet_checkpoint(&config, &root, extensions, jobs, format),
        },
        Command::Row { command } => match command {
            RowCommand::Add {
                db,
                table,
                date,
                account,
                set,
            } => cmd_row_add(&db, &table, &date, &account, &set),
            RowCommand::Update {
                db,
                table,
                date,
                account,
                set,
            } => cmd_row_update(&db, &table, &date, &account, &set),
        },
        Command::Inspect { db, format } => cmd_inspect(&db, format),
    }
}

fn cmd_drop_column(db: &PathBuf, table: &str, column: &str) -> Result<()> {
    schema::drop_column(db, table, column).with_context(|| {
        format!(
            "failed to remove column '{}' from table '{}' in {}",
            column,
            table,
            db.display()
        )
    })?;

    println!(
        "Removed column '{}' from table '{}' in {}.",
        column,
        table,
        db.display()
    );
    Ok(())
}

fn cmd_list_tables(db: &PathBuf, format: OutputFormat) -> Result<()> {
    let conn = open_connection(db)
        .with_context(|| format!("failed to open database {}", db.display()))?;
    let tables = catalog::list_tables(&conn).context("failed to read catalog")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tables)?),
        OutputFormat::Text => {
            println!("Available tables:");
            for table in &tables {
                println!("- {}", table);
            }
        }
    }
    Ok(())
}

fn cmd_list_columns(db: &PathBuf, table: &str, format: OutputFormat) -> Result<()> {
    let conn = open_connection(db)
        .with_context(|| format!("failed to open database {}", db.display()))?;
    let columns = catalog::table_columns(&conn, table)
        .with_context(|| format!("failed to read columns of '{}'", table))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&columns)?),
        OutputFormat::Text => {
            println!("Columns in table '{}':", table);
            for column in &columns {
                println!("- {} ({})", column.name, column.decl_type);
            }
        }
    }
    Ok(())
}

fn cmd_inspect(db: &PathBuf, format: OutputFormat) -> Result<()> {
    let tables =
        catalog::inspect(db).with_context(|| format!("failed to inspect {}", db.display()))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tables)?),
        OutputFormat::Text => {
            println!("Database: {}", db.display());
            println!("Number of tables: {}", tables.len());
            for table in &tables {
                println!("\nTable: {}", table.name);
                println!("Columns:");
                for column in &table.columns {
                    println!("  - {} ({})", column.name, column.decl_type);
                }
                println!("Number of rows: {}", table.row_count);
            }
        }
    }
    Ok(())
}

fn cmd_fleet_checkpoint(
    config: &Config,
    root: &PathBuf,
    extensions: Vec<String>,
    jobs: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let mut fleet = config.fleet.clone();
    if !extensions.is_empty() {
        // Accept both "db" and ".db" on the command line
        fleet.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .collect();
    }
    if let Some(jobs) = jobs {
        fleet.jobs = jobs;
    }
    fleet.validate().context("invalid fleet options")?;

    let sweep = Checkpointer::new(&fleet);

    // Ctrl+C stops the sweep after the file currently being checkpointed
    let cancel = sweep.cancel_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current file...");
        cancel.store(true, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let show_bar = format == OutputFormat::Text;
    let pb = if show_bar {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let summary = sweep
        .sweep_with_progress(root, |done, total, path| {
            if let Some(pb) = &pb {
                pb.set_length(total as u64);
                pb.set_position(done as u64);
                pb.set_message(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("...")
                        .to_string(),
                );
            }
        })
        .with_context(|| format!("failed to sweep {}", root.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    print_sweep_summary(&summary, format)?;

    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "fleet checkpoint complete"
    );

    // Individual file failures are part of a completed sweep; only a failure
    // to traverse the root exits non-zero.
    Ok(())
}

fn print_sweep_summary(summary: &SweepSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Text => {
            println!("\nCheckpoint summary:");
            println!("  Succeeded: {}", summary.succeeded);
            println!("  Failed:    {}", summary.failed);
            println!("  Skipped:   {}", summary.skipped);

            if summary.failed > 0 {
                println!("\nFailures:");
                for result in &summary.results {
                    if let MaintenanceOutcome::Failure { error } = &result.outcome {
                        println!("  {}: {}", result.path.display(), error);
                    }
                }
            }
        }
    }
    Ok(())
}

fn cmd_row_add(
    db: &PathBuf,
    table: &str,
    date: &str,
    account: &str,
    set: &[(String, f64)],
) -> Result<()> {
    let row = rows::add_row(db, table, date, account, set).with_context(|| {
        format!(
            "failed to add row for date {}, account {} to '{}'",
            date, account, table
        )
    })?;

    println!("New row created successfully!");
    print_row("Newly Created Row:", &row);
    Ok(())
}

fn cmd_row_update(
    db: &PathBuf,
    table: &str,
    date: &str,
    account: &str,
    set: &[(String, f64)],
) -> Result<()> {
    let edit = rows::update_row(db, table, date, account, set).with_context(|| {
        format!(
            "failed to update row for date {}, account {} in '{}'",
            date, account, table
        )
    })?;

    print_row("Before Update:", &edit.before);
    print_row("After Update:", &edit.after);
    println!("\nUpdate successful!");
    Ok(())
}

fn print_row(heading: &str, row: &RowValues) {
    println!("\n{}", heading);
    for (name, value) in row {
        println!("{}: {}", name, value);
    }
}
