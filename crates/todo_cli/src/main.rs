//! Command-line front end over `todo_core`.
//!
//! # Responsibility
//! - Parse commands and configuration (flags with environment fallbacks).
//! - Print item snapshots as JSON and map service errors to exit codes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;
use std::process::ExitCode;
use todo_core::db::open_db;
use todo_core::{
    default_log_level, init_logging, ErrorKind, ItemId, ItemService, ItemServiceError,
    SqliteItemRepository, SystemClock, UuidV4Generator,
};

#[derive(Debug, Parser)]
#[command(name = "todo", version, about = "Record-keeping for to-do items")]
struct Cli {
    /// SQLite database file.
    #[arg(long, env = "TODO_DB_PATH", default_value = "todo.sqlite3")]
    db_path: PathBuf,

    /// Log level (trace|debug|info|warn|error). Only used with `--log-dir`.
    #[arg(long, env = "TODO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, env = "TODO_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a health check and the core version.
    Ping,
    /// Create an item due at an epoch-millisecond instant.
    Add {
        description: String,
        #[arg(allow_negative_numbers = true)]
        due_ms: i64,
    },
    /// Show one item.
    Get { id: ItemId },
    /// List items in creation order.
    List {
        /// Only items that are not done (past-due items included).
        #[arg(long)]
        open: bool,
    },
    /// Mark an item done, now or at `--at`.
    Done {
        id: ItemId,
        #[arg(long, allow_negative_numbers = true)]
        at: Option<i64>,
    },
    /// Clear an item's completion.
    Undone { id: ItemId },
    /// Replace an item's description.
    Rephrase { id: ItemId, description: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            exit_code_for(&err)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match (cli.log_dir.as_deref(), cli.log_level.as_deref()) {
        (Some(log_dir), level) => {
            init_logging(level.unwrap_or(default_log_level()), log_dir)
                .map_err(anyhow::Error::msg)?;
        }
        (None, Some(level)) => eprintln!("{}", unused_log_level_warning(level)),
        (None, None) => {}
    }

    if let Command::Ping = cli.command {
        println!("todo_core ping={}", todo_core::ping());
        println!("todo_core version={}", todo_core::core_version());
        return Ok(());
    }

    let conn = open_db(&cli.db_path)
        .with_context(|| format!("failed to open database `{}`", cli.db_path.display()))?;
    let repo = SqliteItemRepository::try_new(&conn)?;
    let service = ItemService::new(repo, SystemClock, UuidV4Generator);
    debug!("event=cli_command module=cli status=start command={:?}", cli.command);

    match cli.command {
        Command::Ping => {}
        Command::Add {
            description,
            due_ms,
        } => {
            let item = service.create_item(description, due_ms)?;
            print_snapshot(&service, item.uuid)?;
        }
        Command::Get { id } => print_snapshot(&service, id)?,
        Command::List { open } => {
            let snapshots = service.list_snapshots(open)?;
            println!("{}", serde_json::to_string_pretty(&snapshots)?);
        }
        Command::Done { id, at } => {
            service.mark_done(id, at)?;
            print_snapshot(&service, id)?;
        }
        Command::Undone { id } => {
            service.mark_undone(id)?;
            print_snapshot(&service, id)?;
        }
        Command::Rephrase { id, description } => {
            service.rephrase(id, description)?;
            print_snapshot(&service, id)?;
        }
    }

    Ok(())
}

fn print_snapshot(
    service: &ItemService<SqliteItemRepository<'_>, SystemClock, UuidV4Generator>,
    id: ItemId,
) -> Result<()> {
    let snapshot = service
        .get_snapshot(id)?
        .ok_or(ItemServiceError::NotFound(id))?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn unused_log_level_warning(level: &str) -> String {
    format!("warning: log level `{level}` ignored; set --log-dir or TODO_LOG_DIR to enable logging")
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<ItemServiceError>().map(ItemServiceError::kind) {
        Some(ErrorKind::InvalidArgument) => ExitCode::from(2),
        Some(ErrorKind::NotFound) => ExitCode::from(3),
        Some(ErrorKind::Conflict) => ExitCode::from(4),
        Some(ErrorKind::Storage) | None => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::{unused_log_level_warning, Cli, Command};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn done_accepts_optional_completion_time() {
        let cli = Cli::try_parse_from([
            "todo",
            "--db-path",
            "/tmp/x.sqlite3",
            "done",
            "00000000-0000-0000-0000-000000000001",
            "--at",
            "1700000000000",
        ])
        .unwrap();

        match cli.command {
            Command::Done { at, .. } => assert_eq!(at, Some(1_700_000_000_000)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_accepts_pre_epoch_due_instant() {
        let cli = Cli::try_parse_from(["todo", "--db-path", "/tmp/x.sqlite3", "add", "x", "-5"])
            .unwrap();

        match cli.command {
            Command::Add { description, due_ms } => {
                assert_eq!(description, "x");
                assert_eq!(due_ms, -5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn done_accepts_pre_epoch_completion_time() {
        let cli = Cli::try_parse_from([
            "todo",
            "done",
            "00000000-0000-0000-0000-000000000001",
            "--at",
            "-1000",
        ])
        .unwrap();

        match cli.command {
            Command::Done { at, .. } => assert_eq!(at, Some(-1_000)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn unused_log_level_warning_names_the_missing_setting() {
        let warning = unused_log_level_warning("debug");
        assert!(warning.contains("`debug`"));
        assert!(warning.contains("TODO_LOG_DIR"));
    }
}
