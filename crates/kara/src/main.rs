// SPDX-FileCopyrightText: 2026 Kara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kara - an email assistant for a clothing store.
//!
//! This is the binary entry point: the polling service and the operator
//! commands around it.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod chat;
mod commands;
mod serve;
mod wiring;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use kara_config::model::KaraConfig;
use kara_core::{KaraError, TaskStatus};

/// Kara - answers store inquiries arriving by email.
#[derive(Parser, Debug)]
#[command(name = "kara", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of the standard configuration hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the mailbox periodically until SIGINT/SIGTERM.
    Serve,
    /// Run a single polling pass and exit.
    Poll,
    /// Regenerate and resend the reply for one task.
    Reprocess {
        task_id: i64,
    },
    /// List tasks in the ledger, newest first.
    Tasks {
        /// Only tasks in this status (pending, processing, reprocessing, done, failed, dead_letter).
        #[arg(long, value_parser = commands::parse_status)]
        status: Option<TaskStatus>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Rank catalog products against a query.
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Classify the intent of a query.
    Intent {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Show the preferences inferred for a session (a sender address or chat id).
    Preferences {
        session: String,
        #[arg(long)]
        json: bool,
    },
    /// Recommend products from a session's preferences.
    Recommend {
        session: String,
        #[arg(long, default_value_t = 3)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Ask a question under a chat session; without a question, start a REPL.
    Chat {
        session: String,
        question: Option<String>,
    },
    /// Manage the product catalog.
    Catalog {
        #[command(subcommand)]
        action: CatalogCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommands {
    /// Import products from a JSON array.
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => kara_config::load_and_validate_path(path),
        None => kara_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            kara_config::render_errors(&errors);
            std::process::exit(2);
        }
    };

    init_tracing(&config.agent.log_level);

    if let Err(e) = dispatch(cli.command, config).await {
        eprintln!("{}: {e}", "error".red());
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands, config: KaraConfig) -> Result<(), KaraError> {
    match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Poll => serve::run_poll(config).await,
        Commands::Reprocess { task_id } => commands::run_reprocess(&config, task_id).await,
        Commands::Tasks {
            status,
            limit,
            json,
        } => commands::run_tasks(&config, status, limit, json).await,
        Commands::Search { query, limit, json } => {
            commands::run_search(&config, &query, limit, json).await
        }
        Commands::Intent { query, json } => commands::run_intent(&query, json),
        Commands::Preferences { session, json } => {
            commands::run_preferences(&config, &session, json).await
        }
        Commands::Recommend {
            session,
            limit,
            json,
        } => commands::run_recommend(&config, &session, limit, json).await,
        Commands::Chat { session, question } => {
            chat::run_chat(&config, &session, question.as_deref()).await
        }
        Commands::Catalog {
            action: CatalogCommands::Import { file },
        } => commands::run_catalog_import(&config, &file).await,
    }
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over `agent.log_level`.
///
/// Logs go to stderr so command output on stdout stays pipeable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kara={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_tasks_filter() {
        let cli = Cli::try_parse_from(["kara", "tasks", "--status", "dead_letter", "--limit", "5"])
            .unwrap();
        match cli.command {
            Commands::Tasks { status, limit, json } => {
                assert_eq!(status, Some(TaskStatus::DeadLetter));
                assert_eq!(limit, 5);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_status() {
        assert!(Cli::try_parse_from(["kara", "tasks", "--status", "archived"]).is_err());
    }

    #[test]
    fn chat_question_is_optional() {
        let cli = Cli::try_parse_from(["kara", "chat", "web-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Chat { question: None, .. }
        ));
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["kara", "poll", "--config", "/tmp/kara.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/kara.toml")));
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = kara_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.agent.name, "Kara");
    }
}
