//! Command-line client for neatly notes.
//!
//! # Responsibility
//! - Wire config, logging, session and store selection for one invocation.
//! - Run one note/tag command and print a plain-text summary.
//!
//! # Invariants
//! - Mutating commands settle their dispatch before the process exits.
//! - Any failed operation yields a non-zero exit code.

use clap::{Parser, Subcommand};
use log::info;
use neatly_core::{
    init_logging, init_stderr_logging, AccountClient, ClientConfig, DispatchHandle,
    HttpRemoteStore, Note, NoteMutationCoordinator, RemoteStore, Session, SqliteRemoteStore, Tag,
};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const ENV_TOKEN: &str = "NEATLY_TOKEN";
const LOCAL_SESSION_TOKEN: &str = "local";

type CliResult<T> = Result<T, Box<dyn Error>>;

/// Client for the neatly note service
#[derive(Parser)]
#[command(name = "neatly")]
#[command(version)]
#[command(about = "Create, edit and tag notes against a neatly store")]
struct Cli {
    /// TOML config file; NEATLY_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bearer token (default: $NEATLY_TOKEN)
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the client version
    Version,
    /// Create an account
    Register {
        name: String,
        username: String,
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and print the session token
    Login {
        username: String,
        #[arg(long)]
        password: String,
    },
    /// List notes, optionally only those matching every --tag term
    Notes {
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List all tags
    Tags,
    /// Show one note
    Show { id: i64 },
    /// Create a note with tags (existing labels are reused)
    Create {
        header: String,
        #[arg(long, default_value = "")]
        body: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Edit a note; --tag replaces the whole tag set when given
    Edit {
        id: i64,
        #[arg(long)]
        header: Option<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
        /// Remove every tag from the note
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
    },
    /// Delete a note and detach its tags
    Delete { id: i64 },
    /// Rename a tag everywhere it is used
    RenameTag { id: i64, label: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when a dispatched operation failed.
async fn run(cli: Cli) -> CliResult<bool> {
    if let Commands::Version = cli.command {
        println!("neatly {}", neatly_core::core_version());
        return Ok(true);
    }

    let config = load_config(cli.config.as_ref())?;
    match config.log_dir.as_ref() {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy())?,
        None => init_stderr_logging(&config.log_level)?,
    }

    match cli.command {
        Commands::Register {
            name,
            username,
            email,
            password,
        } => {
            AccountClient::from_config(&config)?
                .register(&name, &username, &email, &password)
                .await?;
            println!("registered {username}");
            return Ok(true);
        }
        Commands::Login { username, password } => {
            let session = AccountClient::from_config(&config)?
                .login(&username, &password)
                .await?;
            println!("{}", session.token());
            return Ok(true);
        }
        _ => {}
    }

    let coordinator = NoteMutationCoordinator::new(
        open_store(&config)?,
        resolve_session(cli.token, &config)?,
    );

    match cli.command {
        Commands::Notes { tags } => {
            for note in coordinator.list_notes(&tags).await? {
                print_note_line(&note);
            }
            Ok(true)
        }
        Commands::Tags => {
            for tag in coordinator.list_tags().await? {
                println!("{}\t{}", tag.id, tag.label);
            }
            Ok(true)
        }
        Commands::Show { id } => {
            let note = coordinator.get_note(id).await?;
            print_note_line(&note);
            println!();
            println!("{}", note.body);
            Ok(true)
        }
        Commands::Create { header, body, tags } => {
            let tags = resolve_tags(&coordinator, &tags).await?;
            Ok(settle(coordinator.create_note(header, body, tags)).await)
        }
        Commands::Edit {
            id,
            header,
            body,
            tags,
            clear_tags,
        } => {
            let note = coordinator.get_note(id).await?;
            let desired = match (tags, clear_tags) {
                (_, true) => Vec::new(),
                (Some(labels), false) => resolve_tags(&coordinator, &labels).await?,
                (None, false) => note.tags.clone(),
            };
            let handle = coordinator.update_note(
                id,
                &note.tags,
                header.unwrap_or(note.header),
                body.unwrap_or(note.body),
                &desired,
            );
            Ok(settle(handle).await)
        }
        Commands::Delete { id } => {
            let note = coordinator.get_note(id).await?;
            Ok(settle(coordinator.delete_note(id, &note.tags)).await)
        }
        Commands::RenameTag { id, label } => Ok(settle(coordinator.rename_tag(id, label)).await),
        Commands::Version | Commands::Register { .. } | Commands::Login { .. } => Ok(true),
    }
}

fn load_config(path: Option<&PathBuf>) -> CliResult<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    Ok(config.apply_env()?)
}

fn open_store(config: &ClientConfig) -> CliResult<Arc<dyn RemoteStore>> {
    match config.local_db.as_ref() {
        Some(path) => {
            info!("event=store_select module=cli status=ok store=sqlite");
            Ok(Arc::new(SqliteRemoteStore::open(path)?))
        }
        None => {
            info!("event=store_select module=cli status=ok store=http");
            Ok(Arc::new(HttpRemoteStore::from_config(config)?))
        }
    }
}

fn resolve_session(token: Option<String>, config: &ClientConfig) -> CliResult<Session> {
    let token = token.or_else(|| std::env::var(ENV_TOKEN).ok());
    match token {
        Some(token) => Ok(Session::from_token(token)),
        None if config.local_db.is_some() => Ok(Session::from_token(LOCAL_SESSION_TOKEN)),
        None => Err(format!("no session token; run `neatly login` and set {ENV_TOKEN}").into()),
    }
}

/// Maps labels onto known tags; unknown labels become new tags.
async fn resolve_tags(
    coordinator: &NoteMutationCoordinator,
    labels: &[String],
) -> CliResult<Vec<Tag>> {
    let known = coordinator.list_tags().await?;
    Ok(labels
        .iter()
        .map(|label| {
            known
                .iter()
                .find(|tag| tag.label == *label)
                .cloned()
                .unwrap_or_else(|| Tag::ephemeral(label.as_str()))
        })
        .collect())
}

/// Waits for a flow, prints its summary and returns whether it was clean.
async fn settle(handle: DispatchHandle) -> bool {
    info!(
        "event=flow_settle module=cli status=start flow={}",
        handle.flow().name()
    );
    let report = handle.settle().await;
    if let Some(note_id) = report.created_note_id() {
        println!("created note {note_id}");
    }
    for tag_id in report.created_tag_ids() {
        println!("created tag {tag_id}");
    }
    for failure in report.failures() {
        if let Err(err) = &failure.result {
            eprintln!("failed: {} ({err})", failure.operation);
        }
    }
    println!(
        "{}: {} operations, {} failed",
        report.flow.name(),
        report.outcomes.len(),
        report.failures().count()
    );
    report.is_clean()
}

fn print_note_line(note: &Note) {
    let labels: Vec<&str> = note.tags.iter().map(|tag| tag.label.as_str()).collect();
    println!(
        "{}\t{}\t[{}]",
        note.id.unwrap_or_default(),
        note.header,
        labels.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
