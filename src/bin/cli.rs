//! TeamCache Manager CLI
//!
//! A thin `clap`-derived binary exercising the [`Engine`] directly
//! in-process, modeled on the teacher's `core-new/src/bin/cli.rs` +
//! per-domain subcommand modules (`infrastructure/cli/domains/job.rs`).

use clap::{Parser, Subcommand};
use comfy_table::Table;
use std::path::PathBuf;
use teamcache_manager::config::EngineConfig;
use teamcache_manager::infrastructure::jobs::ProfileRef;
use teamcache_manager::Engine;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "teamcache-manager")]
#[command(about = "Profile-driven cache-warming job engine")]
struct Cli {
    /// Directory holding `teamcache.toml` and other engine state.
    #[arg(long, env = "TEAMCACHE_DATA_DIR")]
    data_dir: PathBuf,

    /// Postgres connection string for the catalog store.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Indexer operations.
    Index {
        #[command(subcommand)]
        command: IndexCommand,
    },
    /// Cache-warm job operations.
    Job {
        #[command(subcommand)]
        command: JobCommand,
    },
    /// Directory cache-status operations.
    Dir {
        #[command(subcommand)]
        command: DirCommand,
    },
}

#[derive(Subcommand)]
enum IndexCommand {
    /// Start indexing `root` (mount-relative path).
    Start { root: PathBuf },
    /// Stop the running index session.
    Stop,
    /// Show the current or most recent index session.
    Status,
}

#[derive(Subcommand)]
enum JobCommand {
    /// Create a cache-warm job from files and/or directories.
    Create {
        /// Individual file paths to warm.
        #[arg(long)]
        file: Vec<String>,
        /// Directory paths to expand into files.
        #[arg(long)]
        dir: Vec<String>,
        /// Explicit profile name; omit to auto-select.
        #[arg(long)]
        profile: Option<String>,
    },
    /// Pause a running job.
    Pause { id: Uuid },
    /// Cancel a job.
    Cancel { id: Uuid },
    /// List recent jobs.
    List {
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },
    /// Delete completed, failed, and cancelled jobs.
    Clear,
}

#[derive(Subcommand)]
enum DirCommand {
    /// Validate (and, if changed, update) a directory's cache status.
    Validate { path: String },
    /// Report a directory's recursive size.
    Size { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load(&cli.data_dir)?;
    let engine = Engine::connect(config, &cli.database_url).await?;

    match cli.command {
        Command::Index { command } => run_index_command(&engine, command).await?,
        Command::Job { command } => run_job_command(&engine, command).await?,
        Command::Dir { command } => run_dir_command(&engine, command).await?,
    }

    Ok(())
}

async fn run_index_command(engine: &Engine, command: IndexCommand) -> anyhow::Result<()> {
    match command {
        IndexCommand::Start { root } => {
            let session_id = engine.start_index(root).await?;
            println!("started index session {session_id}");
        }
        IndexCommand::Stop => {
            engine.stop_index().await?;
            println!("stop requested");
        }
        IndexCommand::Status => match engine.index_status().await? {
            Some(session) => {
                println!(
                    "session {} [{}] {}/{} files, root {}",
                    session.id, session.status, session.processed_files, session.total_files, session.root_path
                );
            }
            None => println!("no index session has run"),
        },
    }
    Ok(())
}

async fn run_job_command(engine: &Engine, command: JobCommand) -> anyhow::Result<()> {
    match command {
        JobCommand::Create { file, dir, profile } => {
            let profile_ref = match profile {
                Some(name) => ProfileRef::Name(name),
                None => ProfileRef::Auto,
            };
            let job = engine.create_cache_job(file, dir, profile_ref).await?;
            println!("created job {} ({} files)", job.id, job.total_files);
        }
        JobCommand::Pause { id } => {
            let job = engine.pause_job(id).await?;
            println!("job {} is now {}", job.id, job.status);
        }
        JobCommand::Cancel { id } => {
            let job = engine.cancel_job(id).await?;
            println!("job {} is now {}", job.id, job.status);
        }
        JobCommand::List { limit } => {
            let jobs = engine.list_jobs(limit).await?;
            if jobs.is_empty() {
                println!("no jobs found");
            } else {
                let mut table = Table::new();
                table.set_header(vec!["ID", "Status", "Completed", "Failed", "Total", "Created"]);
                for job in jobs {
                    table.add_row(vec![
                        job.id.to_string(),
                        job.status,
                        job.completed_files.to_string(),
                        job.failed_files.to_string(),
                        job.total_files.to_string(),
                        job.created_at.to_rfc3339(),
                    ]);
                }
                println!("{table}");
            }
        }
        JobCommand::Clear => {
            let cleared = engine.clear_completed_jobs().await?;
            println!("cleared {cleared} jobs");
        }
    }
    Ok(())
}

async fn run_dir_command(engine: &Engine, command: DirCommand) -> anyhow::Result<()> {
    match command {
        DirCommand::Validate { path } => {
            let (stats, updated) = engine.validate_directory_cache(&path).await?;
            println!(
                "{path}: {}/{} files cached, {}/{} subdirs cached, should_be_cached={}, updated={updated}",
                stats.cached_files, stats.total_files, stats.cached_subdirs, stats.subdirs, stats.should_be_cached
            );
        }
        DirCommand::Size { path } => {
            let stats = engine.directory_size(&path).await?;
            println!(
                "{path}: {} bytes across {} files, {} directories",
                stats.total_bytes, stats.file_count, stats.dir_count
            );
        }
    }
    Ok(())
}
