/*============================================================
  Synavera Project: Tempyr
  Module: tempyr_core::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Entry point for the `tempyr` CLI. Lists installed mods,
    checks them against the public catalog, applies updates,
    and installs new mods from catalog page URLs.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTPS GET
    requests and writes only inside the mods directory and
    Tempyr's own config/data directories.

  Dependencies:
    clap for CLI parsing, chrono for timestamps, tokio for
    the runtime and Ctrl-C handling.

  Operational Scope:
    Invoked directly by operators or by wrapper scripts.

  Revision History:
    2026-10-19 COD  Authored Tempyr CLI runtime.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use tempyr_core::config::TempyrConfig;
use tempyr_core::error::{Result, TempyrError};
use tempyr_core::install_root;
use tempyr_core::library::ModLibrary;
use tempyr_core::logger::{session_log_path, Logger};
use tempyr_core::reconcile::{EntryEvent, PackageEntry, UpdateStatus};
use tempyr_core::report::{build_report, write_report, StatusReport};

/// Command-line arguments for Tempyr.
#[derive(Debug, Parser)]
#[command(
    name = "tempyr",
    version,
    author = "Synavera Systems",
    about = "Mod manager for Hytale"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Game install root for this run.
    #[arg(long, value_name = "PATH", global = true)]
    root: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH", global = true)]
    log: Option<PathBuf>,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List installed mods.
    List,
    /// Check installed mods for updates.
    Check {
        /// Limit the check to specific mods (file name, name, or slug).
        #[arg(long = "package", value_name = "ID", action = ArgAction::Append)]
        packages: Vec<String>,
        /// Do not write the status report; print a summary only.
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
        /// Override report output path.
        #[arg(long, value_name = "PATH")]
        report: Option<PathBuf>,
    },
    /// Check, then install every available update.
    Update {
        #[arg(long = "package", value_name = "ID", action = ArgAction::Append)]
        packages: Vec<String>,
    },
    /// Install the latest file of a mod from its catalog page URL.
    Install {
        #[arg(value_name = "URL")]
        url: String,
    },
    /// Show the resolved install root, or persist a new one.
    Root {
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[Tempyr] {}", err);
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let (mut config, config_problem) =
        match TempyrConfig::load_from_optional_path(cli.config.as_deref()) {
            Ok(config) => (config, None),
            Err(err) if cli.config.is_none() => (TempyrConfig::fresh()?, Some(err)),
            Err(err) => return Err(err),
        };

    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| session_log_path(&config.log_dir(), Utc::now()));
    let logger = Logger::new(Some(log_path), cli.verbose)?;
    logger.info("INIT", "Tempyr Core awakening.");
    if let Some(err) = config_problem {
        logger.warn("CONFIG", format!("{err}; continuing with defaults"));
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let outcome = execute(&cli, &mut config, &cancel, &logger).await;
    match &outcome {
        Ok(_) => logger.info("COMPLETE", "Session complete."),
        Err(err) if err.is_cancelled() => logger.warn("CANCEL", "Operation cancelled by operator"),
        Err(err) => logger.error("FAILED", err.to_string()),
    }
    logger.finalize()?;
    outcome
}

async fn execute(
    cli: &Cli,
    config: &mut TempyrConfig,
    cancel: &CancellationToken,
    logger: &Logger,
) -> Result<ExitCode> {
    if let Command::Root { path } = &cli.command {
        return root_command(cli, path.as_deref(), config, logger);
    }

    let root = install_root::resolve(cli.root.as_deref(), config.install_root())
        .ok_or(TempyrError::NoInstallRoot)?;
    logger.info("ROOT", format!("Install root: {}", root.display()));

    let mut library = ModLibrary::connect(root, &config.catalog)?;
    library.refresh(logger);

    match &cli.command {
        Command::List => {
            print_entries(library.entries());
        }
        Command::Check {
            packages,
            dry_run,
            report,
        } => {
            library.select(packages, logger);
            let summary = library.check_all(cancel, logger).await;
            ensure_not_cancelled(cancel)?;
            print_entries(library.entries());

            let document = build_report(library.install_root(), library.entries());
            if *dry_run {
                print_summary(&document);
            } else {
                let path = report.clone().unwrap_or_else(|| config.report_path());
                write_report(&document, &path)?;
                logger.info("REPORT", format!("Report written to {}", path.display()));
            }
            println!("→ {}", summary.message());
        }
        Command::Update { packages } => {
            library.select(packages, logger);
            library = library.with_listener(Arc::new(announce_status));
            library.check_all(cancel, logger).await;
            ensure_not_cancelled(cancel)?;
            let summary = library.update_all(cancel, logger).await;
            ensure_not_cancelled(cancel)?;
            println!("→ {}", summary.message());
            if summary.failed > 0 {
                return Ok(ExitCode::from(1));
            }
        }
        Command::Install { url } => {
            let path = library.install_from_url(url, cancel, logger).await?;
            println!("→ Installed {}", path.display());
        }
        Command::Root { .. } => {}
    }

    Ok(ExitCode::SUCCESS)
}

fn root_command(
    cli: &Cli,
    path: Option<&std::path::Path>,
    config: &mut TempyrConfig,
    logger: &Logger,
) -> Result<ExitCode> {
    match path {
        Some(path) => {
            if !install_root::is_valid_install(path) {
                return Err(TempyrError::Config(format!(
                    "{} is not an existing directory",
                    path.display()
                )));
            }
            config.set_install_root(path.to_path_buf());
            let saved = config.save()?;
            logger.info(
                "ROOT",
                format!("Install root set to {} ({})", path.display(), saved.display()),
            );
            println!("→ Install root set to {}", path.display());
        }
        None => {
            let root = install_root::resolve(cli.root.as_deref(), config.install_root())
                .ok_or(TempyrError::NoInstallRoot)?;
            println!("{}", root.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(TempyrError::Cancelled);
    }
    Ok(())
}

fn announce_status(event: EntryEvent<'_>) {
    if let EntryEvent::Status { id, status } = event {
        if matches!(
            status,
            UpdateStatus::Downloading | UpdateStatus::UpToDate | UpdateStatus::Error
        ) {
            println!("  {id}: {status}");
        }
    }
}

fn print_entries(entries: &[PackageEntry]) {
    if entries.is_empty() {
        println!("→ No mods installed.");
        return;
    }
    for entry in entries {
        let identity = entry.identity();
        let version = if identity.version.is_empty() {
            "-"
        } else {
            identity.version.as_str()
        };
        let mut line = format!(
            "{:<40} {:<14} {:<18}",
            identity.id,
            version,
            entry.status().to_string()
        );
        if entry.has_update() {
            line.push_str(&format!(" → {}", entry.latest_version()));
        }
        println!("{}", line.trim_end());
    }
}

fn print_summary(document: &StatusReport) {
    println!(
        "→ Report dry-run. Mods={} Updates={} UpToDate={} NoSource={} Errors={}",
        document.metadata.total_packages,
        document.metadata.updates_available,
        document.metadata.up_to_date,
        document.metadata.no_source,
        document.metadata.errors
    );
}
