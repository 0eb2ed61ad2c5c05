use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use layouts_service::common::config::{Config, config_file};
use layouts_service::common::log;
use layouts_service::host::FixtureHost;
use layouts_service::model::Desktop;
use layouts_service::workspace::{SnapshotBuilder, Workspace, regroup_workspace};
use serde_json::json;
use tracing::debug;

#[derive(Parser)]
#[command(name = "layouts", about = "Capture and restore window layouts")]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the configuration file for problems.
    Validate,
    /// Check that a saved workspace can be restored by this version.
    Check { file: PathBuf },
    /// Capture the workspace of a host fixture and print it.
    Snapshot {
        fixture: PathBuf,
        /// Also ask connected clients for their custom data.
        #[arg(long)]
        generate: bool,
    },
    /// Regroup a host fixture from a saved workspace and print the resulting
    /// snap groups.
    Restore { fixture: PathBuf, file: PathBuf },
}

fn main() {
    let opt = Cli::parse();
    log::init_logging();

    if let Err(e) = run(opt) {
        eprintln!("layouts: {e:#}");
        process::exit(1);
    }
}

fn run(opt: Cli) -> anyhow::Result<()> {
    let config_path = opt.config.unwrap_or_else(config_file);
    debug!(path = %config_path.display(), "loading config");
    let config = Config::read_or_default(&config_path)?;

    match opt.command {
        Commands::Validate => {
            let issues = config.validate();
            if !issues.is_empty() {
                for issue in &issues {
                    eprintln!("{issue}");
                }
                bail!("{} config issue(s) in {}", issues.len(), config_path.display());
            }
            println!("Config validation passed");
        }
        Commands::Check { file } => {
            let workspace = read_workspace(&file)?;
            let version = workspace.check_compatible()?;
            println!(
                "{}: schema {version}, {} apps, {} tab groups",
                file.display(),
                workspace.apps.len(),
                workspace.tab_groups.len()
            );
        }
        Commands::Snapshot { fixture, generate } => {
            let host = FixtureHost::read(&fixture)?;
            let workspace = block_on(async {
                let desktop = Desktop::new(config);
                host.populate(&desktop).await;
                let builder = SnapshotBuilder::new(&desktop, &host, &host, &host);
                if generate {
                    builder.generate_workspace().await
                } else {
                    builder.get_current_workspace().await
                }
            })?;
            println!("{}", workspace.to_json_pretty()?);
        }
        Commands::Restore { fixture, file } => {
            let workspace = read_workspace(&file)?;
            let host = FixtureHost::read(&fixture)?;
            let (report, groups) = block_on(async {
                let desktop = Desktop::new(config);
                host.populate(&desktop).await;
                let report = regroup_workspace(&desktop, &workspace).await?;
                anyhow::Ok((report, desktop.snap_groups()))
            })??;
            let output = json!({
                "tabGroups": report.tab_groups,
                "merges": report.merges,
                "skipped": report.skipped,
                "snapGroups": groups,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn read_workspace(path: &Path) -> anyhow::Result<Workspace> {
    let buf = std::fs::read_to_string(path)
        .with_context(|| format!("reading workspace {}", path.display()))?;
    Workspace::from_json(&buf).with_context(|| format!("parsing workspace {}", path.display()))
}

fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("starting runtime")?;
    Ok(runtime.block_on(future))
}
