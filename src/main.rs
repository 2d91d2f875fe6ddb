//! cspscope CLI: list DDF policy settings and their current local MDM values.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use cspscope::catalog::{CatalogFilter, PolicyCatalog};
use cspscope::config::ProbeConfig;
use cspscope::ingest::SchemaIngestion;
use cspscope::paths::ProbePaths;

#[derive(Parser)]
#[command(
    name = "cspscope",
    version,
    about = "Inspect configuration service provider policies via the local MDM channel"
)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/cspscope/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load DDF schemas and query every readable setting.
    Query {
        /// Local DDF file; repeat for several. Without files the published
        /// package is downloaded.
        #[arg(long = "file")]
        files: Vec<PathBuf>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Parse DDF files and list their settings without querying.
    Parse {
        /// DDF file to parse; repeat for several.
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Show or create the config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct ViewArgs {
    /// Only show settings matching this keyword (case-insensitive).
    #[arg(long)]
    search: Option<String>,

    /// Only show settings with an applied value.
    #[arg(long)]
    applied_only: bool,

    /// Write the shown settings to this JSON file (or directory).
    #[arg(long)]
    export: Option<PathBuf>,
}

impl ViewArgs {
    fn filter(&self) -> CatalogFilter {
        CatalogFilter {
            keyword: self.search.clone(),
            only_applied: self.applied_only,
        }
    }
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = ProbePaths::resolve()?;
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let config = ProbeConfig::load_or_default(&config_path)?;

    match cli.command {
        Commands::Query { files, view } => {
            let mut catalog = PolicyCatalog::new();
            query(&config, files, &mut catalog)?;
            present(&catalog, &view, &config, &paths)?;
        }

        Commands::Parse { files, view } => {
            // Unreadable files are logged and skipped.
            let outcome = SchemaIngestion::from_config(&config).load_from_local_files(&files);
            let mut catalog = PolicyCatalog::new();
            catalog.replace(outcome.source, outcome.entries);
            present(&catalog, &view, &config, &paths)?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let text = toml::to_string_pretty(&config).into_diagnostic()?;
                println!("# {}", config_path.display());
                print!("{text}");
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    miette::bail!(
                        help = "Pass --force to overwrite it.",
                        "config file already exists: {}",
                        config_path.display()
                    );
                }
                ProbeConfig::default().save(&config_path)?;
                println!("Wrote {}", config_path.display());
            }
        },
    }

    Ok(())
}

#[cfg(windows)]
fn query(config: &ProbeConfig, files: Vec<PathBuf>, catalog: &mut PolicyCatalog) -> Result<()> {
    use cspscope::gate::{EmbeddedModeGate, MachineKey, RegistryFlagStore, WmiHardwareId};
    use cspscope::mdm::NativeChannel;
    use cspscope::orchestrator::QueryOrchestrator;

    let gate = EmbeddedModeGate::new(RegistryFlagStore, MachineKey::new(WmiHardwareId));
    let orchestrator = QueryOrchestrator::new(
        SchemaIngestion::from_config(config),
        gate,
        NativeChannel::new(),
    )
    .with_progress_interval(config.progress_interval);

    let worker = orchestrator
        .spawn(files, |p| {
            eprint!("\rQuerying {}/{} ({}%)", p.processed, p.total, p.percent());
            if p.processed == p.total {
                eprintln!();
            }
        })
        .into_diagnostic()?;
    let (_orchestrator, report) = worker.join()?;

    let s = report.summary;
    println!(
        "Source: {}. Queried {}: {} applied, {} not found, {} failed, {} skipped.",
        report.source, s.queried, s.applied, s.not_found, s.failed, s.skipped
    );
    catalog.replace(report.source, report.entries);
    Ok(())
}

#[cfg(not(windows))]
fn query(_config: &ProbeConfig, _files: Vec<PathBuf>, _catalog: &mut PolicyCatalog) -> Result<()> {
    miette::bail!(
        help = "Use `cspscope parse --file <DDF>` to inspect schemas on this platform.",
        "querying the local MDM channel is only supported on Windows"
    )
}

/// Print the filtered catalog and optionally export it.
fn present(
    catalog: &PolicyCatalog,
    view: &ViewArgs,
    config: &ProbeConfig,
    paths: &ProbePaths,
) -> Result<()> {
    let filter = view.filter();
    let shown = catalog.search(&filter);

    if shown.is_empty() {
        println!("No settings match.");
    } else {
        println!("Settings ({} of {}):", shown.len(), catalog.len());
        for entry in &shown {
            let value = entry.current_value.as_deref().unwrap_or("-");
            println!("  {} = {}", entry.path, value);
            println!(
                "      format={} access=[{}]{}",
                entry.format,
                entry.access_types,
                if entry.allowed_values.is_empty() {
                    String::new()
                } else {
                    format!(" allowed={}", entry.allowed_values)
                }
            );
        }
    }

    let target = view
        .export
        .clone()
        .or_else(|| config.export_dir.clone());
    if let Some(target) = target {
        let file = paths.export_target(&target)?;
        let written = catalog.export_json(&file, &filter)?;
        println!("Exported {written} settings to {}", file.display());
    }
    Ok(())
}
