use anyhow::Context;
use clap::{Parser, ValueEnum};
use ipp_core::{ConfigLoader, DEFAULT_CONFIG_PATH, IPTABLES, ReconcileReport, Reconciler};
use ipp_iptables::ShellExecutor;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "iptables-persistent")]
#[command(version, about = "Apply or remove a persistent iptables ruleset", long_about = None)]
struct Cli {
    /// Apply the ruleset or tear it down
    #[arg(value_enum)]
    action: Action,

    /// Ruleset configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log mutating commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// iptables-compatible binary to invoke
    #[arg(long, default_value = IPTABLES)]
    iptables: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    Start,
    Stop,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    let cli = Cli::parse();

    if !cli.config.exists() {
        error!(
            "cannot access '{}': No such file or directory",
            cli.config.display()
        );
        std::process::exit(1);
    }

    let ruleset = ConfigLoader::new(&cli.config)
        .load()
        .with_context(|| format!("Failed to load ruleset from {:?}", cli.config))?;

    if ruleset.is_empty() {
        warn!("{} declares no usable table:chain sections", cli.config.display());
    }

    let executor = ShellExecutor::new(cli.dry_run).with_binary(cli.iptables);
    let reconciler = Reconciler::new(ruleset, executor);

    let report = match cli.action {
        Action::Start => reconciler.start(),
        Action::Stop => reconciler.stop(),
    };
    log_failures(&report);

    Ok(())
}

fn log_failures(report: &ReconcileReport) {
    for record in report.failures() {
        warn!("{} did not take effect", record.step);
    }
    if !report.has_failures() {
        info!("All steps converged");
    }
}
