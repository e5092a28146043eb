//! ifmigrate - runs the SNMP interface consolidation pass against a
//! monitoring database.
//!
//! The report goes to stdout (text or JSON); logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use ifmigrate_core::{
    dry_run, open_database, run_consolidation, ConsolidationConfig, ConsolidationReport,
    MatchPolicy, MigrateError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "ifmigrate")]
#[command(about = "Move per-item SNMP settings onto shared interfaces")]
struct Args {
    /// SQLite database to migrate
    #[arg(long)]
    db: PathBuf,

    /// JSON file with consolidation settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the attribute comparison (strict or legacy)
    #[arg(long)]
    match_policy: Option<String>,

    /// Plan only, write nothing
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn consolidation_config(&self) -> Result<ConsolidationConfig> {
        let mut config = match &self.config {
            Some(path) => ConsolidationConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ConsolidationConfig::default(),
        };
        if let Some(policy) = &self.match_policy {
            config.match_policy = policy.parse::<MatchPolicy>()?;
        }
        Ok(config)
    }
}

fn render_text(report: &ConsolidationReport) -> String {
    let counts = &report.resolutions;
    let mut out = format!(
        "match policy:           {}\n\
         legacy configurations:  {}\n\
         representatives:        {}\n\
         reused representative:  {}\n\
         reused sibling:         {}\n\
         new interfaces:         {}\n\
         placeholder configs:    {}\n\
         planned configs:        {}\n",
        report.match_policy.as_str(),
        report.legacy_configurations,
        counts.representatives,
        counts.reused_existing,
        counts.reused_siblings,
        counts.created,
        report.orphan_defaults,
        report.planned_configs,
    );

    match &report.persisted {
        Some(stats) => out.push_str(&format!(
            "configs inserted:       {}\n\
             interfaces inserted:    {}\n\
             item update batches:    {}\n\
             items retagged:         {}\n",
            stats.configs_inserted,
            stats.interfaces_inserted,
            stats.item_updates.executions,
            stats.items_retagged,
        )),
        None => out.push_str("dry run: nothing written\n"),
    }
    out.push_str(&format!("elapsed:                {} ms\n", report.elapsed_ms));
    out
}

fn run(args: &Args) -> Result<ConsolidationReport> {
    let config = args.consolidation_config()?;
    info!("Opening {}", args.db.display());
    let conn = open_database(&args.db)?;

    let report = if args.dry_run {
        dry_run(&conn, &config)?
    } else {
        run_consolidation(&conn, &config)?
    };
    Ok(report)
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let report = match run(&args) {
        Ok(report) => report,
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<MigrateError>()
                .map(MigrateError::exit_code)
                .unwrap_or(1);
            return ExitCode::from(code as u8);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(err) => {
                error!("Failed to serialize report: {}", err);
                return ExitCode::FAILURE;
            }
        }
    } else {
        print!("{}", render_text(&report));
    }
    ExitCode::SUCCESS
}
