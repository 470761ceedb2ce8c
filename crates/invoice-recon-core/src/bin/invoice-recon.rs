use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use invoice_recon_core::{
    BatchReconciliationExport, Database, LogFormat, LoggingConfig, ProcessedInvoice, RawInvoice,
    ReconConfig, ReconEngine, ReconciliationExport, RecordOutcome, Severity,
};

#[derive(Debug, Parser)]
#[command(
    name = "invoice-recon",
    about = "Reconcile vendor invoices against historical pricing",
    long_about = "Compare extracted invoices against per-vendor price history, validate math, \
                  observe tax and shipping, and produce an approve/flag decision with \
                  clarifying questions. Exits with status 2 when any invoice is flagged.",
    after_help = "Examples:\n  invoice-recon process invoices/*.json --db data/history.sqlite\n  \
                  invoice-recon process inv.json --json --no-record\n  invoice-recon stats --db data/history.sqlite"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Process extracted invoice JSON files and print decisions")]
    Process {
        /// Invoice JSON files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Learning store database (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,

        #[arg(long, help = "Do not record approved invoices to the learning store")]
        no_record: bool,

        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Show learning store statistics")]
    Stats {
        /// Learning store database (overrides config)
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&Path>, db: Option<PathBuf>) -> Result<ReconConfig> {
    let mut config = match path {
        Some(path) => ReconConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReconConfig::default(),
    };
    if db.is_some() {
        config.store_path = db;
    }
    Ok(config)
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            files,
            db,
            no_record,
            json,
        } => {
            let config = load_config(cli.config.as_deref(), db)?;
            init_logging(&config.logging);
            process(&config, &files, !no_record, json)
        }
        Command::Stats { db } => {
            let config = load_config(cli.config.as_deref(), db)?;
            init_logging(&config.logging);
            stats(&config)
        }
    }
}

fn process(config: &ReconConfig, files: &[PathBuf], record: bool, json: bool) -> Result<ExitCode> {
    let engine = ReconEngine::from_config(config)?;
    let mut exports = Vec::with_capacity(files.len());

    for path in files {
        let invoice = read_invoice(path)?;
        let (processed, outcome) = engine
            .reconcile(&invoice, record)
            .with_context(|| format!("processing {}", path.display()))?;

        if !json {
            print_decision(&processed, outcome);
        }
        exports.push(ReconciliationExport::from_processed(&invoice, &processed));
    }

    let batch = BatchReconciliationExport::new(exports);
    if json {
        println!("{}", batch.to_json()?);
    } else {
        println!(
            "{} invoice(s): {} approved, {} flagged",
            batch.invoices.len(),
            batch.approved,
            batch.flagged
        );
    }

    Ok(if batch.flagged > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn read_invoice(path: &Path) -> Result<RawInvoice> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading invoice {}", path.display()))?;
    RawInvoice::from_json(&text).with_context(|| format!("parsing invoice {}", path.display()))
}

fn print_decision(processed: &ProcessedInvoice, outcome: Option<RecordOutcome>) {
    let decision = &processed.decision;
    let vendor = &processed.vendor_match;

    let severity = match decision.severity() {
        Some(Severity::Soft) => " [soft]",
        Some(Severity::Hard) => " [hard]",
        None => "",
    };
    println!(
        "{}  {}{}  ({}, {})",
        processed.invoice_number,
        decision.status(),
        severity,
        vendor.canonical_name.as_deref().unwrap_or("unknown vendor"),
        vendor.match_type
    );
    for line in &processed.comparisons {
        println!("  [{}] {}: {}", line.status, line.canonical_item, line.note);
    }
    if !decision.reason_codes().is_empty() {
        println!("  reasons: {}", decision.reason_strings().join(", "));
    }
    for observation in decision.observations() {
        println!("  - {}", observation);
    }
    for (i, question) in decision.clarifying_questions().iter().enumerate() {
        println!("  Q{}: {}", i + 1, question);
    }
    if let Some(outcome) = outcome {
        println!("  learning store: {}", outcome.as_str());
    }
    println!();
}

fn stats(config: &ReconConfig) -> Result<ExitCode> {
    let path = config
        .store_path
        .as_ref()
        .context("no learning store configured (use --db or store_path)")?;
    let db = Database::open(path).with_context(|| format!("opening {}", path.display()))?;
    let stats = db.stats()?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(ExitCode::SUCCESS)
}
