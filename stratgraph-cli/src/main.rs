//! Stratgraph CLI: validate, explain, and produce strategy graphs as JSON.
//!
//! Commands:
//! - `validate`: check one or more definitions, optionally writing a CSV report
//! - `explain`: print the plain-English summary of a definition
//! - `template`: list starter templates or emit one
//! - `wizard`: build a definition from a JSON answers file
//! - `export` / `import`: wrap or unwrap the portable export document
//! - `arrange`: tidy connections and lay blocks out in columns
//! - `fingerprint`: print the content hash of a definition

mod report;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use rayon::prelude::*;
use stratgraph_core::canvas::{auto_arrange, tidy_connections, to_canvas, to_definition_with_meta};
use stratgraph_core::explain::{describe_block, explain};
use stratgraph_core::export::{export_json, import_json, ExportDocument, StrategyInfo};
use stratgraph_core::graph::StrategyDefinition;
use stratgraph_core::templates::{build_from_wizard, StrategyTemplate, WizardAnswers};
use stratgraph_core::validate::validate;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use report::{validation_csv, FileReport};

#[derive(Parser)]
#[command(
    name = "stratgraph",
    about = "Stratgraph CLI: visual trading-strategy graphs"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate definitions. Exits non-zero if any is invalid.
    Validate {
        /// Definition or export-document JSON files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also write a CSV report (one row per error).
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Print the plain-English explanation of a definition.
    Explain {
        file: PathBuf,

        /// Also print a one-line summary per block.
        #[arg(long, default_value_t = false)]
        blocks: bool,
    },
    /// List starter templates, or emit one by name.
    Template {
        /// golden_cross, rsi_mean_reversion, macd_momentum, bollinger_breakout.
        name: Option<String>,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build a definition from a JSON answers file.
    Wizard {
        answers: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Wrap a definition in a portable export document.
    Export {
        file: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        asset: String,

        #[arg(long, default_value = "")]
        timeframe: String,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Extract the definition from an export document.
    Import {
        file: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Drop duplicate connections and arrange blocks in columns.
    Arrange {
        file: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the content hash used to detect unsaved changes.
    Fingerprint { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Validate { files, csv } => run_validate(&files, csv.as_deref()),
        Commands::Explain { file, blocks } => run_explain(&file, blocks),
        Commands::Template { name, out } => run_template(name.as_deref(), out.as_deref()),
        Commands::Wizard { answers, out } => run_wizard(&answers, out.as_deref()),
        Commands::Export {
            file,
            name,
            asset,
            timeframe,
            out,
        } => run_export(
            &file,
            StrategyInfo {
                name,
                asset,
                timeframe,
            },
            out.as_deref(),
        ),
        Commands::Import { file, out } => run_import(&file, out.as_deref()),
        Commands::Arrange { file, out } => run_arrange(&file, out.as_deref()),
        Commands::Fingerprint { file } => {
            let definition = load_definition(&file)?;
            println!("{}", definition.fingerprint());
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

// ─── I/O helpers ────────────────────────────────────────────────────

/// Read a definition, accepting either a bare definition or an export document.
fn load_definition(path: &Path) -> Result<StrategyDefinition> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    if value.get("schema_version").is_some() {
        debug!(path = %path.display(), "reading export document");
        let document = import_json(&text)
            .with_context(|| format!("failed to import {}", path.display()))?;
        return Ok(document.definition);
    }
    serde_json::from_value(value)
        .with_context(|| format!("{} is not a strategy definition", path.display()))
}

fn write_output(out: Option<&Path>, contents: &str) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = contents.len(), "wrote output");
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn write_definition(out: Option<&Path>, definition: &StrategyDefinition) -> Result<()> {
    let json = serde_json::to_string_pretty(definition)?;
    write_output(out, &json)
}

// ─── Commands ───────────────────────────────────────────────────────

fn run_validate(files: &[PathBuf], csv_path: Option<&Path>) -> Result<()> {
    let reports: Vec<FileReport> = files
        .par_iter()
        .map(|path| {
            let definition = load_definition(path)?;
            Ok::<_, anyhow::Error>(FileReport {
                path: path.clone(),
                report: validate(&definition),
            })
        })
        .collect::<Result<_>>()?;

    let mut invalid = 0;
    for r in &reports {
        if r.report.is_valid() {
            println!("{}: valid", r.path.display());
            continue;
        }
        invalid += 1;
        println!("{}: invalid ({} errors)", r.path.display(), r.report.errors.len());
        for e in &r.report.errors {
            let at = e
                .block_id
                .as_ref()
                .map(|id| format!(" [{id}]"))
                .unwrap_or_default();
            println!("  {}{at}: {}", e.code.as_str(), e.display_message());
        }
    }

    if let Some(path) = csv_path {
        let csv = validation_csv(&reports)?;
        std::fs::write(path, csv).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }

    if invalid > 0 {
        eprintln!("{invalid} of {} definitions invalid", reports.len());
        std::process::exit(1);
    }
    Ok(())
}

fn run_explain(file: &Path, blocks: bool) -> Result<()> {
    let definition = load_definition(file)?;
    let explanation = explain(&definition);

    println!("{}", explanation.entry);
    if !explanation.exit.is_empty() {
        println!("{}", explanation.exit);
    }
    if let Some(risk) = &explanation.risk {
        println!("{risk}");
    }

    if blocks {
        println!();
        for block in &definition.blocks {
            let summary = describe_block(&definition, &block.id).unwrap_or_default();
            println!("{:<16} {:<14} {summary}", block.id.as_str(), block.type_name());
        }
    }
    Ok(())
}

fn run_template(name: Option<&str>, out: Option<&Path>) -> Result<()> {
    let Some(name) = name else {
        for template in StrategyTemplate::ALL {
            println!("{:<20} {}", template.name(), template.description());
        }
        return Ok(());
    };
    let Some(template) = StrategyTemplate::from_name(name) else {
        let valid: Vec<&str> = StrategyTemplate::ALL.iter().map(|t| t.name()).collect();
        bail!("unknown template '{name}'. Valid: {}", valid.join(", "));
    };
    write_definition(out, &template.build())
}

fn run_wizard(answers_path: &Path, out: Option<&Path>) -> Result<()> {
    let text = std::fs::read_to_string(answers_path)
        .with_context(|| format!("failed to read {}", answers_path.display()))?;
    let answers: WizardAnswers = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid answers file", answers_path.display()))?;
    let definition = build_from_wizard(&answers);

    let report = validate(&definition);
    if !report.is_valid() {
        let codes: Vec<&str> = report.errors.iter().map(|e| e.code.as_str()).collect();
        bail!("answers produce an invalid strategy: {}", codes.join(", "));
    }
    write_definition(out, &definition)
}

fn run_export(file: &Path, strategy: StrategyInfo, out: Option<&Path>) -> Result<()> {
    if strategy.name.trim().is_empty() {
        bail!("--name must not be empty");
    }
    let definition = load_definition(file)?;
    let document = ExportDocument::new(strategy, definition);
    write_output(out, &export_json(&document)?)
}

fn run_import(file: &Path, out: Option<&Path>) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let document =
        import_json(&text).with_context(|| format!("failed to import {}", file.display()))?;
    info!(
        name = %document.strategy.name,
        exported_at = %document.exported_at,
        "imported strategy"
    );
    write_definition(out, &document.definition)
}

fn run_arrange(file: &Path, out: Option<&Path>) -> Result<()> {
    let definition = load_definition(file)?;
    let (nodes, edges) = to_canvas(&definition);
    let edges = tidy_connections(&edges);
    let nodes = auto_arrange(&nodes, &edges);
    let arranged = to_definition_with_meta(&nodes, &edges, definition.meta);
    debug!(
        before = definition.connections.len(),
        after = arranged.connections.len(),
        "tidied connections"
    );
    write_definition(out, &arranged)
}
