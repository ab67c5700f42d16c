//! cellgraph CLI - spreadsheet dependency and impact analysis

use anyhow::{Context, Result};
use cellgraph::prelude::*;
use cellgraph::QueryData;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cellgraph")]
#[command(
    author,
    version,
    about = "Dependency and impact analysis for multi-sheet spreadsheets"
)]
struct Cli {
    /// Document to load: a directory of CSV sheets or a JSON file
    document: PathBuf,

    /// How to read the document (default: csv for directories, json otherwise)
    #[arg(short, long, value_enum)]
    source: Option<SourceKind>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log more (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceKind {
    Csv,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show cell, sheet, formula and edge counts
    Summary,

    /// List sheets in document order
    Sheets,

    /// List every cell that has a formula
    Formulas,

    /// Show every cell affected by a change to CELL
    #[command(alias = "dependents")]
    Impact {
        /// Cell reference, e.g. B2 or Sales!E2
        cell: String,
    },

    /// Show every cell CELL reads from
    #[command(alias = "dependencies")]
    Deps {
        /// Cell reference, e.g. B2 or Sales!E2
        cell: String,
    },

    /// List a sheet's cells or search all cells
    Find {
        /// List the cells of this sheet
        #[arg(short, long)]
        sheet: Option<String>,

        /// Search keyword: date, financial, formula
        criteria: Option<String>,
    },

    /// Write a cell back to the document; values starting with = are formulas
    Set {
        cell: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Answer a free-text question
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Execute a JSON command descriptor
    Query {
        /// e.g. {"command": "impact_analysis", "target_cell": "A1"}
        json: String,
    },

    /// Interactive prompt
    Shell {
        /// Reload the graph in the background when the document changes
        #[arg(long)]
        live_sync: bool,

        /// Seconds between background checks
        #[arg(long, default_value = "30")]
        interval: u64,
    },
}

type Service = GraphService<Box<dyn SnapshotSource>>;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let service = open(&cli.document, cli.source)?;
    let format = cli.format;

    let outcome = match cli.command {
        Commands::Summary => return print_summary(&service, format).map(|_| ExitCode::SUCCESS),
        Commands::Sheets => service.execute(&CommandDescriptor::new(Command::ListSheets)),
        Commands::Formulas => service.execute(&CommandDescriptor::new(Command::ListFormulas)),
        Commands::Impact { cell } => {
            service.execute(&CommandDescriptor::new(Command::ImpactAnalysis).with_target(cell))
        }
        Commands::Deps { cell } => {
            service.execute(&CommandDescriptor::new(Command::DependencyAnalysis).with_target(cell))
        }
        Commands::Find { sheet, criteria } => {
            service.find_cells(sheet.as_deref(), criteria.as_deref().unwrap_or_default())
        }
        Commands::Set { cell, value } => service.execute(
            &CommandDescriptor::new(Command::UpdateCell)
                .with_target(cell)
                .with_value(value),
        ),
        Commands::Ask { question } => {
            let (descriptor, outcome) = service.ask(&RuleBasedTranslator, &question.join(" "));
            if let Some(description) = &descriptor.description {
                tracing::info!(command = ?descriptor.command, "{description}");
            }
            outcome
        }
        Commands::Query { json } => service.execute_json(&json),
        Commands::Shell {
            live_sync,
            interval,
        } => {
            return shell(service, format, live_sync, Duration::from_secs(interval.max(1)))
                .map(|_| ExitCode::SUCCESS)
        }
    };

    print_outcome(&outcome, format)?;
    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open(document: &Path, kind: Option<SourceKind>) -> Result<Service> {
    let kind = kind.unwrap_or(if document.is_dir() {
        SourceKind::Csv
    } else {
        SourceKind::Json
    });
    let source: Box<dyn SnapshotSource> = match kind {
        SourceKind::Csv => Box::new(CsvDirectorySource::new()),
        SourceKind::Json => Box::new(JsonFileSource::new().pretty(true)),
    };

    let id = document
        .to_str()
        .with_context(|| format!("Document path '{}' is not valid UTF-8", document.display()))?;
    GraphService::open(source, id).with_context(|| format!("Failed to load '{}'", document.display()))
}

fn print_summary(service: &Service, format: OutputFormat) -> Result<()> {
    let summary = service.summary();
    match format {
        OutputFormat::Text => println!("{summary}"),
        OutputFormat::Json => print_json(&summary)?,
    }
    Ok(())
}

fn print_outcome(outcome: &QueryOutcome, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(outcome),
        OutputFormat::Text if outcome.success => {
            println!("{}", outcome.message.trim_end());
            // searches only report a count in the message
            if let Some(QueryData::Cells(cells)) = &outcome.data {
                if !outcome.message.contains('\n') {
                    for cell in cells {
                        println!("  {}: {}", cell.id(), cell.formula().unwrap_or(cell.value()));
                    }
                }
            }
            Ok(())
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", outcome.message);
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

const SHELL_HELP: &str = "\
Commands:
  impact <cell>          cells affected by a change to <cell>
  deps <cell>            cells that <cell> reads from
  ask <question>         answer a free-text question
  find [criteria]        search cells (date, financial, formula)
  set <cell> <value>     write a cell and reload
  formulas               list formula cells
  sheets                 list sheets
  summary                show graph counts
  reload                 reload the document now
  help                   show this help
  quit                   leave the shell";

fn shell(service: Service, format: OutputFormat, live_sync: bool, interval: Duration) -> Result<()> {
    let service = Arc::new(service);

    let _refresh = if live_sync {
        let options = RefreshOptions {
            interval,
            ..Default::default()
        };
        let handle = Refresher::new(Arc::clone(&service), options)
            .on_reload(|summary| eprintln!("\n[live sync] reloaded: {summary}"))
            .start()
            .context("Failed to start live sync")?;
        eprintln!("Live sync on, checking every {}s", interval.as_secs());
        Some(handle)
    } else {
        None
    };

    println!("{}", service.summary());
    println!("Type 'help' for commands.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("cellgraph> ");
        io::stdout().flush().context("Failed to write to stdout")?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read from stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let outcome = match word.to_ascii_lowercase().as_str() {
            "quit" | "exit" => break,
            "help" => {
                println!("{SHELL_HELP}");
                continue;
            }
            "summary" => {
                print_summary(&service, format)?;
                continue;
            }
            "reload" => {
                match service.reload() {
                    Ok(summary) => println!("{summary}"),
                    Err(e) => eprintln!("Error: {e}"),
                }
                continue;
            }
            "impact" if !rest.is_empty() => {
                service.execute(&CommandDescriptor::new(Command::ImpactAnalysis).with_target(rest))
            }
            "deps" if !rest.is_empty() => {
                service.execute(&CommandDescriptor::new(Command::DependencyAnalysis).with_target(rest))
            }
            "ask" if !rest.is_empty() => service.ask(&RuleBasedTranslator, rest).1,
            "find" => service.find_cells(None, rest),
            "set" => match rest.split_once(char::is_whitespace) {
                Some((cell, value)) => service.execute(
                    &CommandDescriptor::new(Command::UpdateCell)
                        .with_target(cell)
                        .with_value(value.trim()),
                ),
                None => QueryOutcome::failure("Usage: set <cell> <value>"),
            },
            "formulas" => service.execute(&CommandDescriptor::new(Command::ListFormulas)),
            "sheets" => service.execute(&CommandDescriptor::new(Command::ListSheets)),
            "impact" | "deps" | "ask" => QueryOutcome::failure(format!("Usage: {word} <argument>")),
            // anything else is treated as a question
            _ => service.ask(&RuleBasedTranslator, line).1,
        };

        print_outcome(&outcome, format)?;
    }

    Ok(())
}
