use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use tracing::info;

mod aggregate;
mod config;
mod console;
mod dashboard;
mod db;
mod error;
mod filter;
mod logging;
mod models;
mod predicate;
mod report;
mod session;
mod store;
mod view;

use config::{DataSource, FilterArgs, SourceArgs};
use models::Dimension;
use session::{cache, Session};

#[derive(Parser)]
#[command(name = "callcenter-dashboard")]
#[command(about = "Filterable call-center metrics over a loaded dataset", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the selectable values and ranges of every filter
    Options {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the headline metrics for a filter
    Summary {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Write a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the dashboard payload as JSON for a charting front end
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// Defaults to stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Interactive filtering session on stdin
    Console {
        #[command(flatten)]
        source: SourceArgs,
    },
}

async fn open_session(source: &SourceArgs) -> anyhow::Result<Session> {
    let source = DataSource::from_args(source)?;
    Ok(Session::new(cache::get_or_load(&source).await?))
}

async fn filtered_session(source: &SourceArgs, filters: &FilterArgs) -> anyhow::Result<Session> {
    let overrides = filters.overrides()?;
    let mut session = open_session(source).await?;
    session.apply(&overrides);
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Options { source } => {
            let session = open_session(&source).await?;
            let store = session.store();
            if store.is_empty() {
                println!("The dataset has no call records.");
                return Ok(());
            }
            for dimension in Dimension::ALL {
                println!("{dimension}: {}", store.distinct_values(dimension).join(", "));
            }
            match store.rating_range() {
                Some(bounds) => println!("SatisfactionRating: {} - {}", bounds.low, bounds.high),
                None => println!("SatisfactionRating: no ratings"),
            }
            if let Some(bounds) = store.date_range() {
                println!("Date: {} - {}", bounds.low, bounds.high);
            }
        }
        Commands::Summary { source, filters } => {
            let session = filtered_session(&source, &filters).await?;
            print!("{}", report::headline(&session.snapshot()));
        }
        Commands::Report {
            source,
            filters,
            out,
        } => {
            let session = filtered_session(&source, &filters).await?;
            let report = report::build_report(&session.snapshot(), session.filter());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            source,
            filters,
            out,
        } => {
            let session = filtered_session(&source, &filters).await?;
            let payload = serde_json::to_string_pretty(&session.snapshot())?;
            match out {
                Some(path) => {
                    std::fs::write(&path, payload)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "dashboard payload written");
                }
                None => println!("{payload}"),
            }
        }
        Commands::Console { source } => {
            let source = DataSource::from_args(&source)?;
            let mut session = Session::new(cache::get_or_load(&source).await?);
            info!(session = %session.id(), "console session started, type `help` for commands");
            let reload = || {
                tokio::task::block_in_place(|| Handle::current().block_on(cache::reload(&source)))
            };
            let stdin = std::io::stdin();
            console::run(&mut session, stdin.lock(), std::io::stdout(), reload)?;
        }
    }

    Ok(())
}
