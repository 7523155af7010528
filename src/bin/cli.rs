//! csvblend CLI
//!
//! Merges CSV files and writes the deduplicated result to stdout.

use std::io;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use csvblend::{Config, CsvSource, Durability, MergeEngine, RecordSource};
use tracing_subscriber::{fmt, EnvFilter};

/// csvblend
#[derive(Parser, Debug)]
#[command(name = "csvblend")]
#[command(about = "Merge CSV files into one deduplicated CSV keyed by index columns")]
#[command(version)]
struct Args {
    /// Index (key) columns, comma-separated
    #[arg(short, long, value_delimiter = ',', required = true)]
    index: Vec<String>,

    /// Columns to keep, comma-separated (default: header of the first file)
    #[arg(short, long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Merge database path (":memory:" for in-memory; default: temporary file)
    #[arg(short, long)]
    database: Option<String>,

    /// Merge database durability
    #[arg(long, value_enum, default_value_t = DurabilityArg::Off)]
    durability: DurabilityArg,

    /// CSV files, merged in order (later files win)
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DurabilityArg {
    Off,
    Normal,
    Full,
}

impl From<DurabilityArg> for Durability {
    fn from(arg: DurabilityArg) -> Self {
        match arg {
            DurabilityArg::Off => Durability::Off,
            DurabilityArg::Normal => Durability::Normal,
            DurabilityArg::Full => Durability::Full,
        }
    }
}

fn main() {
    // Initialize tracing/logging (stderr, stdout carries the merged CSV)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,csvblend=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("csvblend v{}", csvblend::VERSION);

    if let Err(e) = run(args) {
        tracing::error!("Merge failed: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> csvblend::Result<()> {
    let columns = match args.columns {
        Some(columns) => columns,
        None => CsvSource::from_path(&args.files[0])?.field_names()?,
    };

    let mut builder = Config::builder().durability(args.durability.into());
    if let Some(database) = args.database {
        builder = builder.location(database);
    }
    let config = builder.build();

    MergeEngine::scoped(columns.clone(), args.index, config, |engine| {
        for file in &args.files {
            let outcome = engine.merge_path(file)?;
            tracing::info!(
                file = %file.display(),
                affected = outcome.affected,
                rowcount = outcome.rowcount,
                "Merged file in {:.05}s",
                outcome.elapsed.as_secs_f64()
            );
        }
        tracing::info!(
            affected_count = engine.affected_count(),
            rowcount = engine.rowcount(),
            merge_count = engine.merge_count(),
            "All files merged"
        );

        let mut writer = csv::Writer::from_writer(io::stdout().lock());
        writer.write_record(&columns)?;
        for row in engine.rows()? {
            writer.write_record(&row?)?;
        }
        writer.flush()?;
        Ok(())
    })
}
