use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use tickscan::{parse_filters, Bar, ColumnarReader, ColumnarRecord, QuoteTick, ReaderConfig};

/// Inspect and decode columnar market-data files
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the schema, metadata and row groups of a file
    Inspect {
        file: PathBuf,
    },
    /// Decode records and print them one per line
    Dump {
        file: PathBuf,
        /// Record type stored in the file
        #[arg(short, long, value_enum, default_value_t = Kind::Quotes)]
        kind: Kind,
        /// Filter text, e.g. "bid_price > 1.5 AND ts_event BETWEEN 0 AND 100"
        #[arg(short, long)]
        filter: Option<String>,
        /// Print at most this many records
        #[arg(short, long)]
        limit: Option<usize>,
        /// Decode row groups on a single thread
        #[arg(long)]
        sequential: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Quotes,
    Bars,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> tickscan::Result<()> {
    match command {
        Command::Inspect { file } => {
            let summary = ColumnarReader::default().inspect(&file)?;
            println!("{summary}");
            Ok(())
        }
        Command::Dump {
            file,
            kind,
            filter,
            limit,
            sequential,
        } => {
            let filters = parse_filters(filter.as_deref().unwrap_or(""))?;
            let reader = ColumnarReader::new(ReaderConfig::new().with_parallel(!sequential))?;
            match kind {
                Kind::Quotes => dump::<QuoteTick>(&reader, &file, &filters, limit),
                Kind::Bars => dump::<Bar>(&reader, &file, &filters, limit),
            }
        }
    }
}

fn dump<R: ColumnarRecord + std::fmt::Display>(
    reader: &ColumnarReader,
    file: &Path,
    filters: &[tickscan::FilterExpr],
    limit: Option<usize>,
) -> tickscan::Result<()> {
    let start = Instant::now();
    let records: Vec<R> = reader.decode(file, filters)?;
    let elapsed = start.elapsed();

    for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
        println!("{record}");
    }
    eprintln!("{} {} records in {elapsed:?}", records.len(), R::NAME);
    Ok(())
}
