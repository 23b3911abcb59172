//! `firststory` command line
//!
//! ## Usage
//!
//! ```bash
//! # Encode raw "<id>\t<text>" lines into word-ID records
//! firststory encode tweets.tsv -o tweets.enc
//!
//! # Run detection and print the largest threads of each set
//! firststory detect tweets.enc
//!
//! # Same, as JSON, with a config file
//! firststory --config run.toml detect tweets.enc --json
//! ```
//!
//! Configuration is read from `config.toml`, `config.local.toml` and
//! `FIRSTSTORY_*` environment variables unless `--config` names a file.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use firststory::config::LoggingConfig;
use firststory::encoder::{format_record, parse_raw_line, parse_record};
use firststory::{
    Config, DetectorError, EncodedItem, Encoder, SizeOrder, StreamingClusterer, ThreadSummary,
    TopKSelector, WordId,
};

static TRACE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "firststory", version, about = "Streaming first story detection")]
struct Cli {
    /// Configuration file (replaces config.toml lookup)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Turn raw `<id>\t<text>` lines into encoded records
    Encode {
        input: PathBuf,
        /// Output file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Cluster encoded records and report the largest threads
    Detect {
        input: PathBuf,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
        /// Override `selection.top_k`
        #[arg(long)]
        top_k: Option<usize>,
        /// Override `stream.chunk_size` (0 = one set)
        #[arg(long)]
        chunk_size: Option<usize>,
    },
}

/// Top threads of one set.
#[derive(Debug, Serialize)]
struct SetReport {
    set: usize,
    items: usize,
    threads: usize,
    top: Vec<ThreadSummary>,
}

#[derive(Debug, Serialize)]
struct Report {
    sets: Vec<SetReport>,
    leaderboard: Vec<ThreadSummary>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(&path.to_string_lossy())
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::load().context("loading config")?,
    };

    init_tracing(&config.logging)?;

    match cli.command {
        Command::Encode { input, output } => encode(&input, output.as_deref()),
        Command::Detect {
            input,
            json,
            top_k,
            chunk_size,
        } => {
            if let Some(k) = top_k {
                config.selection.top_k = k;
            }
            if let Some(size) = chunk_size {
                config.stream.chunk_size = size;
            }
            config.validate()?;

            let report = detect(&input, &config)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if json {
                serde_json::to_writer_pretty(&mut out, &report)?;
                writeln!(out)?;
            } else {
                print_report(&mut out, &report, config.stream.threads_shown)?;
            }
            Ok(())
        }
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("invalid log level '{}'", logging.level))?;

    let (writer, ansi) = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {path}"))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = TRACE_GUARD.set(guard);
            (BoxMakeWriter::new(non_blocking), false)
        }
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(ansi)
        .with_thread_names(true)
        .with_writer(writer);

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = if logging.format == "json" {
        Box::new(builder.json().finish())
    } else {
        Box::new(builder.compact().finish())
    };

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn encode(input: &Path, output: Option<&Path>) -> Result<()> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("opening {}", input.display()))?,
    );
    let mut out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut encoder = Encoder::new();
    let (mut written, mut skipped) = (0usize, 0usize);
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_number = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let (id, text) = match parse_raw_line(line_number, &line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "record_skipped");
                skipped += 1;
                continue;
            }
        };
        match encoder.encode(id, text) {
            Some(item) => {
                writeln!(out, "{}", format_record(&item))?;
                written += 1;
            }
            None => {
                tracing::debug!(item = id, "empty_item_skipped");
                skipped += 1;
            }
        }
    }
    out.flush()?;

    tracing::info!(
        items = written,
        skipped,
        vocabulary = encoder.vocabulary_size(),
        occurrences = encoder.word_sample().len(),
        "encode_completed"
    );
    Ok(())
}

fn detect(input: &Path, config: &Config) -> Result<Report> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("opening {}", input.display()))?,
    );

    let global = TopKSelector::global_from_config(&config.selection);
    let mut leaderboard: Vec<ThreadSummary> = Vec::new();
    let mut sets = Vec::new();
    let mut chunk: Vec<EncodedItem> = Vec::new();

    let mut flush = |chunk: &mut Vec<EncodedItem>, sets: &mut Vec<SetReport>| -> Result<()> {
        if chunk.is_empty() {
            return Ok(());
        }
        let report = run_set(sets.len(), chunk, config)?;
        leaderboard = global.select(
            std::mem::take(&mut leaderboard)
                .into_iter()
                .chain(report.top.iter().cloned()),
            SizeOrder::Largest,
        );
        sets.push(report);
        chunk.clear();
        Ok(())
    };

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_record(index + 1, &line) {
            Ok(Some(item)) => chunk.push(item),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "record_skipped"),
        }
        if config.stream.chunk_size > 0 && chunk.len() >= config.stream.chunk_size {
            flush(&mut chunk, &mut sets)?;
        }
    }
    flush(&mut chunk, &mut sets)?;

    Ok(Report { sets, leaderboard })
}

/// Every word occurrence in the set, repeats within an item included.
fn word_sample(items: &[EncodedItem]) -> Vec<WordId> {
    items
        .iter()
        .flat_map(|item| item.occurrences.iter().copied())
        .collect()
}

/// Cluster one set with a fresh detector built from the set's own words.
fn run_set(set: usize, items: &[EncodedItem], config: &Config) -> Result<SetReport> {
    let sample = word_sample(items);

    let mut clusterer = match StreamingClusterer::from_config(config, &sample) {
        Ok(clusterer) => clusterer,
        Err(e @ DetectorError::InsufficientVocabulary { .. }) => {
            tracing::warn!(set, items = items.len(), error = %e, "set_aborted");
            return Ok(SetReport {
                set,
                items: items.len(),
                threads: 0,
                top: Vec::new(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let interval = config.stream.progress_interval;
    let mut novel = 0usize;
    for (n, item) in items.iter().enumerate() {
        match clusterer.process(item.id, &item.words) {
            Ok(assignment) => {
                if assignment.is_novel() {
                    novel += 1;
                }
            }
            Err(e @ DetectorError::DuplicateItem(_)) => {
                tracing::warn!(set, error = %e, "record_skipped");
            }
            Err(e) => return Err(e.into()),
        }
        if interval > 0 && (n + 1) % interval == 0 {
            tracing::info!(
                set,
                processed = n + 1,
                threads = clusterer.store().len(),
                "set_progress"
            );
        }
    }

    let selector = TopKSelector::from_config(&config.selection);
    let top: Vec<ThreadSummary> = selector
        .select(clusterer.threads(), SizeOrder::Largest)
        .into_iter()
        .map(|thread| thread.summary())
        .collect();

    let stats = clusterer.index_stats();
    tracing::info!(
        set,
        items = items.len(),
        threads = clusterer.store().len(),
        novel,
        reported = top.len(),
        buckets = stats.buckets,
        largest_bucket = stats.largest_bucket,
        "set_completed"
    );

    Ok(SetReport {
        set,
        items: items.len(),
        threads: clusterer.store().len(),
        top,
    })
}

fn print_report(out: &mut impl Write, report: &Report, threads_shown: usize) -> io::Result<()> {
    for set in &report.sets {
        writeln!(
            out,
            "set {}: {} items, {} threads",
            set.set, set.items, set.threads
        )?;
        print_threads(out, &set.top, threads_shown)?;
        writeln!(out)?;
    }
    writeln!(out, "leaderboard:")?;
    print_threads(out, &report.leaderboard, threads_shown)
}

fn print_threads(
    out: &mut impl Write,
    threads: &[ThreadSummary],
    threads_shown: usize,
) -> io::Result<()> {
    for thread in threads {
        let shown: Vec<String> = thread
            .members
            .iter()
            .take(threads_shown)
            .map(ToString::to_string)
            .collect();
        writeln!(
            out,
            "  {}\tsize={}\tentropy={:.3}\t{}",
            thread.parent,
            thread.size,
            thread.entropy,
            shown.join(" ")
        )?;
    }
    Ok(())
}
