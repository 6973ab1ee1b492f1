//! tablog - ship JSON-lines log records into a typed table store
//!
//! The binary is a thin host around the tl-core engine:
//! - `ship`: decode records from stdin or a file and write them in batches
//! - `create-table`, `describe`, `dump`: manage the local Parquet store

use clap::{Args, Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tl_common::{Column, Event, StoreError, StructuredError, TableDescriber};
use tl_config::{load_sink_config, ConfigOptions, DEFAULT_RESOLVE_TIMEOUT_MS};
use tl_core::decode::EventReader;
use tl_core::exit_codes::ExitCode;
use tl_core::logging::{
    event_names, generate_run_id, init_logging, truncate_for_log, LogConfig, LogFormat, LogLevel,
};
use tl_core::store::ParquetTableStore;
use tl_core::writer::{BatchWriter, BatchWriterConfig, WriteError, WriteSummary};
use tracing::{info, warn};

/// tablog - adaptive batch writer for log records
#[derive(Parser)]
#[command(name = "tablog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read JSON-lines records and write them to the configured table
    Ship(ShipArgs),

    /// Create a table in the local store
    CreateTable(CreateTableArgs),

    /// Print the columns of a table
    Describe(TableArgs),

    /// Pretty-print every committed row of a table
    Dump(TableArgs),
}

#[derive(Args, Debug)]
struct ShipArgs {
    /// Sink configuration file (TOML or JSON)
    #[arg(long, env = "TABLOG_CONFIG")]
    config: Option<PathBuf>,

    /// Store root directory
    #[arg(long)]
    store: PathBuf,

    /// Read records from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Records per write call
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: u64,
}

#[derive(Args, Debug)]
struct CreateTableArgs {
    /// Store root directory
    #[arg(long)]
    store: PathBuf,

    /// Table path relative to the store root
    #[arg(long)]
    table: String,

    /// Columns as JSON: {"name": "Utf8?", ...}
    #[arg(long)]
    columns: String,
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Store root directory
    #[arg(long)]
    store: PathBuf,

    /// Table path relative to the store root
    #[arg(long)]
    table: String,
}

/// Summary printed to stdout by `ship`.
#[derive(Serialize, Debug, Default)]
struct ShipReport {
    run_id: String,
    table: String,
    batches: usize,
    records: usize,
    rows_committed: usize,
    chunks: usize,
    skipped_lines: usize,
    failed_batches: usize,
    rows_failed: usize,
}

impl ShipReport {
    fn absorb(&mut self, summary: &WriteSummary) {
        self.batches += 1;
        self.rows_committed += summary.rows;
        self.chunks += summary.chunks;
    }

    fn record_failure(&mut self, sent: usize, committed: usize) {
        self.batches += 1;
        self.failed_batches += 1;
        self.rows_committed += committed;
        self.rows_failed += sent - committed;
    }
}

#[derive(Serialize)]
struct ColumnReport<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_name: String,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Ship(args) => run_ship(&cli.global, &args),
        Commands::CreateTable(args) => run_create_table(&cli.global, &args),
        Commands::Describe(args) => run_describe(&cli.global, &args),
        Commands::Dump(args) => run_dump(&cli.global, &args),
    };

    exit_code.into()
}

fn init_cli_logging(global: &GlobalOpts, config_level: Option<LogLevel>) {
    let config = LogConfig::from_env(global.log_level.or(config_level), global.log_format);
    init_logging(&config);
}

/// Report an error on stderr and pick its exit code.
fn fail(global: &GlobalOpts, err: tl_common::Error) -> ExitCode {
    let code = ExitCode::for_error(&err);
    if global.log_format == Some(LogFormat::Jsonl) {
        let structured = StructuredError::from(&err).with_context("exit_code", code.code_name());
        eprintln!("{}", structured.to_json());
    } else {
        eprintln!("tablog: {}", err);
    }
    code
}

fn run_ship(global: &GlobalOpts, args: &ShipArgs) -> ExitCode {
    let loaded = match load_sink_config(&ConfigOptions {
        config_path: args.config.clone(),
    }) {
        Ok(loaded) => loaded,
        Err(err) => {
            init_cli_logging(global, None);
            warn!(target: event_names::CONFIG_ERROR, error = %err, "config error");
            return fail(global, err.into());
        }
    };

    let config_level = loaded
        .config
        .log_level
        .as_deref()
        .and_then(|level| level.parse::<LogLevel>().ok());
    init_cli_logging(global, config_level);

    let run_id = generate_run_id();
    info!(
        target: event_names::CONFIG_LOADED,
        path = %loaded.path.display(),
        source = ?loaded.source,
        table = %loaded.config.table_path,
        "config loaded"
    );

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(BufReader::new(file)),
            Err(err) => {
                return fail(
                    global,
                    tl_common::Error::Config(format!(
                        "cannot open input {}: {}",
                        path.display(),
                        err
                    )),
                )
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    let store = ParquetTableStore::new(&args.store);
    let writer = match BatchWriter::connect(store, BatchWriterConfig::from(&loaded.config)) {
        Ok(writer) => writer,
        Err(err) => return fail(global, err.into()),
    };

    info!(
        target: event_names::RUN_STARTED,
        run_id = %run_id,
        table = %loaded.config.table_path,
        batch_size = args.batch_size,
        "starting ship"
    );

    let mut report = ShipReport {
        run_id: run_id.clone(),
        table: loaded.config.table_path.clone(),
        ..ShipReport::default()
    };
    let batch_size = usize::try_from(args.batch_size).unwrap_or(usize::MAX);
    let mut batch: Vec<Event> = Vec::with_capacity(batch_size.min(4096));
    let mut first_failure: Option<tl_common::Error> = None;

    for decoded in EventReader::new(reader) {
        match decoded {
            Ok(event) => {
                report.records += 1;
                batch.push(event);
            }
            Err(tl_core::DecodeError::Io { source, .. }) => {
                return fail(global, tl_common::Error::Io(source));
            }
            Err(err) => {
                report.skipped_lines += 1;
                warn!(
                    target: event_names::INPUT_LINE_SKIPPED,
                    line = err.line(),
                    error = %truncate_for_log(&err.to_string(), 200),
                    "skipping input line"
                );
                continue;
            }
        }

        if batch.len() >= batch_size {
            flush(&writer, &mut batch, &mut report, &mut first_failure);
        }
    }
    flush(&writer, &mut batch, &mut report, &mut first_failure);

    info!(
        target: event_names::RUN_FINISHED,
        run_id = %run_id,
        records = report.records,
        rows = report.rows_committed,
        skipped = report.skipped_lines,
        failed_batches = report.failed_batches,
        "ship finished"
    );
    match serde_json::to_string(&report) {
        Ok(json) => println!("{json}"),
        Err(err) => return fail(global, err.into()),
    }
    match first_failure {
        Some(err) => fail(global, err),
        None => ExitCode::Clean,
    }
}

/// Write one batch. A failed batch is logged and counted; later batches
/// still go out, using the mapping refreshed by drift recovery.
fn flush(
    writer: &BatchWriter<ParquetTableStore>,
    batch: &mut Vec<Event>,
    report: &mut ShipReport,
    first_failure: &mut Option<tl_common::Error>,
) {
    if batch.is_empty() {
        return;
    }
    let result = writer.write(batch);
    let sent = batch.len();
    batch.clear();
    match result {
        Ok(summary) => report.absorb(&summary),
        Err(err) => {
            let committed = match &err {
                WriteError::Chunks { committed_rows, .. } => *committed_rows,
                WriteError::Build(_) => 0,
            };
            report.record_failure(sent, committed);
            warn!(
                target: event_names::WRITE_BATCH_FAILED,
                rows = sent,
                committed,
                drift = err.is_schema_drift(),
                error = %err,
                "batch failed, continuing with next batch"
            );
            if first_failure.is_none() {
                *first_failure = Some(err.into());
            }
        }
    }
}

fn run_create_table(global: &GlobalOpts, args: &CreateTableArgs) -> ExitCode {
    init_cli_logging(global, None);

    let declared: BTreeMap<String, String> = match serde_json::from_str(&args.columns) {
        Ok(declared) => declared,
        Err(err) => {
            return fail(
                global,
                tl_common::Error::Config(format!("invalid --columns: {}", err)),
            )
        }
    };
    if declared.is_empty() {
        return fail(
            global,
            tl_common::Error::Config("--columns must name at least one column".to_string()),
        );
    }
    let columns: Vec<Column> = declared
        .iter()
        .map(|(name, type_name)| Column::from_store_type(name.as_str(), type_name))
        .collect();

    let store = ParquetTableStore::new(&args.store);
    match store.create_table(&args.table, &columns) {
        Ok(()) => {
            info!(table = %args.table, columns = columns.len(), "table created");
            ExitCode::Clean
        }
        Err(err) => fail(global, err.into()),
    }
}

fn run_describe(global: &GlobalOpts, args: &TableArgs) -> ExitCode {
    init_cli_logging(global, None);

    let store = ParquetTableStore::new(&args.store);
    let timeout = Duration::from_millis(DEFAULT_RESOLVE_TIMEOUT_MS);
    let columns = match store.describe_table(&args.table, timeout) {
        Ok(columns) => columns,
        Err(err) => return fail(global, err.into()),
    };

    let report: Vec<ColumnReport<'_>> = columns
        .iter()
        .map(|c| ColumnReport {
            name: &c.name,
            type_name: c.store_type(),
        })
        .collect();
    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{json}");
            ExitCode::Clean
        }
        Err(err) => fail(global, err.into()),
    }
}

fn run_dump(global: &GlobalOpts, args: &TableArgs) -> ExitCode {
    init_cli_logging(global, None);

    let store = ParquetTableStore::new(&args.store);
    let batches = match store.read_table(&args.table) {
        Ok(batches) => batches,
        Err(err) => return fail(global, err.into()),
    };

    match arrow::util::pretty::pretty_format_batches(&batches) {
        Ok(table) => {
            println!("{table}");
            ExitCode::Clean
        }
        Err(err) => fail(
            global,
            tl_common::Error::Store(StoreError::Other(err.to_string())),
        ),
    }
}
