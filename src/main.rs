use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use reviewsync::conference::{self, Note};
use reviewsync::sheet::{SheetClient, WriteRowsOptions};
use reviewsync::{Record, Result, SyncError, XlsxSession, report};

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_tracing().and_then(|_| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| SyncError::Logging(error.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sync(args) => execute_sync(args),
        Command::Show(args) => execute_show(args),
        Command::Fix(args) => execute_fix(args),
        Command::Clear(args) => execute_clear(args),
    }
}

fn execute_sync(args: SyncArgs) -> Result<()> {
    if !args.notes.exists() {
        return Err(SyncError::MissingInput(args.notes));
    }

    let notes: Vec<Note> = serde_json::from_str(&fs::read_to_string(&args.notes)?)?;
    let config = conference::builtin(&args.conference)?;
    let records = report::build_report(&notes, config);

    let mut client = args.sheet.client();
    let next_row_idx = client.write_rows(
        records,
        &WriteRowsOptions {
            empty_sheet: args.init,
            headers: Some(report::columns(config)),
            overwrite_headers: args.init,
            key_column: (!args.init).then(|| report::KEY_COLUMN.to_string()),
            batch_size: args.batch_size,
            ..Default::default()
        },
    )?;
    println!("synced up to row {next_row_idx}");
    Ok(())
}

fn execute_show(args: SheetArgs) -> Result<()> {
    let mut client = args.client();
    let data = client.get_data_list()?;
    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}

fn execute_fix(args: FixArgs) -> Result<()> {
    if !args.updates.exists() {
        return Err(SyncError::MissingInput(args.updates));
    }

    let fixes: Vec<FixEntry> = serde_json::from_str(&fs::read_to_string(&args.updates)?)?;
    let (where_conditions, what_values): (Vec<Record>, Vec<Record>) = fixes
        .into_iter()
        .map(|fix| (fix.where_conditions, fix.what))
        .unzip();

    let mut client = args.sheet.client();
    client.write_cells(&where_conditions, &what_values, args.overwrite)
}

fn execute_clear(args: SheetArgs) -> Result<()> {
    let mut client = args.client();
    client.clear_worksheet()
}

/// One conditional point fix: the first row matching every `where` column
/// receives the `what` values.
#[derive(Debug, Deserialize)]
struct FixEntry {
    #[serde(rename = "where")]
    where_conditions: Record,
    what: Record,
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile paper-review reports into a spreadsheet workbook."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the per-paper report from a notes dump and reconcile it into the workbook.
    Sync(SyncArgs),
    /// Print the current worksheet contents as JSON records.
    Show(SheetArgs),
    /// Apply conditional point fixes from a JSON file.
    Fix(FixArgs),
    /// Remove every cell from the worksheet.
    Clear(SheetArgs),
}

#[derive(Args)]
struct SheetArgs {
    /// Target workbook path. Created on first write if absent.
    #[arg(long)]
    workbook: PathBuf,

    /// Worksheet name inside the workbook.
    #[arg(long, default_value = "Sheet1")]
    sheet: String,
}

impl SheetArgs {
    fn client(&self) -> SheetClient<XlsxSession> {
        SheetClient::new(XlsxSession::new(&self.workbook, &self.sheet))
    }
}

#[derive(Args)]
struct SyncArgs {
    /// JSON dump of platform notes (submissions plus their forum notes).
    #[arg(long)]
    notes: PathBuf,

    /// Conference the dump belongs to, e.g. ICLR2026.
    #[arg(long)]
    conference: String,

    /// Clear the sheet and rewrite headers instead of updating by paper number.
    #[arg(long)]
    init: bool,

    /// Rows per batched write.
    #[arg(long, default_value_t = 1000)]
    batch_size: usize,

    #[command(flatten)]
    sheet: SheetArgs,
}

#[derive(Args)]
struct FixArgs {
    /// JSON file with `{"where": {...}, "what": {...}}` entries.
    #[arg(long)]
    updates: PathBuf,

    /// Replace non-empty cells that differ from the new value.
    #[arg(long)]
    overwrite: bool,

    #[command(flatten)]
    sheet: SheetArgs,
}
