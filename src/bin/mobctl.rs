//! AtlasMob CLI
//!
//! Writes, flushes, scans and inspects a store on local disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use atlasmob::config::{IS_MOB, MOB_COMPRESSION, MOB_THRESHOLD};
use atlasmob::mob::reference;
use atlasmob::storage::CellFileReader;
use atlasmob::{Cell, CellType, Config, FamilyDescriptor, Result, Scan, Store};

/// AtlasMob CLI
#[derive(Parser, Debug)]
#[command(name = "mobctl")]
#[command(about = "Inspect and exercise an AtlasMob store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./atlasmob_data")]
    data_dir: String,

    /// Column family
    #[arg(short, long, default_value = "f")]
    family: String,

    /// Treat the family as a MOB family
    #[arg(long)]
    mob: bool,

    /// MOB threshold in bytes
    #[arg(short, long)]
    threshold: Option<u64>,

    /// MOB file compression (NONE or LZ4)
    #[arg(long)]
    compression: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write one cell and flush it
    Put {
        row: String,
        qualifier: String,
        value: String,

        /// Cell timestamp (defaults to now, in millis)
        #[arg(long)]
        ts: Option<u64>,
    },

    /// Scan the family
    Scan {
        /// Only this row
        #[arg(long)]
        row: Option<String>,

        /// Return MOB references unresolved
        #[arg(long)]
        raw: bool,

        /// Missing MOB files yield empty values instead of errors
        #[arg(long)]
        lenient: bool,

        /// Return every version
        #[arg(long)]
        all_versions: bool,
    },

    /// Dump a store or MOB file
    Inspect {
        file: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atlasmob=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    match &args.command {
        Commands::Inspect { file } => inspect(file),
        Commands::Put { row, qualifier, value, ts } => {
            let store = open_store(&args)?;
            let ts = ts.unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as u64);
            let cell = Cell::new(
                row.clone(),
                args.family.clone(),
                qualifier.clone(),
                ts,
                value.clone(),
            );
            store.add(cell)?;
            if let Some(file) = store.flush()? {
                tracing::info!(file = %file.path.display(), "Flushed");
            }
            Ok(())
        }
        Commands::Scan { row, raw, lenient, all_versions } => {
            let store = open_store(&args)?;
            let mut scan = match row {
                Some(row) => Scan::for_row(row.clone()),
                None => Scan::new(),
            };
            scan = scan.raw_mob(*raw).empty_value_on_miss(*lenient);
            if *all_versions {
                scan = scan.all_versions();
            }
            for cell in store.scanner(&scan)? {
                print_cell(&cell?);
            }
            Ok(())
        }
    }
}

fn open_store(args: &Args) -> Result<Store> {
    let config = Config::builder().data_dir(&args.data_dir).build();

    let mut props = HashMap::new();
    props.insert(IS_MOB.to_string(), args.mob.to_string());
    if let Some(threshold) = args.threshold {
        props.insert(MOB_THRESHOLD.to_string(), threshold.to_string());
    }
    if let Some(compression) = &args.compression {
        props.insert(MOB_COMPRESSION.to_string(), compression.clone());
    }
    let family = FamilyDescriptor::from_properties(args.family.clone(), &props)?;

    Store::open_for_family(config, family)
}

fn inspect(path: &Path) -> Result<()> {
    let mut reader = CellFileReader::open(path)?;
    let info = reader.file_info().clone();
    println!("kind:        {:?}", info.kind);
    println!("entries:     {}", info.entry_count);
    println!("compression: {:?}", info.compression);
    println!("created:     {}", info.created_at_millis);
    println!("max ts:      {}", info.max_timestamp);

    match reader.verify_checksum() {
        Ok(()) => println!("checksum:    ok"),
        Err(e) => println!("checksum:    FAILED ({})", e),
    }

    for cell in reader.iter()? {
        print_cell(&cell?);
    }
    Ok(())
}

fn print_cell(cell: &Cell) {
    let value = match cell.cell_type() {
        CellType::MobReference => match reference::decode(cell.value()) {
            Ok(r) => format!(
                "-> {} ({} bytes)",
                r.relative_path().display(),
                r.original_length
            ),
            Err(e) => format!("<bad reference: {}>", e),
        },
        CellType::Put if cell.value_len() > 64 => format!("<{} bytes>", cell.value_len()),
        CellType::Put => String::from_utf8_lossy(cell.value()).into_owned(),
    };
    println!(
        "{}/{}:{} @{} = {}",
        String::from_utf8_lossy(cell.row()),
        String::from_utf8_lossy(cell.family()),
        String::from_utf8_lossy(cell.qualifier()),
        cell.timestamp(),
        value
    );
}
