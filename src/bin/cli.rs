//! recordkv CLI
//!
//! Command-line interface for inspecting and editing a recordkv store.

use std::collections::HashSet;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use recordkv::{
    Binding, Config, FieldSet, KeyLayout, Record, RecordClient, ScanFilter, Status, StoreManager,
};
use tracing_subscriber::{fmt, EnvFilter};

/// recordkv CLI
#[derive(Parser, Debug)]
#[command(name = "recordkv-cli")]
#[command(about = "CLI for recordkv record stores")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./recordkv_data")]
    dir: String,

    /// Table name
    #[arg(short, long, default_value = "usertable")]
    table: String,

    /// Prefix storage keys with the table name
    #[arg(long)]
    table_prefixed: bool,

    /// How scans apply --fields
    #[arg(long, value_enum, default_value_t = ScanMode::Key)]
    scan_filter: ScanMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScanMode {
    /// Keep records whose key is in --fields
    Key,
    /// Keep every record, projected onto --fields
    Projection,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a whole record
    Insert {
        /// The record key
        key: String,

        /// Fields as name=value
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Merge fields into a record
    Update {
        /// The record key
        key: String,

        /// Fields as name=value
        #[arg(required = true, value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },

    /// Read a record
    Read {
        /// The record key
        key: String,

        /// Only return these fields (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Read records in key order
    Scan {
        /// First key to visit
        start_key: String,

        /// Maximum number of keys to visit
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Field filter (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Delete a record
    Del {
        /// The record key
        key: String,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

fn to_record(fields: Vec<(String, String)>) -> Record {
    fields.into_iter().collect()
}

fn to_field_set(fields: Vec<String>) -> Option<FieldSet> {
    if fields.is_empty() {
        None
    } else {
        Some(fields.into_iter().collect::<HashSet<_>>())
    }
}

fn print_record(record: &Record) {
    for (name, value) in record {
        println!("  {} = {}", name, String::from_utf8_lossy(value));
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,recordkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.dir)
        .key_layout(if args.table_prefixed {
            KeyLayout::TablePrefixed
        } else {
            KeyLayout::Flat
        })
        .scan_filter(match args.scan_filter {
            ScanMode::Key => ScanFilter::KeyMembership,
            ScanMode::Projection => ScanFilter::Projection,
        })
        .build();

    let manager = Arc::new(StoreManager::new(config));
    let mut client = RecordClient::new(manager);

    if let Err(e) = client.init() {
        eprintln!("Failed to open store: {}", e);
        return ExitCode::FAILURE;
    }

    let table = args.table.as_str();
    let status = match args.command {
        Commands::Insert { key, fields } => client.insert(table, &key, &to_record(fields)),
        Commands::Update { key, fields } => client.update(table, &key, &to_record(fields)),
        Commands::Read { key, fields } => {
            let mut record = Record::new();
            let status = client.read(table, &key, to_field_set(fields).as_ref(), &mut record);
            if status.is_ok() {
                println!("{}", key);
                print_record(&record);
            }
            status
        }
        Commands::Scan {
            start_key,
            count,
            fields,
        } => {
            let mut records = Vec::new();
            let status = client.scan(
                table,
                &start_key,
                count,
                to_field_set(fields).as_ref(),
                &mut records,
            );
            for (i, record) in records.iter().enumerate() {
                println!("#{}", i);
                print_record(record);
            }
            status
        }
        Commands::Del { key } => client.delete(table, &key),
    };

    if let Err(e) = client.cleanup() {
        eprintln!("Failed to close store: {}", e);
    }

    match status {
        Status::Ok => ExitCode::SUCCESS,
        Status::NotFound => {
            eprintln!("Not found");
            ExitCode::FAILURE
        }
        Status::Error => {
            eprintln!("Operation failed (see log)");
            ExitCode::FAILURE
        }
    }
}
