//! docstash CLI
//!
//! Command-line front end for a docstash document store.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use docstash::config::ConfigBuilder;
use docstash::{
    BackendConfig, Config, DocumentService, FileConfig, IndexedConfig, SearchQuery, StashError,
};
use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

/// docstash CLI
#[derive(Parser, Debug)]
#[command(name = "docstash")]
#[command(about = "Tagged document store")]
#[command(version)]
struct Args {
    /// JSON config file (flags below override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage backend
    #[arg(short, long, value_enum)]
    backend: Option<BackendKind>,

    /// Base directory (file backend) or audit copy directory (indexed backend)
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Store host (indexed backend)
    #[arg(long)]
    host: Option<String>,

    /// Store port (indexed backend)
    #[arg(long)]
    port: Option<u16>,

    /// Store database index (indexed backend)
    #[arg(long)]
    db: Option<u32>,

    /// Store password (indexed backend)
    #[arg(long)]
    password: Option<String>,

    /// Document time-to-live in seconds
    #[arg(long)]
    expire: Option<u64>,

    /// Length of generated keys
    #[arg(long)]
    key_length: Option<usize>,

    /// Maximum body length in bytes
    #[arg(long)]
    max_length: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendKind {
    File,
    Indexed,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a document under a given key
    Put {
        /// The document key
        key: String,

        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Document body (read from stdin when absent)
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Store a document under a generated key
    Create {
        /// Tag to attach (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Document body (read from stdin when absent)
        #[arg(short, long)]
        data: Option<String>,
    },

    /// Fetch a document with its tags
    Get {
        /// The document key
        key: String,
    },

    /// Print only the document body
    Raw {
        /// The document key
        key: String,

        /// Don't refresh the document's time-to-live
        #[arg(long)]
        skip_expire: bool,
    },

    /// Search keys by substring and documents by tag
    Search {
        /// Key substring (repeatable)
        #[arg(short, long = "key")]
        keys: Vec<String>,

        /// Tag name (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// List all tag names
    Tags,

    /// List all tags with document counts
    Cloud,

    /// List the most recently stored documents
    Recent,
}

fn main() -> ExitCode {
    // Initialize tracing/logging (stderr, so stdout stays machine readable)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,docstash=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", json!({ "message": e.to_string() }));
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(args: Args) -> docstash::Result<String> {
    let config = build_config(&args)?;
    let service = DocumentService::open(&config)?;

    let output = match args.command {
        Commands::Put { key, tags, data } => {
            let body = read_body(data)?;
            let key = service.put(&key, body, &tags)?;
            json!({ "key": key }).to_string()
        }
        Commands::Create { tags, data } => {
            let body = read_body(data)?;
            let key = service.create(body, &tags)?;
            json!({ "key": key }).to_string()
        }
        Commands::Get { key } => {
            let document = service.get(&key)?;
            json!({
                "key": document.key,
                "data": document.body_text(),
                "tags": document.tags,
            })
            .to_string()
        }
        Commands::Raw { key, skip_expire } => {
            let body = service.get_raw(&key, skip_expire)?;
            io::stdout().write_all(&body)?;
            String::new()
        }
        Commands::Search { keys, tags } => {
            let results = service.search(&SearchQuery { keys, tags })?;
            json!({ "key": results.key_matches, "tags": results.tag_matches }).to_string()
        }
        Commands::Tags => json!({ "data": service.get_all_tags()? }).to_string(),
        Commands::Cloud => json!({ "data": service.get_all_cloud_tags()? }).to_string(),
        Commands::Recent => json!({ "data": service.recent()? }).to_string(),
    };

    service.shutdown()?;
    Ok(output)
}

/// Merge the config file (if any) with command-line overrides
fn build_config(args: &Args) -> docstash::Result<Config> {
    let base = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    let mut backend = match (args.backend, base.backend.clone()) {
        (Some(BackendKind::File), BackendConfig::File(file)) => BackendConfig::File(file),
        (Some(BackendKind::File), _) => BackendConfig::File(FileConfig::default()),
        (Some(BackendKind::Indexed), BackendConfig::Indexed(indexed)) => {
            BackendConfig::Indexed(indexed)
        }
        (Some(BackendKind::Indexed), _) => BackendConfig::Indexed(IndexedConfig::default()),
        (None, current) => current,
    };

    match &mut backend {
        BackendConfig::File(file) => {
            if let Some(path) = &args.path {
                file.path = path.clone();
            }
            if args.expire.is_some() {
                file.expire = args.expire;
            }
        }
        BackendConfig::Indexed(indexed) => {
            if let Some(path) = &args.path {
                indexed.mirror_path = Some(path.clone());
            }
            if let Some(host) = &args.host {
                indexed.host = host.clone();
            }
            if let Some(port) = args.port {
                indexed.port = port;
            }
            if let Some(db) = args.db {
                indexed.db = db;
            }
            if args.password.is_some() {
                indexed.password = args.password.clone();
            }
            if args.expire.is_some() {
                indexed.expire = args.expire;
            }
        }
    }

    let mut builder = ConfigBuilder::from_config(base);
    builder = match backend {
        BackendConfig::File(file) => builder.file_backend(file),
        BackendConfig::Indexed(indexed) => builder.indexed_backend(indexed),
    };
    if let Some(length) = args.key_length {
        builder = builder.key_length(length);
    }
    if let Some(max) = args.max_length {
        builder = builder.max_length(max);
    }
    Ok(builder.build())
}

fn read_body(data: Option<String>) -> docstash::Result<Vec<u8>> {
    match data {
        Some(text) => Ok(text.into_bytes()),
        None => {
            let mut body = Vec::new();
            io::stdin().read_to_end(&mut body)?;
            Ok(body)
        }
    }
}

/// Distinct exit status per failure kind
fn exit_code(error: &StashError) -> u8 {
    match error {
        StashError::NotFound(_) => 2,
        StashError::PayloadTooLarge { .. } => 3,
        StashError::Unsupported { .. } => 4,
        StashError::StoreUnavailable(_) => 5,
        StashError::DuplicateKey(_) => 6,
        StashError::PartialWriteFailure { .. } => 7,
        StashError::KeyspaceExhausted { .. } => 8,
        StashError::InvalidKey(_) => 9,
        StashError::Config(_) => 64,
        _ => 1,
    }
}
