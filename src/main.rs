//! # EA Discovery CLI (`ead`)
//!
//! ## Usage
//!
//! ```bash
//! ead --config ./config/ead.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ead init` | Create the SQLite database and run schema migrations |
//! | `ead serve` | Start the JSON HTTP API |
//! | `ead analyze <files..>` | Extract discovery answers from documents |
//! | `ead discover [files..]` | Import documents, generate artifacts, save |
//! | `ead list` | List saved engagements |
//! | `ead show <id>` | Print one engagement |
//! | `ead delete <id>` | Delete an engagement |
//! | `ead render <id> --out <dir>` | Write the SVG diagrams |
//! | `ead export <id>` | Print or write the export document |
//!
//! The model API key is read from `ANTHROPIC_API_KEY`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ea_discovery::config::{self, Config};
use ea_discovery::discover::{self, DiscoverOptions};
use ea_discovery::store::open_store;
use ea_discovery::{export, get, migrate, server};

/// EA Discovery: turn discovery answers and client documents into
/// Salesforce architecture artifacts.
#[derive(Parser)]
#[command(
    name = "ead",
    about = "EA Discovery: discovery intake and architecture artifacts for Salesforce engagements",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/ead.toml`. Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/ead.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Extract discovery answers from documents and print them as JSON.
    Analyze {
        /// Files to analyze (.pdf .docx .doc .pptx .ppt .xlsx .xls .txt).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Run the discovery workflow: import documents, generate artifacts,
    /// and save the engagement.
    Discover {
        /// Documents to import before generating.
        files: Vec<PathBuf>,

        /// Continue an existing engagement.
        #[arg(long)]
        id: Option<String>,

        /// JSON file with discovery answers (camelCase keys).
        #[arg(long)]
        answers: Option<PathBuf>,

        /// Company name (overrides imported value).
        #[arg(long)]
        company: Option<String>,

        /// Industry (overrides imported value).
        #[arg(long)]
        industry: Option<String>,

        /// Save without generating artifacts.
        #[arg(long)]
        skip_generate: bool,

        /// Directory for the export document and diagrams.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List saved engagements, newest first.
    List,

    /// Print one engagement.
    Show { id: String },

    /// Delete an engagement.
    Delete { id: String },

    /// Write the SVG diagrams of an engagement.
    Render {
        id: String,

        /// Output directory.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Export an engagement as JSON.
    Export {
        id: String,

        /// Output file path. Prints to stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ead=info,ea_discovery=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg: Config = config::load_or_minimal(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Analyze { files } => {
            discover::run_analyze(&cfg, &files).await?;
        }
        Commands::Discover {
            files,
            id,
            answers,
            company,
            industry,
            skip_generate,
            out,
        } => {
            let options = DiscoverOptions {
                files,
                id,
                answers,
                company,
                industry,
                skip_generate,
                out,
            };
            discover::run_discover(&cfg, options).await?;
        }
        Commands::List => {
            let store = open_store(&cfg).await?;
            get::run_list(store.as_ref()).await?;
        }
        Commands::Show { id } => {
            let store = open_store(&cfg).await?;
            get::run_show(store.as_ref(), &id).await?;
        }
        Commands::Delete { id } => {
            let store = open_store(&cfg).await?;
            get::run_delete(store.as_ref(), &id).await?;
        }
        Commands::Render { id, out } => {
            let store = open_store(&cfg).await?;
            export::run_render(store.as_ref(), &id, &out).await?;
        }
        Commands::Export { id, output } => {
            let store = open_store(&cfg).await?;
            export::run_export(store.as_ref(), &id, output.as_deref()).await?;
        }
    }

    Ok(())
}
