//! # Laurea CLI
//!
//! ## Usage
//!
//! ```bash
//! # Serve the design API
//! laurea serve --listen 0.0.0.0:8080 --fonts ./fonts
//!
//! # Generate certificates from a design and a CSV
//! laurea generate --design design.json --data rows.csv --format png --out ./out
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use laurea::binding::Dataset;
use laurea::generate::{Generator, OutputFormat, OutputOptions};
use laurea::render::{AssetCache, FontStore};
use laurea::server::{serve, ServerConfig};
use laurea::{Document, LaureaError};

/// Laurea - certificate design and batch generation
#[derive(Parser, Debug)]
#[command(name = "laurea")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the design API server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        /// Directory of TTF font families
        #[arg(long)]
        fonts: Option<PathBuf>,
    },
    /// Generate certificates from a design file and a CSV dataset
    Generate {
        /// Design document (JSON)
        #[arg(long)]
        design: PathBuf,

        /// Recipient data (CSV with a header row)
        #[arg(long)]
        data: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "png")]
        format: OutputFormat,

        /// JPEG quality (0-100)
        #[arg(long, default_value = "90")]
        quality: u8,

        /// Dataset column to name files after
        #[arg(long)]
        filename_field: Option<String>,

        /// Directory of TTF font families
        #[arg(long)]
        fonts: Option<PathBuf>,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "laurea=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), LaureaError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { listen, fonts } => {
            serve(ServerConfig {
                listen_addr: listen,
                fonts_dir: fonts,
            })
            .await
        }
        Commands::Generate {
            design,
            data,
            format,
            quality,
            filename_field,
            fonts,
            out,
        } => {
            let design_json = std::fs::read_to_string(&design)?;
            let doc: Document = serde_json::from_str(&design_json)
                .map_err(|e| LaureaError::Validation(format!("invalid design file: {}", e)))?;
            let dataset = Dataset::from_csv(&std::fs::read(&data)?)?;

            let fonts_store = Arc::new(match &fonts {
                Some(dir) => FontStore::load_dir(dir),
                None => FontStore::empty(),
            });
            let mut generator = Generator::new(fonts_store, AssetCache::new());
            if let Some(dir) = &fonts {
                generator = generator.with_pdf_fonts_dir(dir);
            }

            let options = OutputOptions {
                format,
                quality,
                filename_field,
            };
            let total = dataset.rows.len();
            let output = generator
                .generate(&doc, &dataset, &options, None, None, |percent| {
                    println!("{}% ({} rows)", percent, total);
                })
                .await?;

            std::fs::create_dir_all(&out)?;
            let file = output.file();
            let path = out.join(&file.name);
            std::fs::write(&path, &file.bytes)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}
