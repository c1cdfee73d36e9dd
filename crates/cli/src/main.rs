//! cardsnap CLI
//!
//! Command-line front end for the card identification pipeline:
//! capture (from a file) -> preprocess -> extract -> match.

use anyhow::{Context, Result};
use card_catalog::{CatalogConfig, HttpCardCatalog, MemoryCatalog};
use clap::{Args, Parser, Subcommand};
use llm_bridge::{CardVisionModel, ChatClient, ChatConfig};
use scan_core::capture::FileCamera;
use scan_core::coordinator::{ScanCoordinator, ScanPhase, TriggerOutcome};
use scan_core::extract::{ExtractorConfig, TextExtractor};
use scan_core::lookup::CardLookup;
use scan_core::matcher::CandidateMatcher;
use scan_core::normalize::NameVariantSet;
use scan_core::ocr::TesseractOcr;
use scan_core::preprocess::{self, PreprocessConfig};
use scan_core::CardRecord;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cardsnap")]
#[command(about = "Identify trading cards from photos", long_about = None)]
#[command(version, long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILT_TIME_UTC"), " on ", env!("BUILT_HOST"), ")"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct VisionArgs {
    /// Base URL of the vision chat API
    #[arg(long, default_value = "http://localhost:11434")]
    vision_url: String,

    /// Vision model name
    #[arg(long, default_value = "qwen2.5vl:7b")]
    model: String,

    /// Skip the remote vision tier entirely
    #[arg(long)]
    no_vision: bool,

    /// Skip the local OCR fallback tier
    #[arg(long)]
    no_ocr: bool,

    /// Tesseract language for the OCR tier
    #[arg(long, default_value = "eng")]
    ocr_lang: String,
}

#[derive(Args)]
struct CatalogArgs {
    /// JSON file catalog (offline mode); takes precedence over the API
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Base URL of the card database API
    #[arg(long, default_value = "https://api.pokemontcg.io/v2")]
    catalog_url: String,

    /// API key for the card database (falls back to CARDSNAP_API_KEY)
    #[arg(long)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on an image and print ranked candidates
    Identify {
        /// Card photo to identify
        #[arg(short, long)]
        image: PathBuf,

        #[command(flatten)]
        vision: VisionArgs,

        #[command(flatten)]
        catalog: CatalogArgs,
    },

    /// Extract raw card fields from an image (no catalog lookup)
    Extract {
        /// Card photo to read
        #[arg(short, long)]
        image: PathBuf,

        #[command(flatten)]
        vision: VisionArgs,
    },

    /// Show the name variants the matcher would query with
    Variants {
        /// Raw card name, e.g. "Pikachu ex"
        name: String,
    },

    /// Free-text catalog search (the manual fallback flow)
    Search {
        /// Search text
        query: String,

        #[command(flatten)]
        catalog: CatalogArgs,
    },
}

fn build_extractor(args: &VisionArgs) -> Result<TextExtractor> {
    let vision = if args.no_vision {
        None
    } else {
        let client = ChatClient::new(ChatConfig {
            base_url: args.vision_url.clone(),
            ..ChatConfig::default()
        })?;
        Some(Arc::new(CardVisionModel::new(client, args.model.clone()))
            as Arc<dyn scan_core::extract::VisionService>)
    };
    let ocr = if args.no_ocr {
        None
    } else {
        Some(Arc::new(TesseractOcr::new(args.ocr_lang.clone()))
            as Arc<dyn scan_core::extract::OcrEngine>)
    };
    anyhow::ensure!(
        vision.is_some() || ocr.is_some(),
        "--no-vision and --no-ocr together leave no extraction tier"
    );
    Ok(TextExtractor::new(vision, ocr, ExtractorConfig::default()))
}

fn build_lookup(args: &CatalogArgs) -> Result<Arc<dyn CardLookup>> {
    match &args.catalog {
        Some(path) => {
            let catalog = MemoryCatalog::from_json_file(path)
                .with_context(|| format!("loading catalog {}", path.display()))?;
            Ok(Arc::new(catalog))
        }
        None => {
            let api_key = args
                .api_key
                .clone()
                .or_else(|| std::env::var("CARDSNAP_API_KEY").ok());
            let catalog = HttpCardCatalog::new(CatalogConfig {
                base_url: args.catalog_url.clone(),
                api_key,
                ..CatalogConfig::default()
            })?;
            Ok(Arc::new(catalog))
        }
    }
}

fn print_candidates(candidates: &[CardRecord]) {
    if candidates.is_empty() {
        println!("No matches; try the `search` subcommand.");
        return;
    }
    for (rank, card) in candidates.iter().enumerate() {
        let edition = card
            .edition
            .as_ref()
            .map(|e| e.name.as_str())
            .unwrap_or("-");
        println!(
            "{:>2}. {} [{}]  hp {}  #{}  ({})",
            rank + 1,
            card.name,
            card.id,
            card.hp.as_deref().unwrap_or("-"),
            card.number.as_deref().unwrap_or("-"),
            edition
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Identify {
            image,
            vision,
            catalog,
        } => {
            let coordinator = ScanCoordinator::new(
                Arc::new(FileCamera::new(image)),
                build_extractor(&vision)?,
                CandidateMatcher::new(build_lookup(&catalog)?),
            );
            match coordinator.trigger().await {
                TriggerOutcome::Completed(ScanPhase::Presenting(candidates)) => {
                    print_candidates(&candidates);
                    Ok(())
                }
                TriggerOutcome::Completed(ScanPhase::Failed(err)) => {
                    Err(anyhow::Error::new(err).context("scan failed"))
                }
                other => anyhow::bail!("unexpected scan outcome: {other:?}"),
            }
        }
        Commands::Extract { image, vision } => {
            let extractor = build_extractor(&vision)?;
            let encoded = preprocess::encode_for_transmission(&image, &PreprocessConfig::default())?;
            let result = extractor.extract(&encoded, &image).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Commands::Variants { name } => {
            for variant in NameVariantSet::derive(&name).iter() {
                println!("{variant}");
            }
            Ok(())
        }
        Commands::Search { query, catalog } => {
            let lookup = build_lookup(&catalog)?;
            let results = lookup.search_by_free_text(&query).await?;
            print_candidates(&results);
            Ok(())
        }
    }
}
