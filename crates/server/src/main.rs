//! cardsnap REST API server
//!
//! Exposes the identification pipeline over HTTP for clients that do
//! their own capture: upload a photo, get back the extracted fields
//! and the ranked candidate list.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use card_catalog::{CatalogConfig, HttpCardCatalog, MemoryCatalog};
use llm_bridge::{CardVisionModel, ChatClient, ChatConfig};
use scan_core::extract::{ExtractorConfig, TextExtractor, VisionService};
use scan_core::lookup::CardLookup;
use scan_core::matcher::CandidateMatcher;
use scan_core::normalize::NameVariantSet;
use scan_core::ocr::TesseractOcr;
use scan_core::preprocess::{self, PreprocessConfig};
use scan_core::{CardRecord, ScanError, ScanId, ScanResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

struct AppState {
    extractor: TextExtractor,
    matcher: CandidateMatcher,
    preprocess_config: PreprocessConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn build_state() -> anyhow::Result<AppState> {
    let chat = ChatClient::new(ChatConfig {
        base_url: env_or("CARDSNAP_VISION_URL", "http://localhost:11434"),
        ..ChatConfig::default()
    })?;
    let vision: Arc<dyn VisionService> = Arc::new(CardVisionModel::new(
        chat,
        env_or("CARDSNAP_MODEL", "qwen2.5vl:7b"),
    ));
    let ocr = Arc::new(TesseractOcr::new(env_or("CARDSNAP_OCR_LANG", "eng")));
    let extractor = TextExtractor::new(Some(vision), Some(ocr), ExtractorConfig::default());

    let lookup: Arc<dyn CardLookup> = match std::env::var("CARDSNAP_CATALOG") {
        Ok(path) => Arc::new(MemoryCatalog::from_json_file(std::path::Path::new(&path))?),
        Err(_) => Arc::new(HttpCardCatalog::new(CatalogConfig {
            base_url: env_or("CARDSNAP_CATALOG_URL", "https://api.pokemontcg.io/v2"),
            api_key: std::env::var("CARDSNAP_API_KEY").ok(),
            ..CatalogConfig::default()
        })?),
    };

    Ok(AppState {
        extractor,
        matcher: CandidateMatcher::new(lookup),
        preprocess_config: PreprocessConfig::default(),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let state = Arc::new(build_state()?);

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/identify", post(identify))
        .route("/api/variants/:name", get(variants))
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let addr = env_or("CARDSNAP_ADDR", "127.0.0.1:3000");
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyRequest {
    /// Base64 JPEG/PNG bytes of the card photo
    image_base64: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentifyResponse {
    scan_id: ScanId,
    scan: ScanResult,
    candidates: Vec<CardRecord>,
}

async fn identify(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IdentifyRequest>,
) -> Result<Json<IdentifyResponse>, (StatusCode, String)> {
    let bytes = general_purpose::STANDARD
        .decode(&request.image_base64)
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("invalid base64: {e}")))?;

    let encoded = preprocess::encode_image_bytes(&bytes, &state.preprocess_config)
        .map_err(scan_error_status)?;

    // The OCR tier reads the original file, so persist the upload for
    // the duration of this scan
    let scan_id = ScanId::new();
    let original = std::env::temp_dir().join(format!("cardsnap-upload-{}.img", Uuid::new_v4()));
    tokio::fs::write(&original, &bytes)
        .await
        .map_err(|e| scan_error_status(ScanError::from(e)))?;

    let outcome = state.extractor.extract(&encoded, &original).await;
    tokio::fs::remove_file(&original).await.ok();
    let scan = outcome.map_err(scan_error_status)?;

    let candidates = match state.matcher.match_candidates(&scan).await {
        Ok(candidates) => candidates,
        Err(err) => {
            // Lookup outages read as "no matches", per the pipeline's
            // error policy
            tracing::warn!(error = %err, "lookup unreachable during identify");
            Vec::new()
        }
    };

    Ok(Json(IdentifyResponse {
        scan_id,
        scan,
        candidates,
    }))
}

async fn variants(Path(name): Path<String>) -> Json<Vec<String>> {
    Json(
        NameVariantSet::derive(&name)
            .iter()
            .map(str::to_string)
            .collect(),
    )
}

fn scan_error_status(err: ScanError) -> (StatusCode, String) {
    let status = match &err {
        ScanError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScanError::ExtractionUnavailable => StatusCode::BAD_GATEWAY,
        ScanError::PermissionDenied | ScanError::DeviceUnavailable => StatusCode::BAD_REQUEST,
        ScanError::LookupTransport(_) | ScanError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}
