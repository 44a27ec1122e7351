// Job Code Catalog - Web Server
// REST API over the validation-and-mutation engine

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use job_catalog::{
    export, open_store, validate_code, validate_title, AuditLog, CatalogEntry,
    CatalogWorkflow, CodeDecision, RemovalReport, Siglum, TitleDecision,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    workflow: Arc<Mutex<CatalogWorkflow>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

/// Catalog entry response
#[derive(Serialize)]
struct EntryResponse {
    code: String,
    title: String,
    siglum: String,
}

impl From<&CatalogEntry> for EntryResponse {
    fn from(entry: &CatalogEntry) -> Self {
        Self {
            code: entry.code.clone(),
            title: entry.title.clone(),
            siglum: entry.siglum.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct CodeRequest {
    code: String,
}

#[derive(Deserialize)]
struct TitleRequest {
    title: String,
}

#[derive(Deserialize)]
struct CreateEntryRequest {
    code: String,
    title: String,
    siglum: String,
}

#[derive(Deserialize)]
struct RemoveRequest {
    codes: Vec<String>,
}

#[derive(Serialize)]
struct DecisionResponse {
    decision: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    existing_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    existing_codes: Option<Vec<String>>,
}

#[derive(Serialize)]
struct CreateEntryResponse {
    entry: EntryResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/catalog - Full catalog in insertion order
async fn get_catalog(State(state): State<AppState>) -> impl IntoResponse {
    let workflow = state.workflow.lock().unwrap();

    let entries: Vec<EntryResponse> = workflow.catalog().iter().map(Into::into).collect();
    Json(ApiResponse::ok(entries))
}

/// GET /api/search/:prefix - Job codes starting with the prefix
async fn search_codes(
    State(state): State<AppState>,
    Path(prefix): Path<String>,
) -> impl IntoResponse {
    let workflow = state.workflow.lock().unwrap();

    let matches: Vec<String> = workflow
        .search_by_code_prefix(&prefix)
        .iter()
        .map(|s| s.to_string())
        .collect();

    Json(ApiResponse::ok(matches))
}

/// POST /api/validate/code - Check a proposed code without committing
async fn check_code(
    State(state): State<AppState>,
    Json(req): Json<CodeRequest>,
) -> impl IntoResponse {
    let workflow = state.workflow.lock().unwrap();
    let decision = validate_code(workflow.index(), &req.code);

    let existing_title = match &decision {
        CodeDecision::Duplicate { existing_title, .. } => Some(existing_title.clone()),
        _ => None,
    };

    Json(ApiResponse::ok(DecisionResponse {
        decision: decision.kind(),
        message: decision.to_string(),
        existing_title,
        existing_codes: None,
    }))
}

/// POST /api/validate/title - Check a proposed title without committing
async fn check_title(
    State(state): State<AppState>,
    Json(req): Json<TitleRequest>,
) -> impl IntoResponse {
    let workflow = state.workflow.lock().unwrap();
    let decision = validate_title(workflow.index(), &req.title);

    let existing_codes = match &decision {
        TitleDecision::Duplicate { existing_codes, .. } => Some(existing_codes.clone()),
        _ => None,
    };

    Json(ApiResponse::ok(DecisionResponse {
        decision: decision.kind(),
        message: decision.to_string(),
        existing_title: None,
        existing_codes,
    }))
}

/// POST /api/entries - Validate and commit a new entry in one request
async fn create_entry(
    State(state): State<AppState>,
    Json(req): Json<CreateEntryRequest>,
) -> impl IntoResponse {
    let mut workflow = state.workflow.lock().unwrap();

    // Each request is its own operator session
    workflow.cancel();

    let code_decision = workflow.submit_code(&req.code);
    if !code_decision.is_accepted() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(code_decision.to_string())),
        )
            .into_response();
    }

    let title_decision = workflow.submit_title(&req.title);
    if title_decision.is_blocking() {
        workflow.cancel();
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(title_decision.to_string())),
        )
            .into_response();
    }

    let warning = match &title_decision {
        TitleDecision::Duplicate { .. } => Some(title_decision.to_string()),
        _ => None,
    };

    let siglum: Siglum = match req.siglum.parse() {
        Ok(siglum) => siglum,
        Err(err) => {
            workflow.cancel();
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::error(err.to_string())),
            )
                .into_response();
        }
    };

    match workflow.commit(siglum) {
        Ok(entry) => (
            StatusCode::CREATED,
            Json(ApiResponse::ok(CreateEntryResponse {
                entry: EntryResponse::from(&entry),
                warning,
            })),
        )
            .into_response(),
        Err(err) => {
            eprintln!("Error committing entry: {}", err);
            workflow.cancel();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(err.to_string())),
            )
                .into_response()
        }
    }
}

/// DELETE /api/entries - Remove one or more codes
async fn remove_entries(
    State(state): State<AppState>,
    Json(req): Json<RemoveRequest>,
) -> impl IntoResponse {
    let mut workflow = state.workflow.lock().unwrap();

    match workflow.remove_codes(&req.codes) {
        Ok(report) => Json(ApiResponse::<RemovalReport>::ok(report)).into_response(),
        Err(err) => {
            eprintln!("Error removing entries: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(err.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /api/export - Download the catalog as CSV
async fn export_catalog(State(state): State<AppState>) -> impl IntoResponse {
    let workflow = state.workflow.lock().unwrap();

    match export::to_csv_string(workflow.catalog()) {
        Ok(csv) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/csv")],
            csv,
        )
            .into_response(),
        Err(err) => {
            eprintln!("Error exporting catalog: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(err.to_string())),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Job Code Catalog - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let catalog_path = std::env::var("JOB_CATALOG_FILE")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("job_codes.csv"));

    let store = open_store(&catalog_path).expect("Failed to open catalog store");
    let workflow = CatalogWorkflow::open(store)
        .expect("Failed to load catalog")
        .with_audit(AuditLog::new(catalog_path.with_extension("audit.jsonl")));

    println!(
        "✓ Catalog opened: {} ({} entries)",
        catalog_path.display(),
        workflow.catalog().len()
    );

    let state = AppState {
        workflow: Arc::new(Mutex::new(workflow)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/catalog", get(get_catalog))
        .route("/search/:prefix", get(search_codes))
        .route("/validate/code", post(check_code))
        .route("/validate/title", post(check_title))
        .route("/entries", post(create_entry).delete(remove_entries))
        .route("/export", get(export_catalog))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/catalog");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
