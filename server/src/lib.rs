use anyhow::Result;
use axum::{extract::{Path, State}, http::{HeaderMap, StatusCode}, routing::{delete, get, post}, Json, Router};
use rtindex_core::meta::MetaEncoding;
use rtindex_core::{
    DiskIndex, DocId, DocProperties, IndexConfig, IndexError, IndexPaths, MemoryIndex, StructureRef, TextDocument,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<MemoryIndex>,
    pub index_dir: PathBuf,
    pub admin_token: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchDoc {
    #[serde(default)]
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub properties: DocProperties,
    /// Count the document in the statistics without making it retrievable.
    #[serde(default)]
    pub statistics_only: bool,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub doc_ids: Vec<DocId>,
    pub num_documents: u64,
}

#[derive(Deserialize)]
pub struct ExtendRequest {
    pub text: String,
}

#[derive(Deserialize, Default)]
pub struct CommitRequest {
    pub prefix: Option<String>,
}

/// Build the router over a fresh index, or over one restored from `index_dir/restore_prefix`.
pub fn build_app(index_dir: String, restore_prefix: Option<&str>, config: IndexConfig) -> Result<Router> {
    let index = match restore_prefix {
        Some(prefix) => {
            let disk = DiskIndex::open(IndexPaths::new(&index_dir, prefix))?;
            MemoryIndex::restore_from(&disk, &config)?
        }
        None => MemoryIndex::new(&config),
    };
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState { index: Arc::new(index), index_dir: PathBuf::from(&index_dir), admin_token };
    Ok(router(app_state))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats_handler))
        .route("/structures/:name", get(structure_handler))
        .route("/lexicon/:term", get(lexicon_handler))
        .route("/postings/:term", get(postings_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/batch", post(index_batch))
        .route("/index/doc/:doc_id/terms", post(extend_doc))
        .route("/index/doc/:doc_id", delete(remove_doc))
        .route("/index/commit", post(index_commit))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn not_found() -> ApiError { (StatusCode::NOT_FOUND, "not found".into()) }

fn index_error(err: IndexError) -> ApiError {
    match err {
        IndexError::DocumentOutOfRange { .. } | IndexError::UnknownDocument(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        _ => {
            tracing::error!(error = %err, "index operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<Value> {
    let stats = state.index.collection_statistics();
    Json(json!({
        "statistics": stats.snapshot(),
        "average_document_length": stats.average_document_length(),
    }))
}

pub async fn structure_handler(State(state): State<AppState>, Path(name): Path<String>) -> Result<Json<Value>, ApiError> {
    let structure = state.index.structure_by_name(&name).ok_or_else(not_found)?;
    let kind = structure.kind().name();
    let summary = match structure {
        StructureRef::Lexicon(lex) => json!({ "num_entries": lex.len() }),
        StructureRef::Inverted(inv) => json!({ "num_terms": inv.num_terms(), "num_postings": inv.num_postings() }),
        StructureRef::Direct(direct) => json!({ "num_documents": direct.num_documents() }),
        StructureRef::Document(doc) => json!({ "num_documents": doc.len(), "id_preserving": doc.is_id_preserving() }),
        StructureRef::Meta(meta) => json!({
            "num_entries": meta.len(),
            "compressed": meta.encoding() == MetaEncoding::Compressed,
            "id_preserving": meta.is_id_preserving(),
        }),
        StructureRef::CollectionStatistics(stats) => json!(stats.snapshot()),
    };
    Ok(Json(json!({ "structure": kind, "summary": summary })))
}

pub async fn lexicon_handler(State(state): State<AppState>, Path(term): Path<String>) -> Result<Json<Value>, ApiError> {
    let entry = state.index.lexicon().get(&term).ok_or_else(not_found)?;
    Ok(Json(json!({ "term": term, "entry": entry })))
}

pub async fn postings_handler(State(state): State<AppState>, Path(term): Path<String>) -> Result<Json<Value>, ApiError> {
    let entry = state.index.lexicon().get(&term).ok_or_else(not_found)?;
    let postings = state.index.inverted_index().postings_of(entry.term_id);
    Ok(Json(json!({ "term": term, "term_id": entry.term_id, "postings": postings })))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<Value>, ApiError> {
    let length = state.index.document_index().get_length(doc_id).ok_or_else(not_found)?;
    let properties = state.index.meta_index().read_entry(doc_id).map_err(index_error)?;
    Ok(Json(json!({ "doc_id": doc_id, "length": length, "properties": properties })))
}

// --- Admin endpoints ---
async fn index_batch(State(state): State<AppState>, headers: HeaderMap, Json(docs): Json<Vec<BatchDoc>>) -> Result<Json<BatchResponse>, ApiError> {
    authorize(&state, &headers)?;
    let mut doc_ids = Vec::with_capacity(docs.len());
    for doc in docs {
        let mut text = TextDocument::new(&format!("{}\n{}", doc.title, doc.body), doc.properties);
        let id = if doc.statistics_only {
            state.index.index_undocument(&mut text)
        } else {
            state.index.index_document(&mut text)
        }
        .map_err(index_error)?;
        doc_ids.push(id);
    }
    Ok(Json(BatchResponse { doc_ids, num_documents: state.index.num_documents() }))
}

async fn extend_doc(State(state): State<AppState>, headers: HeaderMap, Path(doc_id): Path<DocId>, Json(req): Json<ExtendRequest>) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let mut text = TextDocument::new(&req.text, DocProperties::new());
    let updated = state.index.add_document_terms(doc_id, &mut text).map_err(index_error)?;
    Ok(Json(json!({ "doc_id": doc_id, "updated": updated })))
}

async fn remove_doc(State(state): State<AppState>, headers: HeaderMap, Path(doc_id): Path<DocId>) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    if state.index.remove_document(doc_id) {
        Ok(Json(json!({ "doc_id": doc_id, "removed": true })))
    } else {
        Err((StatusCode::NOT_IMPLEMENTED, "document removal is not supported".into()))
    }
}

async fn index_commit(State(state): State<AppState>, headers: HeaderMap, body: Option<Json<CommitRequest>>) -> Result<Json<Value>, ApiError> {
    authorize(&state, &headers)?;
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let prefix = req.prefix.unwrap_or_else(|| "data".into());
    let index = state.index.clone();
    let dir = state.index_dir.clone();
    let written = tokio::task::spawn_blocking(move || index.write(&dir, &prefix).map(|d| d.map(|d| d.paths().prefix.clone())))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(index_error)?;
    Ok(Json(json!({ "written": written.is_some(), "prefix": written })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
