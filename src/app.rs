#![cfg(not(tarpaulin_include))]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::TableConfig;
use crate::debounce::{Clock, MonotonicClock};
use crate::export::{EXPORT_FILE_NAME, EXPORT_MIME};
use crate::predicate::FilterCondition;
use crate::record::Schema;
use crate::source::{RecordSource, source_for_path};
use crate::storage::{FileStorage, MemoryStorage, Storage};
use crate::table::{DataTable, ReloadOutcome};

type SharedTable = DataTable<Box<dyn Storage + Send>>;

pub struct AppState {
    table: Mutex<SharedTable>,
    source: Box<dyn RecordSource + Send + Sync>,
    clock: MonotonicClock,
}

impl AppState {
    fn table(&self) -> MutexGuard<'_, SharedTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Deserialize)]
struct RowsQuery {
    offset: Option<f64>,
    height: Option<f64>,
}

#[derive(Deserialize)]
struct ReloadQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Deserialize)]
struct FilterText {
    text: String,
}

#[derive(Serialize)]
struct RowItem {
    index: usize,
    start: f64,
    size: f64,
    selected: bool,
    values: Vec<String>,
}

#[derive(Serialize)]
struct RowsResponse {
    count: usize,
    total: usize,
    total_size: f64,
    scroll_offset: f64,
    all_selected: bool,
    notice: Option<String>,
    items: Vec<RowItem>,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(StatusResponse {
            status: "ok".to_string(),
            message: None,
        })
    }

    fn error(code: StatusCode, message: impl ToString) -> Response {
        (
            code,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(message.to_string()),
            }),
        )
            .into_response()
    }
}

pub async fn run(config: TableConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source_path = config
        .source
        .clone()
        .unwrap_or_else(|| PathBuf::from("public/data.csv"));
    let source = source_for_path(&source_path)?;

    let storage: Box<dyn Storage + Send> = match &config.storage_path {
        Some(path) => Box::new(FileStorage::open(path)),
        None => Box::new(MemoryStorage::new()),
    };

    let mut table = DataTable::new(Schema::listings(), &config, storage);
    if let ReloadOutcome::Failed = table.reload(source.as_ref(), false) {
        log::warn!("starting with an empty table: {:?}", table.notice());
    }

    // Setup app state
    let app_state = Arc::new(AppState {
        table: Mutex::new(table),
        source,
        clock: MonotonicClock::new(),
    });

    // Build router
    let app = Router::new()
        .route("/", get(serve_table))
        .route("/api/schema", get(get_schema))
        .route("/api/rows", get(get_rows))
        .route("/api/filter/text", post(type_filter_text))
        .route(
            "/api/filter/conditions",
            put(set_condition).delete(clear_conditions),
        )
        .route("/api/filter/conditions/:column", delete(remove_condition))
        .route("/api/sort/:column", post(toggle_sort))
        .route("/api/select/:position", post(toggle_selection))
        .route("/api/select_all", post(toggle_select_all))
        .route("/api/select", delete(clear_selection))
        .route("/api/export", get(export_selected))
        .route("/api/export/:position", get(export_row))
        .route("/api/reload", post(reload))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    log::info!("Listening on http://127.0.0.1:3000");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_table() -> Html<&'static str> {
    Html(include_str!("./static/table.html"))
}

async fn get_schema(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let table = state.table();
    Json(serde_json::json!({
        "columns": table.schema().columns(),
        "sort": table.sort_state(),
        "conditions": table.conditions(),
        "free_text": table.free_text(),
        "debounce_ms": table.filter_delay().as_millis() as u64,
    }))
}

async fn get_rows(
    Query(params): Query<RowsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let mut table = state.table();
    if let Some(height) = params.height {
        table.resize(height);
    }
    if let Some(offset) = params.offset {
        table.scroll_to(offset);
    }

    let window = table.window();
    let items = table
        .visible_rows()
        .into_iter()
        .map(|row| RowItem {
            index: row.item.index,
            start: row.item.start,
            size: row.item.size,
            selected: row.selected,
            values: row.record.values().to_vec(),
        })
        .collect();

    Json(RowsResponse {
        count: table.len(),
        total: table.records().len(),
        total_size: window.total_size,
        scroll_offset: window.scroll_offset,
        all_selected: table.is_all_selected(),
        notice: table.take_notice(),
        items,
    })
}

async fn type_filter_text(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<FilterText>,
) -> impl IntoResponse {
    let now = state.clock.now();
    let deadline = {
        let mut table = state.table();
        table.type_filter_text(&payload.text, now);
        table.filter_deadline()
    };

    // Each keystroke schedules its own wake-up; only the one at the latest
    // deadline finds the quiet window elapsed.
    if let Some(deadline) = deadline {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            tokio::time::sleep(deadline.saturating_sub(now)).await;
            let now = state.clock.now();
            if state.table().tick(now) {
                log::debug!("committed filter text");
            }
        });
    }

    StatusResponse::ok()
}

async fn set_condition(
    State(state): State<Arc<AppState>>,
    Json(condition): Json<FilterCondition>,
) -> Response {
    match state.table().set_condition(condition) {
        Ok(()) => StatusResponse::ok().into_response(),
        Err(e) => StatusResponse::error(StatusCode::BAD_REQUEST, e),
    }
}

async fn remove_condition(
    Path(column): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.table().remove_condition(&column) {
        Ok(_) => StatusResponse::ok().into_response(),
        Err(e) => StatusResponse::error(StatusCode::BAD_REQUEST, e),
    }
}

async fn clear_conditions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.table().clear_conditions();
    StatusResponse::ok()
}

async fn toggle_sort(Path(column): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let mut table = state.table();
    match table.toggle_sort(&column) {
        Ok(()) => Json(table.sort_state().clone()).into_response(),
        Err(e) => StatusResponse::error(StatusCode::BAD_REQUEST, e),
    }
}

async fn toggle_selection(
    Path(position): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.table().toggle_selection(position) {
        Ok(selected) => Json(serde_json::json!({ "selected": selected })).into_response(),
        Err(e) => StatusResponse::error(StatusCode::NOT_FOUND, e),
    }
}

async fn toggle_select_all(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut table = state.table();
    table.toggle_select_all();
    Json(serde_json::json!({ "all_selected": table.is_all_selected() }))
}

async fn clear_selection(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.table().clear_selection();
    StatusResponse::ok()
}

fn csv_download(result: Result<String, crate::error::ExportError>) -> Response {
    match result {
        Ok(text) => (
            [
                (header::CONTENT_TYPE, EXPORT_MIME.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
                ),
            ],
            text,
        )
            .into_response(),
        Err(e) => {
            log::warn!("export failed: {}", e);
            StatusResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

async fn export_selected(State(state): State<Arc<AppState>>) -> Response {
    let result = state.table().export_selected();
    csv_download(result)
}

async fn export_row(Path(position): Path<usize>, State(state): State<Arc<AppState>>) -> Response {
    let table = state.table();
    if position >= table.len() {
        return StatusResponse::error(
            StatusCode::NOT_FOUND,
            crate::error::TableError::RowOutOfRange {
                position,
                len: table.len(),
            },
        );
    }
    let result = table.export_row(position);
    drop(table);
    csv_download(result)
}

async fn reload(
    Query(params): Query<ReloadQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let outcome = state.table().reload(state.source.as_ref(), params.force);
    match outcome {
        ReloadOutcome::Applied(n) => Json(serde_json::json!({ "status": "ok", "records": n }))
            .into_response(),
        ReloadOutcome::Stale => StatusResponse::ok().into_response(),
        ReloadOutcome::Failed => {
            let message = state
                .table()
                .take_notice()
                .unwrap_or_else(|| "Failed to load data".to_string());
            StatusResponse::error(StatusCode::BAD_GATEWAY, message)
        }
    }
}
