// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. Health is public; everything else goes
// through the `AuthBearer` extractor.
//
// A scan is started with `POST /scan` and runs in a background task. Clients
// poll `/scan/status` and read `/results` once it reports not running.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::auth::AuthBearer;
use crate::app_state::AppState;
use crate::catalog::{self, Selection};
use crate::evaluator::SetupLabel;
use crate::export;
use crate::history;
use crate::mcso_scan::{sort_mcso, McsoSort};
use crate::scanner::{sort_by_value_desc, ScanReport, ScanRow};
use crate::types::ScanMode;

// =============================================================================
// Router construction
// =============================================================================

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/catalog", get(catalog_view))
        .route("/api/v1/scan", post(start_scan))
        .route("/api/v1/scan/status", get(scan_status))
        .route("/api/v1/results", get(results))
        .route("/api/v1/results/:ticker", get(result_detail))
        .route("/api/v1/summary", get(summary))
        .route("/api/v1/export.csv", get(export_csv))
        .route("/api/v1/history", get(history_view))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, Json(body)).into_response()
}

fn no_results() -> Response {
    error_response(StatusCode::NOT_FOUND, "no scan results yet")
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    scanning: bool,
    state_version: u64,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        scanning: state.is_scanning(),
        state_version: state.current_state_version(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Serialize)]
struct CatalogTicker {
    symbol: &'static str,
    name: &'static str,
}

#[derive(Serialize)]
struct CatalogCategory {
    name: &'static str,
    tickers: Vec<CatalogTicker>,
}

async fn catalog_view(_auth: AuthBearer) -> impl IntoResponse {
    let body: Vec<CatalogCategory> = catalog::all()
        .iter()
        .map(|c| CatalogCategory {
            name: c.name,
            tickers: c
                .tickers
                .iter()
                .map(|&(symbol, name)| CatalogTicker { symbol, name })
                .collect(),
        })
        .collect();
    Json(body)
}

// =============================================================================
// Scan control
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ScanRequest {
    #[serde(default)]
    mode: ScanMode,
    #[serde(default)]
    all: bool,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    symbols: Vec<String>,
    #[serde(default = "default_true")]
    save_history: bool,
}

fn default_true() -> bool {
    true
}

impl ScanRequest {
    /// `all` wins over explicit symbols, which win over categories.
    fn selection(&self) -> Option<Selection> {
        if self.all {
            Some(Selection::All)
        } else if self.symbols.iter().any(|s| !s.trim().is_empty()) {
            Some(Selection::Symbols(self.symbols.clone()))
        } else if !self.categories.is_empty() {
            Some(Selection::Categories(self.categories.clone()))
        } else {
            None
        }
    }
}

#[derive(Serialize)]
struct ScanAccepted {
    scan_id: uuid::Uuid,
    mode: ScanMode,
    total: usize,
}

async fn start_scan(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScanRequest>,
) -> Response {
    let Some(selection) = req.selection() else {
        return error_response(StatusCode::BAD_REQUEST, "select at least one category or symbol");
    };
    let tickers = catalog::resolve(&selection);
    if tickers.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "selection matched no tickers");
    }

    let total = match state.config().max_tickers {
        0 => tickers.len(),
        cap => cap.min(tickers.len()),
    };
    let Some(scan_id) = state.try_begin_scan(req.mode, total) else {
        return error_response(StatusCode::CONFLICT, "a scan is already running");
    };

    info!(%scan_id, mode = %req.mode, total, "scan requested via API");
    tokio::spawn(Arc::clone(&state).run_scan(req.mode, tickers, req.save_history));

    let accepted = ScanAccepted {
        scan_id,
        mode: req.mode,
        total,
    };
    (StatusCode::ACCEPTED, Json(accepted)).into_response()
}

async fn scan_status(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.status())
}

// =============================================================================
// Results
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ResultsQuery {
    #[serde(default)]
    include_errors: bool,
    /// MCSO ordering, e.g. `name_asc`. Other modes always sort by value.
    sort: Option<String>,
}

fn table<R: ScanRow + Clone>(rows: &[R], include_errors: bool) -> Vec<R> {
    let mut out: Vec<R> = rows
        .iter()
        .filter(|r| include_errors || r.is_actionable())
        .cloned()
        .collect();
    sort_by_value_desc(&mut out);
    out
}

async fn results(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Query(q): Query<ResultsQuery>,
) -> Response {
    let guard = state.last_report.read();
    let Some(report) = guard.as_ref() else {
        return no_results();
    };

    let view = match report {
        ScanReport::Setup(rows) => ScanReport::Setup(
            table(rows, q.include_errors)
                .iter()
                .map(|r| r.summary())
                .collect(),
        ),
        ScanReport::Momentum(rows) => ScanReport::Momentum(table(rows, q.include_errors)),
        ScanReport::Mcso(rows) => {
            let order = match q.sort.as_deref().map(str::parse::<McsoSort>).transpose() {
                Ok(order) => order.unwrap_or_default(),
                Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
            };
            let mut rows = table(rows, q.include_errors);
            sort_mcso(&mut rows, order);
            ScanReport::Mcso(rows)
        }
    };

    Json(view).into_response()
}

async fn result_detail(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Path(ticker): Path<String>,
) -> Response {
    let guard = state.last_report.read();
    let Some(report) = guard.as_ref() else {
        return no_results();
    };
    let wanted = ticker.trim();
    let not_found = || error_response(StatusCode::NOT_FOUND, format!("{wanted} not in last scan"));

    let body = match report {
        ScanReport::Setup(rows) => {
            let Some(row) = rows.iter().find(|r| r.ticker.eq_ignore_ascii_case(wanted)) else {
                return not_found();
            };
            serde_json::json!({
                "mode": ScanMode::Setup,
                "row": row,
                "indicators": {
                    "weekly": row.weekly.as_ref().map(|s| s.to_map()),
                    "daily": row.daily.as_ref().map(|s| s.to_map()),
                    "monthly": row.monthly.as_ref().map(|s| s.to_map()),
                },
            })
        }
        ScanReport::Momentum(rows) => {
            let Some(row) = rows.iter().find(|r| r.ticker.eq_ignore_ascii_case(wanted)) else {
                return not_found();
            };
            serde_json::json!({ "mode": ScanMode::Momentum, "row": row })
        }
        ScanReport::Mcso(rows) => {
            let Some(row) = rows.iter().find(|r| r.ticker.eq_ignore_ascii_case(wanted)) else {
                return not_found();
            };
            serde_json::json!({ "mode": ScanMode::Mcso, "row": row })
        }
    };

    Json(body).into_response()
}

async fn summary(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> Response {
    match state.last_report.read().as_ref() {
        Some(report) => Json(report.summary()).into_response(),
        None => no_results(),
    }
}

async fn export_csv(_auth: AuthBearer, State(state): State<Arc<AppState>>) -> Response {
    let guard = state.last_report.read();
    let Some(report) = guard.as_ref().filter(|r| !r.is_empty()) else {
        return no_results();
    };

    match export::to_csv_string(report) {
        Ok(body) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                export::default_file_name(report.mode(), &Local::now())
            );
            (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "CSV export failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "CSV export failed")
        }
    }
}

// =============================================================================
// History
// =============================================================================

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_days")]
    days: u32,
    /// Comma-separated setup labels matched against the latest day, or
    /// `all`. Absent means Potential and Watch in both directions.
    setup: Option<String>,
}

fn default_history_days() -> u32 {
    7
}

fn parse_setups(raw: Option<&str>) -> anyhow::Result<Vec<SetupLabel>> {
    if raw.is_some_and(|r| r.trim().eq_ignore_ascii_case("all")) {
        return Ok(SetupLabel::ALL.to_vec());
    }
    raw.unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

async fn history_view(
    _auth: AuthBearer,
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> Response {
    let setups = match parse_setups(q.setup.as_deref()) {
        Ok(s) => s,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let days = history::load_history(
        &state.config().history_dir,
        Local::now().date_naive(),
        q.days.clamp(1, 365),
    );
    let dates: Vec<_> = days.iter().map(|d| d.date).collect();
    let rows = history::filter_by_latest_setup(history::build_trend_rows(&days), &days, &setups);
    let price_changes = history::price_changes(&rows, &dates);

    Json(serde_json::json!({
        "dates": dates,
        "rows": rows,
        "price_changes": price_changes,
    }))
    .into_response()
}
