// =============================================================================
// Central Application State — dashboard session
// =============================================================================
//
// Shared by every HTTP handler through `Arc<AppState>`. Holds the scanner, the
// last finished report and the progress of the scan in flight.
//
// Thread safety:
//   - AtomicBool guards against two scans running at once.
//   - Atomic version counter, bumped on every progress tick and finished scan.
//   - parking_lot::RwLock for the report and progress fields.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::TickerRecord;
use crate::history;
use crate::runtime_config::ScannerConfig;
use crate::scanner::{Progress, ScanReport, Scanner};
use crate::types::ScanMode;

/// Progress view served by `GET /scan/status`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanStatus {
    pub running: bool,
    pub scan_id: Option<Uuid>,
    pub mode: Option<ScanMode>,
    pub done: usize,
    pub total: usize,
    pub current: Option<String>,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_mode: Option<ScanMode>,
    pub last_rows: usize,
    pub last_error: Option<String>,
    pub state_version: u64,
}

pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    pub state_version: AtomicU64,

    // ── Scanning ────────────────────────────────────────────────────────
    pub scanner: Arc<Scanner>,
    scan_running: AtomicBool,
    /// Id of the scan in flight, or of the last finished one.
    pub scan_id: RwLock<Option<Uuid>>,
    pub running_mode: RwLock<Option<ScanMode>>,
    pub progress: RwLock<Option<Progress>>,

    // ── Results ─────────────────────────────────────────────────────────
    pub last_report: RwLock<Option<ScanReport>>,
    pub last_refresh: RwLock<Option<DateTime<Utc>>>,
    pub last_error: RwLock<Option<String>>,

    // ── Auth ────────────────────────────────────────────────────────────
    /// Bearer token required by the API; `None` leaves it open.
    pub api_token: Option<String>,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(scanner: Scanner, api_token: Option<String>) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            scanner: Arc::new(scanner),
            scan_running: AtomicBool::new(false),
            scan_id: RwLock::new(None),
            running_mode: RwLock::new(None),
            progress: RwLock::new(None),
            last_report: RwLock::new(None),
            last_refresh: RwLock::new(None),
            last_error: RwLock::new(None),
            api_token: api_token.filter(|t| !t.is_empty()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        self.scanner.config()
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Scan lifecycle ──────────────────────────────────────────────────

    pub fn is_scanning(&self) -> bool {
        self.scan_running.load(Ordering::SeqCst)
    }

    /// Claim the scan slot and return the new scan id, or `None` if a scan
    /// is already running.
    pub fn try_begin_scan(&self, mode: ScanMode, total: usize) -> Option<Uuid> {
        if self
            .scan_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }
        let id = Uuid::new_v4();
        *self.scan_id.write() = Some(id);
        *self.running_mode.write() = Some(mode);
        *self.progress.write() = Some(Progress {
            done: 0,
            total,
            symbol: String::new(),
        });
        *self.last_error.write() = None;
        self.increment_version();
        Some(id)
    }

    pub fn record_progress(&self, progress: Progress) {
        *self.progress.write() = Some(progress);
        self.increment_version();
    }

    /// Store the finished report and release the scan slot.
    pub fn finish_scan(&self, report: ScanReport) {
        *self.last_report.write() = Some(report);
        *self.last_refresh.write() = Some(Utc::now());
        self.release_slot();
    }

    fn release_slot(&self) {
        *self.running_mode.write() = None;
        *self.progress.write() = None;
        self.scan_running.store(false, Ordering::SeqCst);
        self.increment_version();
    }

    /// Run a scan claimed with `try_begin_scan` to completion. Setup scans
    /// are recorded to the score history unless `save_history` is false.
    pub async fn run_scan(
        self: Arc<Self>,
        mode: ScanMode,
        tickers: Vec<TickerRecord>,
        save_history: bool,
    ) {
        let slot = ScanSlot::new(&self);
        let progress_state = Arc::clone(&self);
        let report = self
            .scanner
            .run(mode, &tickers, move |p| progress_state.record_progress(p))
            .await;

        if let (ScanReport::Setup(rows), true) = (&report, save_history) {
            let dir: PathBuf = self.config().history_dir.clone();
            let today = Local::now().date_naive();
            if let Err(e) = history::save_scan_history(&dir, today, rows) {
                warn!(error = %format!("{e:#}"), "failed to save score history");
                *self.last_error.write() = Some(format!("history not saved: {e:#}"));
            }
        }

        let scan_id = self.scan_id.read().map(|id| id.to_string()).unwrap_or_default();
        info!(%scan_id, mode = %mode, rows = report.len(), "dashboard scan stored");
        slot.finish(report);
    }

    pub fn status(&self) -> ScanStatus {
        let progress = self.progress.read().clone();
        let last = self.last_report.read();
        ScanStatus {
            running: self.is_scanning(),
            scan_id: *self.scan_id.read(),
            mode: *self.running_mode.read(),
            done: progress.as_ref().map_or(0, |p| p.done),
            total: progress.as_ref().map_or(0, |p| p.total),
            current: progress.map(|p| p.symbol).filter(|s| !s.is_empty()),
            last_refresh: *self.last_refresh.read(),
            last_mode: last.as_ref().map(ScanReport::mode),
            last_rows: last.as_ref().map_or(0, ScanReport::len),
            last_error: self.last_error.read().clone(),
            state_version: self.current_state_version(),
        }
    }
}

// =============================================================================
// Scan slot guard
// =============================================================================

/// Held by a running scan. Dropping it without `finish` (the scan task
/// panicked or was cancelled) still releases the slot.
struct ScanSlot<'a> {
    state: &'a AppState,
    armed: bool,
}

impl<'a> ScanSlot<'a> {
    fn new(state: &'a AppState) -> Self {
        Self { state, armed: true }
    }

    fn finish(mut self, report: ScanReport) {
        self.armed = false;
        self.state.finish_scan(report);
    }
}

impl Drop for ScanSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("scan ended without a report, releasing the scan slot");
            *self.state.last_error.write() = Some("scan aborted before completion".into());
            self.state.release_slot();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::provider::fakes::FakeProvider;

    fn state(history_dir: PathBuf) -> Arc<AppState> {
        let config = ScannerConfig {
            history_dir,
            ..ScannerConfig::default()
        };
        let scanner = Scanner::new(Arc::new(FakeProvider::default().failing("BAD")), config);
        Arc::new(AppState::new(scanner, Some(String::new())))
    }

    fn ticker(symbol: &str) -> TickerRecord {
        TickerRecord {
            symbol: symbol.into(),
            name: symbol.into(),
            category: "TEST".into(),
        }
    }

    #[test]
    fn empty_token_means_open_api() {
        let dir = tempfile::tempdir().unwrap();
        assert!(state(dir.path().to_path_buf()).api_token.is_none());
    }

    #[test]
    fn only_one_scan_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let s = state(dir.path().to_path_buf());
        let first = s.try_begin_scan(ScanMode::Setup, 3).unwrap();
        assert!(s.try_begin_scan(ScanMode::Mcso, 1).is_none());
        assert_eq!(s.status().total, 3);
        assert_eq!(s.status().scan_id, Some(first));

        s.finish_scan(ScanReport::Mcso(Vec::new()));
        assert!(!s.is_scanning());
        let second = s.try_begin_scan(ScanMode::Mcso, 1).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn dropped_slot_releases_scan() {
        let dir = tempfile::tempdir().unwrap();
        let s = state(dir.path().to_path_buf());
        assert!(s.try_begin_scan(ScanMode::Momentum, 4).is_some());
        let before = s.current_state_version();

        drop(ScanSlot::new(&s));

        let status = s.status();
        assert!(!status.running);
        assert_eq!(status.mode, None);
        assert_eq!(status.total, 0);
        assert!(status.last_error.is_some());
        assert!(status.state_version > before);
        assert!(s.last_report.read().is_none());
        assert!(s.try_begin_scan(ScanMode::Setup, 1).is_some());
    }

    #[tokio::test]
    async fn panicking_scan_task_frees_the_slot() {
        let dir = tempfile::tempdir().unwrap();
        let s = state(dir.path().to_path_buf());
        assert!(s.try_begin_scan(ScanMode::Setup, 2).is_some());

        let task_state = Arc::clone(&s);
        let joined = tokio::spawn(async move {
            let _slot = ScanSlot::new(&task_state);
            panic!("strategy blew up");
        })
        .await;

        assert!(joined.unwrap_err().is_panic());
        assert!(!s.is_scanning());
        assert!(s.try_begin_scan(ScanMode::Setup, 1).is_some());
    }

    #[tokio::test]
    async fn run_scan_stores_report_and_releases_slot() {
        let dir = tempfile::tempdir().unwrap();
        let s = state(dir.path().to_path_buf());
        let before = s.current_state_version();

        assert!(s.try_begin_scan(ScanMode::Setup, 2).is_some());
        Arc::clone(&s)
            .run_scan(ScanMode::Setup, vec![ticker("BAD"), ticker("NONE")], true)
            .await;

        let status = s.status();
        assert!(!status.running);
        assert_eq!(status.last_mode, Some(ScanMode::Setup));
        assert_eq!(status.last_rows, 2);
        assert!(status.last_refresh.is_some());
        assert!(status.state_version > before + 2);
        // Every row failed, so no history file was written.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
