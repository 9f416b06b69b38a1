//! Moonraker client — printer state and print progress over HTTP.
//!
//! Only two facts matter to the controller: whether the printer is in the
//! `error` state, and the completion percentage while `printing`. Both come
//! from Moonraker's object query endpoint (`/printer/objects/query`).

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

// ── Error type ──

/// Printer API errors.
#[derive(Debug)]
pub enum ApiError {
    /// Connection / transport failure (host down, timeout, DNS).
    Transport(String),
    /// Non-success HTTP status from Moonraker.
    Http(u16),
    /// Response body did not match the expected shape.
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Transport(e) => write!(f, "Printer API unreachable: {e}"),
            ApiError::Http(status) => write!(f, "Printer API returned HTTP {status}"),
            ApiError::Decode(e) => write!(f, "Printer API response malformed: {e}"),
        }
    }
}

impl std::error::Error for ApiError {}

pub type Result<T> = std::result::Result<T, ApiError>;

// ── Printer state ──

/// Klipper print state as reported by Moonraker's `print_stats.state`.
///
/// Only [`Printing`](PrinterState::Printing) and
/// [`Error`](PrinterState::Error) affect the mode machine; every other
/// state is treated as "do nothing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterState {
    Standby,
    Printing,
    Paused,
    Complete,
    Cancelled,
    Error,
    Other(String),
}

impl PrinterState {
    pub fn from_state_str(s: &str) -> Self {
        match s {
            "standby" => PrinterState::Standby,
            "printing" => PrinterState::Printing,
            "paused" => PrinterState::Paused,
            "complete" => PrinterState::Complete,
            "cancelled" => PrinterState::Cancelled,
            "error" => PrinterState::Error,
            other => PrinterState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for PrinterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterState::Standby => write!(f, "standby"),
            PrinterState::Printing => write!(f, "printing"),
            PrinterState::Paused => write!(f, "paused"),
            PrinterState::Complete => write!(f, "complete"),
            PrinterState::Cancelled => write!(f, "cancelled"),
            PrinterState::Error => write!(f, "error"),
            PrinterState::Other(s) => write!(f, "{s}"),
        }
    }
}

/// Stats for an in-progress print.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintingStats {
    /// Completion percentage in [0, 100].
    pub done_percent: f64,
}

// ── Trait ──

/// Read-only view of the printer, polled once per cycle.
pub trait PrinterApi {
    fn printer_state(&self) -> Result<PrinterState>;

    /// Progress of the current print. Only meaningful while the state is
    /// [`PrinterState::Printing`].
    fn printing_stats(&self) -> Result<PrintingStats>;
}

// ── Moonraker HTTP client ──

/// Response shape of `/printer/objects/query?print_stats` and
/// `?display_status`. Both objects are optional because the query only
/// returns what was asked for.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    status: StatusObjects,
}

#[derive(Debug, Deserialize)]
struct StatusObjects {
    print_stats: Option<PrintStatsObject>,
    display_status: Option<DisplayStatusObject>,
}

#[derive(Debug, Deserialize)]
struct PrintStatsObject {
    state: String,
}

#[derive(Debug, Deserialize)]
struct DisplayStatusObject {
    /// Print completion as a fraction in [0, 1].
    progress: f64,
}

/// Blocking HTTP client for a Moonraker instance.
pub struct MoonrakerClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl MoonrakerClient {
    /// Requests that take longer than this are treated as transport failures
    /// so a dead printer host cannot stall the polling cycle indefinitely.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(host: &str, port: u16) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Transport(format!("HTTP client: {e}")))?;
        Ok(MoonrakerClient {
            base_url: format!("http://{host}:{port}"),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn query(&self, objects: &str) -> Result<StatusObjects> {
        let url = format!("{}/printer/objects/query?{objects}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Http(status.as_u16()));
        }
        let decoded: QueryResponse = response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(decoded.result.status)
    }
}

impl PrinterApi for MoonrakerClient {
    fn printer_state(&self) -> Result<PrinterState> {
        let status = self.query("print_stats")?;
        let stats = status
            .print_stats
            .ok_or_else(|| ApiError::Decode("missing print_stats object".into()))?;
        Ok(PrinterState::from_state_str(&stats.state))
    }

    fn printing_stats(&self) -> Result<PrintingStats> {
        let status = self.query("display_status")?;
        let display = status
            .display_status
            .ok_or_else(|| ApiError::Decode("missing display_status object".into()))?;
        Ok(PrintingStats {
            done_percent: (display.progress * 100.0).clamp(0.0, 100.0),
        })
    }
}

// ── Mock printer for testing ──

/// Scriptable [`PrinterApi`] for unit and integration tests.
///
/// Always compiled (zero runtime cost), hidden from public docs.
#[doc(hidden)]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// In-memory printer. Tests set the state/progress between cycles and
    /// can inject a fetch failure for either call.
    pub struct MockPrinter {
        state: RefCell<PrinterState>,
        done_percent: Cell<f64>,
        pub fail_state: Cell<bool>,
        pub fail_stats: Cell<bool>,
        /// Number of `printer_state` calls observed.
        pub state_polls: Cell<usize>,
    }

    impl MockPrinter {
        pub fn new(state: PrinterState) -> Self {
            MockPrinter {
                state: RefCell::new(state),
                done_percent: Cell::new(0.0),
                fail_state: Cell::new(false),
                fail_stats: Cell::new(false),
                state_polls: Cell::new(0),
            }
        }

        pub fn set_state(&self, state: PrinterState) {
            *self.state.borrow_mut() = state;
        }

        pub fn set_done_percent(&self, percent: f64) {
            self.done_percent.set(percent);
        }
    }

    impl PrinterApi for MockPrinter {
        fn printer_state(&self) -> Result<PrinterState> {
            self.state_polls.set(self.state_polls.get() + 1);
            if self.fail_state.get() {
                return Err(ApiError::Transport("mock: state failure injected".into()));
            }
            Ok(self.state.borrow().clone())
        }

        fn printing_stats(&self) -> Result<PrintingStats> {
            if self.fail_stats.get() {
                return Err(ApiError::Transport("mock: stats failure injected".into()));
            }
            Ok(PrintingStats {
                done_percent: self.done_percent.get(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── state parsing ──

    #[test]
    fn state_from_known_strings() {
        assert_eq!(PrinterState::from_state_str("printing"), PrinterState::Printing);
        assert_eq!(PrinterState::from_state_str("error"), PrinterState::Error);
        assert_eq!(PrinterState::from_state_str("standby"), PrinterState::Standby);
        assert_eq!(PrinterState::from_state_str("paused"), PrinterState::Paused);
        assert_eq!(PrinterState::from_state_str("complete"), PrinterState::Complete);
        assert_eq!(PrinterState::from_state_str("cancelled"), PrinterState::Cancelled);
    }

    #[test]
    fn state_from_unknown_string() {
        let s = PrinterState::from_state_str("warming_up");
        assert_eq!(s, PrinterState::Other("warming_up".into()));
        assert_eq!(s.to_string(), "warming_up");
    }

    #[test]
    fn state_display_roundtrip() {
        for s in ["standby", "printing", "paused", "complete", "cancelled", "error"] {
            assert_eq!(PrinterState::from_state_str(s).to_string(), s);
        }
    }

    // ── response decoding ──

    #[test]
    fn decode_print_stats_response() {
        let body = r#"{"result":{"status":{"print_stats":{"state":"printing","filename":"benchy.gcode"}}}}"#;
        let decoded: QueryResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.result.status.print_stats.unwrap().state, "printing");
        assert!(decoded.result.status.display_status.is_none());
    }

    #[test]
    fn decode_display_status_response() {
        let body = r#"{"result":{"status":{"display_status":{"progress":0.42,"message":null}}}}"#;
        let decoded: QueryResponse = serde_json::from_str(body).unwrap();
        let progress = decoded.result.status.display_status.unwrap().progress;
        assert!((progress - 0.42).abs() < 1e-9);
    }

    #[test]
    fn decode_rejects_malformed_body() {
        let body = r#"{"result":{"status":{"print_stats":{"state":7}}}}"#;
        assert!(serde_json::from_str::<QueryResponse>(body).is_err());
    }

    // ── client construction ──

    #[test]
    fn client_base_url() {
        let client = MoonrakerClient::new("printer.local", 7125).unwrap();
        assert_eq!(client.base_url(), "http://printer.local:7125");
    }

    // ── mock printer ──

    #[test]
    fn mock_returns_scripted_state() {
        let printer = mock::MockPrinter::new(PrinterState::Standby);
        assert_eq!(printer.printer_state().unwrap(), PrinterState::Standby);
        printer.set_state(PrinterState::Printing);
        printer.set_done_percent(50.0);
        assert_eq!(printer.printer_state().unwrap(), PrinterState::Printing);
        assert_eq!(printer.printing_stats().unwrap().done_percent, 50.0);
        assert_eq!(printer.state_polls.get(), 2);
    }

    #[test]
    fn mock_injected_failures() {
        let printer = mock::MockPrinter::new(PrinterState::Printing);
        printer.fail_state.set(true);
        assert!(printer.printer_state().is_err());
        printer.fail_stats.set(true);
        assert!(printer.printing_stats().is_err());
    }

    // ── error display ──

    #[test]
    fn error_display() {
        assert!(ApiError::Transport("refused".into()).to_string().contains("unreachable"));
        assert_eq!(ApiError::Http(502).to_string(), "Printer API returned HTTP 502");
        assert!(ApiError::Decode("eof".into()).to_string().contains("malformed"));
    }
}
