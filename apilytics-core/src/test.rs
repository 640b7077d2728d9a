//! This provides testing functionality for building tests.
//!
//! **Feature:** `test` (*disabled by default*)
//!
//! If the crate has been compiled with the test support feature this module
//! becomes available and provides a transport that captures reports instead
//! of sending them.
//!
//! # Example usage
//!
//! ```
//! use apilytics_core::test::with_captured_reports;
//! use apilytics_core::{Integration, MetricsRecord, RawFields};
//!
//! let reports = with_captured_reports(|client| {
//!     let record = MetricsRecord::build(RawFields {
//!         path: "/",
//!         method: "GET",
//!         ..Default::default()
//!     });
//!     client.send_metrics(record, &Integration::core());
//! });
//! assert_eq!(reports.len(), 1);
//! assert_eq!(reports[0].record.path(), "/");
//! ```

use std::sync::{Arc, Mutex};

use crate::apikey::ApiKey;
use crate::{Client, ClientOptions, Report, Transport};

lazy_static::lazy_static! {
    static ref TEST_API_KEY: ApiKey = "test-api-key".parse().unwrap();
}

/// Collects reports instead of sending them.
///
/// # Examples
///
/// ```
/// use apilytics_core::test::TestTransport;
/// use apilytics_core::{Client, ClientOptions};
/// use std::sync::Arc;
///
/// let transport = TestTransport::new();
/// let options = ClientOptions {
///     api_key: Some("my-key".parse().unwrap()),
///     transport: Some(Arc::new(transport.clone())),
///     ..ClientOptions::default()
/// };
/// let client = Arc::new(Client::with_options(options));
/// assert!(client.is_enabled());
/// ```
pub struct TestTransport {
    collected: Mutex<Vec<Report>>,
}

impl TestTransport {
    /// Creates a new test transport.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> Arc<TestTransport> {
        Arc::new(TestTransport {
            collected: Mutex::new(vec![]),
        })
    }

    /// Fetches and clears the contained reports.
    pub fn fetch_and_clear_reports(&self) -> Vec<Report> {
        let mut guard = self.collected.lock().unwrap();
        std::mem::take(&mut *guard)
    }
}

impl Transport for TestTransport {
    fn send_report(&self, report: Report) {
        self.collected.lock().unwrap().push(report);
    }
}

/// Runs some code with a test client and returns the captured reports.
///
/// This is a shortcut for creating a client with default options and
/// calling [`with_captured_reports_options`].
pub fn with_captured_reports<F: FnOnce(&Arc<Client>)>(f: F) -> Vec<Report> {
    with_captured_reports_options(f, ClientOptions::default())
}

/// Runs some code with a test client built from the given options and
/// returns the captured reports.
///
/// If no API key is set on the options a test key is inserted.  The
/// transport on the options is also overridden with a `TestTransport`.
pub fn with_captured_reports_options<F: FnOnce(&Arc<Client>), O: Into<ClientOptions>>(
    f: F,
    options: O,
) -> Vec<Report> {
    let transport = TestTransport::new();
    let mut options = options.into();
    options.api_key = Some(options.api_key.unwrap_or_else(|| TEST_API_KEY.clone()));
    options.transport = Some(Arc::new(transport.clone()));
    let client = Arc::new(Client::with_options(options));
    f(&client);
    transport.fetch_and_clear_reports()
}
