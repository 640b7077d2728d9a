//! This crate provides the core of the Apilytics client and the API that
//! framework integrations and transports are written against.
//!
//! Most users want the [`apilytics`] crate together with one of the adapter
//! crates instead; they bring an HTTP transport and environment defaults.
//!
//! # Building blocks
//!
//! * [`MilliSecondTimer`] measures how long a request took.
//! * [`MetricsRecord::build`] normalizes the raw observation of a request.
//! * [`Client::send_metrics`] hands the record to a [`Transport`], which
//!   delivers it in the background and swallows every failure.
//! * [`RequestInfo`], [`ResponseInfo`] and [`Observation`] are what adapters
//!   use to observe a single request without depending on each other.
//!
//! # Example
//!
//! ```
//! use apilytics_core::{test::with_captured_reports, Integration, MetricsRecord};
//! use apilytics_core::{MilliSecondTimer, RawFields};
//!
//! let reports = with_captured_reports(|client| {
//!     let timer = MilliSecondTimer::start();
//!     // handle the request...
//!     client.send_metrics(
//!         MetricsRecord::build(RawFields {
//!             path: "/foo/bar/123",
//!             method: "GET",
//!             status_code: Some(200),
//!             time_millis: timer.stop(),
//!             ..Default::default()
//!         }),
//!         &Integration::core(),
//!     );
//! });
//! assert_eq!(reports.len(), 1);
//! ```
//!
//! # Features
//!
//! * `http`: implements [`RequestInfo`] and [`ResponseInfo`] for the
//!   `http` crate's request and response types.
//! * `debug-logs`: routes diagnostics to the `log` crate instead of stderr.
//! * `test`: enables the [`test`] module.
//!
//! [`apilytics`]: https://crates.io/crates/apilytics

#![warn(missing_docs)]

// macros; these need to be first to be used by other modules
#[macro_use]
mod macros;

mod apikey;
mod client;
mod clientoptions;
mod constants;
mod integration;
mod observation;
mod record;
mod timer;
mod transport;

pub use crate::apikey::{ApiKey, IntoApiKey, ParseApiKeyError};
pub use crate::client::Client;
pub use crate::clientoptions::ClientOptions;
pub use crate::constants::{
    API_KEY_HEADER, CORE_INTEGRATION_NAME, DEFAULT_COLLECTOR_URL, VERSION, VERSION_HEADER,
};
pub use crate::integration::{Integration, IntegrationTag};
pub use crate::observation::{NoResponse, Observation, PendingResponse, RequestInfo, ResponseInfo};
pub use crate::record::{split_path_and_query, MetricsRecord, RawFields, SizeHint};
pub use crate::timer::MilliSecondTimer;
pub use crate::transport::{Report, Transport, TransportFactory};

// test utilities
#[cfg(feature = "test")]
pub mod test;
