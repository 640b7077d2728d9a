//! This crate provides support for sending API analytics to
//! [Apilytics](https://apilytics.io).
//!
//! Every observed request produces one small metrics record (path, query,
//! method, status code, body sizes, user agent and response time) which is
//! posted to the Apilytics collector from a background thread.  Sending never
//! blocks request handling and failures never reach your application.
//!
//! # Quickstart
//!
//! Create a client with [`init`] and hand it to the adapter of your
//! framework.  The guard returned by [`init`] keeps the transport alive;
//! dropping it flushes pending metrics.
//!
//! ```
//! let apilytics = apilytics::init(std::env::var("APILYTICS_API_KEY").ok());
//! let client = apilytics.client();
//! // e.g. `ApilyticsLayer::new(client)` for tower based frameworks
//! # drop(client);
//! ```
//!
//! Without an API key the client is disabled and the adapters turn into
//! pass-throughs that do nothing at all.
//!
//! # Adapters
//!
//! * `apilytics-tower` (`tower` feature): a [tower] layer for `http` based
//!   stacks such as axum and hyper.
//! * `apilytics-actix` (`actix` feature): a middleware for actix-web.
//!
//! Metrics can also be sent by hand:
//!
//! ```
//! use apilytics::{Integration, MetricsRecord, MilliSecondTimer, RawFields};
//!
//! let apilytics = apilytics::init(());
//! let timer = MilliSecondTimer::start();
//! // ... handle the request
//! apilytics.send_metrics(
//!     MetricsRecord::build(RawFields {
//!         path: "/foo/bar/123",
//!         method: "GET",
//!         status_code: Some(200),
//!         time_millis: timer.stop(),
//!         ..Default::default()
//!     }),
//!     &Integration::core(),
//! );
//! ```
//!
//! # Features
//!
//! * `transport`: enables the default `reqwest` transport with native TLS
//!   (*enabled by default*).
//! * `reqwest`, `ureq`: the available HTTP transports.
//! * `native-tls`, `rustls`: the TLS backend of the transport.
//! * `tower`, `actix`: re-export the adapter crates.
//! * `debug-logs`: send diagnostics to the `log` crate instead of stderr.
//! * `test`: enables the `test` module of the core crate.
//!
//! [tower]: https://crates.io/crates/tower

#![warn(missing_docs)]

mod defaults;
mod init;
pub mod transports;

#[doc(inline)]
pub use apilytics_core::*;

pub use crate::defaults::{apply_defaults, API_KEY_VAR, ENVIRONMENT_VAR};
pub use crate::init::{init, ClientInitGuard};

/// Available adapters for frameworks.
pub mod integrations {
    #[cfg(feature = "actix")]
    #[doc(inline)]
    pub use apilytics_actix as actix;
    #[cfg(feature = "tower")]
    #[doc(inline)]
    pub use apilytics_tower as tower;
}
