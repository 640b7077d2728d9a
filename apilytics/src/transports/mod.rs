//! The provided transports.
//!
//! This module exposes all transports that are compiled into the apilytics
//! library.  The `reqwest` and `ureq` features turn on these transports.

use std::sync::Arc;

use thiserror::Error;

use crate::{ClientOptions, Transport, TransportFactory};

#[cfg(feature = "ureq")]
mod thread;
#[cfg(feature = "reqwest")]
mod tokio_thread;

#[cfg(feature = "reqwest")]
mod reqwest;
#[cfg(feature = "reqwest")]
pub use self::reqwest::ReqwestHttpTransport;

#[cfg(feature = "ureq")]
mod ureq;
#[cfg(feature = "ureq")]
pub use self::ureq::UreqHttpTransport;

#[cfg(feature = "reqwest")]
type DefaultTransport = ReqwestHttpTransport;

#[cfg(all(feature = "ureq", not(feature = "reqwest")))]
type DefaultTransport = UreqHttpTransport;

/// The default http transport.
#[cfg(apilytics_any_http_transport)]
pub type HttpTransport = DefaultTransport;

/// The maximum number of reports waiting for the background worker.
///
/// Reports beyond this are dropped instead of blocking the caller.
pub(crate) const QUEUE_SIZE: usize = 64;

/// Why a report did not reach the collector.
///
/// These errors never leave the transport; they only show up as
/// diagnostics when `debug` is enabled on the client options.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be performed (DNS, connect, TLS, timeout).
    #[cfg(feature = "reqwest")]
    #[error("request failed: {0}")]
    Reqwest(#[from] ::reqwest::Error),
    /// The request could not be performed (DNS, connect, TLS, timeout).
    #[cfg(feature = "ureq")]
    #[error("request failed: {0}")]
    Ureq(#[from] Box<::ureq::Transport>),
    /// The collector answered with a non-success status code.
    #[error("collector responded with status {0}")]
    Status(u16),
    /// The HTTP client could not be created.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Creates the default HTTP transport.
///
/// This is the default value for `transport` on the client options.  It
/// creates a `HttpTransport`.  If no http transport was compiled into the
/// library the client stays disabled.
#[derive(Clone)]
pub struct DefaultTransportFactory;

impl TransportFactory for DefaultTransportFactory {
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        #[cfg(apilytics_any_http_transport)]
        {
            Arc::new(HttpTransport::new(options))
        }
        #[cfg(not(apilytics_any_http_transport))]
        {
            crate::apilytics_debug!(
                options.debug,
                "apilytics crate was compiled without transport, metrics are discarded"
            );
            Arc::new(NoopTransport)
        }
    }
}

#[cfg(not(apilytics_any_http_transport))]
struct NoopTransport;

#[cfg(not(apilytics_any_http_transport))]
impl Transport for NoopTransport {
    fn send_report(&self, report: crate::Report) {
        let _report = report;
    }
}
