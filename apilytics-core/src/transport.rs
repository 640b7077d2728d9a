use std::sync::Arc;
use std::time::Duration;

use crate::apikey::ApiKey;
use crate::integration::IntegrationTag;
use crate::record::MetricsRecord;
use crate::ClientOptions;

/// Everything a transport needs to deliver one record.
#[derive(Clone, Debug)]
pub struct Report {
    /// The record to send.
    pub record: MetricsRecord,
    /// The API key of the origin.
    pub api_key: ApiKey,
    /// The value of the `Apilytics-Version` header.
    pub integration_tag: IntegrationTag,
}

impl Report {
    /// The serialized request body.
    pub fn body(&self) -> Vec<u8> {
        self.record.to_json()
    }
}

/// The trait for transports.
///
/// A transport is responsible for sending reports to the collector.
/// Implementations must not block the caller of
/// [`send_report`](Transport::send_report) on network I/O and must never
/// panic or surface delivery failures to it.
pub trait Transport: Send + Sync + 'static {
    /// Hands a report over for delivery.
    fn send_report(&self, report: Report);

    /// Waits up to `timeout` for queued reports to be sent.
    ///
    /// Returns `true` if the queue was drained in time.
    fn flush(&self, timeout: Duration) -> bool {
        let _timeout = timeout;
        true
    }

    /// Instructs the transport to shut down, flushing first.
    fn shutdown(&self, timeout: Duration) -> bool {
        self.flush(timeout)
    }
}

/// A factory creating transport instances.
///
/// Because options are potentially reused between different clients the
/// options do not actually contain a transport but a factory object that
/// can create transports instead.
///
/// The factory has a single method that creates a new arced transport.
/// Because transports can be wrapped in `Arc`s and those are clonable
/// any `Arc<Transport>` is also a valid transport factory.  This for
/// instance lets you put a `Arc<TestTransport>` directly into the options.
///
/// This is automatically implemented for all closures optionally taking
/// options and returning a boxed factory.
pub trait TransportFactory: Send + Sync {
    /// Given some options creates a transport.
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn(&ClientOptions) -> Arc<dyn Transport> + Clone + Send + Sync + 'static,
{
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        (*self)(options)
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn send_report(&self, report: Report) {
        (**self).send_report(report)
    }

    fn flush(&self, timeout: Duration) -> bool {
        (**self).flush(timeout)
    }

    fn shutdown(&self, timeout: Duration) -> bool {
        (**self).shutdown(timeout)
    }
}

impl<T: Transport> TransportFactory for Arc<T> {
    fn create_transport(&self, options: &ClientOptions) -> Arc<dyn Transport> {
        let _options = options;
        self.clone()
    }
}
