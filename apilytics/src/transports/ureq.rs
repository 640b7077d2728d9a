#[cfg(feature = "native-tls")]
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "native-tls")]
use native_tls::TlsConnector;
use ureq::{Agent, AgentBuilder, Proxy};

use super::thread::TransportThread;
use super::TransportError;

use crate::{apilytics_debug, ClientOptions, Report, Transport, API_KEY_HEADER, VERSION_HEADER};

/// A [`Transport`] that sends metrics via the [`ureq`] library.
///
/// This is enabled by the `ureq` feature flag.
///
/// [`ureq`]: https://crates.io/crates/ureq
pub struct UreqHttpTransport {
    thread: TransportThread,
}

impl UreqHttpTransport {
    /// Creates a new Transport.
    pub fn new(options: &ClientOptions) -> Self {
        Self::new_internal(options, None)
    }

    /// Creates a new Transport that uses the specified [`ureq::Agent`].
    pub fn with_agent(options: &ClientOptions, agent: Agent) -> Self {
        Self::new_internal(options, Some(agent))
    }

    fn new_internal(options: &ClientOptions, agent: Option<Agent>) -> Self {
        let debug = options.debug;
        let agent = agent.unwrap_or_else(|| {
            let mut builder = AgentBuilder::new().timeout(options.timeout);

            #[cfg(feature = "native-tls")]
            {
                match TlsConnector::builder().build() {
                    Ok(connector) => {
                        builder = builder.tls_connector(Arc::new(connector));
                    }
                    Err(err) => {
                        apilytics_debug!(debug, "Failed to create tls connector: {}", err);
                    }
                }
            }

            let proxy = match options.collector_url.scheme() {
                "https" => options.https_proxy.as_ref().or(options.http_proxy.as_ref()),
                _ => options.http_proxy.as_ref(),
            };
            if let Some(proxy) = proxy {
                match Proxy::new(proxy) {
                    Ok(proxy) => {
                        builder = builder.proxy(proxy);
                    }
                    Err(err) => {
                        apilytics_debug!(debug, "invalid proxy: {:?}", err);
                    }
                }
            }

            builder.build()
        });
        let url = options.collector_url.to_string();

        let thread = TransportThread::new(debug, move |report| {
            // ureq sets the content length from the body
            let response = agent
                .post(&url)
                .set("Content-Type", "application/json")
                .set(API_KEY_HEADER, report.api_key.as_str())
                .set(VERSION_HEADER, report.integration_tag.as_str())
                .send_bytes(&report.body());

            match response {
                Ok(_) => Ok(()),
                Err(ureq::Error::Status(status, _)) => Err(TransportError::Status(status)),
                Err(ureq::Error::Transport(err)) => Err(Box::new(err).into()),
            }
        });
        Self { thread }
    }
}

impl Transport for UreqHttpTransport {
    fn send_report(&self, report: Report) {
        self.thread.send(report)
    }

    fn flush(&self, timeout: Duration) -> bool {
        self.thread.flush(timeout)
    }

    fn shutdown(&self, timeout: Duration) -> bool {
        self.thread.shutdown(timeout)
    }
}
