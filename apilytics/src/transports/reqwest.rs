use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Proxy};

use super::tokio_thread::TransportThread;
use super::TransportError;

use crate::{apilytics_debug, ClientOptions, Report, Transport, API_KEY_HEADER, VERSION_HEADER};

/// A [`Transport`] that sends metrics via the [`reqwest`] library.
///
/// When the `transport` feature is enabled this will currently
/// be the default transport.  This is separately enabled by the
/// `reqwest` feature flag.
///
/// [`reqwest`]: https://crates.io/crates/reqwest
pub struct ReqwestHttpTransport {
    thread: TransportThread,
}

impl ReqwestHttpTransport {
    /// Creates a new Transport.
    pub fn new(options: &ClientOptions) -> Self {
        Self::new_internal(options, None)
    }

    /// Creates a new Transport that uses the specified [`ReqwestClient`].
    pub fn with_client(options: &ClientOptions, client: ReqwestClient) -> Self {
        Self::new_internal(options, Some(client))
    }

    fn new_internal(options: &ClientOptions, client: Option<ReqwestClient>) -> Self {
        let debug = options.debug;
        let client = match client {
            Some(client) => Ok(client),
            None => build_client(options),
        };
        if let Err(err) = &client {
            apilytics_debug!(debug, "Failed to create http client: {}", err);
        }
        let url = options.collector_url.clone();

        let thread = TransportThread::new(debug, move |report| {
            let body = report.body();
            // NOTE: because of lifetime issues, building the request using the
            // `client` has to happen outside of this async block.
            let request = client.as_ref().ok().map(|client| {
                client
                    .post(url.clone())
                    .header(CONTENT_TYPE, "application/json")
                    .header(CONTENT_LENGTH, body.len())
                    .header(API_KEY_HEADER, report.api_key.as_str())
                    .header(VERSION_HEADER, report.integration_tag.as_str())
                    .body(body)
            });

            async move {
                let request = request
                    .ok_or_else(|| TransportError::Unavailable("no http client".into()))?;
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(TransportError::Status(status.as_u16()));
                }
                Ok(())
            }
        });
        Self { thread }
    }
}

fn build_client(options: &ClientOptions) -> Result<ReqwestClient, TransportError> {
    let mut builder = ReqwestClient::builder().timeout(options.timeout);
    if let Some(url) = options.http_proxy.as_ref() {
        match Proxy::http(url.as_ref()) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(err) => apilytics_debug!(options.debug, "invalid proxy: {}", err),
        }
    };
    if let Some(url) = options.https_proxy.as_ref() {
        match Proxy::https(url.as_ref()) {
            Ok(proxy) => builder = builder.proxy(proxy),
            Err(err) => apilytics_debug!(options.debug, "invalid proxy: {}", err),
        }
    };
    builder
        .build()
        .map_err(|err| TransportError::Unavailable(err.to_string()))
}

impl Transport for ReqwestHttpTransport {
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
