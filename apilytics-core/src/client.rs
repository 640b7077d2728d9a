use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::integration::Integration;
use crate::record::MetricsRecord;
use crate::{apilytics_debug, ApiKey, ClientOptions, Report, Transport};

impl<T: Into<ClientOptions>> From<T> for Client {
    fn from(o: T) -> Client {
        Client::with_options(o.into())
    }
}

/// The Apilytics client.
///
/// The client hands finished metrics records to the configured
/// [`Transport`].  It is created once at startup from [`ClientOptions`] and
/// shared by all adapters through an `Arc`; it holds no per-request state.
///
/// # Examples
///
/// ```
/// apilytics_core::Client::from(apilytics_core::ClientOptions::default());
/// ```
pub struct Client {
    options: ClientOptions,
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("enabled", &self.is_enabled())
            .field("options", &self.options)
            .finish()
    }
}

impl Client {
    /// Creates a new client from a config.
    ///
    /// # Supported Configs
    ///
    /// * `ClientOptions`: configure the client with the given client options.
    /// * `()` or empty string: Disable the client.
    /// * `&str` / `String` / `&OsStr` / `OsString`: configure the client with the given API key.
    /// * `(ApiKey, ClientOptions)`: configure the client from the given key and options.
    pub fn from_config<O: Into<ClientOptions>>(opts: O) -> Client {
        Client::with_options(opts.into())
    }

    /// Creates a new client for the given options.
    ///
    /// If the API key on the options is `None`, or no transport factory is
    /// configured, the client will be entirely disabled.
    pub fn with_options(options: ClientOptions) -> Client {
        let transport = match (&options.api_key, &options.transport) {
            (Some(_), Some(factory)) => Some(factory.create_transport(&options)),
            (Some(_), None) => {
                apilytics_debug!(
                    options.debug,
                    "no transport configured, metrics will not be sent"
                );
                None
            }
            (None, _) => None,
        };
        Client { options, transport }
    }

    /// Returns the options of this client.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Returns the API key of this client.
    pub fn api_key(&self) -> Option<&ApiKey> {
        self.options.api_key.as_ref()
    }

    /// Quick check to see if the client is enabled.
    ///
    /// Adapters use this to skip timing and extraction entirely.
    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Sends a record on behalf of `integration`.
    ///
    /// This returns immediately.  Delivery happens in the background and its
    /// outcome, including any failure, never reaches the caller.
    pub fn send_metrics(&self, record: MetricsRecord, integration: &Integration) {
        let (transport, api_key) = match (&self.transport, &self.options.api_key) {
            (Some(transport), Some(api_key)) => (transport, api_key),
            _ => return,
        };
        transport.send_report(Report {
            record,
            api_key: api_key.clone(),
            integration_tag: integration.tag(),
        });
    }

    /// Drains all pending reports without shutting down.
    pub fn flush(&self, timeout: Option<Duration>) -> bool {
        match &self.transport {
            Some(transport) => {
                transport.flush(timeout.unwrap_or(self.options.shutdown_timeout))
            }
            None => true,
        }
    }

    /// Drains pending reports and shuts the transport down.
    ///
    /// If no timeout is provided the client will wait for `shutdown_timeout`.
    pub fn close(&self, timeout: Option<Duration>) -> bool {
        match &self.transport {
            Some(transport) => {
                transport.shutdown(timeout.unwrap_or(self.options.shutdown_timeout))
            }
            None => true,
        }
    }
}
