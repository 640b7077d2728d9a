use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::apikey::{ApiKey, IntoApiKey};
use crate::constants::DEFAULT_COLLECTOR;
use crate::TransportFactory;

/// Configuration settings for the client.
///
/// Options are built once at startup and never change afterwards; the
/// [`Client`](crate::Client) owns them and adapters share the client.
///
/// # Examples
///
/// ```
/// let _options = apilytics_core::ClientOptions {
///     debug: true,
///     ..Default::default()
/// };
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    /// The API key to use.  If not set the client is effectively disabled.
    pub api_key: Option<ApiKey>,
    /// Enables diagnostics.
    ///
    /// Delivery failures and dropped reports are printed to stderr, or
    /// logged to the `apilytics` logger when the `debug-logs` feature is
    /// enabled.  This should be off in production.
    pub debug: bool,
    /// The endpoint records are posted to.
    pub collector_url: Url,
    /// The transport to use.
    ///
    /// This is typically either a boxed function taking the client options by
    /// reference and returning a `Transport`, a boxed `Arc<Transport>` or
    /// alternatively the `DefaultTransportFactory`.
    pub transport: Option<Arc<dyn TransportFactory>>,
    /// An optional HTTP proxy to use.
    pub http_proxy: Option<Cow<'static, str>>,
    /// An optional HTTPS proxy to use.
    pub https_proxy: Option<Cow<'static, str>>,
    /// The deadline for a single delivery. (defaults to 10 seconds)
    ///
    /// This bounds the background worker only, callers never wait on it.
    pub timeout: Duration,
    /// The timeout on client drop for draining reports on shutdown.
    pub shutdown_timeout: Duration,
}

impl ClientOptions {
    /// Creates new Options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates new Options and immediately configures them.
    pub fn configure<F>(f: F) -> Self
    where
        F: FnOnce(&mut ClientOptions) -> &mut ClientOptions,
    {
        let mut opts = Self::new();
        f(&mut opts);
        opts
    }

    /// Set the API key to use.
    pub fn set_api_key(&mut self, api_key: ApiKey) -> &mut Self {
        self.api_key = Some(api_key);
        self
    }

    /// Enables/disables diagnostics.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Set the collector endpoint.
    pub fn set_collector_url(&mut self, url: Url) -> &mut Self {
        self.collector_url = url;
        self
    }

    /// Set the transport factory.
    pub fn set_transport<T: TransportFactory + 'static>(&mut self, transport: T) -> &mut Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the delivery timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Set the shutdown timeout.
    pub fn set_shutdown_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Debug)]
        struct TransportFactory;

        f.debug_struct("ClientOptions")
            .field("api_key", &self.api_key)
            .field("debug", &self.debug)
            .field("collector_url", &self.collector_url.as_str())
            .field("transport", &TransportFactory)
            .field("http_proxy", &self.http_proxy)
            .field("https_proxy", &self.https_proxy)
            .field("timeout", &self.timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl Default for ClientOptions {
    fn default() -> ClientOptions {
        ClientOptions {
            api_key: None,
            debug: false,
            collector_url: DEFAULT_COLLECTOR.clone(),
            transport: None,
            http_proxy: None,
            https_proxy: None,
            timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

impl<T: IntoApiKey> From<(T, ClientOptions)> for ClientOptions {
    fn from((into_api_key, mut opts): (T, ClientOptions)) -> ClientOptions {
        // a key that cannot be used leaves the client disabled
        opts.api_key = into_api_key.into_api_key().ok().flatten();
        opts
    }
}

impl<T: IntoApiKey> From<T> for ClientOptions {
    fn from(into_api_key: T) -> ClientOptions {
        ClientOptions {
            api_key: into_api_key.into_api_key().ok().flatten(),
            ..ClientOptions::default()
        }
    }
}
