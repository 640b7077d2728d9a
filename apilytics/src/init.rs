use std::sync::Arc;

use crate::defaults::apply_defaults;
use crate::{apilytics_debug, Client, ClientOptions};

/// Helper struct that is returned from `init`.
///
/// When this is dropped pending reports are flushed (bounded by the
/// `shutdown_timeout` option) and the transport shuts down.
#[must_use = "when the init guard is dropped the transport will be shut down and no further \
              metrics can be sent.  If you do want to ignore this use mem::forget on it."]
pub struct ClientInitGuard(Arc<Client>);

impl std::ops::Deref for ClientInitGuard {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.0
    }
}

impl ClientInitGuard {
    /// Quick check if the client is enabled.
    pub fn is_enabled(&self) -> bool {
        self.0.is_enabled()
    }

    /// The shared client, to be passed to the adapters.
    pub fn client(&self) -> Arc<Client> {
        self.0.clone()
    }
}

impl Drop for ClientInitGuard {
    fn drop(&mut self) {
        if self.is_enabled() {
            apilytics_debug!(
                self.0.options().debug,
                "dropping client guard -> disposing client"
            );
        }
        self.0.close(None);
    }
}

/// Creates the Apilytics client for a given client config.
///
/// The client is not stored globally: pass [`ClientInitGuard::client`] to
/// the adapter of your framework.  The guard must be kept in scope for as
/// long as metrics should be sent.
///
/// Supported configs are the same as for
/// [`Client::from_config`](crate::Client::from_config): an API key string,
/// `()` or `None` for a disabled client, `ClientOptions`, or a tuple of key
/// and options.  Missing values are filled in by
/// [`apply_defaults`](crate::apply_defaults), which reads
/// `APILYTICS_API_KEY` when no key was given.
///
/// # Examples
///
/// ```
/// let _apilytics = apilytics::init("your-api-key");
/// ```
///
/// Or read everything from the environment:
///
/// ```
/// let apilytics = apilytics::init(());
/// // disabled unless APILYTICS_API_KEY is set
/// let _client = apilytics.client();
/// ```
pub fn init<C>(opts: C) -> ClientInitGuard
where
    C: Into<ClientOptions>,
{
    let opts = apply_defaults(opts.into());
    let client = Arc::new(Client::with_options(opts));
    if client.is_enabled() {
        apilytics_debug!(client.options().debug, "enabled apilytics client");
    } else {
        apilytics_debug!(
            client.options().debug,
            "initialized disabled apilytics client due to missing api key"
        );
    }
    ClientInitGuard(client)
}
