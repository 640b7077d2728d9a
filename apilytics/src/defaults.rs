use std::borrow::Cow;
use std::env;
use std::sync::Arc;

use crate::transports::DefaultTransportFactory;
use crate::ClientOptions;

/// The environment variable holding the API key.
pub const API_KEY_VAR: &str = "APILYTICS_API_KEY";

/// The environment variable naming the deployment environment.
pub const ENVIRONMENT_VAR: &str = "APILYTICS_ENVIRONMENT";

/// Apply default client options.
///
/// Extends the given `ClientOptions` with default options such as a default
/// transport, an API key and the diagnostics flag from the environment, and
/// proxy settings.
///
/// The following environment variables are read:
///
/// - `APILYTICS_API_KEY`: used when no API key was set explicitly.
/// - `APILYTICS_ENVIRONMENT`: diagnostics are disabled when this is
///   `production`.  If unset, debug builds enable diagnostics and release
///   builds disable them.  Only applies when `debug` was not turned on
///   explicitly.
/// - `HTTP_PROXY` / `HTTPS_PROXY` (and lowercase variants).
///
/// # Examples
/// ```
/// std::env::set_var("APILYTICS_ENVIRONMENT", "production");
/// let opts = apilytics::ClientOptions::default();
/// let opts = apilytics::apply_defaults(opts);
/// assert!(!opts.debug);
/// assert!(opts.transport.is_some());
/// ```
pub fn apply_defaults(mut opts: ClientOptions) -> ClientOptions {
    if opts.transport.is_none() {
        opts.transport = Some(Arc::new(DefaultTransportFactory));
    }
    if opts.api_key.is_none() {
        opts.api_key = env::var(API_KEY_VAR)
            .ok()
            .and_then(|key| key.parse().ok());
    }
    if !opts.debug {
        opts.debug = !is_production(env::var(ENVIRONMENT_VAR).ok().as_deref());
    }
    if opts.http_proxy.is_none() {
        opts.http_proxy = env::var("HTTP_PROXY")
            .ok()
            .map(Cow::Owned)
            .or_else(|| env::var("http_proxy").ok().map(Cow::Owned));
    }
    if opts.https_proxy.is_none() {
        opts.https_proxy = env::var("HTTPS_PROXY")
            .ok()
            .map(Cow::Owned)
            .or_else(|| env::var("https_proxy").ok().map(Cow::Owned))
            .or_else(|| opts.http_proxy.clone());
    }
    opts
}

/// Whether the process runs in production, which suppresses diagnostics.
fn is_production(environment: Option<&str>) -> bool {
    match environment {
        Some(environment) => environment.trim().eq_ignore_ascii_case("production"),
        None => !cfg!(debug_assertions),
    }
}
