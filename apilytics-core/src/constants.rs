/// The version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name reported for direct use of the core client.
pub const CORE_INTEGRATION_NAME: &str = "apilytics-rust-core";

/// The runtime name reported in the integration tag.
pub const RUNTIME_NAME: &str = "rust";

/// The collector endpoint metrics are posted to.
pub const DEFAULT_COLLECTOR_URL: &str = "https://www.apilytics.io/api/v1/middleware";

/// The header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// The header carrying the integration tag.
pub const VERSION_HEADER: &str = "Apilytics-Version";

include!(concat!(env!("OUT_DIR"), "/constants.gen.rs"));

lazy_static::lazy_static! {
    pub static ref DEFAULT_COLLECTOR: url::Url = DEFAULT_COLLECTOR_URL.parse().unwrap();
}
