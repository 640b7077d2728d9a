use std::borrow::Cow;
use std::fmt;

use crate::constants::{CORE_INTEGRATION_NAME, RUNTIME_NAME, RUSTC_VERSION, VERSION};

/// Describes who is sending metrics.
///
/// Adapters pass their own integration so the collector can tell them apart,
/// optionally together with the name and version of the library they are
/// integrated into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Integration {
    name: Cow<'static, str>,
    integrated_library: Option<Cow<'static, str>>,
}

impl Integration {
    /// Creates an integration with the given name, e.g. `apilytics-rust-tower`.
    pub fn new<N: Into<Cow<'static, str>>>(name: N) -> Integration {
        Integration {
            name: name.into(),
            integrated_library: None,
        }
    }

    /// The integration used when the client is called directly.
    pub fn core() -> Integration {
        Integration::new(CORE_INTEGRATION_NAME)
    }

    /// Sets the host library as `name/version`, e.g. `actix-web/4`.
    pub fn with_library<L: Into<Cow<'static, str>>>(mut self, library: L) -> Integration {
        let library = library.into();
        self.integrated_library = if library.is_empty() {
            None
        } else {
            Some(library)
        };
        self
    }

    /// The name of the integration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The integrated host library, if any.
    pub fn integrated_library(&self) -> Option<&str> {
        self.integrated_library.as_deref()
    }

    /// Builds the tag sent in the `Apilytics-Version` header.
    pub fn tag(&self) -> IntegrationTag {
        let mut tag = format!(
            "{}/{};{}/{}",
            self.name,
            VERSION,
            RUNTIME_NAME,
            RUSTC_VERSION.unwrap_or("unknown")
        );
        if let Some(library) = &self.integrated_library {
            tag.push(';');
            tag.push_str(library);
        }
        IntegrationTag(tag)
    }
}

impl Default for Integration {
    fn default() -> Integration {
        Integration::core()
    }
}

/// The value of the `Apilytics-Version` header.
///
/// Formatted as `<integration>/<version>;rust/<rustc version>` followed by
/// `;<library>/<version>` when an integrated library is known.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrationTag(String);

impl IntegrationTag {
    /// The tag as a header value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntegrationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> String {
        format!("rust/{}", RUSTC_VERSION.unwrap_or("unknown"))
    }

    #[test]
    fn test_core_tag() {
        let tag = Integration::core().tag();
        assert_eq!(
            tag.as_str(),
            format!("apilytics-rust-core/{};{}", VERSION, runtime())
        );
    }

    #[test]
    fn test_tag_with_library() {
        let tag = Integration::new("apilytics-rust-actix")
            .with_library("actix-web/4")
            .tag();
        assert_eq!(
            tag.to_string(),
            format!("apilytics-rust-actix/{};{};actix-web/4", VERSION, runtime())
        );
    }

    #[test]
    fn test_empty_library_is_ignored() {
        let integration = Integration::new("custom").with_library("");
        assert_eq!(integration.integrated_library(), None);
        assert_eq!(integration.tag().as_str().matches(';').count(), 1);
    }
}
