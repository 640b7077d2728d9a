use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Raised if an API key cannot be parsed from a string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseApiKeyError {
    /// Raised if an empty value is parsed.
    #[error("empty or missing api key")]
    EmptyValue,
    /// Raised if the value contains characters that cannot go into a header.
    #[error("api key contains invalid characters")]
    InvalidCharacters,
}

/// The API key of an Apilytics origin.
///
/// The `Debug` output hides the key so it does not end up in diagnostics.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    /// The key as sent in the `X-API-Key` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"***").finish()
    }
}

impl FromStr for ApiKey {
    type Err = ParseApiKeyError;

    fn from_str(s: &str) -> Result<ApiKey, ParseApiKeyError> {
        let key = s.trim();
        if key.is_empty() {
            return Err(ParseApiKeyError::EmptyValue);
        }
        if key.bytes().any(|b| b.is_ascii_control() || !b.is_ascii()) {
            return Err(ParseApiKeyError::InvalidCharacters);
        }
        Ok(ApiKey(key.to_owned()))
    }
}

/// Helper trait to convert a value into an `Option<ApiKey>`.
///
/// The empty string or missing values result in no API key, which disables
/// reporting.
pub trait IntoApiKey {
    /// Converts the value into a `Result<Option<ApiKey>, E>`.
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError>;
}

impl<I: IntoApiKey> IntoApiKey for Option<I> {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        match self {
            Some(into_api_key) => into_api_key.into_api_key(),
            None => Ok(None),
        }
    }
}

impl IntoApiKey for () {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        Ok(None)
    }
}

impl IntoApiKey for &'_ str {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        if self.is_empty() {
            Ok(None)
        } else {
            self.parse().map(Some)
        }
    }
}

impl IntoApiKey for Cow<'_, str> {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        let x: &str = &self;
        x.into_api_key()
    }
}

impl IntoApiKey for &'_ OsStr {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        self.to_string_lossy().into_api_key()
    }
}

impl IntoApiKey for OsString {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        self.as_os_str().into_api_key()
    }
}

impl IntoApiKey for String {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        self.as_str().into_api_key()
    }
}

impl IntoApiKey for &'_ String {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        self.as_str().into_api_key()
    }
}

impl IntoApiKey for &'_ ApiKey {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        Ok(Some(self.clone()))
    }
}

impl IntoApiKey for ApiKey {
    fn into_api_key(self) -> Result<Option<ApiKey>, ParseApiKeyError> {
        Ok(Some(self))
    }
}
