use serde::Serialize;

/// A size hint for a request or response body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeHint<'a> {
    /// The exact number of bytes is known.
    Exact(u64),
    /// A raw header value, usually `Content-Length`.
    Header(&'a [u8]),
}

impl SizeHint<'_> {
    /// Parses the hint into a byte count.
    ///
    /// Anything that is not a plain non-negative integer yields `None`.
    pub fn to_bytes(self) -> Option<u64> {
        match self {
            SizeHint::Exact(bytes) => Some(bytes),
            SizeHint::Header(raw) => {
                let value = std::str::from_utf8(raw).ok()?.trim();
                if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                value.parse().ok()
            }
        }
    }
}

impl<'a> From<&'a str> for SizeHint<'a> {
    fn from(value: &'a str) -> Self {
        SizeHint::Header(value.as_bytes())
    }
}

impl From<u64> for SizeHint<'_> {
    fn from(value: u64) -> Self {
        SizeHint::Exact(value)
    }
}

/// The raw, unvalidated observation of one request/response cycle.
///
/// This is the input of [`MetricsRecord::build`].  All optional values may be
/// missing, empty or malformed; the builder normalizes them.
#[derive(Clone, Debug, Default)]
pub struct RawFields<'a> {
    /// Path of the request.
    ///
    /// A full request target is accepted as well; its query string is used
    /// when `query` is `None`.
    pub path: &'a str,
    /// Raw query string, with or without the leading `?`.
    pub query: Option<&'a str>,
    /// The request method, e.g. `GET`.
    pub method: &'a str,
    /// Status code of the sent response, if one was produced.
    pub status_code: Option<u16>,
    /// Size hint of the request body.
    pub request_size: Option<SizeHint<'a>>,
    /// Size hint of the response body.
    pub response_size: Option<SizeHint<'a>>,
    /// Value of the `User-Agent` request header.
    pub user_agent: Option<&'a str>,
    /// Time in milliseconds it took to respond.
    pub time_millis: u64,
}

/// The metrics of one request/response cycle as sent to the collector.
///
/// Records can only be created through [`MetricsRecord::build`] and cannot be
/// modified afterwards.  Absent fields are omitted from the JSON encoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<String>,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_agent: Option<String>,
    time_millis: u64,
}

impl MetricsRecord {
    /// Builds a normalized record from raw fields.
    ///
    /// This never fails: every optional field that is empty or cannot be
    /// parsed ends up absent.  The path never contains a query string or
    /// fragment, see [`split_path_and_query`].
    ///
    /// # Examples
    ///
    /// ```
    /// use apilytics_core::{MetricsRecord, RawFields};
    ///
    /// let record = MetricsRecord::build(RawFields {
    ///     path: "/foo/bar/123",
    ///     query: Some("?a=1"),
    ///     method: "GET",
    ///     status_code: Some(200),
    ///     time_millis: 42,
    ///     ..Default::default()
    /// });
    /// assert_eq!(record.query(), Some("a=1"));
    /// assert_eq!(record.request_size(), None);
    /// ```
    pub fn build(raw: RawFields<'_>) -> MetricsRecord {
        let (path, target_query) = split_path_and_query(raw.path);
        MetricsRecord {
            path: path.to_owned(),
            query: raw
                .query
                .or(target_query)
                .and_then(normalize_query)
                .map(str::to_owned),
            method: raw.method.to_owned(),
            status_code: raw.status_code,
            request_size: raw.request_size.and_then(SizeHint::to_bytes),
            response_size: raw.response_size.and_then(SizeHint::to_bytes),
            user_agent: raw
                .user_agent
                .filter(|ua| !ua.is_empty())
                .map(str::to_owned),
            time_millis: raw.time_millis,
        }
    }

    /// Path of the request.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query string of the request without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Method of the request.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Status code of the response.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Size of the request body in bytes.
    pub fn request_size(&self) -> Option<u64> {
        self.request_size
    }

    /// Size of the response body in bytes.
    pub fn response_size(&self) -> Option<u64> {
        self.response_size
    }

    /// The `User-Agent` of the request.
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Time in milliseconds it took to respond.
    pub fn time_millis(&self) -> u64 {
        self.time_millis
    }

    /// Serializes the record into its JSON wire format.
    pub fn to_json(&self) -> Vec<u8> {
        // only strings and integers, serialization cannot fail
        serde_json::to_vec(self).unwrap_or_default()
    }
}

fn normalize_query(query: &str) -> Option<&str> {
    if query.is_empty() {
        None
    } else {
        Some(query.strip_prefix('?').unwrap_or(query))
    }
}

/// Splits a request target into its path and query string.
///
/// Accepts origin-form (`/foo?a=1`) and absolute-form
/// (`https://host/foo?a=1`) targets.  Fragments are dropped and an empty
/// path becomes `/`.
///
/// ```
/// use apilytics_core::split_path_and_query;
///
/// assert_eq!(split_path_and_query("/foo?a=1"), ("/foo", Some("a=1")));
/// assert_eq!(split_path_and_query("http://_/"), ("/", None));
/// ```
pub fn split_path_and_query(target: &str) -> (&str, Option<&str>) {
    let target = match target.find('#') {
        Some(idx) => &target[..idx],
        None => target,
    };
    let target = match target.find("://") {
        Some(idx) if !target[..idx].contains(['/', '?']) => {
            let rest = &target[idx + 3..];
            match rest.find(['/', '?']) {
                Some(start) => &rest[start..],
                None => "",
            }
        }
        _ => target,
    };
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };
    (if path.is_empty() { "/" } else { path }, query)
}
