use crate::record::{MetricsRecord, RawFields, SizeHint};
use crate::timer::MilliSecondTimer;

/// Read access to the parts of an incoming request that end up in a record.
///
/// Implementations must never panic; anything that cannot be determined is
/// returned as `None`.
pub trait RequestInfo {
    /// The request method, e.g. `GET`.
    fn method(&self) -> &str;

    /// The request path without the query string.
    fn path(&self) -> &str;

    /// The raw query string, with or without a leading `?`.
    fn query(&self) -> Option<&str>;

    /// A hint for the size of the request body.
    fn size_hint(&self) -> Option<SizeHint<'_>>;

    /// The value of the `User-Agent` header.
    fn user_agent(&self) -> Option<&str>;
}

/// Read access to the parts of an outgoing response that end up in a record.
pub trait ResponseInfo {
    /// The status code of the response.
    fn status_code(&self) -> Option<u16>;

    /// A hint for the size of the response body.
    fn size_hint(&self) -> Option<SizeHint<'_>>;
}

impl<T: RequestInfo + ?Sized> RequestInfo for &T {
    fn method(&self) -> &str {
        (**self).method()
    }

    fn path(&self) -> &str {
        (**self).path()
    }

    fn query(&self) -> Option<&str> {
        (**self).query()
    }

    fn size_hint(&self) -> Option<SizeHint<'_>> {
        (**self).size_hint()
    }

    fn user_agent(&self) -> Option<&str> {
        (**self).user_agent()
    }
}

impl<T: ResponseInfo + ?Sized> ResponseInfo for &T {
    fn status_code(&self) -> Option<u16> {
        (**self).status_code()
    }

    fn size_hint(&self) -> Option<SizeHint<'_>> {
        (**self).size_hint()
    }
}

/// The in-flight observation of one request.
///
/// An observation is started when request handling begins and snapshots the
/// request fields, since adapters usually have to hand the request itself to
/// the inner handler.  [`finish`](Observation::finish) consumes the
/// observation, so at most one record can be produced per request.
#[derive(Debug)]
pub struct Observation {
    timer: MilliSecondTimer,
    method: String,
    path: String,
    query: Option<String>,
    request_size: Option<u64>,
    user_agent: Option<String>,
}

impl Observation {
    /// Starts the timer and captures the request fields.
    pub fn start<R: RequestInfo + ?Sized>(request: &R) -> Observation {
        let timer = MilliSecondTimer::start();
        Observation {
            timer,
            method: request.method().to_owned(),
            path: request.path().to_owned(),
            query: request.query().map(str::to_owned),
            request_size: request.size_hint().and_then(SizeHint::to_bytes),
            user_agent: request.user_agent().map(str::to_owned),
        }
    }

    /// Stops the timer and builds the record.
    ///
    /// `response` is `None` when the handler failed before a response was
    /// produced, which leaves the status code and response size absent.
    pub fn finish<S: ResponseInfo + ?Sized>(self, response: Option<&S>) -> MetricsRecord {
        let time_millis = self.timer.stop();
        self.finish_with_time(response, time_millis)
    }

    pub(crate) fn finish_with_time<S: ResponseInfo + ?Sized>(
        self,
        response: Option<&S>,
        time_millis: u64,
    ) -> MetricsRecord {
        self.build(
            response.and_then(|r| r.status_code()),
            response.and_then(|r| r.size_hint()),
            time_millis,
        )
    }

    /// Captures the response head while its body is still being sent.
    ///
    /// The timer keeps running until [`PendingResponse::finish`].
    pub fn respond<S: ResponseInfo + ?Sized>(self, response: &S) -> PendingResponse {
        PendingResponse {
            status_code: response.status_code(),
            declared_size: response.size_hint().and_then(SizeHint::to_bytes),
            sent: 0,
            observation: self,
        }
    }

    fn build(
        self,
        status_code: Option<u16>,
        response_size: Option<SizeHint<'_>>,
        time_millis: u64,
    ) -> MetricsRecord {
        MetricsRecord::build(RawFields {
            path: &self.path,
            query: self.query.as_deref(),
            method: &self.method,
            status_code,
            request_size: self.request_size.map(SizeHint::Exact),
            response_size,
            user_agent: self.user_agent.as_deref(),
            time_millis,
        })
    }
}

/// An observation whose response body is still being sent.
///
/// Adapters wrap the response body, count the bytes that pass through it and
/// call [`finish`](PendingResponse::finish) at the end of the stream, or when
/// the body is dropped early.
#[derive(Debug)]
pub struct PendingResponse {
    observation: Observation,
    status_code: Option<u16>,
    declared_size: Option<u64>,
    sent: u64,
}

impl PendingResponse {
    /// Counts `bytes` more bytes of the body as sent.
    pub fn add_sent(&mut self, bytes: u64) {
        self.sent = self.sent.saturating_add(bytes);
    }

    /// The number of body bytes counted so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Stops the timer and builds the record.
    ///
    /// The response size is the declared size of the body.  Without one, the
    /// counted bytes are used if the body `completed`, otherwise the size is
    /// absent.
    pub fn finish(self, completed: bool) -> MetricsRecord {
        let time_millis = self.observation.timer.stop();
        self.finish_with_time(completed, time_millis)
    }

    pub(crate) fn finish_with_time(self, completed: bool, time_millis: u64) -> MetricsRecord {
        let response_size = self
            .declared_size
            .or(if completed { Some(self.sent) } else { None });
        self.observation.build(
            self.status_code,
            response_size.map(SizeHint::Exact),
            time_millis,
        )
    }
}

/// A response that produced no information, for handlers that failed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoResponse;

impl ResponseInfo for NoResponse {
    fn status_code(&self) -> Option<u16> {
        None
    }

    fn size_hint(&self) -> Option<SizeHint<'_>> {
        None
    }
}

#[cfg(feature = "http")]
mod http_impls {
    use http::header::{CONTENT_LENGTH, USER_AGENT};
    use http::{HeaderMap, Request, Response};
    use http_body::Body;

    use super::{RequestInfo, ResponseInfo};
    use crate::record::SizeHint;

    fn content_length(headers: &HeaderMap) -> Option<SizeHint<'_>> {
        headers
            .get(CONTENT_LENGTH)
            .map(|value| SizeHint::Header(value.as_bytes()))
    }

    fn body_size<B: Body>(body: &B) -> Option<SizeHint<'static>> {
        body.size_hint().exact().map(SizeHint::Exact)
    }

    impl<B: Body> RequestInfo for Request<B> {
        fn method(&self) -> &str {
            self.method().as_str()
        }

        fn path(&self) -> &str {
            self.uri().path()
        }

        fn query(&self) -> Option<&str> {
            self.uri().query()
        }

        fn size_hint(&self) -> Option<SizeHint<'_>> {
            content_length(self.headers()).or_else(|| body_size(self.body()))
        }

        fn user_agent(&self) -> Option<&str> {
            self.headers()
                .get(USER_AGENT)
                .and_then(|value| value.to_str().ok())
        }
    }

    impl<B: Body> ResponseInfo for Response<B> {
        fn status_code(&self) -> Option<u16> {
            Some(self.status().as_u16())
        }

        fn size_hint(&self) -> Option<SizeHint<'_>> {
            content_length(self.headers()).or_else(|| body_size(self.body()))
        }
    }
}
