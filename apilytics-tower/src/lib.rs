//! Adds Apilytics metrics for every request handled by a Tower service built
//! on the [`http`] crate's request and response types, e.g. with `axum`,
//! `hyper` or `tonic`.
//!
//! # Examples
//!
//! ```rust
//! # use std::sync::Arc;
//! # type Request = http::Request<String>;
//! # type Response = http::Response<String>;
//! use apilytics_tower::ApilyticsLayer;
//! use tower::ServiceBuilder;
//!
//! let client = Arc::new(apilytics_core::Client::from("your-api-key"));
//!
//! let service = ServiceBuilder::new()
//!     .layer(ApilyticsLayer::new(client))
//!     .service_fn(|req: Request| async move {
//!         Ok::<_, std::convert::Infallible>(Response::new(format!("hello {}", req.uri())))
//!     });
//! # drop(service);
//! ```
//!
//! The layer only observes: the request, the response and any error of the
//! inner service pass through unchanged.  The response body is wrapped in an
//! [`ApilyticsBody`] and one record is sent once the body has been fully
//! sent, so streamed responses are timed until their last frame.  A body that
//! is dropped early still produces its record.  If the inner future fails the
//! record is sent right away without a status code, and if the future is
//! dropped before completing nothing is sent.
//!
//! Constructing the layer without a client, or with a client that has no API
//! key, turns it into a pass-through that does no work at all.
//!
//! When using `axum`, add the layer last so that it wraps all routes:
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/", get(handler))
//!     .layer(ApilyticsLayer::new(apilytics.client()));
//! ```

#![warn(missing_docs)]

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use apilytics_core::{Client, Integration, NoResponse, Observation, PendingResponse};
use bytes::Buf;
use http::{Request, Response};
use http_body::{Body, Frame, SizeHint};
use tower_layer::Layer;
use tower_service::Service;

/// The integration name reported by this adapter.
pub const INTEGRATION_NAME: &str = "apilytics-rust-tower";

struct Reporter {
    client: Arc<Client>,
    integration: Integration,
}

/// Tower layer that sends metrics for each request made.
#[derive(Clone)]
pub struct ApilyticsLayer {
    reporter: Option<Arc<Reporter>>,
}

impl ApilyticsLayer {
    /// Creates a new layer reporting through `client`.
    ///
    /// Passing `None`, or a client that is not enabled, creates a layer that
    /// does nothing.
    pub fn new<C: Into<Option<Arc<Client>>>>(client: C) -> Self {
        let reporter = client
            .into()
            .filter(|client| client.is_enabled())
            .map(|client| {
                Arc::new(Reporter {
                    client,
                    integration: Integration::new(INTEGRATION_NAME),
                })
            });
        Self { reporter }
    }

    /// Reports the framework the layer is used in, as `name/version`.
    ///
    /// ```
    /// # let client = std::sync::Arc::new(apilytics_core::Client::from(()));
    /// let layer = apilytics_tower::ApilyticsLayer::new(client).with_library("axum/0.8");
    /// # drop(layer);
    /// ```
    pub fn with_library<L: Into<Cow<'static, str>>>(mut self, library: L) -> Self {
        if let Some(reporter) = self.reporter.take() {
            self.reporter = Some(Arc::new(Reporter {
                client: reporter.client.clone(),
                integration: reporter.integration.clone().with_library(library),
            }));
        }
        self
    }

    /// Whether this layer sends any metrics.
    pub fn is_enabled(&self) -> bool {
        self.reporter.is_some()
    }
}

impl<S> Layer<S> for ApilyticsLayer {
    type Service = ApilyticsService<S>;

    fn layer(&self, service: S) -> Self::Service {
        ApilyticsService {
            service,
            reporter: self.reporter.clone(),
        }
    }
}

/// Tower service that sends metrics for each request made.
#[derive(Clone)]
pub struct ApilyticsService<S> {
    service: S,
    reporter: Option<Arc<Reporter>>,
}

/// The Future returned from [`ApilyticsService`].
#[pin_project::pin_project]
pub struct ApilyticsFuture<F> {
    observation: Option<(Observation, Arc<Reporter>)>,
    #[pin]
    future: F,
}

impl<F, ResBody, Error> Future for ApilyticsFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, Error>>,
    ResBody: Body,
{
    type Output = Result<Response<ApilyticsBody<ResBody>>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let slf = self.project();
        match slf.future.poll(cx) {
            Poll::Ready(Ok(response)) => {
                let completion = slf.observation.take().map(|(observation, reporter)| Completion {
                    pending: Some(observation.respond(&response)),
                    reporter,
                });
                Poll::Ready(Ok(
                    response.map(|inner| ApilyticsBody { inner, completion })
                ))
            }
            Poll::Ready(Err(err)) => {
                if let Some((observation, reporter)) = slf.observation.take() {
                    let record = observation.finish(None::<&NoResponse>);
                    reporter
                        .client
                        .send_metrics(record, &reporter.integration);
                }
                Poll::Ready(Err(err))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ApilyticsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ReqBody: Body,
    ResBody: Body,
{
    type Response = Response<ApilyticsBody<ResBody>>;
    type Error = S::Error;
    type Future = ApilyticsFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let observation = self
            .reporter
            .as_ref()
            .map(|reporter| (Observation::start(&request), reporter.clone()));

        ApilyticsFuture {
            observation,
            future: self.service.call(request),
        }
    }
}

/// Sends the record of a response once, at the end of its body or on drop.
struct Completion {
    pending: Option<PendingResponse>,
    reporter: Arc<Reporter>,
}

impl Completion {
    fn finish(&mut self, completed: bool) {
        if let Some(pending) = self.pending.take() {
            self.reporter
                .client
                .send_metrics(pending.finish(completed), &self.reporter.integration);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.finish(false);
    }
}

/// The response body returned from [`ApilyticsService`].
///
/// Frames pass through unchanged.  The record of the request is sent when
/// the inner body reaches its end, fails, or when this body is dropped.
#[pin_project::pin_project]
pub struct ApilyticsBody<B> {
    #[pin]
    inner: B,
    completion: Option<Completion>,
}

impl<B> ApilyticsBody<B> {
    /// Unwraps the inner body.
    ///
    /// The record is sent right away, as if the body had been dropped.
    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: Body> Body for ApilyticsBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut slf = self.project();
        let frame = match slf.inner.as_mut().poll_frame(cx) {
            Poll::Ready(frame) => frame,
            Poll::Pending => return Poll::Pending,
        };
        if let Some(completion) = slf.completion {
            match &frame {
                Some(Ok(frame)) => {
                    if let Some(pending) = completion.pending.as_mut() {
                        if let Some(data) = frame.data_ref() {
                            pending.add_sent(data.remaining() as u64);
                        }
                    }
                    if slf.inner.is_end_stream() {
                        completion.finish(true);
                    }
                }
                Some(Err(_)) => completion.finish(false),
                None => completion.finish(true),
            }
        }
        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use apilytics_core::test::TestTransport;
    use apilytics_core::ClientOptions;
    use bytes::Bytes;
    use tower::{ServiceBuilder, ServiceExt};

    use super::*;

    fn test_client() -> (Arc<Client>, Arc<TestTransport>) {
        let transport = TestTransport::new();
        let client = Client::from((
            "test-key",
            ClientOptions {
                transport: Some(Arc::new(transport.clone())),
                ..Default::default()
            },
        ));
        (Arc::new(client), transport)
    }

    fn request(uri: &str) -> Request<String> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(String::new())
            .unwrap()
    }

    /// A body of unknown length that yields its chunks one by one.
    struct Chunks(VecDeque<&'static str>);

    impl Body for Chunks {
        type Data = Bytes;
        type Error = Infallible;

        fn poll_frame(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
            Poll::Ready(
                self.0
                    .pop_front()
                    .map(|chunk| Ok(Frame::data(Bytes::from_static(chunk.as_bytes())))),
            )
        }
    }

    async fn next_frame<B: Body + Unpin>(body: &mut B) -> Option<usize> {
        let frame = std::future::poll_fn(|cx| Pin::new(&mut *body).poll_frame(cx)).await?;
        Some(
            frame
                .ok()
                .and_then(|frame| frame.into_data().ok())
                .map_or(0, |data| data.remaining()),
        )
    }

    async fn read_body<B: Body + Unpin>(mut body: B) -> usize {
        let mut len = 0;
        while let Some(frame_len) = next_frame(&mut body).await {
            len += frame_len;
        }
        len
    }

    #[tokio::test]
    async fn test_reports_get_request() {
        let (client, transport) = test_client();
        let service = ServiceBuilder::new()
            .layer(ApilyticsLayer::new(client))
            .service_fn(|_req: Request<String>| async move {
                Ok::<_, Infallible>(
                    Response::builder()
                        .status(200)
                        .header("content-length", "0")
                        .body(String::new())
                        .unwrap(),
                )
            });

        let response = service.oneshot(request("/foo/bar/123")).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(read_body(response.into_body()).await, 0);

        let reports = transport.fetch_and_clear_reports();
        assert_eq!(reports.len(), 1);
        let record = &reports[0].record;
        assert_eq!(record.path(), "/foo/bar/123");
        assert_eq!(record.method(), "GET");
        assert_eq!(record.status_code(), Some(200));
        assert_eq!(record.query(), None);
        assert_eq!(record.user_agent(), None);
        assert_eq!(record.response_size(), Some(0));
        assert!(reports[0]
            .integration_tag
            .as_str()
            .starts_with("apilytics-rust-tower/"));
    }

    #[tokio::test]
    async fn test_reports_all_fields() {
        let (client, transport) = test_client();
        let service = ServiceBuilder::new()
            .layer(ApilyticsLayer::new(client).with_library("axum/0.8"))
            .service_fn(|req: Request<String>| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, Infallible>(
                    Response::builder()
                        .status(201)
                        .body(req.into_body())
                        .unwrap(),
                )
            });

        let request = Request::builder()
            .method("POST")
            .uri("/api/items?page=2")
            .header("user-agent", "test-agent/1.0")
            .header("content-length", "11")
            .body(String::from("hello world"))
            .unwrap();
        let response = service.oneshot(request).await.unwrap();
        assert_eq!(read_body(response.into_body()).await, 11);

        let reports = transport.fetch_and_clear_reports();
        assert_eq!(reports.len(), 1);
        let record = &reports[0].record;
        assert_eq!(record.path(), "/api/items");
        assert_eq!(record.query(), Some("page=2"));
        assert_eq!(record.method(), "POST");
        assert_eq!(record.status_code(), Some(201));
        assert_eq!(record.request_size(), Some(11));
        assert_eq!(record.response_size(), Some(11));
        assert_eq!(record.user_agent(), Some("test-agent/1.0"));
        assert!(record.time_millis() >= 5);
        assert!(reports[0].integration_tag.as_str().ends_with(";axum/0.8"));
    }

    #[tokio::test]
    async fn test_streamed_body_reports_at_end() {
        let (client, transport) = test_client();
        let service = ServiceBuilder::new()
            .layer(ApilyticsLayer::new(client))
            .service_fn(|_req: Request<String>| async move {
                Ok::<_, Infallible>(Response::new(Chunks(VecDeque::from([
                    "hello ", "streamed ", "world",
                ]))))
            });

        let response = service.oneshot(request("/stream")).await.unwrap();
        let mut body = response.into_body();
        assert_eq!(next_frame(&mut body).await, Some(6));
        assert!(transport.fetch_and_clear_reports().is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(read_body(body).await, 14);

        let reports = transport.fetch_and_clear_reports();
        assert_eq!(reports.len(), 1);
        let record = &reports[0].record;
        assert_eq!(record.status_code(), Some(200));
        assert_eq!(record.response_size(), Some(20));
        assert!(record.time_millis() >= 20);
    }

    #[tokio::test]
    async fn test_dropped_body_reports_once() {
        let (client, transport) = test_client();
        let service = ServiceBuilder::new()
            .layer(ApilyticsLayer::new(client))
            .service_fn(|_req: Request<String>| async move {
                Ok::<_, Infallible>(Response::new(Chunks(VecDeque::from(["partial", "rest"]))))
            });

        let response = service.oneshot(request("/aborted")).await.unwrap();
        let mut body = response.into_body();
        assert_eq!(next_frame(&mut body).await, Some(7));
        drop(body);

        let reports = transport.fetch_and_clear_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].record.status_code(), Some(200));
        // the length of an aborted stream is unknown
        assert_eq!(reports[0].record.response_size(), None);
    }

    #[tokio::test]
    async fn test_failed_service_has_no_status() {
        let (client, transport) = test_client();
        let service = ServiceBuilder::new()
            .layer(ApilyticsLayer::new(client))
            .service_fn(|_req: Request<String>| async move {
                Err::<Response<String>, _>("handler failed")
            });

        let res = service.oneshot(request("/broken")).await;
        assert_eq!(res.err(), Some("handler failed"));

        let reports = transport.fetch_and_clear_reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].record.status_code(), None);
        assert_eq!(reports[0].record.response_size(), None);
    }

    #[tokio::test]
    async fn test_disabled_layer_passes_through() {
        let calls = Arc::new(AtomicUsize::new(0));
        let layers = [
            ApilyticsLayer::new(None::<Arc<Client>>),
            ApilyticsLayer::new(Arc::new(Client::from(()))),
        ];
        for layer in layers {
            assert!(!layer.is_enabled());
            let calls = calls.clone();
            let service = ServiceBuilder::new().layer(layer).service_fn(
                move |_req: Request<String>| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, Infallible>(Response::new(String::from("ok"))) }
                },
            );
            let response = service.oneshot(request("/")).await.unwrap();
            assert_eq!(response.into_body().into_inner(), "ok");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_one_record_per_request() {
        let (client, transport) = test_client();
        let mut service = ServiceBuilder::new()
            .layer(ApilyticsLayer::new(client))
            .service_fn(|_req: Request<String>| async move {
                Ok::<_, Infallible>(Response::new(String::new()))
            });

        for path in ["/a", "/b", "/c"] {
            let ready = service.ready().await.unwrap();
            let response = ready.call(request(path)).await.unwrap();
            read_body(response.into_body()).await;
        }

        let paths: Vec<_> = transport
            .fetch_and_clear_reports()
            .into_iter()
            .map(|report| report.record.path().to_owned())
            .collect();
        assert_eq!(paths, ["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn test_dropped_future_sends_nothing() {
        let (client, transport) = test_client();
        let mut service = ApilyticsLayer::new(client).layer(tower::service_fn(
            |_req: Request<String>| async move {
                std::future::pending::<Result<Response<String>, Infallible>>().await
            },
        ));
        let future = service.call(request("/slow"));
        drop(future);
        assert!(transport.fetch_and_clear_reports().is_empty());
    }
}
