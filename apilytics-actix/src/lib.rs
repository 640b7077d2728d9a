//! This crate adds a middleware for [`actix-web`](https://actix.rs/) that sends
//! API analytics to Apilytics.
//!
//! To use this middleware create a client and add it to your actix web app as
//! a middleware.  Every request produces one metrics record once its response
//! body has been fully sent, or dropped early.  Errors of the inner services
//! are reported right away with the status code actix renders for them.
//!
//! # Example
//!
//! ```no_run
//! use std::io;
//! use std::sync::Arc;
//!
//! use actix_web::{get, App, HttpServer};
//!
//! #[get("/")]
//! async fn index() -> &'static str {
//!     "Hello world!"
//! }
//!
//! #[actix_web::main]
//! async fn main() -> io::Result<()> {
//!     let client = Arc::new(apilytics_core::Client::from(
//!         std::env::var("APILYTICS_API_KEY").ok(),
//!     ));
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .wrap(apilytics_actix::Apilytics::new(client.clone()))
//!             .service(index)
//!     })
//!     .bind("127.0.0.1:3001")?
//!     .run()
//!     .await
//! }
//! ```
//!
//! If no client, or a client without API key, is passed the middleware only
//! forwards requests.

#![warn(missing_docs)]

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::body::{BodySize, MessageBody};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderMap, CONTENT_LENGTH, USER_AGENT};
use actix_web::web::Bytes;
use actix_web::Error;
use apilytics_core::{
    Client, Integration, Observation, PendingResponse, RequestInfo, ResponseInfo, SizeHint,
};
use futures_util::future::{ok, Ready};

/// The integration name reported by this middleware.
pub const INTEGRATION_NAME: &str = "apilytics-rust-actix";

/// The host library reported by this middleware.
pub const INTEGRATED_LIBRARY: &str = "actix-web/4";

struct Reporter {
    client: Arc<Client>,
    integration: Integration,
}

/// Sends metrics of each request to Apilytics.
#[derive(Clone)]
pub struct Apilytics {
    reporter: Option<Arc<Reporter>>,
}

impl Apilytics {
    /// Creates a new middleware reporting through `client`.
    ///
    /// Passing `None`, or a client that is not enabled, creates a middleware
    /// that does nothing.
    pub fn new<C: Into<Option<Arc<Client>>>>(client: C) -> Self {
        let reporter = client
            .into()
            .filter(|client| client.is_enabled())
            .map(|client| {
                Arc::new(Reporter {
                    client,
                    integration: Integration::new(INTEGRATION_NAME)
                        .with_library(INTEGRATED_LIBRARY),
                })
            });
        Apilytics { reporter }
    }

    /// Overrides the reported host library, e.g. with an exact version.
    pub fn with_library<L: Into<Cow<'static, str>>>(mut self, library: L) -> Self {
        if let Some(reporter) = self.reporter.take() {
            self.reporter = Some(Arc::new(Reporter {
                client: reporter.client.clone(),
                integration: reporter.integration.clone().with_library(library),
            }));
        }
        self
    }

    /// Whether this middleware sends any metrics.
    pub fn is_enabled(&self) -> bool {
        self.reporter.is_some()
    }
}

impl<S, B> Transform<S, ServiceRequest> for Apilytics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<ApilyticsBody<B>>;
    type Error = Error;
    type Transform = ApilyticsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(ApilyticsMiddleware {
            service,
            reporter: self.reporter.clone(),
        })
    }
}

/// The middleware for individual services.
pub struct ApilyticsMiddleware<S> {
    service: S,
    reporter: Option<Arc<Reporter>>,
}

impl<S, B> Service<ServiceRequest> for ApilyticsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<ApilyticsBody<B>>;
    type Error = Error;
    type Future = ApilyticsFuture<S::Future>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let observation = self
            .reporter
            .as_ref()
            .map(|reporter| (Observation::start(&ActixRequest(&req)), reporter.clone()));

        ApilyticsFuture {
            observation,
            future: self.service.call(req),
        }
    }
}

/// The future returned from [`ApilyticsMiddleware`].
#[pin_project::pin_project]
pub struct ApilyticsFuture<F> {
    observation: Option<(Observation, Arc<Reporter>)>,
    #[pin]
    future: F,
}

impl<F, B> Future for ApilyticsFuture<F>
where
    F: Future<Output = Result<ServiceResponse<B>, Error>>,
    B: MessageBody,
{
    type Output = Result<ServiceResponse<ApilyticsBody<B>>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let slf = self.project();
        match slf.future.poll(cx) {
            Poll::Ready(Ok(res)) => {
                let completion = slf.observation.take().map(|(observation, reporter)| Completion {
                    pending: Some(observation.respond(&ActixResponse(&res))),
                    reporter,
                });
                Poll::Ready(Ok(
                    res.map_body(|_, inner| ApilyticsBody { inner, completion })
                ))
            }
            Poll::Ready(Err(err)) => {
                if let Some((observation, reporter)) = slf.observation.take() {
                    let record = observation.finish(Some(&ActixError(&err)));
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

/// The response body produced by [`ApilyticsMiddleware`].
///
/// Chunks pass through unchanged; the record is sent at the end of the body
/// or when it is dropped.
#[pin_project::pin_project]
pub struct ApilyticsBody<B> {
    #[pin]
    inner: B,
    completion: Option<Completion>,
}

impl<B: MessageBody> MessageBody for ApilyticsBody<B> {
    type Error = B::Error;

    fn size(&self) -> BodySize {
        self.inner.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        let slf = self.project();
        let chunk = match slf.inner.poll_next(cx) {
            Poll::Ready(chunk) => chunk,
            Poll::Pending => return Poll::Pending,
        };
        if let Some(completion) = slf.completion {
            match &chunk {
                Some(Ok(bytes)) => {
                    if let Some(pending) = completion.pending.as_mut() {
                        pending.add_sent(bytes.len() as u64);
                    }
                }
                Some(Err(_)) => completion.finish(false),
                None => completion.finish(true),
            }
        }
        Poll::Ready(chunk)
    }
}

fn content_length(headers: &HeaderMap) -> Option<SizeHint<'_>> {
    headers
        .get(CONTENT_LENGTH)
        .map(|value| SizeHint::Header(value.as_bytes()))
}

struct ActixRequest<'a>(&'a ServiceRequest);

impl RequestInfo for ActixRequest<'_> {
    fn method(&self) -> &str {
        self.0.method().as_str()
    }

    fn path(&self) -> &str {
        self.0.path()
    }

    fn query(&self) -> Option<&str> {
        Some(self.0.query_string())
    }

    fn size_hint(&self) -> Option<SizeHint<'_>> {
        content_length(self.0.headers())
    }

    fn user_agent(&self) -> Option<&str> {
        self.0
            .headers()
            .get(USER_AGENT)
            .and_then(|value| value.to_str().ok())
    }
}

struct ActixResponse<'a, B>(&'a ServiceResponse<B>);

impl<B: MessageBody> ResponseInfo for ActixResponse<'_, B> {
    fn status_code(&self) -> Option<u16> {
        Some(self.0.status().as_u16())
    }

    fn size_hint(&self) -> Option<SizeHint<'_>> {
        content_length(self.0.headers()).or_else(|| match self.0.response().body().size() {
            BodySize::Sized(size) => Some(SizeHint::Exact(size)),
            BodySize::None | BodySize::Stream => None,
        })
    }
}

/// An error returned by the inner service; actix turns it into a response
/// with the error's status code.
struct ActixError<'a>(&'a Error);

impl ResponseInfo for ActixError<'_> {
    fn status_code(&self) -> Option<u16> {
        Some(self.0.as_response_error().status_code().as_u16())
    }

    fn size_hint(&self) -> Option<SizeHint<'_>> {
        None
    }
}
