//! Explicit W3C trace context propagation.
//!
//! Every handler and provider call receives a [`TraceContext`] as an argument
//! instead of reading one from ambient state. Across process boundaries the
//! context travels in `traceparent`/`tracestate` headers.

use std::fmt;

use http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::{
    Context,
    propagation::{Extractor, Injector, TextMapPropagator},
    trace::{SpanContext, TraceContextExt, TraceFlags, TraceState},
};
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{IdGenerator, RandomIdGenerator},
};
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// W3C Trace Context header name.
pub const TRACEPARENT: &str = "traceparent";

/// Causal context for one end-user request. Carries no business data.
#[derive(Clone, Default)]
pub struct TraceContext {
    cx: Context,
}

impl TraceContext {
    /// Reads W3C trace headers. Missing or malformed headers yield an empty context.
    pub fn extract(headers: &HeaderMap) -> Self {
        let cx = TraceContextPropagator::new()
            .extract_with_context(&Context::new(), &HeaderExtractor(headers));
        Self { cx }
    }

    /// Starts a fresh trace with random ids.
    pub fn root() -> Self {
        let ids = RandomIdGenerator::default();
        let span_context = SpanContext::new(
            ids.new_trace_id(),
            ids.new_span_id(),
            TraceFlags::SAMPLED,
            false,
            TraceState::default(),
        );
        Self { cx: Context::new().with_remote_span_context(span_context) }
    }

    /// Keeps a valid inbound context, otherwise starts a new trace.
    pub fn or_root(self) -> Self {
        if self.is_valid() { self } else { Self::root() }
    }

    /// Parents `span` under this context and returns the context of `span`.
    ///
    /// Without an OpenTelemetry layer installed the span has no context of its
    /// own, so this context is handed on unchanged.
    pub fn child(&self, span: &Span) -> Self {
        let _ = span.set_parent(self.cx.clone());
        if let Some(trace_id) = self.trace_id() {
            span.record("trace_id", trace_id.as_str());
        }

        let cx = span.context();
        if cx.span().span_context().is_valid() { Self { cx } } else { self.clone() }
    }

    /// Writes W3C trace headers for an outbound hop.
    pub fn inject(&self, headers: &mut HeaderMap) {
        TraceContextPropagator::new().inject_context(&self.cx, &mut HeaderInjector(headers));
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        self.inject(&mut headers);
        headers
    }

    pub fn is_valid(&self) -> bool {
        self.cx.span().span_context().is_valid()
    }

    pub fn trace_id(&self) -> Option<String> {
        let span = self.cx.span();
        let span_context = span.span_context();
        span_context.is_valid().then(|| span_context.trace_id().to_string())
    }
}

impl fmt::Debug for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceContext").field("trace_id", &self.trace_id()).finish()
    }
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(val)) =
            (HeaderName::from_bytes(key.as_bytes()), HeaderValue::from_str(&value))
        {
            self.0.insert(name, val);
        }
    }
}
