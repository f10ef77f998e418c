//! Trace context for outbound gateway calls.
//!
//! Requests built through [`TracedClientExt`] carry the current span's W3C
//! `traceparent`, so the SMS or payment gateway hop joins the caller's trace.

use opentelemetry::trace::{SpanContext, TraceContextExt};
use std::time::Duration;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Correlation id header shared by every service.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn format_traceparent(span_context: &SpanContext) -> String {
    format!(
        "00-{}-{}-{:02x}",
        span_context.trace_id(),
        span_context.span_id(),
        span_context.trace_flags().to_u8()
    )
}

/// `traceparent` of the current span, or `None` outside a sampled OpenTelemetry span.
pub fn current_traceparent() -> Option<String> {
    let context = Span::current().context();
    let span = context.span();
    let span_context = span.span_context();

    span_context
        .is_valid()
        .then(|| format_traceparent(span_context))
}

/// Outbound request that stamps `traceparent` when sent.
pub struct TracedRequest {
    request: reqwest::RequestBuilder,
}

impl TracedRequest {
    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        Self {
            request: self.request.bearer_auth(token),
        }
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            request: self.request.timeout(timeout),
        }
    }

    pub fn json<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        Self {
            request: self.request.json(json),
        }
    }

    pub async fn send(self) -> Result<reqwest::Response, reqwest::Error> {
        let request = match current_traceparent() {
            Some(traceparent) => self.request.header(TRACEPARENT_HEADER, traceparent),
            None => self.request,
        };
        request.send().await
    }
}

pub trait TracedClientExt {
    fn traced_post(&self, url: &str) -> TracedRequest;
}

impl TracedClientExt for reqwest::Client {
    fn traced_post(&self, url: &str) -> TracedRequest {
        TracedRequest {
            request: self.post(url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{SpanId, TraceFlags, TraceId, TraceState};

    #[test]
    fn no_traceparent_without_active_span() {
        assert_eq!(current_traceparent(), None);
    }

    #[test]
    fn traceparent_is_version_trace_span_flags() {
        let span_context = SpanContext::new(
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap(),
            SpanId::from_hex("00f067aa0ba902b7").unwrap(),
            TraceFlags::SAMPLED,
            false,
            TraceState::default(),
        );

        assert_eq!(
            format_traceparent(&span_context),
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
        );
    }
}
