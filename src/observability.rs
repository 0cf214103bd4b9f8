//! OpenTelemetry export for the crate's tracing spans.
//!
//! Available with the `observability` feature. The spans listed in the crate docs
//! (`VerificationCodeRetriever::retrieve`, `token::exchange`, ...) become OTEL spans
//! once this layer sits on the subscriber:
//!
//! ```ignore
//! use tracing_subscriber::layer::SubscriberExt;
//!
//! let tracer = provider.tracer("outlook-code");
//! let subscriber = tracing_subscriber::registry().with(outlook_code::observability::layer(tracer));
//! tracing::subscriber::set_global_default(subscriber)?;
//! ```

use opentelemetry::trace::Tracer;
use tracing::Subscriber;
use tracing_opentelemetry::{OpenTelemetryLayer, PreSampledTracer};
use tracing_subscriber::registry::LookupSpan;

/// Builds a tracing layer that exports spans through `tracer`.
#[must_use]
pub fn layer<S, T>(tracer: T) -> OpenTelemetryLayer<S, T>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    T: Tracer + PreSampledTracer + 'static,
{
    tracing_opentelemetry::layer().with_tracer(tracer)
}
