//! Envelope metrics definitions
//!
//! OpenTelemetry instruments for the inbound and outbound paths. They are
//! exported through whatever meter provider `init_observability` installed;
//! without one the global no-op provider swallows them.
//!
//! # Metrics Collected
//!
//! - **envelopes_total**: envelopes deserialized (counter)
//! - **parse_failures_total**: payloads that were not JSON (counter)
//! - **decodes_total**: decode outcomes by type, outcome and payload shape (counter)
//! - **consumers_total**: consumer outcomes (counter)
//! - **dispatch_duration**: time to run every consumer of one envelope (histogram)
//! - **encoded_total**: outbound messages encoded, by content type (counter)
//! - **decode_computations_total**: decodes that actually read the JSON tree (counter)
//! - **cache_hits_total**: decode requests answered from an envelope's cache (counter)
//! - **rejections_total**: types turned away by the acceptance filter (counter)
//!
//! # Examples
//!
//! ```rust,no_run
//! use rawjson_envelope::EnvelopeMetrics;
//!
//! let metrics = EnvelopeMetrics::new("gateway-ingest");
//! metrics.record_envelope("application/json");
//! metrics.record_decode("urn:message:GatewayReport", "decoded", "array");
//! ```

use crate::cache::StatsSnapshot;
use opentelemetry::{
    global,
    metrics::{Counter, Histogram, Meter},
    KeyValue,
};

/// Envelope metrics for monitoring
///
/// All instruments are prefixed with `rawjson.envelope.*`.
#[derive(Clone)]
pub struct EnvelopeMetrics {
    /// Envelopes successfully deserialized
    pub envelopes_total: Counter<u64>,
    /// Payloads rejected before any decode
    pub parse_failures_total: Counter<u64>,
    /// Decode outcomes per message type
    pub decodes_total: Counter<u64>,
    /// Consumer outcomes
    pub consumers_total: Counter<u64>,
    /// Dispatch duration in seconds
    pub dispatch_duration: Histogram<f64>,
    /// Outbound messages encoded
    pub encoded_total: Counter<u64>,
    /// Decode computations, summed over envelopes
    pub decode_computations_total: Counter<u64>,
    /// Cache hits, summed over envelopes
    pub cache_hits_total: Counter<u64>,
    /// Acceptance rejections, summed over envelopes
    pub rejections_total: Counter<u64>,
}

impl EnvelopeMetrics {
    /// Create metrics on the global meter provider
    pub fn new(service_name: impl Into<String>) -> Self {
        let name: &'static str = Box::leak(service_name.into().into_boxed_str());
        let meter = global::meter(name);
        Self::new_with_meter(&meter)
    }

    /// Create metrics on a specific meter
    pub fn new_with_meter(meter: &Meter) -> Self {
        Self {
            envelopes_total: meter
                .u64_counter("rawjson.envelope.envelopes.total")
                .with_description("Number of envelopes deserialized")
                .build(),
            parse_failures_total: meter
                .u64_counter("rawjson.envelope.parse_failures.total")
                .with_description("Number of payloads that could not be parsed")
                .build(),
            decodes_total: meter
                .u64_counter("rawjson.envelope.decodes.total")
                .with_description("Number of decode outcomes per message type")
                .build(),
            consumers_total: meter
                .u64_counter("rawjson.envelope.consumers.total")
                .with_description("Number of consumer invocations by outcome")
                .build(),
            dispatch_duration: meter
                .f64_histogram("rawjson.envelope.dispatch.duration")
                .with_description("Envelope dispatch duration in seconds")
                .build(),
            encoded_total: meter
                .u64_counter("rawjson.envelope.encoded.total")
                .with_description("Number of outbound messages encoded")
                .build(),
            decode_computations_total: meter
                .u64_counter("rawjson.envelope.decode_computations.total")
                .with_description("Number of decodes that read the JSON tree")
                .build(),
            cache_hits_total: meter
                .u64_counter("rawjson.envelope.cache_hits.total")
                .with_description("Number of decode requests answered from the envelope cache")
                .build(),
            rejections_total: meter
                .u64_counter("rawjson.envelope.rejections.total")
                .with_description("Number of types rejected by the acceptance filter")
                .build(),
        }
    }

    /// Record a deserialized envelope
    pub fn record_envelope(&self, content_type: &str) {
        let attributes = &[KeyValue::new("content_type", content_type.to_string())];
        self.envelopes_total.add(1, attributes);
    }

    /// Record a payload that failed to parse
    pub fn record_parse_failure(&self, reason: &str) {
        let attributes = &[KeyValue::new("reason", reason.to_string())];
        self.parse_failures_total.add(1, attributes);
    }

    /// Record a decode outcome
    pub fn record_decode(&self, urn: &str, outcome: &str, shape: &str) {
        let attributes = &[
            KeyValue::new("urn", urn.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
            KeyValue::new("shape", shape.to_string()),
        ];
        self.decodes_total.add(1, attributes);
    }

    /// Record one consumer's outcome
    pub fn record_consumer(&self, consumer: &str, outcome: &str) {
        let attributes = &[
            KeyValue::new("consumer", consumer.to_string()),
            KeyValue::new("outcome", outcome.to_string()),
        ];
        self.consumers_total.add(1, attributes);
    }

    /// Record how long a dispatch took
    pub fn record_dispatch(&self, consumers: usize, duration_secs: f64) {
        let attributes = &[KeyValue::new("consumers", consumers as i64)];
        self.dispatch_duration.record(duration_secs, attributes);
    }

    /// Record an encoded outbound message
    pub fn record_encoded(&self, content_type: &str) {
        let attributes = &[KeyValue::new("content_type", content_type.to_string())];
        self.encoded_total.add(1, attributes);
    }

    /// Add one envelope's work counters
    pub fn record_envelope_stats(&self, stats: &StatsSnapshot) {
        self.decode_computations_total.add(stats.decodes as u64, &[]);
        self.cache_hits_total.add(stats.cache_hits as u64, &[]);
        self.rejections_total.add(stats.rejections as u64, &[]);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{counter_total, exported};
    use super::*;
    use opentelemetry::metrics::MeterProvider;
    use opentelemetry_sdk::metrics::SdkMeterProvider;

    #[test]
    fn test_metrics_creation() {
        let provider = SdkMeterProvider::builder().build();
        let meter = provider.meter("test");
        let metrics = EnvelopeMetrics::new_with_meter(&meter);

        metrics.record_envelope("application/json");
        metrics.record_parse_failure("syntax");
        metrics.record_decode("urn:message:Widget", "decoded", "object");
        metrics.record_consumer("widgets", "consumed");
        metrics.record_dispatch(2, 0.001);
        metrics.record_encoded("text/plain");
    }

    #[test]
    fn test_envelope_stats_are_exported() {
        let (metrics, provider, exporter) = exported();

        metrics.record_envelope_stats(&StatsSnapshot {
            decodes: 2,
            rejections: 1,
            cache_hits: 3,
        });
        metrics.record_envelope_stats(&StatsSnapshot {
            decodes: 1,
            rejections: 0,
            cache_hits: 1,
        });

        assert_eq!(counter_total(&provider, &exporter, "rawjson.envelope.decode_computations.total"), 3);
        assert_eq!(counter_total(&provider, &exporter, "rawjson.envelope.cache_hits.total"), 4);
        assert_eq!(counter_total(&provider, &exporter, "rawjson.envelope.rejections.total"), 1);
    }

    #[test]
    fn test_global_meter() {
        let metrics = EnvelopeMetrics::new("rawjson-test");
        metrics.record_envelope("application/json");
    }
}
