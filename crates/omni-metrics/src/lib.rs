//! Metrics for the Omni tracker protocol.
//!
//! Every metric the decoder, encoder and gateway emit is declared here as a
//! [`Metric`] constant so names, units and label keys live in one place. The
//! `metrics` facade is re-exported; callers record through its macros.
//!
//! ```rust,ignore
//! use omni_metrics::{metric_defs, describe_metrics, MetricLabels};
//!
//! describe_metrics();
//!
//! let labels = MetricLabels::new("omni").with(&[("type_code", "Q0".to_string())]);
//! metrics::counter!(metric_defs::DECODER_SENTENCES.name, &labels).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Which recorder call a metric maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic count.
    Counter,
    /// Value that moves both ways.
    Gauge,
    /// Distribution of samples.
    Histogram,
}

/// A metric declared at compile time.
///
/// ```rust
/// use omni_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const REPLIES: Metric = Metric::counter("omni.decoder.replies")
///     .with_description("Acknowledgements written")
///     .with_unit(Unit::Count)
///     .with_labels(&["protocol", "type_code"]);
///
/// assert_eq!(REPLIES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// Dotted name, e.g. `omni.decoder.sentences`.
    pub name: &'static str,
    /// Recorder kind.
    pub kind: MetricKind,
    /// Help text.
    pub description: &'static str,
    /// Unit, if any.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Metric {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Declare a counter.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Declare a gauge.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Declare a histogram.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers the description with the installed recorder.
    pub fn describe(&self) {
        let (name, text) = (self.name, self.description);
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(name, unit, text),
            (MetricKind::Counter, None) => describe_counter!(name, text),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(name, unit, text),
            (MetricKind::Gauge, None) => describe_gauge!(name, text),
            (MetricKind::Histogram, Some(unit)) => describe_histogram!(name, unit, text),
            (MetricKind::Histogram, None) => describe_histogram!(name, text),
        }
    }
}

/// All metric definitions.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Decoder
    // ========================================================================

    /// Sentences that reached type dispatch.
    ///
    /// Labels: protocol, type_code
    pub const DECODER_SENTENCES: Metric = Metric::counter("omni.decoder.sentences")
        .with_description("Sentences dispatched by type code")
        .with_unit(Unit::Count)
        .with_labels(&["protocol", "type_code"]);

    /// Sentences dropped without an update.
    ///
    /// Labels: protocol, reason (`short`, `unknown_device`, `empty`)
    pub const DECODER_DISCARDED: Metric = Metric::counter("omni.decoder.discarded")
        .with_description("Sentences discarded without producing telemetry")
        .with_unit(Unit::Count)
        .with_labels(&["protocol", "reason"]);

    /// Sentences abandoned because a field was missing or malformed.
    ///
    /// Labels: protocol, type_code
    pub const DECODER_ERRORS: Metric = Metric::counter("omni.decoder.errors")
        .with_description("Sentences abandoned on a field error")
        .with_unit(Unit::Count)
        .with_labels(&["protocol", "type_code"]);

    /// Acknowledgements written back to devices.
    ///
    /// Labels: protocol, type_code
    pub const DECODER_REPLIES: Metric = Metric::counter("omni.decoder.replies")
        .with_description("Acknowledgement sentences written to devices")
        .with_unit(Unit::Count)
        .with_labels(&["protocol", "type_code"]);

    // ========================================================================
    // Encoder
    // ========================================================================

    /// Platform commands encoded into sentences.
    ///
    /// Labels: protocol, command
    pub const ENCODER_COMMANDS: Metric = Metric::counter("omni.encoder.commands")
        .with_description("Platform commands encoded for devices")
        .with_unit(Unit::Count)
        .with_labels(&["protocol", "command"]);

    // ========================================================================
    // Gateway
    // ========================================================================

    /// Open device connections.
    pub const GATEWAY_CONNECTIONS: Metric = Metric::gauge("omni.gateway.connections")
        .with_description("Open device connections")
        .with_unit(Unit::Count)
        .with_labels(&["protocol"]);

    /// Sentences dropped for exceeding the configured length.
    pub const GATEWAY_OVERSIZED: Metric = Metric::counter("omni.gateway.oversized")
        .with_description("Inbound sentences dropped for exceeding the maximum length")
        .with_unit(Unit::Count)
        .with_labels(&["protocol"]);

    /// Inbound sentence size.
    pub const GATEWAY_SENTENCE_SIZE: Metric = Metric::histogram("omni.gateway.sentence_size_bytes")
        .with_description("Size of inbound sentences in bytes")
        .with_unit(Unit::Bytes)
        .with_labels(&["protocol"]);

    /// Every declaration above, for describing in one pass.
    pub const ALL: &[&Metric] = &[
        &DECODER_SENTENCES,
        &DECODER_DISCARDED,
        &DECODER_ERRORS,
        &DECODER_REPLIES,
        &ENCODER_COMMANDS,
        &GATEWAY_CONNECTIONS,
        &GATEWAY_OVERSIZED,
        &GATEWAY_SENTENCE_SIZE,
    ];
}

/// Labels shared by every protocol metric.
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Protocol name.
    pub protocol: String,
}

impl MetricLabels {
    /// Creates labels for `protocol`.
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
        }
    }

    /// Converts the labels to the `metrics` crate format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![("protocol", self.protocol.clone())]
    }

    /// Base labels followed by `extra`.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut pairs = self.to_labels();
        pairs.extend(extra.iter().cloned());
        pairs
    }
}

/// Describes all metrics. Call once after installing a recorder.
pub fn describe_metrics() {
    metric_defs::ALL.iter().for_each(|m| m.describe());
}

/// Install a Prometheus recorder serving `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}
