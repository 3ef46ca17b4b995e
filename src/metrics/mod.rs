//! Prometheus metrics for the crawl scheduler
//!
//! [`Metrics`] owns a private registry and is passed into components as an
//! explicit `Arc` dependency, never read from process-global state, so each
//! test and each controller gets an isolated counter set. All recording
//! calls are synchronous counter increments and never block scheduling.

use prometheus::{CounterVec, Encoder, IntCounter, Opts, Registry, TextEncoder};

/// Metrics handle shared across scheduler components
#[derive(Debug)]
pub struct Metrics {
    registry: Registry,

    /// Successful listing fetches, labeled by task kind
    fetch_requests: CounterVec,

    /// Discovered items dropped before emission, labeled by kind and reason
    items_dropped: CounterVec,

    /// Failed attempts that were re-submitted
    task_retries: IntCounter,

    /// Tasks that exhausted their retry budget
    tasks_exhausted: IntCounter,

    /// Batches handed to the persistence sink, labeled by kind and outcome
    sink_batches: CounterVec,
}

impl Metrics {
    /// Create a metrics handle with its own registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let fetch_requests = CounterVec::new(
            Opts::new(
                "povar_fetch_requests_total",
                "Total successful listing fetches",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(fetch_requests.clone()))?;

        let items_dropped = CounterVec::new(
            Opts::new(
                "povar_items_dropped_total",
                "Discovered items dropped before emission",
            ),
            &["kind", "reason"],
        )?;
        registry.register(Box::new(items_dropped.clone()))?;

        let task_retries = IntCounter::with_opts(Opts::new(
            "povar_task_retries_total",
            "Failed task attempts that were re-submitted",
        ))?;
        registry.register(Box::new(task_retries.clone()))?;

        let tasks_exhausted = IntCounter::with_opts(Opts::new(
            "povar_tasks_exhausted_total",
            "Tasks dropped after exhausting their retry budget",
        ))?;
        registry.register(Box::new(tasks_exhausted.clone()))?;

        let sink_batches = CounterVec::new(
            Opts::new(
                "povar_sink_batches_total",
                "Batches handed to the persistence sink",
            ),
            &["kind", "outcome"],
        )?;
        registry.register(Box::new(sink_batches.clone()))?;

        Ok(Self {
            registry,
            fetch_requests,
            items_dropped,
            task_retries,
            tasks_exhausted,
            sink_batches,
        })
    }

    /// Record one successful listing fetch
    pub fn record_fetch(&self, kind: &str) {
        self.fetch_requests.with_label_values(&[kind]).inc();
    }

    /// Record one dropped item (`invalid`, `duplicate` or `over_cap`)
    pub fn record_drop(&self, kind: &str, reason: &str) {
        self.items_dropped.with_label_values(&[kind, reason]).inc();
    }

    /// Record one retry submission
    pub fn record_retry(&self) {
        self.task_retries.inc();
    }

    /// Record one task going terminal after its last retry
    pub fn record_exhausted(&self) {
        self.tasks_exhausted.inc();
    }

    /// Record one sink batch (`saved` or `failed`)
    pub fn record_sink_batch(&self, kind: &str, outcome: &str) {
        self.sink_batches.with_label_values(&[kind, outcome]).inc();
    }

    /// Render all registered metrics in the Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("metrics output is not UTF-8: {e}")))
    }
}
