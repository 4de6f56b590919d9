use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub donations_recorded_total: IntCounter,
    pub lifecycle_transitions_total: IntCounterVec,
    pub pending_deliveries: IntGauge,
    pub delivery_claim_conflicts_total: IntCounter,
    pub side_effect_failures_total: IntCounterVec,
    pub transition_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let donations_recorded_total =
            IntCounter::new("donations_recorded_total", "Total donations recorded")
                .expect("valid donations_recorded_total metric");

        let lifecycle_transitions_total = IntCounterVec::new(
            Opts::new(
                "lifecycle_transitions_total",
                "Donation lifecycle transitions by kind and outcome",
            ),
            &["transition", "outcome"],
        )
        .expect("valid lifecycle_transitions_total metric");

        let pending_deliveries = IntGauge::new(
            "pending_deliveries",
            "Current number of deliveries waiting for an agent",
        )
        .expect("valid pending_deliveries metric");

        let delivery_claim_conflicts_total = IntCounter::new(
            "delivery_claim_conflicts_total",
            "Delivery accepts that lost the claim to another agent or a withdrawal",
        )
        .expect("valid delivery_claim_conflicts_total metric");

        let side_effect_failures_total = IntCounterVec::new(
            Opts::new(
                "side_effect_failures_total",
                "Failed best-effort notifications by channel",
            ),
            &["channel"],
        )
        .expect("valid side_effect_failures_total metric");

        let transition_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "transition_latency_seconds",
                "Latency of lifecycle transitions in seconds",
            ),
            &["transition"],
        )
        .expect("valid transition_latency_seconds metric");

        registry
            .register(Box::new(donations_recorded_total.clone()))
            .expect("register donations_recorded_total");
        registry
            .register(Box::new(lifecycle_transitions_total.clone()))
            .expect("register lifecycle_transitions_total");
        registry
            .register(Box::new(pending_deliveries.clone()))
            .expect("register pending_deliveries");
        registry
            .register(Box::new(delivery_claim_conflicts_total.clone()))
            .expect("register delivery_claim_conflicts_total");
        registry
            .register(Box::new(side_effect_failures_total.clone()))
            .expect("register side_effect_failures_total");
        registry
            .register(Box::new(transition_latency_seconds.clone()))
            .expect("register transition_latency_seconds");

        Self {
            registry,
            donations_recorded_total,
            lifecycle_transitions_total,
            pending_deliveries,
            delivery_claim_conflicts_total,
            side_effect_failures_total,
            transition_latency_seconds,
        }
    }

    pub fn record_transition(&self, transition: &str, ok: bool, elapsed_seconds: f64) {
        let outcome = if ok { "success" } else { "error" };
        self.lifecycle_transitions_total
            .with_label_values(&[transition, outcome])
            .inc();
        self.transition_latency_seconds
            .with_label_values(&[transition])
            .observe(elapsed_seconds);
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
