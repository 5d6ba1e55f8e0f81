use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry};

#[derive(Clone, Debug)]
pub struct ServerMetrics {
    pub registry: Registry,

    pub request_errors: IntCounterVec,
    pub readings_ingested: IntCounter,
}

impl ServerMetrics {
    /// Metrics live in their own registry so independent instances (one per
    /// test server) never collide on metric names.
    pub fn new(prefix: Option<String>) -> anyhow::Result<Self> {
        let request_errors = IntCounterVec::new(
            Opts::new(
                "request_errors",
                "A metric counting request errors by handler and error code",
            ),
            &["handler", "error_code"],
        )?;

        let readings_ingested = IntCounter::with_opts(Opts::new(
            "readings_ingested",
            "A metric counting sensor readings accepted and written to storage",
        ))?;

        let registry = Registry::new_custom(prefix, None)?;
        registry.register(Box::new(request_errors.clone()))?;
        registry.register(Box::new(readings_ingested.clone()))?;

        Ok(Self {
            registry,
            request_errors,
            readings_ingested,
        })
    }

    pub fn record_error(&self, handler: &str, error_code: &str) {
        self.request_errors
            .with_label_values(&[handler, error_code])
            .inc();
    }

    pub fn record_ingested(&self, count: u64) {
        self.readings_ingested.inc_by(count);
    }

    pub fn gather_metrics(&self) -> String {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("could not encode prometheus metrics: {}", e);
        }

        match String::from_utf8(buffer) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(
                    "prometheus metrics could not be from_utf8'd: {}",
                    e
                );
                String::default()
            }
        }
    }
}
