use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Handle to the process-wide Prometheus recorder. Series are described
/// next to the code that emits them (`loader`, `campaign`); this module
/// only installs the recorder and serves the exposition endpoint.
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global recorder. Call once, before the first series is
    /// touched.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        Self { handle }
    }

    /// `GET /metrics` in the Prometheus exposition format. The entrypoint
    /// merges this into the main router.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
