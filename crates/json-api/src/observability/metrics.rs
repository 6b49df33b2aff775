//! Prometheus metrics collection and exposition endpoint.

use std::sync::OnceLock;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
    core::Collector,
};
use salvo::{
    Request, Response, handler,
    http::{
        StatusCode,
        header::{CONTENT_TYPE, HeaderValue},
    },
};
use tracing::error;

use consent_app::{domain::consents::records::ConsentStatus, policy::PolicyDecision};

#[derive(Debug)]
struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    requests_in_flight: IntGauge,
    consent_transitions_total: IntCounterVec,
    processing_decisions_total: IntCounterVec,
}

static METRICS: OnceLock<Option<Metrics>> = OnceLock::new();

#[derive(Debug)]
pub(super) struct InFlightRequestGuard {
    tracked: bool,
}

impl InFlightRequestGuard {
    pub(super) fn track() -> Self {
        if let Some(metrics) = metrics() {
            metrics.requests_in_flight.inc();
            return Self { tracked: true };
        }

        Self { tracked: false }
    }
}

impl Drop for InFlightRequestGuard {
    fn drop(&mut self) {
        if self.tracked
            && let Some(metrics) = metrics()
        {
            metrics.requests_in_flight.dec();
        }
    }
}

pub(super) fn observe_request(method: &str, route: &str, status_code: u16, duration_seconds: f64) {
    let Some(metrics) = metrics() else {
        return;
    };

    let status_class = status_class(status_code);
    let status_code = status_code.to_string();

    metrics
        .requests_total
        .with_label_values(&[method, route, status_class, status_code.as_str()])
        .inc();

    metrics
        .request_duration_seconds
        .with_label_values(&[method, route])
        .observe(duration_seconds);
}

/// Count consents entering `status`.
pub(crate) fn record_transition(status: ConsentStatus, count: usize) {
    let Some(metrics) = metrics() else {
        return;
    };

    metrics
        .consent_transitions_total
        .with_label_values(&[status.as_str()])
        .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
}

/// Count one processing decision, labelled by its deny reason if any.
pub(crate) fn record_processing_decision(decision: &PolicyDecision) {
    let Some(metrics) = metrics() else {
        return;
    };

    let (outcome, reason) = match decision {
        PolicyDecision::Allow => ("allow", ""),
        PolicyDecision::Deny(reason) => ("deny", reason.code()),
    };

    metrics
        .processing_decisions_total
        .with_label_values(&[outcome, reason])
        .inc();
}

#[handler]
pub(crate) async fn metrics_handler(_req: &mut Request, res: &mut Response) {
    let Some(metrics) = metrics() else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };

    let encoder = TextEncoder::new();
    let metric_families = metrics.registry.gather();

    let mut encoded = Vec::new();

    if let Err(source) = encoder.encode(&metric_families, &mut encoded) {
        error!("failed to encode metrics response: {source}");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

        return;
    }

    let content_type = match HeaderValue::from_str(encoder.format_type()) {
        Ok(value) => value,
        Err(source) => {
            error!("failed to encode metrics content type header: {source}");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

            return;
        }
    };

    res.headers_mut().insert(CONTENT_TYPE, content_type);
    res.render(String::from_utf8_lossy(&encoded).into_owned());
}

fn metrics() -> Option<&'static Metrics> {
    METRICS.get_or_init(build_metrics).as_ref()
}

fn counter(name: &str, help: &str, labels: &[&str]) -> Option<IntCounterVec> {
    match IntCounterVec::new(Opts::new(name, help), labels) {
        Ok(metric) => Some(metric),
        Err(source) => {
            error!("failed to create {name} metric: {source}");
            None
        }
    }
}

fn register<C>(registry: &Registry, name: &str, metric: &C) -> Option<()>
where
    C: Collector + Clone + 'static,
{
    match registry.register(Box::new(metric.clone())) {
        Ok(()) => Some(()),
        Err(source) => {
            error!("failed to register {name} metric: {source}");
            None
        }
    }
}

fn build_metrics() -> Option<Metrics> {
    let registry = Registry::new();

    let requests_total = counter(
        "consent_json_http_requests_total",
        "Total HTTP requests partitioned by method, route, status class, and status code.",
        &["method", "route", "status_class", "status_code"],
    )?;

    let request_duration_seconds = match HistogramVec::new(
        HistogramOpts::new(
            "consent_json_http_request_duration_seconds",
            "HTTP request duration in seconds partitioned by method and route.",
        )
        .buckets(vec![
            0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "route"],
    ) {
        Ok(metric) => metric,
        Err(source) => {
            error!("failed to create request_duration metric: {source}");
            return None;
        }
    };

    let requests_in_flight = match IntGauge::with_opts(Opts::new(
        "consent_json_http_requests_in_flight",
        "Current number of in-flight HTTP requests.",
    )) {
        Ok(metric) => metric,
        Err(source) => {
            error!("failed to create in-flight gauge metric: {source}");
            return None;
        }
    };

    let consent_transitions_total = counter(
        "consent_json_consent_transitions_total",
        "Consents entering each lifecycle status.",
        &["status"],
    )?;

    let processing_decisions_total = counter(
        "consent_json_processing_decisions_total",
        "Processing decisions partitioned by outcome and deny reason.",
        &["decision", "reason"],
    )?;

    register(&registry, "requests_total", &requests_total)?;
    register(&registry, "request_duration", &request_duration_seconds)?;
    register(&registry, "in-flight gauge", &requests_in_flight)?;
    register(&registry, "consent_transitions", &consent_transitions_total)?;
    register(&registry, "processing_decisions", &processing_decisions_total)?;

    Some(Metrics {
        registry,
        requests_total,
        request_duration_seconds,
        requests_in_flight,
        consent_transitions_total,
        processing_decisions_total,
    })
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use consent_app::policy::DenyReason;
    use salvo::{
        Router, Service,
        test::{ResponseExt, TestClient},
    };

    use super::*;

    #[tokio::test]
    async fn metrics_endpoint_exposes_http_and_consent_metrics() {
        observe_request("GET", "/consents/{uuid}", 200, 0.042);
        observe_request("POST", "/process", 500, 0.123);
        record_transition(ConsentStatus::Active, 1);
        record_processing_decision(&PolicyDecision::Deny(DenyReason::StaleVersion));

        let service =
            Service::new(Router::new().push(Router::with_path("metrics").get(metrics_handler)));

        let response_result = TestClient::get("http://example.com/metrics")
            .send(&service)
            .await
            .take_string()
            .await;

        let response: String = response_result.unwrap_or_default();

        assert!(
            response.contains("consent_json_http_requests_total"),
            "expected requests_total metric in response"
        );
        assert!(
            response.contains("consent_json_http_request_duration_seconds"),
            "expected request_duration metric in response"
        );
        assert!(
            response.contains("consent_json_http_requests_in_flight"),
            "expected in-flight metric in response"
        );
        assert!(
            response.contains("consent_json_consent_transitions_total{status=\"ACTIVE\"}"),
            "expected transition counter in response"
        );
        assert!(
            response.contains("reason=\"STALE_VERSION\""),
            "expected deny reason label in response"
        );
    }

    #[test]
    fn status_classes() {
        assert_eq!(status_class(204), "2xx");
        assert_eq!(status_class(403), "4xx");
        assert_eq!(status_class(42), "other");
    }
}
