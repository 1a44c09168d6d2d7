//! Prometheus text exposition for shipment metrics
//!
//! Rendered by the API server at `GET /metrics`.

use crate::infra::metrics::{
    Metrics, MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_NUM_BUCKETS, REJECTION_KINDS,
};
use std::fmt::Write;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    avg: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in METRICS_BUCKET_BOUNDS.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let sum = avg * count;
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {count}");
}

/// Format metrics in Prometheus text exposition format
///
/// Drains the interval histogram, same as the periodic log report.
pub fn format_prometheus_metrics(metrics: &Metrics, site_id: &str) -> String {
    let summary = metrics.report();
    let mut output = String::with_capacity(4096);

    write_shipment_metrics(&mut output, site_id, &summary);
    write_rejection_metrics(&mut output, site_id, &summary);
    write_request_metrics(&mut output, site_id, &summary);

    output
}

fn write_shipment_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "shipments_created_total",
        "Shipments created",
        MetricType::Counter,
        site,
        summary.shipments_created,
    );
    write_metric(
        output,
        "shipments_live",
        "Shipments currently held in the store",
        MetricType::Gauge,
        site,
        summary.live_shipments,
    );
    write_metric(
        output,
        "shipment_status_updates_total",
        "Status updates applied",
        MetricType::Counter,
        site,
        summary.status_updates,
    );
    write_metric(
        output,
        "shipment_not_found_total",
        "Operations against an unknown tracking id",
        MetricType::Counter,
        site,
        summary.not_found,
    );
    write_metric(
        output,
        "shipment_code_generation_failures_total",
        "Creates that failed to obtain a unique tracking id",
        MetricType::Counter,
        site,
        summary.code_generation_failures,
    );
}

fn write_rejection_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    let name = "shipment_transitions_rejected_total";
    let _ = writeln!(output, "# HELP {name} Lifecycle transitions rejected by kind");
    let _ = writeln!(output, "# TYPE {name} counter");
    for (kind, count) in REJECTION_KINDS.iter().zip(summary.transitions_rejected) {
        let _ = writeln!(output, "{name}{{site=\"{site}\",kind=\"{kind}\"}} {count}");
    }
}

fn write_request_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    let name = "shipment_http_responses_total";
    let _ = writeln!(output, "# HELP {name} HTTP responses by status class");
    let _ = writeln!(output, "# TYPE {name} counter");
    for (class, count) in [
        ("2xx", summary.responses_2xx),
        ("4xx", summary.responses_4xx),
        ("5xx", summary.responses_5xx),
    ] {
        let _ = writeln!(output, "{name}{{site=\"{site}\",class=\"{class}\"}} {count}");
    }

    write_histogram(
        output,
        "shipment_http_latency_us",
        "HTTP request latency in microseconds",
        site,
        &summary.lat_buckets,
        summary.avg_request_latency_us,
    );
    write_metric(
        output,
        "shipment_http_latency_p99_us",
        "99th percentile request latency",
        MetricType::Gauge,
        site,
        summary.lat_p99_us,
    );
}
