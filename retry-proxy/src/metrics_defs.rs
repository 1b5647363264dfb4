use shared::metrics_defs::{MetricDef, MetricType};

pub const RELAY_REQUEST_DURATION: MetricDef = MetricDef {
    name: "relay.request.duration",
    metric_type: MetricType::Histogram,
    description: "Retry relay duration in seconds, including the status notification. Tagged with status.",
};

pub const RELAY_FAILURES: MetricDef = MetricDef {
    name: "relay.failures",
    metric_type: MetricType::Counter,
    description: "Number of retry requests answered with the proxy-failed envelope",
};

pub const STATUS_NOTIFY_OUTCOME: MetricDef = MetricDef {
    name: "status_notify.outcome",
    metric_type: MetricType::Counter,
    description: "Build status notifications. Tagged with outcome: skipped, sent or failed.",
};

pub const ALL_METRICS: &[MetricDef] = &[RELAY_REQUEST_DURATION, RELAY_FAILURES, STATUS_NOTIFY_OUTCOME];
