use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds. Tagged with method, status.",
};

pub const BEACON_ACCEPTED: MetricDef = MetricDef {
    name: "beacon.accepted",
    metric_type: MetricType::Counter,
    description: "Beacons whose sighting was stored. Tagged with policy.",
};

pub const BEACON_REJECTED: MetricDef = MetricDef {
    name: "beacon.rejected",
    metric_type: MetricType::Counter,
    description: "Beacons that failed. Tagged with reason.",
};

pub const STORE_READY: MetricDef = MetricDef {
    name: "store.ready",
    metric_type: MetricType::Gauge,
    description: "1 when the last device store health check passed, else 0",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUEST_DURATION,
    BEACON_ACCEPTED,
    BEACON_REJECTED,
    STORE_READY,
];
