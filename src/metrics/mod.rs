// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use std::sync::LazyLock;

use axum::{Router, http::StatusCode, response::IntoResponse, routing::get};
use parking_lot::{RwLock, RwLockWriteGuard};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{
        counter::Counter,
        family::Family,
        gauge::Gauge,
        histogram::{Histogram, exponential_buckets},
    },
    registry::Registry,
};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tracing::{info, warn};

static DEFAULT_REGISTRY: LazyLock<RwLock<Registry>> = LazyLock::new(Default::default);

pub fn default_registry<'a>() -> RwLockWriteGuard<'a, Registry> {
    DEFAULT_REGISTRY.write()
}

pub static RPC_METHOD_FAILURE: LazyLock<Family<RpcMethodLabel, Counter>> = LazyLock::new(|| {
    let metric = Family::default();
    default_registry().register(
        "rpc_method_failure",
        "Number of failed RPC calls",
        metric.clone(),
    );
    metric
});

pub static RPC_METHOD_TIME: LazyLock<Family<RpcMethodLabel, Histogram>> = LazyLock::new(|| {
    let metric = Family::<RpcMethodLabel, Histogram>::new_with_constructor(|| {
        // Histogram with 5 buckets starting from 0.1ms going to 1s, each bucket 10 times as big as the last.
        Histogram::new(exponential_buckets(0.1, 10., 5))
    });
    default_registry().register(
        "rpc_processing_time",
        "Duration of RPC method call in milliseconds",
        metric.clone(),
    );
    metric
});

pub static FILTERS_ACTIVE: LazyLock<Gauge> = LazyLock::new(|| {
    let metric = Gauge::default();
    default_registry().register(
        "filters_active",
        "Number of installed filters",
        metric.clone(),
    );
    metric
});

pub static FILTER_RESULTS_DROPPED: LazyLock<Counter> = LazyLock::new(|| {
    let metric = Counter::default();
    default_registry().register(
        "filter_results_dropped",
        "Filter results discarded because a filter was full",
        metric.clone(),
    );
    metric
});

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RpcMethodLabel {
    pub method: String,
}

/// Text exposition of every registered metric.
pub fn encode() -> String {
    let mut metrics = String::new();
    if let Err(e) =
        prometheus_client::encoding::text::encode_registry(&mut metrics, &DEFAULT_REGISTRY.read())
    {
        warn!("failed to encode the default metrics registry: {e}");
    };
    if let Err(e) = prometheus_client::encoding::text::encode_eof(&mut metrics) {
        warn!("failed to encode metrics eof {e}");
    };
    metrics
}

/// Serves `/metrics` on `listener` until the task is dropped.
pub async fn init_prometheus(listener: TcpListener) -> anyhow::Result<()> {
    info!("Prometheus server started at {}", listener.local_addr()?);
    let app = Router::new()
        .route("/metrics", get(collect_prometheus_metrics))
        .layer(CompressionLayer::new());
    Ok(axum::serve(listener, app.into_make_service()).await?)
}

async fn collect_prometheus_metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        encode(),
    )
}
