// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Middleware layer for logging RPC calls.

use std::{
    borrow::Cow,
    hash::{DefaultHasher, Hash as _, Hasher},
};

use jsonrpsee::MethodResponse;
use jsonrpsee::core::middleware::{Batch, Notification};
use jsonrpsee::server::middleware::rpc::RpcServiceT;
use jsonrpsee::types::{Id, Request};
use tower::Layer;

// State-less jsonrpsee layer for logging information about RPC calls
#[derive(Clone, Default)]
pub(super) struct LogLayer {}

impl<S> Layer<S> for LogLayer {
    type Service = Logging<S>;

    fn layer(&self, service: S) -> Self::Service {
        Logging { service }
    }
}

#[derive(Clone)]
pub(super) struct Logging<S> {
    service: S,
}

impl<S> RpcServiceT for Logging<S>
where
    S: RpcServiceT<MethodResponse = MethodResponse> + Send + Sync + Clone + 'static,
{
    type MethodResponse = S::MethodResponse;
    type NotificationResponse = S::NotificationResponse;
    type BatchResponse = S::BatchResponse;

    fn call<'a>(&self, req: Request<'a>) -> impl Future<Output = Self::MethodResponse> + Send + 'a {
        let service = self.service.clone();

        async move {
            // Avoid performance overhead if DEBUG level is not enabled.
            if !tracing::enabled!(tracing::Level::DEBUG) {
                return service.call(req).await;
            }

            let start_time = std::time::Instant::now();
            let method_name = req.method_name().to_owned();
            let id = create_unique_id(req.id(), start_time);

            tracing::trace!(
                "RPC#{id}: {method_name}. Params: {params}",
                params = req.params().as_str().unwrap_or("[]")
            );

            let resp = service.call(req).await;

            let elapsed = start_time.elapsed();
            let result = resp.as_error_code().map_or(Cow::Borrowed("OK"), |code| {
                Cow::Owned(format!("ERR({code})"))
            });
            tracing::debug!("RPC#{id} {result}: {method_name}. Took {elapsed:?}");

            resp
        }
    }

    fn batch<'a>(&self, batch: Batch<'a>) -> impl Future<Output = Self::BatchResponse> + Send + 'a {
        self.service.batch(batch)
    }

    fn notification<'a>(
        &self,
        n: Notification<'a>,
    ) -> impl Future<Output = Self::NotificationResponse> + Send + 'a {
        self.service.notification(n)
    }
}

/// Creates a short ID for the RPC call, so it can be easily tracked in logs.
fn create_unique_id(id: Id, start_time: std::time::Instant) -> String {
    const ID_LEN: usize = 6;
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    start_time.hash(&mut hasher);
    let mut id = format!("{:x}", hasher.finish());
    id.truncate(ID_LEN);
    id
}
