//! Sink for non-fatal import warnings.

use std::sync::Arc;

use tracing::warn;

/// Receives warnings returned by the store. Emitting never fails the caller.
pub trait WarningSink: Send + Sync {
    fn emit(&self, rest_api_id: &str, message: &str);
}

/// Logs every warning through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWarningSink;

impl WarningSink for TracingWarningSink {
    fn emit(&self, rest_api_id: &str, message: &str) {
        warn!(
            target: "apigw_swagger::import",
            rest_api_id = %rest_api_id,
            "Swagger import warning: {}",
            message
        );
    }
}

impl<T: WarningSink + ?Sized> WarningSink for Arc<T> {
    fn emit(&self, rest_api_id: &str, message: &str) {
        (**self).emit(rest_api_id, message)
    }
}
