use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::types::{InvocationRequest, StatusResponse, SyncResponse};

/// The three calls a model service exposes.
///
/// Implementations translate transport failures into [`ProviderError`] and
/// otherwise report the service's answer as-is; deciding what a response
/// means is left to [`crate::ProviderAdapter`].
#[async_trait]
pub trait ModelClient: Send + Sync {
  /// Run a model and wait for its output in one round trip.
  async fn run(&self, request: &InvocationRequest) -> Result<SyncResponse, ProviderError>;

  /// Enqueue a model run.
  async fn submit(&self, request: &InvocationRequest) -> Result<SyncResponse, ProviderError>;

  /// Poll the status of a queued run.
  async fn status(&self, model_id: &str, request_id: &str)
  -> Result<StatusResponse, ProviderError>;
}

#[async_trait]
impl<T: ModelClient + ?Sized> ModelClient for Arc<T> {
  async fn run(&self, request: &InvocationRequest) -> Result<SyncResponse, ProviderError> {
    (**self).run(request).await
  }

  async fn submit(&self, request: &InvocationRequest) -> Result<SyncResponse, ProviderError> {
    (**self).submit(request).await
  }

  async fn status(
    &self,
    model_id: &str,
    request_id: &str,
  ) -> Result<StatusResponse, ProviderError> {
    (**self).status(model_id, request_id).await
  }
}
