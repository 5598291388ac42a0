use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::ModelClient;
use crate::error::ProviderError;
use crate::types::{InvocationRequest, JobState, StatusResponse, SyncResponse};

/// Connection settings for [`HttpModelClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
  /// Endpoint for synchronous runs: `POST {base_url}/{model_id}`.
  pub base_url: String,
  /// Endpoint for queued runs: `POST {queue_url}/{model_id}`.
  pub queue_url: String,
  /// Sent as `Authorization: Key <api_key>` when set.
  pub api_key: Option<String>,
  /// Per-request timeout.
  pub timeout_ms: u64,
}

impl Default for HttpClientConfig {
  fn default() -> Self {
    Self {
      base_url: "https://fal.run".to_string(),
      queue_url: "https://queue.fal.run".to_string(),
      api_key: None,
      timeout_ms: 120_000,
    }
  }
}

/// [`ModelClient`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpModelClient {
  client: Client,
  config: HttpClientConfig,
}

#[derive(Deserialize)]
struct Submission {
  #[serde(default)]
  request_id: Option<String>,
}

impl HttpModelClient {
  pub fn new(config: HttpClientConfig) -> Result<Self, ProviderError> {
    let client = Client::builder()
      .timeout(Duration::from_millis(config.timeout_ms))
      .build()?;
    Ok(Self { client, config })
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    match &self.config.api_key {
      Some(key) if !key.is_empty() => request.header(header::AUTHORIZATION, format!("Key {key}")),
      _ => request,
    }
  }

  async fn post(&self, url: String, request: &InvocationRequest) -> Result<Response, ProviderError> {
    debug!(url = %url, model_id = %request.model_id, "model_request");
    let response = self
      .authorize(self.client.post(url))
      .json(&request.inputs)
      .send()
      .await?;
    Ok(response)
  }

  async fn get_json(&self, url: String) -> Result<Result<Value, String>, ProviderError> {
    let response = self.authorize(self.client.get(url)).send().await?;
    read_body(response).await
  }
}

#[async_trait]
impl ModelClient for HttpModelClient {
  async fn run(&self, request: &InvocationRequest) -> Result<SyncResponse, ProviderError> {
    let url = join_url(&self.config.base_url, &request.model_id);
    let response = self.post(url, request).await?;
    Ok(match read_body(response).await? {
      Ok(data) => SyncResponse::ok(data),
      Err(message) => SyncResponse::failed(message),
    })
  }

  async fn submit(&self, request: &InvocationRequest) -> Result<SyncResponse, ProviderError> {
    let url = join_url(&self.config.queue_url, &request.model_id);
    let response = self.post(url, request).await?;
    let data = match read_body(response).await? {
      Ok(data) => data,
      Err(message) => return Ok(SyncResponse::failed(message)),
    };

    let Submission { request_id } = serde_json::from_value(data.clone())
      .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
    Ok(SyncResponse {
      success: true,
      data: Some(data),
      error: None,
      request_id,
    })
  }

  async fn status(
    &self,
    model_id: &str,
    request_id: &str,
  ) -> Result<StatusResponse, ProviderError> {
    let base = join_url(&self.config.queue_url, model_id);
    let url = format!("{base}/requests/{request_id}/status");
    let body = self
      .get_json(url)
      .await?
      .map_err(|message| ProviderError::Rejected { message })?;
    let mut status: StatusResponse = serde_json::from_value(body)
      .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    // The status endpoint does not carry the output; fetch it once the job is done.
    if status.status == JobState::Completed && status.result.is_none() && status.logs.is_empty() {
      let url = format!("{base}/requests/{request_id}");
      let result = self
        .get_json(url)
        .await?
        .map_err(|message| ProviderError::Rejected { message })?;
      status.result = Some(result);
    }
    Ok(status)
  }
}

/// Read a response body. Non-2xx statuses yield `Err(message)`.
async fn read_body(response: Response) -> Result<Result<Value, String>, ProviderError> {
  let status = response.status();
  let text = response.text().await?;

  if !status.is_success() {
    return Ok(Err(error_message(&text, status.as_u16())));
  }
  serde_json::from_str(&text)
    .map(Ok)
    .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
}

/// The service's `message` or `error` field, or the raw body text.
fn error_message(body: &str, status: u16) -> String {
  let parsed: Option<Value> = serde_json::from_str(body).ok();
  let field = parsed.as_ref().and_then(|v| {
    ["message", "error", "detail"]
      .iter()
      .find_map(|key| v.get(*key).and_then(Value::as_str))
  });

  match field {
    Some(message) => message.to_string(),
    None if !body.trim().is_empty() => body.trim().to_string(),
    None => format!("request failed with status {status}"),
  }
}

fn join_url(base: &str, path: &str) -> String {
  format!(
    "{}/{}",
    base.trim_end_matches('/'),
    path.trim_start_matches('/')
  )
}
