use thiserror::Error;

/// Errors raised while invoking an external model.
#[derive(Debug, Error)]
pub enum ProviderError {
  /// Transport failure talking to the model service.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The service refused the request or reported an error for it.
  #[error("{message}")]
  Rejected { message: String },

  /// A queued job finished in the `FAILED` state, or finished without a result.
  #[error("{message}")]
  JobFailed { message: String },

  /// The job never reached a terminal state.
  #[error("polling timeout after {attempts} attempts")]
  PollingTimeout { attempts: u32 },

  /// The service answered with a body this client cannot interpret.
  #[error("malformed response: {0}")]
  MalformedResponse(String),

  #[error("invocation cancelled")]
  Cancelled,
}
