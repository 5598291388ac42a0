//! Studioflow Provider
//!
//! Talks to external model services on behalf of invocation nodes.
//!
//! [`ProviderAdapter`] implements the two invocation modes (a synchronous
//! round trip, or submit and poll) on top of any [`ModelClient`].
//! [`HttpModelClient`] is the `reqwest` implementation. [`normalize_output`]
//! maps raw responses to a uniform media value.

mod adapter;
mod client;
mod error;
mod http;
mod normalize;
mod types;

pub use adapter::{PollConfig, ProviderAdapter};
pub use client::ModelClient;
pub use error::ProviderError;
pub use http::{HttpClientConfig, HttpModelClient};
pub use normalize::{MediaKind, normalize_output, primary_payload};
pub use types::{InvocationRequest, JobState, PollProgress, StatusResponse, SyncResponse};
