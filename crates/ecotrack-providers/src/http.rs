//! Shared request plumbing: client construction and error classification.

use std::time::Duration;

use ecotrack_core::provider::FetchError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// Build the HTTP client shared by all adapters.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based. `timeout`
/// bounds every request end to end, body included.
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
  Client::builder()
    .timeout(timeout)
    .user_agent(concat!("ecotrack-ingest/", env!("CARGO_PKG_VERSION")))
    .build()
}

/// Send `req` and decode a JSON body, mapping every failure onto
/// [`FetchError`].
pub(crate) async fn get_json<T: DeserializeOwned>(
  req: RequestBuilder,
) -> Result<T, FetchError> {
  let resp = req.send().await.map_err(classify)?;

  let status = resp.status();
  if !status.is_success() {
    return Err(FetchError::Status(status.as_u16()));
  }

  let body = resp.bytes().await.map_err(classify)?;
  serde_json::from_slice(&body).map_err(|e| FetchError::Malformed(e.to_string()))
}

fn classify(err: reqwest::Error) -> FetchError {
  if err.is_timeout() {
    FetchError::Timeout
  } else if err.is_decode() {
    FetchError::Malformed(err.to_string())
  } else {
    FetchError::Network(err.to_string())
  }
}
