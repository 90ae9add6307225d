//! HTTP endpoint handler
//!
//! One handler owns one `reqwest::Client`. The client pools connections
//! internally and is `Send + Sync`, so overlapping calls on the same
//! handler each check out their own connection.
//!
//! The optional timeout bounds connecting for every call, and the whole
//! exchange only for batch calls. A stream stays open for as long as
//! the server keeps sending.

use std::time::Duration;

use log::{debug, error, trace, warn};

use crate::error::Error;
use crate::providers::Backend;
use crate::request::{build_request, PreparedRequest, Prompt};
use crate::response::NormalizedResult;
use crate::stream::FragmentStream;

/// Issues batch and streaming predict calls for one backend
#[derive(Debug, Clone)]
pub struct EndpointHandler<B: Backend>
{   base_url: String
  , backend: B
  , http_client: reqwest::Client
  , timeout: Option<Duration>
}

impl<B: Backend> EndpointHandler<B>
{   /// Create a handler with a fresh HTTP session
    pub fn new(
      base_url: impl Into<String>
    , backend: B
    , timeout: Option<Duration>
    ) -> Result<Self, Error>
    {   let base_url = base_url.into();
        debug!("Creating {} endpoint handler for {}", B::PROVIDER_TYPE, base_url);

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout
        {   builder = builder.connect_timeout(timeout);
        }
        let http_client = builder.build().map_err(|e| {
          error!("Failed to build HTTP client: {}", e);
          Error::HttpError(e.to_string())
        })?;

        Ok(EndpointHandler
        {   base_url: base_url.trim_end_matches('/').to_string()
          , backend
          , http_client
          , timeout
        })
    }

    pub fn backend(&self) -> &B
    {   &self.backend
    }

    pub fn base_url(&self) -> &str
    {   &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration>
    {   self.timeout
    }

    /// Batch predict. Decode failures land in the result, only
    /// request-building and transport failures are returned as errors.
    pub async fn predict(
      &self
    , prompt: &Prompt
    , tuning_params: &str
    ) -> Result<NormalizedResult, Error>
    {   let request = build_request(&self.backend, prompt, tuning_params, false)?;
        let response = self.send(request, self.timeout).await?;

        let status_code = response.status().as_u16();
        trace!("{} response status: {}", B::PROVIDER_TYPE, status_code);

        let result = match response.text().await
        {   Ok(body) => self.backend.decode_response(status_code, &body)
          , Err(e) => {
              warn!("Failed to read response body: {}", e);
              NormalizedResult::failed(status_code, e.to_string())
            }
        };
        Ok(result)
    }

    /// Streaming predict. The returned stream reads the connection
    /// lazily, one event per poll.
    pub async fn predict_stream(
      &self
    , prompt: &Prompt
    , tuning_params: &str
    ) -> Result<FragmentStream, Error>
    {   let request = build_request(&self.backend, prompt, tuning_params, true)?;
        let response = self.send(request, None).await?;

        let status = response.status();
        if status.is_success()
        {   trace!("{} stream opened", B::PROVIDER_TYPE);
        } else
        {   warn!(
              "{} stream opened with status {}, expecting no events"
            , B::PROVIDER_TYPE
            , status
            );
        }
        Ok(FragmentStream::from_response(response))
    }

    async fn send(&self, request: PreparedRequest, timeout: Option<Duration>)
      -> Result<reqwest::Response, Error>
    {   let url = format!("{}{}", self.base_url, request.path);
        debug!("POST {}", url);
        let mut builder = self.http_client
          .post(&url)
          .headers(request.headers)
          .json(&request.body);
        if let Some(timeout) = timeout
        {   builder = builder.timeout(timeout);
        }
        builder
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::HttpError(e.to_string())
          })
    }
}
