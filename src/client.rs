use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::stream::{Stream, StreamExt};
use serde_json::{json, Value};
use log::{debug, error, info};

use crate::config::{SambaStudioConfig, SambaverseConfig};
use crate::endpoint::EndpointHandler;
use crate::error::Error;
use crate::params::{TuningOptions, TuningParameters};
use crate::providers::{Backend, SambaStudioBackend, SambaverseBackend};
use crate::request::Prompt;
use crate::stream::{CompletionFragment, FragmentStream, StreamState};
use crate::FragmentSink;

/// Sambaverse completions
pub type Sambaverse = Completion<SambaverseBackend>;

/// SambaStudio completions
pub type SambaStudio = Completion<SambaStudioBackend>;

/// Completion client for one backend.
///
/// Holds its own HTTP session; two clients never share state. A single
/// client may serve overlapping calls since the session pools
/// connections per request.
#[derive(Debug, Clone)]
pub struct Completion<B: Backend>
{   handler: EndpointHandler<B>
  , model_kwargs: Option<TuningOptions>
  , streaming: bool
}

impl Completion<SambaverseBackend>
{   pub fn new(config: SambaverseConfig) -> Result<Self, Error>
    {   config.validate()?;
        let backend = SambaverseBackend::new(config.api_key, config.model_name);
        Completion::assemble(
          config.url
        , backend
        , config.settings.model_kwargs
        , config.settings.streaming
        , config.settings.timeout_secs
        )
    }
}

impl Completion<SambaStudioBackend>
{   pub fn new(config: SambaStudioConfig) -> Result<Self, Error>
    {   config.validate()?;
        let backend = SambaStudioBackend::new(
          config.api_key
        , config.project_id
        , config.endpoint_id
        );
        Completion::assemble(
          config.base_url
        , backend
        , config.settings.model_kwargs
        , config.settings.streaming
        , config.settings.timeout_secs
        )
    }
}

impl<B: Backend> Completion<B>
{   /// Build a client around any backend; credentials are checked here,
    /// before any request can be made.
    pub fn with_backend(
      base_url: impl Into<String>
    , backend: B
    , model_kwargs: Option<TuningOptions>
    , streaming: bool
    , timeout_secs: Option<u64>
    ) -> Result<Self, Error>
    {   backend.validate()?;
        Completion::assemble(base_url, backend, model_kwargs, streaming, timeout_secs)
    }

    // Callers validate first, through the config or the backend
    fn assemble(
      base_url: impl Into<String>
    , backend: B
    , model_kwargs: Option<TuningOptions>
    , streaming: bool
    , timeout_secs: Option<u64>
    ) -> Result<Self, Error>
    {   let handler = EndpointHandler::new(
          base_url
        , backend
        , timeout_secs.map(Duration::from_secs)
        )?;
        info!(
          "{} ready (streaming: {})"
        , B::PROVIDER_TYPE
        , streaming
        );
        Ok(Completion
        {   handler
          , model_kwargs
          , streaming
        })
    }

    pub fn handler(&self) -> &EndpointHandler<B>
    {   &self.handler
    }

    pub fn is_streaming(&self) -> bool
    {   self.streaming
    }

    pub fn model_kwargs(&self) -> Option<&TuningOptions>
    {   self.model_kwargs.as_ref()
    }

    pub fn provider_type(&self) -> &'static str
    {   B::PROVIDER_TYPE
    }

    /// Parameters that identify this client to a host framework
    pub fn identifying_params(&self) -> Value
    {   json!({ "model_kwargs": self.model_kwargs })
    }

    /// Encoded tuning parameters for one call.
    ///
    /// Fails with a usage error when the backend takes no stop words
    /// and the caller passed some.
    pub fn tuning_params(&self, stop: Option<&[String]>)
      -> Result<String, Error>
    {   let stop = stop.filter(|s| !s.is_empty());
        if stop.is_some() && !self.handler.backend().supports_stop_words()
        {   error!("{} called with stop words", B::PROVIDER_TYPE);
            return Err(Error::StopWordsNotSupported(
              B::PROVIDER_TYPE.to_string()
            ));
        }
        Ok(TuningParameters::encode(self.model_kwargs.as_ref(), stop).to_json())
    }

    /// Generate a completion for `prompt`.
    ///
    /// In streaming mode every fragment's text is forwarded to `sink` as
    /// it arrives and the texts are concatenated in arrival order.
    /// Otherwise one batch call is made and the completion extracted.
    pub async fn generate(
      &self
    , prompt: impl Into<Prompt>
    , stop: Option<&[String]>
    , sink: Option<&mut dyn FragmentSink>
    ) -> Result<String, Error>
    {   let prompt = prompt.into();
        let tuning_params = self.tuning_params(stop)?;
        debug!("generate on {} (streaming: {})", B::PROVIDER_TYPE, self.streaming);

        let result = if self.streaming
        {   self.collect_stream(&prompt, &tuning_params, sink).await
        } else
        {   self.complete(&prompt, &tuning_params).await
        };
        result.map_err(Error::into_inference)
    }

    /// Lazily stream fragments for `prompt`.
    ///
    /// With streaming mode off the returned stream is already exhausted.
    pub async fn stream(
      &self
    , prompt: impl Into<Prompt>
    , stop: Option<&[String]>
    ) -> Result<CompletionStream, Error>
    {   let prompt = prompt.into();
        let tuning_params = self.tuning_params(stop)?;
        if !self.streaming
        {   debug!("{} not in streaming mode, nothing to stream", B::PROVIDER_TYPE);
            return Ok(CompletionStream::empty());
        }

        let fragments = self.handler
          .predict_stream(&prompt, &tuning_params)
          .await
          .map_err(Error::into_inference)?;
        Ok(CompletionStream::new(fragments))
    }

    async fn complete(&self, prompt: &Prompt, tuning_params: &str)
      -> Result<String, Error>
    {   let response = self.handler.predict(prompt, tuning_params).await?;
        if !response.is_success()
        {   let err = self.handler.backend().api_error(&response);
            error!("{}", err);
            return Err(err);
        }
        response.completion(B::COMPLETION_POINTER)
    }

    async fn collect_stream(
      &self
    , prompt: &Prompt
    , tuning_params: &str
    , mut sink: Option<&mut dyn FragmentSink>
    ) -> Result<String, Error>
    {   let mut fragments = self.handler
          .predict_stream(prompt, tuning_params)
          .await?;

        let mut completion = String::new();
        while let Some(fragment) = fragments.next().await
        {   let fragment = fragment?;
            if let Some(sink) = sink.as_mut()
            {   sink.on_new_fragment(fragment.text());
            }
            completion.push_str(fragment.text());
        }
        debug!(
          "Collected {} fragments ({} bytes)"
        , fragments.delivered()
        , completion.len()
        );
        Ok(completion)
    }
}

/// Fragment stream handed to callers; lower-layer failures surface
/// as inference errors.
#[derive(Debug)]
pub struct CompletionStream
{   fragments: Option<FragmentStream>
}

impl CompletionStream
{   fn new(fragments: FragmentStream) -> Self
    {   CompletionStream
        {   fragments: Some(fragments)
        }
    }

    fn empty() -> Self
    {   CompletionStream
        {   fragments: None
        }
    }

    pub fn state(&self) -> StreamState
    {   self.fragments
          .as_ref()
          .map_or(StreamState::Closed, FragmentStream::state)
    }

    pub fn error_seen(&self) -> bool
    {   self.fragments
          .as_ref()
          .map_or(false, FragmentStream::error_seen)
    }

    /// Release the connection without reading further
    pub fn close(&mut self)
    {   if let Some(fragments) = self.fragments.as_mut()
        {   fragments.close();
        }
    }
}

impl Stream for CompletionStream
{   type Item = Result<CompletionFragment, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>)
      -> Poll<Option<Self::Item>>
    {   match self.get_mut().fragments.as_mut()
        {   Some(fragments) => {
              fragments
                .poll_next_unpin(cx)
                .map(|item| item.map(|r| r.map_err(Error::into_inference)))
            }
          , None => Poll::Ready(None)
        }
    }
}
