pub mod error;
pub mod config;
pub mod params;
pub mod request;
pub mod response;
pub mod stream;
pub mod providers;
pub mod endpoint;
pub mod client;

use async_trait::async_trait;
use serde_json::Value;

/*

sambanova: batch and streaming completions against SambaNova
inference endpoints, behind one request/decode core.

sambanova/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and host integration traits
│   ├── error.rs        # Error type, usage vs inference errors
│   ├── config.rs       # Backend configs and env resolution
│   ├── params.rs       # Tuning parameter encoding
│   ├── request.rs      # Prompt normalization, request assembly
│   ├── response.rs     # Batch body normalization
│   ├── stream.rs       # SSE fragments and stream lifecycle
│   ├── endpoint.rs     # HTTP session, predict / predict_stream
│   ├── client.rs       # Completion facade
│   └── providers/      # Per-backend request and payload strategy
│       ├── mod.rs
│       ├── sambaverse.rs
│       └── sambastudio.rs
└── tests/              # Mock-server integration tests

*/

pub use client::{Completion, CompletionStream, SambaStudio, Sambaverse};
pub use config::{CompletionSettings, SambaStudioConfig, SambaverseConfig};
pub use error::Error;
pub use params::{TuningOptions, TuningParameters};
pub use providers::{Backend, SambaStudioBackend, SambaverseBackend};
pub use request::Prompt;
pub use response::NormalizedResult;
pub use stream::{CompletionFragment, FragmentStream, StreamState};

// ===== Host Integration =====

/// Receives each streamed fragment's text as it arrives
pub trait FragmentSink: Send
{   fn on_new_fragment(&mut self, text: &str);
}

impl<F> FragmentSink for F
where
  F: FnMut(&str) + Send
{   fn on_new_fragment(&mut self, text: &str)
    {   self(text)
    }
}

/// Generic completion provider consumed by a host framework
#[async_trait]
pub trait CompletionProvider: Send + Sync
{   /// Provider label, e.g. "Sambaverse LLM"
    fn provider_type(&self) -> &'static str;

    /// Parameters identifying this provider, at least the model options
    fn identifying_params(&self) -> Value;

    /// Run the model on `prompt`, notifying `sink` per streamed fragment
    async fn call(
      &self
    , prompt: Prompt
    , stop: Option<Vec<String>>
    , sink: Option<&mut dyn FragmentSink>
    ) -> Result<String, Error>;
}

#[async_trait]
impl<B: Backend> CompletionProvider for Completion<B>
{   fn provider_type(&self) -> &'static str
    {   B::PROVIDER_TYPE
    }

    fn identifying_params(&self) -> Value
    {   Completion::identifying_params(self)
    }

    async fn call(
      &self
    , prompt: Prompt
    , stop: Option<Vec<String>>
    , sink: Option<&mut dyn FragmentSink>
    ) -> Result<String, Error>
    {   self.generate(prompt, stop.as_deref(), sink).await
    }
}
