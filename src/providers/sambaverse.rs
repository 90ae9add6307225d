use serde::Serialize;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use log::error;

use crate::error::Error;
use crate::response::{decode_framed_body, NormalizedResult};
use crate::config::{require, SAMBAVERSE_MODEL_NAME_ENV};
use super::{header_value, Backend};

const PREDICT_PATH: &str = "/api/predict";
const CONVERSATION_ID: &str = "sambaverse-conversation-id";
const MODEL_NAME_HEADER: &str = "modelname";

// ===== Conversation Envelope =====

#[derive(Debug, Clone, Serialize)]
struct ConversationMessage<'a>
{   message_id: u32
  , role: &'a str
  , content: &'a str
}

#[derive(Debug, Clone, Serialize)]
struct Conversation<'a>
{   conversation_id: &'a str
  , messages: [ConversationMessage<'a>; 1]
}

// ===== Sambaverse Backend =====

/// Multi-tenant router addressed by model name
#[derive(Clone)]
pub struct SambaverseBackend
{   api_key: String
  , model_name: String
}

impl SambaverseBackend
{   pub fn new(
      api_key: impl Into<String>
    , model_name: impl Into<String>
    ) -> Self
    {   SambaverseBackend
        {   api_key: api_key.into()
          , model_name: model_name.into()
        }
    }
}

impl std::fmt::Debug for SambaverseBackend
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("SambaverseBackend")
          .field("api_key", &"***")
          .field("model_name", &self.model_name)
          .finish()
    }
}

impl Backend for SambaverseBackend
{   const PROVIDER_TYPE: &'static str = "Sambaverse LLM";
    const COMPLETION_POINTER: &'static str = "/completion";

    fn validate(&self) -> Result<(), Error>
    {   if self.api_key.trim().is_empty()
        {   error!("No API key for Sambaverse");
            return Err(Error::MissingApiKey("Sambaverse".to_string()));
        }
        require("sambaverse_model_name", &self.model_name, SAMBAVERSE_MODEL_NAME_ENV)
    }

    fn predict_path(&self) -> String
    {   PREDICT_PATH.to_string()
    }

    // Streaming is selected by reading the body as a stream, not by path
    fn stream_path(&self) -> String
    {   PREDICT_PATH.to_string()
    }

    fn headers(&self) -> Result<HeaderMap, Error>
    {   let mut headers = HeaderMap::new();
        headers.insert("key", header_value("key", &self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
          MODEL_NAME_HEADER
        , header_value(MODEL_NAME_HEADER, &self.model_name)?
        );
        Ok(headers)
    }

    fn encode_inputs(&self, inputs: Vec<String>) -> Result<Vec<String>, Error>
    {   inputs
          .iter()
          .map(|content| {
            let envelope = Conversation
            {   conversation_id: CONVERSATION_ID
              , messages: [
                  ConversationMessage
                  {   message_id: 0
                    , role: "user"
                    , content
                  }
                ]
            };
            serde_json::to_string(&envelope)
              .map_err(|e| Error::ParseError(e.to_string()))
          })
          .collect()
    }

    fn decode_response(&self, status_code: u16, body: &str) -> NormalizedResult
    {   decode_framed_body(status_code, body)
    }

    fn api_error(&self, result: &NormalizedResult) -> Error
    {   Error::ApiError
        {   status_code: result.status_code
          , detail: result.detail().unwrap_or_else(|| "None".to_string())
          , message: Some(
              result.message().unwrap_or_else(|| "None".to_string())
            )
        }
    }
}
