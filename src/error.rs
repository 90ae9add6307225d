use thiserror::Error as ThisError;

/// Custom error type for completion operations
/// Implements Clone so results can be handed across tasks freely
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error
{   /// API key is missing for a backend
    #[error("Missing API key for: {0}")]
    MissingApiKey(String)
  , /// Required configuration field is empty or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String)
  , /// Tuning parameter string is not valid JSON
    #[error("Invalid tuning parameters: {0}")]
    InvalidParams(String)
  , /// Caller supplied stop words to a backend without stop support
    #[error("stop words are not supported by {0}")]
    StopWordsNotSupported(String)
  , /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(String)
  , /// Event stream broke mid-read
    #[error("Stream error: {0}")]
    StreamError(String)
  , /// API returned a non-200 status on a batch call
    #[error(
      "Sambanova /complete call failed with status code {status_code}. Details: {detail}{}"
    , message_suffix(.message)
    )]
    ApiError
    {   status_code: u16
      , detail: String
      , message: Option<String>
    }
  , /// Failed to parse API response
    #[error("Parse error: {0}")]
    ParseError(String)
  , /// Any lower-layer failure surfaced at the completion boundary
    #[error("Error raised by the inference endpoint: {0}")]
    Inference(String)
}

fn message_suffix(message: &Option<String>) -> String
{   match message
    {   Some(m) => format!(". Message: {}", m)
      , None => String::new()
    }
}

impl Error
{   /// Local usage errors are raised before any network activity
    /// and are never rewrapped as inference errors.
    pub fn is_usage_error(&self) -> bool
    {   matches!(
          self
        , Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_)
          | Error::InvalidParams(_)
          | Error::StopWordsNotSupported(_)
        )
    }

    /// Wrap transport, decode and remote failures into
    /// `Error::Inference`, keeping the original message.
    pub fn into_inference(self) -> Error
    {   if self.is_usage_error()
        {   return self;
        }
        match self
        {   Error::Inference(_) => self
          , other => Error::Inference(other.to_string())
        }
    }
}
