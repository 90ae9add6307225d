//! Backend variants
//!
//! Both backends share the same transport and decoding core. A
//! [`Backend`] only knows its request shape, header set, paths and
//! where the completion lives in a decoded payload.

pub mod sambaverse;
pub mod sambastudio;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::Error;
use crate::response::NormalizedResult;

// Re-export for convenience
pub use sambaverse::SambaverseBackend;
pub use sambastudio::SambaStudioBackend;

/// SSE event name the servers use to report an in-band failure
pub const ERROR_EVENT: &str = "error_event";

/// Per-variant request and payload strategy
pub trait Backend: Send + Sync
{   /// Label reported to host frameworks
    const PROVIDER_TYPE: &'static str;
    /// JSON pointer of the completion text in a decoded batch payload
    const COMPLETION_POINTER: &'static str;

    /// Fail if a required credential or identifier is empty
    fn validate(&self) -> Result<(), Error>;

    fn predict_path(&self) -> String;

    fn stream_path(&self) -> String;

    fn headers(&self) -> Result<HeaderMap, Error>;

    /// Turn normalized prompt strings into the `inputs` array
    fn encode_inputs(&self, inputs: Vec<String>) -> Result<Vec<String>, Error>;

    /// Normalize a fully read batch body
    fn decode_response(&self, status_code: u16, body: &str) -> NormalizedResult;

    /// Remote failure for a non-200 batch result
    fn api_error(&self, result: &NormalizedResult) -> Error;

    fn supports_stop_words(&self) -> bool
    {   true
    }
}

pub(crate) fn header_value(name: &str, value: &str)
  -> Result<HeaderValue, Error>
{   HeaderValue::from_str(value).map_err(|e| {
      Error::InvalidConfiguration(format!(
        "invalid {} header value: {}", name, e
      ))
    })
}
