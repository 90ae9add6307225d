//! Batch response normalization
//!
//! Every batch call ends in a [`NormalizedResult`], whatever the HTTP
//! status and whether or not the body could be decoded.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, trace};

use crate::error::Error;

/// SSE-style framing prefix on Sambaverse batch bodies
pub const DATA_PREFIX: &str = "data: ";

/// Uniform result of one batch call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult
{   pub status_code: u16
  , /// Decoded payload, present when the body parsed
    pub data: Option<Value>
  , /// Decode failure, present when the body did not parse
    pub error_detail: Option<String>
}

impl NormalizedResult
{   pub fn decoded(status_code: u16, data: Value) -> Self
    {   NormalizedResult
        {   status_code
          , data: Some(data)
          , error_detail: None
        }
    }

    pub fn failed(status_code: u16, detail: impl Into<String>) -> Self
    {   NormalizedResult
        {   status_code
          , data: None
          , error_detail: Some(detail.into())
        }
    }

    fn from_parse(status_code: u16, parsed: Result<Value, String>) -> Self
    {   match parsed
        {   Ok(data) => NormalizedResult::decoded(status_code, data)
          , Err(detail) => {
              debug!("Response body did not decode: {}", detail);
              NormalizedResult::failed(status_code, detail)
            }
        }
    }

    pub fn is_success(&self) -> bool
    {   self.status_code == 200
    }

    /// Decode failure, or else the payload's own `detail` string
    pub fn detail(&self) -> Option<String>
    {   if let Some(detail) = &self.error_detail
        {   return Some(detail.clone());
        }
        self.payload_str("/detail")
    }

    /// The payload's `message` string, if any
    pub fn message(&self) -> Option<String>
    {   self.payload_str("/message")
    }

    /// Completion text at `pointer` (RFC 6901) inside the payload
    pub fn completion(&self, pointer: &str) -> Result<String, Error>
    {   let data = self.data.as_ref().ok_or_else(|| {
          Error::ParseError(
            self.error_detail
              .clone()
              .unwrap_or_else(|| "empty response payload".to_string())
          )
        })?;
        data.pointer(pointer)
          .and_then(Value::as_str)
          .map(str::to_string)
          .ok_or_else(|| {
            Error::ParseError(format!(
              "response payload has no completion at {}", pointer
            ))
          })
    }

    fn payload_str(&self, pointer: &str) -> Option<String>
    {   self.data
          .as_ref()
          .and_then(|d| d.pointer(pointer))
          .and_then(Value::as_str)
          .map(str::to_string)
    }
}

/// Sambaverse bodies: the last line carries the payload, optionally
/// framed as `data: {...}`.
pub fn decode_framed_body(status_code: u16, body: &str) -> NormalizedResult
{   trace!("Decoding framed body ({} bytes)", body.len());
    let parsed = body
      .trim()
      .lines()
      .last()
      .filter(|line| !line.is_empty())
      .ok_or_else(|| "empty response body".to_string())
      .and_then(|line| {
        let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
        serde_json::from_str::<Value>(payload).map_err(|e| e.to_string())
      });
    NormalizedResult::from_parse(status_code, parsed)
}

/// SambaStudio bodies: the whole body is the payload
pub fn decode_json_body(status_code: u16, body: &str) -> NormalizedResult
{   trace!("Decoding JSON body ({} bytes)", body.len());
    let parsed = serde_json::from_str::<Value>(body)
      .map_err(|e| e.to_string());
    NormalizedResult::from_parse(status_code, parsed)
}
