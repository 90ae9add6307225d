//! Prompt normalization and request assembly shared by both backends

use serde::{Deserialize, Serialize};
use serde_json::Value;
use reqwest::header::HeaderMap;
use log::trace;

use crate::error::Error;
use crate::providers::Backend;

/// Prompt input: one string or an ordered batch of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt
{   Single(String)
  , Batch(Vec<String>)
}

impl Prompt
{   /// Normalized input units, a single prompt becomes a batch of one
    pub fn inputs(&self) -> Vec<String>
    {   match self
        {   Prompt::Single(s) => vec![s.clone()]
          , Prompt::Batch(items) => items.clone()
        }
    }
}

impl From<&str> for Prompt
{   fn from(s: &str) -> Self
    {   Prompt::Single(s.to_string())
    }
}

impl From<String> for Prompt
{   fn from(s: String) -> Self
    {   Prompt::Single(s)
    }
}

impl From<Vec<String>> for Prompt
{   fn from(items: Vec<String>) -> Self
    {   Prompt::Batch(items)
    }
}

impl From<Vec<&str>> for Prompt
{   fn from(items: Vec<&str>) -> Self
    {   Prompt::Batch(items.into_iter().map(String::from).collect())
    }
}

/// JSON body posted to both batch and streaming endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest
{   pub inputs: Vec<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>
}

/// Everything needed to issue one call, minus the base URL
#[derive(Debug, Clone)]
pub struct PreparedRequest
{   pub path: String
  , pub headers: HeaderMap
  , pub body: PredictRequest
}

/// Parse the tuning parameter string, empty means no `params` at all
pub fn parse_tuning_params(tuning_params: &str)
  -> Result<Option<Value>, Error>
{   if tuning_params.is_empty()
    {   return Ok(None);
    }
    serde_json::from_str(tuning_params)
      .map(Some)
      .map_err(|e| Error::InvalidParams(e.to_string()))
}

/// Assemble path, headers and body for `backend`.
///
/// Fails before any network activity when `tuning_params` is non-empty
/// and not valid JSON, or when a credential cannot be sent as a header.
pub fn build_request<B: Backend>(
  backend: &B
, prompt: &Prompt
, tuning_params: &str
, streaming: bool
) -> Result<PreparedRequest, Error>
{   let params = parse_tuning_params(tuning_params)?;
    let inputs = backend.encode_inputs(prompt.inputs())?;
    let path = if streaming
    {   backend.stream_path()
    } else
    {   backend.predict_path()
    };

    let request = PreparedRequest
    {   path
      , headers: backend.headers()?
      , body: PredictRequest { inputs, params }
    };
    trace!(
      "{} request to {} with {} inputs"
    , B::PROVIDER_TYPE
    , request.path
    , request.body.inputs.len()
    );
    Ok(request)
}
