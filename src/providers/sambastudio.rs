use reqwest::header::HeaderMap;
use log::error;

use crate::error::Error;
use crate::response::{decode_json_body, NormalizedResult};
use crate::config::{
  require, SAMBASTUDIO_ENDPOINT_ID_ENV, SAMBASTUDIO_PROJECT_ID_ENV,
};
use super::{header_value, Backend};

/// Dedicated endpoint addressed by project and endpoint id
#[derive(Clone)]
pub struct SambaStudioBackend
{   api_key: String
  , project_id: String
  , endpoint_id: String
}

impl SambaStudioBackend
{   pub fn new(
      api_key: impl Into<String>
    , project_id: impl Into<String>
    , endpoint_id: impl Into<String>
    ) -> Self
    {   SambaStudioBackend
        {   api_key: api_key.into()
          , project_id: project_id.into()
          , endpoint_id: endpoint_id.into()
        }
    }
}

impl std::fmt::Debug for SambaStudioBackend
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("SambaStudioBackend")
          .field("api_key", &"***")
          .field("project_id", &self.project_id)
          .field("endpoint_id", &self.endpoint_id)
          .finish()
    }
}

impl Backend for SambaStudioBackend
{   const PROVIDER_TYPE: &'static str = "Sambastudio LLM";
    const COMPLETION_POINTER: &'static str = "/data/0/completion";

    fn validate(&self) -> Result<(), Error>
    {   if self.api_key.trim().is_empty()
        {   error!("No API key for SambaStudio");
            return Err(Error::MissingApiKey("SambaStudio".to_string()));
        }
        require(
          "sambastudio_project_id"
        , &self.project_id
        , SAMBASTUDIO_PROJECT_ID_ENV
        )?;
        require(
          "sambastudio_endpoint_id"
        , &self.endpoint_id
        , SAMBASTUDIO_ENDPOINT_ID_ENV
        )
    }

    fn predict_path(&self) -> String
    {   format!("/api/predict/nlp/{}/{}", self.project_id, self.endpoint_id)
    }

    fn stream_path(&self) -> String
    {   format!(
          "/api/predict/nlp/stream/{}/{}"
        , self.project_id
        , self.endpoint_id
        )
    }

    fn headers(&self) -> Result<HeaderMap, Error>
    {   let mut headers = HeaderMap::new();
        headers.insert("key", header_value("key", &self.api_key)?);
        Ok(headers)
    }

    fn encode_inputs(&self, inputs: Vec<String>) -> Result<Vec<String>, Error>
    {   Ok(inputs)
    }

    fn decode_response(&self, status_code: u16, body: &str) -> NormalizedResult
    {   decode_json_body(status_code, body)
    }

    fn api_error(&self, result: &NormalizedResult) -> Error
    {   Error::ApiError
        {   status_code: result.status_code
          , detail: result.detail().unwrap_or_else(|| "None".to_string())
          , message: None
        }
    }

    fn supports_stop_words(&self) -> bool
    {   false
    }
}
