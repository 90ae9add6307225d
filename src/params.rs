//! Tuning parameter encoding
//!
//! Backends expect every model option as a `{type, value}` pair where
//! `value` is always the string rendering of the option. Nothing is
//! coerced back on the way in; the backend parses the strings itself.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use log::trace;

/// Generic model options, in insertion order
/// (e.g. `temperature`, `top_k`, `max_tokens_to_generate`)
pub type TuningOptions = serde_json::Map<String, Value>;

/// Option key holding the stop strings
pub const STOP_SEQUENCES: &str = "stop_sequences";

/// One encoded option
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TuningParameter
{   #[serde(rename = "type")]
    pub kind: String
  , pub value: String
}

impl TuningParameter
{   /// Encode a scalar with its kind name and string form
    pub fn from_value(value: &Value) -> Self
    {   let (kind, rendered) = match value
        {   Value::Bool(b) => {
              ("bool", if *b { "True" } else { "False" }.to_string())
            }
          , Value::Number(n) if n.is_f64() => {
              ("float", n.as_f64().map_or_else(|| n.to_string(), render_float))
            }
          , Value::Number(n) => ("int", n.to_string())
          , Value::String(s) => ("str", s.clone())
          , Value::Array(_) => ("list", value.to_string())
          , Value::Object(_) => ("dict", value.to_string())
          , Value::Null => ("NoneType", "None".to_string())
        };
        TuningParameter
        {   kind: kind.to_string()
          , value: rendered
        }
    }

    fn stop_sequences(stops: &[String]) -> Self
    {   TuningParameter
        {   kind: "str".to_string()
          , value: join_stop_sequences(stops)
        }
    }
}

/// Ordered mapping of option name to encoded option
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuningParameters
{   entries: Vec<(String, TuningParameter)>
}

impl TuningParameters
{   /// Encode `options`, replacing any configured stop sequences with
    /// `stop` when the caller supplied a non-empty list.
    pub fn encode(
      options: Option<&TuningOptions>
    , stop: Option<&[String]>
    ) -> Self
    {   let call_stops = stop.filter(|s| !s.is_empty());
        let mut entries = Vec::new();
        let mut stops_emitted = false;

        for (name, value) in options.into_iter().flatten()
        {   if name == STOP_SEQUENCES
            {   stops_emitted = true;
                let param = match call_stops
                {   Some(stops) => TuningParameter::stop_sequences(stops)
                  , None => configured_stop_sequences(value)
                };
                entries.push((name.clone(), param));
                continue;
            }
            entries.push((name.clone(), TuningParameter::from_value(value)));
        }

        if let (false, Some(stops)) = (stops_emitted, call_stops)
        {   entries.push((
              STOP_SEQUENCES.to_string()
            , TuningParameter::stop_sequences(stops)
            ));
        }

        trace!("Encoded {} tuning parameters", entries.len());
        TuningParameters { entries }
    }

    pub fn get(&self, name: &str) -> Option<&TuningParameter>
    {   self.entries
          .iter()
          .find(|(k, _)| k == name)
          .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize
    {   self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.entries.is_empty()
    }

    /// JSON text handed to the request builder
    pub fn to_json(&self) -> String
    {   // Two string fields per entry, serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Serialize for TuningParameters
{   fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
      S: Serializer
    {   let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, param) in &self.entries
        {   map.serialize_entry(name, param)?;
        }
        map.end()
    }
}

/// `["a", "b"]` becomes `"a","b"`
fn join_stop_sequences(stops: &[String]) -> String
{   stops
      .iter()
      .map(|s| format!("\"{}\"", s))
      .collect::<Vec<_>>()
      .join(",")
}

/// Shortest round-trip digits in the backends' float notation:
/// `0.7`, `100.0`, `0.0001`, `1e-05`, `1e+16`
fn render_float(f: f64) -> String
{   if !f.is_finite()
    {   let text = if f.is_nan() { "nan" } else if f > 0.0 { "inf" } else { "-inf" };
        return text.to_string();
    }
    let scientific = format!("{:e}", f);
    let (mantissa, exp) = match scientific.split_once('e')
    {   Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0))
      , None => return scientific
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-')
    {   Some(rest) => ("-", rest)
      , None => ("", mantissa)
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    // Positional between 1e-4 and 1e16, scientific outside
    let body = if (-4..16).contains(&exp)
    {   if exp >= 0
        {   let point = exp as usize + 1;
            if digits.len() > point
            {   format!("{}.{}", &digits[..point], &digits[point..])
            } else
            {   format!("{}{}.0", digits, "0".repeat(point - digits.len()))
            }
        } else
        {   format!("0.{}{}", "0".repeat((-exp - 1) as usize), digits)
        }
    } else
    {   let (head, tail) = digits.split_at(1);
        let fraction = if tail.is_empty() { String::new() } else { format!(".{}", tail) };
        format!(
          "{}{}e{}{:02}"
        , head
        , fraction
        , if exp < 0 { '-' } else { '+' }
        , exp.abs()
        )
    };
    format!("{}{}", sign, body)
}

fn configured_stop_sequences(value: &Value) -> TuningParameter
{   match value
    {   Value::Array(items) => {
          let stops: Vec<String> = items
            .iter()
            .map(|v| match v
            {   Value::String(s) => s.clone()
              , other => other.to_string()
            })
            .collect();
          TuningParameter::stop_sequences(&stops)
        }
      , other => TuningParameter::from_value(other)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    fn options(value: Value) -> TuningOptions
    {   match value
        {   Value::Object(map) => map
          , _ => panic!("options must be an object")
        }
    }

    #[test]
    fn scalar_kinds_and_renderings()
    {   let opts = options(json!({
          "do_sample": false
        , "max_tokens_to_generate": 100
        , "temperature": 0.7
        , "top_p": 1.0
        , "process_prompt": "yes"
        }));
        let params = TuningParameters::encode(Some(&opts), None);

        let sample = params.get("do_sample").unwrap();
        assert_eq!((sample.kind.as_str(), sample.value.as_str()), ("bool", "False"));
        let tokens = params.get("max_tokens_to_generate").unwrap();
        assert_eq!((tokens.kind.as_str(), tokens.value.as_str()), ("int", "100"));
        let temp = params.get("temperature").unwrap();
        assert_eq!((temp.kind.as_str(), temp.value.as_str()), ("float", "0.7"));
        let top_p = params.get("top_p").unwrap();
        assert_eq!(top_p.value, "1.0");
        let prompt = params.get("process_prompt").unwrap();
        assert_eq!((prompt.kind.as_str(), prompt.value.as_str()), ("str", "yes"));
    }

    #[test]
    fn floats_render_in_backend_notation()
    {   let cases = [
          (0.7, "0.7")
        , (100.0, "100.0")
        , (123.45, "123.45")
        , (0.0001, "0.0001")
        , (0.00001, "1e-05")
        , (1e16, "1e+16")
        , (1.5e300, "1.5e+300")
        , (9999999999999998.0, "9999999999999998.0")
        , (-2.5, "-2.5")
        , (0.0, "0.0")
        ];
        for (value, rendered) in cases
        {   let param = TuningParameter::from_value(&json!(value));
            assert_eq!(param.kind, "float");
            assert_eq!(param.value, rendered, "rendering {}", value);
        }
    }

    #[test]
    fn encoded_json_keeps_every_key_and_rendering()
    {   let opts = options(json!({
          "top_k": 50
        , "repetition_penalty": 1
        , "select_expert": "llama-2-7b-chat-hf"
        }));
        let parsed: Value = serde_json::from_str(
          &TuningParameters::encode(Some(&opts), None).to_json()
        ).unwrap();
        let parsed = parsed.as_object().unwrap();

        assert_eq!(parsed.len(), opts.len());
        assert_eq!(parsed["top_k"]["value"], "50");
        assert_eq!(parsed["repetition_penalty"]["value"], "1");
        assert_eq!(parsed["select_expert"]["value"], "llama-2-7b-chat-hf");
        let keys: Vec<&String> = parsed.keys().collect();
        assert_eq!(keys, vec!["top_k", "repetition_penalty", "select_expert"]);
    }

    #[test]
    fn no_options_encode_to_empty_object()
    {   let params = TuningParameters::encode(None, None);
        assert!(params.is_empty());
        assert_eq!(params.to_json(), "{}");
    }

    #[test]
    fn configured_stop_sequences_are_joined()
    {   let opts = options(json!({
          "stop_sequences": ["###", "User:"]
        , "top_k": 1
        }));
        let params = TuningParameters::encode(Some(&opts), None);
        let stops = params.get(STOP_SEQUENCES).unwrap();
        assert_eq!(stops.kind, "str");
        assert_eq!(stops.value, r####""###","User:""####);
    }

    #[test]
    fn call_time_stop_words_replace_configured_ones()
    {   let opts = options(json!({
          "temperature": 0.1
        , "stop_sequences": ["configured"]
        }));
        let stop = vec!["call".to_string(), "time".to_string()];
        let params = TuningParameters::encode(Some(&opts), Some(stop.as_slice()));

        let stops = params.get(STOP_SEQUENCES).unwrap();
        assert_eq!(stops.value, r#""call","time""#);
        assert!(!stops.value.contains("configured"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn call_time_stop_words_are_appended_without_configured_key()
    {   let opts = options(json!({ "temperature": 0.1 }));
        let stop = vec!["\n".to_string()];
        let params = TuningParameters::encode(Some(&opts), Some(stop.as_slice()));
        let json = params.to_json();
        assert!(json.ends_with(r#""stop_sequences":{"type":"str","value":"\"\n\""}}"#));
    }

    #[test]
    fn empty_call_time_stop_list_keeps_configured_default()
    {   let opts = options(json!({ "stop_sequences": ["keep"] }));
        let params = TuningParameters::encode(Some(&opts), Some(&[][..]));
        assert_eq!(params.get(STOP_SEQUENCES).unwrap().value, r#""keep""#);
    }
}
