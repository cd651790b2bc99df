//! Request and response DTOs for the inference server, the RAG endpoints, and the comparison view.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Sampling parameters forwarded to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub repetition_penalty: f64,
    pub do_sample: bool,
    pub temperature: f64,
    pub top_p: f64,
    pub max_length: u32,
    pub max_new_tokens: u32,
}

impl Default for GenerationParams {
    /// Server-side defaults applied when a request omits a field.
    fn default() -> Self {
        Self {
            repetition_penalty: 1.1,
            do_sample: true,
            temperature: 0.1,
            top_p: 0.1,
            max_length: 756,
            max_new_tokens: 1024,
        }
    }
}

impl GenerationParams {
    /// Parameters the `/generate` client sends by default.
    pub fn client() -> Self {
        Self {
            max_length: 512,
            max_new_tokens: 100,
            ..Self::default()
        }
    }

    /// Parameters for interactive streaming generation.
    pub fn streaming() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_new_tokens: 150,
            ..Self::default()
        }
    }
}

/// Invalid generation parameter in a `/generate` request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid value for {field}: {value}")]
pub struct ParamError {
    pub field: &'static str,
    pub value: String,
}

/// Body of `POST /generate`.
///
/// Sampling fields are kept as raw JSON so that numbers sent as strings
/// (`"0.5"`) and loosely typed booleans (`"1"`, `"True"`) are accepted.
/// An absent field is `None`; an explicit `null` is `Some(Value::Null)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub top_p: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<Value>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<Value>,
}

/// Wraps whatever was sent, `null` included, so only a missing key falls back to `default`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, params: &GenerationParams) -> Self {
        Self {
            prompt: Some(prompt.into()),
            repetition_penalty: Some(serde_json::json!(params.repetition_penalty)),
            do_sample: Some(Value::Bool(params.do_sample)),
            temperature: Some(serde_json::json!(params.temperature)),
            top_p: Some(serde_json::json!(params.top_p)),
            max_length: Some(serde_json::json!(params.max_length)),
            max_new_tokens: Some(serde_json::json!(params.max_new_tokens)),
        }
    }

    /// The prompt, if present and non-empty.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.is_empty())
    }

    /// Resolve sampling parameters, falling back to [`GenerationParams::default`] per field.
    pub fn params(&self) -> Result<GenerationParams, ParamError> {
        let d = GenerationParams::default();
        Ok(GenerationParams {
            repetition_penalty: float_field(
                "repetition_penalty",
                self.repetition_penalty.as_ref(),
                d.repetition_penalty,
            )?,
            do_sample: self
                .do_sample
                .as_ref()
                .map(str2bool)
                .unwrap_or(d.do_sample),
            temperature: float_field("temperature", self.temperature.as_ref(), d.temperature)?,
            top_p: float_field("top_p", self.top_p.as_ref(), d.top_p)?,
            max_length: int_field("max_length", self.max_length.as_ref(), d.max_length)?,
            max_new_tokens: int_field(
                "max_new_tokens",
                self.max_new_tokens.as_ref(),
                d.max_new_tokens,
            )?,
        })
    }
}

/// Loose boolean: strings are true only for `"true"`/`"1"` (any case), numbers when non-zero.
pub fn str2bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "1"),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

fn float_field(field: &'static str, value: Option<&Value>, default: f64) -> Result<f64, ParamError> {
    let Some(v) = value else {
        return Ok(default);
    };
    let parsed = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| ParamError {
            field,
            value: v.to_string(),
        })
}

fn int_field(field: &'static str, value: Option<&Value>, default: u32) -> Result<u32, ParamError> {
    let Some(v) = value else {
        return Ok(default);
    };
    let parsed = match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.trunc() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ParamError {
        field,
        value: v.to_string(),
    })
}

/// Successful `/generate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Error body used by every endpoint that fails with a non-200 status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// A text document to index, with free-form metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Question for either RAG flavour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagQueryRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    3
}

/// Answer plus the context it was conditioned on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    #[serde(default)]
    pub context: Vec<String>,
}

/// Body of `POST /compare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareRequest {
    pub query: String,
}

/// One side of the comparison view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    pub title: String,
    pub response: String,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Side-by-side RAG and GraphRAG answers to the same query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    pub query: String,
    pub rag: Panel,
    pub graph_rag: Panel,
}
