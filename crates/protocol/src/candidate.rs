//! Upload-initiation candidates.
//!
//! The platform's create-transfer-target contract is not stable across
//! versions, so the engine carries an ordered list of known variants and
//! tries them one after another. Each variant is plain configuration: a
//! URL, a JSON payload template and the rules that decide whether a
//! response carries a usable transfer target.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{FileDescriptor, TransferTarget};

/// One guessed upload-initiation contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointCandidate {
    /// Short label used in logs and errors. Defaults to the URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Absolute URL, or a path joined onto the platform base URL.
    pub url: String,
    /// JSON body template. String values may contain `{file_name}`,
    /// `{file_stem}`, `{extension}` and `{file_size}`.
    #[serde(default = "default_payload")]
    pub payload: Value,
    #[serde(default)]
    pub accept: Acceptance,
}

/// Rules that decide whether a response carries a transfer target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    /// Field holding the storage URL.
    #[serde(default = "default_url_field")]
    pub url_field: String,
    /// Fields tried in order for the transfer id.
    #[serde(default = "default_id_fields")]
    pub id_fields: Vec<String>,
    /// Envelope fields searched when the root object has no target.
    #[serde(default = "default_envelopes")]
    pub envelopes: Vec<String>,
}

fn default_payload() -> Value {
    serde_json::json!({
        "name": "{file_name}",
        "type": "ITEM",
        "extension": "{extension}",
    })
}

fn default_url_field() -> String {
    "uploadUrl".into()
}

fn default_id_fields() -> Vec<String> {
    vec!["fileId".into(), "id".into()]
}

fn default_envelopes() -> Vec<String> {
    vec!["result".into(), "data".into()]
}

impl Default for Acceptance {
    fn default() -> Self {
        Self {
            url_field: default_url_field(),
            id_fields: default_id_fields(),
            envelopes: default_envelopes(),
        }
    }
}

impl EndpointCandidate {
    /// Creates a candidate with the default payload template and rules.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
            payload: default_payload(),
            accept: Acceptance::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Identifier used in logs and in discovery errors.
    pub fn id(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    /// Resolves the request URL against `base_url` when it is relative.
    pub fn resolve_url(&self, base_url: &str) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            self.url.clone()
        } else {
            format!(
                "{}/{}",
                base_url.trim_end_matches('/'),
                self.url.trim_start_matches('/')
            )
        }
    }

    /// Fills the payload template for `file`.
    pub fn render_payload(&self, file: &FileDescriptor) -> Value {
        render(&self.payload, file)
    }

    /// Returns the transfer target if `body` satisfies the acceptance rules.
    ///
    /// The root object is checked first, then each envelope field in order.
    pub fn accept(&self, body: &Value) -> Option<TransferTarget> {
        let root = body.as_object()?;
        std::iter::once(root)
            .chain(
                self.accept
                    .envelopes
                    .iter()
                    .filter_map(|env| root.get(env).and_then(Value::as_object)),
            )
            .find_map(|obj| self.extract(obj))
    }

    fn extract(&self, obj: &Map<String, Value>) -> Option<TransferTarget> {
        let upload_url = obj
            .get(&self.accept.url_field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())?;

        let transfer_id = self
            .accept
            .id_fields
            .iter()
            .filter_map(|field| obj.get(field))
            .find_map(non_empty_id)?;

        Some(TransferTarget {
            upload_url: upload_url.to_string(),
            transfer_id,
            endpoint: self.id().to_string(),
        })
    }
}

fn non_empty_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn render(template: &Value, file: &FileDescriptor) -> Value {
    match template {
        Value::String(s) if s == "{file_size}" => Value::from(file.size),
        Value::String(s) => Value::String(
            s.replace("{file_name}", &file.name)
                .replace("{file_stem}", file.stem())
                .replace("{extension}", file.extension())
                .replace("{file_size}", &file.size.to_string()),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| render(v, file)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render(v, file)))
                .collect(),
        ),
        other => other.clone(),
    }
}
