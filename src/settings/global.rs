use serde::Deserialize;
use serde_json::{Map, Value};

use crate::settings::merge::deep_merge;

/// Page-wide configuration (`Backdrop.settings`).
///
/// Created once when the page loads and dropped with it. Every mutation goes
/// through [`Settings::merge`], including additions to the trusted-URL
/// allow-list.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    value: Value,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            value: Value::Object(Map::new()),
        }
    }
}

/// Assets already present on the page (`ajaxPageState`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageState {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub theme_token: Option<String>,
    #[serde(default)]
    pub css: Map<String, Value>,
    #[serde(default)]
    pub js: Map<String, Value>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a settings object. Anything other than an object yields empty
    /// settings.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(_) => Self { value },
            _ => Self::default(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_value(serde_json::from_str(text)?))
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// Deep-merge `incoming` into the global settings.
    pub fn merge(&mut self, incoming: &Value) {
        if incoming.is_object() {
            deep_merge(&mut self.value, incoming);
        }
    }

    pub fn page_state(&self) -> PageState {
        self.value
            .get("ajaxPageState")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn url_is_ajax_trusted(&self, url: &str) -> bool {
        self.value
            .get("urlIsAjaxTrusted")
            .and_then(|m| m.get(url))
            .is_some_and(is_truthy)
    }

    pub fn trust_url(&mut self, url: &str) {
        let mut trusted = Map::new();
        trusted.insert(url.to_string(), Value::Bool(true));
        let mut patch = Map::new();
        patch.insert("urlIsAjaxTrusted".to_string(), Value::Object(trusted));
        self.merge(&Value::Object(patch));
    }

    /// `basePath`, always ending in `/`.
    pub fn base_path(&self) -> String {
        let base = self
            .value
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or("/");
        if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        }
    }
}

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a scalar the way it would appear in a form-encoded body.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
