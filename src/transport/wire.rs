use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ACCEPT_AJAX: &str = "application/vnd.backdrop-ajax";
pub const ACCEPT_DIALOG: &str = "application/vnd.backdrop-dialog";
pub const TOKEN_HEADER: &str = "X-Backdrop-Ajax-Token";

/// How the request body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    /// `application/x-www-form-urlencoded`; the response is JSON.
    UrlEncoded,
    /// `multipart/form-data` (file uploads); the response arrives as text,
    /// the way a hidden-iframe upload would see it.
    Multipart,
}

/// A file selected in a file input, sent as a multipart part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileField {
    pub name: String,
    pub path: String,
}

/// One outgoing AJAX POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AjaxRequest {
    pub url: String,
    pub accept: String,
    pub mode: SubmissionMode,
    pub fields: Vec<(String, String)>,
    pub files: Vec<FileField>,
}

impl AjaxRequest {
    /// All values submitted under `name`, in order.
    pub fn field_values(&self, name: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.field_values(name).into_iter().next()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Already-decoded JSON (`null` for an empty body).
    Json(Value),
    /// Raw text that still has to be parsed.
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AjaxResponse {
    pub status: u16,
    /// Value of the verification header, if present.
    pub token: Option<String>,
    pub body: ResponseBody,
}

impl AjaxResponse {
    /// A verified JSON response.
    pub fn verified(body: Value) -> Self {
        Self {
            status: 200,
            token: Some("1".to_string()),
            body: ResponseBody::Json(body),
        }
    }

    /// A JSON response without the verification header.
    pub fn unverified(body: Value) -> Self {
        Self {
            status: 200,
            token: None,
            body: ResponseBody::Json(body),
        }
    }

    pub fn has_valid_token(&self) -> bool {
        self.token.as_deref() == Some("1")
    }
}

/// A progress-bar poll result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProgressReport {
    #[serde(default)]
    pub status: Value,
    #[serde(default)]
    pub percentage: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}
