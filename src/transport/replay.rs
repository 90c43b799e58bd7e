use std::collections::VecDeque;
use std::sync::Mutex;

use serde::Deserialize;
use serde_json::Value;

use crate::transport::wire::{AjaxRequest, AjaxResponse, ProgressReport, ResponseBody};
use crate::transport::{Transport, TransportError};

/// One recorded server answer.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedResponse {
    #[serde(default = "default_status")]
    pub status: u16,
    /// Whether the verification header was present.
    #[serde(default)]
    pub token: bool,
    #[serde(default)]
    pub body: Value,
    /// Raw text body (iframe-style upload answer). Takes precedence over
    /// `body`.
    #[serde(default)]
    pub raw: Option<String>,
}

fn default_status() -> u16 {
    200
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Recording {
    Many { responses: Vec<RecordedResponse> },
    One(RecordedResponse),
}

impl RecordedResponse {
    fn into_response(self) -> AjaxResponse {
        AjaxResponse {
            status: self.status,
            token: self.token.then(|| "1".to_string()),
            body: match self.raw {
                Some(raw) => ResponseBody::Text(raw),
                None => ResponseBody::Json(self.body),
            },
        }
    }
}

/// Serves pre-recorded responses in order and remembers every request it
/// was given.
#[derive(Default)]
pub struct ReplayTransport {
    responses: Mutex<VecDeque<AjaxResponse>>,
    progress: Mutex<VecDeque<ProgressReport>>,
    sent: Mutex<Vec<AjaxRequest>>,
}

impl ReplayTransport {
    pub fn new(responses: Vec<AjaxResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Load a recording.
    ///
    /// Accepted shapes: a bare command array (treated as a verified 200
    /// response, which is what the server always sends), a single
    /// `{status, token, body, raw}` object, or `{"responses": [...]}`.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        if value.is_array() {
            return Ok(Self::new(vec![AjaxResponse::verified(value)]));
        }
        let responses = match serde_json::from_value::<Recording>(value)? {
            Recording::Many { responses } => responses,
            Recording::One(one) => vec![one],
        };
        Ok(Self::new(
            responses
                .into_iter()
                .map(RecordedResponse::into_response)
                .collect(),
        ))
    }

    pub fn push_progress(&self, report: ProgressReport) {
        if let Ok(mut queue) = self.progress.lock() {
            queue.push_back(report);
        }
    }

    pub fn sent(&self) -> Vec<AjaxRequest> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Transport for ReplayTransport {
    fn send(&self, request: &AjaxRequest) -> Result<AjaxResponse, TransportError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(request.clone());
        }
        let next = self.responses.lock().ok().and_then(|mut q| q.pop_front());
        match next {
            Some(response) if (200..300).contains(&response.status) => Ok(response),
            Some(response) => Err(TransportError::Status {
                url: request.url.clone(),
                status: response.status,
            }),
            None => Err(TransportError::Exhausted {
                url: request.url.clone(),
            }),
        }
    }

    fn poll_progress(&self, url: &str, _method: &str) -> Result<ProgressReport, TransportError> {
        self.progress
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .ok_or_else(|| TransportError::Exhausted {
                url: url.to_string(),
            })
    }
}
