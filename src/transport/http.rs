use std::time::Duration;

use reqwest::Method;
use reqwest::blocking::{Client, multipart};
use reqwest::header::ACCEPT;
use tracing::debug;
use url::Url;

use crate::transport::wire::{
    AjaxRequest, AjaxResponse, ProgressReport, ResponseBody, SubmissionMode, TOKEN_HEADER,
};
use crate::transport::{Transport, TransportError};

/// Blocking HTTP transport. Relative request URLs resolve against the page
/// URL the transport was created for.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let base = Url::parse(base_url).map_err(|e| TransportError::InvalidUrl {
            url: base_url.to_string(),
            source: e,
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| TransportError::Http {
                url: base_url.to_string(),
                source: e,
            })?;
        Ok(Self {
            client,
            base_url: base,
        })
    }

    pub fn resolve(&self, url: &str) -> Result<Url, TransportError> {
        self.base_url
            .join(url)
            .map_err(|e| TransportError::InvalidUrl {
                url: url.to_string(),
                source: e,
            })
    }

    fn multipart_body(request: &AjaxRequest) -> Result<multipart::Form, TransportError> {
        let mut form = multipart::Form::new();
        for (name, value) in &request.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &request.files {
            form = form
                .file(file.name.clone(), &file.path)
                .map_err(|e| TransportError::Io {
                    path: file.path.clone(),
                    source: e,
                })?;
        }
        Ok(form)
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &AjaxRequest) -> Result<AjaxResponse, TransportError> {
        let url = self.resolve(&request.url)?;
        debug!(%url, fields = request.fields.len(), mode = ?request.mode, "sending ajax request");

        let builder = self
            .client
            .post(url.clone())
            .header(ACCEPT, request.accept.as_str());
        let builder = match request.mode {
            SubmissionMode::UrlEncoded => builder.form(&request.fields),
            SubmissionMode::Multipart => builder.multipart(Self::multipart_body(request)?),
        };

        let response = builder.send().map_err(|e| TransportError::Http {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let token = response
            .headers()
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response.text().map_err(|e| TransportError::Http {
            url: url.to_string(),
            source: e,
        })?;

        let body = match request.mode {
            SubmissionMode::Multipart => ResponseBody::Text(text),
            SubmissionMode::UrlEncoded if text.trim().is_empty() => {
                ResponseBody::Json(serde_json::Value::Null)
            }
            SubmissionMode::UrlEncoded => {
                ResponseBody::Json(serde_json::from_str(&text).map_err(|e| {
                    TransportError::Parse {
                        url: url.to_string(),
                        source: e,
                    }
                })?)
            }
        };

        Ok(AjaxResponse {
            status: status.as_u16(),
            token,
            body,
        })
    }

    fn poll_progress(&self, url: &str, method: &str) -> Result<ProgressReport, TransportError> {
        let target = self.resolve(url)?;
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).unwrap_or(Method::POST);
        let response = self
            .client
            .request(method, target.clone())
            .send()
            .map_err(|e| TransportError::Http {
                url: target.to_string(),
                source: e,
            })?;
        response.json().map_err(|e| TransportError::Http {
            url: target.to_string(),
            source: e,
        })
    }
}
