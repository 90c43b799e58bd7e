//! Request lifecycle of a descriptor:
//! `Idle → Serializing → Submitted → (Success | Error) → Cleanup → Idle`.
//!
//! Triggering an element returns [`PendingRequest`]s. The caller hands each
//! one to a transport and feeds the outcome back through
//! [`Page::complete`]; nothing in the page is held across that round trip.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ajax::descriptor::{DescriptorId, RequestHandle};
use crate::ajax::dispatcher;
use crate::ajax::error::AjaxError;
use crate::ajax::progress::{ProgressBar, ProgressKind, ProgressMonitor, ProgressUi, build_throbber};
use crate::ajax::request::{html_id_fields, page_state_fields, param_pairs, serialize_form};
use crate::ajax::url::url_is_local;
use crate::behaviors::DetachTrigger;
use crate::dom::NodeId;
use crate::page::{BindingKind, Page};
use crate::page::locale::{check_plain, format_size};
use crate::settings::{is_truthy, value_to_string};
use crate::trace::trace::TraceEvent;
use crate::transport::wire::{AjaxRequest, AjaxResponse, ProgressReport, ResponseBody, SubmissionMode};
use crate::transport::{Transport, TransportError};

const KEY_ENTER: u32 = 13;
const KEY_SPACE: u32 = 32;

static TEXTAREA_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^\s*<textarea[^>]*>(.*)</textarea>\s*$").expect("textarea pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Idle,
    Serializing,
    Submitted,
    Success,
    Error,
    Cleanup,
}

/// An event delivered to an element.
#[derive(Debug, Clone, PartialEq)]
pub enum DomEvent {
    Named(String),
    KeyPress { which: u32 },
}

impl DomEvent {
    pub fn named(name: &str) -> Self {
        DomEvent::Named(name.to_string())
    }

    pub fn click() -> Self {
        Self::named("click")
    }

    pub fn mousedown() -> Self {
        Self::named("mousedown")
    }

    pub fn enter() -> Self {
        DomEvent::KeyPress { which: KEY_ENTER }
    }

    pub fn space() -> Self {
        DomEvent::KeyPress { which: KEY_SPACE }
    }
}

/// A submitted request waiting for its response.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub handle: RequestHandle,
    pub request: AjaxRequest,
}

#[derive(Debug, Default)]
pub struct EventOutcome {
    /// Whether the browser's default action would be suppressed.
    pub default_prevented: bool,
    pub requests: Vec<PendingRequest>,
}

/// How a response was handled.
#[derive(Debug)]
pub enum Completion {
    /// Commands were dispatched.
    Applied { commands: usize },
    /// A newer request had been issued; the response was dropped.
    Superseded,
    /// Transport, parse or verification failure. No commands ran.
    Failed(AjaxError),
}

impl Page {
    // ========================================================================
    // Triggering
    // ========================================================================

    /// Deliver `event` to `element` and run every AJAX binding it hits.
    ///
    /// Untrusted callback URLs and malformed dialog options are returned as
    /// errors before anything is submitted.
    pub fn dispatch_event(&mut self, element: NodeId, event: &DomEvent) -> Result<EventOutcome, AjaxError> {
        if !self.document.is_connected(element) {
            self.release_detached();
            debug!(?element, "event on a detached element ignored");
            return Ok(EventOutcome::default());
        }
        let bindings: Vec<_> = self
            .bindings
            .iter()
            .filter(|b| b.element == element)
            .cloned()
            .collect();

        let mut outcome = EventOutcome::default();
        for binding in bindings {
            match (&binding.kind, event) {
                (BindingKind::Trigger(name), DomEvent::Named(fired)) if name == fired => {
                    self.ensure_url_allowed(binding.descriptor)?;
                    let (pending, allow_default) = self.event_response(binding.descriptor, element)?;
                    outcome.requests.push(pending);
                    if !allow_default {
                        outcome.default_prevented = true;
                    }
                }
                (BindingKind::Keypress, DomEvent::KeyPress { which }) => {
                    if let Some(nested) = self.keypress_response(binding.descriptor, element, *which)? {
                        outcome.requests.extend(nested.requests);
                        outcome.default_prevented = true;
                    }
                }
                (BindingKind::Prevent(name), DomEvent::Named(fired)) if name == fired => {
                    outcome.default_prevented = true;
                }
                _ => {}
            }
        }
        Ok(outcome)
    }

    /// Convenience wrapper around [`Page::dispatch_event`] addressing the
    /// element by id.
    pub fn trigger(&mut self, element_id: &str, event: &DomEvent) -> Result<EventOutcome, AjaxError> {
        let element = self
            .document
            .element_by_id(element_id)
            .ok_or_else(|| AjaxError::UnknownElement(element_id.to_string()))?;
        self.dispatch_event(element, event)
    }

    /// Enter always activates; Space activates unless typed into a text
    /// field, where it must stay a space.
    fn keypress_response(
        &mut self,
        id: DescriptorId,
        element: NodeId,
        which: u32,
    ) -> Result<Option<EventOutcome>, AjaxError> {
        let kind = self.document.control_type(element);
        let activates = which == KEY_ENTER
            || (which == KEY_SPACE && !matches!(kind.as_deref(), Some("text" | "textarea")));
        if !activates {
            return Ok(None);
        }
        let descriptor = &self.descriptors[&id];
        let target = descriptor.element;
        let event = DomEvent::Named(descriptor.event.clone());
        self.dispatch_event(target, &event).map(Some)
    }

    fn ensure_url_allowed(&self, id: DescriptorId) -> Result<(), AjaxError> {
        let descriptor = &self.descriptors[&id];
        let base_path = self.settings.base_path();
        if descriptor.is_trusted(&self.settings) || url_is_local(&descriptor.url, &self.url, &base_path) {
            return Ok(());
        }
        self.trace(
            TraceEvent::now(&descriptor.id, descriptor.state)
                .with_url(&descriptor.url)
                .with_detail("refused: callback URL is not local and not trusted"),
        );
        Err(AjaxError::UntrustedUrl {
            url: descriptor.url.clone(),
        })
    }

    /// Returns the pending request and whether the default action is kept
    /// (checkboxes and radios keep it so they still toggle).
    fn event_response(&mut self, id: DescriptorId, element: NodeId) -> Result<(PendingRequest, bool), AjaxError> {
        let (form, set_click) = {
            let descriptor = &self.descriptors[&id];
            (descriptor.form, descriptor.set_click)
        };
        if let (Some(form), true) = (form, set_click) {
            self.form_clicked.insert(form, element);
        }

        self.transition(id, LifecycleState::Serializing, None);
        let request = match self.before_serialize(id) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "ajax submission aborted");
                self.transition(id, LifecycleState::Idle, Some(e.to_string()));
                return Err(e);
            }
        };
        let pending = self.before_send(id, request)?;

        let allow_default = matches!(
            self.document.control_type(element).as_deref(),
            Some("checkbox" | "radio")
        );
        Ok((pending, allow_default))
    }

    // ========================================================================
    // Serializing
    // ========================================================================

    fn before_serialize(&mut self, id: DescriptorId) -> Result<AjaxRequest, AjaxError> {
        let descriptor = self.descriptors[&id].clone();

        // Let widgets flush their state into field values first.
        let mut fields = Vec::new();
        let mut files = Vec::new();
        let mut mode = SubmissionMode::UrlEncoded;
        if let Some(form) = descriptor.form {
            let settings = descriptor.effective_settings(&self.settings).clone();
            self.detach_behaviors(form, Some(&settings), DetachTrigger::Serialize);

            let clicked = self.form_clicked.get(&form).copied();
            let submission = serialize_form(&self.document, form, clicked);
            fields = submission.fields;
            files = submission.files;
            mode = submission.mode;
        }

        if let Some(dialog) = descriptor.submit.get("dialogOptions") {
            if !dialog.is_object() {
                return Err(AjaxError::InvalidDialogOptions {
                    url: descriptor.url.clone(),
                    message: self.t("The data-dialog-options property on this link is not valid JSON.", &[]),
                });
            }
        }
        for (key, value) in &descriptor.submit {
            param_pairs(key, value, &mut fields);
        }
        fields.extend(html_id_fields(&self.document));
        fields.extend(page_state_fields(&self.settings.page_state()));

        Ok(AjaxRequest {
            url: descriptor.url.clone(),
            accept: descriptor.accept_header(),
            mode,
            fields,
            files,
        })
    }

    // ========================================================================
    // Submitted
    // ========================================================================

    fn before_send(&mut self, id: DescriptorId, mut request: AjaxRequest) -> Result<PendingRequest, AjaxError> {
        let descriptor = self
            .descriptors
            .get_mut(&id)
            .ok_or_else(|| AjaxError::UnknownDescriptor(format!("#{}", id.0)))?;
        descriptor.issued += 1;
        let handle = RequestHandle {
            descriptor: id,
            seq: descriptor.issued,
        };
        let descriptor = descriptor.clone();
        let element = descriptor.element;

        // The element is disabled below, so an iframe-style upload has to
        // carry its value explicitly.
        if request.mode == SubmissionMode::Multipart && descriptor.form.is_some() {
            request
                .fields
                .push(("ajax_iframe_upload".to_string(), "1".to_string()));
            if let (Some(name), Some(value)) = (
                self.document.attr(element, "name").filter(|n| !n.is_empty()),
                self.document.value(element),
            ) {
                request.fields.push((name.to_string(), check_plain(&value)));
            }
        }

        if descriptor.disable {
            self.document.add_class(element, "progress-disabled");
            self.document.set_disabled(element, true);
        }

        // A second request while one is outstanding replaces the indicator.
        self.remove_progress(id);
        let progress = &descriptor.progress;
        let ui = match progress.kind {
            ProgressKind::Bar => {
                let element_id = self.document.attr(element, "id").unwrap_or_default().to_string();
                let mut bar = ProgressBar::new(&mut self.document, &format!("ajax-progress-{}", element_id));
                if let Some(message) = &progress.message {
                    bar.set_progress(&mut self.document, -1.0, message);
                }
                if let Some(url) = &progress.url {
                    bar.start_monitoring(url, progress.interval_ms, &progress.method);
                }
                self.document
                    .add_class(bar.element, "ajax-progress ajax-progress-bar");
                self.document.insert_after(element, bar.element);
                Some(ProgressUi::Bar(bar))
            }
            ProgressKind::Throbber => {
                let throbber = build_throbber(&mut self.document, progress.message.as_deref());
                self.document.insert_after(element, throbber);
                Some(ProgressUi::Throbber { element: throbber })
            }
            ProgressKind::None => None,
        };

        if let Some(live) = self.descriptors.get_mut(&id) {
            live.progress_ui = ui;
            live.in_flight.push(handle);
        }
        self.transition(id, LifecycleState::Submitted, None);
        self.trace(
            TraceEvent::now(&descriptor.id, LifecycleState::Submitted)
                .with_seq(handle.seq)
                .with_url(&request.url)
                .with_detail(format!("{} fields", request.fields.len())),
        );

        Ok(PendingRequest { handle, request })
    }

    /// Report upload progress on a progress bar.
    pub fn upload_progress(&mut self, id: DescriptorId, position: u64, total: u64, percent: f64) {
        let current = format_size(&self.settings, position);
        let total = format_size(&self.settings, total);
        let message = self.t(
            "Uploading... (@current of @total)",
            &[("@current", current.as_str()), ("@total", total.as_str())],
        );
        if let Some(Some(ProgressUi::Bar(bar))) = self.descriptors.get(&id).map(|d| d.progress_ui.clone()) {
            bar.set_progress(&mut self.document, percent, &message);
        }
    }

    /// Poll the progress endpoint once for a monitoring progress bar.
    /// Returns whether monitoring continues.
    pub fn poll_progress(&mut self, id: DescriptorId, transport: &dyn Transport) -> bool {
        let Some(Some(ProgressUi::Bar(bar))) = self.descriptors.get(&id).map(|d| d.progress_ui.clone()) else {
            return false;
        };
        let Some(monitor) = bar.monitor.clone() else {
            return false;
        };

        match transport.poll_progress(&monitor.url, &monitor.method) {
            Ok(ProgressReport {
                status,
                percentage,
                message,
                data,
            }) => {
                if is_truthy(&status) {
                    bar.set_progress(
                        &mut self.document,
                        percentage.unwrap_or(-1.0),
                        message.as_deref().unwrap_or_default(),
                    );
                    true
                } else {
                    self.window
                        .progress_errors
                        .push(data.unwrap_or_else(|| value_to_string(&status)));
                    self.stop_monitoring(id);
                    false
                }
            }
            Err(e) => {
                self.window.progress_errors.push(e.to_string());
                self.stop_monitoring(id);
                false
            }
        }
    }

    /// The active progress-bar monitor, if any.
    pub fn progress_monitor(&self, id: DescriptorId) -> Option<ProgressMonitor> {
        match &self.descriptors.get(&id)?.progress_ui {
            Some(ProgressUi::Bar(bar)) => bar.monitor.clone(),
            _ => None,
        }
    }

    fn stop_monitoring(&mut self, id: DescriptorId) {
        if let Some(ProgressUi::Bar(bar)) = self.descriptors.get_mut(&id).and_then(|d| d.progress_ui.as_mut()) {
            bar.stop_monitoring();
        }
    }

    // ========================================================================
    // Completion
    // ========================================================================

    /// Feed the transport outcome of a request back into its lifecycle.
    pub fn complete(
        &mut self,
        handle: RequestHandle,
        result: Result<AjaxResponse, TransportError>,
    ) -> Result<Completion, AjaxError> {
        let completion = self.settle(handle, result)?;
        self.release_detached();
        Ok(completion)
    }

    fn settle(
        &mut self,
        handle: RequestHandle,
        result: Result<AjaxResponse, TransportError>,
    ) -> Result<Completion, AjaxError> {
        let descriptor = self
            .descriptors
            .get_mut(&handle.descriptor)
            .ok_or_else(|| AjaxError::UnknownDescriptor(format!("#{}", handle.descriptor.0)))?;
        let url = descriptor.url.clone();

        // Last request wins.
        if handle.seq < descriptor.issued {
            descriptor.in_flight.retain(|h| *h != handle);
            let (name, state) = (descriptor.id.clone(), descriptor.state);
            debug!(descriptor = %name, seq = handle.seq, "discarding superseded response");
            self.trace(
                TraceEvent::now(&name, state)
                    .with_seq(handle.seq)
                    .with_detail("superseded"),
            );
            return Ok(Completion::Superseded);
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                return Ok(self.fail(handle, AjaxError::Transport { url, source: e }));
            }
        };

        let payload = match response.body {
            ResponseBody::Json(ref value) => value.clone(),
            ResponseBody::Text(ref raw) => match parse_text_payload(raw) {
                Ok(value) => value,
                Err(e) => {
                    return Ok(self.fail(handle, AjaxError::ResponseParse { url, source: e }));
                }
            },
        };

        // Empty answers are harmless; trusted URLs skip the header check
        // because iframe uploads cannot read headers.
        let trusted = self.descriptors[&handle.descriptor].is_trusted(&self.settings);
        if !is_empty_payload(&payload) && !trusted && !response.has_valid_token() {
            let message = self.t("The response failed verification so will not be processed.", &[]);
            return Ok(self.fail(handle, AjaxError::Verification { url, message }));
        }

        Ok(self.succeed(handle, payload, response.status))
    }

    fn succeed(&mut self, handle: RequestHandle, payload: Value, status: u16) -> Completion {
        let id = handle.descriptor;
        self.transition(id, LifecycleState::Success, None);
        self.cleanup(handle);

        let commands = match payload {
            Value::Array(items) => items,
            Value::Object(map) => object_commands(map),
            _ => Vec::new(),
        };
        let applied = dispatcher::run(self, id, &commands, status);

        // Content inserted inside the form was skipped by the insert command
        // so the whole form is attached once here.
        self.reattach_form(id);
        if let Some(descriptor) = self.descriptors.get_mut(&id) {
            descriptor.response_settings = None;
        }
        self.transition(
            id,
            LifecycleState::Idle,
            Some(format!("{} commands applied", applied)),
        );
        Completion::Applied { commands: applied }
    }

    fn fail(&mut self, handle: RequestHandle, error: AjaxError) -> Completion {
        let id = handle.descriptor;
        warn!(descriptor = %self.descriptors[&id].id, error = %error, "ajax request failed");
        self.transition(id, LifecycleState::Error, Some(error.to_string()));
        self.cleanup(handle);
        self.reattach_form(id);
        self.transition(id, LifecycleState::Idle, None);
        Completion::Failed(error)
    }

    fn reattach_form(&mut self, id: DescriptorId) {
        let Some(descriptor) = self.descriptors.get(&id) else {
            return;
        };
        if let Some(form) = descriptor.form.filter(|f| self.document.is_connected(*f)) {
            let settings = descriptor.effective_settings(&self.settings).clone();
            self.attach_behaviors(form, Some(&settings));
        }
    }

    /// Release what a request holds: its in-flight entry and, when it is
    /// the latest request of its descriptor, the progress indicator and the
    /// element lock. A superseded handle leaves the newer request's UI in
    /// place. Calling it again is a no-op.
    pub fn cleanup(&mut self, handle: RequestHandle) {
        let id = handle.descriptor;
        let Some(descriptor) = self.descriptors.get_mut(&id) else {
            return;
        };
        descriptor.in_flight.retain(|h| *h != handle);
        if handle.seq < descriptor.issued {
            return;
        }
        let element = descriptor.element;
        let disable = descriptor.disable;
        let state = descriptor.state;

        self.remove_progress(id);
        if disable {
            self.document.remove_class(element, "progress-disabled");
            self.document.set_disabled(element, false);
        }
        if state != LifecycleState::Idle {
            self.transition(id, LifecycleState::Cleanup, None);
        }
    }

    fn remove_progress(&mut self, id: DescriptorId) {
        let Some(mut ui) = self.descriptors.get_mut(&id).and_then(|d| d.progress_ui.take()) else {
            return;
        };
        self.document.detach(ui.element());
        if let ProgressUi::Bar(bar) = &mut ui {
            bar.stop_monitoring();
        }
    }

    fn transition(&mut self, id: DescriptorId, state: LifecycleState, detail: Option<String>) {
        let Some(descriptor) = self.descriptors.get_mut(&id) else {
            return;
        };
        descriptor.state = state;
        let mut event = TraceEvent::now(&descriptor.id, state);
        if let Some(detail) = detail {
            event = event.with_detail(detail);
        }
        self.trace(event);
    }
}

/// Commands of an object payload: integer keys in ascending numeric order,
/// then the remaining keys as they appeared in the response.
fn object_commands(map: serde_json::Map<String, Value>) -> Vec<Value> {
    let (mut indexed, named): (Vec<_>, Vec<_>) = map
        .into_iter()
        .map(|(key, value)| (array_index(&key), value))
        .partition(|(index, _)| index.is_some());
    indexed.sort_by_key(|(index, _)| *index);
    indexed
        .into_iter()
        .chain(named)
        .map(|(_, value)| value)
        .collect()
}

/// `"7"` is an index; `"07"`, `"+7"` and `"x"` are not.
fn array_index(key: &str) -> Option<u32> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key.len() == 1 || !key.starts_with('0'));
    if !canonical {
        return None;
    }
    key.parse::<u32>().ok().filter(|i| *i != u32::MAX)
}

/// Decode a textual payload, unwrapping the `<textarea>` an iframe upload
/// answer is delivered in. Blank text counts as an empty response.
pub fn parse_text_payload(raw: &str) -> Result<Value, serde_json::Error> {
    let inner = TEXTAREA_WRAPPER
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw);
    if inner.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(inner)
}

/// `null` and the empty string bypass response verification.
pub fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
