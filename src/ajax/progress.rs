use std::time::Duration;

use serde_json::Value;

use crate::dom::parser::parse_fragment;
use crate::dom::{Document, NodeId};
use crate::settings::value_to_string;

pub const DEFAULT_INTERVAL_MS: u64 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Throbber,
    Bar,
    /// No indicator at all.
    None,
}

/// The `progress` element setting.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSettings {
    pub kind: ProgressKind,
    pub message: Option<String>,
    /// Endpoint polled by a progress bar.
    pub url: Option<String>,
    pub interval_ms: u64,
    pub method: String,
}

impl ProgressSettings {
    pub fn throbber(message: Option<String>) -> Self {
        Self {
            kind: ProgressKind::Throbber,
            message,
            url: None,
            interval_ms: DEFAULT_INTERVAL_MS,
            method: "POST".to_string(),
        }
    }

    /// Read a `progress` object. An explicit object replaces the defaults
    /// wholesale, so a missing message stays missing.
    pub fn from_value(value: &Value) -> Self {
        let kind = match value.get("type").and_then(Value::as_str) {
            Some("bar") => ProgressKind::Bar,
            Some("throbber") => ProgressKind::Throbber,
            _ => ProgressKind::None,
        };
        let text = |key: &str| {
            value
                .get(key)
                .filter(|v| !v.is_null())
                .map(value_to_string)
                .filter(|s| !s.is_empty())
        };
        Self {
            kind,
            message: text("message"),
            url: text("url"),
            interval_ms: value
                .get("interval")
                .and_then(Value::as_u64)
                .filter(|i| *i > 0)
                .unwrap_or(DEFAULT_INTERVAL_MS),
            method: text("method").unwrap_or_else(|| "POST".to_string()),
        }
    }
}

/// A running poll of the progress endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressMonitor {
    pub url: String,
    pub interval: Duration,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressBar {
    pub element: NodeId,
    pub monitor: Option<ProgressMonitor>,
}

impl ProgressBar {
    /// Build the bar markup under the given element id.
    pub fn new(doc: &mut Document, id: &str) -> Self {
        let element = doc.create_element_with(
            "div",
            &[("id", id), ("class", "progress"), ("aria-live", "polite")],
        );
        let bar = doc.create_element_with("div", &[("class", "bar")]);
        let filled = doc.create_element_with("div", &[("class", "filled")]);
        let percentage = doc.create_element_with("div", &[("class", "percentage")]);
        let message = doc.create_element_with("div", &[("class", "message")]);
        let nbsp = doc.create_text("\u{a0}");
        doc.append_child(bar, filled);
        doc.append_child(element, bar);
        doc.append_child(element, percentage);
        doc.append_child(message, nbsp);
        doc.append_child(element, message);
        Self {
            element,
            monitor: None,
        }
    }

    /// Update the bar. Percentages outside 0..=100 only change the message.
    pub fn set_progress(&self, doc: &mut Document, percentage: f64, message: &str) {
        if (0.0..=100.0).contains(&percentage) {
            let shown = format!("{}%", format_number(percentage));
            for filled in doc.query_in(self.element, "div.filled") {
                doc.set_style(filled, "width", &shown);
            }
            for label in doc.query_in(self.element, "div.percentage") {
                doc.set_text(label, &shown);
            }
        }
        for target in doc.query_in(self.element, "div.message") {
            doc.remove_children(target);
            for node in parse_fragment(doc, message) {
                doc.append_child(target, node);
            }
        }
    }

    pub fn start_monitoring(&mut self, url: &str, interval_ms: u64, method: &str) {
        self.monitor = Some(ProgressMonitor {
            url: url.to_string(),
            interval: Duration::from_millis(interval_ms),
            method: method.to_string(),
        });
    }

    pub fn stop_monitoring(&mut self) {
        self.monitor = None;
    }
}

/// The indicator currently shown for a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUi {
    Throbber { element: NodeId },
    Bar(ProgressBar),
}

impl ProgressUi {
    pub fn element(&self) -> NodeId {
        match self {
            ProgressUi::Throbber { element } => *element,
            ProgressUi::Bar(bar) => bar.element,
        }
    }
}

/// `<div class="ajax-progress ajax-progress-throbber"><div class="throbber">&nbsp;</div></div>`
/// followed by the message, if any.
pub fn build_throbber(doc: &mut Document, message: Option<&str>) -> NodeId {
    let wrapper = doc.create_element_with("div", &[("class", "ajax-progress ajax-progress-throbber")]);
    let throbber = doc.create_element_with("div", &[("class", "throbber")]);
    let nbsp = doc.create_text("\u{a0}");
    doc.append_child(throbber, nbsp);
    doc.append_child(wrapper, throbber);
    if let Some(message) = message {
        let holder = doc.create_element_with("div", &[("class", "message")]);
        for node in parse_fragment(doc, message) {
            doc.append_child(holder, node);
        }
        doc.append_child(wrapper, holder);
    }
    wrapper
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
