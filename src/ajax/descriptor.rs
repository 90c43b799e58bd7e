use serde_json::{Map, Value};

use crate::ajax::lifecycle::LifecycleState;
use crate::ajax::progress::{ProgressSettings, ProgressUi};
use crate::ajax::url::rewrite_nojs;
use crate::dom::{Document, NodeId};
use crate::settings::{Settings, is_truthy, value_to_string};

/// Key of a descriptor in the page registry. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub usize);

/// Identifies one issued request: the descriptor plus its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle {
    pub descriptor: DescriptorId,
    pub seq: u64,
}

/// Per-element AJAX settings as supplied by the server or derived from
/// markup. Every field is optional; [`Descriptor::new`] fills the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSettings {
    pub selector: Option<String>,
    pub event: Option<String>,
    pub keypress: Option<bool>,
    pub prevent: Option<String>,
    pub url: Option<String>,
    pub wrapper: Option<String>,
    pub effect: Option<String>,
    pub speed: Option<String>,
    pub method: Option<String>,
    pub progress: Option<ProgressSettings>,
    pub submit: Option<Map<String, Value>>,
    pub accepts: Option<String>,
    pub dialog: Option<Value>,
    pub set_click: bool,
    pub disable: Option<bool>,
}

impl ElementSettings {
    /// Best-effort read of a `settings.ajax[id]` entry: fields with an
    /// unexpected shape fall back to their defaults.
    pub fn from_value(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .filter(|v| !v.is_null() && !v.is_object() && !v.is_array())
                .map(value_to_string)
                .filter(|s| !s.is_empty())
        };
        let flag = |key: &str| value.get(key).filter(|v| !v.is_null()).map(is_truthy);

        Self {
            selector: text("selector"),
            event: text("event"),
            keypress: flag("keypress"),
            prevent: text("prevent"),
            url: text("url"),
            wrapper: text("wrapper"),
            effect: text("effect"),
            speed: text("speed"),
            method: text("method"),
            progress: value
                .get("progress")
                .filter(|p| p.is_object())
                .map(ProgressSettings::from_value),
            submit: value.get("submit").and_then(Value::as_object).cloned(),
            accepts: text("accepts"),
            dialog: value.get("dialog").filter(|d| is_truthy(d)).cloned(),
            set_click: flag("setClick").unwrap_or(false),
            disable: flag("disable"),
        }
    }
}

/// Live state and configuration of one AJAX-enabled element.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub id: String,
    pub element: NodeId,
    pub form: Option<NodeId>,
    pub url: String,
    pub event: String,
    pub keypress: bool,
    pub prevent: Option<String>,
    pub selector: String,
    pub wrapper: Option<String>,
    pub effect: String,
    pub speed: String,
    pub method: String,
    pub progress: ProgressSettings,
    pub submit: Map<String, Value>,
    pub accepts: Option<String>,
    pub dialog: Option<Value>,
    pub set_click: bool,
    pub disable: bool,
    pub trusted: bool,

    pub state: LifecycleState,
    pub in_flight: Vec<RequestHandle>,
    /// Highest sequence number issued so far.
    pub issued: u64,
    pub response_settings: Option<Value>,
    pub progress_ui: Option<ProgressUi>,
}

const FORM_ASSOCIATED: &[&str] = &[
    "button", "fieldset", "input", "object", "output", "select", "textarea",
];

impl Descriptor {
    pub fn new(
        base: &str,
        element: NodeId,
        element_settings: &ElementSettings,
        doc: &Document,
        settings: &mut Settings,
        default_message: &str,
    ) -> Self {
        let form = doc
            .tag(element)
            .filter(|t| FORM_ASSOCIATED.contains(t))
            .and_then(|_| doc.form_of(element));

        // Without an explicit callback URL, links use their href and form
        // controls their form's action.
        let raw_url = element_settings
            .url
            .clone()
            .or_else(|| {
                if doc.tag(element) == Some("a") {
                    doc.attr(element, "href").map(str::to_string)
                } else {
                    form.and_then(|f| doc.attr(f, "action")).map(str::to_string)
                }
            })
            .unwrap_or_default();
        let url = rewrite_nojs(&raw_url);

        // Trusting the nojs URL trusts its ajax twin.
        if let Some(original) = &element_settings.url {
            if settings.url_is_ajax_trusted(original) && !settings.url_is_ajax_trusted(&url) {
                settings.trust_url(&url);
            }
        }
        let trusted = settings.url_is_ajax_trusted(&url);

        let mut submit = element_settings.submit.clone().unwrap_or_else(|| {
            let mut m = Map::new();
            m.insert("js".to_string(), Value::Bool(true));
            m
        });
        if let Some(dialog) = &element_settings.dialog {
            submit.insert("dialogOptions".to_string(), dialog.clone());
        }

        Self {
            id: base.to_string(),
            element,
            form,
            url,
            event: element_settings
                .event
                .clone()
                .unwrap_or_else(|| "mousedown".to_string()),
            keypress: element_settings.keypress.unwrap_or(true),
            prevent: element_settings.prevent.clone(),
            selector: element_settings
                .selector
                .clone()
                .unwrap_or_else(|| format!("#{}", base)),
            wrapper: element_settings.wrapper.as_ref().map(|w| format!("#{}", w)),
            effect: element_settings
                .effect
                .clone()
                .unwrap_or_else(|| "none".to_string()),
            speed: element_settings
                .speed
                .clone()
                .unwrap_or_else(|| "none".to_string()),
            method: element_settings
                .method
                .clone()
                .unwrap_or_else(|| "replaceWith".to_string()),
            progress: element_settings
                .progress
                .clone()
                .unwrap_or_else(|| ProgressSettings::throbber(Some(default_message.to_string()))),
            submit,
            accepts: element_settings.accepts.clone(),
            dialog: element_settings.dialog.clone(),
            set_click: element_settings.set_click,
            disable: element_settings.disable.unwrap_or(true),
            trusted,
            state: LifecycleState::Idle,
            in_flight: Vec::new(),
            issued: 0,
            response_settings: None,
            progress_ui: None,
        }
    }

    pub fn is_trusted(&self, settings: &Settings) -> bool {
        self.trusted || settings.url_is_ajax_trusted(&self.url)
    }

    /// The Accept header for this descriptor's requests.
    pub fn accept_header(&self) -> String {
        self.accepts
            .clone()
            .unwrap_or_else(|| crate::transport::wire::ACCEPT_AJAX.to_string())
    }

    /// Settings that apply while processing the current response.
    pub fn effective_settings<'a>(&'a self, global: &'a Settings) -> &'a Value {
        self.response_settings.as_ref().unwrap_or(global.value())
    }
}
