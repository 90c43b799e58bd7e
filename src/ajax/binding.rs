use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::ajax::descriptor::ElementSettings;
use crate::ajax::lifecycle::LifecycleState;
use crate::ajax::progress::ProgressSettings;
use crate::ajax::url::url_is_local;
use crate::dom::{Document, NodeId};
use crate::page::Page;
use crate::settings::is_truthy;
use crate::trace::trace::TraceEvent;
use crate::transport::wire::ACCEPT_DIALOG;

/// Marks elements that already have a descriptor.
pub const PROCESSED_CLASS: &str = "ajax-processed";
/// Links and buttons that request content on click.
pub const USE_AJAX_CLASS: &str = "use-ajax";
/// Buttons that submit their form's action through AJAX.
pub const USE_AJAX_SUBMIT_CLASS: &str = "use-ajax-submit";

/// The AJAX behaviour: bind every element configured in `settings.ajax` or
/// marked with one of the marker classes inside `context`. Safe to call
/// repeatedly; processed elements are skipped.
pub fn attach(page: &mut Page, context: NodeId, settings: &Value) {
    bind_configured(page, settings);
    bind_marked(page, context, USE_AJAX_CLASS);
    bind_marked(page, context, USE_AJAX_SUBMIT_CLASS);
}

fn bind_configured(page: &mut Page, settings: &Value) {
    let Some(Value::Object(entries)) = settings.get("ajax") else {
        return;
    };

    for (base, entry) in entries {
        let anchor = page.document.element_by_id(base);
        if anchor.is_some_and(|a| page.document.has_class(a, PROCESSED_CLASS)) {
            continue;
        }

        let mut element_settings = ElementSettings::from_value(entry);
        let selector = element_settings
            .selector
            .clone()
            .unwrap_or_else(|| format!("#{}", base));
        element_settings.selector = Some(selector.clone());

        for element in page.document.query(&selector) {
            if page.document.has_class(element, PROCESSED_CLASS) {
                continue;
            }
            let id = page.bind(base, element, &element_settings);
            check_origin(page, id);
            page.document.add_class(element, PROCESSED_CLASS);
        }

        if let Some(anchor) = anchor {
            page.document.add_class(anchor, PROCESSED_CLASS);
        }
    }
}

fn bind_marked(page: &mut Page, context: NodeId, class: &str) {
    let mut candidates = page.document.query_in(context, &format!(".{}", class));
    if page.document.has_class(context, class) {
        candidates.insert(0, context);
    }

    for element in candidates {
        if page.document.has_class(element, PROCESSED_CLASS) {
            continue;
        }
        page.document.add_class(element, PROCESSED_CLASS);

        let element_settings = if class == USE_AJAX_SUBMIT_CLASS {
            submit_settings(&page.document, element)
        } else {
            link_settings(&page.document, element)
        };
        let base = element_key(&page.document, element);
        debug!(base, class, "binding marked element");
        let id = page.bind(&base, element, &element_settings);
        check_origin(page, id);
    }
}

/// Settings for a `.use-ajax` element.
fn link_settings(doc: &Document, element: NodeId) -> ElementSettings {
    let mut settings = ElementSettings {
        progress: Some(ProgressSettings::throbber(None)),
        event: Some("click".to_string()),
        ..ElementSettings::default()
    };

    if let Some(href) = doc.attr(element, "href").filter(|h| !h.is_empty()) {
        settings.url = Some(href.to_string());
    }
    settings.accepts = doc
        .attr(element, "data-accepts")
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    if doc.attr(element, "data-dialog").map(data_value).is_some_and(|v| is_truthy(&v)) {
        let options = doc
            .attr(element, "data-dialog-options")
            .map(data_value)
            .filter(is_truthy)
            .unwrap_or_else(|| Value::Object(Map::new()));
        settings.dialog = Some(options);
        settings.accepts = Some(ACCEPT_DIALOG.to_string());
    }
    settings
}

/// Settings for a `.use-ajax-submit` element.
fn submit_settings(doc: &Document, element: NodeId) -> ElementSettings {
    ElementSettings {
        url: doc
            .form_of(element)
            .and_then(|f| doc.attr(f, "action"))
            .map(str::to_string),
        set_click: true,
        event: Some("click".to_string()),
        progress: Some(ProgressSettings::throbber(None)),
        ..ElementSettings::default()
    }
}

/// A `data-*` attribute value, decoded the way jQuery's `.data()` does:
/// JSON when it parses, the raw string otherwise.
pub fn data_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// The element's id, or a fingerprint of its position in the tree for
/// elements without one.
pub fn element_key(doc: &Document, element: NodeId) -> String {
    if let Some(id) = doc.attr(element, "id").filter(|i| !i.is_empty()) {
        return id.to_string();
    }

    let mut path = Vec::new();
    let mut current = element;
    while let Some(parent) = doc.parent(current) {
        let index = doc
            .children(parent)
            .iter()
            .position(|c| *c == current)
            .unwrap_or_default();
        path.push(format!("{}:{}", doc.tag(current).unwrap_or("#"), index));
        current = parent;
    }
    path.reverse();

    let mut hasher = Sha1::new();
    hasher.update(path.join("/").as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("ajax-{}", &digest[..12])
}

/// Bind-time origin check: an untrusted remote URL is reported now and
/// refused when the element is triggered.
fn check_origin(page: &Page, id: crate::ajax::descriptor::DescriptorId) {
    let Some(descriptor) = page.descriptor_by_id(id) else {
        return;
    };
    let base_path = page.settings.base_path();
    if !descriptor.is_trusted(&page.settings) && !url_is_local(&descriptor.url, &page.url, &base_path) {
        warn!(descriptor = %descriptor.id, url = %descriptor.url, "callback URL is not local and not trusted");
        page.trace(
            TraceEvent::now(&descriptor.id, LifecycleState::Idle)
                .with_url(&descriptor.url)
                .with_detail("bound to an untrusted, non-local URL"),
        );
    }
}
