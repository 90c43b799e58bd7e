#![allow(dead_code)]

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use backdrop_ajax::ajax::{Completion, DomEvent, PendingRequest};
use backdrop_ajax::behaviors::{Behavior, DetachTrigger};
use backdrop_ajax::dom::{Document, NodeId};
use backdrop_ajax::page::Page;
use backdrop_ajax::settings::Settings;
use backdrop_ajax::transport::AjaxResponse;
use serde_json::Value;

pub const PAGE_URL: &str = "http://example.com/node/1";

pub fn fixture_path(name: &str) -> PathBuf {
    let base = std::env::current_dir().unwrap();
    base.join("tests").join("fixtures").join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name)).unwrap()
}

pub fn fixture_settings(name: &str) -> Value {
    serde_json::from_str(&fixture(name)).unwrap()
}

pub type Log = Rc<RefCell<Vec<String>>>;

/// Records every attach/detach call as `attach:<label>` or
/// `detach:<trigger>:<label>`.
pub struct RecordingBehavior {
    pub log: Log,
}

impl Behavior for RecordingBehavior {
    fn name(&self) -> &str {
        "recorder"
    }

    fn attach(&self, doc: &mut Document, context: NodeId, _settings: &Value) {
        self.log.borrow_mut().push(format!("attach:{}", label(doc, context)));
    }

    fn detach(&self, doc: &mut Document, context: NodeId, _settings: &Value, trigger: DetachTrigger) {
        self.log
            .borrow_mut()
            .push(format!("detach:{}:{}", trigger, label(doc, context)));
    }
}

/// The element's id, else its tag, else `#document`.
pub fn label(doc: &Document, node: NodeId) -> String {
    doc.attr(node, "id")
        .map(str::to_string)
        .or_else(|| doc.tag(node).map(str::to_string))
        .unwrap_or_else(|| "#document".to_string())
}

/// Build a page and run the initial behaviour attachment.
pub fn load_page(html: &str, settings: Value) -> Page {
    let mut page = Page::new(html, PAGE_URL, Settings::from_value(settings));
    page.ready();
    page
}

/// Like [`load_page`] with a [`RecordingBehavior`] registered before the
/// initial attachment.
pub fn load_recorded_page(html: &str, settings: Value) -> (Page, Log) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let mut page = Page::new(html, PAGE_URL, Settings::from_value(settings));
    page.register_behavior(Box::new(RecordingBehavior { log: log.clone() }));
    page.ready();
    (page, log)
}

/// The commands fixture, ready.
pub fn commands_page() -> Page {
    load_page(&fixture("commands.html"), fixture_settings("commands_settings.json"))
}

pub fn by_id(page: &Page, id: &str) -> NodeId {
    page.document
        .element_by_id(id)
        .unwrap_or_else(|| panic!("no element #{}", id))
}

/// Trigger `element_id` and return its single pending request.
pub fn trigger_one(page: &mut Page, element_id: &str, event: &DomEvent) -> PendingRequest {
    let mut outcome = page.trigger(element_id, event).unwrap();
    assert_eq!(outcome.requests.len(), 1, "expected exactly one request");
    outcome.requests.remove(0)
}

/// Click `element_id` and answer with a verified command list.
pub fn respond(page: &mut Page, element_id: &str, commands: Value) -> Completion {
    let pending = trigger_one(page, element_id, &DomEvent::click());
    page.complete(pending.handle, Ok(AjaxResponse::verified(commands)))
        .unwrap()
}

pub fn applied(completion: &Completion) -> usize {
    match completion {
        Completion::Applied { commands } => *commands,
        other => panic!("expected applied commands, got {:?}", other),
    }
}
