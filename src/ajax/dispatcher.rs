use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::ajax::commands::{
    AddCss, Changed, Command, Css, Data, Insert, Invoke, Remove, Restripe, SettingsCommand, UpdateBuildId,
    command_name,
};
use crate::ajax::descriptor::DescriptorId;
use crate::ajax::effects::get_effect;
use crate::ajax::invoke::apply_builtin;
use crate::behaviors::DetachTrigger;
use crate::dom::parser::parse_fragment;
use crate::dom::{Document, NodeId};
use crate::page::Page;
use crate::page::locale::check_plain;
use crate::settings::value_to_string;
use crate::trace::trace::TraceEvent;

/// Children carrying this class are the ones animated after an insert.
pub const NEW_CONTENT_SELECTOR: &str = ".ajax-new-content, .new-content-highlight";

const CHANGED_CLASS: &str = "ajax-changed";

/// Methods that take content out of the target; behaviours are detached
/// from it first.
const DESTRUCTIVE_METHODS: &[&str] = &["html", "replaceWith", "replaceAll", "empty", "remove"];

/// CSS properties that take bare numbers.
const UNITLESS: &[&str] = &[
    "column-count",
    "fill-opacity",
    "flex-grow",
    "flex-shrink",
    "font-weight",
    "line-height",
    "opacity",
    "order",
    "orphans",
    "widows",
    "z-index",
    "zoom",
];

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)^@import url\("(.*)"\);$"#).expect("import pattern is valid")
});

/// Apply the commands of one response in order. Returns how many were
/// applied; unknown and malformed commands are skipped.
pub fn run(page: &mut Page, id: DescriptorId, commands: &[Value], status: u16) -> usize {
    let mut applied = Vec::new();

    for raw in commands {
        let Some(name) = command_name(raw) else {
            debug!("skipping command object without a name");
            continue;
        };

        if let Some(handler) = page.custom_commands.get(name).cloned() {
            handler(page, id, raw, status);
            applied.push(name.to_string());
            continue;
        }

        let command = match serde_json::from_value::<Command>(raw.clone()) {
            Ok(command) => command,
            Err(e) => {
                warn!(command = name, error = %e, "skipping malformed command");
                continue;
            }
        };
        if apply(page, id, command) {
            applied.push(name.to_string());
        } else {
            debug!(command = name, "no handler for command");
        }
    }

    if let Some(descriptor) = page.descriptor_by_id(id) {
        let names: Vec<&str> = applied.iter().map(String::as_str).collect();
        page.trace(TraceEvent::now(&descriptor.id, descriptor.state).with_commands(&names));
    }
    applied.len()
}

/// Returns `false` for commands nothing handles.
fn apply(page: &mut Page, id: DescriptorId, command: Command) -> bool {
    debug!(command = command.name(), "applying command");
    match command {
        Command::Insert(c) => insert(page, id, c),
        Command::Remove(c) => remove(page, id, c),
        Command::Changed(c) => changed(page, c),
        Command::Alert(c) => page.window.alert(&c.text, c.title.as_deref()),
        Command::Redirect(c) => page.window.navigate(&c.url),
        Command::Css(c) => css(page, c),
        Command::Settings(c) => settings(page, id, c),
        Command::Data(c) => data(page, c),
        Command::Invoke(c) => invoke(page, c),
        Command::Restripe(c) => restripe(page, c),
        Command::AddCss(c) => add_css(page, c),
        Command::UpdateBuildId(c) => update_build_id(page, c),
        Command::Unknown => return false,
    }
    true
}

/// Settings for attach/detach calls made while handling a command: the
/// command's own, else the response-scoped ones, else the global ones.
fn command_settings(page: &Page, id: DescriptorId, own: Option<&Value>) -> Value {
    if let Some(own) = own.filter(|v| !v.is_null()) {
        return own.clone();
    }
    match page.descriptor_by_id(id) {
        Some(descriptor) => descriptor.effective_settings(&page.settings).clone(),
        None => page.settings.value().clone(),
    }
}

fn insert(page: &mut Page, id: DescriptorId, command: Insert) {
    let Some(descriptor) = page.descriptor_by_id(id) else {
        return;
    };
    let selector = command
        .selector
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| descriptor.wrapper.clone());
    let method = command
        .method
        .clone()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| descriptor.method.clone());
    let effect = get_effect(
        command.effect.as_deref(),
        command.speed.as_ref(),
        &descriptor.effect,
        &descriptor.speed,
    );
    let form = descriptor.form;

    let targets = selector
        .as_deref()
        .map(|s| page.document.query(s))
        .unwrap_or_default();

    let markup = match &command.data {
        Value::Null => String::new(),
        other => value_to_string(other),
    };
    let new_content = wrap_content(&mut page.document, markup.trim());

    if DESTRUCTIVE_METHODS.contains(&method.as_str()) {
        let settings = command_settings(page, id, command.settings.as_ref());
        for target in &targets {
            page.detach_behaviors(*target, Some(&settings), DetachTrigger::Unload);
        }
    }

    if !insert_content(&mut page.document, &targets, &method, new_content) {
        warn!(method, "unknown insert method");
        return;
    }
    if DESTRUCTIVE_METHODS.contains(&method.as_str()) {
        page.release_detached();
    }

    if !effect.is_plain() {
        page.document.hide(new_content);
    }
    let highlighted = page.document.query_in(new_content, NEW_CONTENT_SELECTOR);
    if !highlighted.is_empty() {
        for node in &highlighted {
            page.document.hide(*node);
        }
        page.document.show(new_content);
        for node in highlighted {
            animate(page, node, &effect.show, &effect.show_speed);
        }
    } else if !effect.is_plain() {
        animate(page, new_content, &effect.show, &effect.show_speed);
    }

    // Content inside the submitting form is attached with the form.
    let in_form = form.is_some_and(|f| page.document.contains(f, new_content));
    let in_body = page
        .document
        .body()
        .is_some_and(|b| page.document.contains(b, new_content));
    if !in_form && in_body {
        let settings = command_settings(page, id, command.settings.as_ref());
        page.attach_behaviors(new_content, Some(&settings));
    }
}

/// Parse markup into a single node: one top-level element is used as is,
/// anything else is wrapped in a `<div>`.
fn wrap_content(doc: &mut Document, markup: &str) -> NodeId {
    let nodes = parse_fragment(doc, markup);
    if let [single] = nodes.as_slice() {
        if doc.is_element(*single) {
            return *single;
        }
    }
    let wrapper = doc.create_element("div");
    for node in nodes {
        doc.append_child(wrapper, node);
    }
    wrapper
}

/// jQuery-style manipulation: with several targets, every target but the
/// last gets a copy of the content.
fn insert_content(doc: &mut Document, targets: &[NodeId], method: &str, content: NodeId) -> bool {
    let place = |doc: &mut Document, target: NodeId, node: NodeId| match method {
        "replaceWith" => doc.replace_with(target, &[node]),
        "html" => {
            doc.remove_children(target);
            doc.append_child(target, node);
        }
        "append" => doc.append_child(target, node),
        "prepend" => doc.prepend_child(target, node),
        "before" => doc.insert_before(target, node),
        "after" => doc.insert_after(target, node),
        _ => {}
    };

    match method {
        "replaceWith" | "html" | "append" | "prepend" | "before" | "after" => {
            let count = targets.len();
            for (i, target) in targets.iter().enumerate() {
                let node = if i + 1 == count { content } else { doc.deep_clone(content) };
                place(doc, *target, node);
            }
            true
        }
        // The freshly parsed content is never in the document, so there is
        // nothing for the targets to replace.
        "replaceAll" => true,
        "empty" => {
            targets.iter().for_each(|t| doc.remove_children(*t));
            true
        }
        "remove" => {
            targets.iter().for_each(|t| doc.detach(*t));
            true
        }
        _ => false,
    }
}

/// Headless animations finish at once: the node ends up shown.
fn animate(page: &mut Page, node: NodeId, effect: &str, speed: &str) {
    page.document.show(node);
    page.window.animate(node, effect, speed);
}

fn remove(page: &mut Page, id: DescriptorId, command: Remove) {
    let settings = command_settings(page, id, command.settings.as_ref());
    let targets = page.document.query(&command.selector);
    for target in &targets {
        page.detach_behaviors(*target, Some(&settings), DetachTrigger::Unload);
    }
    for target in targets {
        page.document.detach(target);
    }
    page.release_detached();
}

fn changed(page: &mut Page, command: Changed) {
    let targets = page.document.query(&command.selector);
    if targets.iter().any(|t| page.document.has_class(*t, CHANGED_CLASS)) {
        return;
    }
    for target in &targets {
        page.document.add_class(*target, CHANGED_CLASS);
    }

    let Some(asterisk) = command.asterisk.filter(|a| !a.is_empty()) else {
        return;
    };
    let title = check_plain(&page.t("Changed", &[]));
    let marker = format!(r#" <abbr class="{}" title="{}">*</abbr> "#, CHANGED_CLASS, title);
    for holder in page.document.query_within(&targets, &asterisk) {
        for node in parse_fragment(&mut page.document, &marker) {
            page.document.append_child(holder, node);
        }
    }
}

fn css(page: &mut Page, command: Css) {
    let targets = page.document.query(&command.selector);
    apply_css(&mut page.document, &targets, &command.argument);
}

/// Set inline style properties. Property names may be camelCase; numbers
/// get `px` unless the property is unitless; `null` or `""` removes.
pub fn apply_css(doc: &mut Document, targets: &[NodeId], properties: &Map<String, Value>) {
    for (name, value) in properties {
        let property = kebab_case(name);
        let value = match value {
            Value::Null => String::new(),
            Value::Number(n) if !UNITLESS.contains(&property.as_str()) => format!("{}px", n),
            other => value_to_string(other),
        };
        for target in targets {
            doc.set_style(*target, &property, &value);
        }
    }
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn settings(page: &mut Page, id: DescriptorId, command: SettingsCommand) {
    if command.merge {
        page.settings.merge(&command.settings);
    } else if let Some(descriptor) = page.descriptor_mut(id) {
        descriptor.response_settings = Some(command.settings);
    }
}

fn data(page: &mut Page, command: Data) {
    for target in page.document.query(&command.selector) {
        page.document.set_data(target, &command.name, command.value.clone());
    }
}

fn invoke(page: &mut Page, command: Invoke) {
    let targets = page.document.query(&command.selector);
    if let Some(method) = page.invoke_methods.get(&command.method) {
        method(&mut page.document, &targets, &command.args);
        return;
    }
    if !apply_builtin(&mut page.document, &command.method, &targets, &command.args) {
        warn!(method = %command.method, "invoke: unknown method");
    }
}

/// Rows count from 1, so the first visible row is "odd".
fn restripe(page: &mut Page, command: Restripe) {
    let tables = page.document.query(&command.selector);
    let rows = page
        .document
        .query_within(&tables, "> tbody > tr:visible, > tr:visible");
    for (i, row) in rows.into_iter().enumerate() {
        page.document.remove_class(row, "odd even");
        page.document
            .add_class(row, if i % 2 == 0 { "odd" } else { "even" });
    }
}

fn add_css(page: &mut Page, command: AddCss) {
    if let Some(head) = page.document.head() {
        let nodes = parse_fragment(&mut page.document, &command.data);
        for node in nodes.into_iter().rev() {
            page.document.prepend_child(head, node);
        }
    }
    for import in CSS_IMPORT.captures_iter(&command.data) {
        if let Some(url) = import.get(1) {
            page.window.add_import(url.as_str());
        }
    }
}

/// Only a build id field still holding `old` is touched.
fn update_build_id(page: &mut Page, command: UpdateBuildId) {
    let fields = page.document.query("input[name=\"form_build_id\"]");
    for field in fields {
        if page.document.attr(field, "value") == Some(command.old.as_str()) {
            page.document.set_value(field, &command.new);
        }
    }
}
