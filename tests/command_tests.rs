use std::cell::RefCell;
use std::rc::Rc;

use backdrop_ajax::ajax::{Command, DomEvent};
use backdrop_ajax::Completion;
use serde_json::{Value, json};

use crate::common::utils::{
    applied, by_id, commands_page, fixture, fixture_settings, load_recorded_page, respond,
};

mod common;

fn ids(page: &backdrop_ajax::Page, selector: &str) -> Vec<String> {
    page.document
        .query(selector)
        .into_iter()
        .filter_map(|n| page.document.attr(n, "id").map(str::to_string))
        .collect()
}

// =========================================================================
// insert
// =========================================================================

#[test]
fn replace_with_detaches_old_and_attaches_new_content() {
    let (mut page, log) = load_recorded_page(
        &fixture("commands.html"),
        fixture_settings("commands_settings.json"),
    );
    let completion = respond(
        &mut page,
        "go",
        json!([{"command": "insert", "data": "<span id=\"fresh\">new</span>"}]),
    );
    assert_eq!(applied(&completion), 1);

    assert!(page.document.element_by_id("target").is_none(), "Wrapper replaced");
    let fresh = by_id(&page, "fresh");
    assert_eq!(page.document.parent(fresh), page.document.body());
    assert_eq!(
        log.borrow().as_slice(),
        ["attach:#document", "detach:unload:target", "attach:fresh"]
    );
}

#[test]
fn mixed_content_is_wrapped_in_a_div() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{"command": "insert", "method": "html", "data": "a<span>b</span>"}]),
    );
    assert_eq!(
        page.document.inner_html(by_id(&page, "target")),
        "<div>a<span>b</span></div>"
    );
}

#[test]
fn single_element_is_inserted_unwrapped() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{"command": "insert", "method": "html", "data": "  <p id=\"only\">x</p>\n"}]),
    );
    assert_eq!(
        page.document.inner_html(by_id(&page, "target")),
        r#"<p id="only">x</p>"#
    );
}

#[test]
fn placement_methods() {
    let mut page = commands_page();
    let completion = respond(
        &mut page,
        "go",
        json!([
            {"command": "insert", "selector": "#list", "method": "append", "data": "<li id=\"three\">3</li>"},
            {"command": "insert", "selector": "#list", "method": "prepend", "data": "<li id=\"zero\">0</li>"},
            {"command": "insert", "selector": "#two", "method": "before", "data": "<li id=\"between\">1.5</li>"},
            {"command": "insert", "selector": "#three", "method": "after", "data": "<li id=\"last\">4</li>"}
        ]),
    );
    assert_eq!(applied(&completion), 4);
    assert_eq!(
        ids(&page, "#list > li"),
        vec!["zero", "one", "between", "two", "three", "last"]
    );
}

#[test]
fn every_target_receives_content() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{"command": "insert", "selector": "#list li", "method": "append", "data": "<b>!</b>"}]),
    );
    for id in ["one", "two"] {
        assert_eq!(page.document.query(&format!("#{} > b", id)).len(), 1, "#{} got a copy", id);
    }
}

#[test]
fn unknown_insert_method_leaves_page_alone() {
    let mut page = commands_page();
    let before = page.document.to_html();
    respond(
        &mut page,
        "go",
        json!([{"command": "insert", "method": "sideways", "data": "<p>x</p>"}]),
    );
    assert_eq!(page.document.to_html(), before);
}

#[test]
fn effect_animates_new_content() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{"command": "insert", "method": "html", "effect": "fade", "speed": 300, "data": "<p id=\"faded\">x</p>"}]),
    );
    let faded = by_id(&page, "faded");
    assert!(page.document.is_visible(faded), "Animation completes");
    assert_eq!(page.window.animations.len(), 1);
    assert_eq!(page.window.animations[0].node, faded);
    assert_eq!(page.window.animations[0].effect, "fadeIn");
    assert_eq!(page.window.animations[0].speed, "300");
}

#[test]
fn highlighted_children_are_animated_alone() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{
            "command": "insert",
            "method": "html",
            "effect": "slide",
            "data": "<div id=\"box\"><p id=\"hot\" class=\"ajax-new-content\">new</p><p>old</p></div>"
        }]),
    );
    let animated: Vec<_> = page.window.animations.iter().map(|a| a.node).collect();
    assert_eq!(animated, vec![by_id(&page, "hot")]);
    assert_eq!(page.window.animations[0].effect, "slideToggle");
    assert!(page.document.is_visible(by_id(&page, "box")));
    assert!(page.document.is_visible(by_id(&page, "hot")));
}

#[test]
fn content_inside_the_form_is_attached_with_the_form() {
    let settings = json!({
        "ajax": {"edit-submit": {"event": "click", "url": "/system/ajax", "wrapper": "edit-title", "method": "after"}}
    });
    let (mut page, log) = load_recorded_page(&fixture("form.html"), settings);
    respond(
        &mut page,
        "edit-submit",
        json!([{"command": "insert", "data": "<input id=\"edit-subtitle\" name=\"subtitle\">"}]),
    );
    assert!(page.document.element_by_id("edit-subtitle").is_some());
    assert_eq!(
        log.borrow().as_slice(),
        ["attach:#document", "detach:serialize:edit-form", "attach:edit-form"],
        "New field not attached on its own"
    );
}

// =========================================================================
// Structural commands
// =========================================================================

#[test]
fn remove_detaches_behaviors_first() {
    let (mut page, log) = load_recorded_page(
        &fixture("commands.html"),
        fixture_settings("commands_settings.json"),
    );
    respond(&mut page, "go", json!([{"command": "remove", "selector": "#list li"}]));
    assert!(page.document.query("#list li").is_empty());
    assert_eq!(
        log.borrow().as_slice(),
        ["attach:#document", "detach:unload:one", "detach:unload:two"]
    );
}

#[test]
fn removing_a_bound_link_releases_its_descriptor() {
    let mut page = commands_page();
    let link = page.document.create_element("a");
    page.document.set_attr(link, "id", "extra");
    page.document.set_attr(link, "class", "use-ajax");
    page.document.set_attr(link, "href", "/extra/nojs");
    let body = page.document.body().unwrap();
    page.document.append_child(body, link);
    page.attach_behaviors(link, None);
    assert!(page.descriptor("extra").is_some());

    respond(&mut page, "go", json!([{"command": "remove", "selector": "#extra"}]));
    assert!(page.descriptor("extra").is_none());
    assert!(page.bindings().iter().all(|b| b.element != link));
    assert!(page.dispatch_event(link, &DomEvent::click()).unwrap().requests.is_empty());
}

#[test]
fn changed_marks_once() {
    let mut page = commands_page();
    let command = json!({"command": "changed", "selector": "#list", "asterisk": "#one"});
    respond(&mut page, "go", json!([command.clone()]));
    respond(&mut page, "go", json!([command]));

    assert!(page.document.has_class(by_id(&page, "list"), "ajax-changed"));
    assert_eq!(
        page.document.inner_html(by_id(&page, "one")),
        r#"One <abbr class="ajax-changed" title="Changed">*</abbr> "#
    );
}

#[test]
fn restripe_counts_visible_rows() {
    let mut page = commands_page();
    respond(&mut page, "go", json!([{"command": "restripe", "selector": "#rows"}]));

    let classes: Vec<Vec<String>> = page
        .document
        .query("#rows tr")
        .into_iter()
        .map(|row| page.document.classes(row))
        .collect();
    assert_eq!(
        classes,
        vec![vec!["odd"], vec!["even"], vec![], vec!["odd"]],
        "Hidden rows are skipped"
    );
}

#[test]
fn update_build_id_touches_only_matching_field() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{"command": "updateBuildId", "old": "form-old", "new": "form-new"}]),
    );
    let values: Vec<String> = page
        .document
        .query("#build input")
        .into_iter()
        .filter_map(|n| page.document.value(n))
        .collect();
    assert_eq!(values, vec!["form-new", "form-other"]);
}

// =========================================================================
// Window and style commands
// =========================================================================

#[test]
fn alert_and_redirect() {
    let mut page = commands_page();
    let completion = respond(
        &mut page,
        "go",
        json!([
            {"command": "alert", "text": "Saved", "title": "Status"},
            {"command": "redirect", "url": "/node/2"}
        ]),
    );
    assert_eq!(applied(&completion), 2);
    assert_eq!(page.window.alerts[0].text, "Saved");
    assert_eq!(page.window.alerts[0].title.as_deref(), Some("Status"));
    assert_eq!(page.window.location.as_deref(), Some("/node/2"));
}

#[test]
fn css_sets_inline_styles() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{"command": "css", "selector": "#old", "argument": {"backgroundColor": "red", "width": 10, "opacity": 0.5}}]),
    );
    let old = by_id(&page, "old");
    assert_eq!(page.document.style(old, "background-color").as_deref(), Some("red"));
    assert_eq!(page.document.style(old, "width").as_deref(), Some("10px"));
    assert_eq!(page.document.style(old, "opacity").as_deref(), Some("0.5"));
}

#[test]
fn add_css_prepends_to_head_and_registers_imports() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{"command": "addCss", "data": "<style>\n@import url(\"/a.css\");\n@import url(\"/b.css\");\n</style>"}]),
    );
    let head = page.document.head().unwrap();
    let first = page.document.element_children(head)[0];
    assert_eq!(page.document.tag(first), Some("style"));
    assert_eq!(page.window.stylesheet_imports, vec!["/a.css", "/b.css"]);
}

#[test]
fn data_is_stored_per_element() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([{"command": "data", "selector": "#list li", "name": "state", "value": {"open": true}}]),
    );
    for id in ["one", "two"] {
        assert_eq!(page.document.data(by_id(&page, id), "state"), Some(&json!({"open": true})));
    }
}

// =========================================================================
// invoke
// =========================================================================

#[test]
fn invoke_runs_builtin_methods() {
    let mut page = commands_page();
    respond(
        &mut page,
        "go",
        json!([
            {"command": "invoke", "selector": "#list li", "method": "addClass", "args": ["hot"]},
            {"command": "invoke", "selector": "#one", "method": "attr", "args": ["title", "First"]},
            {"command": "invoke", "selector": "#two", "method": "text", "args": ["<b>2</b>"]},
            {"command": "invoke", "selector": "#old", "method": "hide"}
        ]),
    );
    assert_eq!(ids(&page, ".hot"), vec!["one", "two"]);
    assert_eq!(page.document.attr(by_id(&page, "one"), "title"), Some("First"));
    assert_eq!(page.document.inner_html(by_id(&page, "two")), "&lt;b&gt;2&lt;/b&gt;");
    assert!(!page.document.is_visible(by_id(&page, "old")));
}

#[test]
fn invoke_prefers_registered_methods() {
    let mut page = commands_page();
    page.register_invoke_method("addClass", |doc, targets, _args| {
        for target in targets {
            doc.add_class(*target, "registered");
        }
    });
    page.register_invoke_method("count", |doc, targets, args| {
        for target in targets {
            doc.set_attr(*target, "data-count", &args.len().to_string());
        }
    });
    let completion = respond(
        &mut page,
        "go",
        json!([
            {"command": "invoke", "selector": "#one", "method": "addClass", "args": ["hot"]},
            {"command": "invoke", "selector": "#two", "method": "count", "args": [1, 2, 3]},
            {"command": "invoke", "selector": "#two", "method": "launchRockets"}
        ]),
    );
    assert_eq!(applied(&completion), 3);
    let one = by_id(&page, "one");
    assert!(page.document.has_class(one, "registered"));
    assert!(!page.document.has_class(one, "hot"));
    assert_eq!(page.document.attr(by_id(&page, "two"), "data-count"), Some("3"));
}

// =========================================================================
// settings
// =========================================================================

#[test]
fn settings_command_scopes_or_merges() {
    let mut page = commands_page();
    let seen: Rc<RefCell<Vec<Value>>> = Rc::new(RefCell::new(Vec::new()));
    let probe = seen.clone();
    page.register_command("probe", move |page, id, _raw, _status| {
        let descriptor = page.descriptor_by_id(id).unwrap();
        let marker = descriptor.effective_settings(&page.settings)["marker"].clone();
        probe.borrow_mut().push(marker);
    });

    respond(
        &mut page,
        "go",
        json!([
            {"command": "settings", "settings": {"marker": "scoped"}, "merge": false},
            {"command": "probe"}
        ]),
    );
    assert_eq!(seen.borrow().as_slice(), [json!("scoped")]);
    assert_eq!(page.settings.get("marker"), None, "Global settings untouched");
    assert!(page.descriptor("go").unwrap().response_settings.is_none(), "Scope ends with the response");

    respond(&mut page, "go", json!([{"command": "probe"}]));
    assert_eq!(seen.borrow()[1], Value::Null);

    respond(
        &mut page,
        "go",
        json!([
            {"command": "settings", "settings": {"marker": "global"}, "merge": true},
            {"command": "probe"}
        ]),
    );
    assert_eq!(seen.borrow()[2], json!("global"));
    assert_eq!(page.settings.get("marker"), Some(&json!("global")));
}

// =========================================================================
// Dispatch
// =========================================================================

#[test]
fn unknown_malformed_and_unnamed_commands_are_skipped() {
    let mut page = commands_page();
    let completion = respond(
        &mut page,
        "go",
        json!([
            {"command": "teleport"},
            {"command": "insert", "selector": 5, "data": "<p>x</p>"},
            {"text": "no name"},
            {"command": "alert", "text": "still runs"}
        ]),
    );
    assert_eq!(applied(&completion), 1);
    assert_eq!(page.window.alerts.len(), 1);
    assert!(page.document.element_by_id("old").is_some(), "Malformed insert did nothing");
}

#[test]
fn command_names_follow_the_wire_tag() {
    let parse = |raw: Value| serde_json::from_value::<Command>(raw).unwrap();
    assert_eq!(parse(json!({"command": "addCss", "data": ""})).name(), "addCss");
    assert_eq!(parse(json!({"command": "updateBuildId", "old": "a", "new": "b"})).name(), "updateBuildId");
    assert_eq!(parse(json!({"command": "teleport"})).name(), "unknown");
}

#[test]
fn custom_handlers_override_builtins() {
    let mut page = commands_page();
    let calls: Rc<RefCell<Vec<(String, u16)>>> = Rc::new(RefCell::new(Vec::new()));
    let record = calls.clone();
    page.register_command("alert", move |_page, _id, raw, status| {
        record
            .borrow_mut()
            .push((raw["text"].as_str().unwrap_or_default().to_string(), status));
    });

    let completion = respond(&mut page, "go", json!([{"command": "alert", "text": "hi"}]));
    assert!(matches!(completion, Completion::Applied { commands: 1 }));
    assert!(page.window.alerts.is_empty());
    assert_eq!(calls.borrow().as_slice(), [("hi".to_string(), 200)]);
}
