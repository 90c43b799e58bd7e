use backdrop_ajax::ajax::effects::get_effect;
use backdrop_ajax::ajax::request::{page_state_fields, param_pairs, serialize_form};
use backdrop_ajax::ajax::url::{rewrite_nojs, url_is_local};
use backdrop_ajax::dom::parser::parse_document;
use backdrop_ajax::page::locale::{check_plain, format_size, t};
use backdrop_ajax::settings::merge::deep_merge;
use backdrop_ajax::settings::{Settings, is_truthy, value_to_string};
use backdrop_ajax::transport::SubmissionMode;
use serde_json::{Value, json};

// =========================================================================
// Global settings
// =========================================================================

#[test]
fn deep_merge_objects_and_arrays() {
    let mut target = json!({
        "a": {"x": 1, "y": {"z": 2}},
        "list": [1, 2, 3],
        "keep": true
    });
    deep_merge(
        &mut target,
        &json!({
            "a": {"y": {"w": 3}, "n": null},
            "list": [9],
            "new": "v"
        }),
    );
    assert_eq!(
        target,
        json!({
            "a": {"x": 1, "y": {"z": 2, "w": 3}, "n": null},
            "list": [9, 2, 3],
            "keep": true,
            "new": "v"
        }),
        "Objects merge by key, arrays by index, scalars replace"
    );
}

#[test]
fn settings_merge_is_the_only_writer() {
    let mut settings = Settings::from_value(json!({"ajax": {"a": {"url": "/x"}}}));
    settings.merge(&json!("not an object"));
    assert_eq!(settings.value(), &json!({"ajax": {"a": {"url": "/x"}}}), "Non-objects ignored");

    settings.merge(&json!({"ajax": {"b": {"url": "/y"}}}));
    let keys: Vec<&String> = settings.get("ajax").and_then(Value::as_object).unwrap().keys().collect();
    assert_eq!(keys, ["a", "b"]);

    assert!(!settings.url_is_ajax_trusted("/y"));
    settings.trust_url("/y");
    assert!(settings.url_is_ajax_trusted("/y"));
    assert!(!settings.url_is_ajax_trusted("/x"));
}

#[test]
fn non_object_settings_are_empty() {
    assert_eq!(Settings::from_value(json!([1, 2])).value(), &json!({}));
    assert!(Settings::from_json_str("{").is_err());
}

#[test]
fn base_path_always_ends_with_slash() {
    assert_eq!(Settings::new().base_path(), "/");
    assert_eq!(Settings::from_value(json!({"basePath": "/sub"})).base_path(), "/sub/");
    assert_eq!(Settings::from_value(json!({"basePath": "/sub/"})).base_path(), "/sub/");
}

#[test]
fn page_state_fields_describe_loaded_assets() {
    let settings = Settings::from_value(json!({
        "ajaxPageState": {
            "theme": "basis",
            "theme_token": "tok",
            "css": {"a.css": 1},
            "js": {"b.js": 1, "c.js": 1}
        }
    }));
    let fields = page_state_fields(&settings.page_state());
    let expected: Vec<(String, String)> = [
        ("ajax_page_state[theme]", "basis"),
        ("ajax_page_state[theme_token]", "tok"),
        ("ajax_page_state[css][a.css]", "1"),
        ("ajax_page_state[js][b.js]", "1"),
        ("ajax_page_state[js][c.js]", "1"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    assert_eq!(fields, expected);
}

#[test]
fn javascript_truthiness() {
    assert!(!is_truthy(&json!(null)));
    assert!(!is_truthy(&json!(false)));
    assert!(!is_truthy(&json!(0)));
    assert!(!is_truthy(&json!("")));
    assert!(is_truthy(&json!("0")));
    assert!(is_truthy(&json!([])));
    assert!(is_truthy(&json!({})));
    assert_eq!(value_to_string(&json!("s")), "s");
    assert_eq!(value_to_string(&json!(1.5)), "1.5");
    assert_eq!(value_to_string(&json!(null)), "");
}

// =========================================================================
// Translation helpers
// =========================================================================

#[test]
fn translate_with_placeholders() {
    let settings = Settings::new();
    assert_eq!(
        t(&settings, "Hello @name, %what !raw", &[("@name", "<b>"), ("%what", "x"), ("!raw", "<i>")]),
        r#"Hello &lt;b&gt;, <em class="placeholder">x</em> <i>"#
    );
}

#[test]
fn translate_uses_locale_overrides() {
    let settings = Settings::from_value(json!({
        "locale": {"strings": {"": {"Please wait...": "Bitte warten..."}}}
    }));
    assert_eq!(t(&settings, "Please wait...", &[]), "Bitte warten...");
    assert_eq!(t(&settings, "Changed", &[]), "Changed", "Untranslated strings pass through");
}

#[test]
fn check_plain_escapes_markup() {
    assert_eq!(check_plain(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
}

#[test]
fn format_size_units() {
    let settings = Settings::new();
    assert_eq!(format_size(&settings, 1), "1 byte");
    assert_eq!(format_size(&settings, 512), "512 bytes");
    assert_eq!(format_size(&settings, 2048), "2 KB");
    assert_eq!(format_size(&settings, 1536), "1.5 KB");
    assert_eq!(format_size(&settings, 3 * 1024 * 1024), "3 MB");
}

// =========================================================================
// URLs
// =========================================================================

#[test]
fn nojs_segments_become_ajax() {
    assert_eq!(rewrite_nojs("/comments/nojs/more"), "/comments/ajax/more");
    assert_eq!(rewrite_nojs("/node/2/nojs"), "/node/2/ajax");
    assert_eq!(rewrite_nojs("/x/nojs?y=1"), "/x/ajax?y=1");
    assert_eq!(rewrite_nojs("/x/nojs#top"), "/x/ajax#top");
    assert_eq!(rewrite_nojs("/nojsfoo/bar"), "/nojsfoo/bar", "Only whole segments");
}

#[test]
fn local_urls() {
    let page = "http://example.com/node/1";
    assert!(url_is_local("/system/ajax", page, "/"));
    assert!(url_is_local("http://example.com/x", page, "/"));
    assert!(url_is_local("https://example.com/x", page, "/"), "http page may target https");
    assert!(!url_is_local("http://other.example.org/x", page, "/"));
    assert!(!url_is_local("http://example.com:8080/x", page, "/"), "Port matters");
    assert!(url_is_local("/sub/x", page, "/sub/"));
    assert!(!url_is_local("/other/x", page, "/sub/"), "Outside the base path");
    assert!(!url_is_local("/x", "not a url", "/"));
}

// =========================================================================
// Request encoding
// =========================================================================

#[test]
fn param_pairs_uses_bracket_notation() {
    let mut out = Vec::new();
    param_pairs(
        "dialogOptions",
        &json!({"width": 500, "buttons": ["ok", "cancel"], "pos": [{"x": 1}], "modal": true}),
        &mut out,
    );
    let rendered: Vec<String> = out.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    assert_eq!(
        rendered,
        vec![
            "dialogOptions[buttons][]=ok",
            "dialogOptions[buttons][]=cancel",
            "dialogOptions[modal]=true",
            "dialogOptions[pos][0][x]=1",
            "dialogOptions[width]=500",
        ]
    );
}

#[test]
fn serialize_form_collects_successful_controls() {
    let doc = parse_document(
        r#"<form id="f">
        <input name="a" value="1">
        <input name="" value="unnamed">
        <input name="d" value="x" disabled>
        <input type="checkbox" name="c1" value="on1" checked>
        <input type="checkbox" name="c2" value="on2">
        <input type="radio" name="r" value="r1">
        <input type="radio" name="r" value="r2" checked>
        <select name="m" multiple><option value="x" selected>X</option><option value="y" selected>Y</option><option value="z">Z</option></select>
        <textarea name="t">text</textarea>
        <input type="reset" name="reset" value="Reset">
        <input type="submit" id="s1" name="op" value="Save">
        <button id="s2" name="op" value="Delete">Delete</button>
        </form>"#,
    );
    let form = doc.element_by_id("f").unwrap();
    let clicked = doc.element_by_id("s2");
    let submission = serialize_form(&doc, form, clicked);

    let rendered: Vec<String> = submission
        .fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    assert_eq!(
        rendered,
        vec!["a=1", "c1=on1", "r=r2", "m=x", "m=y", "t=text", "op=Delete"],
        "Only successful controls, clicked button only"
    );
    assert_eq!(submission.mode, SubmissionMode::UrlEncoded);
    assert!(submission.files.is_empty());
}

#[test]
fn filled_file_input_switches_to_multipart() {
    let doc = parse_document(
        r#"<form id="f"><input type="file" name="files[upload]" value="/tmp/a.txt"><input type="file" name="empty"></form>"#,
    );
    let form = doc.element_by_id("f").unwrap();
    let submission = serialize_form(&doc, form, None);
    assert_eq!(submission.mode, SubmissionMode::Multipart);
    assert_eq!(submission.files.len(), 1);
    assert_eq!(submission.files[0].name, "files[upload]");
    assert_eq!(submission.files[0].path, "/tmp/a.txt");
}

// =========================================================================
// Effects
// =========================================================================

#[test]
fn response_effect_overrides_descriptor() {
    let effect = get_effect(Some("fade"), Some(&json!(200)), "none", "none");
    assert_eq!(effect.show, "fadeIn");
    assert_eq!(effect.hide, "fadeOut");
    assert_eq!(effect.show_speed, "200");
}

#[test]
fn other_effects_toggle() {
    let effect = get_effect(None, None, "slide", "slow");
    assert_eq!(effect.show, "slideToggle");
    assert_eq!(effect.hide, "slideToggle");
    assert_eq!(effect.show_speed, "slow");
    assert!(get_effect(None, None, "none", "slow").is_plain());
    assert_eq!(get_effect(None, None, "none", "slow").show_speed, "");
}
