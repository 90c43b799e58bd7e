use serde_json::Value;

use crate::dom::{Document, NodeId};
use crate::settings::{PageState, value_to_string};
use crate::transport::wire::{FileField, SubmissionMode};

/// Successful controls of a form, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FileField>,
    pub mode: SubmissionMode,
}

/// Collect the values a browser would submit for `form`. Buttons only
/// contribute when they are the `clicked` control; a filled file input
/// switches the submission to multipart.
pub fn serialize_form(doc: &Document, form: NodeId, clicked: Option<NodeId>) -> FormSubmission {
    let mut submission = FormSubmission {
        fields: Vec::new(),
        files: Vec::new(),
        mode: SubmissionMode::UrlEncoded,
    };

    for control in doc.descendants(form) {
        let Some(tag) = doc.tag(control) else {
            continue;
        };
        if !matches!(tag, "input" | "select" | "textarea" | "button") {
            continue;
        }
        let Some(name) = doc.attr(control, "name").filter(|n| !n.is_empty()) else {
            continue;
        };
        if doc.is_disabled(control) {
            continue;
        }
        let kind = doc.control_type(control).unwrap_or_default();

        match kind.as_str() {
            "submit" | "image" | "button" => {
                if clicked == Some(control) {
                    submission
                        .fields
                        .push((name.to_string(), doc.value(control).unwrap_or_default()));
                }
            }
            "reset" => {}
            "checkbox" | "radio" => {
                if doc.has_attr(control, "checked") {
                    submission
                        .fields
                        .push((name.to_string(), doc.value(control).unwrap_or_default()));
                }
            }
            "file" => {
                let path = doc.attr(control, "value").unwrap_or_default();
                if !path.is_empty() {
                    submission.files.push(FileField {
                        name: name.to_string(),
                        path: path.to_string(),
                    });
                    submission.mode = SubmissionMode::Multipart;
                }
            }
            "select-one" | "select-multiple" => {
                for value in doc.selected_options(control) {
                    submission.fields.push((name.to_string(), value));
                }
            }
            _ => submission
                .fields
                .push((name.to_string(), doc.value(control).unwrap_or_default())),
        }
    }
    submission
}

/// Flatten a value into form fields with bracket notation, the way
/// `jQuery.param` does: objects become `prefix[key]`, scalar array entries
/// `prefix[]`, structured array entries `prefix[index]`.
pub fn param_pairs(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if prefix.ends_with("[]") {
                    out.push((prefix.to_string(), value_to_string(item)));
                } else if item.is_object() || item.is_array() {
                    param_pairs(&format!("{}[{}]", prefix, i), item, out);
                } else {
                    param_pairs(&format!("{}[]", prefix), item, out);
                }
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                param_pairs(&format!("{}[{}]", prefix, key), item, out);
            }
        }
        scalar => out.push((prefix.to_string(), value_to_string(scalar))),
    }
}

/// `ajax_html_ids[]` entries: every id on the page, so the server can keep
/// newly generated ids unique.
pub fn html_id_fields(doc: &Document) -> Vec<(String, String)> {
    doc.all_ids()
        .into_iter()
        .map(|id| ("ajax_html_ids[]".to_string(), id))
        .collect()
}

/// `ajax_page_state[...]` entries describing assets already loaded.
pub fn page_state_fields(state: &PageState) -> Vec<(String, String)> {
    let mut fields = vec![
        (
            "ajax_page_state[theme]".to_string(),
            state.theme.clone().unwrap_or_default(),
        ),
        (
            "ajax_page_state[theme_token]".to_string(),
            state.theme_token.clone().unwrap_or_default(),
        ),
    ];
    for key in state.css.keys() {
        fields.push((format!("ajax_page_state[css][{}]", key), "1".to_string()));
    }
    for key in state.js.keys() {
        fields.push((format!("ajax_page_state[js][{}]", key), "1".to_string()));
    }
    fields
}
