//! Method table behind the `invoke` command.
//!
//! `invoke` lets the server call any named method on the selected elements
//! with arbitrary arguments. It is deliberately confined to this table: the
//! built-in methods below plus whatever the embedding application registers
//! with [`crate::page::Page::register_invoke_method`]. Nothing here checks
//! argument shapes beyond what each method needs, so a registered method
//! must treat its arguments as untrusted input.

use serde_json::{Map, Value};
use tracing::warn;

use crate::ajax::dispatcher::apply_css;
use crate::dom::parser::parse_fragment;
use crate::dom::{Document, NodeId};
use crate::settings::value_to_string;

/// A caller-registered `invoke` method.
pub type InvokeFn = Box<dyn Fn(&mut Document, &[NodeId], &[Value])>;

const BOOLEAN_PROPS: &[&str] = &["checked", "disabled", "selected", "readonly", "required", "hidden"];

pub const BUILTIN_METHODS: &[&str] = &[
    "addClass",
    "removeClass",
    "toggleClass",
    "attr",
    "removeAttr",
    "prop",
    "val",
    "text",
    "html",
    "show",
    "hide",
    "css",
    "data",
    "remove",
    "empty",
    "append",
    "prepend",
];

/// Run a built-in method. Returns `false` when `method` is not one.
pub fn apply_builtin(doc: &mut Document, method: &str, targets: &[NodeId], args: &[Value]) -> bool {
    let arg = |i: usize| args.get(i).map(value_to_string).unwrap_or_default();

    match method {
        "addClass" => targets.iter().for_each(|t| doc.add_class(*t, &arg(0))),
        "removeClass" => {
            for target in targets {
                if args.is_empty() {
                    doc.remove_attr(*target, "class");
                } else {
                    doc.remove_class(*target, &arg(0));
                }
            }
        }
        "toggleClass" => targets.iter().for_each(|t| doc.toggle_class(*t, &arg(0))),
        "attr" => match args.first() {
            Some(Value::Object(map)) => {
                for target in targets {
                    for (name, value) in map {
                        doc.set_attr(*target, name, &value_to_string(value));
                    }
                }
            }
            Some(_) if args.len() > 1 => {
                for target in targets {
                    if args[1].is_null() {
                        doc.remove_attr(*target, &arg(0));
                    } else {
                        doc.set_attr(*target, &arg(0), &arg(1));
                    }
                }
            }
            _ => warn!(method, "attr needs a name and a value"),
        },
        "removeAttr" => {
            let name = arg(0);
            for part in name.split_whitespace() {
                targets.iter().for_each(|t| doc.remove_attr(*t, part));
            }
        }
        "prop" => {
            let name = arg(0);
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            for target in targets {
                if BOOLEAN_PROPS.contains(&name.as_str()) {
                    if crate::settings::is_truthy(&value) {
                        doc.set_attr(*target, &name, "");
                    } else {
                        doc.remove_attr(*target, &name);
                    }
                } else {
                    doc.set_attr(*target, &name, &value_to_string(&value));
                }
            }
        }
        "val" => targets.iter().for_each(|t| doc.set_value(*t, &arg(0))),
        "text" => targets.iter().for_each(|t| doc.set_text(*t, &arg(0))),
        "html" => {
            let markup = arg(0);
            for target in targets {
                doc.remove_children(*target);
                for node in parse_fragment(doc, &markup) {
                    doc.append_child(*target, node);
                }
            }
        }
        "show" => targets.iter().for_each(|t| doc.show(*t)),
        "hide" => targets.iter().for_each(|t| doc.hide(*t)),
        "css" => match args.first() {
            Some(Value::Object(map)) => apply_css(doc, targets, map),
            Some(name) => {
                let mut map = Map::new();
                map.insert(value_to_string(name), args.get(1).cloned().unwrap_or(Value::Null));
                apply_css(doc, targets, &map);
            }
            None => {}
        },
        "data" => {
            let key = arg(0);
            let value = args.get(1).cloned().unwrap_or(Value::Null);
            targets.iter().for_each(|t| doc.set_data(*t, &key, value.clone()));
        }
        "remove" => targets.iter().for_each(|t| doc.detach(*t)),
        "empty" => targets.iter().for_each(|t| doc.remove_children(*t)),
        "append" | "prepend" => {
            let markup = arg(0);
            for target in targets {
                let nodes = parse_fragment(doc, &markup);
                if method == "append" {
                    nodes.into_iter().for_each(|n| doc.append_child(*target, n));
                } else {
                    nodes.into_iter().rev().for_each(|n| doc.prepend_child(*target, n));
                }
            }
        }
        _ => return false,
    }
    true
}
