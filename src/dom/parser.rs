use std::collections::HashMap;

use scraper::{Html, Node};

use crate::dom::document::{Document, NodeId};

/// Parse a full HTML page into a fresh [`Document`].
pub fn parse_document(html: &str) -> Document {
    let parsed = Html::parse_document(html);
    let mut doc = Document::new();
    let root = parsed.tree.root();
    let mut ids = HashMap::new();
    ids.insert(root.id(), doc.root());

    for node in root.descendants() {
        let Some(parent) = node.parent() else {
            continue;
        };
        let Some(target) = ids.get(&parent.id()).copied() else {
            continue;
        };
        if let Some(created) = import_node(&mut doc, node.value()) {
            doc.append_child(target, created);
            ids.insert(node.id(), created);
        }
    }
    doc
}

/// Parse a markup fragment (in `<body>` context) into detached nodes owned
/// by `doc`. Returns the top-level nodes in source order.
pub fn parse_fragment(doc: &mut Document, markup: &str) -> Vec<NodeId> {
    let parsed = Html::parse_fragment(markup);
    let root = parsed.tree.root();
    // html5ever wraps fragment content in a synthetic <html> element; its
    // children become the fragment's top-level nodes.
    let holder = doc.create_element("template");
    let mut ids = HashMap::new();

    for node in root.descendants() {
        let Some(parent) = node.parent() else {
            continue;
        };
        if parent.id() == root.id() {
            ids.insert(node.id(), holder);
            continue;
        }
        let Some(target) = ids.get(&parent.id()).copied() else {
            continue;
        };
        if let Some(created) = import_node(doc, node.value()) {
            doc.append_child(target, created);
            ids.insert(node.id(), created);
        }
    }

    let top: Vec<NodeId> = doc.children(holder).to_vec();
    doc.remove_children(holder);
    top
}

fn import_node(doc: &mut Document, node: &Node) -> Option<NodeId> {
    match node {
        Node::Element(el) => {
            let id = doc.create_element(el.name());
            for (name, value) in el.attrs() {
                doc.set_attr(id, name, value);
            }
            Some(id)
        }
        Node::Text(text) => Some(doc.create_text(&**text)),
        Node::Comment(comment) => Some(doc.create_comment(&**comment)),
        Node::Doctype(doctype) => Some(doc.create_doctype(doctype.name())),
        _ => None,
    }
}
