use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

/// Index of a node inside a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub data: NodeData,
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    /// Arbitrary values attached by the `data` command (never serialized).
    pub data: BTreeMap<String, Value>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            data: BTreeMap::new(),
        }
    }
}

/// Mutable arena DOM.
///
/// Nodes are never freed: removing a node only detaches it from its parent,
/// so ids held elsewhere (descriptors, progress elements) stay valid and
/// simply stop being connected to the document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    // ========================================================================
    // Node creation
    // ========================================================================

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_element_with(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attr(id, name, value);
        }
        id
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Doctype(name.to_string()))
    }

    /// Copy a subtree. The copy is detached and carries the data store too.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.nodes[id.0].data.clone();
        let copy = self.push(data);
        let children = self.nodes[id.0].children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    // ========================================================================
    // Tree mutation
    // ========================================================================

    /// Unlink a node from its parent. No-op for detached nodes.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Insert `new` right before `reference`. Does nothing when `reference`
    /// has no parent.
    pub fn insert_before(&mut self, reference: NodeId, new: NodeId) {
        if reference == new {
            return;
        }
        self.detach(new);
        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        let pos = self.position_in_parent(parent, reference);
        self.nodes[new.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, new);
    }

    pub fn insert_after(&mut self, reference: NodeId, new: NodeId) {
        if reference == new {
            return;
        }
        self.detach(new);
        let Some(parent) = self.nodes[reference.0].parent else {
            return;
        };
        let pos = self.position_in_parent(parent, reference) + 1;
        self.nodes[new.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, new);
    }

    fn position_in_parent(&self, parent: NodeId, child: NodeId) -> usize {
        self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == child)
            .unwrap_or(self.nodes[parent.0].children.len())
    }

    /// Put `replacements` where `target` was, then detach `target`.
    pub fn replace_with(&mut self, target: NodeId, replacements: &[NodeId]) {
        if self.nodes[target.0].parent.is_none() {
            return;
        }
        for new in replacements {
            self.insert_before(target, *new);
        }
        self.detach(target);
    }

    pub fn remove_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Pre-order descendants, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(p) = current {
            out.push(p);
            current = self.parent(p);
        }
        out
    }

    /// True when `node` is a strict descendant of `ancestor`.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).contains(&ancestor)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        id == self.root || self.contains(self.root, id)
    }

    pub fn first_element_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.tag(*n) == Some(tag))
    }

    pub fn head(&self) -> Option<NodeId> {
        self.first_element_by_tag("head")
    }

    pub fn body(&self) -> Option<NodeId> {
        self.first_element_by_tag("body")
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    /// All `id` attributes currently in the document, document order, no
    /// duplicates.
    pub fn all_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for node in self.descendants(self.root) {
            if let Some(id) = self.attr(node, "id") {
                if !id.is_empty() && seen.insert(id.to_string()) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }

    /// Nearest enclosing `<form>`, honouring an explicit `form="id"` owner.
    pub fn form_of(&self, id: NodeId) -> Option<NodeId> {
        if let Some(owner) = self.attr(id, "form") {
            if let Some(form) = self.element_by_id(owner) {
                if self.tag(form) == Some("form") {
                    return Some(form);
                }
            }
        }
        self.ancestors(id)
            .into_iter()
            .find(|a| self.tag(*a) == Some("form"))
    }

    // ========================================================================
    // Element accessors
    // ========================================================================

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            match el.attrs.iter_mut().find(|(k, _)| k == name) {
                Some(slot) => slot.1 = value.to_string(),
                None => el.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attrs.retain(|(k, _)| k != name);
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|c| c.split_whitespace().any(|x| x == class))
    }

    /// Add one or more space-separated classes.
    pub fn add_class(&mut self, id: NodeId, classes: &str) {
        if !self.is_element(id) {
            return;
        }
        let mut current = self.classes(id);
        for class in classes.split_whitespace() {
            if !current.iter().any(|c| c == class) {
                current.push(class.to_string());
            }
        }
        self.set_attr(id, "class", &current.join(" "));
    }

    pub fn remove_class(&mut self, id: NodeId, classes: &str) {
        if !self.has_attr(id, "class") {
            return;
        }
        let remove: Vec<&str> = classes.split_whitespace().collect();
        let kept: Vec<String> = self
            .classes(id)
            .into_iter()
            .filter(|c| !remove.contains(&c.as_str()))
            .collect();
        self.set_attr(id, "class", &kept.join(" "));
    }

    pub fn toggle_class(&mut self, id: NodeId, classes: &str) {
        for class in classes.split_whitespace() {
            if self.has_class(id, class) {
                self.remove_class(id, class);
            } else {
                self.add_class(id, class);
            }
        }
    }

    // ========================================================================
    // Inline style
    // ========================================================================

    pub fn styles(&self, id: NodeId) -> Vec<(String, String)> {
        self.attr(id, "style")
            .map(parse_style)
            .unwrap_or_default()
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<String> {
        self.styles(id)
            .into_iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v)
    }

    /// Set an inline style property; an empty value removes it.
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if !self.is_element(id) {
            return;
        }
        let mut styles = self.styles(id);
        let property = property.trim().to_ascii_lowercase();
        styles.retain(|(k, _)| *k != property);
        if !value.is_empty() {
            styles.push((property, value.to_string()));
        }
        if styles.is_empty() {
            self.remove_attr(id, "style");
        } else {
            let text = styles
                .iter()
                .map(|(k, v)| format!("{}: {};", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            self.set_attr(id, "style", &text);
        }
    }

    pub fn hide(&mut self, id: NodeId) {
        self.set_style(id, "display", "none");
    }

    pub fn show(&mut self, id: NodeId) {
        if self.style(id, "display").as_deref() == Some("none") {
            self.set_style(id, "display", "");
        }
    }

    /// Headless approximation of jQuery's `:visible`: the node and all of its
    /// ancestors are rendered, and it is not a hidden input.
    pub fn is_visible(&self, id: NodeId) -> bool {
        if !self.is_element(id) || !self.is_connected(id) {
            return false;
        }
        if self.tag(id) == Some("input") && self.attr(id, "type") == Some("hidden") {
            return false;
        }
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|n| self.is_element(*n))
            .all(|n| self.style(n, "display").as_deref() != Some("none") && !self.has_attr(n, "hidden"))
    }

    // ========================================================================
    // Form state
    // ========================================================================

    pub fn set_disabled(&mut self, id: NodeId, disabled: bool) {
        if disabled {
            self.set_attr(id, "disabled", "disabled");
        } else {
            self.remove_attr(id, "disabled");
        }
    }

    pub fn is_disabled(&self, id: NodeId) -> bool {
        self.has_attr(id, "disabled")
    }

    /// The DOM `type` property: textareas report `textarea`, inputs default
    /// to `text`, buttons to `submit`.
    pub fn control_type(&self, id: NodeId) -> Option<String> {
        match self.tag(id)? {
            "input" => Some(
                self.attr(id, "type")
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_else(|| "text".to_string()),
            ),
            "textarea" => Some("textarea".to_string()),
            "button" => Some(
                self.attr(id, "type")
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_else(|| "submit".to_string()),
            ),
            "select" => Some(if self.has_attr(id, "multiple") {
                "select-multiple".to_string()
            } else {
                "select-one".to_string()
            }),
            _ => None,
        }
    }

    /// Current value of a form control.
    pub fn value(&self, id: NodeId) -> Option<String> {
        match self.tag(id)? {
            "textarea" => Some(self.text_content(id)),
            "select" => self.selected_options(id).into_iter().next(),
            "input" | "button" | "option" => match self.attr(id, "value") {
                Some(v) => Some(v.to_string()),
                None if self.tag(id) == Some("option") => Some(self.text_content(id)),
                None if matches!(self.control_type(id).as_deref(), Some("checkbox" | "radio")) => {
                    Some("on".to_string())
                }
                None => Some(String::new()),
            },
            _ => self.attr(id, "value").map(str::to_string),
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        if self.tag(id) == Some("textarea") {
            self.remove_children(id);
            let text = self.create_text(value);
            self.append_child(id, text);
        } else {
            self.set_attr(id, "value", value);
        }
    }

    /// Values of the selected options of a `<select>`. A single select with
    /// nothing marked selected reports its first option.
    pub fn selected_options(&self, select: NodeId) -> Vec<String> {
        let options: Vec<NodeId> = self
            .descendants(select)
            .into_iter()
            .filter(|n| self.tag(*n) == Some("option"))
            .collect();
        let selected: Vec<String> = options
            .iter()
            .filter(|o| self.has_attr(**o, "selected"))
            .filter_map(|o| self.value(*o))
            .collect();
        if selected.is_empty() && !self.has_attr(select, "multiple") {
            return options.first().and_then(|o| self.value(*o)).into_iter().collect();
        }
        selected
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => t.clone(),
            NodeData::Comment(_) | NodeData::Doctype(_) => String::new(),
            _ => self
                .children(id)
                .iter()
                .map(|c| self.text_content(*c))
                .collect(),
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        self.remove_children(id);
        let node = self.create_text(text);
        self.append_child(id, node);
    }

    pub fn data(&self, id: NodeId, key: &str) -> Option<&Value> {
        self.element(id)?.data.get(key)
    }

    pub fn set_data(&mut self, id: NodeId, key: &str, value: Value) {
        if let Some(el) = self.element_mut(id) {
            el.data.insert(key.to_string(), value);
        }
    }
}

fn parse_style(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|decl| {
            let (k, v) = decl.split_once(':')?;
            let k = k.trim().to_ascii_lowercase();
            let v = v.trim();
            if k.is_empty() {
                None
            } else {
                Some((k, v.to_string()))
            }
        })
        .collect()
}
