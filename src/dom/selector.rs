//! A small CSS selector engine covering what server-sent commands use in
//! practice: type, `#id`, `.class`, attribute tests, `:visible`, `:hidden`,
//! `:checked`, `:disabled`, `:not(...)`, descendant and child combinators and
//! selector lists. A leading `>` anchors the selector at the search scope.

use thiserror::Error;
use tracing::warn;

use crate::dom::document::{Document, NodeId};

#[derive(Debug, Error, PartialEq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected '{found}' at offset {offset} in selector '{selector}'")]
    Unexpected {
        selector: String,
        found: char,
        offset: usize,
    },

    #[error("unterminated {what} in selector '{selector}'")]
    Unterminated { selector: String, what: &'static str },

    #[error("unsupported pseudo-class ':{0}'")]
    UnsupportedPseudo(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq)]
struct Complex {
    anchored: bool,
    // Compounds left to right; the combinator links each compound to the
    // previous one.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    filters: Vec<Filter>,
}

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Id(String),
    Class(String),
    Attr {
        name: String,
        test: Option<(AttrOp, String)>,
    },
    Visible,
    Hidden,
    Checked,
    Disabled,
    Not(Box<Compound>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AttrOp {
    Equals,
    Includes,
    Prefix,
    Suffix,
    Substring,
}

impl Selector {
    pub fn parse(text: &str) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        for part in split_top_level(text, ',') {
            alternatives.push(Parser::new(text, part).complex()?);
        }
        if alternatives.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Selector { alternatives })
    }

    /// Does `node` match, with anchored (`> x`) selectors resolved against
    /// `scope`?
    pub fn matches_in(&self, doc: &Document, node: NodeId, scope: NodeId) -> bool {
        doc.is_element(node)
            && self
                .alternatives
                .iter()
                .any(|c| c.matches(doc, node, c.parts.len() - 1, scope))
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_in(doc, node, doc.root())
    }
}

impl Complex {
    fn matches(&self, doc: &Document, node: NodeId, index: usize, scope: NodeId) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !compound.matches(doc, node) {
            return false;
        }
        if index == 0 {
            return !self.anchored || doc.parent(node) == Some(scope);
        }
        match combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| self.matches(doc, p, index - 1, scope)),
            Combinator::Descendant => doc
                .ancestors(node)
                .into_iter()
                .any(|a| self.matches(doc, a, index - 1, scope)),
        }
    }
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if let Some(want) = &self.tag {
            if want != "*" && !want.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.filters.iter().all(|f| f.matches(doc, node))
    }
}

impl Filter {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            Filter::Id(id) => doc.attr(node, "id") == Some(id.as_str()),
            Filter::Class(class) => doc.has_class(node, class),
            Filter::Attr { name, test } => match (doc.attr(node, name), test) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some((op, expected))) => match op {
                    AttrOp::Equals => actual == expected,
                    AttrOp::Includes => actual.split_whitespace().any(|w| w == expected),
                    AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected.as_str()),
                    AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected.as_str()),
                    AttrOp::Substring => !expected.is_empty() && actual.contains(expected.as_str()),
                },
            },
            Filter::Visible => doc.is_visible(node),
            Filter::Hidden => !doc.is_visible(node),
            Filter::Checked => doc.has_attr(node, "checked") || doc.has_attr(node, "selected"),
            Filter::Disabled => doc.is_disabled(node),
            Filter::Not(inner) => !inner.matches(doc, node),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, part: &str) -> Self {
        Self {
            source,
            chars: part.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self, found: char) -> SelectorError {
        SelectorError::Unexpected {
            selector: self.source.to_string(),
            found,
            offset: self.pos,
        }
    }

    fn complex(&mut self) -> Result<Complex, SelectorError> {
        self.skip_whitespace();
        let mut anchored = false;
        if self.peek() == Some('>') {
            anchored = true;
            self.pos += 1;
            self.skip_whitespace();
        }

        let mut parts = Vec::new();
        let mut combinator = Combinator::Descendant;
        loop {
            let compound = self.compound()?;
            parts.push((combinator, compound));

            let had_space = self.skip_whitespace();
            match self.peek() {
                None => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    combinator = Combinator::Child;
                }
                Some(_) if had_space => combinator = Combinator::Descendant,
                Some(c) => return Err(self.unexpected(c)),
            }
        }
        Ok(Complex { anchored, parts })
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                compound.tag = Some("*".to_string());
            }
            Some(c) if is_ident_char(c) => compound.tag = Some(self.ident()),
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.filters.push(Filter::Id(self.ident()));
                }
                Some('.') => {
                    self.pos += 1;
                    compound.filters.push(Filter::Class(self.ident()));
                }
                Some('[') => {
                    self.pos += 1;
                    compound.filters.push(self.attribute()?);
                }
                Some(':') => {
                    self.pos += 1;
                    compound.filters.push(self.pseudo()?);
                }
                _ => break,
            }
        }

        if compound.tag.is_none() && compound.filters.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.unexpected(c),
                None => SelectorError::Empty,
            });
        }
        Ok(compound)
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
                if let Some(escaped) = self.peek() {
                    out.push(escaped);
                    self.pos += 1;
                }
                continue;
            }
            if !is_ident_char(c) {
                break;
            }
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn attribute(&mut self) -> Result<Filter, SelectorError> {
        self.skip_whitespace();
        let name = self.ident();
        self.skip_whitespace();
        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(Filter::Attr { name, test: None });
            }
            Some('=') => {
                self.pos += 1;
                AttrOp::Equals
            }
            Some(c @ ('~' | '^' | '$' | '*')) => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(self.unexpected(c));
                }
                self.pos += 1;
                match c {
                    '~' => AttrOp::Includes,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Substring,
                }
            }
            Some(c) => return Err(self.unexpected(c)),
            None => {
                return Err(SelectorError::Unterminated {
                    selector: self.source.to_string(),
                    what: "attribute",
                });
            }
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        None => {
                            return Err(SelectorError::Unterminated {
                                selector: self.source.to_string(),
                                what: "string",
                            });
                        }
                        Some(c) if c == quote => {
                            self.pos += 1;
                            break;
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                    }
                }
                value
            }
            _ => self.ident(),
        };
        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(SelectorError::Unterminated {
                selector: self.source.to_string(),
                what: "attribute",
            });
        }
        self.pos += 1;
        Ok(Filter::Attr {
            name,
            test: Some((op, value)),
        })
    }

    fn pseudo(&mut self) -> Result<Filter, SelectorError> {
        let name = self.ident();
        match name.as_str() {
            "visible" => Ok(Filter::Visible),
            "hidden" => Ok(Filter::Hidden),
            "checked" => Ok(Filter::Checked),
            "disabled" => Ok(Filter::Disabled),
            "not" => {
                if self.peek() != Some('(') {
                    return Err(SelectorError::Unterminated {
                        selector: self.source.to_string(),
                        what: ":not()",
                    });
                }
                self.pos += 1;
                self.skip_whitespace();
                let inner = self.compound()?;
                self.skip_whitespace();
                if self.peek() != Some(')') {
                    return Err(SelectorError::Unterminated {
                        selector: self.source.to_string(),
                        what: ":not()",
                    });
                }
                self.pos += 1;
                Ok(Filter::Not(Box::new(inner)))
            }
            other => Err(SelectorError::UnsupportedPseudo(other.to_string())),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Split on `sep` outside of brackets, parentheses and quotes.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth -= 1,
            (None, c) if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

// ============================================================================
// Document queries
// ============================================================================

impl Document {
    /// Elements under `scope` (excluding `scope`) matching `selector`, in
    /// document order.
    pub fn select_in(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|n| selector.matches_in(self, *n, scope))
            .collect()
    }

    /// Like [`Document::select_in`] with a textual selector. Invalid
    /// selectors match nothing.
    pub fn query_in(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        match Selector::parse(selector) {
            Ok(parsed) => self.select_in(scope, &parsed),
            Err(e) => {
                warn!(selector, error = %e, "ignoring invalid selector");
                Vec::new()
            }
        }
    }

    pub fn query(&self, selector: &str) -> Vec<NodeId> {
        self.query_in(self.root(), selector)
    }

    /// Elements under any of `scopes`, deduplicated and in document order.
    pub fn query_within(&self, scopes: &[NodeId], selector: &str) -> Vec<NodeId> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(selector, error = %e, "ignoring invalid selector");
                return Vec::new();
            }
        };
        let mut found: Vec<NodeId> = scopes
            .iter()
            .flat_map(|s| self.select_in(*s, &parsed))
            .collect();
        self.sort_document_order(&mut found);
        found
    }

    /// Sort nodes into document order and drop duplicates.
    pub fn sort_document_order(&self, nodes: &mut Vec<NodeId>) {
        let mut order = std::collections::HashMap::new();
        for (i, n) in std::iter::once(self.root())
            .chain(self.descendants(self.root()))
            .enumerate()
        {
            order.insert(n, i);
        }
        nodes.sort_by_key(|n| (order.get(n).copied().unwrap_or(usize::MAX), n.index()));
        nodes.dedup();
    }
}
