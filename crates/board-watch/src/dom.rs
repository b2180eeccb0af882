//! In-memory DOM snapshot of the host page.
//!
//! The page-side shim serialises the live DOM into a tree of
//! [`ElementSpec`]s; [`Document`] flattens it into an arena so that parent
//! walks are cheap. Snapshots are immutable and replaced wholesale.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Layout box in page pixels, as reported by `getBoundingClientRect()`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Serialised element as sent by the shim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Either a class list or a raw `className` string.
    #[serde(default, deserialize_with = "class_list")]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<Rect>,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Whitespace-separated class names, like `className`.
    pub fn with_classes(mut self, classes: &str) -> Self {
        self.classes = classes.split_whitespace().map(String::from).collect();
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_rect(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.rect = Some(Rect { x, y, width, height });
        self
    }

    pub fn with_child(mut self, child: ElementSpec) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = ElementSpec>) -> Self {
        self.children.extend(children);
        self
    }
}

fn class_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Classes {
        List(Vec<String>),
        Raw(String),
    }

    Ok(match Classes::deserialize(deserializer)? {
        Classes::List(list) => list,
        Classes::Raw(raw) => raw.split_whitespace().map(String::from).collect(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    rect: Option<Rect>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Document {
    /// Flatten a tree in document (pre-)order. Node 0 is the root.
    pub fn from_tree(root: ElementSpec) -> Self {
        let mut nodes: Vec<Node> = Vec::new();
        let mut stack = vec![(root, None::<NodeId>)];
        while let Some((spec, parent)) = stack.pop() {
            let id = NodeId(nodes.len());
            if let Some(p) = parent {
                nodes[p.0].children.push(id);
            }
            let ElementSpec {
                tag,
                id: html_id,
                classes,
                attrs,
                rect,
                children,
            } = spec;
            nodes.push(Node {
                tag,
                id: html_id,
                classes,
                attrs,
                rect,
                parent,
                children: Vec::new(),
            });
            // Reverse so the first child is popped (and numbered) first.
            for child in children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }
        Self { nodes }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn element(&self, id: NodeId) -> Element<'_> {
        Element { doc: self, id }
    }

    /// Strict descendants of `id` in document order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = Element<'_>> + '_ {
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
            Some(self.element(next))
        })
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = Element<'_>> + '_ {
        let mut cursor = self.nodes[id.0].parent;
        std::iter::from_fn(move || {
            let current = cursor?;
            cursor = self.nodes[current.0].parent;
            Some(self.element(current))
        })
    }

    /// Whole document in order, root included.
    pub fn all(&self) -> impl Iterator<Item = Element<'_>> + '_ {
        std::iter::once(self.element(self.root())).chain(self.descendants(self.root()))
    }

    /// Structural equality of the subtree at `id` with the one at `other_id`.
    pub fn subtree_eq(&self, id: NodeId, other: &Document, other_id: NodeId) -> bool {
        let a = &self.nodes[id.0];
        let b = &other.nodes[other_id.0];
        a.tag == b.tag
            && a.id == b.id
            && a.classes == b.classes
            && a.attrs == b.attrs
            && a.rect == b.rect
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(&b.children)
                .all(|(x, y)| self.subtree_eq(*x, other, *y))
    }
}

/// Borrowed view of one node.
#[derive(Clone, Copy)]
pub struct Element<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Element<'a> {
    fn node(&self) -> &'a Node {
        &self.doc.nodes[self.id.0]
    }

    pub fn node_id(&self) -> NodeId {
        self.id
    }

    pub fn tag(&self) -> &'a str {
        &self.node().tag
    }

    pub fn html_id(&self) -> Option<&'a str> {
        self.node().id.as_deref()
    }

    pub fn classes(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.node().classes.iter().map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.node().classes.iter().any(|c| c == class)
    }

    pub fn has_any_class(&self, classes: &[String]) -> bool {
        classes.iter().any(|c| self.has_class(c))
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node().attrs.get(name).map(String::as_str)
    }

    pub fn rect(&self) -> Option<Rect> {
        self.node().rect
    }

    pub fn parent(&self) -> Option<Element<'a>> {
        self.node().parent.map(|p| self.doc.element(p))
    }

    pub fn descendants(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        self.doc.descendants(self.id)
    }

    pub fn ancestors(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        self.doc.ancestors(self.id)
    }
}

impl std::fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let node = self.node();
        f.debug_struct("Element")
            .field("tag", &node.tag)
            .field("id", &node.id)
            .field("classes", &node.classes)
            .finish()
    }
}
