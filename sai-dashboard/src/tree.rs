//! Keyed UI node arena
//!
//! A small stand-in for a browser DOM. Nodes live in a generational arena,
//! so a [`NodeId`] that outlives its node is detected instead of silently
//! aliasing a newer one. Nodes may carry a unique string key, which is how
//! the reconciler finds the node that already represents an entity.
//!
//! Node text is an HTML fragment and is emitted verbatim by [`UiTree::render`];
//! callers escape untrusted strings before setting it.

use std::collections::{BTreeMap, HashMap};

use crate::format::escape_html;

/// Handle to a node in a [`UiTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// One element of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    tag: String,
    key: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            key: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// The UI tree
#[derive(Debug)]
pub struct UiTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    keys: HashMap<String, NodeId>,
    root: NodeId,
}

impl Default for UiTree {
    fn default() -> Self {
        Self::new()
    }
}

impl UiTree {
    /// Creates a tree holding only an empty `body` root
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            keys: HashMap::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
        };
        tree.root = tree.create("body");
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, attached or not
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Creates a detached node
    pub fn create(&mut self, tag: &str) -> NodeId {
        let node = Node::new(tag);
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        }
    }

    /// Creates a detached node registered under `key`
    ///
    /// A live node already holding the key is removed first; keys are unique.
    pub fn create_keyed(&mut self, tag: &str, key: &str) -> NodeId {
        if let Some(old) = self.by_key(key) {
            self.remove(old);
        }
        let id = self.create(tag);
        if let Some(node) = self.node_mut(id) {
            node.key = Some(key.to_string());
        }
        self.keys.insert(key.to_string(), id);
        id
    }

    pub fn by_key(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied().filter(|id| self.contains(*id))
    }

    /// Returns the node under `key`, creating it as the last child of
    /// `parent` if there is none
    pub fn ensure_child(&mut self, parent: NodeId, key: &str, tag: &str) -> NodeId {
        if let Some(id) = self.by_key(key) {
            return id;
        }
        let id = self.create_keyed(tag, key);
        self.append(parent, id);
        id
    }

    fn is_ancestor(&self, ancestor: NodeId, mut id: NodeId) -> bool {
        while let Some(parent) = self.get(id).and_then(Node::parent) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// Moves `child` to the end of `parent`'s children
    ///
    /// Returns false when either node is gone or the move would create a
    /// cycle.
    pub fn append(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.contains(parent)
            || !self.contains(child)
            || parent == child
            || self.is_ancestor(child, parent)
        {
            return false;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        true
    }

    /// Unlinks a node from its parent, keeping it and its subtree alive
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).and_then(Node::parent) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Frees a node and its whole subtree; the root is only emptied
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            self.clear_children(id);
            return;
        }
        if !self.contains(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index as usize];
            let Some(node) = slot.node.take() else {
                continue;
            };
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(current.index);
            if let Some(key) = node.key {
                if self.keys.get(&key) == Some(&current) {
                    self.keys.remove(&key);
                }
            }
            stack.extend(node.children);
        }
    }

    pub fn clear_children(&mut self, id: NodeId) {
        let children = match self.get(id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.remove(child);
        }
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    /// All nodes below `id` in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev());
        }
        out
    }

    /// Attached nodes carrying a class that starts with `prefix`
    pub fn find_by_class_prefix(&self, prefix: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| {
                self.get(*id)
                    .is_some_and(|n| n.classes.iter().any(|c| c.starts_with(prefix)))
            })
            .collect()
    }

    pub fn text(&self, id: NodeId) -> &str {
        self.get(id).map(Node::text).unwrap_or("")
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let Some(node) = self.node_mut(id) {
            node.text = text.into();
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.get(id).is_some_and(|n| n.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            if !node.has_class(class) {
                node.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.classes.retain(|c| c != class);
        }
    }

    pub fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(id, class);
        } else {
            self.remove_class(id, class);
        }
    }

    /// Drops every class of the form `<prefix><something>` and adds `class`
    ///
    /// A class equal to `prefix` itself is left alone.
    pub fn replace_class_prefix(&mut self, id: NodeId, prefix: &str, class: Option<&str>) {
        if let Some(node) = self.node_mut(id) {
            node.classes
                .retain(|c| c.strip_prefix(prefix).is_none_or(|rest| rest.is_empty()));
        }
        if let Some(class) = class {
            self.add_class(id, class);
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(node) = self.node_mut(id) {
            node.attrs.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(node) = self.node_mut(id) {
            node.attrs.remove(name);
        }
    }

    /// Serialises a subtree as HTML
    pub fn render(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_into(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        out.push('<');
        out.push_str(&node.tag);
        if let Some(key) = &node.key {
            out.push_str(&format!(" id=\"{}\"", escape_html(key)));
        }
        if !node.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", node.classes.join(" ")));
        }
        for (name, value) in &node.attrs {
            out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
        }
        out.push('>');
        out.push_str(&node.text);
        for child in &node.children {
            self.render_into(*child, out);
        }
        out.push_str("</");
        out.push_str(&node.tag);
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyed_lookup_and_removal() {
        let mut tree = UiTree::new();
        let root = tree.root();
        let a = tree.ensure_child(root, "a", "div");
        let b = tree.ensure_child(a, "b", "span");

        assert_eq!(tree.by_key("a"), Some(a));
        assert_eq!(tree.ensure_child(root, "a", "div"), a);

        tree.remove(a);
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert_eq!(tree.by_key("b"), None);
        assert!(tree.children(root).is_empty());
    }

    #[test]
    fn test_stale_id_does_not_alias_reused_slot() {
        let mut tree = UiTree::new();
        let old = tree.create("div");
        tree.remove(old);
        let new = tree.create("div");

        assert!(!tree.contains(old));
        assert!(tree.contains(new));
        tree.set_text(old, "ignored");
        assert_eq!(tree.text(new), "");
    }

    #[test]
    fn test_detached_node_survives_clear() {
        let mut tree = UiTree::new();
        let root = tree.root();
        let container = tree.ensure_child(root, "c", "div");
        let keep = tree.ensure_child(container, "keep", "div");
        tree.ensure_child(container, "drop", "div");

        tree.detach(keep);
        tree.clear_children(container);

        assert!(tree.contains(keep));
        assert_eq!(tree.by_key("drop"), None);
        assert!(tree.append(container, keep));
        assert_eq!(tree.children(container), &[keep]);
    }

    #[test]
    fn test_append_rejects_cycles() {
        let mut tree = UiTree::new();
        let root = tree.root();
        let a = tree.ensure_child(root, "a", "div");
        let b = tree.ensure_child(a, "b", "div");

        assert!(!tree.append(b, a));
        assert!(!tree.append(a, a));
        assert_eq!(tree.get(b).and_then(Node::parent), Some(a));
    }

    #[test]
    fn test_replace_class_prefix_keeps_bare_prefix() {
        let mut tree = UiTree::new();
        let n = tree.create("div");
        tree.add_class(n, "taskstate");
        tree.add_class(n, "taskstate2");

        tree.replace_class_prefix(n, "taskstate", Some("taskstate3"));
        tree.replace_class_prefix(n, "taskstate", Some("taskstate3"));

        assert_eq!(tree.get(n).unwrap().classes(), &["taskstate", "taskstate3"]);
    }

    #[test]
    fn test_render_and_class_search() {
        let mut tree = UiTree::new();
        let root = tree.root();
        let span = tree.ensure_child(root, "age", "span");
        tree.add_class(span, "age-1");
        tree.set_attr(span, "ut", "10");
        tree.set_text(span, "3m");

        assert_eq!(
            tree.render(root),
            "<body><span id=\"age\" class=\"age-1\" ut=\"10\">3m</span></body>"
        );
        assert_eq!(tree.find_by_class_prefix("age-"), vec![span]);

        tree.detach(span);
        assert!(tree.find_by_class_prefix("age-").is_empty());
    }
}
