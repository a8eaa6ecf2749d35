//! Zipper-style cursor over an immutable box tree.
//!
//! The walker keeps the root, the current node and one sibling cursor per
//! ancestor level. Edits rebuild the ancestors of the current node and
//! install a new root; sub-cursors forward their edits to the walker that
//! created them through [`RootSink`].

use log::trace;

use crate::editing::SequenceCursor;
use crate::error::TreeError;
use crate::models::{Attribute, BoxEdit, BoxNode, Children, QualifiedName, RenderHint};

type Siblings = SequenceCursor<BoxNode, Children>;

/// Receiver of the edits a sub-cursor makes to its root.
pub trait RootSink {
    /// Replaces `expected` with `new_root` and returns the node as installed.
    ///
    /// Fails with [`TreeError::ConcurrentModification`] if `expected` is no
    /// longer the node the sink is positioned on.
    fn replace_root(&mut self, expected: &BoxNode, new_root: BoxNode) -> Result<BoxNode, TreeError>;
}

struct Owner<'a> {
    sink: &'a mut dyn RootSink,
    /// The owner's node as of the last synchronization.
    synced: BoxNode,
}

/// Saved cursor state for transactional searches.
struct Position {
    path: Vec<Siblings>,
    current: BoxNode,
}

pub struct TreeWalker<'a> {
    root: BoxNode,
    current: BoxNode,
    path: Vec<Siblings>,
    owner: Option<Owner<'a>>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(root: BoxNode) -> Self {
        Self {
            current: root.clone(),
            root,
            path: Vec::new(),
            owner: None,
        }
    }

    /// Walker rooted at the current node whose edits are forwarded here.
    pub fn sub_cursor(&mut self) -> TreeWalker<'_> {
        let root = self.current.clone();
        TreeWalker {
            current: root.clone(),
            root: root.clone(),
            path: Vec::new(),
            owner: Some(Owner {
                sink: self,
                synced: root,
            }),
        }
    }

    pub fn current(&self) -> &BoxNode {
        &self.current
    }

    /// Number of levels between the root and the current node.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Moves to the root and returns it.
    pub fn root(&mut self) -> BoxNode {
        self.path.clear();
        self.current = self.root.clone();
        self.current.clone()
    }

    /// The root as of the last edit, without moving.
    pub fn root_node(&self) -> &BoxNode {
        &self.root
    }

    fn node_at_depth(&self, depth: usize) -> Option<&BoxNode> {
        match depth {
            0 => Some(&self.root),
            d => self.path.get(d - 1).and_then(Siblings::peek_previous),
        }
    }

    fn parent_node(&self) -> Option<&BoxNode> {
        self.path
            .len()
            .checked_sub(1)
            .and_then(|depth| self.node_at_depth(depth))
    }

    fn enter_child(&mut self, index: usize) -> Option<BoxNode> {
        let mut siblings = SequenceCursor::new(self.current.children_iter());
        if siblings.forward(index + 1) != index + 1 {
            return None;
        }
        let child = siblings.peek_previous()?.clone();
        self.path.push(siblings);
        self.current = child.clone();
        Some(child)
    }

    pub fn first_child(&mut self) -> Option<BoxNode> {
        self.enter_child(0)
    }

    pub fn next_sibling(&mut self) -> Option<BoxNode> {
        let sibling = self.path.last_mut()?.next()?;
        self.current = sibling.clone();
        Some(sibling)
    }

    pub fn previous_sibling(&mut self) -> Option<BoxNode> {
        if !self.has_previous_sibling() {
            return None;
        }
        let siblings = self.path.last_mut()?;
        siblings.previous();
        let sibling = siblings.peek_previous()?.clone();
        self.current = sibling.clone();
        Some(sibling)
    }

    pub fn parent(&mut self) -> Option<BoxNode> {
        let parent = self.parent_node()?.clone();
        self.path.pop();
        self.current = parent.clone();
        Some(parent)
    }

    pub fn has_previous_sibling(&self) -> bool {
        self.path.last().is_some_and(|s| s.position() >= 2)
    }

    pub fn has_next_sibling(&self) -> bool {
        self.parent_node()
            .is_some_and(|p| self.current.index() + 1 < p.children().len())
    }

    fn save(&mut self) -> Position {
        Position {
            path: self.path.iter_mut().map(SequenceCursor::fork).collect(),
            current: self.current.clone(),
        }
    }

    fn restore(&mut self, position: Position) {
        self.path = position.path;
        self.current = position.current;
    }

    /// Next node in document order outside the current subtree.
    pub fn first_following_any(&mut self) -> Option<BoxNode> {
        for depth in (0..self.path.len()).rev() {
            if let Some(next) = self.path[depth].next() {
                self.path.truncate(depth + 1);
                self.current = next.clone();
                return Some(next);
            }
        }
        None
    }

    /// Deepest last descendant of the nearest preceding sibling of the
    /// current node or of one of its ancestors. Ancestors themselves are skipped.
    pub fn first_preceding_any(&mut self) -> Option<BoxNode> {
        for depth in (0..self.path.len()).rev() {
            if self.path[depth].position() >= 2 {
                self.path.truncate(depth + 1);
                self.previous_sibling()?;
                return Some(self.descend_to_last());
            }
        }
        None
    }

    fn descend_to_last(&mut self) -> BoxNode {
        while let Some(last) = self.current.children().len().checked_sub(1) {
            if self.enter_child(last).is_none() {
                break;
            }
        }
        self.current.clone()
    }

    /// First descendant of the current node, in pre-order, accepted by `pred`.
    pub fn first_descendant(&mut self, pred: impl Fn(&BoxNode) -> bool) -> Option<BoxNode> {
        let start = self.path.len();
        let saved = self.save();
        self.first_child()?;
        loop {
            if pred(&self.current) {
                return Some(self.current.clone());
            }
            if self.first_child().is_some() {
                continue;
            }
            while self.next_sibling().is_none() {
                if self.path.len() <= start + 1 {
                    self.restore(saved);
                    return None;
                }
                self.parent();
            }
        }
    }

    /// First node after the current subtree, in document order, accepted by `pred`.
    pub fn first_following(&mut self, pred: impl Fn(&BoxNode) -> bool) -> Option<BoxNode> {
        let saved = self.save();
        while self.first_following_any().is_some() {
            if pred(&self.current) {
                return Some(self.current.clone());
            }
            if let Some(found) = self.first_descendant(&pred) {
                return Some(found);
            }
        }
        self.restore(saved);
        None
    }

    /// First node before the current one in reverse document order
    /// (ancestors included) accepted by `pred`.
    pub fn first_preceding(&mut self, pred: impl Fn(&BoxNode) -> bool) -> Option<BoxNode> {
        let saved = self.save();
        loop {
            let step = if self.previous_sibling().is_some() {
                Some(self.descend_to_last())
            } else {
                self.parent()
            };
            match step {
                Some(node) if pred(&node) => return Some(node),
                Some(_) => {}
                None => {
                    self.restore(saved);
                    return None;
                }
            }
        }
    }

    /// Nearest proper ancestor accepted by `pred`.
    pub fn first_parent(&mut self, pred: impl Fn(&BoxNode) -> bool) -> Option<BoxNode> {
        for depth in (0..self.path.len()).rev() {
            let ancestor = self.node_at_depth(depth)?.clone();
            if pred(&ancestor) {
                self.path.truncate(depth);
                self.current = ancestor.clone();
                return Some(ancestor);
            }
        }
        None
    }

    /// Replaces the current node and every ancestor, installs the new root
    /// (forwarding it to the owner, if any) and moves onto the new node.
    pub fn update_current(&mut self, node: BoxNode) -> Result<BoxNode, TreeError> {
        let indices: Vec<usize> = self
            .path
            .iter()
            .map(|s| s.position().saturating_sub(1))
            .collect();
        let mut replacement = node;
        for depth in (0..indices.len()).rev() {
            let parent = self
                .node_at_depth(depth)
                .ok_or_else(|| TreeError::NoSuchElement("walker path is out of sync".into()))?;
            let mut children = parent.children().to_vec();
            let slot = children
                .get_mut(indices[depth])
                .ok_or_else(|| TreeError::NoSuchElement("walker path is out of sync".into()))?;
            *slot = replacement;
            replacement = parent.with_children(children)?;
        }
        let new_root = if indices.is_empty() {
            replacement.placed_at(&self.root)
        } else {
            replacement
        };

        let installed = match self.owner.as_mut() {
            Some(owner) => {
                let installed = owner.sink.replace_root(&owner.synced, new_root)?;
                owner.synced = installed.clone();
                installed
            }
            None => new_root,
        };

        self.root = installed;
        self.current = self.root.clone();
        self.path.clear();
        for &index in &indices {
            if self.enter_child(index).is_none() {
                break;
            }
        }
        trace!("updated {}", self.current.path_key());
        Ok(self.current.clone())
    }

    /// Moves up `levels` ancestors, replaces that node, then walks down
    /// through `descend` child indices. Restores the position on failure.
    fn commit_at(
        &mut self,
        levels: usize,
        replacement: BoxNode,
        descend: &[usize],
    ) -> Result<BoxNode, TreeError> {
        let saved = self.save();
        for _ in 0..levels {
            self.parent();
        }
        if let Err(err) = self.update_current(replacement) {
            self.restore(saved);
            return Err(err);
        }
        for &index in descend {
            self.enter_child(index).ok_or_else(|| {
                TreeError::NoSuchElement(format!("there is no child at index {index}"))
            })?;
        }
        Ok(self.current.clone())
    }

    /// Renames the current node; attributes are kept unless new ones are given.
    pub fn rename_current(
        &mut self,
        name: QualifiedName,
        attributes: Option<Vec<Attribute>>,
    ) -> Result<BoxNode, TreeError> {
        trace!("rename {} to {name}", self.current.path_key());
        let mut edit = BoxEdit::new().name(Some(name));
        if let Some(attributes) = attributes {
            edit = edit.attributes(attributes);
        }
        let renamed = self.current.copy(edit)?;
        self.update_current(renamed)
    }

    /// Makes the current node anonymous, keeping its attributes.
    pub fn strip_current_name(&mut self) -> Result<BoxNode, TreeError> {
        let stripped = self.current.with_name(None)?;
        self.update_current(stripped)
    }

    pub fn delete_first_child(&mut self) -> Result<BoxNode, TreeError> {
        let mut children = self.current.children().to_vec();
        if children.is_empty() {
            return Err(TreeError::NoSuchElement("there is no first child".into()));
        }
        children.remove(0);
        let updated = self.current.with_children(children)?;
        self.update_current(updated)
    }

    /// Replaces the first child by its own children. The cursor stays put.
    pub fn unwrap_first_child(&mut self) -> Result<BoxNode, TreeError> {
        let first = self
            .current
            .children()
            .first()
            .ok_or_else(|| TreeError::NoSuchElement("there is no first child".into()))?;
        let mut children = self.current.children().to_vec();
        children.splice(0..1, unwrapped(first)?);
        let updated = self.current.with_children(children)?;
        self.update_current(updated)
    }

    /// Replaces the next sibling by its own children. The cursor stays put.
    pub fn unwrap_next_sibling(&mut self) -> Result<BoxNode, TreeError> {
        let no_sibling = || TreeError::NoSuchElement("there is no next sibling".into());
        let parent = self.parent_node().ok_or_else(no_sibling)?;
        let index = self.current.index();
        let next = parent.children().get(index + 1).ok_or_else(no_sibling)?;
        let mut siblings = parent.children().to_vec();
        siblings.splice(index + 1..index + 2, unwrapped(next)?);
        let updated = parent.with_children(siblings)?;
        self.commit_at(1, updated, &[index])
    }

    /// Replaces the parent by its children. The cursor stays on the current
    /// node, now a child of its former grandparent.
    pub fn unwrap_parent(&mut self) -> Result<BoxNode, TreeError> {
        match self.path.len() {
            0 => return Err(TreeError::NoSuchElement("there is no parent".into())),
            1 => return Err(TreeError::PreconditionNotMet("root can not be unwrapped".into())),
            _ => {}
        }
        let depth = self.path.len();
        let missing = || TreeError::NoSuchElement("walker path is out of sync".into());
        let parent = self.node_at_depth(depth - 1).ok_or_else(missing)?;
        let grandparent = self.node_at_depth(depth - 2).ok_or_else(missing)?;
        let parent_index = parent.index();
        let child_index = self.current.index();

        let replacement = unwrapped(parent)?;
        let descend = if parent.has_text() {
            vec![parent_index, child_index]
        } else {
            vec![parent_index + child_index]
        };
        let mut siblings = grandparent.children().to_vec();
        siblings.splice(parent_index..parent_index + 1, replacement);
        let updated = grandparent.with_children(siblings)?;
        self.commit_at(2, updated, &descend)
    }

    /// Wraps the current node; the cursor ends on it, inside the wrapper.
    pub fn wrap_current(
        &mut self,
        name: Option<QualifiedName>,
        attributes: Option<Vec<Attribute>>,
    ) -> Result<BoxNode, TreeError> {
        let wrapper = make_wrapper(vec![self.current.clone()], name, attributes)?;
        self.commit_at(0, wrapper, &[0])
    }

    /// Wraps all children; the cursor ends on the first of them.
    pub fn wrap_children(
        &mut self,
        name: Option<QualifiedName>,
        attributes: Option<Vec<Attribute>>,
    ) -> Result<BoxNode, TreeError> {
        let count = self.current.children().len();
        if count == 0 {
            return Err(TreeError::NoSuchElement("there are no children".into()));
        }
        self.wrap_first_children(count, name, attributes)
    }

    /// Wraps the first `count` children; the cursor ends on the first of them.
    pub fn wrap_first_children(
        &mut self,
        count: usize,
        name: Option<QualifiedName>,
        attributes: Option<Vec<Attribute>>,
    ) -> Result<BoxNode, TreeError> {
        let children = self.current.children();
        if count == 0 || children.len() < count {
            return Err(TreeError::NoSuchElement(format!("there are no {count} children")));
        }
        let wrapper = make_wrapper(children[..count].to_vec(), name, attributes)?;
        let mut new_children = Vec::with_capacity(children.len() - count + 1);
        new_children.push(wrapper);
        new_children.extend(children[count..].iter().cloned());
        let updated = self.current.with_children(new_children)?;
        self.commit_at(0, updated, &[0, 0])
    }

    /// Wraps the `count` siblings following the current node; the cursor
    /// ends on the first of them.
    pub fn wrap_next_siblings(
        &mut self,
        count: usize,
        name: Option<QualifiedName>,
        attributes: Option<Vec<Attribute>>,
    ) -> Result<BoxNode, TreeError> {
        let not_enough =
            || TreeError::NoSuchElement(format!("there are no {count} next siblings"));
        let parent = self.parent_node().ok_or_else(not_enough)?;
        let index = self.current.index();
        let siblings = parent.children();
        let (start, end) = (index + 1, index + 1 + count);
        if count == 0 || end > siblings.len() {
            return Err(not_enough());
        }
        let wrapper = make_wrapper(siblings[start..end].to_vec(), name, attributes)?;
        let mut new_siblings = Vec::with_capacity(siblings.len() - count + 1);
        new_siblings.extend(siblings[..start].iter().cloned());
        new_siblings.push(wrapper);
        new_siblings.extend(siblings[end..].iter().cloned());
        let updated = parent.with_children(new_siblings)?;
        self.commit_at(1, updated, &[start, 0])
    }

    /// Asks renderers to drop the element but keep its content.
    pub fn mark_for_unwrap(&mut self) -> Result<BoxNode, TreeError> {
        let marked = self.current.with_render_hint(RenderHint::Anonymous)?;
        self.update_current(marked)
    }

    /// Asks renderers to drop the element and its content.
    pub fn mark_for_removal(&mut self) -> Result<BoxNode, TreeError> {
        let marked = self.current.with_render_hint(RenderHint::Skip)?;
        self.update_current(marked)
    }
}

impl RootSink for TreeWalker<'_> {
    fn replace_root(&mut self, expected: &BoxNode, new_root: BoxNode) -> Result<BoxNode, TreeError> {
        if !self.current.same_node(expected) {
            return Err(TreeError::ConcurrentModification(format!(
                "walker moved away from {}",
                expected.path_key()
            )));
        }
        self.update_current(new_root)
    }
}

/// Content that replaces `node` when it is unwrapped.
fn unwrapped(node: &BoxNode) -> Result<Vec<BoxNode>, TreeError> {
    if node.has_text() {
        Ok(vec![node.copy(BoxEdit::new().name(None).attributes(Vec::new()))?])
    } else {
        Ok(node.children().to_vec())
    }
}

/// New box around `children`, of the same kind as the first of them.
fn make_wrapper(
    children: Vec<BoxNode>,
    name: Option<QualifiedName>,
    attributes: Option<Vec<Attribute>>,
) -> Result<BoxNode, TreeError> {
    let kind = children
        .first()
        .map(BoxNode::kind)
        .ok_or_else(|| TreeError::NoSuchElement("nothing to wrap".into()))?;
    let mut builder = BoxNode::builder(kind).children(children);
    if let Some(name) = name {
        builder = builder.name(name);
    }
    for attribute in attributes.unwrap_or_default() {
        builder = builder.attribute(attribute.name, attribute.value);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoxKind, html};
    use crate::tests::{block, child_names, inline_text, name, para, text, tree};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::HashSet;

    fn sample() -> BoxNode {
        tree(json!({
            "kind": "BLOCK", "name": "root", "children": [
                {"kind": "BLOCK", "name": "container", "children": [
                    {"kind": "BLOCK", "name": "block", "children": [{"kind": "INLINE", "text": "one"}]},
                    {"kind": "BLOCK", "name": "block", "children": [{"kind": "INLINE", "text": "two"}]}
                ]},
                {"kind": "BLOCK", "name": "container", "children": [
                    {"kind": "BLOCK", "name": "block", "children": [{"kind": "INLINE", "text": "three"}]}
                ]}
            ]
        }))
    }

    fn key(walker: &TreeWalker) -> String {
        walker.current().path_key().to_string()
    }

    fn assert_unique_keys(root: &BoxNode) {
        let keys = root.keys();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len(), "duplicate keys in {keys:?}");
    }

    #[test]
    fn basic_navigation() {
        let mut walker = TreeWalker::new(sample());

        walker.first_child();
        assert_eq!(key(&walker), "/root[0]/container[0]");
        walker.first_child();
        assert_eq!(key(&walker), "/root[0]/container[0]/block[0]");
        assert!(walker.previous_sibling().is_none());
        assert_eq!(key(&walker), "/root[0]/container[0]/block[0]");
        walker.next_sibling();
        assert_eq!(key(&walker), "/root[0]/container[0]/block[1]");
        assert!(walker.has_previous_sibling());
        assert!(!walker.has_next_sibling());
        assert!(walker.next_sibling().is_none());
        walker.previous_sibling();
        assert_eq!(key(&walker), "/root[0]/container[0]/block[0]");
        walker.parent();
        assert_eq!(key(&walker), "/root[0]/container[0]");
        assert!(walker.has_next_sibling());
        assert_eq!(walker.root().path_key(), "/root[0]");
        assert!(walker.parent().is_none());
        assert_eq!(walker.depth(), 0);
    }

    #[test]
    fn following_skips_subtree() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        walker.first_child();
        walker.first_following_any();
        assert_eq!(key(&walker), "/root[0]/container[0]/block[1]");
        walker.first_following_any();
        assert_eq!(key(&walker), "/root[0]/container[1]");
        assert!(walker.first_following_any().is_none());
        assert_eq!(key(&walker), "/root[0]/container[1]");
    }

    #[test]
    fn preceding_any_goes_to_deepest_last_descendant() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        walker.next_sibling();
        walker.first_preceding_any();
        assert_eq!(key(&walker), "/root[0]/container[0]/block[1]/text()[0]");
    }

    #[test]
    fn filtered_searches() {
        let mut walker = TreeWalker::new(sample());
        let is_text = |b: &BoxNode| b.has_text();

        walker.first_descendant(is_text);
        assert_eq!(key(&walker), "/root[0]/container[0]/block[0]/text()[0]");
        walker.first_following(is_text);
        assert_eq!(key(&walker), "/root[0]/container[0]/block[1]/text()[0]");
        walker.first_following(is_text);
        assert_eq!(key(&walker), "/root[0]/container[1]/block[0]/text()[0]");

        walker.first_preceding(|b| b.path_key().ends_with("container[0]"));
        assert_eq!(key(&walker), "/root[0]/container[0]");

        walker.first_descendant(is_text);
        walker.first_parent(|b| b.name().is_some_and(|n| n.local_part() == "root"));
        assert_eq!(walker.depth(), 0);
    }

    #[test]
    fn failed_searches_restore_position() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        walker.first_child();
        walker.next_sibling();

        assert!(walker.first_descendant(|b| b.is_replaced()).is_none());
        assert!(walker.first_following(|b| b.is_replaced()).is_none());
        assert!(walker.first_preceding(|b| b.is_replaced()).is_none());
        assert!(walker.first_parent(|b| b.is_replaced()).is_none());

        assert_eq!(key(&walker), "/root[0]/container[0]/block[1]");
        assert_eq!(walker.depth(), 2);
        walker.previous_sibling();
        assert_eq!(key(&walker), "/root[0]/container[0]/block[0]");
    }

    #[test]
    fn navigation_paths_agree() {
        let doc = sample();
        let mut by_siblings = TreeWalker::new(doc.clone());
        by_siblings.first_child();
        by_siblings.first_child();
        by_siblings.next_sibling();

        let mut by_preceding = TreeWalker::new(doc.clone());
        by_preceding.first_child();
        by_preceding.next_sibling();
        by_preceding.first_preceding_any();
        by_preceding.parent();

        let mut by_search = TreeWalker::new(doc);
        by_search.first_descendant(|b| b.path_key().ends_with("/block[1]"));

        let mut walkers = [by_siblings, by_preceding, by_search];
        for walker in &walkers {
            assert_eq!(key(walker), "/root[0]/container[0]/block[1]");
            assert!(walker.current().same_node(walkers[0].current()));
            assert_eq!(walker.depth(), 2);
        }

        fn moves(walker: &mut TreeWalker) -> Vec<Option<String>> {
            let key = |b: BoxNode| b.path_key().to_string();
            vec![
                walker.previous_sibling().map(key),
                walker.next_sibling().map(key),
                walker.parent().map(key),
                walker.next_sibling().map(key),
                walker.previous_sibling().map(key),
            ]
        }
        let expected = vec![
            Some("/root[0]/container[0]/block[0]".to_string()),
            Some("/root[0]/container[0]/block[1]".to_string()),
            Some("/root[0]/container[0]".to_string()),
            Some("/root[0]/container[1]".to_string()),
            Some("/root[0]/container[0]".to_string()),
        ];
        for walker in &mut walkers {
            assert_eq!(moves(walker), expected);
        }
    }

    #[test]
    fn rename_propagates_keys() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        walker
            .rename_current(QualifiedName::namespaced("http://daisy/test", "renamed"), None)
            .unwrap();

        assert_eq!(key(&walker), "/root[0]/renamed[0]");
        walker.first_child();
        assert_eq!(key(&walker), "/root[0]/renamed[0]/block[0]");
        assert_eq!(walker.root().children()[0].path_key(), "/root[0]/renamed[0]");
        // Navigation over the rebuilt levels still works.
        walker.first_child();
        walker.next_sibling();
        assert_eq!(key(&walker), "/root[0]/container[1]");
    }

    #[test]
    fn rename_keeps_siblings_reachable() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        walker.first_child();
        walker.next_sibling();
        walker.rename_current(name("p"), None).unwrap();

        assert_eq!(key(&walker), "/root[0]/container[0]/p[1]");
        walker.previous_sibling();
        assert_eq!(key(&walker), "/root[0]/container[0]/block[0]");
        walker.next_sibling();
        assert_eq!(key(&walker), "/root[0]/container[0]/p[1]");
    }

    #[test]
    fn sub_cursor_edits_reach_the_owner() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        {
            let mut sub = walker.sub_cursor();
            sub.first_child();
            sub.rename_current(name("p"), None).unwrap();
            {
                let mut nested = sub.sub_cursor();
                nested.first_child();
                nested.mark_for_removal().unwrap();
            }
            assert_eq!(
                sub.root_node().children()[0].children()[0].render_hint(),
                RenderHint::Skip
            );
        }
        assert_eq!(key(&walker), "/root[0]/container[0]");
        let root = walker.root();
        let p = root.select("/root[0]/container[0]/p[0]").unwrap();
        assert_eq!(p.children()[0].render_hint(), RenderHint::Skip);
        assert_unique_keys(&root);
    }

    #[test]
    fn stale_owner_is_rejected() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        let stale = walker.root_node().clone();
        let err = walker.replace_root(&stale, para("x")).unwrap_err();
        assert!(matches!(err, TreeError::ConcurrentModification(_)));
    }

    #[test]
    fn unwrap_parent_splices_children() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        walker.first_child();
        walker.next_sibling();
        walker.unwrap_parent().unwrap();

        assert_eq!(key(&walker), "/root[0]/block[1]");
        assert_eq!(child_names(walker.root_node()), vec!["block", "block", "container"]);
        assert_unique_keys(walker.root_node());
    }

    #[test]
    fn unwrap_parent_failures() {
        let mut walker = TreeWalker::new(sample());
        assert!(matches!(walker.unwrap_parent(), Err(TreeError::NoSuchElement(_))));
        walker.first_child();
        assert!(matches!(
            walker.unwrap_parent(),
            Err(TreeError::PreconditionNotMet(msg)) if msg == "root can not be unwrapped"
        ));
    }

    #[test]
    fn unwrapping_text_keeps_it_anonymous() {
        let strong = BoxNode::inline()
            .name(html::strong())
            .attribute(QualifiedName::local("class"), "loud")
            .text("bold")
            .build()
            .unwrap();
        let doc = block("p", vec![strong, text(" plain")]);
        let mut walker = TreeWalker::new(doc);
        walker.unwrap_first_child().unwrap();

        let first = &walker.current().children()[0];
        assert_eq!(first.text(), Some("bold"));
        assert!(first.name().is_none());
        assert!(first.attributes().is_empty());
        assert_eq!(first.path_key(), "/p[0]/text()[0]");
        assert_eq!(walker.current().children().len(), 2);
    }

    #[test]
    fn unwrap_next_sibling_stays_on_current() {
        let doc = block(
            "div",
            vec![para("a"), block("section", vec![para("b"), para("c")]), para("d")],
        );
        let mut walker = TreeWalker::new(doc);
        walker.first_child();
        walker.unwrap_next_sibling().unwrap();

        assert_eq!(key(&walker), "/div[0]/p[0]");
        assert_eq!(child_names(walker.root_node()), vec!["p", "p", "p", "p"]);
        assert!(walker.next_sibling().is_some());
        assert_eq!(key(&walker), "/div[0]/p[1]");
    }

    #[test]
    fn wrap_first_children_lands_inside_wrapper() {
        let doc = block("div", vec![para("a"), para("b"), para("c")]);
        let mut walker = TreeWalker::new(doc);
        walker.wrap_first_children(2, None, None).unwrap();

        assert_eq!(key(&walker), "/div[0]/_[0]/p[0]");
        walker.parent();
        assert_eq!(walker.current().kind(), BoxKind::Block);
        assert_eq!(walker.current().children().len(), 2);
        assert_eq!(child_names(walker.root_node()), vec!["_", "p"]);

        walker.root();
        assert!(matches!(
            walker.wrap_first_children(3, None, None),
            Err(TreeError::NoSuchElement(_))
        ));
    }

    #[test]
    fn wrap_next_siblings_and_current() {
        let doc = block("div", vec![para("a"), para("b"), para("c")]);
        let mut walker = TreeWalker::new(doc);
        walker.first_child();
        walker
            .wrap_next_siblings(2, Some(html::figure()), None)
            .unwrap();
        assert_eq!(key(&walker), "/div[0]/figure[1]/p[0]");
        assert_eq!(child_names(walker.root_node()), vec!["p", "figure"]);

        walker.root();
        walker.first_child();
        assert!(walker.wrap_next_siblings(2, None, None).is_err());
        assert_eq!(key(&walker), "/div[0]/p[0]");

        walker.wrap_current(Some(name("section")), None).unwrap();
        assert_eq!(key(&walker), "/div[0]/section[0]/p[0]");
    }

    #[test]
    fn wrapping_inline_children_makes_an_inline_wrapper() {
        let doc = block("p", vec![text("a"), inline_text("em", "b")]);
        let mut walker = TreeWalker::new(doc);
        walker.wrap_children(Some(html::span()), None).unwrap();
        walker.parent();
        assert_eq!(walker.current().kind(), BoxKind::Inline);
        assert!(walker.current().is_named(&html::span()));
    }

    #[test]
    fn failed_edit_commits_nothing() {
        let doc = block("div", vec![BoxNode::anonymous_block(vec![]).unwrap(), para("b")]);
        let mut walker = TreeWalker::new(doc);
        walker.first_child();
        walker.next_sibling();
        let before = walker.root_node().clone();

        // Would put two anonymous blocks next to each other.
        let result = walker.wrap_current(None, None);
        assert!(matches!(result, Err(TreeError::StructuralInvariantViolation(_))));
        assert!(walker.root_node().same_node(&before));
        assert_eq!(key(&walker), "/div[0]/p[1]");
    }

    #[test]
    fn marks_do_not_change_structure() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        walker.mark_for_unwrap().unwrap();
        assert_eq!(key(&walker), "/root[0]/container[0]");
        assert_eq!(walker.current().render_hint(), RenderHint::Anonymous);
        assert_eq!(walker.current().children().len(), 2);
        assert_eq!(walker.root_node().keys(), sample().keys());
    }

    #[test]
    fn delete_first_child() {
        let mut walker = TreeWalker::new(sample());
        walker.first_child();
        walker.delete_first_child().unwrap();
        assert_eq!(walker.current().children().len(), 1);
        walker.first_child();
        walker.first_child();
        assert!(matches!(
            walker.delete_first_child().map(|_| ()),
            Err(TreeError::NoSuchElement(_))
        ));
    }
}
