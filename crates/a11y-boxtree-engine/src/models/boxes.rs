use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

use crate::error::TreeError;
use crate::models::QualifiedName;

/// CSS box category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoxKind {
    Inline,
    Block,
}

/// Soft presentation directive for renderers. Structural operations never
/// look at it; the only reader in this crate is [`BoxNode::is_anonymous`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderHint {
    /// Render as an element named after the box (or anonymously if it has no name).
    #[default]
    Default,
    /// Render only the contents when the block structure allows it.
    Anonymous,
    /// Don't render.
    Skip,
}

impl RenderHint {
    pub fn is_default(&self) -> bool {
        *self == RenderHint::Default
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: QualifiedName,
    pub value: String,
}

impl Attribute {
    pub fn new(name: QualifiedName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Precomputed style values. Opaque to the engine except for classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

impl StyleFlags {
    pub fn display(value: &str) -> Self {
        Self {
            display: Some(value.to_string()),
            visibility: None,
        }
    }

    pub fn display_is(&self, value: &str) -> bool {
        self.display.as_deref() == Some(value)
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility.as_deref() == Some("hidden")
    }

    pub fn is_empty(&self) -> bool {
        self.display.is_none() && self.visibility.is_none()
    }
}

#[derive(Debug, PartialEq, Eq)]
struct BoxData {
    kind: BoxKind,
    name: Option<QualifiedName>,
    attributes: Vec<Attribute>,
    text: Option<String>,
    replaced: bool,
    children: Vec<BoxNode>,
    style: StyleFlags,
    render_hint: RenderHint,
    parent_key: String,
    index: usize,
    path_key: String,
    leaf_block: bool,
}

/// Immutable node of a box tree.
///
/// Cloning is a reference-count bump. Every edit goes through [`BoxNode::copy`]
/// (or a helper built on it) and yields a new node whose key and whose
/// descendants' keys are recomputed; the original stays valid and unchanged.
#[derive(Clone)]
pub struct BoxNode(Rc<BoxData>);

/// Requested changes for [`BoxNode::copy`]. Unset fields are copied over.
#[derive(Debug, Default, Clone)]
pub struct BoxEdit {
    name: Option<Option<QualifiedName>>,
    attributes: Option<Vec<Attribute>>,
    children: Option<Vec<BoxNode>>,
    render_hint: Option<RenderHint>,
}

impl BoxEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` removes the name.
    pub fn name(mut self, name: Option<QualifiedName>) -> Self {
        self.name = Some(name);
        self
    }

    pub fn attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn children(mut self, children: Vec<BoxNode>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn render_hint(mut self, hint: RenderHint) -> Self {
        self.render_hint = Some(hint);
        self
    }
}

/// Everything but the derived fields.
#[derive(Debug, Clone)]
struct Parts {
    kind: BoxKind,
    name: Option<QualifiedName>,
    attributes: Vec<Attribute>,
    text: Option<String>,
    replaced: bool,
    children: Vec<BoxNode>,
    style: StyleFlags,
    render_hint: RenderHint,
}

impl Parts {
    fn new(kind: BoxKind) -> Self {
        Self {
            kind,
            name: None,
            attributes: Vec::new(),
            text: None,
            replaced: false,
            children: Vec::new(),
            style: StyleFlags::default(),
            render_hint: RenderHint::Default,
        }
    }

    fn of(data: &BoxData) -> Self {
        Self {
            kind: data.kind,
            name: data.name.clone(),
            attributes: data.attributes.clone(),
            text: data.text.clone(),
            replaced: data.replaced,
            children: data.children.clone(),
            style: data.style.clone(),
            render_hint: data.render_hint,
        }
    }
}

fn key_segment(kind: BoxKind, name: Option<&QualifiedName>, text: Option<&str>) -> String {
    match name {
        Some(name) => name.local_part().to_string(),
        None if kind == BoxKind::Inline && text.is_some_and(|t| !t.is_empty()) => {
            "text()".to_string()
        }
        None => "_".to_string(),
    }
}

fn child_kinds_are_valid<'a>(
    kind: BoxKind,
    children: impl IntoIterator<Item = (BoxKind, bool)> + 'a,
) -> Result<(), TreeError> {
    match kind {
        BoxKind::Block => {
            let mut block_children = None;
            let mut previous_anonymous_block = false;
            for (child_kind, anonymous) in children {
                let is_block = child_kind == BoxKind::Block;
                match block_children {
                    None => block_children = Some(is_block),
                    Some(expected) if expected != is_block => {
                        return Err(TreeError::StructuralInvariantViolation(
                            "block and inline can not be siblings".to_string(),
                        ));
                    }
                    Some(_) => {}
                }
                let anonymous_block = is_block && anonymous;
                if anonymous_block && previous_anonymous_block {
                    return Err(TreeError::StructuralInvariantViolation(
                        "no adjacent anonymous block boxes".to_string(),
                    ));
                }
                previous_anonymous_block = anonymous_block;
            }
            Ok(())
        }
        BoxKind::Inline => {
            let mut children = children.into_iter();
            if children.any(|(child_kind, _)| child_kind == BoxKind::Block) {
                Err(TreeError::StructuralInvariantViolation(
                    "no block inside inline".to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }
}

fn validate_children(kind: BoxKind, children: &[BoxNode]) -> Result<(), TreeError> {
    child_kinds_are_valid(
        kind,
        children.iter().map(|c| (c.kind(), c.0.name.is_none())),
    )
}

/// Builds a node at `parent_key`/`index`, re-keying a fresh copy of every descendant.
fn assemble(parts: Parts, parent_key: &str, index: usize) -> BoxNode {
    let segment = key_segment(parts.kind, parts.name.as_ref(), parts.text.as_deref());
    let path_key = format!("{parent_key}/{segment}[{index}]");
    let children: Vec<BoxNode> = parts
        .children
        .iter()
        .enumerate()
        .map(|(i, child)| assemble(Parts::of(&child.0), &path_key, i))
        .collect();
    let leaf_block = match parts.kind {
        BoxKind::Inline => true,
        BoxKind::Block => children.first().is_none_or(|c| c.kind() == BoxKind::Inline),
    };
    BoxNode(Rc::new(BoxData {
        kind: parts.kind,
        name: parts.name,
        attributes: parts.attributes,
        text: parts.text,
        replaced: parts.replaced,
        children,
        style: parts.style,
        render_hint: parts.render_hint,
        parent_key: parent_key.to_string(),
        index,
        path_key,
        leaf_block,
    }))
}

fn is_key_prefix(prefix: &str, key: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

impl BoxNode {
    pub fn builder(kind: BoxKind) -> BoxBuilder {
        BoxBuilder {
            parts: Parts::new(kind),
        }
    }

    pub fn block() -> BoxBuilder {
        Self::builder(BoxKind::Block)
    }

    pub fn inline() -> BoxBuilder {
        Self::builder(BoxKind::Inline)
    }

    pub fn anonymous_block(children: Vec<BoxNode>) -> Result<BoxNode, TreeError> {
        Self::block().children(children).build()
    }

    pub fn anonymous_inline(children: Vec<BoxNode>) -> Result<BoxNode, TreeError> {
        Self::inline().children(children).build()
    }

    /// Validated copy with the requested changes applied.
    ///
    /// The copy keeps this node's position (parent key and index) but its own
    /// key follows the new name, and every descendant is copied again with a
    /// recomputed key. New children are checked against the BLOCK/INLINE rules.
    pub fn copy(&self, edit: BoxEdit) -> Result<BoxNode, TreeError> {
        let mut parts = Parts::of(&self.0);
        if let Some(name) = edit.name {
            parts.name = name;
        }
        if let Some(attributes) = edit.attributes {
            parts.attributes = attributes;
        }
        if let Some(hint) = edit.render_hint {
            parts.render_hint = hint;
        }
        if let Some(children) = edit.children {
            validate_children(parts.kind, &children)?;
            parts.children = children;
        }
        Ok(assemble(parts, &self.0.parent_key, self.0.index))
    }

    pub fn with_name(&self, name: Option<QualifiedName>) -> Result<BoxNode, TreeError> {
        self.copy(BoxEdit::new().name(name))
    }

    pub fn with_children(&self, children: Vec<BoxNode>) -> Result<BoxNode, TreeError> {
        self.copy(BoxEdit::new().children(children))
    }

    pub fn with_render_hint(&self, hint: RenderHint) -> Result<BoxNode, TreeError> {
        self.copy(BoxEdit::new().render_hint(hint))
    }

    /// Copy keyed at the position `slot` occupies.
    pub(crate) fn placed_at(&self, slot: &BoxNode) -> BoxNode {
        assemble(Parts::of(&self.0), &slot.0.parent_key, slot.0.index)
    }

    pub fn kind(&self) -> BoxKind {
        self.0.kind
    }

    pub fn is_block(&self) -> bool {
        self.0.kind == BoxKind::Block
    }

    pub fn name(&self) -> Option<&QualifiedName> {
        self.0.name.as_ref()
    }

    /// True if the box carries exactly this name.
    pub fn is_named(&self, name: &QualifiedName) -> bool {
        self.0.name.as_ref() == Some(name)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.0.attributes
    }

    pub fn attribute(&self, name: &QualifiedName) -> Option<&str> {
        self.0
            .attributes
            .iter()
            .find(|attr| &attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn is_replaced(&self) -> bool {
        self.0.replaced
    }

    pub fn children(&self) -> &[BoxNode] {
        &self.0.children
    }

    /// Lazy, one-at-a-time iteration over the children.
    pub fn children_iter(&self) -> Children {
        Children {
            parent: self.clone(),
            next: 0,
        }
    }

    pub fn style(&self) -> &StyleFlags {
        &self.0.style
    }

    pub fn render_hint(&self) -> RenderHint {
        self.0.render_hint
    }

    pub fn path_key(&self) -> &str {
        &self.0.path_key
    }

    /// Position among the parent's children.
    pub fn index(&self) -> usize {
        self.0.index
    }

    /// INLINE, or BLOCK without BLOCK children. Computed once at construction.
    pub fn is_leaf_block(&self) -> bool {
        self.0.leaf_block
    }

    /// Number of leaf blocks in this subtree, not looking inside leaf blocks.
    pub fn leaf_block_count(&self) -> usize {
        if self.is_leaf_block() {
            1
        } else {
            self.children().iter().map(BoxNode::leaf_block_count).sum()
        }
    }

    pub fn has_text(&self) -> bool {
        self.0.kind == BoxKind::Inline && self.0.text.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.name.is_none() || self.0.render_hint == RenderHint::Anonymous
    }

    /// Same allocation, not merely equal content.
    pub fn same_node(&self, other: &BoxNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Pre-order list of every path key in the subtree.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_keys(&mut keys);
        keys
    }

    fn collect_keys(&self, keys: &mut Vec<String>) {
        keys.push(self.0.path_key.clone());
        for child in self.children() {
            child.collect_keys(keys);
        }
    }

    /// Finds this node or a descendant by path key. Trailing slashes are ignored.
    pub fn select(&self, key: &str) -> Option<&BoxNode> {
        let key = key.trim_end_matches('/');
        if self.path_key() == key {
            return Some(self);
        }
        self.children()
            .iter()
            .filter(|child| is_key_prefix(child.path_key(), key))
            .find_map(|child| child.select(key))
    }

    /// Returns a new tree where `node` is the first child of the box at `key`.
    pub fn insert_before_first_child(&self, key: &str, node: BoxNode) -> Result<BoxNode, TreeError> {
        let key = key.trim_end_matches('/');
        if self.path_key() == key {
            let mut children = Vec::with_capacity(self.children().len() + 1);
            children.push(node);
            children.extend(self.children().iter().cloned());
            return self.with_children(children);
        }
        let (index, child) = self
            .children()
            .iter()
            .enumerate()
            .find(|(_, child)| is_key_prefix(child.path_key(), key))
            .ok_or_else(|| TreeError::NoSuchElement(format!("{key} was not found in the box tree")))?;
        let updated = child.insert_before_first_child(key, node)?;
        let mut children = self.children().to_vec();
        children[index] = updated;
        self.with_children(children)
    }

    fn from_record(record: BoxRecord, parent_key: &str, index: usize) -> Result<BoxNode, TreeError> {
        child_kinds_are_valid(
            record.kind,
            record.children.iter().map(|c| (c.kind, c.name.is_none())),
        )?;
        let segment = key_segment(record.kind, record.name.as_ref(), record.text.as_deref());
        let path_key = format!("{parent_key}/{segment}[{index}]");
        let children = record
            .children
            .into_iter()
            .enumerate()
            .map(|(i, child)| BoxNode::from_record(child, &path_key, i))
            .collect::<Result<Vec<_>, _>>()?;
        let leaf_block = match record.kind {
            BoxKind::Inline => true,
            BoxKind::Block => children.first().is_none_or(|c| c.kind() == BoxKind::Inline),
        };
        Ok(BoxNode(Rc::new(BoxData {
            kind: record.kind,
            name: record.name,
            attributes: record.attributes,
            text: record.text,
            replaced: record.is_replaced,
            children,
            style: record.style.unwrap_or_default(),
            render_hint: record.render_hint,
            parent_key: parent_key.to_string(),
            index,
            path_key,
            leaf_block,
        })))
    }
}

impl PartialEq for BoxNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for BoxNode {}

impl fmt::Debug for BoxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("BoxNode");
        s.field("key", &self.0.path_key).field("kind", &self.0.kind);
        if let Some(text) = &self.0.text {
            s.field("text", text);
        }
        if !self.0.render_hint.is_default() {
            s.field("render_hint", &self.0.render_hint);
        }
        if !self.0.children.is_empty() {
            s.field("children", &self.0.children);
        }
        s.finish()
    }
}

/// See [`BoxNode::children_iter`].
pub struct Children {
    parent: BoxNode,
    next: usize,
}

impl Iterator for Children {
    type Item = BoxNode;

    fn next(&mut self) -> Option<BoxNode> {
        let child = self.parent.children().get(self.next)?.clone();
        self.next += 1;
        Some(child)
    }
}

pub struct BoxBuilder {
    parts: Parts,
}

impl BoxBuilder {
    pub fn name(mut self, name: QualifiedName) -> Self {
        self.parts.name = Some(name);
        self
    }

    pub fn attribute(mut self, name: QualifiedName, value: impl Into<String>) -> Self {
        self.parts.attributes.push(Attribute::new(name, value));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.parts.text = Some(text.into());
        self
    }

    pub fn replaced(mut self, replaced: bool) -> Self {
        self.parts.replaced = replaced;
        self
    }

    pub fn style(mut self, style: StyleFlags) -> Self {
        self.parts.style = style;
        self
    }

    pub fn render_hint(mut self, hint: RenderHint) -> Self {
        self.parts.render_hint = hint;
        self
    }

    pub fn child(mut self, child: BoxNode) -> Self {
        self.parts.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = BoxNode>) -> Self {
        self.parts.children.extend(children);
        self
    }

    /// Validates the children and keys the result as a root.
    pub fn build(self) -> Result<BoxNode, TreeError> {
        validate_children(self.parts.kind, &self.parts.children)?;
        Ok(assemble(self.parts, "", 0))
    }
}

/// JSON shape of a node, shared by loader and writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BoxRecord {
    kind: BoxKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<QualifiedName>,
    #[serde(default)]
    attributes: Vec<Attribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default)]
    is_replaced: bool,
    #[serde(default)]
    children: Vec<BoxRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    style: Option<StyleFlags>,
    #[serde(default, skip_serializing_if = "RenderHint::is_default")]
    render_hint: RenderHint,
}

impl From<&BoxNode> for BoxRecord {
    fn from(node: &BoxNode) -> Self {
        BoxRecord {
            kind: node.kind(),
            name: node.name().cloned(),
            attributes: node.attributes().to_vec(),
            text: node.text().map(str::to_string),
            is_replaced: node.is_replaced(),
            children: node.children().iter().map(BoxRecord::from).collect(),
            style: (!node.style().is_empty()).then(|| node.style().clone()),
            render_hint: node.render_hint(),
        }
    }
}

impl Serialize for BoxNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BoxRecord::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BoxNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = BoxRecord::deserialize(deserializer)?;
        BoxNode::from_record(record, "", 0).map_err(D::Error::custom)
    }
}
