//! Fragment resolution and the rewrite catalog.
//!
//! A [`Transformer`] holds the current document and the fragment the next
//! rewrite targets. Every rewrite starts from a fresh walker over the current
//! root, resolves the fragment, and on success replaces the root with the
//! walker's result. A failed rewrite leaves the document as it was.

mod catalog;

use log::debug;

use crate::editing::{Rewrite, TreeWalker};
use crate::error::{TransformError, ensure};
use crate::models::{BoxNode, Fragment, QualifiedName};

#[derive(Debug)]
pub struct Transformer {
    root: BoxNode,
    fragment: Fragment,
}

impl Transformer {
    /// Transformer over `root`, targeting the first leaf block.
    pub fn new(root: BoxNode) -> Self {
        Self {
            root,
            fragment: Fragment::block(0),
        }
    }

    /// Sets the fragment the following rewrites apply to.
    pub fn move_to(&mut self, fragment: Fragment) -> &mut Self {
        self.fragment = fragment;
        self
    }

    pub fn fragment(&self) -> Fragment {
        self.fragment
    }

    /// The document as of the last successful rewrite.
    pub fn get(&self) -> &BoxNode {
        &self.root
    }

    pub fn into_root(self) -> BoxNode {
        self.root
    }

    /// Runs one rewrite on the current fragment.
    pub fn apply(&mut self, rewrite: &Rewrite) -> Result<&mut Self, TransformError> {
        debug!("applying {rewrite} at {}", self.fragment);
        let fragment = self.fragment;
        let size = fragment.size();
        let mut walker = TreeWalker::new(self.root.clone());
        locate(&mut walker, &fragment)?;

        match rewrite {
            Rewrite::TransformTable { single_row } => {
                catalog::transform_table(&mut walker, size, *single_row)?
            }
            Rewrite::MarkupHeading { element } => {
                catalog::markup_heading(&mut walker, size, element)?
            }
            Rewrite::MarkupHeadingInHeader {
                index,
                heading,
                header,
            } => catalog::markup_heading_in_header(&mut walker, &fragment, *index, heading, header)?,
            Rewrite::RemoveImage => catalog::remove_image(&mut walker, size)?,
            Rewrite::ConvertToList { ordered } => catalog::convert_to_list(&mut walker, size, *ordered)?,
            Rewrite::ConvertToPoem => catalog::convert_to_poem(&mut walker, size)?,
            Rewrite::TransformNavList => catalog::transform_nav_list(&mut walker, size)?,
            Rewrite::WrapList {
                pre_content,
                wrapper,
            } => catalog::wrap_list(&mut walker, size, *pre_content, wrapper)?,
            Rewrite::WrapListInPrevious => catalog::wrap_list_in_previous(&mut walker, size)?,
            Rewrite::WrapInFigure {
                caption_blocks,
                caption_before,
            } => catalog::wrap_in_figure(&mut walker, &fragment, *caption_blocks, *caption_before)?,
            Rewrite::RemoveHiddenBox => catalog::remove_hidden_box(&mut walker, size)?,
            Rewrite::MarkupPageBreak => catalog::markup_page_break(&mut walker, size)?,
        }

        self.root = walker.root();
        Ok(self)
    }

    pub fn transform_table(&mut self, single_row: bool) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::TransformTable { single_row })
    }

    pub fn markup_heading(&mut self, element: QualifiedName) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::MarkupHeading { element })
    }

    pub fn markup_heading_in_header(
        &mut self,
        index: usize,
        heading: QualifiedName,
        header: QualifiedName,
    ) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::MarkupHeadingInHeader {
            index,
            heading,
            header,
        })
    }

    pub fn remove_image(&mut self) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::RemoveImage)
    }

    pub fn convert_to_list(&mut self, ordered: bool) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::ConvertToList { ordered })
    }

    pub fn convert_to_poem(&mut self) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::ConvertToPoem)
    }

    pub fn transform_nav_list(&mut self) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::TransformNavList)
    }

    pub fn wrap_list(
        &mut self,
        pre_content: usize,
        wrapper: QualifiedName,
    ) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::WrapList {
            pre_content,
            wrapper,
        })
    }

    pub fn wrap_list_in_previous(&mut self) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::WrapListInPrevious)
    }

    pub fn wrap_in_figure(
        &mut self,
        caption_blocks: usize,
        caption_before: bool,
    ) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::WrapInFigure {
            caption_blocks,
            caption_before,
        })
    }

    pub fn remove_hidden_box(&mut self) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::RemoveHiddenBox)
    }

    pub fn markup_page_break(&mut self) -> Result<&mut Self, TransformError> {
        self.apply(&Rewrite::MarkupPageBreak)
    }

    /// Keys of the leaf blocks (or inline units, for inline fragments) that
    /// `fragment` covers in `root`.
    pub fn fragment_keys(root: &BoxNode, fragment: &Fragment) -> Result<Vec<String>, TransformError> {
        let mut walker = TreeWalker::new(root.clone());
        locate(&mut walker, fragment)?;
        let step: fn(&BoxNode) -> bool = if fragment.inline_index().is_some() {
            is_inline_unit
        } else {
            BoxNode::is_leaf_block
        };
        let mut keys = vec![walker.current().path_key().to_string()];
        for _ in 1..fragment.size() {
            ensure(walker.first_following(step).is_some(), || {
                format!("{fragment} runs past the end of the document")
            })?;
            keys.push(walker.current().path_key().to_string());
        }
        Ok(keys)
    }
}

/// Text-bearing or replaced box.
fn is_inline_unit(node: &BoxNode) -> bool {
    node.has_text() || node.is_replaced()
}

/// Positions `walker` on the first leaf block of `fragment`, or on its first
/// inline unit if the fragment has an inline index.
pub fn locate(walker: &mut TreeWalker<'_>, fragment: &Fragment) -> Result<(), TransformError> {
    walker.root();
    let block = fragment.block_index();
    if walker.current().is_leaf_block() {
        ensure(block == 0, || format!("document has a single block, not {}", block + 1))?;
    } else {
        advance_leaf_blocks(walker, block + 1)?;
    }
    if let Some(inline) = fragment.inline_index() {
        let units = count(walker, is_inline_unit);
        ensure(inline < units, || format!("block {block} has {units} inline units, not {}", inline + 1))?;
        if !is_inline_unit(walker.current()) {
            ensure(walker.first_descendant(is_inline_unit).is_some(), || {
                format!("block {block} has no inline units")
            })?;
        }
        for _ in 0..inline {
            ensure(walker.first_following(is_inline_unit).is_some(), || {
                format!("inline unit {inline} not found")
            })?;
        }
    }
    Ok(())
}

/// Moves `n` leaf blocks forward in document order. Nothing inside a leaf
/// block is visited.
fn advance_leaf_blocks(walker: &mut TreeWalker<'_>, n: usize) -> Result<(), TransformError> {
    let mut remaining = n;
    if remaining > 0
        && !walker.current().is_leaf_block()
        && walker.first_descendant(BoxNode::is_leaf_block).is_some()
    {
        remaining -= 1;
    }
    while remaining > 0 {
        ensure(walker.first_following(BoxNode::is_leaf_block).is_some(), || {
            format!("{remaining} more block(s) needed past the end of the document")
        })?;
        remaining -= 1;
    }
    Ok(())
}

/// Re-resolves the start of a block fragment after the tree changed shape.
fn relocate_block(walker: &mut TreeWalker<'_>, fragment: &Fragment) -> Result<(), TransformError> {
    let start = Fragment::block(fragment.block_index());
    locate(walker, &start)
}

/// Nodes of the current subtree, the current node included, accepted by `pred`.
fn count(walker: &mut TreeWalker<'_>, pred: impl Fn(&BoxNode) -> bool) -> usize {
    let mut subtree = walker.sub_cursor();
    let mut n = usize::from(pred(subtree.current()));
    while subtree.first_descendant(&pred).is_some() || subtree.first_following(&pred).is_some() {
        n += 1;
    }
    n
}

/// Leaves the walker on a box covering exactly `block_count` leaf blocks,
/// starting at the current leaf block. Reuses the largest enclosing box that
/// starts there and fits, otherwise wraps enough following siblings in a new
/// anonymous box.
fn wrap_if_needed(walker: &mut TreeWalker<'_>, block_count: usize) -> Result<(), TransformError> {
    ensure(walker.current().is_leaf_block(), || "current box is not a leaf block".into())?;
    ensure(block_count > 0, || "nothing to wrap".into())?;

    let mut covered = walker.current().leaf_block_count();
    while !walker.has_previous_sibling() {
        let Some(parent) = walker.parent() else {
            break;
        };
        let k = parent.leaf_block_count();
        if k <= block_count {
            covered = k;
        } else {
            walker.first_child();
            break;
        }
    }
    if covered == block_count {
        return Ok(());
    }

    let mut remaining = block_count - covered;
    let mut boxes = 1;
    while remaining > 0 {
        ensure(walker.next_sibling().is_some(), || {
            format!("{remaining} more block(s) needed after the last sibling")
        })?;
        let k = walker.current().leaf_block_count();
        ensure(k <= remaining, || {
            format!("fragment ends inside {}", walker.current().path_key())
        })?;
        remaining -= k;
        boxes += 1;
    }
    for _ in 1..boxes {
        walker.previous_sibling();
    }

    let wrapped = if walker.has_previous_sibling() {
        walker.previous_sibling();
        walker.wrap_next_siblings(boxes, None, None)
    } else {
        walker.parent();
        walker.wrap_first_children(boxes, None, None)
    };
    wrapped.map_err(|err| TransformError::can_not_perform(format!("can not wrap fragment: {err}")))?;
    walker.parent();
    Ok(())
}

/// Unwraps every `element` box in the current subtree, but only if every
/// non-blank text in the subtree is inside one of them.
fn strip_total_emphasis(
    walker: &mut TreeWalker<'_>,
    element: &QualifiedName,
) -> Result<(), TransformError> {
    let covered = {
        let mut subtree = walker.sub_cursor();
        loop {
            let current = subtree.current().clone();
            if !current.is_named(element) {
                if current.has_text() && !current.text().unwrap_or_default().trim().is_empty() {
                    break false;
                }
                if subtree.first_child().is_some() {
                    continue;
                }
            }
            if subtree.first_following_any().is_none() {
                break true;
            }
        }
    };
    if covered {
        unwrap_all(walker, |b| b.is_named(element))?;
    }
    Ok(())
}

/// Unwraps every box below the current one accepted by `select`.
fn unwrap_all(
    walker: &mut TreeWalker<'_>,
    select: impl Fn(&BoxNode) -> bool,
) -> Result<(), TransformError> {
    let mut subtree = walker.sub_cursor();
    loop {
        if subtree.depth() > 0 && select(subtree.current()) {
            if subtree.first_child().is_some() {
                subtree.unwrap_parent()?;
            } else if subtree.previous_sibling().is_some() {
                subtree.unwrap_next_sibling()?;
                if subtree.first_following_any().is_none() {
                    break;
                }
            } else if subtree.parent().is_some() {
                subtree.unwrap_first_child()?;
            } else {
                break;
            }
        } else if subtree.first_child().is_none() && subtree.first_following_any().is_none() {
            break;
        }
    }
    Ok(())
}
