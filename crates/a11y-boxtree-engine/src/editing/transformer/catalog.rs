//! Rewrites. Each starts with the walker on the fragment's first leaf block
//! (or inline unit) and checks its preconditions before editing.

use super::{
    advance_leaf_blocks, relocate_block, strip_total_emphasis, unwrap_all, wrap_if_needed,
};
use crate::editing::TreeWalker;
use crate::error::{TransformError, ensure};
use crate::models::{Attribute, BoxNode, Fragment, QualifiedName, html};

fn ensure_leaf_block(walker: &TreeWalker<'_>) -> Result<(), TransformError> {
    ensure(walker.current().is_leaf_block(), || {
        format!("{} is not a leaf block", walker.current().path_key())
    })
}

fn ensure_single_block(size: usize) -> Result<(), TransformError> {
    ensure(size == 1, || format!("fragment must cover one block, not {size}"))
}

fn display_is(walker: &TreeWalker<'_>, display: &str) -> bool {
    walker.current().style().display_is(display)
}

fn rename_to_div(walker: &mut TreeWalker<'_>) -> Result<(), TransformError> {
    walker.rename_current(html::div(), None)?;
    Ok(())
}

fn is_link(node: &BoxNode) -> bool {
    node.is_named(&html::a()) && node.attribute(&html::href()).is_some()
}

fn is_div_or_p(node: &BoxNode) -> bool {
    node.is_named(&html::div()) || node.is_named(&html::p())
}

fn is_heading_box(node: &BoxNode) -> bool {
    node.name().is_some_and(html::is_heading)
}

/// `blocks` leaf blocks laid out as a table become nested `div`s in place of the table.
pub(super) fn transform_table(
    walker: &mut TreeWalker<'_>,
    blocks: usize,
    single_row: bool,
) -> Result<(), TransformError> {
    ensure_leaf_block(walker)?;
    // climb to the first cell
    loop {
        ensure(!walker.has_previous_sibling(), || {
            "fragment does not start at the first cell".into()
        })?;
        if display_is(walker, "table-cell") {
            break;
        }
        ensure(!display_is(walker, "block"), || {
            format!("{} is a block outside any cell", walker.current().path_key())
        })?;
        ensure(walker.parent().is_some(), || "no enclosing table cell".into())?;
    }
    rename_to_div(walker)?;
    while walker.next_sibling().is_some() {
        ensure(display_is(walker, "table-cell"), || "row holds a non-cell box".into())?;
        rename_to_div(walker)?;
    }

    ensure(walker.parent().is_some(), || "cell outside a row".into())?;
    ensure(display_is(walker, "table-row"), || "cell outside a row".into())?;
    rename_to_div(walker)?;
    ensure(!walker.has_previous_sibling(), || "fragment does not start at the first row".into())?;
    if single_row {
        ensure(!walker.has_next_sibling(), || "table has more than one row".into())?;
    } else {
        while walker.next_sibling().is_some() {
            ensure(display_is(walker, "table-row"), || "table holds a non-row box".into())?;
            rename_to_div(walker)?;
            ensure(walker.first_child().is_some(), || "empty table row".into())?;
            loop {
                ensure(display_is(walker, "table-cell"), || "row holds a non-cell box".into())?;
                rename_to_div(walker)?;
                if walker.next_sibling().is_none() {
                    break;
                }
            }
            walker.parent();
        }
    }

    ensure(walker.parent().is_some(), || "row outside a table".into())?;
    if display_is(walker, "table-row-group") {
        ensure(!walker.has_previous_sibling() && !walker.has_next_sibling(), || {
            "table has more than one row group".into()
        })?;
        rename_to_div(walker)?;
        ensure(walker.parent().is_some(), || "row group outside a table".into())?;
    }
    ensure(display_is(walker, "table"), || "rows are not inside a table".into())?;
    let cells = walker.current().leaf_block_count();
    ensure(cells == blocks, || {
        format!("table holds {cells} blocks, fragment covers {blocks}")
    })?;

    walker.first_child();
    walker.unwrap_parent()?;
    Ok(())
}

/// Renames the current box to `heading` and flattens its content.
fn make_heading(walker: &mut TreeWalker<'_>, heading: &QualifiedName) -> Result<(), TransformError> {
    walker.rename_current(heading.clone(), None)?;
    for emphasis in [html::strong(), html::em(), html::small()] {
        strip_total_emphasis(walker, &emphasis)?;
    }
    let is_div_p_or_span = |b: &BoxNode| is_div_or_p(b) || b.is_named(&html::span());
    let mut content = walker.sub_cursor();
    while content.first_descendant(is_div_p_or_span).is_some()
        || content.first_following(is_div_p_or_span).is_some()
    {
        if !content.current().is_named(&html::span()) {
            content.rename_current(html::span(), None)?;
        }
        content.mark_for_unwrap()?;
    }
    Ok(())
}

pub(super) fn markup_heading(
    walker: &mut TreeWalker<'_>,
    blocks: usize,
    heading: &QualifiedName,
) -> Result<(), TransformError> {
    ensure_leaf_block(walker)?;
    wrap_if_needed(walker, blocks)?;
    make_heading(walker, heading)
}

/// Wraps the fragment in `header` and makes its `index`-th block the only heading inside.
pub(super) fn markup_heading_in_header(
    walker: &mut TreeWalker<'_>,
    fragment: &Fragment,
    index: usize,
    heading: &QualifiedName,
    header: &QualifiedName,
) -> Result<(), TransformError> {
    let blocks = fragment.size();
    ensure_leaf_block(walker)?;
    ensure(blocks > 1, || "a header needs more than one block".into())?;
    ensure(index < blocks, || format!("heading {index} is outside the fragment"))?;

    wrap_if_needed(walker, blocks)?;
    walker.rename_current(header.clone(), None)?;
    {
        let mut inside = walker.sub_cursor();
        while inside.first_descendant(is_heading_box).is_some()
            || inside.first_following(is_heading_box).is_some()
        {
            inside.rename_current(html::p(), None)?;
        }
    }

    relocate_block(walker, fragment)?;
    advance_leaf_blocks(walker, index)?;
    wrap_if_needed(walker, 1)?;
    make_heading(walker, heading)
}

/// Soft-removes a decorative image and the ancestors that only hold it.
pub(super) fn remove_image(walker: &mut TreeWalker<'_>, size: usize) -> Result<(), TransformError> {
    ensure_single_block(size)?;
    ensure(walker.current().is_named(&html::img()), || {
        format!("{} is not an image", walker.current().path_key())
    })?;
    ensure(walker.current().is_replaced(), || "image is not a replaced element".into())?;
    walker.mark_for_removal()?;
    while !walker.has_previous_sibling() && !walker.has_next_sibling() && walker.parent().is_some() {
        walker.mark_for_removal()?;
    }
    Ok(())
}

fn convert_to_list_like(
    walker: &mut TreeWalker<'_>,
    blocks: usize,
    list: QualifiedName,
    list_attributes: Option<Vec<Attribute>>,
    item: &QualifiedName,
) -> Result<(), TransformError> {
    ensure_leaf_block(walker)?;
    wrap_if_needed(walker, blocks)?;
    if walker.current().is_leaf_block() {
        walker.wrap_current(Some(list), list_attributes)?;
    } else {
        walker.rename_current(list, list_attributes)?;
        walker.first_child();
    }
    loop {
        walker.rename_current(item.clone(), None)?;
        if walker.next_sibling().is_none() {
            break;
        }
    }
    Ok(())
}

pub(super) fn convert_to_list(
    walker: &mut TreeWalker<'_>,
    blocks: usize,
    ordered: bool,
) -> Result<(), TransformError> {
    let list = if ordered { html::ol() } else { html::ul() };
    convert_to_list_like(walker, blocks, list, None, &html::li())
}

pub(super) fn convert_to_poem(walker: &mut TreeWalker<'_>, blocks: usize) -> Result<(), TransformError> {
    let epub_type = vec![Attribute::new(html::epub_type(), "z3998:poem")];
    convert_to_list_like(walker, blocks, html::div(), Some(epub_type), &html::p())
}

/// Normalizes a table of contents: every item becomes a single link,
/// optionally followed by a nested list.
pub(super) fn transform_nav_list(
    walker: &mut TreeWalker<'_>,
    blocks: usize,
) -> Result<(), TransformError> {
    ensure_leaf_block(walker)?;
    loop {
        ensure(!walker.has_previous_sibling(), || "fragment does not start a list".into())?;
        let parent = walker
            .parent()
            .ok_or_else(|| TransformError::can_not_perform("no enclosing list"))?;
        let k = parent.leaf_block_count();
        ensure(k <= blocks, || "no list covers exactly the fragment".into())?;
        if k == blocks && parent.is_named(&html::ol()) {
            break;
        }
    }

    nav_list(walker)?;

    let mut toc = walker.sub_cursor();
    while toc.first_descendant(is_div_or_p).is_some() || toc.first_following(is_div_or_p).is_some() {
        toc.rename_current(html::span(), None)?;
        toc.mark_for_unwrap()?;
    }
    Ok(())
}

/// Processes the items of the `ol` under the cursor; ends on that `ol`.
fn nav_list(walker: &mut TreeWalker<'_>) -> Result<(), TransformError> {
    ensure(walker.first_child().is_some(), || "empty list".into())?;
    loop {
        nav_item(walker)?;
        if walker.next_sibling().is_none() {
            break;
        }
    }
    walker.parent();
    Ok(())
}

/// Processes the `li` under the cursor; ends on that `li`.
fn nav_item(walker: &mut TreeWalker<'_>) -> Result<(), TransformError> {
    ensure(walker.current().is_named(&html::li()), || {
        format!("{} is not a list item", walker.current().path_key())
    })?;
    ensure(walker.first_child().is_some(), || "empty list item".into())?;
    let mut children = 1;
    while walker.next_sibling().is_some() {
        children += 1;
    }
    if children == 1 && is_link(walker.current()) {
        walker.parent();
        return Ok(());
    }

    if walker.current().is_named(&html::ol()) {
        ensure(children > 1, || "nested list without a label".into())?;
        nav_list(walker)?;
        if children == 2 {
            walker.previous_sibling();
            if is_link(walker.current()) {
                walker.parent();
                return Ok(());
            }
        } else {
            walker.parent();
            walker.wrap_first_children(children - 1, Some(html::span()), None)?;
            walker.parent();
            children = 2;
        }
    } else if children > 1 {
        walker.parent();
        walker.wrap_children(Some(html::span()), None)?;
        walker.parent();
        children = 1;
    } else {
        walker.parent();
        walker.first_child();
    }

    // the cursor is on the item label
    let found = {
        let mut label = walker.sub_cursor();
        match label.first_descendant(is_link) {
            None => false,
            Some(link) => {
                let href = link.attribute(&html::href()).map(str::to_string);
                label.root();
                unwrap_all(&mut label, |b| {
                    b.is_named(&html::a()) && b.attribute(&html::href()) == href.as_deref()
                })?;
                label.rename_current(html::a(), Some(link.attributes().to_vec()))?;
                true
            }
        }
    };
    ensure(found || children == 2, || "list item has no link".into())?;
    walker.parent();
    Ok(())
}

/// Wraps a list and the `pre_content` blocks before it in `wrapper`; the
/// fragment covers both. Ends on the wrapper.
pub(super) fn wrap_list(
    walker: &mut TreeWalker<'_>,
    blocks: usize,
    pre_content: usize,
    wrapper: &QualifiedName,
) -> Result<(), TransformError> {
    ensure_leaf_block(walker)?;
    ensure(blocks > pre_content, || "fragment holds no list".into())?;
    let list_blocks = blocks - pre_content;
    advance_leaf_blocks(walker, pre_content)?;
    loop {
        ensure(!walker.has_previous_sibling(), || "list does not start the remaining blocks".into())?;
        let parent = walker
            .parent()
            .ok_or_else(|| TransformError::can_not_perform("no enclosing list"))?;
        let k = parent.leaf_block_count();
        ensure(k <= list_blocks, || "no list covers exactly the remaining blocks".into())?;
        if k == list_blocks && (parent.is_named(&html::ol()) || parent.is_named(&html::ul())) {
            break;
        }
    }

    let list_has_next = walker.has_next_sibling();
    let mut siblings = 1;
    let mut remaining = pre_content;
    while remaining > 0 {
        ensure(walker.previous_sibling().is_some(), || "not enough content before the list".into())?;
        let k = walker.current().leaf_block_count();
        ensure(k <= remaining, || "fragment starts inside a box".into())?;
        remaining -= k;
        siblings += 1;
    }

    if walker.has_previous_sibling() {
        walker.previous_sibling();
        walker.wrap_next_siblings(siblings, Some(wrapper.clone()), None)?;
        walker.parent();
    } else if list_has_next {
        walker.parent();
        walker.wrap_first_children(siblings, Some(wrapper.clone()), None)?;
        walker.parent();
    } else {
        ensure(walker.parent().is_some(), || "list has no parent".into())?;
        if !walker.current().is_named(wrapper) {
            if walker.current().is_named(&html::div()) {
                walker.rename_current(wrapper.clone(), None)?;
            } else {
                walker.wrap_children(Some(wrapper.clone()), None)?;
                walker.parent();
            }
        }
    }
    Ok(())
}

/// Moves a list into the block before it: the two get a common parent named
/// like that block, which itself becomes anonymous.
pub(super) fn wrap_list_in_previous(
    walker: &mut TreeWalker<'_>,
    blocks: usize,
) -> Result<(), TransformError> {
    wrap_list(walker, blocks, 1, &QualifiedName::local("_"))?;
    let first = walker
        .first_child()
        .ok_or_else(|| TransformError::can_not_perform("wrapper is empty"))?;
    let name = first
        .name()
        .cloned()
        .ok_or_else(|| TransformError::can_not_perform("the block before the list has no name"))?;
    walker.strip_current_name()?;
    walker.parent();
    walker.rename_current(name, None)?;
    Ok(())
}

/// Wraps the fragment in `figure`, the first or last `caption_blocks` blocks
/// in `figcaption`.
pub(super) fn wrap_in_figure(
    walker: &mut TreeWalker<'_>,
    fragment: &Fragment,
    caption_blocks: usize,
    caption_before: bool,
) -> Result<(), TransformError> {
    let blocks = fragment.size();
    ensure_leaf_block(walker)?;
    ensure(blocks > caption_blocks, || "figure has no content besides the caption".into())?;
    if caption_blocks > 0 {
        if !caption_before {
            advance_leaf_blocks(walker, blocks - caption_blocks)?;
        }
        wrap_if_needed(walker, caption_blocks)?;
        walker.rename_current(html::figcaption(), None)?;
        for emphasis in [html::strong(), html::em(), html::small()] {
            strip_total_emphasis(walker, &emphasis)?;
        }
        relocate_block(walker, fragment)?;
    }
    wrap_if_needed(walker, blocks)?;
    walker.rename_current(html::figure(), None)?;

    if caption_blocks > 0 && blocks - caption_blocks == 1 {
        let caption = html::figcaption();
        walker.first_child();
        if walker.current().is_named(&caption) {
            walker.next_sibling();
        }
        if !walker.current().is_named(&caption) && is_div_or_p(walker.current()) {
            walker.mark_for_unwrap()?;
        }
        walker.parent();
    }
    Ok(())
}

fn declares_visible(node: &BoxNode) -> bool {
    node.style()
        .visibility
        .as_deref()
        .is_some_and(|v| v != "hidden")
}

/// Soft-removes a hidden block and the ancestors that only hold it, up to
/// the first one with style values that don't hide it.
pub(super) fn remove_hidden_box(
    walker: &mut TreeWalker<'_>,
    size: usize,
) -> Result<(), TransformError> {
    ensure_leaf_block(walker)?;
    ensure_single_block(size)?;
    ensure(walker.current().style().is_hidden(), || {
        format!("{} is not hidden", walker.current().path_key())
    })?;
    {
        let mut content = walker.sub_cursor();
        while content.first_child().is_some() || content.first_following_any().is_some() {
            ensure(!declares_visible(content.current()), || {
                format!("{} is visible", content.current().path_key())
            })?;
        }
    }
    walker.mark_for_removal()?;
    while !walker.has_previous_sibling() && !walker.has_next_sibling() && walker.parent().is_some() {
        let style = walker.current().style();
        if !style.is_empty() && !style.is_hidden() {
            break;
        }
        walker.mark_for_removal()?;
    }
    Ok(())
}

pub(super) fn markup_page_break(
    walker: &mut TreeWalker<'_>,
    size: usize,
) -> Result<(), TransformError> {
    ensure_leaf_block(walker)?;
    ensure_single_block(size)?;
    let epub_type = vec![Attribute::new(html::epub_type(), "pagebreak")];
    walker.rename_current(html::div(), Some(epub_type))?;
    Ok(())
}
