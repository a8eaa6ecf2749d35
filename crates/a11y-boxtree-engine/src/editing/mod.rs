/*!
 * # Editing
 *
 * Box trees are never modified in place. Edits go through a [`TreeWalker`],
 * a zipper that rebuilds the ancestors of the current node and installs a
 * new root after every change. On top of it:
 *
 * - **`transformer`**: resolves a [`crate::models::Fragment`] and runs one
 *   entry of the rewrite catalog at a time, all-or-nothing
 * - **`rewrite`**: the closed catalog as a [`Rewrite`] enum, parsed from
 *   invocations like `markupHeading(H1)`
 * - **`remediation`**: recorded rewrite chains and the ordered stack that
 *   replays them
 * - **`sequence_cursor`**: the memoizing bidirectional cursor the walker
 *   keeps per ancestor level
 *
 * ## Usage Pattern
 *
 * ```rust
 * use a11y_boxtree_engine::{BoxNode, Fragment, Transformer, html};
 *
 * let para = |t: &str| {
 *     BoxNode::block()
 *         .name(html::p())
 *         .child(BoxNode::inline().text(t).build().unwrap())
 *         .build()
 *         .unwrap()
 * };
 * let body = BoxNode::block()
 *     .name(html::div())
 *     .children([para("Title"), para("one"), para("two")])
 *     .build()
 *     .unwrap();
 *
 * let mut transformer = Transformer::new(body);
 * transformer
 *     .markup_heading(html::heading(1).unwrap())
 *     .unwrap()
 *     .move_to(Fragment::new(1, None, 2).unwrap())
 *     .convert_to_list(false)
 *     .unwrap();
 * assert_eq!(transformer.get().children()[1].path_key(), "/div[0]/ul[1]");
 * ```
 */

pub mod remediation;
pub mod rewrite;
pub mod sequence_cursor;
pub mod transformer;
pub mod walker;

pub use remediation::{Action, EntryReport, EntryStatus, Outcome, Remediation, RemediationStack};
pub use rewrite::{InvalidInvocation, Rewrite};
pub use sequence_cursor::SequenceCursor;
pub use transformer::{Transformer, locate};
pub use walker::{RootSink, TreeWalker};
