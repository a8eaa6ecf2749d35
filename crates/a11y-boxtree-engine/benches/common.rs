// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use a11y_boxtree_engine::{BoxNode, html};

#[allow(dead_code)]
pub fn paragraph(content: &str) -> BoxNode {
    BoxNode::block()
        .name(html::p())
        .child(BoxNode::inline().text(content).build().unwrap())
        .build()
        .unwrap()
}

/// A body of `sections` divs, each holding a title and `paragraphs` paragraphs.
#[allow(dead_code)]
pub fn generate_document(sections: usize, paragraphs: usize) -> BoxNode {
    let sections = (0..sections).map(|s| {
        let mut children = vec![paragraph(&format!("Section {s}"))];
        children.extend(
            (0..paragraphs).map(|p| paragraph(&format!("Paragraph {p} of section {s}."))),
        );
        BoxNode::block()
            .name(html::div())
            .children(children)
            .build()
            .unwrap()
    });
    BoxNode::block()
        .name(html::by_constant("section").unwrap())
        .children(sections)
        .build()
        .unwrap()
}
