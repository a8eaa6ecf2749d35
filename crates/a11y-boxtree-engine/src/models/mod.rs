pub mod boxes;
pub mod fragment;
pub mod qname;

pub use boxes::{Attribute, BoxBuilder, BoxEdit, BoxKind, BoxNode, Children, RenderHint, StyleFlags};
pub use fragment::{Fragment, InvalidFragment};
pub use qname::{QualifiedName, html};
