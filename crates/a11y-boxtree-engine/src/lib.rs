pub mod editing;
pub mod error;
pub mod io;
pub mod models;


// Re-export key types for easier usage
pub use editing::{
    Action, EntryReport, EntryStatus, InvalidInvocation, Outcome, Remediation, RemediationStack,
    Rewrite, RootSink, SequenceCursor, Transformer, TreeWalker, locate,
};
pub use error::{TransformError, TreeError};
pub use io::*;
pub use models::*;
