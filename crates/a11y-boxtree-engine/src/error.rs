//! Error types shared by the box model, the walker and the rewrite catalog.

use thiserror::Error;

/// Failures of the box model and of walker navigation/edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A child list breaks the BLOCK/INLINE composition rules.
    #[error("structural invariant violated: {0}")]
    StructuralInvariantViolation(String),

    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    /// A neighbor, child or parent required by an explicit request is absent.
    #[error("no such element: {0}")]
    NoSuchElement(String),

    /// A sub-cursor tried to publish an edit but its owner moved on.
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),
}

/// Failures of a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// A rewrite precondition failed; the document is left as it was.
    #[error("can not perform transformation{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    CanNotPerformTransformation { message: Option<String> },

    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl TransformError {
    pub fn can_not_perform(message: impl Into<String>) -> Self {
        TransformError::CanNotPerformTransformation {
            message: Some(message.into()),
        }
    }

    /// True for the "not applicable here" kind that remediation stacks tolerate.
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, TransformError::CanNotPerformTransformation { .. })
    }
}

/// Fails the current rewrite with `CanNotPerformTransformation` unless `condition` holds.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), TransformError> {
    if condition {
        Ok(())
    } else {
        Err(TransformError::can_not_perform(message()))
    }
}
