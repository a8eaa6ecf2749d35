//! Recorded rewrite chains and their ordered application.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::editing::{Rewrite, Transformer};
use crate::error::TransformError;
use crate::models::{BoxNode, Fragment};

fn default_active() -> bool {
    true
}

/// One rewrite of a remediation, switchable on and off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(alias = "function_call")]
    pub invocation: Rewrite,
    #[serde(default = "default_active", alias = "is_activated")]
    pub active: bool,
}

impl Action {
    pub fn new(invocation: Rewrite) -> Self {
        Self {
            invocation,
            active: true,
        }
    }
}

/// Rewrites to run, in order, on one fragment of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remediation {
    pub range: Fragment,
    pub actions: Vec<Action>,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl Remediation {
    pub fn new(range: Fragment, actions: impl IntoIterator<Item = Rewrite>) -> Self {
        Self {
            range,
            actions: actions.into_iter().map(Action::new).collect(),
            active: true,
        }
    }

    pub fn with_active(&self, active: bool) -> Self {
        Self {
            active,
            ..self.clone()
        }
    }

    /// Copy with action `index` switched; out-of-range indices change nothing.
    pub fn with_action_active(&self, index: usize, active: bool) -> Self {
        let mut copy = self.clone();
        if let Some(action) = copy.actions.get_mut(index) {
            action.active = active;
        }
        copy
    }

    /// Runs the active actions on `document`. Either all of them succeed or
    /// the error of the first failing one is returned.
    pub fn apply_on(&self, document: &BoxNode) -> Result<BoxNode, TransformError> {
        debug!("remediating {} with {} action(s)", self.range, self.actions.len());
        let mut transformer = Transformer::new(document.clone());
        transformer.move_to(self.range);
        for action in self.actions.iter().filter(|a| a.active) {
            transformer.apply(&action.invocation)?;
        }
        Ok(transformer.into_root())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Applied,
    Inactive,
    /// A precondition failed; the entry was skipped.
    NotApplicable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    pub index: usize,
    pub status: EntryStatus,
}

#[derive(Debug)]
pub struct Outcome {
    pub document: BoxNode,
    pub reports: Vec<EntryReport>,
}

impl Outcome {
    pub fn not_applicable(&self) -> impl Iterator<Item = &EntryReport> {
        self.reports
            .iter()
            .filter(|r| matches!(r.status, EntryStatus::NotApplicable(_)))
    }
}

/// Ordered remediations applied one after the other, each on the result of
/// the previous successful one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemediationStack {
    entries: Vec<Remediation>,
}

impl RemediationStack {
    pub fn new(entries: Vec<Remediation>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[Remediation] {
        &self.entries
    }

    pub fn push(&mut self, remediation: Remediation) {
        self.entries.push(remediation);
    }

    /// Drops the most recent remediation.
    pub fn pop(&mut self) -> Option<Remediation> {
        self.entries.pop()
    }

    /// Switches entry `index`; returns false if there is no such entry.
    pub fn set_active(&mut self, index: usize, active: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                *entry = entry.with_active(active);
                true
            }
            None => false,
        }
    }

    /// Inapplicable entries are reported and skipped; any other error aborts.
    pub fn apply(&self, document: &BoxNode) -> Result<Outcome, TransformError> {
        let mut current = document.clone();
        let mut reports = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.entries.iter().enumerate() {
            let status = if !entry.active {
                EntryStatus::Inactive
            } else {
                match entry.apply_on(&current) {
                    Ok(next) => {
                        current = next;
                        EntryStatus::Applied
                    }
                    Err(err) if err.is_not_applicable() => {
                        warn!("remediation {index} at {} not applicable: {err}", entry.range);
                        EntryStatus::NotApplicable(err.to_string())
                    }
                    Err(err) => return Err(err),
                }
            };
            debug!("remediation {index}: {status:?}");
            reports.push(EntryReport { index, status });
        }
        Ok(Outcome {
            document: current,
            reports,
        })
    }
}
