use std::fs;
use std::path::{Path, PathBuf};

use crate::editing::RemediationStack;
use crate::models::BoxNode;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn read(path: &Path) -> Result<String, IoError> {
    fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a box tree from its JSON form; structural invariants are checked.
pub fn parse_tree(json: &str) -> Result<BoxNode, IoError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_tree(path: &Path) -> Result<BoxNode, IoError> {
    let tree = parse_tree(&read(path)?)?;
    log::debug!("loaded {} boxes from {}", tree.keys().len(), path.display());
    Ok(tree)
}

pub fn tree_to_string(tree: &BoxNode, pretty: bool) -> Result<String, IoError> {
    let json = if pretty {
        serde_json::to_string_pretty(tree)?
    } else {
        serde_json::to_string(tree)?
    };
    Ok(json)
}

/// Write a box tree as JSON, creating parent directories as needed.
pub fn save_tree(path: &Path, tree: &BoxNode, pretty: bool) -> Result<(), IoError> {
    let json = tree_to_string(tree, pretty)?;
    let write_error = |source| IoError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, json).map_err(write_error)
}

/// Parse a plan: a JSON array of remediations.
pub fn parse_plan(json: &str) -> Result<RemediationStack, IoError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_plan(path: &Path) -> Result<RemediationStack, IoError> {
    let plan = parse_plan(&read(path)?)?;
    log::debug!("loaded {} remediation(s) from {}", plan.entries().len(), path.display());
    Ok(plan)
}
