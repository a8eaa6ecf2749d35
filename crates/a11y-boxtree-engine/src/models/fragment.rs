use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reference to a stretch of a document by leaf-block position.
///
/// `block` is the 0-based ordinal of the first leaf block in pre-order,
/// `inline` (if set) the 0-based ordinal of a text-bearing or replaced box
/// inside that block, and `size` the number of leaf blocks covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "FragmentRecord")]
pub struct Fragment {
    block: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline: Option<usize>,
    size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid fragment: {0}")]
pub struct InvalidFragment(String);

#[derive(Deserialize)]
struct FragmentRecord {
    block: usize,
    #[serde(default)]
    inline: Option<usize>,
    #[serde(default = "default_size")]
    size: usize,
}

fn default_size() -> usize {
    1
}

impl TryFrom<FragmentRecord> for Fragment {
    type Error = InvalidFragment;

    fn try_from(record: FragmentRecord) -> Result<Self, Self::Error> {
        Fragment::new(record.block, record.inline, record.size)
    }
}

impl Fragment {
    pub fn new(block: usize, inline: Option<usize>, size: usize) -> Result<Self, InvalidFragment> {
        if size < 1 {
            return Err(InvalidFragment(format!("size must be at least 1, got {size}")));
        }
        Ok(Self {
            block,
            inline,
            size,
        })
    }

    /// Single leaf block.
    pub fn block(block: usize) -> Self {
        Self {
            block,
            inline: None,
            size: 1,
        }
    }

    pub fn block_index(&self) -> usize {
        self.block
    }

    pub fn inline_index(&self) -> Option<usize> {
        self.inline
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// `b{block}[-i{inline}]-s{size}`, used on the command line and in reports.
impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.block)?;
        if let Some(inline) = self.inline {
            write!(f, "-i{inline}")?;
        }
        write!(f, "-s{}", self.size)
    }
}

impl FromStr for Fragment {
    type Err = InvalidFragment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidFragment(format!("expected b<block>[-i<inline>]-s<size>, got {s:?}"));
        let mut block = None;
        let mut inline = None;
        let mut size = None;
        for part in s.trim().split('-') {
            let (slot, digits) = match part.split_at_checked(1) {
                Some(("b", digits)) => (&mut block, digits),
                Some(("i", digits)) => (&mut inline, digits),
                Some(("s", digits)) => (&mut size, digits),
                _ => return Err(invalid()),
            };
            if slot.is_some() {
                return Err(invalid());
            }
            *slot = Some(digits.parse::<usize>().map_err(|_| invalid())?);
        }
        match (block, size) {
            (Some(block), Some(size)) => Fragment::new(block, inline, size),
            _ => Err(invalid()),
        }
    }
}
