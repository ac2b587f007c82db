//! Reviewer dispositions and collision handling modes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The reviewer's chosen outcome for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    /// Leave the item where it is.
    NoAction,
    /// Move the item (and co-located artifacts) into the named bucket.
    Bucket(String),
}

impl Disposition {
    /// Parse a disposition label. The reserved label maps to `NoAction`.
    pub fn from_label(label: &str) -> Self {
        if label == crate::review::NO_ACTION_LABEL {
            Self::NoAction
        } else {
            Self::Bucket(label.to_string())
        }
    }
}

/// One reviewer decision, consumed once by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispositionChoice {
    /// Source path of the item being dispatched.
    pub source: PathBuf,
    /// Chosen outcome.
    pub disposition: Disposition,
}

/// How to handle a same-named file at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionMode {
    /// Synthesize a non-colliding `-<n>` suffixed name (default).
    #[default]
    Preserve,
    /// Delete the existing file first, then move.
    Replace,
}

impl FromStr for CollisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preserve" => Ok(Self::Preserve),
            "replace" => Ok(Self::Replace),
            other => Err(format!(
                "unknown collision mode '{}' (expected 'preserve' or 'replace')",
                other
            )),
        }
    }
}

impl fmt::Display for CollisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preserve => write!(f, "preserve"),
            Self::Replace => write!(f, "replace"),
        }
    }
}
