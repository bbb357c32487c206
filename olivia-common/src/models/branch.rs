// File: olivia-common/src/models/branch.rs

use serde::{Deserialize, Serialize};

/// One entry of a branch's proximity list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub branch_id: String,
    pub drive_minutes: u32,
}

/// Static reference data for a facility branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Ordered nearest-first. Not guaranteed symmetric between branches.
    #[serde(default)]
    pub proximity: Vec<Neighbor>,
}

impl Branch {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            proximity: Vec::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }
}

/// Member-level defaults used when neither the UI nor the message names a branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    #[serde(default)]
    pub home_branch_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}
