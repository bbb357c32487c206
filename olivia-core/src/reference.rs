// File: olivia-core/src/reference.rs
//
// Static branch / proximity / member-profile data, loaded once at startup.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use olivia_common::error::Error;
use olivia_common::models::{Branch, MemberProfile, Neighbor};

pub const FACILITIES_FILE: &str = "facilities.json";
pub const PROXIMITY_FILE: &str = "branch_proximity.json";
pub const MEMBER_PROFILES_FILE: &str = "member_profiles.json";

#[derive(Debug, Deserialize)]
struct FacilitiesFile {
    branches: Vec<Branch>,
}

/// Immutable snapshot shared by reference.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    branches: Vec<Branch>,
    by_id: HashMap<String, usize>,
    profiles: HashMap<String, MemberProfile>,
}

impl ReferenceData {
    /// Proximity entries given here override whatever the branches already carry.
    pub fn new(
        branches: Vec<Branch>,
        proximity: HashMap<String, Vec<Neighbor>>,
        profiles: HashMap<String, MemberProfile>,
    ) -> Self {
        let mut branches = branches;
        for branch in branches.iter_mut() {
            if let Some(list) = proximity.get(&branch.id) {
                branch.proximity = list.clone();
            }
            // nearest first; the sort is stable so equal drive times keep file order
            branch.proximity.sort_by_key(|n| n.drive_minutes);
        }
        let by_id = branches
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();
        Self { branches, by_id, profiles }
    }

    /// Reads the reference files from `dir`. `facilities.json` is required;
    /// proximity and member profiles are optional and tolerate bad entries.
    pub fn load(dir: &Path) -> Result<Self, Error> {
        let facilities_path = dir.join(FACILITIES_FILE);
        let raw = std::fs::read_to_string(&facilities_path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", facilities_path.display(), e))
        })?;
        let facilities: FacilitiesFile = serde_json::from_str(&raw)?;

        let proximity = match read_optional_json(&dir.join(PROXIMITY_FILE)) {
            Some(value) => parse_proximity(&value),
            None => HashMap::new(),
        };

        let profiles = match read_optional_json(&dir.join(MEMBER_PROFILES_FILE)) {
            Some(value) => parse_profiles(&value),
            None => HashMap::new(),
        };

        let data = Self::new(facilities.branches, proximity, profiles);
        info!(
            "Loaded reference data: {} branches, {} member profiles",
            data.branches.len(),
            data.profiles.len()
        );
        Ok(data)
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.by_id.get(id).map(|&i| &self.branches[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Display name, falling back to the id for unknown branches.
    pub fn branch_name(&self, id: &str) -> String {
        self.branch(id)
            .map(|b| b.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Nearest-first neighbors. Unknown branches have none.
    pub fn neighbors(&self, id: &str) -> &[Neighbor] {
        self.branch(id).map(|b| b.proximity.as_slice()).unwrap_or(&[])
    }

    pub fn profile(&self, member_id: &str) -> Option<&MemberProfile> {
        self.profiles.get(member_id)
    }

    pub fn home_branch(&self, member_id: &str) -> Option<&str> {
        self.profile(member_id)
            .and_then(|p| p.home_branch_id.as_deref())
    }
}

fn read_optional_json(path: &Path) -> Option<Value> {
    if !path.exists() {
        return None;
    }
    let parsed = std::fs::read_to_string(path)
        .map_err(Error::from)
        .and_then(|raw| serde_json::from_str::<Value>(&raw).map_err(Error::from));
    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable {}: {}", path.display(), e);
            None
        }
    }
}

/// `{ "<branch_id>": [ {"branch_id": "...", "minutes": 12}, ... ] }`.
/// `drive_minutes` is accepted as well. Malformed entries are skipped.
pub fn parse_proximity(value: &Value) -> HashMap<String, Vec<Neighbor>> {
    let mut out = HashMap::new();
    let Some(map) = value.as_object() else {
        warn!("Proximity data is not an object; nearby search disabled");
        return out;
    };

    for (branch_id, entries) in map {
        let Some(entries) = entries.as_array() else {
            warn!("Proximity list for {} is not an array; skipping", branch_id);
            continue;
        };
        let neighbors: Vec<Neighbor> = entries
            .iter()
            .filter_map(|entry| {
                let neighbor_id = entry.get("branch_id")?.as_str()?.trim();
                let minutes = entry
                    .get("drive_minutes")
                    .or_else(|| entry.get("minutes"))?
                    .as_u64()?;
                if neighbor_id.is_empty() || neighbor_id == branch_id {
                    return None;
                }
                Some(Neighbor {
                    branch_id: neighbor_id.to_string(),
                    drive_minutes: u32::try_from(minutes).ok()?,
                })
            })
            .collect();
        if neighbors.len() < entries.len() {
            warn!(
                "Skipped {} malformed proximity entries for {}",
                entries.len() - neighbors.len(),
                branch_id
            );
        }
        out.insert(branch_id.clone(), neighbors);
    }
    out
}

fn parse_profiles(value: &Value) -> HashMap<String, MemberProfile> {
    let Some(map) = value.as_object() else {
        warn!("Member profiles are not an object; ignoring");
        return HashMap::new();
    };
    map.iter()
        .filter_map(|(member_id, profile)| {
            serde_json::from_value::<MemberProfile>(profile.clone())
                .ok()
                .map(|p| (member_id.clone(), p))
        })
        .collect()
}
