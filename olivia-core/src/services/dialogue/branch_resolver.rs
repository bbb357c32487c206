// File: olivia-core/src/services/dialogue/branch_resolver.rs

use olivia_common::models::Branch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchMatch {
    Resolved(String),
    /// More than one branch matched at the same rule.
    Ambiguous(Vec<String>),
    Unmatched,
}

#[derive(Debug, Clone)]
struct BranchEntry {
    id: String,
    id_lower: String,
    name: String,
    aliases: Vec<String>,
    /// Name without organization noise, e.g. "blue ash" for "Blue Ash YMCA".
    core: String,
}

/// Turns free text into a branch id.
///
/// Rules, first hit wins: exact id, exact name or alias, a branch name (or its
/// noise-free core) appearing as words in the text, the noise-free text appearing
/// inside a noise-free branch name. Several hits at one rule are ambiguous.
#[derive(Debug, Clone)]
pub struct BranchResolver {
    entries: Vec<BranchEntry>,
    noise: Vec<String>,
}

/// Lowercase, punctuation to spaces, collapsed whitespace.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_noise(normalized: &str, noise: &[String]) -> String {
    normalized
        .split(' ')
        .filter(|w| !w.is_empty() && !noise.iter().any(|n| n == w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `needle` occurs in `haystack` on word boundaries. Both normalized.
fn contains_words(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && format!(" {haystack} ").contains(&format!(" {needle} "))
}

fn unique(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

fn decide(hits: Vec<String>) -> Option<BranchMatch> {
    let hits = unique(hits);
    match hits.len() {
        0 => None,
        1 => hits.into_iter().next().map(BranchMatch::Resolved),
        _ => Some(BranchMatch::Ambiguous(hits)),
    }
}

impl BranchResolver {
    pub fn new(branches: &[Branch], noise_tokens: &[String]) -> Self {
        let noise: Vec<String> = noise_tokens.iter().map(|n| normalize(n)).filter(|n| !n.is_empty()).collect();
        let entries = branches
            .iter()
            .map(|b| {
                let name = normalize(&b.name);
                BranchEntry {
                    id: b.id.clone(),
                    id_lower: b.id.to_lowercase(),
                    core: strip_noise(&name, &noise),
                    name,
                    aliases: b.aliases.iter().map(|a| normalize(a)).filter(|a| !a.is_empty()).collect(),
                }
            })
            .collect();
        Self { entries, noise }
    }

    pub fn resolve(&self, text: &str) -> BranchMatch {
        let raw = text.trim().to_lowercase();
        let msg = normalize(text);
        if msg.is_empty() {
            return BranchMatch::Unmatched;
        }

        // 1) exact id, tolerating spaces or hyphens for underscores
        let id_like = raw.replace([' ', '-'], "_");
        let hits = self
            .entries
            .iter()
            .filter(|e| e.id_lower == raw || e.id_lower == id_like || e.id_lower == msg.replace(' ', "_"))
            .map(|e| e.id.clone())
            .collect();
        if let Some(m) = decide(hits) {
            return m;
        }

        // 2) exact name or alias
        let hits = self
            .entries
            .iter()
            .filter(|e| e.name == msg || e.aliases.iter().any(|a| *a == msg))
            .map(|e| e.id.clone())
            .collect();
        if let Some(m) = decide(hits) {
            return m;
        }

        // 3) branch name, alias or core name mentioned in the message
        let hits = self
            .entries
            .iter()
            .filter(|e| {
                contains_words(&msg, &e.name)
                    || contains_words(&msg, &e.core)
                    || e.aliases.iter().any(|a| contains_words(&msg, a))
            })
            .map(|e| e.id.clone())
            .collect();
        if let Some(m) = decide(hits) {
            return m;
        }

        // 4) noise-free message inside a noise-free branch name
        let loose = strip_noise(&msg, &self.noise);
        if loose.len() < 3 {
            return BranchMatch::Unmatched;
        }
        let hits = self
            .entries
            .iter()
            .filter(|e| !e.core.is_empty() && e.core.contains(&loose))
            .map(|e| e.id.clone())
            .collect();
        decide(hits).unwrap_or(BranchMatch::Unmatched)
    }

    pub fn resolved(&self, text: &str) -> Option<String> {
        match self.resolve(text) {
            BranchMatch::Resolved(id) => Some(id),
            _ => None,
        }
    }
}
