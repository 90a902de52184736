use serde::{Deserialize, Serialize};

/// A URL waiting to be processed at some depth, with the breadcrumb that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub url: String,
    pub text: String,
    pub path: String,
}

impl FrontierEntry {
    pub fn new(url: String, text: String, path: String) -> Self {
        Self { url, text, path }
    }

    /// The depth-0 entry: no anchor text and an empty navigation path.
    pub fn seed(url: String) -> Self {
        Self {
            url,
            text: String::new(),
            path: String::new(),
        }
    }

    pub fn to_record(&self, depth: usize) -> WalkRecord {
        WalkRecord {
            depth,
            url: self.url.clone(),
            path: self.path.clone(),
        }
    }

    pub fn into_terminal(self, depth: usize) -> TerminalEntry {
        TerminalEntry {
            url: self.url,
            path: self.path,
            depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkRecord {
    pub depth: usize,
    pub url: String,
    pub path: String,
}

/// An entry of the frontier produced by the last processed depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalEntry {
    pub url: String,
    pub path: String,
    pub depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkOutcome {
    pub records: Vec<WalkRecord>,
    pub terminal: Vec<TerminalEntry>,
}

impl WalkOutcome {
    /// Number of depth levels that produced at least one record.
    pub fn depths_reached(&self) -> usize {
        self.records.last().map(|r| r.depth + 1).unwrap_or(0)
    }

    pub fn records_at(&self, depth: usize) -> impl Iterator<Item = &WalkRecord> {
        self.records.iter().filter(move |r| r.depth == depth)
    }
}
