use crate::error::{Result, ScanError};
use crate::extract::Extract;
use crate::fetch::Fetch;
use crate::result::{FrontierEntry, WalkOutcome};
use crate::target::TargetSpec;
use crate::urls::{append_params, build_path, construct_url, resolve_href};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

/// Reported before each frontier URL is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkProgress {
    pub depth: usize,
    /// 1-based position of `url` within the frontier being processed.
    pub position: usize,
    pub frontier_len: usize,
    pub url: String,
}

pub type ProgressCallback = Arc<dyn Fn(WalkProgress) + Send + Sync>;

/// Sequential, depth-bounded frontier walker.
///
/// Each depth level converts the current frontier into the next one by
/// fetching every URL, querying it with that level's selector, resolving
/// the hrefs and dropping duplicates. The walk stops after the last target
/// or as soon as a level produces an empty frontier.
pub struct Walker<F, E> {
    fetcher: F,
    extractor: E,
    progress_callback: Option<ProgressCallback>,
}

impl<F: Fetch, E: Extract> Walker<F, E> {
    pub fn new(fetcher: F, extractor: E) -> Self {
        Self {
            fetcher,
            extractor,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Give back the transport, e.g. to close it explicitly.
    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Validate targets and compile their selectors, one query per depth.
    pub fn compile_targets(&self, targets: &[TargetSpec]) -> Result<Vec<E::Query>> {
        if targets.is_empty() {
            return Err(ScanError::EmptyTargets);
        }

        targets
            .iter()
            .enumerate()
            .map(|(depth, target)| {
                if target.selector.trim().is_empty() {
                    return Err(ScanError::MissingSelector { depth });
                }
                self.extractor.compile(&target.selector)
            })
            .collect()
    }

    pub async fn run(&self, seed_url: &str, targets: &[TargetSpec]) -> Result<WalkOutcome> {
        let queries = self.compile_targets(targets)?;
        let initial_url = construct_url(seed_url, &targets[0].params)?;
        let total = targets.len();

        info!("Starting walk of {} across {} depth level(s)", initial_url, total);

        let mut current = vec![FrontierEntry::seed(initial_url)];
        let mut outcome = WalkOutcome::default();

        for (depth, (target, query)) in targets.iter().zip(&queries).enumerate() {
            info!("Processing depth {}/{}", depth + 1, total);
            let next = self.process_depth(&current, depth, query, &target.params).await;
            info!("Found {} URLs at depth {}", next.len(), depth + 1);

            outcome
                .records
                .extend(next.iter().map(|entry| entry.to_record(depth)));

            if depth == total - 1 || next.is_empty() {
                outcome.terminal = next
                    .into_iter()
                    .map(|entry| entry.into_terminal(depth))
                    .collect();
                break;
            }
            current = next;
        }

        info!("Walk complete. Recorded {} URLs", outcome.records.len());
        Ok(outcome)
    }

    /// Advance one depth: build the next frontier from `frontier`.
    ///
    /// URLs are handled in order; a URL whose fetch fails is logged and
    /// contributes nothing. The first entry seen for a URL wins.
    pub async fn process_depth(
        &self,
        frontier: &[FrontierEntry],
        depth: usize,
        query: &E::Query,
        params: &BTreeMap<String, String>,
    ) -> Vec<FrontierEntry> {
        let mut next = Vec::new();
        let mut seen = HashSet::new();

        for (idx, entry) in frontier.iter().enumerate() {
            if let Some(ref callback) = self.progress_callback {
                callback(WalkProgress {
                    depth,
                    position: idx + 1,
                    frontier_len: frontier.len(),
                    url: entry.url.clone(),
                });
            }

            match self.extract_entries(entry, query, params).await {
                Ok(found) => {
                    for candidate in found {
                        if seen.insert(candidate.url.clone()) {
                            next.push(candidate);
                        } else {
                            debug!("Dropping duplicate {}", candidate.url);
                        }
                    }
                }
                Err(e) => {
                    error!("Error processing {}: {}", entry.url, e);
                }
            }
        }

        next
    }

    /// Fetch one frontier URL and turn its matched links into child entries.
    pub async fn extract_entries(
        &self,
        entry: &FrontierEntry,
        query: &E::Query,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<FrontierEntry>> {
        let base = Url::parse(&entry.url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", entry.url, e)))?;
        let document = self.fetcher.fetch(&entry.url).await?;

        let children = self
            .extractor
            .extract(&document, query)
            .into_iter()
            .map(|link| {
                let resolved = resolve_href(&base, link.href.as_deref());
                let url = append_params(resolved, params).to_string();
                debug!("Found link: {} ({})", url, link.text);
                let path = build_path(&entry.path, &link.text);
                FrontierEntry::new(url, link.text, path)
            })
            .collect();

        Ok(children)
    }
}
