use crate::config::WalkConfig;
use crate::data::SqliteSink;
use crate::error::Result;
use crate::report::{JsonFileSink, OutputFormat, RecordSink};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use strata_scanner::{
    Extract, Fetch, HtmlExtractor, HttpFetcher, ProgressCallback, WalkOutcome, WalkProgress,
    Walker,
};
use tracing::info;

/// Options for configuring a walk
pub struct WalkOptions {
    pub config: WalkConfig,
    pub show_progress_bars: bool,
}

/// Callback for human-readable status messages
pub type WalkMessageCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct WalkSummary {
    pub outcome: WalkOutcome,
    pub saved_to: PathBuf,
}

/// Sink matching the configured output format.
pub fn record_sink(config: &WalkConfig) -> Box<dyn RecordSink> {
    match config.format {
        OutputFormat::Json => Box::new(JsonFileSink::new(config.output_dir())),
        OutputFormat::Sqlite => Box::new(SqliteSink::new(config.output_dir())),
    }
}

/// Execute a walk over HTTP and persist its records.
///
/// The HTTP session lives only for the duration of this call.
pub async fn execute_walk(
    options: WalkOptions,
    message_callback: Option<WalkMessageCallback>,
) -> Result<WalkSummary> {
    let WalkOptions {
        config,
        show_progress_bars,
    } = options;

    config.validate()?;
    let fetcher = HttpFetcher::new(config.fetch_options())?;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting walk...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut walker = Walker::new(fetcher, HtmlExtractor::new());
    if let Some(ref pb) = progress_bar {
        walker = walker.with_progress_callback(spinner_callback(pb.clone(), config.targets.len()));
    }

    let sink = record_sink(&config);
    let summary = execute_walk_with(&walker, &config, sink.as_ref(), message_callback).await;

    if let Some(ref pb) = progress_bar {
        match &summary {
            Ok(s) => pb.finish_with_message(format!(
                "Walk complete! {} URLs recorded",
                s.outcome.records.len()
            )),
            Err(_) => pb.finish_and_clear(),
        }
    }

    drop(walker.into_fetcher());
    summary
}

/// Run `walker` against `config` and hand the records to `sink`.
pub async fn execute_walk_with<F: Fetch, E: Extract>(
    walker: &Walker<F, E>,
    config: &WalkConfig,
    sink: &dyn RecordSink,
    message_callback: Option<WalkMessageCallback>,
) -> Result<WalkSummary> {
    config.validate()?;

    if let Some(ref callback) = message_callback {
        callback(format!(
            "Walking {} ({} depth levels)",
            config.seed_url,
            config.targets.len()
        ));
    }

    let outcome = walker.run(&config.seed_url, &config.targets).await?;
    let saved_to = sink.save(&outcome.records, &config.source_name)?;

    info!(
        "Walk of {} finished: {} records, {} terminal URLs",
        config.seed_url,
        outcome.records.len(),
        outcome.terminal.len()
    );
    if let Some(ref callback) = message_callback {
        callback(format!("Saved {} records to {}", outcome.records.len(), saved_to.display()));
    }

    Ok(WalkSummary { outcome, saved_to })
}

fn spinner_callback(pb: Arc<ProgressBar>, total_depths: usize) -> ProgressCallback {
    Arc::new(move |progress: WalkProgress| {
        pb.set_message(format!(
            "Depth {}/{} [{}/{}] {}",
            progress.depth + 1,
            total_depths,
            progress.position,
            progress.frontier_len,
            extract_url_path(&progress.url)
        ));
    })
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}
