pub mod error;
pub mod extract;
pub mod fetch;
pub mod result;
pub mod target;
pub mod urls;
pub mod walker;

pub use error::{FetchError, ScanError};
pub use extract::{Extract, ExtractedLink, HtmlExtractor, LinkQuery};
pub use fetch::{Fetch, FetchOptions, HttpFetcher, MAX_BACKOFF, USER_AGENTS};
pub use result::{FrontierEntry, TerminalEntry, WalkOutcome, WalkRecord};
pub use target::TargetSpec;
pub use walker::{ProgressCallback, WalkProgress, Walker};
