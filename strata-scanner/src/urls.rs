use crate::error::{Result, ScanError};
use std::collections::BTreeMap;
use tracing::warn;
use url::Url;

/// Parse `base` and append `params` to its query string.
pub fn construct_url(base: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let url = Url::parse(base).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", base, e)))?;
    Ok(append_params(url, params).to_string())
}

/// Merge `params` into the query of `url`. Last wins: an existing pair whose
/// key appears in `params` is dropped, the rest keep their order, and
/// `params` follow in key order.
pub fn append_params(mut url: Url, params: &BTreeMap<String, String>) -> Url {
    if params.is_empty() {
        return url;
    }

    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !params.contains_key(k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));

    url.set_query(None);
    url.query_pairs_mut().extend_pairs(pairs);
    url
}

/// Resolve a possibly relative, possibly missing href against the page it
/// was found on. Missing, empty or unjoinable hrefs resolve to `base`.
pub fn resolve_href(base: &Url, href: Option<&str>) -> Url {
    match href {
        None | Some("") => base.clone(),
        Some(href) => match base.join(href) {
            Ok(url) => url,
            Err(e) => {
                warn!("Could not resolve href '{}' against {}: {}", href, base, e);
                base.clone()
            }
        },
    }
}

pub fn build_path(parent: &str, text: &str) -> String {
    if parent.is_empty() {
        text.to_string()
    } else {
        format!("{}/{}", parent, text)
    }
}

/// Strip surrounding tabs, carriage returns and newlines. Spaces are kept.
pub fn strip_link_text(raw: &str) -> &str {
    raw.trim_matches(|c| matches!(c, '\t' | '\r' | '\n'))
}
