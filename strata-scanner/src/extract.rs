//! Structural queries over fetched documents.
//!
//! Selectors are either CSS (handed straight to `scraper`) or, when the
//! expression starts with `/`, a subset of XPath location paths that is
//! translated to an equivalent CSS selector:
//!
//! - `//name` descendant step, `/name` child step, `*` any element
//! - a leading single `/` anchors the first step at the document root
//! - predicates `[@attr]`, `[@attr='v']`, `[contains(@attr,'v')]`,
//!   `[starts-with(@attr,'v')]`, joined with `and`
//! - a positional `[n]`, only as the first predicate of a step
//!
//! Anything else (`or`, functions, positional filters after other
//! predicates) is rejected rather than approximated.

use crate::error::{Result, ScanError};
use crate::urls::strip_link_text;
use scraper::{Html, Selector};
use tracing::debug;

/// One matched link element. `href` is `None` when the attribute is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub href: Option<String>,
    pub text: String,
}

pub trait Extract {
    type Query;

    /// Compile a selector expression. Called once per depth, before the walk starts.
    fn compile(&self, expression: &str) -> Result<Self::Query>;

    fn extract(&self, document: &str, query: &Self::Query) -> Vec<ExtractedLink>;
}

/// A compiled selector together with the expression it came from.
#[derive(Debug, Clone)]
pub struct LinkQuery {
    expression: String,
    selector: Selector,
}

impl LinkQuery {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let invalid = |reason: String| ScanError::InvalidSelector {
            selector: expression.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("empty expression".to_string()));
        }

        let css = if trimmed.starts_with('/') {
            xpath_to_css(trimmed).map_err(invalid)?
        } else {
            trimmed.to_string()
        };

        let selector = Selector::parse(&css).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            expression: expression.to_string(),
            selector,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// HTML extractor backed by `scraper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extract for HtmlExtractor {
    type Query = LinkQuery;

    fn compile(&self, expression: &str) -> Result<LinkQuery> {
        LinkQuery::parse(expression)
    }

    fn extract(&self, document: &str, query: &LinkQuery) -> Vec<ExtractedLink> {
        let html = Html::parse_document(document);

        let links: Vec<ExtractedLink> = html
            .select(query.selector())
            .map(|element| {
                let raw: String = element.text().collect();
                ExtractedLink {
                    href: element.value().attr("href").map(str::to_string),
                    text: strip_link_text(&raw).to_string(),
                }
            })
            .collect();

        debug!("Selector '{}' matched {} elements", query.expression(), links.len());
        links
    }
}

/// Translate a supported XPath location path into a CSS selector.
pub fn xpath_to_css(expr: &str) -> std::result::Result<String, String> {
    let mut css = String::new();
    let mut rest = expr.trim();
    let mut first = true;

    while !rest.is_empty() {
        let (descendant, after) = if let Some(r) = rest.strip_prefix("//") {
            (true, r)
        } else if let Some(r) = rest.strip_prefix('/') {
            (false, r)
        } else {
            return Err(format!("expected '/' or '//' before '{}'", rest));
        };

        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '*')))
            .unwrap_or(after.len());
        let name = &after[..name_len];
        if name.is_empty() {
            return Err(format!("missing element name before '{}'", after));
        }
        if name.contains('*') && name != "*" {
            return Err(format!("unsupported node test '{}'", name));
        }

        if !first {
            css.push_str(if descendant { " " } else { " > " });
        }
        css.push_str(name);
        if first && !descendant {
            css.push_str(":root");
        }

        rest = &after[name_len..];
        let mut leading = true;
        while rest.starts_with('[') {
            let end = closing_bracket(rest)
                .ok_or_else(|| format!("unterminated predicate in '{}'", rest))?;
            css.push_str(&translate_predicate(&rest[1..end], name, leading)?);
            rest = &rest[end + 1..];
            leading = false;
        }

        first = false;
    }

    if css.is_empty() {
        return Err("empty location path".to_string());
    }
    Ok(css)
}

// Index of the `]` closing the predicate that opens at byte 0, skipping quoted text.
fn closing_bracket(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == ']' => return Some(i),
            None => {}
        }
    }
    None
}

// `node` is the step's node test. `leading` is false once an earlier
// predicate has already filtered the step.
fn translate_predicate(
    predicate: &str,
    node: &str,
    leading: bool,
) -> std::result::Result<String, String> {
    let p = predicate.trim();

    if !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()) {
        if !leading {
            return Err(format!(
                "positional predicate '[{}]' is only supported as the first predicate of a step",
                p
            ));
        }
        let pseudo = if node == "*" { "nth-child" } else { "nth-of-type" };
        return Ok(format!(":{}({})", pseudo, p));
    }

    if split_top_level(p, " or ").len() > 1 {
        return Err(format!("'or' is not supported in predicate '[{}]'", predicate));
    }

    // Conjuncts chain as CSS attribute selectors
    split_top_level(p, " and ")
        .into_iter()
        .map(translate_condition)
        .collect()
}

fn translate_condition(condition: &str) -> std::result::Result<String, String> {
    let c = condition.trim();

    if let Some(attr) = c.strip_prefix('@') {
        return match attr.split_once('=') {
            Some((name, value)) => Ok(format!(
                "[{}=\"{}\"]",
                attr_name(name)?,
                css_escape(&unquote(value)?)
            )),
            None => Ok(format!("[{}]", attr_name(attr)?)),
        };
    }

    for (function, operator) in [("contains", "*="), ("starts-with", "^=")] {
        if let Some(args) = c
            .strip_prefix(function)
            .map(str::trim_start)
            .and_then(|s| s.strip_prefix('('))
            .and_then(|s| s.strip_suffix(')'))
        {
            let (name, value) = args
                .split_once(',')
                .ok_or_else(|| format!("{}() needs two arguments", function))?;
            let name = name
                .trim()
                .strip_prefix('@')
                .ok_or_else(|| format!("{}() only supports attribute arguments", function))?;
            return Ok(format!(
                "[{}{}\"{}\"]",
                attr_name(name)?,
                operator,
                css_escape(&unquote(value)?)
            ));
        }
    }

    Err(format!("unsupported predicate '[{}]'", condition))
}

// Split on `separator` where it occurs outside quotes and parentheses.
fn split_top_level<'a>(s: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && i >= start && s[i..].starts_with(separator) => {
                parts.push(&s[start..i]);
                start = i + separator.len();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn attr_name(name: &str) -> std::result::Result<&str, String> {
    let name = name.trim();
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
    {
        return Err(format!("invalid attribute name '{}'", name));
    }
    Ok(name)
}

fn unquote(value: &str) -> std::result::Result<String, String> {
    let value = value.trim();
    for q in ['\'', '"'] {
        if let Some(inner) = value.strip_prefix(q).and_then(|v| v.strip_suffix(q)) {
            if inner.contains(q) {
                return Err(format!("unexpected text after quoted string in '{}'", value));
            }
            return Ok(inner.to_string());
        }
    }
    Err(format!("expected a quoted string, got '{}'", value))
}

fn css_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <nav class="main">
            <a href="/docs">Docs</a>
            <a href="https://other.org/blog">Blog</a>
        </nav>
        <ul>
            <li><a href="one.html">One</a></li>
            <li><a href="two.html">Two</a></li>
            <li><a name="anchor">No href</a></li>
        </ul>
    </body></html>"#;

    fn texts(links: &[ExtractedLink]) -> Vec<&str> {
        links.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_xpath_descendant() {
        assert_eq!(xpath_to_css("//a").unwrap(), "a");
        assert_eq!(xpath_to_css("//nav//a").unwrap(), "nav a");
    }

    #[test]
    fn test_xpath_child_and_root() {
        assert_eq!(xpath_to_css("/html/body/a").unwrap(), "html:root > body > a");
        assert_eq!(xpath_to_css("//ul/li/a").unwrap(), "ul > li > a");
    }

    #[test]
    fn test_xpath_predicates() {
        assert_eq!(
            xpath_to_css("//nav[@class='main']//a[@href]").unwrap(),
            r#"nav[class="main"] a[href]"#
        );
        assert_eq!(
            xpath_to_css(r#"//a[contains(@href, "docs")]"#).unwrap(),
            r#"a[href*="docs"]"#
        );
        assert_eq!(
            xpath_to_css("//a[starts-with(@href,'http')]").unwrap(),
            r#"a[href^="http"]"#
        );
        assert_eq!(xpath_to_css("//li[2]/a").unwrap(), "li:nth-of-type(2) > a");
    }

    #[test]
    fn test_xpath_bracket_inside_quotes() {
        assert_eq!(
            xpath_to_css("//a[@title='x]y']").unwrap(),
            r#"a[title="x]y"]"#
        );
    }

    #[test]
    fn test_xpath_unsupported() {
        assert!(xpath_to_css("//a/text()").is_err());
        assert!(xpath_to_css("//a[position()>1]").is_err());
        assert!(xpath_to_css("//a[@href").is_err());
        assert!(xpath_to_css("//").is_err());
        assert!(xpath_to_css("//a[@class='nav' or @rel='next']").is_err());
        assert!(xpath_to_css("//a[@href='x'y']").is_err());
        assert!(xpath_to_css("//a[contains(@href,'a'), 'b')]").is_err());
        assert!(xpath_to_css("//a[@class='nav' and position()=1]").is_err());
    }

    #[test]
    fn test_xpath_and_chains_conditions() {
        assert_eq!(
            xpath_to_css("//a[@class='nav' and @rel='next']").unwrap(),
            r#"a[class="nav"][rel="next"]"#
        );
        assert_eq!(
            xpath_to_css("//a[contains(@href,'a') and contains(@href,'b')]").unwrap(),
            r#"a[href*="a"][href*="b"]"#
        );
        assert_eq!(
            xpath_to_css("//a[@title='this and that']").unwrap(),
            r#"a[title="this and that"]"#
        );
    }

    #[test]
    fn test_xpath_positional_predicates() {
        assert_eq!(xpath_to_css("//div/*[2]").unwrap(), "div > *:nth-child(2)");
        assert_eq!(
            xpath_to_css("//a[1][@class='x']").unwrap(),
            r#"a:nth-of-type(1)[class="x"]"#
        );
        assert!(xpath_to_css("//a[@class='x'][1]").is_err());
    }

    #[test]
    fn test_extract_and_predicate_matches() {
        let extractor = HtmlExtractor::new();
        let query = extractor
            .compile("//a[@class='nav' and @rel='next']")
            .unwrap();
        let links = extractor.extract(
            r#"<a class="nav" rel="next" href="/n">Next</a><a class="nav" href="/p">Prev</a>"#,
            &query,
        );
        assert_eq!(links, vec![ExtractedLink {
            href: Some("/n".to_string()),
            text: "Next".to_string(),
        }]);
    }

    #[test]
    fn test_extract_any_element_by_position() {
        let extractor = HtmlExtractor::new();
        let query = extractor.compile("//div/*[2]").unwrap();
        let links = extractor.extract(
            r#"<div><a href="/1">one</a><span>s</span><a href="/2">two</a></div>"#,
            &query,
        );
        assert_eq!(links, vec![ExtractedLink {
            href: None,
            text: "s".to_string(),
        }]);
    }

    #[test]
    fn test_query_parse_errors() {
        assert!(matches!(
            LinkQuery::parse("   "),
            Err(ScanError::InvalidSelector { .. })
        ));
        assert!(matches!(
            LinkQuery::parse("a[[["),
            Err(ScanError::InvalidSelector { .. })
        ));
        assert!(matches!(
            LinkQuery::parse("//a/text()"),
            Err(ScanError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_extract_with_xpath() {
        let extractor = HtmlExtractor::new();
        let query = extractor.compile("//a").unwrap();
        let links = extractor.extract(PAGE, &query);

        assert_eq!(links.len(), 5);
        assert_eq!(links[0].href.as_deref(), Some("/docs"));
        assert_eq!(texts(&links), vec!["Docs", "Blog", "One", "Two", "No href"]);
        assert_eq!(links[4].href, None);
    }

    #[test]
    fn test_extract_with_css() {
        let extractor = HtmlExtractor::new();
        let query = extractor.compile("ul li a[href]").unwrap();
        let links = extractor.extract(PAGE, &query);
        assert_eq!(texts(&links), vec!["One", "Two"]);
    }

    #[test]
    fn test_extract_nothing_matches() {
        let extractor = HtmlExtractor::new();
        let query = extractor.compile("//table//a").unwrap();
        assert!(extractor.extract(PAGE, &query).is_empty());
    }

    #[test]
    fn test_extract_strips_line_breaks_and_tabs() {
        let extractor = HtmlExtractor::new();
        let query = extractor.compile("//a").unwrap();
        let links = extractor.extract("<a href=\"/d\">\n\tDocs \r\n</a>", &query);
        assert_eq!(links[0].text, "Docs ");
    }

    #[test]
    fn test_extract_concatenates_nested_text() {
        let extractor = HtmlExtractor::new();
        let query = extractor.compile("//a").unwrap();
        let links = extractor.extract(r#"<a href="/x"><b>Bold</b> and <i>it</i></a>"#, &query);
        assert_eq!(links[0].text, "Bold and it");
    }
}
