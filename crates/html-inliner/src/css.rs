//! Inlining of `url(...)` references found in style text.
//!
//! This is a plain text scan rather than a CSS parser: every non-greedy
//! `url(` ... `)` pair is considered, which keeps malformed stylesheets intact.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::classify::{self, RefKind};
use crate::fetch::ResourceFetcher;
use crate::mime::{content_type_for, DEFAULT_CONTENT_TYPE};
use crate::resolve::BaseContext;
use crate::rewrite::InlineStats;

/// Font formats that are never inlined.
const SKIPPED_SUFFIXES: [&str; 2] = [".eot", ".ttf"];

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)url\(.*?\)").expect("url() pattern is valid"))
}

/// Replace every `url(...)` in `text` with an inlined data URI.
///
/// `current_url` is the absolute location the text was loaded from (a
/// stylesheet), or `None` for text that belongs to the document itself.
/// Relative references resolve against the directory of `current_url` when
/// present, otherwise against `base`. References that cannot be fetched are
/// left exactly as written.
pub fn rewrite_embedded_urls(
    text: &str,
    current_url: Option<&str>,
    base: &BaseContext,
    fetcher: &ResourceFetcher,
    stats: &mut InlineStats,
) -> String {
    let context = current_url
        .and_then(stylesheet_dir)
        .unwrap_or_else(|| base.clone());

    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in url_regex().find_iter(text) {
        out.push_str(&text[last..m.start()]);
        last = m.end();

        let Some(reference) = extract_reference(m.as_str()) else {
            out.push_str(m.as_str());
            continue;
        };

        if !should_inline(&reference) {
            tracing::debug!("leaving url({reference}) as written");
            out.push_str(m.as_str());
            continue;
        }

        match fetcher.fetch(&reference, &context) {
            Ok(resource) => {
                stats.inlined += 1;
                out.push_str("url('");
                out.push_str(&resource.data_uri());
                out.push_str("')");
            }
            Err(e) => {
                tracing::debug!("skipping url({reference}): {e}");
                stats.skipped += 1;
                out.push_str(m.as_str());
            }
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Pull the reference out of a `url(...)` token: quotes, whitespace and
/// entity leftovers from serialized attributes are removed, and anything from
/// the first `?` on is dropped.
pub fn extract_reference(token: &str) -> Option<String> {
    let open = token.find('(')?;
    let inner = token[open + 1..].strip_suffix(')')?;

    let cleaned = inner
        .replace("&quot;", "")
        .replace("&amp;", "")
        .replace("quot;", "");
    let trimmed = cleaned.trim().trim_matches(|c| c == '\'' || c == '"').trim();

    let reference = match trimmed.find('?') {
        Some(q) => &trimmed[..q],
        None => trimmed,
    };

    if reference.is_empty() {
        None
    } else {
        Some(reference.to_string())
    }
}

/// Fonts are excluded, and local files without a recognised asset extension
/// are not read. Remote references are not subject to the extension check.
fn should_inline(reference: &str) -> bool {
    if SKIPPED_SUFFIXES.iter().any(|s| reference.ends_with(s)) {
        return false;
    }
    !(classify::classify(reference) == RefKind::LocalFile
        && content_type_for(reference) == DEFAULT_CONTENT_TYPE)
}

/// Directory of a stylesheet location, used as the base for its own `url()`s.
fn stylesheet_dir(current_url: &str) -> Option<BaseContext> {
    let url = Url::parse(current_url).ok()?;
    url.join(".").ok().map(BaseContext::new)
}
