//! Conversion entry point.
//!
//! Classifies the input (remote URL, local file, raw markup), loads and parses
//! it, fixes the base location, then runs the embedded `url()` pass over the
//! whole document followed by the tree passes, and serializes the result.

use std::path::PathBuf;

use html_inliner_common::is_probably_binary;
use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;
use url::Url;

use crate::classify::{self, RefKind};
use crate::decode::decode_to_utf8;
use crate::error::{FetchError, InlineError};
use crate::fetch::{local_path, FetchOptions, HttpTransport, ResourceFetcher, Transport};
use crate::resolve::{self, BaseContext};
use crate::rewrite::Rewriter;

pub struct Inliner {
    fetcher: ResourceFetcher,
}

impl Inliner {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            fetcher: ResourceFetcher::new(transport),
        }
    }

    /// Inliner over a real HTTP client.
    pub fn with_options(opts: FetchOptions) -> anyhow::Result<Self> {
        Ok(Self::new(Box::new(HttpTransport::new(opts)?)))
    }

    /// Produce a self-contained document, or `None` if the input itself could
    /// not be loaded. Individual resources that fail are left as written.
    pub fn process(&self, input: &str, base_path: Option<&str>) -> Option<String> {
        match self.try_process(input, base_path) {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!("inlining failed: {e}");
                None
            }
        }
    }

    /// Like [`Inliner::process`], keeping the reason for a failure.
    pub fn try_process(&self, input: &str, base_path: Option<&str>) -> Result<String, InlineError> {
        if input.trim().is_empty() {
            return Err(InlineError::EmptyInput);
        }

        let (document, base) = match classify::classify(input) {
            RefKind::Remote => self.load_remote(input)?,
            RefKind::LocalFile | RefKind::Relative => load_local(input, base_path)?,
        };

        tracing::debug!("base location: {}", base.as_str());
        self.rewrite(&document, &base)
    }

    fn load_remote(&self, input: &str) -> Result<(NodeRef, BaseContext), InlineError> {
        let url = Url::parse(input).map_err(|_| {
            InlineError::DocumentFetch(FetchError::InvalidUrl {
                reference: input.to_string(),
                base: String::new(),
            })
        })?;

        let resource = self
            .fetcher
            .fetch_remote(url.as_str())
            .map_err(InlineError::DocumentFetch)?;

        let document = kuchiki::parse_html().one(resource.text());
        let declared = resolve::take_declared_base(&document);
        let base = resolve::remote_base(&url, declared.as_deref());

        Ok((document, base))
    }

    fn rewrite(&self, document: &NodeRef, base: &BaseContext) -> Result<String, InlineError> {
        let mut rewriter = Rewriter::new(base, &self.fetcher);

        // Inline style blocks and style attributes first, on the serialized text
        let html = rewriter.rewrite_text(&serialize(document)?);
        let document = kuchiki::parse_html().one(html);

        rewriter.run(&document);

        let html = serialize(&document)?;
        let stats = rewriter.stats;
        tracing::info!(
            inlined = stats.inlined,
            links = stats.links,
            skipped = stats.skipped,
            "inlined document"
        );
        Ok(html)
    }
}

/// Load a file path (or `file:///` URL) when one exists on disk, otherwise
/// treat the input as markup.
fn load_local(input: &str, base_path: Option<&str>) -> Result<(NodeRef, BaseContext), InlineError> {
    let (markup, input_file) = match input_path(input) {
        Some(path) => {
            let bytes = std::fs::read(&path).map_err(|source| InlineError::DocumentRead {
                path: path.display().to_string(),
                source,
            })?;
            // UTF-16 text is full of NULs; a BOM marks it as text
            let has_bom = encoding_rs::Encoding::for_bom(&bytes).is_some();
            if !has_bom && is_probably_binary(&bytes) {
                return Err(InlineError::BinaryInput(path.display().to_string()));
            }
            (decode_to_utf8(&bytes, None), Some(path))
        }
        None => (input.to_string(), None),
    };

    let document = kuchiki::parse_html().one(markup);
    let declared = resolve::take_declared_base(&document);
    let base = resolve::local_base(declared.as_deref(), base_path, input_file.as_deref())?;

    Ok((document, base))
}

fn input_path(input: &str) -> Option<PathBuf> {
    let path = if classify::classify(input) == RefKind::LocalFile {
        local_path(input).ok()?
    } else {
        PathBuf::from(input)
    };
    path.is_file().then_some(path)
}

fn serialize(document: &NodeRef) -> Result<String, InlineError> {
    let mut out = Vec::new();
    document.serialize(&mut out).map_err(InlineError::Serialize)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
