//! Tree passes that inline or absolutize references in a parsed document.
//!
//! Each pass visits every element of its kind. A reference that cannot be
//! resolved or fetched leaves its element exactly as it was, so the tree stays
//! valid whatever the network does.

use html5ever::{namespace_url, ns, LocalName, QualName};
use kuchiki::{ElementData, NodeDataRef, NodeRef};

use crate::classify::{self, RefKind};
use crate::css::rewrite_embedded_urls;
use crate::fetch::{data_uri, ResourceFetcher};
use crate::resolve::BaseContext;

/// Counters for one conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InlineStats {
    /// References replaced by data URIs (stylesheets count once each)
    pub inlined: usize,
    /// Hyperlinks rewritten to absolute form
    pub links: usize,
    /// References left as written because they could not be fetched
    pub skipped: usize,
}

type Element = NodeDataRef<ElementData>;

pub struct Rewriter<'a> {
    base: &'a BaseContext,
    fetcher: &'a ResourceFetcher,
    pub stats: InlineStats,
}

impl<'a> Rewriter<'a> {
    pub fn new(base: &'a BaseContext, fetcher: &'a ResourceFetcher) -> Self {
        Self {
            base,
            fetcher,
            stats: InlineStats::default(),
        }
    }

    /// Inline `url(...)` references in arbitrary text belonging to the document.
    pub fn rewrite_text(&mut self, text: &str) -> String {
        rewrite_embedded_urls(text, None, self.base, self.fetcher, &mut self.stats)
    }

    /// Run every tree pass in order: stylesheets, scripts, images and
    /// favicons, hyperlinks, audio.
    pub fn run(&mut self, document: &NodeRef) {
        self.inline_stylesheets(document);
        self.inline_scripts(document);
        self.inline_images(document);
        self.absolutize_links(document);
        self.inline_audio(document);
    }

    /// Replace `<link rel="stylesheet">` with a `<style>` holding the fetched
    /// text. `url()`s inside resolve against the stylesheet's own location.
    pub fn inline_stylesheets(&mut self, document: &NodeRef) {
        for link in select(document, "link") {
            let (href, rel) = {
                let attrs = link.attributes.borrow();
                (attrs.get("href").map(str::to_string), attrs.get("rel").map(str::to_string))
            };
            let Some(href) = href else { continue };
            if !rel.is_some_and(|r| r.contains("stylesheet")) {
                continue;
            }

            let resource = match self.fetcher.fetch(&href, self.base) {
                Ok(resource) => resource,
                Err(e) => {
                    self.skip("stylesheet", &href, &e);
                    continue;
                }
            };

            let css = rewrite_embedded_urls(
                &resource.text(),
                Some(&resource.location),
                self.base,
                self.fetcher,
                &mut self.stats,
            );

            if css.to_ascii_lowercase().contains("</style") {
                tracing::debug!("{href} contains a </style> sequence; browsers will end the element there");
            }

            link.as_node().insert_after(style_element(&css));
            link.as_node().detach();
            self.stats.inlined += 1;
            tracing::debug!("inlined stylesheet {}", resource.location);
        }
    }

    /// Point `<script src>` at a JavaScript data URI.
    pub fn inline_scripts(&mut self, document: &NodeRef) {
        for script in select(document, "script") {
            let Some(src) = attr(&script, "src") else { continue };

            match self.fetcher.fetch(&src, self.base) {
                Ok(resource) => {
                    set_attr(&script, "src", data_uri("text/javascript", &resource.bytes));
                    self.stats.inlined += 1;
                }
                Err(e) => self.skip("script", &src, &e),
            }
        }
    }

    /// Inline every `<img src>` and every `<link href>` whose `rel` mentions
    /// an icon, using the fetched content type.
    pub fn inline_images(&mut self, document: &NodeRef) {
        let mut targets: Vec<(Element, &str)> =
            select(document, "img").into_iter().map(|img| (img, "src")).collect();

        targets.extend(
            select(document, "link")
                .into_iter()
                .filter(|link| {
                    attr(link, "rel").is_some_and(|rel| rel.to_ascii_lowercase().contains("icon"))
                })
                .map(|link| (link, "href")),
        );

        for (element, name) in targets {
            let Some(reference) = attr(&element, name) else { continue };

            match self.fetcher.fetch(&reference, self.base) {
                Ok(resource) => {
                    set_attr(&element, name, resource.data_uri());
                    self.stats.inlined += 1;
                }
                Err(e) => self.skip("image", &reference, &e),
            }
        }
    }

    /// Rewrite relative `<a href>` values to absolute URLs. Remote links,
    /// fragments and `javascript:` links are kept.
    pub fn absolutize_links(&mut self, document: &NodeRef) {
        for anchor in select(document, "a") {
            let Some(href) = attr(&anchor, "href") else { continue };
            if href.is_empty()
                || classify::classify(&href) == RefKind::Remote
                || href.starts_with('#')
                || href.to_ascii_lowercase().contains("javascript:")
            {
                continue;
            }

            match self.base.resolve(&href) {
                Ok(absolute) if absolute != href => {
                    set_attr(&anchor, "href", absolute);
                    self.stats.links += 1;
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("leaving link {href}: {e}"),
            }
        }
    }

    /// Point `<audio src>` at a data URI.
    pub fn inline_audio(&mut self, document: &NodeRef) {
        for audio in select(document, "audio") {
            let Some(src) = attr(&audio, "src") else { continue };

            match self.fetcher.fetch(&src, self.base) {
                Ok(resource) => {
                    set_attr(&audio, "src", resource.data_uri());
                    self.stats.inlined += 1;
                }
                Err(e) => self.skip("audio", &src, &e),
            }
        }
    }

    fn skip(&mut self, kind: &str, reference: &str, error: &dyn std::fmt::Display) {
        tracing::debug!("skipping {kind} {reference}: {error}");
        self.stats.skipped += 1;
    }
}

/// Collect up front: passes detach and insert nodes while iterating.
fn select(document: &NodeRef, selector: &str) -> Vec<Element> {
    match document.select(selector) {
        Ok(matches) => matches.collect(),
        Err(()) => Vec::new(),
    }
}

fn attr(element: &Element, name: &str) -> Option<String> {
    element.attributes.borrow().get(name).map(str::to_string)
}

fn set_attr(element: &Element, name: &str, value: String) {
    element.attributes.borrow_mut().insert(name, value);
}

/// A detached `<style>` element whose only child is `\n{css}\n`. Built
/// directly so the text never goes back through the tokenizer.
fn style_element(css: &str) -> NodeRef {
    let name = QualName::new(None, ns!(html), LocalName::from("style"));
    let style = NodeRef::new_element(name, None);
    style.append(NodeRef::new_text(format!("\n{css}\n")));
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::StubTransport;
    use kuchiki::traits::TendrilSink;
    use url::Url;

    fn parse(html: &str) -> NodeRef {
        kuchiki::parse_html().one(html)
    }

    fn base() -> BaseContext {
        BaseContext::new(Url::parse("https://example.com/assets/").unwrap())
    }

    fn first_attr(doc: &NodeRef, selector: &str, name: &str) -> Option<String> {
        let el = doc.select_first(selector).unwrap();
        let value = el.attributes.borrow().get(name).map(str::to_string);
        value
    }

    #[test]
    fn test_stylesheet_becomes_style_element() {
        let stub = StubTransport::default().with(
            "https://example.com/assets/style.css",
            b"body{color:red}",
            Some("text/css"),
        );
        let doc = parse(r#"<head><link rel="stylesheet" href="style.css"></head><body></body>"#);
        let base = base();
        let fetcher = stub.fetcher();
        let mut rw = Rewriter::new(&base, &fetcher);

        rw.inline_stylesheets(&doc);

        assert!(doc.select_first("link").is_err());
        let style = doc.select_first("head > style").unwrap();
        assert_eq!(style.as_node().text_contents(), "\nbody{color:red}\n");
        assert_eq!(rw.stats.inlined, 1);
    }

    #[test]
    fn test_stylesheet_urls_resolve_against_stylesheet() {
        let stub = StubTransport::default()
            .with(
                "https://cdn.example.com/css/site.css",
                b"h1{background:url(../img/h.png)}",
                Some("text/css; charset=utf-8"),
            )
            .with("https://cdn.example.com/img/h.png", b"PNG", Some("image/png"));
        let doc = parse(
            r#"<link rel="stylesheet" href="https://cdn.example.com/css/site.css"><link rel="preload" href="x.css">"#,
        );
        let base = base();
        let fetcher = stub.fetcher();
        let mut rw = Rewriter::new(&base, &fetcher);

        rw.inline_stylesheets(&doc);

        let style = doc.select_first("style").unwrap();
        assert_eq!(
            style.as_node().text_contents(),
            "\nh1{background:url('data:image/png;base64,UE5H')}\n"
        );
        assert_eq!(first_attr(&doc, "link", "href").as_deref(), Some("x.css"));
    }

    #[test]
    fn test_stylesheet_text_is_not_reparsed() {
        let css = r#"a::after{content:"</style>"} b{color:red}"#;
        let stub = StubTransport::default().with(
            "https://example.com/assets/quirk.css",
            css.as_bytes(),
            Some("text/css"),
        );
        let doc = parse(r#"<head><link rel="stylesheet" href="quirk.css"></head><body><p>x</p></body>"#);
        let base = base();
        let fetcher = stub.fetcher();
        let mut rw = Rewriter::new(&base, &fetcher);

        rw.inline_stylesheets(&doc);

        let style = doc.select_first("head > style").unwrap();
        assert_eq!(style.as_node().text_contents(), format!("\n{css}\n"));
        assert_eq!(doc.select_first("body > p").unwrap().text_contents(), "x");
    }

    #[test]
    fn test_failed_stylesheet_keeps_link() {
        let stub = StubTransport::default();
        let doc = parse(r#"<link rel="stylesheet" href="gone.css">"#);
        let base = base();
        let fetcher = stub.fetcher();
        let mut rw = Rewriter::new(&base, &fetcher);

        rw.inline_stylesheets(&doc);

        assert_eq!(first_attr(&doc, "link", "href").as_deref(), Some("gone.css"));
        assert!(doc.select_first("style").is_err());
        assert_eq!(rw.stats.skipped, 1);
    }

    #[test]
    fn test_script_src_becomes_data_uri() {
        let stub = StubTransport::default().with(
            "https://example.com/assets/app.js",
            b"x=1",
            Some("application/x-javascript"),
        );
        let doc = parse(r#"<script src="app.js"></script><script>inline()</script>"#);
        let base = base();
        let fetcher = stub.fetcher();
        Rewriter::new(&base, &fetcher).inline_scripts(&doc);

        assert_eq!(
            first_attr(&doc, "script", "src").as_deref(),
            Some("data:text/javascript;base64,eD0x")
        );
        assert_eq!(stub.requested(), vec!["https://example.com/assets/app.js"]);
    }

    #[test]
    fn test_images_and_favicons() {
        let stub = StubTransport::default()
            .with("https://example.com/assets/a.png", b"PNG", Some("image/png"))
            .with("https://example.com/favicon.ico", b"ICO", None);
        let doc = parse(
            r#"<head><link rel="Shortcut Icon" href="https://example.com/favicon.ico"></head>
               <body><img src="a.png"><img src="missing.png"><img alt="none"></body>"#,
        );
        let base = base();
        let fetcher = stub.fetcher();
        let mut rw = Rewriter::new(&base, &fetcher);

        rw.inline_images(&doc);

        let srcs: Vec<Option<String>> = doc
            .select("img")
            .unwrap()
            .map(|img| img.attributes.borrow().get("src").map(str::to_string))
            .collect();
        assert_eq!(
            srcs,
            vec![
                Some("data:image/png;base64,UE5H".to_string()),
                Some("missing.png".to_string()),
                None,
            ]
        );
        assert_eq!(
            first_attr(&doc, "link", "href").as_deref(),
            Some("data:image/x-icon;base64,SUNP")
        );
        assert_eq!(rw.stats.inlined, 2);
        assert_eq!(rw.stats.skipped, 1);
    }

    #[test]
    fn test_links_are_absolutized() {
        let doc = parse(
            r##"<a href="docs/intro.html">a</a>
                <a href="https://other.example.com/">b</a>
                <a href="#top">c</a>
                <a href="JavaScript:void(0)">d</a>
                <a href="">e</a>
                <a>f</a>"##,
        );
        let base = base();
        let fetcher = StubTransport::default().fetcher();
        let mut rw = Rewriter::new(&base, &fetcher);

        rw.absolutize_links(&doc);

        let hrefs: Vec<Option<String>> = doc
            .select("a")
            .unwrap()
            .map(|a| a.attributes.borrow().get("href").map(str::to_string))
            .collect();
        assert_eq!(
            hrefs,
            vec![
                Some("https://example.com/assets/docs/intro.html".to_string()),
                Some("https://other.example.com/".to_string()),
                Some("#top".to_string()),
                Some("JavaScript:void(0)".to_string()),
                Some(String::new()),
                None,
            ]
        );
        assert_eq!(rw.stats.links, 1);
    }

    #[test]
    fn test_audio_src_becomes_data_uri() {
        let stub = StubTransport::default().with(
            "https://example.com/assets/beep.mp3",
            b"ID3",
            Some("audio/mpeg"),
        );
        let doc = parse(r#"<audio src="beep.mp3" controls></audio><audio src="nope.ogg"></audio>"#);
        let base = base();
        let fetcher = stub.fetcher();
        Rewriter::new(&base, &fetcher).inline_audio(&doc);

        let srcs: Vec<String> = doc
            .select("audio")
            .unwrap()
            .filter_map(|a| a.attributes.borrow().get("src").map(str::to_string))
            .collect();
        assert_eq!(srcs, vec!["data:audio/mpeg;base64,SUQz", "nope.ogg"]);
    }

    #[test]
    fn test_passes_tolerate_missing_elements() {
        let doc = parse("<p>plain</p>");
        let base = base();
        let stub = StubTransport::default();
        let fetcher = stub.fetcher();
        let mut rw = Rewriter::new(&base, &fetcher);

        rw.run(&doc);

        assert_eq!(rw.stats, InlineStats::default());
        assert!(stub.requested().is_empty());
    }
}
