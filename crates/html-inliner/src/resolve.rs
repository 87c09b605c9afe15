//! Base location handling and relative reference resolution.

use std::path::{Path, PathBuf};

use kuchiki::NodeRef;
use url::Url;

use crate::classify::{self, RefKind};
use crate::error::{FetchError, InlineError};

/// The absolute location every relative reference of one conversion is
/// resolved against. Fixed once the document's own `<base>` has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseContext {
    url: Url,
}

impl BaseContext {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Resolve a reference against this base; remote and `file:///`
    /// references come back unchanged.
    pub fn resolve(&self, reference: &str) -> Result<String, FetchError> {
        resolve(&self.url, reference)
    }
}

/// Join `reference` onto `base` by trimming one trailing slash from the base
/// and one leading slash from the reference, then reparsing.
pub fn append(base: &Url, reference: &str) -> Result<Url, FetchError> {
    let base_str = base.as_str();
    let head = base_str.strip_suffix('/').unwrap_or(base_str);
    let tail = reference.strip_prefix('/').unwrap_or(reference);

    Url::parse(&format!("{head}/{tail}")).map_err(|_| FetchError::InvalidUrl {
        reference: reference.to_string(),
        base: base_str.to_string(),
    })
}

pub fn resolve(base: &Url, reference: &str) -> Result<String, FetchError> {
    match classify::classify(reference) {
        RefKind::Remote | RefKind::LocalFile => Ok(reference.to_string()),
        RefKind::Relative => Ok(append(base, reference)?.to_string()),
    }
}

/// Detach the document's first `<base>` element and return its `href`.
/// The element is removed whether or not it carries an `href`.
pub fn take_declared_base(document: &NodeRef) -> Option<String> {
    let base = document.select_first("base").ok()?;
    let href = base.attributes.borrow().get("href").map(str::to_string);
    base.as_node().detach();
    href
}

/// Base for a remote document: the declared `href` joined onto the document
/// URL, or the document URL itself.
pub fn remote_base(document_url: &Url, declared: Option<&str>) -> BaseContext {
    let Some(href) = declared else {
        return BaseContext::new(document_url.clone());
    };

    match document_url.join(href) {
        Ok(url) => BaseContext::new(url),
        Err(e) => {
            tracing::warn!("ignoring unparseable <base href=\"{href}\">: {e}");
            BaseContext::new(document_url.clone())
        }
    }
}

/// Base for a local file or raw markup. Precedence: a `file:///` base declared
/// by the document, then the caller's base path, then the input file's
/// directory, then the current directory.
pub fn local_base(
    declared: Option<&str>,
    base_path: Option<&str>,
    input_file: Option<&Path>,
) -> Result<BaseContext, InlineError> {
    if let Some(href) = declared {
        if let Some(rest) = classify::strip_file_prefix(href) {
            if !rest.is_empty() && rest != "\\" {
                let url = Url::parse(href).map_err(|_| InlineError::InvalidBase(href.to_string()))?;
                return Ok(BaseContext::new(url));
            }
        }
    }

    if let Some(path) = base_path.filter(|p| !p.is_empty()) {
        return base_from_str(path);
    }

    let dir = match input_file.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => current_dir()?,
    };
    directory_base(&dir)
}

/// Turn a directory on disk into a `file:///` base ending in a slash.
pub fn directory_base(dir: &Path) -> Result<BaseContext, InlineError> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        current_dir()?.join(dir)
    };

    Url::from_directory_path(&absolute)
        .map(BaseContext::new)
        .map_err(|()| InlineError::InvalidBase(absolute.display().to_string()))
}

fn base_from_str(path: &str) -> Result<BaseContext, InlineError> {
    match classify::classify(path) {
        RefKind::Remote | RefKind::LocalFile => Url::parse(path)
            .map(BaseContext::new)
            .map_err(|_| InlineError::InvalidBase(path.to_string())),
        RefKind::Relative => directory_base(Path::new(path)),
    }
}

fn current_dir() -> Result<PathBuf, InlineError> {
    std::env::current_dir().map_err(|e| InlineError::InvalidBase(format!("current directory: {e}")))
}
