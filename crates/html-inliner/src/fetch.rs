/// Resource fetching from the network or the local filesystem.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use base64::Engine;
use bytes::Bytes;
use reqwest::blocking::Client;

use crate::classify::{self, RefKind};
use crate::decode::{decode_to_utf8, media_type, parse_charset};
use crate::error::FetchError;
use crate::mime::content_type_for;
use crate::resolve::BaseContext;

pub struct FetchOptions {
    pub timeout: Duration,
    pub max_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_bytes: 25 * 1024 * 1024, // 25MB
            user_agent: "html-inliner/0.1".to_string(),
        }
    }
}

/// A successful GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Synchronous HTTP GET. Implementations must never panic on network errors.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// [`Transport`] backed by a blocking reqwest client. The client-wide timeout
/// bounds every single fetch.
pub struct HttpTransport {
    client: Client,
    max_bytes: usize,
}

impl HttpTransport {
    pub fn new(opts: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(opts.user_agent)
            .timeout(opts.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            max_bytes: opts.max_bytes,
        })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let http_err = |e: reqwest::Error| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };

        let resp = self.client.get(url).send().map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Refuse early when the server announces an oversized body
        if let Some(len) = resp.content_length() {
            let len = usize::try_from(len).unwrap_or(usize::MAX);
            if len > self.max_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    size: len,
                    limit: self.max_bytes,
                });
            }
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = resp.bytes().map_err(http_err)?;
        if body.len() > self.max_bytes {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                size: body.len(),
                limit: self.max_bytes,
            });
        }

        Ok(HttpResponse { content_type, body })
    }
}

/// Bytes of one fetched reference plus what is known about their type.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Absolute URL the bytes came from
    pub location: String,
    pub content_type: String,
    pub charset: Option<String>,
    pub bytes: Bytes,
}

impl Resource {
    pub fn data_uri(&self) -> String {
        data_uri(&self.content_type, &self.bytes)
    }

    pub fn text(&self) -> String {
        decode_to_utf8(&self.bytes, self.charset.as_deref())
    }
}

pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Classifies, resolves and fetches references. Every failure is returned as
/// a [`FetchError`] for the caller to skip.
pub struct ResourceFetcher {
    transport: Box<dyn Transport>,
}

impl ResourceFetcher {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn fetch(&self, reference: &str, base: &BaseContext) -> Result<Resource, FetchError> {
        if reference
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
        {
            return Err(FetchError::AlreadyInline);
        }

        match classify::classify(reference) {
            RefKind::Remote => self.fetch_remote(reference),
            RefKind::LocalFile => read_local(reference),
            RefKind::Relative => {
                let resolved = base.resolve(reference)?;
                match classify::classify(&resolved) {
                    RefKind::Remote => self.fetch_remote(&resolved),
                    RefKind::LocalFile => read_local(&resolved),
                    RefKind::Relative => Err(FetchError::InvalidUrl {
                        reference: reference.to_string(),
                        base: base.as_str().to_string(),
                    }),
                }
            }
        }
    }

    /// GET an absolute URL. The declared content type wins; the extension
    /// table is only consulted when the response has none.
    pub fn fetch_remote(&self, url: &str) -> Result<Resource, FetchError> {
        let resp = self.transport.get(url)?;

        let content_type = resp
            .content_type
            .as_deref()
            .and_then(media_type)
            .unwrap_or_else(|| content_type_for(url).to_string());
        let charset = resp.content_type.as_deref().and_then(parse_charset);

        Ok(Resource {
            location: url.to_string(),
            content_type,
            charset,
            bytes: resp.body,
        })
    }
}

/// Read a `file:///` reference from disk.
pub fn read_local(file_url: &str) -> Result<Resource, FetchError> {
    let path = local_path(file_url)?;
    let bytes = std::fs::read(&path).map_err(|source| FetchError::Io {
        path: path.display().to_string(),
        source,
    })?;

    Ok(Resource {
        location: file_url.to_string(),
        content_type: content_type_for(file_url).to_string(),
        charset: None,
        bytes: Bytes::from(bytes),
    })
}

/// Filesystem path of a `file:///` URL: prefix stripped, query and fragment
/// dropped, percent-decoded. Paths without a drive letter are rooted at `/`.
pub fn local_path(file_url: &str) -> Result<PathBuf, FetchError> {
    let rest = classify::strip_file_prefix(file_url).ok_or_else(|| FetchError::InvalidUrl {
        reference: file_url.to_string(),
        base: String::new(),
    })?;
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);

    let decoded = urlencoding::decode(rest)
        .map_err(|_| FetchError::Decode(file_url.to_string()))?
        .into_owned();

    let bytes = decoded.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if has_drive {
        Ok(PathBuf::from(decoded))
    } else {
        Ok(PathBuf::from(format!("/{decoded}")))
    }
}

/// Parse a human-readable size string (e.g., "10MB", "1GB").
pub fn parse_size(s: &str) -> Result<usize> {
    let s = s.trim().to_uppercase();
    let (num_part, unit) = if let Some(pos) = s.find(|c: char| c.is_alphabetic()) {
        (&s[..pos], &s[pos..])
    } else {
        (s.as_str(), "")
    };

    let num: usize = num_part.trim().parse()?;
    let multiplier = match unit {
        "B" | "" => 1,
        "KB" => 1024,
        "MB" => 1024 * 1024,
        "GB" => 1024 * 1024 * 1024,
        _ => anyhow::bail!("Unknown size unit: {}", unit),
    };

    num.checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Size too large: {}", s))
}

/// Parse a human-readable duration string (e.g., "15s", "1m").
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let (num_part, unit) = if let Some(pos) = s.find(|c: char| c.is_alphabetic()) {
        (&s[..pos], &s[pos..])
    } else {
        (s.as_str(), "s")
    };

    let num: u64 = num_part.trim().parse()?;
    let duration = match unit {
        "s" | "sec" => Duration::from_secs(num),
        "m" | "min" => Duration::from_secs(num * 60),
        "h" | "hour" => Duration::from_secs(num * 3600),
        _ => anyhow::bail!("Unknown duration unit: {}", unit),
    };

    Ok(duration)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// In-memory transport keyed by absolute URL.
    #[derive(Default, Clone)]
    pub struct StubTransport {
        pages: HashMap<String, (Vec<u8>, Option<String>)>,
        pub requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubTransport {
        pub fn with(mut self, url: &str, body: &[u8], content_type: Option<&str>) -> Self {
            self.pages.insert(
                url.to_string(),
                (body.to_vec(), content_type.map(str::to_string)),
            );
            self
        }

        pub fn requested(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        pub fn fetcher(&self) -> ResourceFetcher {
            ResourceFetcher::new(Box::new(self.clone()))
        }
    }

    impl Transport for StubTransport {
        fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some((body, content_type)) => Ok(HttpResponse {
                    content_type: content_type.clone(),
                    body: Bytes::from(body.clone()),
                }),
                None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }
}
