//! Turn an HTML page into a single self-contained document.
//!
//! Stylesheets, scripts, images, favicons, audio and `url(...)` references in
//! style text are replaced by data URIs; hyperlinks are made absolute. A
//! reference that cannot be fetched is left as written, while a page that
//! cannot be loaded at all yields no result.

pub mod classify;
pub mod css;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod inliner;
pub mod mime;
pub mod resolve;
pub mod rewrite;

pub use error::{FetchError, InlineError};
pub use fetch::{FetchOptions, HttpTransport, Transport};
pub use inliner::Inliner;
pub use resolve::BaseContext;
pub use rewrite::InlineStats;
