/// Extension to content-type lookup.
use phf::phf_map;

/// Returned when the extension is unknown. The embedded-style rewriter treats
/// this value as "not an asset" for local files, so it must stay distinct from
/// any real entry in [`MIME_BY_EXT`].
pub const DEFAULT_CONTENT_TYPE: &str = "application/image";

/// Map lower-cased extensions (with the leading dot) to content types.
pub static MIME_BY_EXT: phf::Map<&'static str, &'static str> = phf_map! {
    // Markup and styles
    ".htm" => "text/html",
    ".html" => "text/html",
    ".xhtml" => "application/xhtml+xml",
    ".css" => "text/css",
    ".xml" => "text/xml",
    ".txt" => "text/plain",

    // Scripts and data
    ".js" => "application/javascript",
    ".mjs" => "application/javascript",
    ".json" => "application/json",

    // Images
    ".png" => "image/png",
    ".jpg" => "image/jpeg",
    ".jpeg" => "image/jpeg",
    ".jpe" => "image/jpeg",
    ".gif" => "image/gif",
    ".bmp" => "image/bmp",
    ".ico" => "image/x-icon",
    ".cur" => "image/x-icon",
    ".svg" => "image/svg+xml",
    ".svgz" => "image/svg+xml",
    ".webp" => "image/webp",
    ".avif" => "image/avif",
    ".tif" => "image/tiff",
    ".tiff" => "image/tiff",

    // Fonts
    ".woff" => "font/woff",
    ".woff2" => "font/woff2",
    ".otf" => "font/otf",
    ".ttf" => "application/x-font-ttf",
    ".eot" => "application/vnd.ms-fontobject",

    // Audio and video
    ".mp3" => "audio/mpeg",
    ".wav" => "audio/wav",
    ".ogg" => "audio/ogg",
    ".oga" => "audio/ogg",
    ".m4a" => "audio/mp4",
    ".aac" => "audio/aac",
    ".flac" => "audio/flac",
    ".weba" => "audio/webm",
    ".mp4" => "video/mp4",
    ".webm" => "video/webm",

    // Documents
    ".pdf" => "application/pdf",
};

/// Extract the extension of the last path segment, lower-cased, dot included.
/// Query strings and fragments are ignored.
pub fn extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let dot = file_name.rfind('.')?;
    let ext = &file_name[dot..];
    if ext.len() < 2 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Content type for a URL or path, falling back to [`DEFAULT_CONTENT_TYPE`].
pub fn content_type_for(url: &str) -> &'static str {
    extension(url)
        .and_then(|ext| MIME_BY_EXT.get(ext.as_str()).copied())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
