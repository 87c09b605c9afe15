/// Text decoding for fetched documents and stylesheets.

/// Decode bytes to UTF-8 with charset detection.
pub fn decode_to_utf8(bytes: &[u8], header_charset: Option<&str>) -> String {
    // Try header charset first
    if let Some(cs) = header_charset {
        if let Some(enc) = encoding_rs::Encoding::for_label(cs.trim().as_bytes()) {
            let (cow, _, _) = enc.decode(bytes);
            return cow.into_owned();
        }
    }

    // A BOM or plain UTF-8 needs no guessing
    if let Some((enc, _)) = encoding_rs::Encoding::for_bom(bytes) {
        let (cow, _, _) = enc.decode(bytes);
        return cow.into_owned();
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (cow, _, _) = encoding.decode(bytes);
    cow.into_owned()
}

/// Parse charset from Content-Type header.
pub fn parse_charset(content_type: &str) -> Option<String> {
    if let Ok(mime) = content_type.parse::<mime::Mime>() {
        mime.get_param(mime::CHARSET)
            .map(|cs| cs.as_str().to_string())
    } else {
        None
    }
}

/// Reduce a Content-Type header to its essence (`type/subtype`).
pub fn media_type(content_type: &str) -> Option<String> {
    content_type
        .parse::<mime::Mime>()
        .ok()
        .map(|mime| mime.essence_str().to_string())
}
