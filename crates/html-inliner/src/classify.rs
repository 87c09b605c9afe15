/// Reference classification: remote URL, local `file:///` URL, or relative path.

/// Where a reference points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Remote,
    LocalFile,
    Relative,
}

const FILE_PREFIX: &str = "file:///";

/// Case-insensitive `http` prefix check. Note this alone does not make a
/// reference remote; see [`classify`].
pub fn is_http(reference: &str) -> bool {
    starts_with_ignore_case(reference, "http")
}

/// Case-insensitive `file:///` prefix check.
pub fn is_file(reference: &str) -> bool {
    starts_with_ignore_case(reference, FILE_PREFIX)
}

/// Classify a reference. Total over every string; empty input is relative.
pub fn classify(reference: &str) -> RefKind {
    if is_http(reference) && reference.contains("://") {
        RefKind::Remote
    } else if is_file(reference) {
        RefKind::LocalFile
    } else {
        RefKind::Relative
    }
}

/// Strip the `file:///` prefix regardless of its case.
pub fn strip_file_prefix(reference: &str) -> Option<&str> {
    if is_file(reference) {
        Some(&reference[FILE_PREFIX.len()..])
    } else {
        None
    }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
