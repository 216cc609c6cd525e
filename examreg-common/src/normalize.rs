//! Name canonicalization for duplicate detection

/// Canonical comparison key for a display name.
///
/// Trims leading/trailing whitespace, collapses interior whitespace runs to
/// a single space, and lowercases. The result is stored alongside the
/// display name and kept in sync on every write that touches it.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
